//! Android boot image (boot.img) unpacking: header location and decoding,
//! page-aligned segment extraction and SHA-1 integrity verification.

use std::io::{ErrorKind, Read, Seek, SeekFrom};

use binrw::{binrw, BinRead};

pub mod digest;
mod error;
mod extract;

pub use digest::{Checksum, Verdict};
pub use error::UnpackError;
pub use extract::{Segments, MAX_SEGMENT_SIZE};

/// Android boot image header
#[binrw]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[brw(little, magic = b"ANDROID!")]
pub struct Header {
    /// Kernel size
    pub kernel_size: u32,
    /// Kernel physical load addr
    pub kernel_addr: u32,
    /// Ramdisk size
    pub ramdisk_size: u32,
    /// Ramdisk physical load addr
    pub ramdisk_addr: u32,
    /// Second bootloader size
    pub second_size: u32,
    /// Second bootloader physical load addr
    pub second_addr: u32,
    /// Kernel tags physical load addr
    pub tags_addr: u32,
    /// Page size in bytes, must be a power of two
    pub page_size: u32,
    pub unused: [u32; 2],
    /// Board or product name, NUL-padded
    pub name: [u8; 16],
    /// Kernel command line, NUL-padded
    pub cmdline: Box<[u8; 512]>,
    /// Embedded digest over the payloads and the trailing header fields
    pub id: [u8; 20],
    /// Kernel command line extension
    pub extra_cmdline: Box<[u8; 1024]>,
}

impl Header {
    /// Boot image magic signature.
    pub const MAGIC: [u8; 8] = *b"ANDROID!";
    /// Size of the decoded header in bytes, magic included.
    pub const SIZE: u32 = 1620;
    /// Last offset probed for the magic, inclusive.
    pub const MAGIC_WINDOW: u64 = 512;
    /// Conventional kernel entry relocation below `kernel_addr`.
    const KERNEL_BASE_OFFSET: u32 = 0x0000_8000;

    /// Scans the first [`Self::MAGIC_WINDOW`] + 1 offsets of `reader` for the
    /// magic signature and decodes the header found there.
    ///
    /// Returns the magic offset together with the header; the reader is left
    /// positioned immediately after the header, ready for
    /// [`BootImage::unpack`]'s segment reads.
    pub fn locate<R: Read + Seek>(reader: &mut R) -> Result<(u64, Self), UnpackError> {
        let mut probe = [0u8; Self::MAGIC.len()];
        for offset in 0..=Self::MAGIC_WINDOW {
            reader.seek(SeekFrom::Start(offset))?;
            match reader.read_exact(&mut probe) {
                Ok(()) if probe == Self::MAGIC => {
                    reader.seek(SeekFrom::Start(offset))?;
                    let header = Self::read(reader).map_err(UnpackError::from_header)?;
                    return Ok((offset, header));
                }
                Ok(()) => {}
                // Not enough bytes left for the magic here; later offsets
                // have even fewer.
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            }
        }
        Err(UnpackError::MagicNotFound)
    }

    /// Page size used for padding arithmetic: the caller's override if given,
    /// else the header's declared value.
    pub fn effective_page_size(&self, page_size: Option<u32>) -> Result<u32, UnpackError> {
        let page_size = page_size.unwrap_or(self.page_size);
        if !page_size.is_power_of_two() {
            return Err(UnpackError::InvalidPageSize(page_size));
        }
        Ok(page_size)
    }

    /// Kernel load base, `kernel_addr` minus the conventional entry offset.
    pub fn kernel_base(&self) -> u32 {
        self.kernel_addr.wrapping_sub(Self::KERNEL_BASE_OFFSET)
    }

    /// Command line with the NUL padding trimmed.
    pub fn cmdline(&self) -> &[u8] {
        take_until_nul(&self.cmdline[..])
    }

    /// Command line extension with the NUL padding trimmed.
    pub fn extra_cmdline(&self) -> &[u8] {
        take_until_nul(&self.extra_cmdline[..])
    }

    /// Board name with the NUL padding trimmed.
    pub fn name(&self) -> &[u8] {
        take_until_nul(&self.name)
    }
}

fn take_until_nul(input: &[u8]) -> &[u8] {
    match input.iter().position(|x| *x == 0) {
        Some(nul_idx) => &input[..nul_idx],
        None => input,
    }
}

/// Knobs for [`BootImage::unpack`].
#[derive(Clone, Debug, Default)]
pub struct UnpackOptions {
    /// Page size to use instead of the header's declared value.
    pub page_size: Option<u32>,
    /// Also drain the alignment padding after the final segment. Off by
    /// default: images are not required to carry trailing padding, so the
    /// drain is best-effort and tolerates end of stream.
    pub consume_trailing_padding: bool,
}

/// A fully unpacked boot image.
#[derive(Clone, Debug)]
pub struct BootImage {
    /// Offset at which the magic was found.
    pub magic_offset: u64,
    pub header: Header,
    /// Page size the padding arithmetic actually used.
    pub page_size: u32,
    pub segments: Segments,
    pub checksum: Checksum,
}

impl BootImage {
    /// Locates and decodes the header, extracts the kernel, ramdisk and
    /// second-bootloader segments and verifies the embedded digest.
    ///
    /// Fatal conditions (missing magic, bad page size, truncated input)
    /// abort with no partial output. A digest mismatch is not fatal; it is
    /// reported through [`Checksum::verdict`].
    pub fn unpack<R: Read + Seek>(
        reader: &mut R,
        options: &UnpackOptions,
    ) -> Result<Self, UnpackError> {
        let (magic_offset, header) = Header::locate(reader)?;
        let page_size = header.effective_page_size(options.page_size)?;
        let segments = extract::read_segments(
            reader,
            &header,
            page_size,
            options.consume_trailing_padding,
        )?;
        let checksum = digest::verify(&header, &segments);
        Ok(BootImage {
            magic_offset,
            header,
            page_size,
            segments,
            checksum,
        })
    }
}
