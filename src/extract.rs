use std::io::{self, Read};

use crate::{error::UnpackError, Header};

/// Cap on any single declared segment size. A header declaring more than
/// this is treated as malformed rather than allocated for.
pub const MAX_SEGMENT_SIZE: u32 = 512 << 20;

/// Payload segments of a boot image, in wire order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Segments {
    pub kernel: Vec<u8>,
    pub ramdisk: Vec<u8>,
    /// Second bootloader payload, frequently empty.
    pub second: Vec<u8>,
}

/// Alignment padding that follows an item of `size` bytes.
///
/// `page_size` must be a power of two.
pub(crate) fn padding_for(size: u32, page_size: u32) -> u64 {
    let page = page_size as u64;
    (page - (size as u64 & (page - 1))) & (page - 1)
}

/// Reads the three payload segments from a stream positioned immediately
/// after the header, skipping the alignment padding between them.
///
/// The header itself is page-aligned like any segment, so its padding is
/// consumed first. Padding after the final segment is only drained on
/// request and tolerates end of stream.
pub(crate) fn read_segments<R: Read>(
    reader: &mut R,
    header: &Header,
    page_size: u32,
    consume_trailing_padding: bool,
) -> Result<Segments, UnpackError> {
    skip_padding(reader, Header::SIZE, page_size, "header padding")?;

    let kernel = read_segment(reader, header.kernel_size, "kernel")?;
    skip_padding(reader, header.kernel_size, page_size, "kernel padding")?;

    let ramdisk = read_segment(reader, header.ramdisk_size, "ramdisk")?;
    skip_padding(reader, header.ramdisk_size, page_size, "ramdisk padding")?;

    let second = read_segment(reader, header.second_size, "second")?;
    if consume_trailing_padding {
        let count = padding_for(header.second_size, page_size);
        io::copy(&mut reader.take(count), &mut io::sink())?;
    }

    Ok(Segments {
        kernel,
        ramdisk,
        second,
    })
}

fn read_segment<R: Read>(
    reader: &mut R,
    size: u32,
    section: &'static str,
) -> Result<Vec<u8>, UnpackError> {
    if size > MAX_SEGMENT_SIZE {
        return Err(UnpackError::SegmentTooLarge {
            section,
            size,
            limit: MAX_SEGMENT_SIZE,
        });
    }
    let mut buf = vec![0u8; size as usize];
    reader
        .read_exact(&mut buf)
        .map_err(|e| UnpackError::truncated(e, section))?;
    Ok(buf)
}

fn skip_padding<R: Read>(
    reader: &mut R,
    size: u32,
    page_size: u32,
    section: &'static str,
) -> Result<(), UnpackError> {
    let count = padding_for(size, page_size);
    if io::copy(&mut reader.take(count), &mut io::sink())? != count {
        return Err(UnpackError::TruncatedInput { section });
    }
    Ok(())
}
