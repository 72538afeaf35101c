//! SHA-1 integrity check over a boot image's payloads and header fields.

use std::fmt;

use sha1::{Digest, Sha1};

use crate::{extract::Segments, Header};

/// Size of the embedded image digest.
pub const DIGEST_SIZE: usize = 20;

/// Outcome of comparing the recomputed digest against the header's id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Ok,
    Mismatch,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Verdict::Ok => "OK",
            Verdict::Mismatch => "WRONG",
        })
    }
}

/// Recomputed image digest and its comparison verdict.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Checksum {
    pub digest: [u8; DIGEST_SIZE],
    pub verdict: Verdict,
}

impl Checksum {
    /// Fixed-width hex rendering, two digits per byte.
    pub fn hex(&self) -> String {
        self.digest.iter().map(|b| format!("{b:02X}")).collect()
    }
}

/// Digest over the payloads, their sizes and the tail header fields.
///
/// The update order is the on-image contract: each payload followed by its
/// size as raw little-endian bytes, then the contiguous header span from
/// `tags_addr` through the end of `cmdline`. Reordering any part changes
/// the digest and breaks compatibility with existing images.
pub fn image_digest(header: &Header, segments: &Segments) -> [u8; DIGEST_SIZE] {
    let mut sha = Sha1::new();
    sha.update(&segments.kernel);
    sha.update(header.kernel_size.to_le_bytes());
    sha.update(&segments.ramdisk);
    sha.update(header.ramdisk_size.to_le_bytes());
    sha.update(&segments.second);
    sha.update(header.second_size.to_le_bytes());
    sha.update(header.tags_addr.to_le_bytes());
    sha.update(header.page_size.to_le_bytes());
    sha.update(header.unused[0].to_le_bytes());
    sha.update(header.unused[1].to_le_bytes());
    sha.update(header.name);
    sha.update(&header.cmdline[..]);
    sha.finalize().into()
}

/// Recomputes the image digest and compares its first `min(20, id len)`
/// bytes against the header's embedded id.
///
/// A mismatch is an expected outcome for hand-modified or foreign images;
/// it is reported in the verdict, never raised as an error.
pub fn verify(header: &Header, segments: &Segments) -> Checksum {
    let digest = image_digest(header, segments);
    let compared = DIGEST_SIZE.min(header.id.len());
    let verdict = if digest[..compared] == header.id[..compared] {
        Verdict::Ok
    } else {
        Verdict::Mismatch
    };
    Checksum { digest, verdict }
}
