use std::io;

use thiserror::Error;

/// Errors surfaced while unpacking a boot image.
///
/// A digest mismatch is deliberately absent: it is a reportable outcome
/// ([`crate::Verdict::Mismatch`]), not a failure.
#[derive(Error, Debug)]
pub enum UnpackError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Android boot magic not found in the first 513 bytes")]
    MagicNotFound,

    #[error("invalid page size {0}: must be a nonzero power of two")]
    InvalidPageSize(u32),

    #[error("input ended while reading {section}")]
    TruncatedInput { section: &'static str },

    #[error("declared {section} size {size} exceeds the {limit} byte cap")]
    SegmentTooLarge {
        section: &'static str,
        size: u32,
        limit: u32,
    },

    #[error("malformed header: {0}")]
    Header(binrw::Error),
}

impl UnpackError {
    /// Maps a header decode failure, folding EOF into the truncation
    /// taxonomy.
    pub(crate) fn from_header(err: binrw::Error) -> Self {
        match err {
            binrw::Error::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                UnpackError::TruncatedInput { section: "header" }
            }
            binrw::Error::Io(e) => UnpackError::Io(e),
            other => UnpackError::Header(other),
        }
    }

    /// Maps a segment read failure the same way.
    pub(crate) fn truncated(err: io::Error, section: &'static str) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            UnpackError::TruncatedInput { section }
        } else {
            UnpackError::Io(err)
        }
    }
}
