use thiserror::Error;

pub type CommonResult<T> = std::result::Result<T, DicomError>;

#[derive(Error, Debug)]
pub enum DicomError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON output error: {0}")]
    Json(#[from] serde_json::Error),

    /// Bytes 128..132 are not the `DICM` magic
    #[error("missing DICM prefix, found {0:?}")]
    InvalidPrefix(Vec<u8>),

    #[error("unexpected end of data at offset {offset}, needed {needed} more bytes")]
    Truncated { offset: usize, needed: usize },

    #[error("unknown value representation {vr:?} for tag {tag}")]
    UnknownVr { tag: String, vr: String },

    #[error("expected item tag fffe:e000, found {tag}")]
    InvalidItemTag { tag: String },

    #[error("unsupported transfer syntax {0}")]
    UnsupportedTransferSyntax(String),

    #[error("sequences nested {depth} levels deep")]
    NestingTooDeep { depth: usize },

    /// A packed tag group must be exactly two little-endian bytes
    #[error("malformed packed tag group: expected 2 bytes, got {len}")]
    MalformedTagGroup { len: usize },
}
