//! The closed error taxonomy returned by every fallible operation in this crate.

/// Errors that can occur while building, parsing or writing an ISO 9660 image.
#[derive(Debug, thiserror::Error)]
pub enum IsoError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("path not found: {0}")]
    NotFound(String),
    #[error("path already exists: {0}")]
    AlreadyExists(String),
    #[error("not a file: {0}")]
    NotAFile(String),
    #[error("not a directory: {0}")]
    NotADirectory(String),
    #[error("bad volume descriptor magic")]
    BadMagic,
    #[error("unsupported volume descriptor version")]
    BadVersion,
    #[error("truncated volume descriptor")]
    TruncatedDescriptor,
    #[error("directory record crosses a block boundary")]
    RecordCrossesBoundary,
    #[error("both-endian field halves disagree")]
    InconsistentBothEndian,
    #[error("sink closed before all bytes were written")]
    SinkClosed,
    #[error("I/O error: {0}")]
    SourceIO(#[from] std::io::Error),
    #[error("image is not open")]
    NotOpen,
    #[error("image is already open")]
    AlreadyOpen,
}
