use thiserror::Error;

/// Errors of the tag tool: tag access, file handling and the credentials log.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Tag(#[from] beacon_tag::Error),

    #[error("failed to write CSV: {0}")]
    CsvError(#[from] csv::Error),

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to format report: {0}")]
    FormatError(#[from] std::fmt::Error),

    #[error("hex decoding error: {0}")]
    HexError(#[from] hex::FromHexError),

    #[error("reader error: {0}")]
    Reader(String),

    #[error("refusing to erase the tag without --confirm")]
    NotConfirmed,
}
