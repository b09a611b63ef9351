use core::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Errors that can occur while talking to a tag or while encoding and decoding its blocks.
///
/// Every variant aborts the operation it was raised in. Nothing is retried and no partial
/// result is returned. Lookups that have an "Unknown" label are not errors and never show up
/// here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The exchange with the reader failed or the tag answered with a status word other than
    /// `90 00`.
    #[error("transport fault while {op}: {fault}")]
    Transport {
        op: Operation,
        #[source]
        fault: TransportFault,
    },

    /// The caller passed a value that can not be encoded, e.g. a DevEUI with 15 hex digits or a
    /// block number above 48. Raised before any I/O.
    #[error("invalid {field}: {reason}")]
    Encoding { field: &'static str, reason: String },

    /// Block content that can not be interpreted as the expected field. Usually means the tag
    /// was never programmed or is corrupted.
    #[error("block {block} can not be decoded: {reason}")]
    Decode { block: u8, reason: String },

    /// The CRC computed over blocks 0-47 differs from the one stored in block 48.
    #[error("CRC mismatch: computed 0x{expected:04X}, stored 0x{actual:04X}")]
    CrcMismatch { expected: u16, actual: u16 },

    /// The SKU byte in block 15 is not a known beacon type.
    #[error("unknown beacon type 0x{0:02X}")]
    UnknownBeaconType(u8),
}

impl Error {
    pub(crate) fn encoding(field: &'static str, reason: impl Into<String>) -> Self {
        Error::Encoding {
            field,
            reason: reason.into(),
        }
    }

    pub(crate) fn decode(block: u8, reason: impl Into<String>) -> Self {
        Error::Decode {
            block,
            reason: reason.into(),
        }
    }
}

/// What went wrong on the wire.
#[derive(Error, Debug, Clone)]
pub enum TransportFault {
    /// The underlying channel reported an error. The transport's own error is kept as the
    /// source, e.g. a `pcsc::Error`.
    #[error("channel error: {0}")]
    Channel(#[source] Arc<dyn std::error::Error + Send + Sync>),

    /// Every response carries at least the two status bytes.
    #[error("response too short ({0} bytes)")]
    ShortResponse(usize),

    #[error("unexpected status word {0:04X}")]
    StatusWord(u16),
}

impl PartialEq for TransportFault {
    /// Channel errors compare by their message.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Channel(a), Self::Channel(b)) => a.to_string() == b.to_string(),
            (Self::ShortResponse(a), Self::ShortResponse(b)) => a == b,
            (Self::StatusWord(a), Self::StatusWord(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for TransportFault {}

/// The block level exchange a transport fault happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ReadBlock(u8),
    WriteBlock(u8),
    GetUid,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::ReadBlock(block) => write!(f, "reading block {block}"),
            Operation::WriteBlock(block) => write!(f, "writing block {block}"),
            Operation::GetUid => f.write_str("reading the UID"),
        }
    }
}
