//! Helpers behind the `beacon-tag-tool` binary: the LoRa credentials log, tag image files and
//! the text reports.

pub mod error;
pub mod report;

mod csv;

use std::fs;
use std::path::Path;

use beacon_tag::settings::LoraCredentials;
use beacon_tag::TagImage;
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

pub use error::Error;

/// Format of the timestamps in the credentials log.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One row of the LoRa credentials log.
///
/// Rows are collected while programming a batch of beacons and later imported into the network
/// server, so the column names and value formats must not change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    /// Colon separated.
    #[serde(rename = "DevEUI")]
    pub dev_eui: String,
    /// Plain hex.
    #[serde(rename = "JoinEUI")]
    pub join_eui: String,
    #[serde(rename = "JoinKey")]
    pub join_key: String,
    /// `VALID` or `INVALID`.
    #[serde(rename = "CRC Status")]
    pub crc_status: String,
}

impl CredentialRecord {
    pub fn new(credentials: &LoraCredentials, timestamp: NaiveDateTime) -> Self {
        Self {
            timestamp: timestamp.format(TIMESTAMP_FORMAT).to_string(),
            dev_eui: credentials.dev_eui.to_string(),
            join_eui: credentials.join_eui.to_hex(),
            join_key: credentials.join_key.to_string(),
            crc_status: credentials.crc.to_string(),
        }
    }

    /// A record stamped with the local time.
    pub fn now(credentials: &LoraCredentials) -> Self {
        Self::new(credentials, Local::now().naive_local())
    }
}

/// Appends `record` to the credentials log at `path`. New files start with a header row.
pub fn append_to_log<P: AsRef<Path>>(path: P, record: &CredentialRecord) -> Result<(), Error> {
    csv::writer::append_csv(path, std::slice::from_ref(record))
}

/// Serializes `records` as a credentials log and returns the content as a `String`.
pub fn to_csv(records: &[CredentialRecord]) -> Result<String, Error> {
    csv::writer::write_csv_content(records)
}

/// Loads a tag image (raw 196 byte memory) from `path`.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<TagImage, Error> {
    let bytes = fs::read(path)?;
    Ok(TagImage::from_bytes(&bytes)?)
}

/// Writes `image` to `path` as raw memory.
pub fn save_image<P: AsRef<Path>>(path: P, image: &TagImage) -> Result<(), Error> {
    fs::write(path, image.to_bytes())?;
    Ok(())
}
