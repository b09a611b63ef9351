use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use csv::{Writer, WriterBuilder};

use crate::error::Error;
use crate::CredentialRecord;

/// Appends `records` to the log at `path`, creating it if needed.
///
/// The header row is only written when the file is new or empty, so a log can be extended over
/// many sessions.
pub(crate) fn append_csv<P: AsRef<Path>>(
    path: P,
    records: &[CredentialRecord],
) -> Result<(), Error> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let is_new = file.metadata()?.len() == 0;

    let mut wtr = WriterBuilder::new().has_headers(is_new).from_writer(file);
    write_records(&mut wtr, records)
}

/// Serializes `records` including the header row and returns the content as a `String`.
pub(crate) fn write_csv_content(records: &[CredentialRecord]) -> Result<String, Error> {
    let mut wtr = Writer::from_writer(Vec::new());
    write_records(&mut wtr, records)?;
    let bytes = wtr
        .into_inner()
        .map_err(|e| Error::IoError(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn write_records<W: Write>(wtr: &mut Writer<W>, records: &[CredentialRecord]) -> Result<(), Error> {
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}
