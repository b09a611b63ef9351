use std::fs;

use beacon_tag::settings::{CrcStatus, LoraCredentials};
use beacon_tag_tool::{append_to_log, to_csv, CredentialRecord};
use chrono::{NaiveDate, NaiveDateTime};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

const HEADER: &str = "Timestamp,DevEUI,JoinEUI,JoinKey,CRC Status";

fn credentials(crc: CrcStatus) -> LoraCredentials {
    LoraCredentials {
        dev_eui: "0C1EF70000000D27".parse().unwrap(),
        join_eui: "70B3D57ED0000001".parse().unwrap(),
        join_key: "2B7E151628AED2A6ABF7158809CF4F3C".parse().unwrap(),
        crc,
    }
}

fn morning() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 10, 16)
        .unwrap()
        .and_hms_opt(9, 30, 5)
        .unwrap()
}

#[test]
fn test_record_formats() {
    let record = CredentialRecord::new(&credentials(CrcStatus::Valid), morning());

    assert_eq!(record.timestamp, "2026-10-16 09:30:05");
    assert_eq!(record.dev_eui, "0C:1E:F7:00:00:00:0D:27");
    assert_eq!(record.join_eui, "70B3D57ED0000001");
    assert_eq!(record.join_key, "2B7E151628AED2A6ABF7158809CF4F3C");
    assert_eq!(record.crc_status, "VALID");
}

#[test]
fn test_to_csv() {
    let records = vec![
        CredentialRecord::new(&credentials(CrcStatus::Valid), morning()),
        CredentialRecord::new(&credentials(CrcStatus::Invalid), morning()),
    ];

    let content = to_csv(&records).unwrap();

    assert_eq!(
        content,
        format!(
            "{HEADER}\n\
             2026-10-16 09:30:05,0C:1E:F7:00:00:00:0D:27,70B3D57ED0000001,2B7E151628AED2A6ABF7158809CF4F3C,VALID\n\
             2026-10-16 09:30:05,0C:1E:F7:00:00:00:0D:27,70B3D57ED0000001,2B7E151628AED2A6ABF7158809CF4F3C,INVALID\n"
        )
    );
}

#[test]
fn test_header_written_once() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("lora_info.csv");

    append_to_log(&path, &CredentialRecord::new(&credentials(CrcStatus::Valid), morning())).unwrap();
    append_to_log(&path, &CredentialRecord::new(&credentials(CrcStatus::Invalid), morning())).unwrap();

    let content = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], HEADER);
    assert!(lines[1].ends_with(",VALID"));
    assert!(lines[2].ends_with(",INVALID"));
}

#[test]
fn test_log_can_be_read_back() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("lora_info.csv");
    let record = CredentialRecord::new(&credentials(CrcStatus::Valid), morning());

    append_to_log(&path, &record).unwrap();

    let mut reader = csv::Reader::from_path(&path).unwrap();
    let read: Vec<CredentialRecord> = reader.deserialize().map(Result::unwrap).collect();
    assert_eq!(read, vec![record]);
}
