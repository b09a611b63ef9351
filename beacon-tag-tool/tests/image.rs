use std::fs;

use beacon_tag::field::DevEui;
use beacon_tag::image::DEFAULT_UID;
use beacon_tag::{Error, Tag, TagImage};
use beacon_tag_tool::{load_image, save_image};
use pretty_assertions::assert_eq;
use tempfile::NamedTempFile;

#[test]
fn test_save_and_load() {
    let uid = [0xE0, 0x02, 0x08, 0x01, 0x23, 0x45, 0x67, 0x89];
    let mut tag = Tag::new(TagImage::erased().with_uid(&uid));
    tag.set::<DevEui>(&"0C1EF70000000D27".parse().unwrap()).unwrap();
    let image = tag.into_inner();

    let file = NamedTempFile::new().unwrap();
    save_image(file.path(), &image).unwrap();
    assert_eq!(fs::metadata(file.path()).unwrap().len(), TagImage::LEN as u64);

    let loaded = load_image(file.path()).unwrap();
    // the file holds the memory only
    assert_eq!(loaded.uid(), DEFAULT_UID);

    let mut tag = Tag::new(loaded);
    tag.validate_crc().unwrap();
    assert_eq!(
        tag.get::<DevEui>().unwrap().to_string(),
        "0C:1E:F7:00:00:00:0D:27"
    );
}

#[test]
fn test_truncated_image() {
    let file = NamedTempFile::new().unwrap();
    fs::write(file.path(), [0xFF; 100]).unwrap();

    let result = load_image(file.path());
    assert!(matches!(
        result,
        Err(beacon_tag_tool::Error::Tag(Error::Decode { block: 25, .. }))
    ));
}

#[test]
fn test_oversized_image() {
    let file = NamedTempFile::new().unwrap();
    fs::write(file.path(), [0xFF; 200]).unwrap();

    match load_image(file.path()) {
        Err(beacon_tag_tool::Error::Tag(Error::Decode { block, reason })) => {
            assert_eq!(block, 48);
            assert_eq!(reason, "image has 4 bytes after the CRC block");
        }
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn test_missing_image() {
    let result = load_image("does/not/exist.bin");
    assert!(matches!(result, Err(beacon_tag_tool::Error::IoError(_))));
}
