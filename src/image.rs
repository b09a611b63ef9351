//! An in-memory tag.
//!
//! [`TagImage`] answers the same APDUs a reader does, so a [`Tag`](crate::Tag) can work on a
//! saved configuration file exactly like on a real tag. The file format is the raw memory: 49
//! blocks of 4 bytes, 196 bytes in total.

use std::convert::Infallible;

use crate::apdu::{Command, BLOCK_COUNT, BLOCK_SIZE, CONFIG_BLOCKS, CRC_BLOCK, STATUS_OK};
use crate::block::Block;
use crate::crc;
use crate::error::Error;
use crate::transport::Transport;

/// UID reported by images that were not given one. An ST M24LR (`E0 02`) with serial zero.
pub const DEFAULT_UID: [u8; 8] = [0xE0, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagImage {
    blocks: [Block; BLOCK_COUNT as usize],
    uid: Vec<u8>,
}

impl TagImage {
    /// Size of the serialized image in bytes.
    pub const LEN: usize = BLOCK_COUNT as usize * BLOCK_SIZE;

    /// A tag right after an erase: every configuration block `FFFFFFFF` and a matching CRC.
    pub fn erased() -> Self {
        let mut blocks = [Block::ERASED; BLOCK_COUNT as usize];
        let config = [0xFF; crc::CONFIG_LEN];
        blocks[CRC_BLOCK as usize] = crc::encode_for_storage(crc::crc16(&config));
        Self {
            blocks,
            uid: DEFAULT_UID.to_vec(),
        }
    }

    /// Builds an image from the raw memory, e.g. a configuration file.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() < Self::LEN {
            let incomplete = (bytes.len() / BLOCK_SIZE) as u8;
            return Err(Error::decode(
                incomplete,
                format!(
                    "image ends after {} bytes, expected {}",
                    bytes.len(),
                    Self::LEN
                ),
            ));
        }
        if bytes.len() > Self::LEN {
            return Err(Error::decode(
                CRC_BLOCK,
                format!(
                    "image has {} bytes after the CRC block",
                    bytes.len() - Self::LEN
                ),
            ));
        }

        let mut blocks = [Block::default(); BLOCK_COUNT as usize];
        for (block, chunk) in blocks.iter_mut().zip(bytes.chunks_exact(BLOCK_SIZE)) {
            *block = Block::try_from(chunk).map_err(|_| Error::decode(0, "truncated block"))?;
        }
        Ok(Self {
            blocks,
            uid: DEFAULT_UID.to_vec(),
        })
    }

    pub fn with_uid(mut self, uid: &[u8]) -> Self {
        self.uid = uid.to_vec();
        self
    }

    /// The raw memory, block 0 first.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.blocks
            .iter()
            .flat_map(|block| block.as_bytes().iter().copied())
            .collect()
    }

    pub fn uid(&self) -> &[u8] {
        &self.uid
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Direct access to the memory, bypassing the CRC. Used to prepare test images.
    pub fn blocks_mut(&mut self) -> &mut [Block] {
        &mut self.blocks
    }

    /// Blocks 0-47.
    pub fn configuration(&self) -> &[Block] {
        &self.blocks[..CONFIG_BLOCKS as usize]
    }
}

impl Default for TagImage {
    fn default() -> Self {
        Self::erased()
    }
}

impl Transport for TagImage {
    type Error = Infallible;

    fn transmit(&mut self, command: &[u8]) -> Result<Vec<u8>, Self::Error> {
        let mut response = match Command::parse(command) {
            Ok(Command::ReadBlock(block)) => self.blocks[block as usize].as_bytes().to_vec(),
            Ok(Command::WriteBlock(block, data)) => {
                self.blocks[block as usize] = data;
                Vec::new()
            }
            Ok(Command::GetUid) => self.uid.clone(),
            Err(status) => return Ok(status.to_be_bytes().to_vec()),
        };
        response.extend_from_slice(&STATUS_OK.to_be_bytes());
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apdu::STATUS_NOT_FOUND;
    use pretty_assertions::assert_eq;

    #[test]
    fn erased_image_has_a_valid_crc() {
        let image = TagImage::erased();
        assert!(image.configuration().iter().all(|b| *b == Block::ERASED));
        let config = image.to_bytes()[..crc::CONFIG_LEN].to_vec();
        assert_eq!(
            crc::decode_from_storage(&image.blocks()[CRC_BLOCK as usize]),
            crc::crc16(&config)
        );
    }

    #[test]
    fn raw_bytes() {
        let mut image = TagImage::erased();
        image.blocks_mut()[11] = "0C1EF700".parse().unwrap();
        let bytes = image.to_bytes();
        assert_eq!(bytes.len(), TagImage::LEN);
        assert_eq!(&bytes[44..48], &[0x0C, 0x1E, 0xF7, 0x00]);
        assert_eq!(TagImage::from_bytes(&bytes).unwrap(), image);

        assert!(matches!(
            TagImage::from_bytes(&bytes[..100]),
            Err(Error::Decode { block: 25, .. })
        ));
    }

    #[test]
    fn short_and_long_images_are_told_apart() {
        let mut bytes = TagImage::erased().to_bytes();
        bytes.pop();
        match TagImage::from_bytes(&bytes) {
            Err(Error::Decode { block, reason }) => {
                assert_eq!(block, 48);
                assert_eq!(reason, "image ends after 195 bytes, expected 196");
            }
            other => panic!("unexpected result {other:?}"),
        }

        bytes.extend_from_slice(&[0xFF; 5]);
        match TagImage::from_bytes(&bytes) {
            Err(Error::Decode { block, reason }) => {
                assert_eq!(block, 48);
                assert_eq!(reason, "image has 4 bytes after the CRC block");
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn answers_like_a_reader() {
        let mut image = TagImage::erased().with_uid(&[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(image.uid(), [1, 2, 3, 4, 5, 6, 7, 8]);

        assert_eq!(
            image.transmit(&[0xFF, 0xD6, 0x00, 0x16, 0x04, 0x53, 0x50, 0x34, 0x30]),
            Ok(vec![0x90, 0x00])
        );
        assert_eq!(
            image.transmit(&[0xFF, 0xB0, 0x00, 0x16, 0x04]),
            Ok(vec![0x53, 0x50, 0x34, 0x30, 0x90, 0x00])
        );
        assert_eq!(
            image.transmit(&[0xFF, 0xCA, 0x00, 0x00, 0x00]),
            Ok(vec![1, 2, 3, 4, 5, 6, 7, 8, 0x90, 0x00])
        );
        assert_eq!(
            image.transmit(&[0xFF, 0xB0, 0x00, 0x31, 0x04]),
            Ok(STATUS_NOT_FOUND.to_be_bytes().to_vec())
        );
    }
}
