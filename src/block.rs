use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::apdu::BLOCK_SIZE;
use crate::error::Error;

/// One 4-byte block of tag memory.
///
/// Displayed and parsed as 8 uppercase hex digits, the form the tag tooling has always used
/// (`"0C1EF700"`). Nibbles are numbered the way they appear in that text: nibble 0 is the high
/// nibble of byte 0, nibble 7 the low nibble of byte 3.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Block([u8; BLOCK_SIZE]);

impl Block {
    /// Content of a block after an erase.
    pub const ERASED: Block = Block([0xFF; BLOCK_SIZE]);

    pub const fn new(bytes: [u8; BLOCK_SIZE]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; BLOCK_SIZE] {
        &self.0
    }

    pub const fn byte(&self, index: usize) -> u8 {
        self.0[index]
    }

    pub fn set_byte(&mut self, index: usize, value: u8) {
        self.0[index] = value;
    }

    pub const fn nibble(&self, index: usize) -> u8 {
        let byte = self.0[index / 2];
        if index % 2 == 0 { byte >> 4 } else { byte & 0x0F }
    }

    pub fn set_nibble(&mut self, index: usize, value: u8) {
        let byte = &mut self.0[index / 2];
        *byte = if index % 2 == 0 {
            (*byte & 0x0F) | (value << 4)
        } else {
            (*byte & 0xF0) | (value & 0x0F)
        };
    }

    /// Two bytes at `offset` stored low byte first.
    pub const fn le_u16(&self, offset: usize) -> u16 {
        u16::from_le_bytes([self.0[offset], self.0[offset + 1]])
    }

    pub fn set_le_u16(&mut self, offset: usize, value: u16) {
        self.0[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
    }
}

impl From<[u8; BLOCK_SIZE]> for Block {
    fn from(bytes: [u8; BLOCK_SIZE]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for Block {
    type Error = core::array::TryFromSliceError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        Ok(Self(bytes.try_into()?))
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Block({self})")
    }
}

impl FromStr for Block {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; BLOCK_SIZE];
        hex::decode_to_slice(s, &mut bytes).map_err(|e| {
            Error::encoding("block", format!("'{s}' is not {} hex digits: {e}", BLOCK_SIZE * 2))
        })?;
        Ok(Self(bytes))
    }
}

/// Blocks read from the tag, keyed by block number.
///
/// Fields decode from a set and encode into one, so one read pass can feed every field of a
/// settings snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockSet {
    blocks: BTreeMap<u8, Block>,
}

impl BlockSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A set holding zero-filled `blocks`.
    pub fn zeroed(blocks: &[u8]) -> Self {
        blocks.iter().map(|&n| (n, Block::default())).collect()
    }

    pub fn insert(&mut self, number: u8, block: Block) -> Option<Block> {
        self.blocks.insert(number, block)
    }

    /// Fails with a decode error if `number` was not read.
    pub fn get(&self, number: u8) -> Result<Block, Error> {
        self.blocks
            .get(&number)
            .copied()
            .ok_or_else(|| Error::decode(number, "block was not read"))
    }

    /// Fails with a decode error if `number` is not part of the set.
    pub fn get_mut(&mut self, number: u8) -> Result<&mut Block, Error> {
        self.blocks
            .get_mut(&number)
            .ok_or_else(|| Error::decode(number, "block was not read"))
    }

    /// Concatenated bytes of the given blocks, in the given order.
    pub fn concat(&self, numbers: &[u8]) -> Result<Vec<u8>, Error> {
        let mut bytes = Vec::with_capacity(numbers.len() * BLOCK_SIZE);
        for &number in numbers {
            bytes.extend_from_slice(self.get(number)?.as_bytes());
        }
        Ok(bytes)
    }

    /// Splits `bytes` over the given blocks. `bytes` must be exactly `numbers.len() * 4` long.
    pub(crate) fn scatter(&mut self, numbers: &[u8], bytes: &[u8]) {
        debug_assert_eq!(bytes.len(), numbers.len() * BLOCK_SIZE);
        for (&number, chunk) in numbers.iter().zip(bytes.chunks_exact(BLOCK_SIZE)) {
            if let Ok(block) = Block::try_from(chunk) {
                self.blocks.insert(number, block);
            }
        }
    }
}

impl FromIterator<(u8, Block)> for BlockSet {
    fn from_iter<I: IntoIterator<Item = (u8, Block)>>(iter: I) -> Self {
        Self {
            blocks: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn hex_text() {
        let block: Block = "0c1ef700".parse().unwrap();
        assert_eq!(block, Block::new([0x0C, 0x1E, 0xF7, 0x00]));
        assert_eq!(block.to_string(), "0C1EF700");
        assert_eq!(format!("{block:?}"), "Block(0C1EF700)");

        assert!("0C1EF7".parse::<Block>().is_err());
        assert!("0C1EF7000".parse::<Block>().is_err());
        assert!("0C1EF7ZZ".parse::<Block>().is_err());
    }

    #[test]
    fn nibbles_follow_the_hex_text() {
        let mut block: Block = "10100000".parse().unwrap();
        assert_eq!(block.nibble(0), 1);
        assert_eq!(block.nibble(1), 0);
        assert_eq!(block.nibble(2), 1);
        assert_eq!(block.nibble(3), 0);

        block.set_nibble(2, 0);
        block.set_nibble(7, 0xA);
        assert_eq!(block.to_string(), "1000000A");
    }

    #[test]
    fn little_endian_words() {
        let mut block: Block = "C4091027".parse().unwrap();
        assert_eq!(block.le_u16(0), 2500);
        assert_eq!(block.le_u16(2), 10000);

        block.set_le_u16(0, 1000);
        assert_eq!(block.to_string(), "E8031027");
    }

    #[test]
    fn block_set_concat_and_scatter() {
        let mut set = BlockSet::zeroed(&[22, 23]);
        set.scatter(&[22, 23], b"SP4066\0\0");
        assert_eq!(set.get(22).unwrap().to_string(), "53503430");
        assert_eq!(set.concat(&[22, 23]).unwrap(), b"SP4066\0\0");
        assert!(matches!(set.get(24), Err(Error::Decode { block: 24, .. })));
    }
}
