use log::{info, warn};

use crate::apdu::{BLOCK_SIZE, CONFIG_BLOCKS, CRC_BLOCK};
use crate::block::Block;
use crate::error::Error;
use crate::transport::Transport;
use crate::Tag;

/// Number of bytes covered by the CRC (blocks 0-47).
pub const CONFIG_LEN: usize = CONFIG_BLOCKS as usize * BLOCK_SIZE;

const POLYNOMIAL: u16 = 0x1021;

/// CRC-16/CCITT as used by the beacon firmware: initial value 0xFFFF, polynomial 0x1021, MSB
/// first, no final XOR.
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;

    for &byte in data {
        crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ POLYNOMIAL;
            } else {
                crc <<= 1;
            }
        }
    }

    crc
}

/// The tag stores the CRC low byte first, followed by two zero bytes.
pub fn encode_for_storage(crc: u16) -> Block {
    let [lo, hi] = crc.to_le_bytes();
    Block::new([lo, hi, 0, 0])
}

/// Inverse of [`encode_for_storage`]. The two padding bytes are ignored.
pub fn decode_from_storage(block: &Block) -> u16 {
    block.le_u16(0)
}

impl<T: Transport> Tag<T> {
    /// Reads blocks 0-47 in address order.
    pub fn read_configuration(&mut self) -> Result<[u8; CONFIG_LEN], Error> {
        let mut data = [0u8; CONFIG_LEN];
        for (block, chunk) in (0..CONFIG_BLOCKS).zip(data.chunks_exact_mut(BLOCK_SIZE)) {
            chunk.copy_from_slice(self.read_block(block)?.as_bytes());
        }
        Ok(data)
    }

    /// Compares the CRC over blocks 0-47 with the one stored in block 48.
    ///
    /// A mismatch is only reported. Writes interrupted halfway through a field leave the tag in
    /// exactly this state and it is up to the caller to decide what to do about it.
    pub fn validate_crc(&mut self) -> Result<(), Error> {
        let expected = crc16(&self.read_configuration()?);
        let actual = decode_from_storage(&self.read_block(CRC_BLOCK)?);
        info!("computed CRC 0x{expected:04X}, stored CRC 0x{actual:04X}");

        if expected != actual {
            warn!("CRC mismatch, the tag configuration is inconsistent");
            return Err(Error::CrcMismatch { expected, actual });
        }
        Ok(())
    }

    /// Computes the CRC over blocks 0-47 and writes it to block 48.
    pub fn recompute_crc(&mut self) -> Result<u16, Error> {
        let crc = crc16(&self.read_configuration()?);
        let stored = encode_for_storage(crc);
        info!("computed CRC 0x{crc:04X}, storing as {stored}");
        self.write_block(CRC_BLOCK, stored)?;
        Ok(crc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_value() {
        // CRC-16/CCITT-FALSE check value
        assert_eq!(crc16(b"123456789"), 0x29B1);
        assert_eq!(crc16(&[]), 0xFFFF);
    }

    #[test]
    fn storage_is_byte_swapped() {
        let block = encode_for_storage(0x29B1);
        assert_eq!(block.to_string(), "B1290000");
        assert_eq!(decode_from_storage(&block), 0x29B1);
    }

    #[test]
    fn padding_is_ignored_on_decode() {
        let block: Block = "B129FFFF".parse().unwrap();
        assert_eq!(decode_from_storage(&block), 0x29B1);
    }
}
