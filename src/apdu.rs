//! Command framing for the PC/SC pseudo APDUs used to access the tag memory.

use crate::block::Block;
use crate::error::{Error, TransportFault};

/// Size of a block in bytes.
pub const BLOCK_SIZE: usize = 4;
/// Blocks `0..CONFIG_BLOCKS` hold the configuration covered by the CRC.
pub const CONFIG_BLOCKS: u8 = 48;
/// Block holding the stored CRC.
pub const CRC_BLOCK: u8 = 48;
/// Number of addressable blocks.
pub const BLOCK_COUNT: u8 = CRC_BLOCK + 1;

pub const STATUS_OK: u16 = 0x9000;
pub const STATUS_WRONG_LENGTH: u16 = 0x6700;
pub const STATUS_NOT_FOUND: u16 = 0x6A82;
pub const STATUS_INS_NOT_SUPPORTED: u16 = 0x6D00;

const CLA: u8 = 0xFF;
const INS_READ_BINARY: u8 = 0xB0;
const INS_UPDATE_BINARY: u8 = 0xD6;
const INS_GET_DATA: u8 = 0xCA;

/// The three commands the core ever sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `FF B0 {block:04X} 04`
    ReadBlock(u8),
    /// `FF D6 {block:04X} 04 {data}`
    WriteBlock(u8, Block),
    /// `FF CA 00 00 00`
    GetUid,
}

impl Command {
    /// Builds the command bytes. Fails for block numbers outside `0..=48`.
    pub fn encode(&self) -> Result<Vec<u8>, Error> {
        match *self {
            Command::ReadBlock(block) => {
                let [p1, p2] = address(block)?;
                Ok(vec![CLA, INS_READ_BINARY, p1, p2, BLOCK_SIZE as u8])
            }
            Command::WriteBlock(block, data) => {
                let [p1, p2] = address(block)?;
                let mut apdu = vec![CLA, INS_UPDATE_BINARY, p1, p2, BLOCK_SIZE as u8];
                apdu.extend_from_slice(data.as_bytes());
                Ok(apdu)
            }
            Command::GetUid => Ok(vec![CLA, INS_GET_DATA, 0x00, 0x00, 0x00]),
        }
    }

    /// Parses command bytes back into a [`Command`], the way a reader would.
    ///
    /// Returns the status word a reader answers with for malformed or unsupported commands.
    pub fn parse(apdu: &[u8]) -> Result<Command, u16> {
        let [cla, ins, p1, p2, lc, payload @ ..] = apdu else {
            return Err(STATUS_WRONG_LENGTH);
        };
        if *cla != CLA {
            return Err(STATUS_INS_NOT_SUPPORTED);
        }
        let address = u16::from_be_bytes([*p1, *p2]);
        match *ins {
            INS_GET_DATA if address == 0 && *lc == 0 && payload.is_empty() => Ok(Command::GetUid),
            INS_READ_BINARY | INS_UPDATE_BINARY if *lc as usize != BLOCK_SIZE => {
                Err(STATUS_WRONG_LENGTH)
            }
            INS_READ_BINARY | INS_UPDATE_BINARY if address >= BLOCK_COUNT as u16 => {
                Err(STATUS_NOT_FOUND)
            }
            INS_READ_BINARY if payload.is_empty() => Ok(Command::ReadBlock(address as u8)),
            INS_UPDATE_BINARY => Block::try_from(payload)
                .map(|data| Command::WriteBlock(address as u8, data))
                .map_err(|_| STATUS_WRONG_LENGTH),
            INS_GET_DATA | INS_READ_BINARY => Err(STATUS_WRONG_LENGTH),
            _ => Err(STATUS_INS_NOT_SUPPORTED),
        }
    }
}

fn address(block: u8) -> Result<[u8; 2], Error> {
    if block >= BLOCK_COUNT {
        return Err(Error::encoding(
            "block number",
            format!("{block} is outside 0..={CRC_BLOCK}"),
        ));
    }
    Ok(u16::from(block).to_be_bytes())
}

/// Checks the trailing status word and returns the data in front of it.
pub fn strip_status(response: &[u8]) -> Result<&[u8], TransportFault> {
    let [data @ .., sw1, sw2] = response else {
        return Err(TransportFault::ShortResponse(response.len()));
    };
    match u16::from_be_bytes([*sw1, *sw2]) {
        STATUS_OK => Ok(data),
        sw => Err(TransportFault::StatusWord(sw)),
    }
}
