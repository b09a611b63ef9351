//! Codec and integrity layer for the M24LR configuration tag of BLE/LoRa asset beacons.
//!
//! The tag exposes 49 blocks of 4 bytes. Blocks 0-47 hold the beacon configuration, block 48
//! holds a CRC-16 over them. A [`Tag`] wraps a [`Transport`] (usually a PC/SC reader) and offers
//!
//! * block level access ([`Tag::read_block`], [`Tag::write_block`], [`Tag::uid`]),
//! * the CRC check ([`Tag::validate_crc`], [`Tag::recompute_crc`]),
//! * typed field access through the [`Field`] trait ([`Tag::get`], [`Tag::set`]),
//! * settings snapshots ([`Tag::read_ditto_settings`], [`Tag::read_lora_settings`]) and
//!   [`Tag::erase`].
//!
//! ```
//! use beacon_tag::{Tag, TagImage, field::DevEui};
//!
//! let mut tag = Tag::new(TagImage::erased());
//! tag.set::<DevEui>(&"0C1EF70000000D27".parse().unwrap()).unwrap();
//! assert_eq!(tag.get::<DevEui>().unwrap().to_string(), "0C:1E:F7:00:00:00:0D:27");
//! tag.validate_crc().unwrap();
//! ```

pub mod apdu;
pub mod block;
pub mod codec;
pub mod crc;
pub mod error;
pub mod field;
pub mod image;
pub mod lookup;
pub mod settings;
pub mod transport;

use std::sync::Arc;

use log::{debug, trace};

pub use apdu::{BLOCK_COUNT, BLOCK_SIZE, CONFIG_BLOCKS, CRC_BLOCK};
pub use block::{Block, BlockSet};
pub use error::{Error, Operation, TransportFault};
pub use field::{Field, WritableField};
pub use image::TagImage;
pub use settings::{DittoSettings, LoraCredentials, LoraSettings, Setting};
pub use transport::Transport;

use crate::apdu::Command;

/// A session with one tag. All operations take `&mut self`, so a session is used by exactly one
/// caller at a time. Nothing read from the tag is cached between calls.
pub struct Tag<T: Transport> {
    transport: T,
}

impl<T: Transport> Tag<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Gives back the transport, e.g. to disconnect the reader.
    pub fn into_inner(self) -> T {
        self.transport
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Reads the UID of the tag in the field.
    pub fn uid(&mut self) -> Result<Vec<u8>, Error> {
        self.exchange(Operation::GetUid, &Command::GetUid)
    }

    /// Reads a single block. `block` has to be in `0..=48`.
    pub fn read_block(&mut self, block: u8) -> Result<Block, Error> {
        let data = self.exchange(Operation::ReadBlock(block), &Command::ReadBlock(block))?;
        let block_data = Block::try_from(data.as_slice()).map_err(|_| {
            Error::decode(
                block,
                format!("expected {BLOCK_SIZE} data bytes, got {}", data.len()),
            )
        })?;
        trace!("block {block:>2}: {block_data}");
        Ok(block_data)
    }

    /// Writes a single block. `block` has to be in `0..=48`.
    ///
    /// This does not touch the CRC, see [`Tag::set`] and [`Tag::recompute_crc`].
    pub fn write_block(&mut self, block: u8, data: Block) -> Result<(), Error> {
        debug!("writing block {block:>2}: {data}");
        self.exchange(
            Operation::WriteBlock(block),
            &Command::WriteBlock(block, data),
        )?;
        Ok(())
    }

    /// Reads the given blocks in order. The first failing read aborts.
    pub fn read_blocks(&mut self, blocks: &[u8]) -> Result<BlockSet, Error> {
        let mut set = BlockSet::new();
        for &block in blocks {
            set.insert(block, self.read_block(block)?);
        }
        Ok(set)
    }

    /// Reads every block including the CRC block, in address order.
    pub fn dump(&mut self) -> Result<Vec<Block>, Error> {
        (0..BLOCK_COUNT).map(|block| self.read_block(block)).collect()
    }

    fn exchange(&mut self, op: Operation, command: &Command) -> Result<Vec<u8>, Error> {
        // rejects out of range block numbers before any I/O
        let apdu = command.encode()?;
        trace!("-> {}", hex::encode_upper(&apdu));
        let response = self
            .transport
            .transmit(&apdu)
            .map_err(|e| Error::Transport {
                op,
                fault: TransportFault::Channel(Arc::new(e)),
            })?;
        trace!("<- {}", hex::encode_upper(&response));
        apdu::strip_status(&response)
            .map(<[u8]>::to_vec)
            .map_err(|fault| Error::Transport { op, fault })
    }
}
