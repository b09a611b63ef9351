#![allow(dead_code)]

// filename according to https://doc.rust-lang.org/book/ch11-03-test-organization.html
use std::fmt;

use beacon_tag::apdu::{Command, STATUS_OK};
use beacon_tag::{Block, TagImage, Transport};

/// A tag in memory that records every exchange and can drop the connection after a given number
/// of them.
pub struct FaultyTag {
    pub image: TagImage,
    pub fail_after_operation: usize,
    pub operations: Vec<Operation>,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Operation {
    Read { block: u8 },
    Write { block: u8, data: Block },
    Uid,
}

impl FaultyTag {
    pub fn new(image: TagImage) -> Self {
        Self {
            image,
            fail_after_operation: usize::MAX,
            operations: Vec::new(),
        }
    }

    pub fn new_with_fault(image: TagImage, fail_after_operation: usize) -> Self {
        Self {
            image,
            fail_after_operation,
            operations: Vec::new(),
        }
    }

    pub fn erased() -> Self {
        Self::new(TagImage::erased())
    }

    pub fn disable_faults(&mut self) {
        self.fail_after_operation = usize::MAX;
    }

    pub fn writes(&self) -> Vec<u8> {
        self.operations
            .iter()
            .filter_map(|op| match op {
                Operation::Write { block, .. } => Some(*block),
                _ => None,
            })
            .collect()
    }

    pub fn block(&self, number: u8) -> Block {
        self.image.blocks()[number as usize]
    }

    pub fn dump_operations(&self) {
        println!("Operations:");
        for op in &self.operations {
            println!("  {:?}", op);
        }
    }
}

#[derive(Debug)]
pub struct ConnectionLost;

impl fmt::Display for ConnectionLost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("tag left the field")
    }
}

impl std::error::Error for ConnectionLost {}

impl Transport for FaultyTag {
    type Error = ConnectionLost;

    fn transmit(&mut self, command: &[u8]) -> Result<Vec<u8>, Self::Error> {
        let operation = match Command::parse(command) {
            Ok(Command::ReadBlock(block)) => Operation::Read { block },
            Ok(Command::WriteBlock(block, data)) => Operation::Write { block, data },
            Ok(Command::GetUid) => Operation::Uid,
            Err(status) => return Ok(status.to_be_bytes().to_vec()),
        };
        println!("    tag: {operation:?} #{:>2}", self.operations.len());

        if self.operations.len() >= self.fail_after_operation {
            println!("    tag: FAULT");
            return Err(ConnectionLost);
        }
        self.operations.push(operation);

        let response = self.image.transmit(command).unwrap_or_else(|e| match e {});
        assert!(response.ends_with(&STATUS_OK.to_be_bytes()));
        Ok(response)
    }
}

/// A transport that answers every command with the same bytes.
pub struct Scripted(pub Vec<u8>);

impl Transport for Scripted {
    type Error = ConnectionLost;

    fn transmit(&mut self, _command: &[u8]) -> Result<Vec<u8>, Self::Error> {
        Ok(self.0.clone())
    }
}
