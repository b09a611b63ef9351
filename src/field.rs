//! Typed access to the logical fields stored on the tag.
//!
//! Every field is a unit struct implementing [`Field`]: it knows which blocks it occupies and how
//! to decode its value from them. Fields that can be programmed also implement
//! [`WritableField`]. [`Tag::get`] and [`Tag::set`] do the block I/O around them.
//!
//! Byte `n` below means byte `n` of the block, nibble `n` counts the hex digits of the block from
//! the left.

use log::info;

use crate::block::BlockSet;
use crate::codec::{self, Eui64, MacAddress};
use crate::error::Error;
use crate::lookup::{self, AdvertisingType, BeaconInfo, Coded, Lookup, Toggle};
use crate::transport::Transport;
use crate::Tag;

pub trait Field {
    /// Human readable name used in logs and errors.
    const NAME: &'static str;
    /// Blocks the field occupies, in the order their bytes are concatenated.
    const BLOCKS: &'static [u8];

    type Value;

    /// Decodes the field from `blocks`, which has to contain at least [`Field::BLOCKS`].
    fn decode(blocks: &BlockSet) -> Result<Self::Value, Error>;
}

pub trait WritableField: Field {
    type Input: ?Sized;

    /// Set if other fields live in the same blocks. Those blocks are read before encoding so the
    /// other fields keep their content. Otherwise encoding starts from zeroed blocks.
    const SHARES_BLOCKS: bool;

    /// Validates `value` and writes it into `blocks`. Must not fail after touching `blocks`
    /// partially, nothing is written to the tag if this returns an error.
    fn encode(value: &Self::Input, blocks: &mut BlockSet) -> Result<(), Error>;
}

impl<T: Transport> Tag<T> {
    /// Reads the blocks of `F` and decodes it.
    pub fn get<F: Field>(&mut self) -> Result<F::Value, Error> {
        let blocks = self.read_blocks(F::BLOCKS)?;
        F::decode(&blocks)
    }

    /// Encodes `value`, writes every block of `F` in order and restamps the CRC.
    ///
    /// Blocks are written one by one. If a later block write fails the earlier ones stay on the
    /// tag and the stored CRC is stale, which the next [`Tag::validate_crc`] reports.
    pub fn set<F: WritableField>(&mut self, value: &F::Input) -> Result<(), Error> {
        let mut blocks = if F::SHARES_BLOCKS {
            self.read_blocks(F::BLOCKS)?
        } else {
            BlockSet::zeroed(F::BLOCKS)
        };
        F::encode(value, &mut blocks)?;

        for &number in F::BLOCKS {
            self.write_block(number, blocks.get(number)?)?;
        }
        info!("{} written", F::NAME);

        self.recompute_crc()?;
        Ok(())
    }
}

macro_rules! field {
    (
        $(#[$meta:meta])*
        $name:ident: $value:ty = $label:literal @ [$($block:literal),+],
        |$blocks:ident| $decode:expr
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $name;

        impl Field for $name {
            const NAME: &'static str = $label;
            const BLOCKS: &'static [u8] = &[$($block),+];

            type Value = $value;

            fn decode($blocks: &BlockSet) -> Result<Self::Value, Error> {
                $decode
            }
        }
    };
}

fn byte(blocks: &BlockSet, block: u8, index: usize) -> Result<u8, Error> {
    Ok(blocks.get(block)?.byte(index))
}

fn nibble(blocks: &BlockSet, block: u8, index: usize) -> Result<u8, Error> {
    Ok(blocks.get(block)?.nibble(index))
}

fn coded<T: Lookup>(code: u8) -> Result<Coded<T>, Error> {
    Ok(Coded::from_code(code))
}

fn bcd(blocks: &BlockSet, block: u8, bytes: core::ops::Range<usize>) -> Result<u32, Error> {
    codec::bcd_decode(block, &blocks.get(block)?.as_bytes()[bytes])
}

fn array<const N: usize>(blocks: &BlockSet, numbers: &[u8]) -> Result<[u8; N], Error> {
    let bytes = blocks.concat(numbers)?;
    let len = bytes.len();
    bytes
        .get(..N)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| Error::decode(numbers[0], format!("{len} bytes are too short for {N}")))
}

// Identity

field!(
    /// LoRaWAN JoinEUI. Printed as plain hex by the tooling, see [`Eui64::to_hex`].
    JoinEui: Eui64 = "JoinEUI" @ [0, 1],
    |blocks| Ok(Eui64(array(blocks, Self::BLOCKS)?))
);

field!(
    /// LoRaWAN join (application) key.
    JoinKey: codec::JoinKey = "join key" @ [3, 4, 5, 6],
    |blocks| Ok(codec::JoinKey(array(blocks, Self::BLOCKS)?))
);

field!(
    /// LoRaWAN DevEUI, also used as the LoRa MAC.
    DevEui: Eui64 = "DevEUI" @ [11, 12],
    |blocks| Ok(Eui64(array(blocks, Self::BLOCKS)?))
);

field!(
    /// BLE MAC, stored least significant byte first in block 18 and bytes 0-1 of block 19.
    BleMac: MacAddress = "BLE MAC" @ [18, 19],
    |blocks| {
        let mut mac: [u8; 6] = array(blocks, Self::BLOCKS)?;
        mac.reverse();
        Ok(MacAddress(mac))
    }
);

field!(
    /// BLE local name as ASCII, NUL padded.
    BleLocalName: String = "BLE local name" @ [22, 23],
    |blocks| Ok(codec::ascii_text(&blocks.concat(Self::BLOCKS)?))
);

field!(
    /// The BLE local name bytes read as UTF-16 big endian code units.
    BleLocalNameUtf16: String = "BLE local name (UTF-16)" @ [22, 23],
    |blocks| Ok(codec::utf16_be_text(&blocks.concat(Self::BLOCKS)?))
);

field!(
    /// SKU byte, byte 2 of block 15. Unknown codes are an error.
    BeaconType: BeaconInfo = "beacon type" @ [15],
    |blocks| BeaconInfo::from_code(byte(blocks, 15, 2)?)
);

field!(
    HardwareVersion: u8 = "hardware version" @ [15],
    |blocks| nibble(blocks, 15, 1)
);

field!(
    FirmwareVersion: codec::FirmwareVersion = "firmware version" @ [15],
    |blocks| Ok(codec::FirmwareVersion(byte(blocks, 15, 1)?))
);

// LoRa radio

field!(
    LoraEnable: Toggle = "LoRa enable" @ [7],
    |blocks| Ok(Toggle::from(byte(blocks, 7, 0)? == 0x01))
);

field!(
    LoraRegion: Coded<lookup::LoraRegion> = "LoRa region" @ [7],
    |blocks| coded(byte(blocks, 7, 1)?)
);

field!(
    SpreadingFactor: lookup::SpreadingFactor = "spreading factor" @ [8],
    |blocks| Ok(lookup::SpreadingFactor::from_code(byte(blocks, 8, 0)?))
);

field!(
    /// Heartbeat rate in hours.
    DownlinkRate: u8 = "downlink rate" @ [8],
    |blocks| Ok(bcd(blocks, 8, 1..2)? as u8)
);

field!(
    UplinkRate: u8 = "uplink rate" @ [8],
    |blocks| Ok(bcd(blocks, 8, 2..3)? as u8)
);

field!(
    /// Alert rate in minutes.
    AlertRate: u8 = "ABR" @ [19],
    |blocks| Ok(bcd(blocks, 19, 2..3)? as u8)
);

field!(
    PingSlotPeriod: Coded<lookup::PingSlotPeriod> = "ping slot period" @ [29],
    |blocks| coded(byte(blocks, 29, 3)?)
);

field!(
    /// Class B beacon timeout.
    ClassBTimeout: u8 = "class B timeout" @ [30],
    |blocks| byte(blocks, 30, 0)
);

field!(
    /// Bits 4-5 of byte 3 of block 30, LSB first.
    ClassSelect: Coded<lookup::ClassSelect> = "class select" @ [30],
    |blocks| coded(codec::lsb_first_bits(byte(blocks, 30, 3)?, 4, 2))
);

field!(
    ConfirmedUplinks: Toggle = "confirmed uplinks" @ [31],
    |blocks| Ok(Toggle::from(codec::lsb_first_bits(byte(blocks, 31, 0)?, 0, 1) == 1))
);

field!(
    /// Sub-band hopping.
    Hopping: Toggle = "hopping" @ [31],
    |blocks| Ok(Toggle::from(codec::lsb_first_bits(byte(blocks, 31, 0)?, 4, 1) == 1))
);

field!(
    /// `01` disables the uplink on button press, anything else enables it.
    PressUplink: Toggle = "button press uplink" @ [29],
    |blocks| Ok(Toggle::from(byte(blocks, 29, 2)? != 0x01))
);

// Device state, block 13

field!(
    /// Nibble 2 of block 13, `0` is asleep.
    SleepState: Coded<lookup::SleepState> = "sleep state" @ [13],
    |blocks| coded(nibble(blocks, 13, 2)?)
);

field!(
    DebugTones: Coded<lookup::DebugTones> = "debug tones" @ [13],
    |blocks| coded(nibble(blocks, 13, 3)?)
);

field!(
    MacOption: Coded<lookup::MacOption> = "MAC option" @ [13],
    |blocks| coded(nibble(blocks, 13, 4)?)
);

field!(
    /// Range finder and alert products reuse the MAC option nibble.
    ThresholdDirection: Coded<lookup::ThresholdDirection> = "min/max threshold" @ [13],
    |blocks| coded(nibble(blocks, 13, 4)?)
);

field!(
    RangeType: Coded<lookup::RangeType> = "range type" @ [13],
    |blocks| coded(nibble(blocks, 13, 6)?)
);

// Sensors and motion

field!(
    HighTemperature: i16 = "high temperature" @ [8],
    |blocks| Ok(codec::bias_decode(byte(blocks, 8, 3)?))
);

field!(
    LowTemperature: i16 = "low temperature" @ [9],
    |blocks| Ok(codec::bias_decode(byte(blocks, 9, 0)?))
);

field!(
    /// Accelerometer motion threshold.
    MotionThreshold: u8 = "motion threshold" @ [9],
    |blocks| Ok(bcd(blocks, 9, 1..2)? as u8)
);

field!(
    /// Stationary to moved threshold.
    MotionMoved: u16 = "stationary to moved threshold" @ [20],
    |blocks| Ok(blocks.get(20)?.le_u16(2))
);

field!(
    /// Moved to stationary threshold.
    MotionStationary: u16 = "moved to stationary threshold" @ [21],
    |blocks| Ok(blocks.get(21)?.le_u16(0))
);

field!(
    ActivityWindow: u8 = "activity window" @ [21],
    |blocks| byte(blocks, 21, 2)
);

field!(
    ActivityThreshold: u8 = "activity threshold" @ [21],
    |blocks| byte(blocks, 21, 3)
);

field!(
    /// Range finder only.
    RangeThreshold: u16 = "range threshold" @ [9],
    |blocks| Ok(bcd(blocks, 9, 2..4)? as u16)
);

field!(
    /// Range finder only.
    SensorPeriod: u8 = "sensor period" @ [10],
    |blocks| Ok(bcd(blocks, 10, 0..1)? as u8)
);

field!(
    /// Range finder only.
    RangeOffset: u8 = "range offset" @ [10],
    |blocks| Ok(bcd(blocks, 10, 2..3)? as u8)
);

field!(
    /// Range finder only, in metres. Stored in units of 10 m.
    MaximumRange: u16 = "maximum range" @ [10],
    |blocks| Ok(bcd(blocks, 10, 3..4)? as u16 * 10)
);

// GNSS

field!(
    /// Binary. The LoRa product lines store decimal digits here, see [`LoraGnssMin`].
    GnssMin: u8 = "GNSS min" @ [14],
    |blocks| byte(blocks, 14, 0)
);

field!(
    /// GNSS max lock time in minutes, binary. See [`LoraGnssMax`] for the LoRa product lines.
    GnssMax: u8 = "GNSS max" @ [14],
    |blocks| byte(blocks, 14, 1)
);

field!(
    /// DOP threshold. Stored in tenths but only whole units are used, the remainder is
    /// dropped. See [`LoraDop`] for the LoRa product lines.
    Dop: u8 = "DOP" @ [14],
    |blocks| Ok(byte(blocks, 14, 2)? / 10)
);

field!(
    /// Byte 0 of block 14 as two decimal digits.
    LoraGnssMin: u8 = "GNSS min" @ [14],
    |blocks| Ok(bcd(blocks, 14, 0..1)? as u8)
);

field!(
    /// Byte 1 of block 14 as two decimal digits.
    LoraGnssMax: u8 = "GNSS max" @ [14],
    |blocks| Ok(bcd(blocks, 14, 1..2)? as u8)
);

field!(
    /// Byte 2 of block 14 as two decimal digits counting tenths, `32` is 3.2.
    LoraDop: codec::Tenths = "DOP" @ [14],
    |blocks| Ok(codec::Tenths(bcd(blocks, 14, 2..3)? as u8))
);

field!(
    OperationalMode: u8 = "operational mode" @ [14],
    |blocks| byte(blocks, 14, 3)
);

// BLE

field!(
    BleGain: Coded<lookup::BleGain> = "BLE TX power" @ [19],
    |blocks| coded(byte(blocks, 19, 3)?)
);

field!(
    /// Advertising interval in ms.
    BleAdvertisingInterval: u16 = "BLE advertising interval" @ [24],
    |blocks| Ok(blocks.get(24)?.le_u16(0))
);

field!(
    /// Position engine scan duration in ms.
    BleRefScanInterval: u16 = "BLE reference scan interval" @ [24],
    |blocks| Ok(blocks.get(24)?.le_u16(2))
);

field!(
    BleRefRssi: i8 = "BLE reference RSSI" @ [25],
    |blocks| Ok(codec::twos_complement(byte(blocks, 25, 0)?))
);

field!(
    /// Reference tag filter id, 16 bytes from byte 1 of block 25 to byte 0 of block 29.
    BleRefFilter: String = "BLE reference filter" @ [25, 26, 27, 28, 29],
    |blocks| Ok(codec::latin1_text(&blocks.concat(Self::BLOCKS)?[1..17]))
);

field!(
    BleAdvertisingType: AdvertisingType = "BLE advertising type" @ [29],
    |blocks| Ok(match byte(blocks, 29, 1)? {
        0x01 => AdvertisingType::SBeacon,
        _ => AdvertisingType::Default,
    })
);

field!(
    /// Bits 0-1 of byte 3 of block 30, LSB first.
    BleRefMode: Coded<lookup::BleRefMode> = "BLE reference mode" @ [30],
    |blocks| coded(codec::lsb_first_bits(byte(blocks, 30, 3)?, 0, 2))
);

// Writers

impl WritableField for JoinEui {
    type Input = Eui64;
    const SHARES_BLOCKS: bool = false;

    fn encode(value: &Eui64, blocks: &mut BlockSet) -> Result<(), Error> {
        blocks.scatter(Self::BLOCKS, &value.0);
        Ok(())
    }
}

impl WritableField for JoinKey {
    type Input = codec::JoinKey;
    const SHARES_BLOCKS: bool = false;

    fn encode(value: &codec::JoinKey, blocks: &mut BlockSet) -> Result<(), Error> {
        blocks.scatter(Self::BLOCKS, &value.0);
        Ok(())
    }
}

impl WritableField for DevEui {
    type Input = Eui64;
    const SHARES_BLOCKS: bool = false;

    fn encode(value: &Eui64, blocks: &mut BlockSet) -> Result<(), Error> {
        blocks.scatter(Self::BLOCKS, &value.0);
        Ok(())
    }
}

impl WritableField for BleLocalName {
    type Input = str;
    const SHARES_BLOCKS: bool = false;

    fn encode(value: &str, blocks: &mut BlockSet) -> Result<(), Error> {
        let bytes = codec::ascii_encode(Self::NAME, value, 8)?;
        blocks.scatter(Self::BLOCKS, &bytes);
        Ok(())
    }
}

impl WritableField for SleepState {
    type Input = lookup::SleepState;
    const SHARES_BLOCKS: bool = true;

    fn encode(value: &lookup::SleepState, blocks: &mut BlockSet) -> Result<(), Error> {
        blocks.get_mut(13)?.set_nibble(2, value.code());
        Ok(())
    }
}

impl WritableField for HighTemperature {
    type Input = i16;
    const SHARES_BLOCKS: bool = true;

    fn encode(value: &i16, blocks: &mut BlockSet) -> Result<(), Error> {
        let byte = codec::bias_encode(Self::NAME, *value)?;
        blocks.get_mut(8)?.set_byte(3, byte);
        Ok(())
    }
}

impl WritableField for LowTemperature {
    type Input = i16;
    const SHARES_BLOCKS: bool = true;

    fn encode(value: &i16, blocks: &mut BlockSet) -> Result<(), Error> {
        let byte = codec::bias_encode(Self::NAME, *value)?;
        blocks.get_mut(9)?.set_byte(0, byte);
        Ok(())
    }
}

impl WritableField for Dop {
    type Input = u8;
    const SHARES_BLOCKS: bool = true;

    fn encode(value: &u8, blocks: &mut BlockSet) -> Result<(), Error> {
        let tenths = value
            .checked_mul(10)
            .ok_or_else(|| Error::encoding(Self::NAME, format!("{value} is above 25")))?;
        blocks.get_mut(14)?.set_byte(2, tenths);
        Ok(())
    }
}

impl WritableField for BleAdvertisingInterval {
    type Input = u16;
    const SHARES_BLOCKS: bool = true;

    fn encode(value: &u16, blocks: &mut BlockSet) -> Result<(), Error> {
        blocks.get_mut(24)?.set_le_u16(0, *value);
        Ok(())
    }
}
