//! Code tables for the enumerated settings.
//!
//! Codes without a table entry decode to [`Coded::Unknown`] and print the table's sentinel label
//! ("Unknown", "Not Selected"). The beacon type is the exception: an unknown SKU is an error,
//! see [`Sku::from_code`].

use std::fmt;

use strum::{Display, EnumIter, FromRepr};

use crate::error::Error;

/// A code table.
pub trait Lookup: Sized + Copy {
    /// Label printed for codes without an entry.
    const UNKNOWN: &'static str;

    fn from_code(code: u8) -> Option<Self>;

    fn code(self) -> u8;
}

/// A decoded code that may or may not be in its table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coded<T> {
    Known(T),
    Unknown(u8),
}

impl<T: Lookup> Coded<T> {
    pub fn from_code(code: u8) -> Self {
        T::from_code(code).map_or(Coded::Unknown(code), Coded::Known)
    }

    pub fn code(&self) -> u8 {
        match *self {
            Coded::Known(value) => value.code(),
            Coded::Unknown(code) => code,
        }
    }
}

impl<T: Lookup + fmt::Display> fmt::Display for Coded<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Coded::Known(value) => value.fmt(f),
            Coded::Unknown(_) => f.write_str(T::UNKNOWN),
        }
    }
}

macro_rules! lookup {
    ($ty:ty, $unknown:literal) => {
        impl Lookup for $ty {
            const UNKNOWN: &'static str = $unknown;

            fn from_code(code: u8) -> Option<Self> {
                Self::from_repr(code)
            }

            fn code(self) -> u8 {
                self as u8
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr, Display)]
#[repr(u8)]
pub enum LoraRegion {
    #[strum(to_string = "AS 923MHz_GRP1")]
    As923Group1 = 0x00,
    #[strum(to_string = "AU 915MHz")]
    Au915 = 0x01,
    #[strum(to_string = "EU 868MHz")]
    Eu868 = 0x05,
    #[strum(to_string = "SK 930MHz")]
    Sk930 = 0x06,
    #[strum(to_string = "IN 865MHz")]
    In865 = 0x07,
    #[strum(to_string = "US 915MHz")]
    Us915 = 0x08,
    #[strum(to_string = "AS923_GRP2")]
    As923Group2 = 0x10,
    #[strum(to_string = "AS923_GRP3")]
    As923Group3 = 0x11,
}
lookup!(LoraRegion, "Not Selected");

/// BLE transmit power. The code is the power in dBm as a signed byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr, Display, EnumIter)]
#[repr(u8)]
pub enum BleGain {
    #[strum(to_string = "-40dBm")]
    Minus40 = 0xD8,
    #[strum(to_string = "-20dBm")]
    Minus20 = 0xEC,
    #[strum(to_string = "-16dBm")]
    Minus16 = 0xF0,
    #[strum(to_string = "-12dBm")]
    Minus12 = 0xF4,
    #[strum(to_string = "-8dBm")]
    Minus8 = 0xF8,
    #[strum(to_string = "-4dBm")]
    Minus4 = 0xFC,
    #[strum(to_string = "0dBm")]
    Zero = 0x00,
    #[strum(to_string = "3dBm")]
    Plus3 = 0x03,
    #[strum(to_string = "4dBm")]
    Plus4 = 0x04,
}
lookup!(BleGain, "Unknown");

impl BleGain {
    pub fn dbm(self) -> i8 {
        self as u8 as i8
    }
}

/// LoRaWAN class B ping slot period, `2^code` seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr, Display, EnumIter)]
#[repr(u8)]
pub enum PingSlotPeriod {
    #[strum(to_string = "1 s")]
    S1 = 0,
    #[strum(to_string = "2 s")]
    S2 = 1,
    #[strum(to_string = "4 s")]
    S4 = 2,
    #[strum(to_string = "8 s")]
    S8 = 3,
    #[strum(to_string = "16 s")]
    S16 = 4,
    #[strum(to_string = "32 s")]
    S32 = 5,
    #[strum(to_string = "64 s")]
    S64 = 6,
    #[strum(to_string = "128 s")]
    S128 = 7,
}
lookup!(PingSlotPeriod, "Unknown");

impl PingSlotPeriod {
    pub fn seconds(self) -> u16 {
        1 << self as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr, Display)]
#[repr(u8)]
pub enum SleepState {
    Asleep = 0,
    Awake = 1,
}
lookup!(SleepState, "Unknown");

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr, Display)]
#[repr(u8)]
pub enum DebugTones {
    #[strum(to_string = "Tones Disabled")]
    Disabled = 0,
    #[strum(to_string = "Tones Enabled")]
    Enabled = 1,
}
lookup!(DebugTones, "Unknown");

/// Which identifier the beacon uses as its LoRa MAC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr, Display)]
#[repr(u8)]
pub enum MacOption {
    #[strum(to_string = "LoRa Module")]
    LoraModule = 0,
    #[strum(to_string = "LoRa DevEUI")]
    LoraDevEui = 1,
}
lookup!(MacOption, "Unknown");

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr, Display)]
#[repr(u8)]
pub enum ThresholdDirection {
    Below = 0,
    Above = 1,
}
lookup!(ThresholdDirection, "Unknown");

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr, Display)]
#[repr(u8)]
pub enum RangeType {
    #[strum(to_string = "Short 1.3m")]
    Short = 0,
    #[strum(to_string = "Long 4m")]
    Long = 1,
}
lookup!(RangeType, "Unknown");

/// Position engine BLE scan mode. Codes are bit groups read LSB first, see
/// [`lsb_first_bits`](crate::codec::lsb_first_bits).
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr, Display)]
#[repr(u8)]
pub enum BleRefMode {
    Disabled = 0b00,
    #[strum(to_string = "BluFi")]
    BluFi = 0b01,
    #[strum(to_string = "Reference Tags")]
    ReferenceTags = 0b10,
}
lookup!(BleRefMode, "Unknown");

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr, Display)]
#[repr(u8)]
pub enum ClassSelect {
    #[strum(to_string = "Class A")]
    ClassA = 0b00,
    #[strum(to_string = "Class C")]
    ClassC = 0b01,
    #[strum(to_string = "Class B")]
    ClassB = 0b10,
}
lookup!(ClassSelect, "Unknown");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Toggle {
    Disabled,
    Enabled,
}

impl From<bool> for Toggle {
    fn from(enabled: bool) -> Self {
        if enabled {
            Toggle::Enabled
        } else {
            Toggle::Disabled
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum AdvertisingType {
    Default,
    #[strum(to_string = "sBeacon")]
    SBeacon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpreadingFactor {
    /// Adaptive data rate, stored as `0xFF`.
    Adr,
    Fixed(u8),
}

impl SpreadingFactor {
    pub fn from_code(code: u8) -> Self {
        match code {
            0xFF => SpreadingFactor::Adr,
            sf => SpreadingFactor::Fixed(sf),
        }
    }
}

impl fmt::Display for SpreadingFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpreadingFactor::Adr => f.write_str("ADR"),
            SpreadingFactor::Fixed(sf) => write!(f, "{sf}"),
        }
    }
}

/// Beacon product line, stored as the SKU byte in block 15.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Sku {
    /// Codes `00`, `01` and `FF`: the tag was never assigned a product.
    #[strum(to_string = "Please select the tag type")]
    NotSelected,
    #[strum(to_string = "Sense Condition Alert")]
    ConditionAlert,
    #[strum(to_string = "Sense Condition Range Finder")]
    RangeFinder,
    #[strum(to_string = "Sense Asset BLE")]
    AssetBle,
    #[strum(to_string = "Sense Asset XL")]
    AssetXl,
    #[strum(to_string = "Sense Asset Temp")]
    AssetTemp,
    #[strum(to_string = "Sense Shield/Badge/Lite")]
    ShieldBadgeLite,
    #[strum(to_string = "Sense Asset +")]
    AssetPlus,
    #[strum(to_string = "Sense Asset")]
    Asset,
    #[strum(to_string = "Sense Wirepass")]
    Wirepass,
}

impl Sku {
    /// Strict lookup, unknown codes are an error.
    pub fn from_code(code: u8) -> Result<Self, Error> {
        Ok(match code {
            0x00 | 0x01 | 0xFF => Sku::NotSelected,
            0x08 => Sku::ConditionAlert,
            0x09 => Sku::RangeFinder,
            0x0D => Sku::AssetBle,
            0x12 => Sku::AssetXl,
            0x13 => Sku::AssetTemp,
            0x14 => Sku::ShieldBadgeLite,
            0x15 => Sku::AssetPlus,
            0x16 => Sku::Asset,
            0x17 => Sku::Wirepass,
            code => return Err(Error::UnknownBeaconType(code)),
        })
    }

    /// Name of the product picture used by the programming tools.
    pub fn image(self) -> &'static str {
        match self {
            Sku::NotSelected => "",
            Sku::AssetBle | Sku::AssetTemp | Sku::Asset => "Sense_BLE_Small",
            Sku::AssetXl => "Asset_Small",
            Sku::RangeFinder => "Range_Small",
            Sku::ConditionAlert => "Button_Small",
            Sku::ShieldBadgeLite | Sku::Wirepass => "Social2",
            Sku::AssetPlus => "Ditto_correct_200_trans",
        }
    }
}

/// SKU byte together with its product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeaconInfo {
    pub code: u8,
    pub sku: Sku,
}

impl BeaconInfo {
    pub fn from_code(code: u8) -> Result<Self, Error> {
        Ok(Self {
            code,
            sku: Sku::from_code(code)?,
        })
    }

    pub fn name(&self) -> String {
        self.sku.to_string()
    }

    pub fn image(&self) -> &'static str {
        self.sku.image()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use strum::IntoEnumIterator;

    #[test]
    fn ble_gain_table() {
        assert_eq!(Coded::<BleGain>::from_code(0xD8).to_string(), "-40dBm");
        assert_eq!(Coded::<BleGain>::from_code(0x04).to_string(), "4dBm");
        assert_eq!(Coded::<BleGain>::from_code(0x42).to_string(), "Unknown");
        assert_eq!(Coded::<BleGain>::from_code(0x42).code(), 0x42);
        for gain in BleGain::iter() {
            assert_eq!(format!("{}dBm", gain.dbm()), gain.to_string());
        }
    }

    #[test]
    fn region_table() {
        assert_eq!(Coded::<LoraRegion>::from_code(0x08).to_string(), "US 915MHz");
        assert_eq!(Coded::<LoraRegion>::from_code(0x10).to_string(), "AS923_GRP2");
        assert_eq!(Coded::<LoraRegion>::from_code(0x02).to_string(), "Not Selected");
        assert_eq!(Coded::<LoraRegion>::from_code(0x0A).to_string(), "Not Selected");
    }

    #[test]
    fn ping_slot_table() {
        for period in PingSlotPeriod::iter() {
            assert_eq!(format!("{} s", period.seconds()), period.to_string());
        }
        assert_eq!(Coded::<PingSlotPeriod>::from_code(8).to_string(), "Unknown");
    }

    #[test]
    fn sku_lookup_is_strict() {
        assert_eq!(Sku::from_code(0x15).unwrap(), Sku::AssetPlus);
        assert_eq!(Sku::from_code(0xFF).unwrap(), Sku::NotSelected);
        assert_eq!(Sku::from_code(0x42), Err(Error::UnknownBeaconType(0x42)));

        let info = BeaconInfo::from_code(0x09).unwrap();
        assert_eq!(info.name(), "Sense Condition Range Finder");
        assert_eq!(info.image(), "Range_Small");
    }

    #[test]
    fn spreading_factor() {
        assert_eq!(SpreadingFactor::from_code(0xFF).to_string(), "ADR");
        assert_eq!(SpreadingFactor::from_code(10).to_string(), "10");
    }
}
