//! Settings snapshots and the programming operations built on the fields.
//!
//! A snapshot reads the blocks it needs once and decodes every field from that copy, so it is a
//! consistent view of the tag at one point in time. Any failing read or decode aborts the whole
//! snapshot.

use log::{info, warn};
use strum::Display;

use crate::apdu::CONFIG_BLOCKS;
use crate::block::{Block, BlockSet};
use crate::codec::{Eui64, FirmwareVersion, JoinKey, MacAddress, Tenths};
use crate::error::Error;
use crate::field::{self, Field};
use crate::lookup::{
    AdvertisingType, BeaconInfo, BleGain, BleRefMode, ClassSelect, Coded, DebugTones, LoraRegion,
    MacOption, PingSlotPeriod, RangeType, SleepState, Sku, SpreadingFactor, ThresholdDirection,
    Toggle,
};
use crate::transport::Transport;
use crate::Tag;

/// Blocks read for [`DittoSettings`].
pub const DITTO_BLOCKS: &[u8] = &[
    7, 8, 9, 13, 14, 15, 19, 20, 21, 24, 25, 26, 27, 28, 29, 30, 31,
];

/// Blocks read for [`LoraSettings`].
pub const LORA_BLOCKS: &[u8] = &[8, 9, 10, 11, 12, 13, 14, 15];

/// Blocks holding the iBeacon/Eddystone identifiers.
pub const UUID_BLOCKS: &[u8] = &[10, 11, 12, 13, 14];

/// Full settings of the Asset+ ("Ditto") product line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DittoSettings {
    pub beacon_type: BeaconInfo,
    pub hardware_version: u8,
    pub firmware_version: FirmwareVersion,
    pub sleep_state: Coded<SleepState>,
    pub debug_tones: Coded<DebugTones>,
    pub mac_option: Coded<MacOption>,
    pub spreading_factor: SpreadingFactor,
    pub downlink_rate: u8,
    pub uplink_rate: u8,
    pub high_temperature: i16,
    pub low_temperature: i16,
    pub motion_threshold: u8,
    pub gnss_min: u8,
    pub gnss_max: u8,
    pub dop: u8,
    pub operational_mode: u8,
    pub lora_enable: Toggle,
    pub lora_region: Coded<LoraRegion>,
    pub alert_rate: u8,
    pub ble_gain: Coded<BleGain>,
    pub motion_moved: u16,
    pub motion_stationary: u16,
    pub activity_window: u8,
    pub activity_threshold: u8,
    pub ble_advertising_interval: u16,
    pub ble_ref_scan_interval: u16,
    pub ble_ref_rssi: i8,
    pub ble_ref_filter: String,
    pub ble_advertising_type: AdvertisingType,
    pub press_uplink: Toggle,
    pub ping_slot_period: Coded<PingSlotPeriod>,
    pub class_b_timeout: u8,
    pub ble_ref_mode: Coded<BleRefMode>,
    pub class_select: Coded<ClassSelect>,
    pub confirmed_uplinks: Toggle,
    pub hopping: Toggle,
}

impl DittoSettings {
    /// Decodes the snapshot from blocks holding at least [`DITTO_BLOCKS`].
    pub fn decode(blocks: &BlockSet) -> Result<Self, Error> {
        Ok(Self {
            beacon_type: field::BeaconType::decode(blocks)?,
            hardware_version: field::HardwareVersion::decode(blocks)?,
            firmware_version: field::FirmwareVersion::decode(blocks)?,
            sleep_state: field::SleepState::decode(blocks)?,
            debug_tones: field::DebugTones::decode(blocks)?,
            mac_option: field::MacOption::decode(blocks)?,
            spreading_factor: field::SpreadingFactor::decode(blocks)?,
            downlink_rate: field::DownlinkRate::decode(blocks)?,
            uplink_rate: field::UplinkRate::decode(blocks)?,
            high_temperature: field::HighTemperature::decode(blocks)?,
            low_temperature: field::LowTemperature::decode(blocks)?,
            motion_threshold: field::MotionThreshold::decode(blocks)?,
            gnss_min: field::GnssMin::decode(blocks)?,
            gnss_max: field::GnssMax::decode(blocks)?,
            dop: field::Dop::decode(blocks)?,
            operational_mode: field::OperationalMode::decode(blocks)?,
            lora_enable: field::LoraEnable::decode(blocks)?,
            lora_region: field::LoraRegion::decode(blocks)?,
            alert_rate: field::AlertRate::decode(blocks)?,
            ble_gain: field::BleGain::decode(blocks)?,
            motion_moved: field::MotionMoved::decode(blocks)?,
            motion_stationary: field::MotionStationary::decode(blocks)?,
            activity_window: field::ActivityWindow::decode(blocks)?,
            activity_threshold: field::ActivityThreshold::decode(blocks)?,
            ble_advertising_interval: field::BleAdvertisingInterval::decode(blocks)?,
            ble_ref_scan_interval: field::BleRefScanInterval::decode(blocks)?,
            ble_ref_rssi: field::BleRefRssi::decode(blocks)?,
            ble_ref_filter: field::BleRefFilter::decode(blocks)?,
            ble_advertising_type: field::BleAdvertisingType::decode(blocks)?,
            press_uplink: field::PressUplink::decode(blocks)?,
            ping_slot_period: field::PingSlotPeriod::decode(blocks)?,
            class_b_timeout: field::ClassBTimeout::decode(blocks)?,
            ble_ref_mode: field::BleRefMode::decode(blocks)?,
            class_select: field::ClassSelect::decode(blocks)?,
            confirmed_uplinks: field::ConfirmedUplinks::decode(blocks)?,
            hopping: field::Hopping::decode(blocks)?,
        })
    }
}

/// Settings of the LoRa-only product lines, blocks 8-15.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoraSettings {
    pub beacon_type: BeaconInfo,
    pub hardware_version: u8,
    pub firmware_version: FirmwareVersion,
    pub sleep_state: Coded<SleepState>,
    pub threshold_direction: Coded<ThresholdDirection>,
    pub range_type: Coded<RangeType>,
    pub spreading_factor: SpreadingFactor,
    pub downlink_rate: u8,
    pub uplink_rate: u8,
    pub high_temperature: i16,
    pub low_temperature: i16,
    pub motion_threshold: u8,
    /// Decimal digits on these product lines, unlike the binary [`DittoSettings::gnss_min`].
    pub gnss_min: u8,
    pub gnss_max: u8,
    pub dop: Tenths,
    /// Only present on range finders.
    pub range_finder: Option<RangeFinderSettings>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeFinderSettings {
    pub range_threshold: u16,
    pub sensor_period: u8,
    pub range_offset: u8,
    /// In metres.
    pub maximum_range: u16,
}

impl LoraSettings {
    /// Decodes the snapshot from blocks holding at least [`LORA_BLOCKS`].
    pub fn decode(blocks: &BlockSet) -> Result<Self, Error> {
        let beacon_type = field::BeaconType::decode(blocks)?;
        let range_finder = if beacon_type.sku == Sku::RangeFinder {
            Some(RangeFinderSettings {
                range_threshold: field::RangeThreshold::decode(blocks)?,
                sensor_period: field::SensorPeriod::decode(blocks)?,
                range_offset: field::RangeOffset::decode(blocks)?,
                maximum_range: field::MaximumRange::decode(blocks)?,
            })
        } else {
            None
        };

        Ok(Self {
            beacon_type,
            hardware_version: field::HardwareVersion::decode(blocks)?,
            firmware_version: field::FirmwareVersion::decode(blocks)?,
            sleep_state: field::SleepState::decode(blocks)?,
            threshold_direction: field::ThresholdDirection::decode(blocks)?,
            range_type: field::RangeType::decode(blocks)?,
            spreading_factor: field::SpreadingFactor::decode(blocks)?,
            downlink_rate: field::DownlinkRate::decode(blocks)?,
            uplink_rate: field::UplinkRate::decode(blocks)?,
            high_temperature: field::HighTemperature::decode(blocks)?,
            low_temperature: field::LowTemperature::decode(blocks)?,
            motion_threshold: field::MotionThreshold::decode(blocks)?,
            gnss_min: field::LoraGnssMin::decode(blocks)?,
            gnss_max: field::LoraGnssMax::decode(blocks)?,
            dop: field::LoraDop::decode(blocks)?,
            range_finder,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum CrcStatus {
    #[strum(to_string = "VALID")]
    Valid,
    #[strum(to_string = "INVALID")]
    Invalid,
}

/// What a LoRaWAN network server needs to know about the beacon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoraCredentials {
    pub dev_eui: Eui64,
    pub join_eui: Eui64,
    pub join_key: JoinKey,
    pub crc: CrcStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacAddresses {
    /// The DevEUI doubles as LoRa MAC.
    pub lora: Eui64,
    pub ble: MacAddress,
}

/// Which advertising frame layout to read the identifiers with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum BeaconFrame {
    None,
    #[strum(to_string = "iBeacon")]
    IBeacon,
    Eddystone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UuidInfo {
    None,
    /// UUID in blocks 10-13, major and minor in block 14.
    IBeacon {
        uuid: [u8; 16],
        major: u16,
        minor: u16,
    },
    /// Namespace in blocks 10, 11 and the first half of 12, instance in the rest of 12 and 13.
    Eddystone {
        namespace: [u8; 10],
        instance: [u8; 6],
    },
}

impl UuidInfo {
    pub fn decode(frame: BeaconFrame, blocks: &BlockSet) -> Result<Self, Error> {
        if frame == BeaconFrame::None {
            return Ok(UuidInfo::None);
        }
        let bytes = blocks.concat(UUID_BLOCKS)?;
        // concat of five blocks is always 20 bytes long
        let mut uuid = [0u8; 16];
        uuid.copy_from_slice(&bytes[..16]);

        Ok(match frame {
            BeaconFrame::None => UuidInfo::None,
            BeaconFrame::IBeacon => UuidInfo::IBeacon {
                uuid,
                major: u16::from_be_bytes([bytes[16], bytes[17]]),
                minor: u16::from_be_bytes([bytes[18], bytes[19]]),
            },
            BeaconFrame::Eddystone => {
                let mut namespace = [0u8; 10];
                let mut instance = [0u8; 6];
                namespace.copy_from_slice(&uuid[..10]);
                instance.copy_from_slice(&uuid[10..]);
                UuidInfo::Eddystone {
                    namespace,
                    instance,
                }
            }
        })
    }
}

/// A value for one of the writable fields, as entered by a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Setting {
    DevEui(Eui64),
    JoinEui(Eui64),
    JoinKey(JoinKey),
    BleLocalName(String),
    Sleep(SleepState),
    BleAdvertisingInterval(u16),
    HighTemperature(i16),
    LowTemperature(i16),
    Dop(u8),
}

impl Setting {
    /// Names accepted by [`Setting::parse`].
    pub const NAMES: &'static [&'static str] = &[
        "dev-eui",
        "join-eui",
        "join-key",
        "ble-name",
        "sleep",
        "ble-adv-interval",
        "high-temperature",
        "low-temperature",
        "dop",
    ];

    /// Parses `value` for the setting called `name`. All validation happens here or in the
    /// field's encoder, never after the first block was written.
    pub fn parse(name: &str, value: &str) -> Result<Self, Error> {
        let value = value.trim();
        Ok(match name {
            "dev-eui" => Setting::DevEui(value.parse()?),
            "join-eui" => Setting::JoinEui(value.parse()?),
            "join-key" => Setting::JoinKey(value.parse()?),
            "ble-name" => Setting::BleLocalName(value.to_string()),
            "sleep" => Setting::Sleep(match value.to_ascii_lowercase().as_str() {
                "true" | "1" | "asleep" => SleepState::Asleep,
                "false" | "0" | "awake" => SleepState::Awake,
                _ => return Err(invalid(field::SleepState::NAME, value)),
            }),
            "ble-adv-interval" => Setting::BleAdvertisingInterval(
                value
                    .parse()
                    .map_err(|_| invalid(field::BleAdvertisingInterval::NAME, value))?,
            ),
            "high-temperature" => Setting::HighTemperature(
                value
                    .parse()
                    .map_err(|_| invalid(field::HighTemperature::NAME, value))?,
            ),
            "low-temperature" => Setting::LowTemperature(
                value
                    .parse()
                    .map_err(|_| invalid(field::LowTemperature::NAME, value))?,
            ),
            "dop" => Setting::Dop(
                value
                    .parse()
                    .map_err(|_| invalid(field::Dop::NAME, value))?,
            ),
            _ => {
                return Err(Error::encoding(
                    "setting",
                    format!("unknown setting '{name}', expected one of {:?}", Self::NAMES),
                ))
            }
        })
    }

    /// Name of the field the setting writes.
    pub fn field_name(&self) -> &'static str {
        match self {
            Setting::DevEui(_) => field::DevEui::NAME,
            Setting::JoinEui(_) => field::JoinEui::NAME,
            Setting::JoinKey(_) => field::JoinKey::NAME,
            Setting::BleLocalName(_) => field::BleLocalName::NAME,
            Setting::Sleep(_) => field::SleepState::NAME,
            Setting::BleAdvertisingInterval(_) => field::BleAdvertisingInterval::NAME,
            Setting::HighTemperature(_) => field::HighTemperature::NAME,
            Setting::LowTemperature(_) => field::LowTemperature::NAME,
            Setting::Dop(_) => field::Dop::NAME,
        }
    }
}

fn invalid(field: &'static str, value: &str) -> Error {
    Error::encoding(field, format!("'{value}' is not a valid value"))
}

impl<T: Transport> Tag<T> {
    /// Reads the Asset+ settings in one pass.
    pub fn read_ditto_settings(&mut self) -> Result<DittoSettings, Error> {
        let blocks = self.read_blocks(DITTO_BLOCKS)?;
        DittoSettings::decode(&blocks)
    }

    /// Reads the LoRa settings in one pass. Range finder settings are included if the SKU says
    /// so.
    pub fn read_lora_settings(&mut self) -> Result<LoraSettings, Error> {
        let blocks = self.read_blocks(LORA_BLOCKS)?;
        LoraSettings::decode(&blocks)
    }

    /// Reads the LoRaWAN identifiers and checks the CRC.
    ///
    /// A CRC mismatch is reported in [`LoraCredentials::crc`], every other failure is returned.
    pub fn read_lora_credentials(&mut self) -> Result<LoraCredentials, Error> {
        let dev_eui = self.get::<field::DevEui>()?;
        let join_eui = self.get::<field::JoinEui>()?;
        let join_key = self.get::<field::JoinKey>()?;

        if join_eui.is_default() {
            warn!("JoinEUI {} has not been programmed", join_eui.to_hex());
        }
        if join_key.is_default() {
            warn!("join key {join_key} has not been programmed");
        }

        let crc = match self.validate_crc() {
            Ok(()) => CrcStatus::Valid,
            Err(Error::CrcMismatch { .. }) => CrcStatus::Invalid,
            Err(e) => return Err(e),
        };

        Ok(LoraCredentials {
            dev_eui,
            join_eui,
            join_key,
            crc,
        })
    }

    pub fn read_macs(&mut self) -> Result<MacAddresses, Error> {
        Ok(MacAddresses {
            lora: self.get::<field::DevEui>()?,
            ble: self.get::<field::BleMac>()?,
        })
    }

    /// Reads the product information from the SKU byte.
    pub fn read_beacon_info(&mut self) -> Result<BeaconInfo, Error> {
        self.get::<field::BeaconType>()
    }

    /// Reads the advertised identifiers using the layout of `frame`.
    pub fn read_uuid(&mut self, frame: BeaconFrame) -> Result<UuidInfo, Error> {
        if frame == BeaconFrame::None {
            return Ok(UuidInfo::None);
        }
        let blocks = self.read_blocks(UUID_BLOCKS)?;
        UuidInfo::decode(frame, &blocks)
    }

    /// Writes one setting and restamps the CRC.
    pub fn mutate(&mut self, setting: &Setting) -> Result<(), Error> {
        match setting {
            Setting::DevEui(eui) => self.set::<field::DevEui>(eui),
            Setting::JoinEui(eui) => self.set::<field::JoinEui>(eui),
            Setting::JoinKey(key) => self.set::<field::JoinKey>(key),
            Setting::BleLocalName(name) => self.set::<field::BleLocalName>(name),
            Setting::Sleep(state) => self.set::<field::SleepState>(state),
            Setting::BleAdvertisingInterval(ms) => self.set::<field::BleAdvertisingInterval>(ms),
            Setting::HighTemperature(t) => self.set::<field::HighTemperature>(t),
            Setting::LowTemperature(t) => self.set::<field::LowTemperature>(t),
            Setting::Dop(dop) => self.set::<field::Dop>(dop),
        }
    }

    /// Sets blocks 0-47 to `FFFFFFFF`, writes the matching CRC and checks it.
    pub fn erase(&mut self) -> Result<(), Error> {
        info!("erasing configuration blocks");
        for block in 0..CONFIG_BLOCKS {
            self.write_block(block, Block::ERASED)?;
        }
        self.recompute_crc()?;
        self.validate_crc()?;
        info!("tag erased");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn blocks(content: &[(u8, &str)]) -> BlockSet {
        content
            .iter()
            .map(|&(n, hex)| (n, hex.parse::<Block>().unwrap()))
            .collect()
    }

    #[test]
    fn range_finder_extras_follow_the_sku() {
        let mut set = blocks(&[
            (8, "FF120385"),
            (9, "6A050150"),
            (10, "30000512"),
            (11, "0C1EF700"),
            (12, "00000D27"),
            (13, "00000010"),
            (14, "00103205"),
            (15, "02320900"),
        ]);

        let settings = LoraSettings::decode(&set).unwrap();
        assert_eq!(settings.beacon_type.sku, Sku::RangeFinder);
        assert_eq!(settings.high_temperature, 6);
        assert_eq!(settings.low_temperature, -21);
        assert_eq!(settings.motion_threshold, 5);
        assert_eq!(settings.gnss_min, 0);
        assert_eq!(settings.gnss_max, 10);
        assert_eq!(settings.dop, Tenths(32));
        assert_eq!(settings.range_type, Coded::Known(RangeType::Long));
        assert_eq!(
            settings.range_finder,
            Some(RangeFinderSettings {
                range_threshold: 150,
                sensor_period: 30,
                range_offset: 5,
                maximum_range: 120,
            })
        );

        set.insert(15, "02320800".parse().unwrap());
        let settings = LoraSettings::decode(&set).unwrap();
        assert_eq!(settings.beacon_type.sku, Sku::ConditionAlert);
        assert_eq!(settings.range_finder, None);
    }

    #[test]
    fn uuid_layouts() {
        let set = blocks(&[
            (10, "00112233"),
            (11, "44556677"),
            (12, "8899AABB"),
            (13, "CCDDEEFF"),
            (14, "0001FFFE"),
        ]);

        let UuidInfo::IBeacon { uuid, major, minor } =
            UuidInfo::decode(BeaconFrame::IBeacon, &set).unwrap()
        else {
            panic!("expected an iBeacon frame");
        };
        assert_eq!(hex::encode_upper(uuid), "00112233445566778899AABBCCDDEEFF");
        assert_eq!(major, 1);
        assert_eq!(minor, 0xFFFE);

        let UuidInfo::Eddystone {
            namespace,
            instance,
        } = UuidInfo::decode(BeaconFrame::Eddystone, &set).unwrap()
        else {
            panic!("expected an Eddystone frame");
        };
        assert_eq!(hex::encode_upper(namespace), "00112233445566778899");
        assert_eq!(hex::encode_upper(instance), "AABBCCDDEEFF");
    }

    #[test]
    fn parse_settings() {
        assert_eq!(
            Setting::parse("sleep", "true").unwrap(),
            Setting::Sleep(SleepState::Asleep)
        );
        assert_eq!(
            Setting::parse("sleep", "Awake").unwrap(),
            Setting::Sleep(SleepState::Awake)
        );
        assert_eq!(
            Setting::parse("ble-adv-interval", " 2500 ").unwrap(),
            Setting::BleAdvertisingInterval(2500)
        );
        assert_eq!(
            Setting::parse("dev-eui", "0C:1E:F7:00:00:00:0D:27")
                .unwrap()
                .field_name(),
            "DevEUI"
        );

        assert!(matches!(
            Setting::parse("sleep", "maybe"),
            Err(Error::Encoding {
                field: "sleep state",
                ..
            })
        ));
        assert!(matches!(
            Setting::parse("low-temperature", "cold"),
            Err(Error::Encoding { .. })
        ));
        assert!(matches!(
            Setting::parse("colour", "red"),
            Err(Error::Encoding {
                field: "setting",
                ..
            })
        ));
    }
}
