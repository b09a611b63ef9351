//! Human readable reports of what was read from a tag.

use std::fmt::{self, Display, Write};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use beacon_tag::codec::MacAddress;
use beacon_tag::lookup::BeaconInfo;
use beacon_tag::settings::{LoraCredentials, MacAddresses, UuidInfo};
use beacon_tag::{Block, DittoSettings, LoraSettings, CRC_BLOCK};

const LABEL_WIDTH: usize = 40;

fn field(out: &mut String, label: &str, value: impl Display) -> fmt::Result {
    writeln!(out, "  {label:<LABEL_WIDTH$} {value}")
}

pub fn ditto_settings(settings: &DittoSettings) -> Result<String, fmt::Error> {
    let mut out = String::from("=== Asset+ Tag Settings ===\n");
    field(&mut out, "Hardware Version", settings.hardware_version)?;
    field(&mut out, "Firmware Version", settings.firmware_version)?;
    field(
        &mut out,
        "Beacon Type",
        format_args!(
            "{:02X} ({})",
            settings.beacon_type.code,
            settings.beacon_type.name()
        ),
    )?;
    field(&mut out, "Debug Tones", settings.debug_tones)?;
    field(&mut out, "MAC Option", settings.mac_option)?;
    field(&mut out, "BLE TX PWR", settings.ble_gain)?;
    field(&mut out, "LoRa Enable", settings.lora_enable)?;
    field(&mut out, "LoRa Region", settings.lora_region)?;
    field(&mut out, "Spreading Factor", settings.spreading_factor)?;
    field(&mut out, "Stationary -> Moved Threshold", settings.motion_moved)?;
    field(&mut out, "Moved -> Stationary Threshold", settings.motion_stationary)?;
    field(&mut out, "Activity Window", settings.activity_window)?;
    field(&mut out, "Activity Threshold", settings.activity_threshold)?;
    field(&mut out, "Motion Threshold", settings.motion_threshold)?;
    field(&mut out, "HBR in Hours", settings.downlink_rate)?;
    field(&mut out, "Uplink Rate", settings.uplink_rate)?;
    field(&mut out, "ABR in minutes", settings.alert_rate)?;
    field(&mut out, "High Temperature", settings.high_temperature)?;
    field(&mut out, "Low Temperature", settings.low_temperature)?;
    field(&mut out, "Tag Status", settings.sleep_state)?;
    field(&mut out, "GNSS Min", settings.gnss_min)?;
    field(&mut out, "GNSS Max Lock Time in Minutes", settings.gnss_max)?;
    field(&mut out, "DOP Threshold", settings.dop)?;
    field(&mut out, "Operational Mode", settings.operational_mode)?;
    field(&mut out, "Button Press Uplink", settings.press_uplink)?;
    field(&mut out, "BLE Advertising Type", settings.ble_advertising_type)?;
    field(
        &mut out,
        "BLE Advertising rate in mS",
        settings.ble_advertising_interval,
    )?;
    field(&mut out, "Position Engine BLE Scan", settings.ble_ref_mode)?;
    field(
        &mut out,
        "Position Engine BLE Scan duration in mS",
        settings.ble_ref_scan_interval,
    )?;
    field(&mut out, "BLE Reference Tag Filter ID", &settings.ble_ref_filter)?;
    field(&mut out, "BLE Scan RSSI Threshold", settings.ble_ref_rssi)?;
    field(&mut out, "LoRaWAN Class B Ping Slot", settings.ping_slot_period)?;
    field(&mut out, "LoRaWAN Class B Timeout", settings.class_b_timeout)?;
    field(&mut out, "LoRaWAN Class select", settings.class_select)?;
    field(&mut out, "LoRaWAN Confirmed Uplinks", settings.confirmed_uplinks)?;
    field(&mut out, "LoRaWAN Sub-band Hopping", settings.hopping)?;
    Ok(out)
}

pub fn lora_settings(settings: &LoraSettings) -> Result<String, fmt::Error> {
    let mut out = String::from("=== LoRa Settings ===\n");
    field(
        &mut out,
        "Beacon Type",
        format_args!(
            "{:02X} ({})",
            settings.beacon_type.code,
            settings.beacon_type.name()
        ),
    )?;
    field(&mut out, "Hardware Version", settings.hardware_version)?;
    field(&mut out, "Firmware Version", settings.firmware_version)?;
    field(&mut out, "Sleep State", settings.sleep_state)?;
    field(&mut out, "Min/Max Threshold", settings.threshold_direction)?;
    field(&mut out, "Range Type", settings.range_type)?;
    field(&mut out, "Spreading Factor", settings.spreading_factor)?;
    field(&mut out, "Downlink Rate", settings.downlink_rate)?;
    field(&mut out, "Uplink Rate", settings.uplink_rate)?;
    field(&mut out, "High Temperature", settings.high_temperature)?;
    field(&mut out, "Low Temperature", settings.low_temperature)?;
    field(&mut out, "Accelerometer", settings.motion_threshold)?;
    field(&mut out, "GNSS Min", settings.gnss_min)?;
    field(&mut out, "GNSS Max", settings.gnss_max)?;
    field(&mut out, "DOP", settings.dop)?;
    if let Some(range) = &settings.range_finder {
        field(&mut out, "Range Threshold", range.range_threshold)?;
        field(&mut out, "Sensor Period", range.sensor_period)?;
        field(&mut out, "Range Offset", range.range_offset)?;
        field(&mut out, "Maximum Range", range.maximum_range)?;
    }
    Ok(out)
}

/// Every identifier in the forms the network servers ask for.
pub fn lora_credentials(
    ble_mac: &MacAddress,
    credentials: &LoraCredentials,
) -> Result<String, fmt::Error> {
    let mut out = String::from("=== LoRa Information ===\n");
    field(
        &mut out,
        "BLE MAC",
        format_args!("{ble_mac} (decimal: {})", ble_mac.as_u64()),
    )?;
    field(
        &mut out,
        "LoRa DevEUI",
        format_args!(
            "{} (hex: {}, decimal: {})",
            credentials.dev_eui,
            credentials.dev_eui.to_hex(),
            credentials.dev_eui.as_u64()
        ),
    )?;
    field(
        &mut out,
        "LoRa JoinEUI",
        format_args!(
            "{} (decimal: {})",
            credentials.join_eui.to_hex(),
            credentials.join_eui.as_u64()
        ),
    )?;
    let key_hex = credentials.join_key.to_string();
    field(
        &mut out,
        "LoRa join key",
        format_args!(
            "{key_hex} (decimal: {}, hex encoded to base64: {})",
            credentials.join_key.as_u128(),
            STANDARD.encode(&key_hex)
        ),
    )?;
    field(
        &mut out,
        "LoRa join key bytes in base64",
        STANDARD.encode(credentials.join_key.0),
    )?;
    field(&mut out, "CRC", credentials.crc)?;

    if credentials.join_eui.is_default() {
        out.push_str("warning: JoinEUI has its default value and needs to be programmed\n");
    }
    if credentials.join_key.is_default() {
        out.push_str("warning: join key has its default value and needs to be programmed\n");
    }
    Ok(out)
}

pub fn macs(macs: &MacAddresses) -> Result<String, fmt::Error> {
    let mut out = String::new();
    field(&mut out, "LoRa MAC", macs.lora)?;
    field(&mut out, "BLE MAC", macs.ble)?;
    Ok(out)
}

pub fn beacon_info(info: &BeaconInfo) -> Result<String, fmt::Error> {
    let mut out = String::new();
    field(&mut out, "Beacon Type", format_args!("{:02X}", info.code))?;
    field(&mut out, "Name", info.name())?;
    field(&mut out, "Image", info.image())?;
    Ok(out)
}

pub fn uuid(info: &UuidInfo) -> Result<String, fmt::Error> {
    let mut out = String::new();
    match info {
        UuidInfo::None => out.push_str("no advertising frame selected\n"),
        UuidInfo::IBeacon { uuid, major, minor } => {
            field(&mut out, "UUID", hex::encode_upper(uuid))?;
            field(&mut out, "Major", format_args!("{major:04X}"))?;
            field(&mut out, "Minor", format_args!("{minor:04X}"))?;
        }
        UuidInfo::Eddystone {
            namespace,
            instance,
        } => {
            field(&mut out, "Namespace", hex::encode_upper(namespace))?;
            field(&mut out, "Instance", hex::encode_upper(instance))?;
        }
    }
    Ok(out)
}

/// One line per block, the CRC block marked.
pub fn dump(blocks: &[Block]) -> Result<String, fmt::Error> {
    let mut out = String::new();
    for (number, block) in blocks.iter().enumerate() {
        write!(out, "block {number:>2}: {block}")?;
        if number == CRC_BLOCK as usize {
            out.push_str(" (CRC)");
        }
        out.push('\n');
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_tag::settings::CrcStatus;
    use pretty_assertions::assert_eq;

    #[test]
    fn credentials_in_every_form() {
        let credentials = LoraCredentials {
            dev_eui: "0C1EF70000000D27".parse().unwrap(),
            join_eui: "0000000000000000".parse().unwrap(),
            join_key: "00112233445566778899AABBCCDDEEFF".parse().unwrap(),
            crc: CrcStatus::Valid,
        };
        let mac = MacAddress([0xCE, 0xA6, 0x64, 0x35, 0x42, 0xE3]);

        let report = lora_credentials(&mac, &credentials).unwrap();

        assert!(report.contains("CE:A6:64:35:42:E3 (decimal: 227214041105123)"));
        assert!(report.contains(
            "0C:1E:F7:00:00:00:0D:27 (hex: 0C1EF70000000D27, decimal: 873406957128518951)"
        ));
        assert!(report.contains(
            "00112233445566778899AABBCCDDEEFF (decimal: 88962710306127702866241727433142015, \
             hex encoded to base64: MDAxMTIyMzM0NDU1NjY3Nzg4OTlBQUJCQ0NEREVFRkY=)"
        ));
        assert!(report.contains("ABEiM0RVZneImaq7zN3u/w=="));
        assert!(report.contains("warning: JoinEUI has its default value"));
        assert!(!report.contains("warning: join key"));
    }

    #[test]
    fn beacon_info_lines() {
        let info = BeaconInfo::from_code(0x15).unwrap();

        let report = beacon_info(&info).unwrap();

        assert_eq!(report.lines().count(), 3);
        assert!(report.contains("Sense Asset +"));
    }

    #[test]
    fn dump_marks_the_crc_block() {
        let blocks = vec![Block::ERASED; 49];
        let report = dump(&blocks).unwrap();
        assert_eq!(report.lines().count(), 49);
        assert_eq!(report.lines().next(), Some("block  0: FFFFFFFF"));
        assert_eq!(report.lines().last(), Some("block 48: FFFFFFFF (CRC)"));
    }
}
