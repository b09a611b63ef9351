//! Primitive transforms between block bytes and field values, and the value types for the
//! identifiers stored on the tag.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Temperatures are stored as `value + 127` in one unsigned byte.
pub const TEMPERATURE_BIAS: i16 = 127;

pub fn bias_decode(byte: u8) -> i16 {
    byte as i16 - TEMPERATURE_BIAS
}

pub fn bias_encode(field: &'static str, value: i16) -> Result<u8, Error> {
    let biased = value
        .checked_add(TEMPERATURE_BIAS)
        .and_then(|v| u8::try_from(v).ok());
    biased.ok_or_else(|| {
        Error::encoding(
            field,
            format!(
                "{value} is outside {}..={}",
                -TEMPERATURE_BIAS,
                u8::MAX as i16 - TEMPERATURE_BIAS
            ),
        )
    })
}

/// RSSI values are plain two's complement bytes.
pub fn twos_complement(byte: u8) -> i8 {
    byte as i8
}

/// Decimal digits stored one per nibble (`0x15` reads as 15).
pub fn bcd_decode(block: u8, bytes: &[u8]) -> Result<u32, Error> {
    let mut value = 0;
    for &byte in bytes {
        for digit in [byte >> 4, byte & 0x0F] {
            if digit > 9 {
                return Err(Error::decode(
                    block,
                    format!("0x{} is not a decimal number", hex::encode_upper(bytes)),
                ));
            }
            value = value * 10 + digit as u32;
        }
    }
    Ok(value)
}

/// Extracts `len` bits starting at `start` from the byte written out least significant bit
/// first. The first extracted bit ends up as the most significant bit of the result, so the
/// group `(bit 0, bit 1)` of `0b0000_0001` reads as `0b10`.
pub const fn lsb_first_bits(byte: u8, start: u32, len: u32) -> u8 {
    (byte.reverse_bits() >> (8 - start - len)) & ((1 << len) - 1)
}

/// Text stored as single bytes, padded with NULs.
pub fn ascii_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches('\0')
        .to_string()
}

/// Text stored as one byte per code point (ISO 8859-1), padded with NULs.
pub fn latin1_text(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| b as char)
        .collect::<String>()
        .trim_end_matches('\0')
        .to_string()
}

/// Text stored as UTF-16 big endian code units, padded with NULs. Unpaired surrogates are
/// replaced.
pub fn utf16_be_text(bytes: &[u8]) -> String {
    let units = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
    char::decode_utf16(units)
        .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect::<String>()
        .trim_end_matches('\0')
        .to_string()
}

/// ASCII text, zero filled to `len` bytes.
pub fn ascii_encode(field: &'static str, text: &str, len: usize) -> Result<Vec<u8>, Error> {
    if !text.is_ascii() {
        return Err(Error::encoding(field, format!("'{text}' is not ASCII")));
    }
    if text.len() > len {
        return Err(Error::encoding(
            field,
            format!("'{text}' is {} bytes long, at most {len} fit", text.len()),
        ));
    }
    let mut bytes = text.as_bytes().to_vec();
    bytes.resize(len, 0);
    Ok(bytes)
}

/// Hex digits with optional `:`, `-` or space separators.
fn parse_hex(field: &'static str, s: &str) -> Result<Vec<u8>, Error> {
    let digits: String = s
        .chars()
        .filter(|c| !matches!(c, ':' | '-' | ' '))
        .collect();
    hex::decode(&digits).map_err(|e| Error::encoding(field, format!("'{s}': {e}")))
}

fn colon_separated(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    for (i, byte) in bytes.iter().enumerate() {
        if i > 0 {
            f.write_str(":")?;
        }
        write!(f, "{byte:02X}")?;
    }
    Ok(())
}

fn is_default(bytes: &[u8]) -> bool {
    bytes.iter().all(|&b| b == 0x00) || bytes.iter().all(|&b| b == 0xFF)
}

/// A 64-bit LoRaWAN identifier (DevEUI, JoinEUI), most significant byte first.
///
/// Displayed as colon separated octets, parsed from exactly 16 hex digits with or without
/// separators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Eui64(pub [u8; 8]);

impl Eui64 {
    /// 16 uppercase hex digits without separators.
    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0)
    }

    pub fn as_u64(&self) -> u64 {
        u64::from_be_bytes(self.0)
    }

    /// All zeros or all ones, i.e. never programmed.
    pub fn is_default(&self) -> bool {
        is_default(&self.0)
    }
}

impl fmt::Display for Eui64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        colon_separated(f, &self.0)
    }
}

impl FromStr for Eui64 {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = parse_hex("EUI", s)?;
        let eui = bytes.try_into().map_err(|bytes: Vec<u8>| {
            Error::encoding(
                "EUI",
                format!("expected 16 hex digits, got {}", bytes.len() * 2),
            )
        })?;
        Ok(Self(eui))
    }
}

/// The 128-bit LoRaWAN join (application) key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct JoinKey(pub [u8; 16]);

impl JoinKey {
    pub fn as_u128(&self) -> u128 {
        u128::from_be_bytes(self.0)
    }

    pub fn is_default(&self) -> bool {
        is_default(&self.0)
    }
}

impl fmt::Display for JoinKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_upper(self.0))
    }
}

impl fmt::Debug for JoinKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JoinKey({self})")
    }
}

/// Parses up to 32 hex digits. Shorter keys are zero filled at the end.
impl FromStr for JoinKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = parse_hex("join key", s)?;
        if bytes.is_empty() || bytes.len() > 16 {
            return Err(Error::encoding(
                "join key",
                format!("expected at most 32 hex digits, got {}", bytes.len() * 2),
            ));
        }
        let mut key = [0u8; 16];
        key[..bytes.len()].copy_from_slice(&bytes);
        Ok(Self(key))
    }
}

/// A 48-bit BLE MAC address, most significant byte first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddress(pub [u8; 6]);

impl MacAddress {
    pub fn as_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        bytes[2..].copy_from_slice(&self.0);
        u64::from_be_bytes(bytes)
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        colon_separated(f, &self.0)
    }
}

/// Firmware version in tenths, `0x4A` is version 7.4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FirmwareVersion(pub u8);

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.0 / 10, self.0 % 10)
    }
}

/// A value counted in tenths, printed with one decimal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Tenths(pub u8);

impl fmt::Display for Tenths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.0 / 10, self.0 % 10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn temperature_bias() {
        assert_eq!(bias_decode(0x7F), 0);
        assert_eq!(bias_decode(0x00), -127);
        assert_eq!(bias_decode(0xFF), 128);
        assert_eq!(bias_encode("t", -40).unwrap(), 87);
        assert!(bias_encode("t", 129).is_err());
        assert!(bias_encode("t", -128).is_err());
    }

    #[test]
    fn rssi_twos_complement() {
        assert_eq!(twos_complement(0xA6), -90);
        assert_eq!(twos_complement(0x7F), 127);
        assert_eq!(twos_complement(0x80), -128);
    }

    #[test]
    fn bcd() {
        assert_eq!(bcd_decode(8, &[0x15]).unwrap(), 15);
        assert_eq!(bcd_decode(9, &[0x01, 0x20]).unwrap(), 120);
        assert!(matches!(
            bcd_decode(8, &[0x0A]),
            Err(Error::Decode { block: 8, .. })
        ));
    }

    #[test]
    fn tenths() {
        assert_eq!(Tenths(32).to_string(), "3.2");
        assert_eq!(Tenths(5).to_string(), "0.5");
    }

    #[test]
    fn bits_are_counted_from_the_least_significant_end() {
        assert_eq!(lsb_first_bits(0b0000_0001, 0, 2), 0b10);
        assert_eq!(lsb_first_bits(0b0000_0010, 0, 2), 0b01);
        assert_eq!(lsb_first_bits(0b0001_0000, 4, 2), 0b10);
        assert_eq!(lsb_first_bits(0b0010_0000, 4, 2), 0b01);
        assert_eq!(lsb_first_bits(0b0001_0001, 4, 1), 1);
        assert_eq!(lsb_first_bits(0b0001_0001, 0, 1), 1);
        assert_eq!(lsb_first_bits(0b1110_1110, 0, 1), 0);
    }

    #[test]
    fn text() {
        assert_eq!(ascii_text(b"SP4066\0\0"), "SP4066");
        assert_eq!(latin1_text(b"\xA6OmniID\0\0"), "\u{A6}OmniID");
        assert_eq!(utf16_be_text(&[0x00, 0x53, 0x00, 0x50, 0x00, 0x00]), "SP");
        assert_eq!(ascii_encode("name", "SP", 8).unwrap(), b"SP\0\0\0\0\0\0");
        assert!(ascii_encode("name", "SP4066-12", 8).is_err());
        assert!(ascii_encode("name", "Grüß", 8).is_err());
    }

    #[test]
    fn eui64_text() {
        let eui: Eui64 = "0C1EF70000000D27".parse().unwrap();
        assert_eq!(eui.to_string(), "0C:1E:F7:00:00:00:0D:27");
        assert_eq!(eui.to_hex(), "0C1EF70000000D27");
        assert_eq!(eui.as_u64(), 0x0C1E_F700_0000_0D27);
        assert_eq!("0c:1e:f7:00:00:00:0d:27".parse::<Eui64>().unwrap(), eui);

        assert!("0C1EF70000000D2".parse::<Eui64>().is_err());
        assert!("0C1EF70000000D2700".parse::<Eui64>().is_err());
        assert!("0C1EF70000000DZZ".parse::<Eui64>().is_err());
    }

    #[test]
    fn join_key_text() {
        let key: JoinKey = "5643204038065F392E3617534502330C".parse().unwrap();
        assert_eq!(key.to_string(), "5643204038065F392E3617534502330C");
        assert!(!key.is_default());

        let short: JoinKey = "01020304".parse().unwrap();
        assert_eq!(short.to_string(), "01020304000000000000000000000000");

        assert!("5643204038065F392E3617534502330C00".parse::<JoinKey>().is_err());
        assert!("".parse::<JoinKey>().is_err());
        assert!("FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF"
            .parse::<JoinKey>()
            .unwrap()
            .is_default());
    }

    #[test]
    fn firmware_version() {
        assert_eq!(FirmwareVersion(0x4A).to_string(), "7.4");
        assert_eq!(FirmwareVersion(10).to_string(), "1.0");
    }
}
