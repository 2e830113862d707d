//! Value adapters for encoded register fields
//!
//! Several AS7262 fields do not store their semantic value directly: gain and
//! LED current limits are table codes, the integration time is scaled, the
//! calibrated channels are IEEE 754 bit patterns and the firmware version is
//! a packed triple. Each adapter here is a pure bidirectional transform
//! between the raw field bits and the semantic value, with no bus access.

use core::fmt;

/// A value that no table entry can represent
///
/// Returned when encoding against an empty lookup table, or when decoding a
/// field code that has no entry. The shipped tables cover every code of
/// their fields, so decoding device data cannot produce this.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InvalidFieldValue;

impl fmt::Display for InvalidFieldValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "value cannot be represented by the field")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for InvalidFieldValue {}

/// Maps semantic values to discrete field codes through a finite table
pub struct LookupAdapter {
    table: &'static [(f32, u8)],
}

impl LookupAdapter {
    /// Create an adapter over a table of `(value, code)` pairs
    pub const fn new(table: &'static [(f32, u8)]) -> Self {
        LookupAdapter { table }
    }

    /// Encode a semantic value as its field code
    ///
    /// The value snaps to the nearest table entry, so requests outside the
    /// table's range clamp to the smallest or largest achievable value.
    pub fn encode(&self, value: f32) -> Result<u8, InvalidFieldValue> {
        let mut nearest: Option<(f32, u8)> = None;
        for &(key, code) in self.table {
            let distance = if key > value { key - value } else { value - key };
            match nearest {
                Some((best, _)) if best <= distance => {}
                _ => nearest = Some((distance, code)),
            }
        }
        nearest.map(|(_, code)| code).ok_or(InvalidFieldValue)
    }

    /// Decode a field code back to its semantic value
    pub fn decode(&self, code: u8) -> Result<f32, InvalidFieldValue> {
        self.table
            .iter()
            .find(|&&(_, candidate)| candidate == code)
            .map(|&(key, _)| key)
            .ok_or(InvalidFieldValue)
    }
}

/// Scales a semantic value into raw counts by a constant factor
///
/// Encoding truncates toward zero, so most semantic values alias to the
/// nearest representable count below them: 90 ms becomes 251 counts, which
/// reads back as 89.6 ms. The arithmetic is done in double precision; the
/// count for 90 ms is 251, not the 252 that single precision would produce.
pub struct LinearScale {
    scale: f64,
}

impl LinearScale {
    /// Create an adapter with the given counts-per-unit factor
    pub const fn new(scale: f64) -> Self {
        LinearScale { scale }
    }

    /// Encode a semantic value as raw counts, truncating toward zero
    ///
    /// The result carries more bits than any field holds; writing it
    /// truncates to the field width.
    pub fn encode(&self, value: f32) -> u64 {
        (value as f64 * self.scale) as i64 as u64
    }

    /// Decode raw counts back to the semantic value
    pub fn decode(&self, raw: u64) -> f32 {
        (raw as f64 / self.scale) as f32
    }
}

/// Reinterprets a 32-bit field as an IEEE 754 single precision float
///
/// The calibrated channel values arrive as four bytes each, most significant
/// first; assembled into the raw field value they are exactly the bit
/// pattern of the float.
pub struct Float32;

impl Float32 {
    /// Decode raw field bits into a float
    pub fn decode(bits: u32) -> f32 {
        f32::from_bits(bits)
    }

    /// Encode a float as raw field bits
    pub fn encode(value: f32) -> u32 {
        value.to_bits()
    }
}

/// Firmware version unpacked from its 16-bit register field
///
/// The device scatters the three version numbers across the field: the major
/// version sits in bits 4-7, the minor version's high four bits in bits 0-3
/// and its low two bits in bits 14-15, the sub version in bits 8-13.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FirmwareVersion {
    /// Major version
    pub major: u8,
    /// Minor version
    pub minor: u8,
    /// Sub version
    pub sub: u8,
}

impl FirmwareVersion {
    /// Unpack a firmware version from the raw field value
    pub fn from_raw(raw: u16) -> Self {
        FirmwareVersion {
            major: ((raw & 0x00f0) >> 4) as u8,
            minor: (((raw & 0x000f) << 2) | ((raw & 0b1100_0000_0000_0000) >> 14)) as u8,
            sub: ((raw & 0b0011_1111_0000_0000) >> 8) as u8,
        }
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.sub)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn lookup_snaps_to_nearest_and_clamps() {
        static TABLE: LookupAdapter =
            LookupAdapter::new(&[(1.0, 0b00), (3.7, 0b01), (16.0, 0b10), (64.0, 0b11)]);

        assert_eq!(TABLE.encode(3.7), Ok(0b01));
        assert_eq!(TABLE.encode(10.0), Ok(0b10));
        assert_eq!(TABLE.encode(999.0), Ok(0b11));
        assert_eq!(TABLE.encode(-1.0), Ok(0b00));
        assert_eq!(TABLE.decode(0b10), Ok(16.0));
    }

    #[test]
    fn empty_lookup_table_cannot_encode() {
        static EMPTY: LookupAdapter = LookupAdapter::new(&[]);
        assert_eq!(EMPTY.encode(1.0), Err(InvalidFieldValue));
    }

    #[test]
    fn unknown_code_cannot_decode() {
        static TABLE: LookupAdapter = LookupAdapter::new(&[(1.0, 0b00)]);
        assert_eq!(TABLE.decode(0b01), Err(InvalidFieldValue));
    }

    #[test]
    fn linear_scale_truncates_toward_zero() {
        let scale = LinearScale::new(2.8);

        // 50 ms is exactly representable
        assert_eq!(scale.encode(50.0), 140);
        assert_eq!(scale.decode(140), 50.0);

        // 90 ms is not: it truncates to 251 counts and reads back as 89.6
        assert_eq!(scale.encode(90.0), 251);
        assert_eq!((scale.decode(251) * 10.0).round(), 896.0);
    }

    #[test]
    fn oversized_scale_input_keeps_full_count() {
        let scale = LinearScale::new(2.8);
        // Truncation to the field width is the register layer's job
        assert_eq!(scale.encode(99999.0), 279_997);
        assert_eq!(scale.decode(279_997 & 0xff), 67.5);
    }

    #[test]
    fn float_bits_round_trip() {
        for value in [1.1_f32, 2.2, -3.3, 0.0] {
            assert_eq!(Float32::decode(Float32::encode(value)), value);
        }
    }

    #[test]
    fn firmware_version_unpacks_scattered_bits() {
        let version = FirmwareVersion::from_raw(0xfeff);
        assert_eq!(version.major, 15);
        assert_eq!(version.minor, 63);
        assert_eq!(version.sub, 62);
        assert_eq!(version.to_string(), "15.63.62");
    }
}
