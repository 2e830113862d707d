//! Lookup tables and named constants for the AS7262's encoded fields
//!
//! This module houses the fixed tables behind the gain and LED current
//! fields, a named constant for every achievable value, and the typed
//! measurement mode. Setters accept any value and snap to the nearest table
//! entry; the constants are for callers who want to name an exact one.

use crate::adapter::{LinearScale, LookupAdapter};

/// Gain multiplier x1
pub const GAIN_X1: f32 = 1.0;
/// Gain multiplier x3.7
pub const GAIN_X3_7: f32 = 3.7;
/// Gain multiplier x16
pub const GAIN_X16: f32 = 16.0;
/// Gain multiplier x64
pub const GAIN_X64: f32 = 64.0;

/// Illumination LED current limit of 12.5 mA
pub const ILLUMINATION_CURRENT_12_5MA: f32 = 12.5;
/// Illumination LED current limit of 25 mA
pub const ILLUMINATION_CURRENT_25MA: f32 = 25.0;
/// Illumination LED current limit of 50 mA
pub const ILLUMINATION_CURRENT_50MA: f32 = 50.0;
/// Illumination LED current limit of 100 mA
pub const ILLUMINATION_CURRENT_100MA: f32 = 100.0;

/// Indicator LED current limit of 1 mA
pub const INDICATOR_CURRENT_1MA: f32 = 1.0;
/// Indicator LED current limit of 2 mA
pub const INDICATOR_CURRENT_2MA: f32 = 2.0;
/// Indicator LED current limit of 4 mA
pub const INDICATOR_CURRENT_4MA: f32 = 4.0;
/// Indicator LED current limit of 8 mA
pub const INDICATOR_CURRENT_8MA: f32 = 8.0;

/// Sensor gain multiplier table
pub(crate) static GAIN: LookupAdapter = LookupAdapter::new(&[
    (GAIN_X1, 0b00),
    (GAIN_X3_7, 0b01),
    (GAIN_X16, 0b10),
    (GAIN_X64, 0b11),
]);

/// Illumination LED current limit table, in milliamps
pub(crate) static ILLUMINATION_CURRENT_MA: LookupAdapter = LookupAdapter::new(&[
    (ILLUMINATION_CURRENT_12_5MA, 0b00),
    (ILLUMINATION_CURRENT_25MA, 0b01),
    (ILLUMINATION_CURRENT_50MA, 0b10),
    (ILLUMINATION_CURRENT_100MA, 0b11),
]);

/// Indicator LED current limit table, in milliamps
pub(crate) static INDICATOR_CURRENT_MA: LookupAdapter = LookupAdapter::new(&[
    (INDICATOR_CURRENT_1MA, 0b00),
    (INDICATOR_CURRENT_2MA, 0b01),
    (INDICATOR_CURRENT_4MA, 0b10),
    (INDICATOR_CURRENT_8MA, 0b11),
]);

/// Integration time scale, 2.8 ms per count
pub(crate) static INTEGRATION_TIME_SCALE: LinearScale = LinearScale::new(2.8);

/// The data conversion mode of the sensor
///
/// Modes select which channel banks convert and whether conversion repeats
/// continuously or runs once per request.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MeasurementMode {
    /// Continuous conversion of the violet, blue, green and yellow channels
    ContinuousVbgy = 0b00,
    /// Continuous conversion of the green, yellow, orange and red channels
    ContinuousGyor = 0b01,
    /// Continuous conversion of all six channels
    ContinuousAll = 0b10,
    /// One-shot conversion of all six channels
    OneShot = 0b11,
}

impl Default for MeasurementMode {
    fn default() -> Self {
        MeasurementMode::ContinuousAll
    }
}

impl MeasurementMode {
    /// The field code of this mode
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// The mode selected by a field code; only the low two bits matter
    pub const fn from_code(code: u8) -> Self {
        match code & 0b11 {
            0b00 => MeasurementMode::ContinuousVbgy,
            0b01 => MeasurementMode::ContinuousGyor,
            0b10 => MeasurementMode::ContinuousAll,
            _ => MeasurementMode::OneShot,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn gain_requests_snap_to_achievable_multipliers() {
        assert_eq!(GAIN.encode(1.0), Ok(0b00));
        assert_eq!(GAIN.encode(999.0), Ok(0b11));
        assert_eq!(GAIN.encode(-1.0), Ok(0b00));
        assert_eq!(GAIN.decode(0b11), Ok(GAIN_X64));
    }

    #[test]
    fn illumination_current_snaps_to_achievable_limits() {
        assert_eq!(ILLUMINATION_CURRENT_MA.encode(12.5), Ok(0b00));
        assert_eq!(ILLUMINATION_CURRENT_MA.encode(20.0), Ok(0b01));
        assert_eq!(ILLUMINATION_CURRENT_MA.encode(101.0), Ok(0b11));
    }

    #[test]
    fn indicator_current_snaps_to_achievable_limits() {
        assert_eq!(INDICATOR_CURRENT_MA.encode(4.0), Ok(0b10));
        assert_eq!(INDICATOR_CURRENT_MA.encode(9.0), Ok(0b11));
        assert_eq!(INDICATOR_CURRENT_MA.encode(0.0), Ok(0b00));
    }

    #[test]
    fn every_field_code_decodes() {
        for table in [&GAIN, &ILLUMINATION_CURRENT_MA, &INDICATOR_CURRENT_MA] {
            for code in 0..=0b11 {
                assert!(table.decode(code).is_ok());
            }
        }
    }

    #[test]
    fn measurement_mode_codes_round_trip() {
        for mode in [
            MeasurementMode::ContinuousVbgy,
            MeasurementMode::ContinuousGyor,
            MeasurementMode::ContinuousAll,
            MeasurementMode::OneShot,
        ] {
            assert_eq!(MeasurementMode::from_code(mode.code()), mode);
        }
    }
}
