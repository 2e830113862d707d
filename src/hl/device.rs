use embedded_hal::{delay::DelayNs, i2c};

use super::{As7262, Error};
use crate::{
    adapter::{FirmwareVersion, Float32},
    configs::{self, MeasurementMode},
    ll,
};

/// How long the device needs to come back after a soft reset
const RESET_SETTLE_MS: u32 = 2_000;

/// Hardware identification and firmware version
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Version {
    /// Hardware type
    pub hw_type: u8,
    /// Hardware version
    pub hw_version: u8,
    /// Firmware version
    pub firmware: FirmwareVersion,
}

/// Raw counts of the six spectral channels
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawValues {
    /// Red channel, 610 nm
    pub red: u16,
    /// Orange channel, 585 nm
    pub orange: u16,
    /// Yellow channel, 570 nm
    pub yellow: u16,
    /// Green channel, 550 nm
    pub green: u16,
    /// Blue channel, 500 nm
    pub blue: u16,
    /// Violet channel, 450 nm
    pub violet: u16,
}

impl RawValues {
    /// Channel counts ordered red to violet
    pub fn channels(&self) -> [u16; 6] {
        [
            self.red,
            self.orange,
            self.yellow,
            self.green,
            self.blue,
            self.violet,
        ]
    }
}

/// Calibrated values of the six spectral channels
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CalibratedValues {
    /// Red channel, 610 nm
    pub red: f32,
    /// Orange channel, 585 nm
    pub orange: f32,
    /// Yellow channel, 570 nm
    pub yellow: f32,
    /// Green channel, 550 nm
    pub green: f32,
    /// Blue channel, 500 nm
    pub blue: f32,
    /// Violet channel, 450 nm
    pub violet: f32,
}

impl CalibratedValues {
    /// Channel values ordered red to violet
    pub fn channels(&self) -> [f32; 6] {
        [
            self.red,
            self.orange,
            self.yellow,
            self.green,
            self.blue,
            self.violet,
        ]
    }
}

impl<I2C> As7262<I2C> {
    /// Create a new instance of `As7262`
    ///
    /// Requires the I2C peripheral the AS7262 is connected to.
    pub fn new(i2c: I2C) -> Self {
        As7262 {
            ll: ll::As7262::new(i2c),
        }
    }

    /// Bound the number of status polls per handshake step
    ///
    /// See [`ll::As7262::set_poll_limit`].
    pub fn set_poll_limit(&mut self, limit: Option<u32>) {
        self.ll.set_poll_limit(limit);
    }

    /// Provides direct access to the register-level API
    ///
    /// Be aware that by using the register-level API, you can invalidate
    /// various assumptions that the high-level API makes about the operation
    /// of the AS7262. Don't use the register-level and high-level APIs in
    /// tandem, unless you know what you're doing.
    pub fn ll(&mut self) -> &mut ll::As7262<I2C> {
        &mut self.ll
    }

    /// Release the I2C bus
    pub fn free(self) -> I2C {
        self.ll.free()
    }
}

impl<I2C> As7262<I2C>
where
    I2C: i2c::I2c,
{
    /// Returns the hardware type and version and the firmware version
    ///
    /// All three are decoded from a single read of the version register.
    pub fn version(&mut self) -> Result<Version, Error<I2C>> {
        let version = self.ll.version().read()?;

        Ok(Version {
            hw_type: version.hw_type(),
            hw_version: version.hw_version(),
            firmware: FirmwareVersion::from_raw(version.fw_version()),
        })
    }

    /// Returns the current gain multiplier
    pub fn gain(&mut self) -> Result<f32, Error<I2C>> {
        let control = self.ll.control().read()?;

        Ok(configs::GAIN.decode(control.gain_x())?)
    }

    /// Set the gain multiplier
    ///
    /// The request snaps to the nearest achievable gain: one of 1, 3.7, 16
    /// or 64.
    pub fn set_gain(&mut self, gain: f32) -> Result<(), Error<I2C>> {
        let code = configs::GAIN.encode(gain)?;
        self.ll.control().modify(|_, w| w.gain_x(code))?;

        Ok(())
    }

    /// Returns the current measurement mode
    pub fn measurement_mode(&mut self) -> Result<MeasurementMode, Error<I2C>> {
        let control = self.ll.control().read()?;

        Ok(MeasurementMode::from_code(control.measurement_mode()))
    }

    /// Set the measurement mode
    pub fn set_measurement_mode(&mut self, mode: MeasurementMode) -> Result<(), Error<I2C>> {
        self.ll
            .control()
            .modify(|_, w| w.measurement_mode(mode.code()))?;

        Ok(())
    }

    /// Returns whether the interrupt pin is enabled
    pub fn interrupt_enabled(&mut self) -> Result<bool, Error<I2C>> {
        let control = self.ll.control().read()?;

        Ok(control.interrupt() == 1)
    }

    /// Enable or disable the interrupt pin
    pub fn set_interrupt(&mut self, enable: bool) -> Result<(), Error<I2C>> {
        self.ll.control().modify(|_, w| w.interrupt(enable as u8))?;

        Ok(())
    }

    /// Returns whether converted data is ready for the selected mode
    pub fn data_ready(&mut self) -> Result<bool, Error<I2C>> {
        let control = self.ll.control().read()?;

        Ok(control.data_ready() == 1)
    }

    /// Returns the integration time in milliseconds
    pub fn integration_time_ms(&mut self) -> Result<f32, Error<I2C>> {
        let integration_time = self.ll.integration_time().read()?;

        Ok(configs::INTEGRATION_TIME_SCALE.decode(u64::from(integration_time.value())))
    }

    /// Set the integration time in milliseconds
    ///
    /// The device counts in steps of 2.8 ms, so the value quantizes: 50 ms is
    /// exact, 90 ms lands on 89.6 ms. Values beyond the 8-bit count range
    /// alias through the register width.
    pub fn set_integration_time_ms(&mut self, ms: f32) -> Result<(), Error<I2C>> {
        let raw = configs::INTEGRATION_TIME_SCALE.encode(ms);
        self.ll
            .integration_time()
            .write(|w| w.value(raw as u8))?;

        Ok(())
    }

    /// Returns the device temperature in degrees Celsius
    pub fn temperature_c(&mut self) -> Result<u8, Error<I2C>> {
        let temperature = self.ll.temperature().read()?;

        Ok(temperature.degrees_c())
    }

    /// Returns the illumination LED current limit in milliamps
    pub fn illumination_current_ma(&mut self) -> Result<f32, Error<I2C>> {
        let led_control = self.ll.led_control().read()?;

        Ok(configs::ILLUMINATION_CURRENT_MA.decode(led_control.illumination_current_limit())?)
    }

    /// Set the illumination LED current limit in milliamps
    ///
    /// The request snaps to the nearest achievable limit: one of 12.5, 25,
    /// 50 or 100 mA.
    pub fn set_illumination_current_ma(&mut self, current: f32) -> Result<(), Error<I2C>> {
        let code = configs::ILLUMINATION_CURRENT_MA.encode(current)?;
        self.ll
            .led_control()
            .modify(|_, w| w.illumination_current_limit(code))?;

        Ok(())
    }

    /// Switch the illumination LED on or off
    pub fn set_illumination_led(&mut self, on: bool) -> Result<(), Error<I2C>> {
        self.ll
            .led_control()
            .modify(|_, w| w.illumination_enable(on as u8))?;

        Ok(())
    }

    /// Returns the indicator LED current limit in milliamps
    pub fn indicator_current_ma(&mut self) -> Result<f32, Error<I2C>> {
        let led_control = self.ll.led_control().read()?;

        Ok(configs::INDICATOR_CURRENT_MA.decode(led_control.indicator_current_limit())?)
    }

    /// Set the indicator LED current limit in milliamps
    ///
    /// The request snaps to the nearest achievable limit: one of 1, 2, 4 or
    /// 8 mA.
    pub fn set_indicator_current_ma(&mut self, current: f32) -> Result<(), Error<I2C>> {
        let code = configs::INDICATOR_CURRENT_MA.encode(current)?;
        self.ll
            .led_control()
            .modify(|_, w| w.indicator_current_limit(code))?;

        Ok(())
    }

    /// Switch the indicator LED on or off
    pub fn set_indicator_led(&mut self, on: bool) -> Result<(), Error<I2C>> {
        self.ll
            .led_control()
            .modify(|_, w| w.indicator_enable(on as u8))?;

        Ok(())
    }

    /// Returns the raw counts of all six channels
    ///
    /// All channels are decoded from a single read of the data register, so
    /// they belong to the same conversion.
    pub fn raw_values(&mut self) -> Result<RawValues, Error<I2C>> {
        let data = self.ll.data().read()?;

        Ok(RawValues {
            red: data.r(),
            orange: data.o(),
            yellow: data.y(),
            green: data.g(),
            blue: data.b(),
            violet: data.v(),
        })
    }

    /// Returns the calibrated values of all six channels
    ///
    /// All channels are decoded from a single read of the calibrated data
    /// register, so they belong to the same conversion.
    pub fn calibrated_values(&mut self) -> Result<CalibratedValues, Error<I2C>> {
        let data = self.ll.calibrated_data().read()?;

        Ok(CalibratedValues {
            red: Float32::decode(data.r()),
            orange: Float32::decode(data.o()),
            yellow: Float32::decode(data.y()),
            green: Float32::decode(data.g()),
            blue: Float32::decode(data.b()),
            violet: Float32::decode(data.v()),
        })
    }

    /// Wait until converted data is ready
    ///
    /// Polls the data ready flag about once per millisecond. Returns `true`
    /// as soon as the flag is set, or `false` once `timeout_ms` has elapsed
    /// without it.
    pub fn wait_until_ready<D: DelayNs>(
        &mut self,
        delay: &mut D,
        timeout_ms: u32,
    ) -> Result<bool, Error<I2C>> {
        let mut waited_ms = 0;
        loop {
            if self.data_ready()? {
                return Ok(true);
            }
            if waited_ms >= timeout_ms {
                return Ok(false);
            }
            delay.delay_ms(1);
            waited_ms += 1;
        }
    }

    /// Soft-reset the device
    ///
    /// Sets the reset flag and then waits out a fixed settle time. The
    /// virtual register machine cannot respond while the reset is in
    /// progress, so the flag cannot be polled; the settle time is long
    /// enough for a full restart.
    pub fn soft_reset<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), Error<I2C>> {
        self.ll.control().modify(|_, w| w.reset(1))?;

        delay.delay_ms(RESET_SETTLE_MS);

        Ok(())
    }
}
