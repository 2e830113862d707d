//! Low-level interface to the AS7262
//!
//! This module implements a register-level interface to the AS7262. Users of
//! this library should typically not need to use this. Please consider using
//! the [high-level interface] instead.
//!
//! The AS7262 exposes only three physical registers on the I2C bus: a status
//! register, a write register and a read register. The full register file is
//! virtual, reached one byte at a time through a pointer-select handshake on
//! those three registers. This module implements that handshake and lays the
//! typed register map on top of it.
//!
//! **NOTE**: Many field access methods accept types that have a larger number
//! of bits than the field actually consists of. If you use such a method to
//! pass a value that is too large to be written to the field, it will be
//! silently truncated.
//!
//! [high-level interface]: ../hl/index.html

use core::{fmt, marker::PhantomData};

use embedded_hal::i2c;

/// I2C device address of the AS7262
pub const DEFAULT_ADDRESS: u8 = 0x49;

/// Physical status register
const STATUS: u8 = 0x00;
/// Physical write register, doubles as pointer select and data sink
const WRITE_PTR: u8 = 0x01;
/// Physical read register
const READ_DATA: u8 = 0x02;

/// Status bit: a written byte is still pending inside the device
const STATUS_TX_VALID: u8 = 0b10;
/// Status bit: a requested byte is waiting in the read register
const STATUS_RX_VALID: u8 = 0b01;

/// Pointer-select flag marking the next transfer as a write
const WRITE_FLAG: u8 = 0x80;

/// Entry point to the AS7262 driver's low-level API
///
/// Owns the I2C bus handle exclusively. The pointer-select handshake is
/// stateful on the device side, so interleaving two logical operations over
/// one handle would corrupt the pointer; callers must serialize access.
///
/// Please consider using [hl::As7262] instead.
///
/// [hl::As7262]: ../hl/struct.As7262.html
pub struct As7262<I2C> {
    i2c: I2C,
    address: u8,
    poll_limit: Option<u32>,
}

impl<I2C> As7262<I2C> {
    /// Create a new instance of `As7262`
    ///
    /// Requires the I2C peripheral the AS7262 is connected to. The device
    /// address is fixed at [`DEFAULT_ADDRESS`].
    pub fn new(i2c: I2C) -> Self {
        As7262 {
            i2c,
            address: DEFAULT_ADDRESS,
            poll_limit: None,
        }
    }

    /// Bound the number of status polls per handshake step
    ///
    /// By default the status poll loops spin until the device responds, which
    /// matches the device's intended use but blocks forever if it is wedged.
    /// With a limit of `n`, a handshake step that is still not ready after
    /// `n` status reads fails with [`Error::DeviceUnresponsive`].
    pub fn set_poll_limit(&mut self, limit: Option<u32>) {
        self.poll_limit = limit;
    }

    /// Allow access to the I2C bus
    pub fn bus(&mut self) -> &mut I2C {
        &mut self.i2c
    }

    /// Release the I2C bus
    pub fn free(self) -> I2C {
        self.i2c
    }
}

impl<I2C> As7262<I2C>
where
    I2C: i2c::I2c,
{
    fn status(&mut self) -> Result<u8, Error<I2C>> {
        let mut status = [0];
        self.i2c
            .write_read(self.address, &[STATUS], &mut status)
            .map_err(Error::I2c)?;
        Ok(status[0])
    }

    /// Polls the status register until `status & mask == want`.
    fn poll_status(&mut self, mask: u8, want: u8) -> Result<(), Error<I2C>> {
        let mut polls = 0u32;
        loop {
            if self.status()? & mask == want {
                return Ok(());
            }
            polls += 1;
            if let Some(limit) = self.poll_limit {
                if polls >= limit {
                    return Err(Error::DeviceUnresponsive);
                }
            }
        }
    }

    fn write_pointer(&mut self, value: u8) -> Result<(), Error<I2C>> {
        self.i2c
            .write(self.address, &[WRITE_PTR, value])
            .map_err(Error::I2c)
    }

    /// Read `buffer.len()` bytes from a virtual register
    ///
    /// Bytes arrive most-significant first, one select/poll/read cycle per
    /// byte, with the pointer advanced explicitly for each offset.
    pub fn read_bytes(&mut self, register: u8, buffer: &mut [u8]) -> Result<(), Error<I2C>> {
        for (offset, byte) in buffer.iter_mut().enumerate() {
            self.poll_status(STATUS_TX_VALID, 0)?;
            self.write_pointer(register + offset as u8)?;
            self.poll_status(STATUS_RX_VALID, STATUS_RX_VALID)?;
            let mut data = [0];
            self.i2c
                .write_read(self.address, &[READ_DATA], &mut data)
                .map_err(Error::I2c)?;
            *byte = data[0];
        }
        Ok(())
    }

    /// Write `data` to a virtual register, most-significant byte first
    ///
    /// Pointer selection always targets the base register address; the
    /// device advances its internal pointer across a multi-byte write.
    pub fn write_bytes(&mut self, register: u8, data: &[u8]) -> Result<(), Error<I2C>> {
        for &byte in data {
            self.poll_status(STATUS_TX_VALID, 0)?;
            self.write_pointer(register | WRITE_FLAG)?;
            self.poll_status(STATUS_TX_VALID, 0)?;
            self.write_pointer(byte)?;
        }
        Ok(())
    }
}

/// Provides access to a register
///
/// You can get an instance for a given register using one of the methods on
/// [`As7262`].
pub struct RegAccessor<'s, R, I2C>(&'s mut As7262<I2C>, PhantomData<R>);

impl<'s, R, I2C> RegAccessor<'s, R, I2C>
where
    I2C: i2c::I2c,
{
    /// Read from the register
    #[inline]
    pub fn read(&mut self) -> Result<R::Read, Error<I2C>>
    where
        R: Register + Readable,
    {
        let mut r = R::read();
        self.0.read_bytes(R::ADDRESS, R::buffer(&mut r))?;
        Ok(r)
    }

    /// Write to the register
    ///
    /// The register image starts out zeroed; fields that `f` does not touch
    /// are written as zero.
    #[inline]
    pub fn write<F>(&mut self, f: F) -> Result<(), Error<I2C>>
    where
        R: Register + Writable,
        F: FnOnce(&mut R::Write) -> &mut R::Write,
    {
        let mut w = R::write();
        f(&mut w);
        self.0.write_bytes(R::ADDRESS, R::buffer(&mut w))
    }

    /// Modify the register
    ///
    /// Reads the register, lets `f` update fields on a copy of the image,
    /// then writes the result back. Fields that `f` does not touch keep
    /// their current value.
    #[inline]
    pub fn modify<F>(&mut self, f: F) -> Result<(), Error<I2C>>
    where
        R: Register + Readable + Writable,
        F: for<'r> FnOnce(&mut R::Read, &'r mut R::Write) -> &'r mut R::Write,
    {
        let mut r = self.read()?;
        let mut w = R::write();

        <R as Writable>::buffer(&mut w).copy_from_slice(<R as Readable>::buffer(&mut r));

        f(&mut r, &mut w);

        self.0.write_bytes(R::ADDRESS, <R as Writable>::buffer(&mut w))
    }
}

/// An error that can occur when accessing a virtual register
pub enum Error<I2C>
where
    I2C: i2c::ErrorType,
{
    /// Error occured on the physical I2C bus
    I2c(I2C::Error),

    /// A configured poll limit was exhausted while waiting on the status
    /// register
    ///
    /// Only returned after [`As7262::set_poll_limit`]; without a limit the
    /// handshake polls indefinitely.
    DeviceUnresponsive,
}

// We can't derive this implementation, as the compiler will complain that the
// associated error type doesn't implement `Debug`.
impl<I2C> fmt::Debug for Error<I2C>
where
    I2C: i2c::ErrorType,
    I2C::Error: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::I2c(error) => write!(f, "I2c({:?})", error),
            Error::DeviceUnresponsive => write!(f, "DeviceUnresponsive"),
        }
    }
}

#[cfg(feature = "defmt")]
impl<I2C> defmt::Format for Error<I2C>
where
    I2C: i2c::ErrorType,
{
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::I2c(_) => defmt::write!(f, "I2c()"),
            Error::DeviceUnresponsive => defmt::write!(f, "DeviceUnresponsive"),
        }
    }
}

/// Implemented for all registers
///
/// This is a mostly internal trait that should not be implemented or used
/// directly by users of this crate. It is exposed through the public API
/// though, so it can't be made private.
pub trait Register {
    /// The virtual register address
    const ADDRESS: u8;

    /// The length of the register in bytes
    const LEN: usize;
}

/// Marker trait for registers that can be read from
///
/// This is a mostly internal trait that should not be implemented or used
/// directly by users of this crate. It is exposed through the public API
/// though, so it can't be made private.
pub trait Readable {
    /// The type that is used to read from the register
    type Read;

    /// Return the read type for this register
    fn read() -> Self::Read;

    /// Return the read type's internal buffer
    fn buffer(r: &mut Self::Read) -> &mut [u8];
}

/// Marker trait for registers that can be written to
///
/// This is a mostly internal trait that should not be implemented or used
/// directly by users of this crate. It is exposed through the public API
/// though, so it can't be made private.
pub trait Writable {
    /// The type that is used to write to the register
    type Write;

    /// Return the write type for this register
    fn write() -> Self::Write;

    /// Return the write type's internal buffer
    fn buffer(w: &mut Self::Write) -> &mut [u8];
}

/// Extracts the bits `first..=last` of a register image
///
/// Bit 0 is the least significant bit of the register value; the image holds
/// the most significant byte first, as read off the wire.
pub(crate) fn extract_bits(image: &[u8], first: usize, last: usize) -> u64 {
    let mut value = 0u64;
    let mut byte = last / 8;
    loop {
        value = value << 8 | u64::from(image[image.len() - 1 - byte]);
        if byte == first / 8 {
            break;
        }
        byte -= 1;
    }
    value >>= first % 8;
    let width = last - first + 1;
    if width < 64 {
        value &= (1u64 << width) - 1;
    }
    value
}

/// Writes the low `last - first + 1` bits of `value` into a register image
///
/// Bits of `value` above the field width are discarded. Same bit and byte
/// order as [`extract_bits`].
pub(crate) fn insert_bits(image: &mut [u8], first: usize, last: usize, value: u64) {
    let len = image.len();
    let mut value = value;
    let mut bit = first;
    while bit <= last {
        let index = len - 1 - bit / 8;
        let shift = bit % 8;
        let take = (8 - shift).min(last - bit + 1);
        let mask = (0xffu16 >> (8 - take)) as u8;
        image[index] &= !(mask << shift);
        image[index] |= ((value as u8) & mask) << shift;
        value >>= take;
        bit += take;
    }
}

/// Generates register implementations
macro_rules! impl_register {
    (
        $(
            $address:expr,
            $len:expr,
            $rw:tt,
            $name:ident($name_lower:ident) {
            #[$doc:meta]
            $(
                $field:ident,
                $first_bit:expr,
                $last_bit:expr,
                $ty:ty;
                #[$field_doc:meta]
            )*
            }
        )*
    ) => {
        $(
            #[$doc]
            #[allow(non_camel_case_types)]
            pub struct $name;

            impl Register for $name {
                const ADDRESS: u8  = $address;
                const LEN: usize = $len;
            }

            // Field layout is checked while the map is built: every field
            // must lie inside the register and no two fields may share a bit.
            const _: () = {
                let fields: &[(usize, usize)] = &[$(($first_bit, $last_bit)),*];
                let mut occupied = [0u64; ($len * 8 + 63) / 64];
                let mut i = 0;
                while i < fields.len() {
                    let (first, last) = (fields[i].0, fields[i].1);
                    assert!(first <= last, "field bit range is reversed");
                    assert!(last < $len * 8, "field exceeds register width");
                    assert!(last / 8 - first / 8 < 8, "field spans more than eight bytes");
                    let mut bit = first;
                    while bit <= last {
                        assert!(
                            occupied[bit / 64] & (1u64 << (bit % 64)) == 0,
                            "overlapping register fields"
                        );
                        occupied[bit / 64] |= 1u64 << (bit % 64);
                        bit += 1;
                    }
                    i += 1;
                }
            };

            #[$doc]
            pub mod $name_lower {
                use core::fmt;

                /// Used to read from the register
                pub struct R(pub(crate) [u8; $len]);

                impl R {
                    $(
                        #[$field_doc]
                        #[inline(always)]
                        pub fn $field(&self) -> $ty {
                            crate::ll::extract_bits(&self.0, $first_bit, $last_bit) as $ty
                        }
                    )*
                }

                impl fmt::Debug for R {
                    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                        write!(f, "0x")?;
                        for byte in &self.0 {
                            write!(f, "{:02x}", byte)?;
                        }

                        Ok(())
                    }
                }

                #[cfg(feature = "defmt")]
                impl defmt::Format for R {
                    fn format(&self, f: defmt::Formatter) {
                        defmt::write!(f, "0x");
                        for byte in &self.0 {
                            defmt::write!(f, "{:02x}", byte);
                        }
                    }
                }

                /// Used to write to the register
                pub struct W(pub(crate) [u8; $len]);

                impl W {
                    $(
                        #[$field_doc]
                        #[inline(always)]
                        pub fn $field(&mut self, value: $ty) -> &mut Self {
                            crate::ll::insert_bits(
                                &mut self.0,
                                $first_bit,
                                $last_bit,
                                value as u64,
                            );
                            self
                        }
                    )*
                }
            }

            impl_rw!($rw, $name, $name_lower, $len);
        )*

        impl<I2C> As7262<I2C> {
            $(
                #[$doc]
                pub fn $name_lower(&mut self) -> RegAccessor<$name, I2C> {
                    RegAccessor(self, PhantomData)
                }
            )*
        }
    }
}

// Helper macro, used internally by `impl_register!`
macro_rules! impl_rw {
    (RO, $name:ident, $name_lower:ident, $len:expr) => {
        impl_rw!(@R, $name, $name_lower, $len);
    };
    (RW, $name:ident, $name_lower:ident, $len:expr) => {
        impl_rw!(@R, $name, $name_lower, $len);
        impl_rw!(@W, $name, $name_lower, $len);
    };

    (@R, $name:ident, $name_lower:ident, $len:expr) => {
        impl Readable for $name {
            type Read = $name_lower::R;

            fn read() -> Self::Read {
                $name_lower::R([0; $len])
            }

            fn buffer(r: &mut Self::Read) -> &mut [u8] {
                &mut r.0
            }
        }
    };
    (@W, $name:ident, $name_lower:ident, $len:expr) => {
        impl Writable for $name {
            type Write = $name_lower::W;

            fn write() -> Self::Write {
                $name_lower::W([0; $len])
            }

            fn buffer(w: &mut Self::Write) -> &mut [u8] {
                &mut w.0
            }
        }
    };
}

// All registers are implemented in this macro invocation. It follows the
// following syntax:
// <address>, <size-bytes>, <RO/RW>, <NAME(name)> { /// <doc>
//     <field>, <first-bit-index>, <last-bit-index>, <type>; /// <doc>
//     ...
// }
//
// Bit indices count from the least significant bit of the register value.

impl_register! {
    0x00, 4, RO, VERSION(version) { /// Hardware type and version, firmware version
        hw_type,    24, 31, u8;  /// Hardware type
        hw_version, 16, 23, u8;  /// Hardware version
        fw_version,  0, 15, u16; /// Packed firmware version, see [`FirmwareVersion`](crate::adapter::FirmwareVersion)
    }
    0x04, 1, RW, CONTROL(control) { /// Control and status
        reset,            7, 7, u8; /// Soft reset, self-clearing
        interrupt,        6, 6, u8; /// Interrupt pin enable
        gain_x,           4, 5, u8; /// Sensor gain code
        measurement_mode, 2, 3, u8; /// Data conversion bank mode
        data_ready,       1, 1, u8; /// Data ready for the selected mode
    }
    0x05, 1, RW, INTEGRATION_TIME(integration_time) { /// Integration time
        value, 0, 7, u8; /// Integration time in units of 2.8 ms
    }
    0x06, 1, RO, TEMPERATURE(temperature) { /// Device temperature
        degrees_c, 0, 7, u8; /// Temperature in degrees Celsius
    }
    0x07, 1, RW, LED_CONTROL(led_control) { /// LED control
        illumination_current_limit, 4, 5, u8; /// Illumination LED current limit code
        illumination_enable,        3, 3, u8; /// Illumination LED enable
        indicator_current_limit,    1, 2, u8; /// Indicator LED current limit code
        indicator_enable,           0, 0, u8; /// Indicator LED enable
    }
    0x08, 12, RO, DATA(data) { /// Raw channel counts
        v, 80, 95, u16; /// Violet
        b, 64, 79, u16; /// Blue
        g, 48, 63, u16; /// Green
        y, 32, 47, u16; /// Yellow
        o, 16, 31, u16; /// Orange
        r,  0, 15, u16; /// Red
    }
    0x14, 24, RO, CALIBRATED_DATA(calibrated_data) { /// Calibrated channel values
        v, 160, 191, u32; /// Violet, IEEE 754 bits
        b, 128, 159, u32; /// Blue, IEEE 754 bits
        g,  96, 127, u32; /// Green, IEEE 754 bits
        y,  64,  95, u32; /// Yellow, IEEE 754 bits
        o,  32,  63, u32; /// Orange, IEEE 754 bits
        r,   0,  31, u32; /// Red, IEEE 754 bits
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};

    const ADDR: u8 = DEFAULT_ADDRESS;

    fn status_ready() -> I2cTransaction {
        // Bit 1 clear and bit 0 set, so both poll kinds pass first try
        I2cTransaction::write_read(ADDR, vec![STATUS], vec![0b01])
    }

    fn status_busy() -> I2cTransaction {
        I2cTransaction::write_read(ADDR, vec![STATUS], vec![0b10])
    }

    #[test]
    fn single_byte_write_is_four_bus_operations() {
        let i2c = I2cMock::new(&[
            status_ready(),
            I2cTransaction::write(ADDR, vec![WRITE_PTR, 0x05 | 0x80]),
            status_ready(),
            I2cTransaction::write(ADDR, vec![WRITE_PTR, 0xfa]),
        ]);

        let mut as7262 = As7262::new(i2c);
        as7262.integration_time().write(|w| w.value(0xfa)).unwrap();

        as7262.free().done();
    }

    #[test]
    fn single_byte_read_is_four_bus_operations() {
        let i2c = I2cMock::new(&[
            status_ready(),
            I2cTransaction::write(ADDR, vec![WRITE_PTR, 0x06]),
            status_ready(),
            I2cTransaction::write_read(ADDR, vec![READ_DATA], vec![42]),
        ]);

        let mut as7262 = As7262::new(i2c);
        let temperature = as7262.temperature().read().unwrap();
        assert_eq!(temperature.degrees_c(), 42);

        as7262.free().done();
    }

    #[test]
    fn multi_byte_write_repeats_base_pointer() {
        let i2c = I2cMock::new(&[
            status_ready(),
            I2cTransaction::write(ADDR, vec![WRITE_PTR, 0x05 | 0x80]),
            status_ready(),
            I2cTransaction::write(ADDR, vec![WRITE_PTR, 0xaa]),
            status_ready(),
            // Second data byte selects the same base address again
            I2cTransaction::write(ADDR, vec![WRITE_PTR, 0x05 | 0x80]),
            status_ready(),
            I2cTransaction::write(ADDR, vec![WRITE_PTR, 0xbb]),
        ]);

        let mut as7262 = As7262::new(i2c);
        as7262.write_bytes(0x05, &[0xaa, 0xbb]).unwrap();

        as7262.free().done();
    }

    #[test]
    fn multi_byte_read_increments_pointer() {
        let mut expectations = Vec::new();
        for (offset, byte) in [0x88u8, 0x77, 0xfe, 0xff].iter().enumerate() {
            expectations.push(status_ready());
            expectations.push(I2cTransaction::write(ADDR, vec![WRITE_PTR, offset as u8]));
            expectations.push(status_ready());
            expectations.push(I2cTransaction::write_read(ADDR, vec![READ_DATA], vec![*byte]));
        }
        let i2c = I2cMock::new(&expectations);

        let mut as7262 = As7262::new(i2c);
        let version = as7262.version().read().unwrap();
        assert_eq!(version.hw_type(), 0x88);
        assert_eq!(version.hw_version(), 0x77);
        assert_eq!(version.fw_version(), 0xfeff);

        as7262.free().done();
    }

    #[test]
    fn polls_status_until_ready() {
        let i2c = I2cMock::new(&[
            status_busy(),
            status_busy(),
            status_ready(),
            I2cTransaction::write(ADDR, vec![WRITE_PTR, 0x06]),
            // Not ready for reading yet on the first poll
            I2cTransaction::write_read(ADDR, vec![STATUS], vec![0b00]),
            status_ready(),
            I2cTransaction::write_read(ADDR, vec![READ_DATA], vec![7]),
        ]);

        let mut as7262 = As7262::new(i2c);
        let temperature = as7262.temperature().read().unwrap();
        assert_eq!(temperature.degrees_c(), 7);

        as7262.free().done();
    }

    #[test]
    fn exhausted_poll_limit_is_device_unresponsive() {
        let i2c = I2cMock::new(&[status_busy(), status_busy(), status_busy()]);

        let mut as7262 = As7262::new(i2c);
        as7262.set_poll_limit(Some(3));
        let result = as7262.write_bytes(0x05, &[0x01]);
        assert!(matches!(result, Err(Error::DeviceUnresponsive)));

        as7262.free().done();
    }

    #[test]
    fn modify_preserves_untouched_fields() {
        let i2c = I2cMock::new(&[
            // Read back the current control image, 0b0000_1100
            status_ready(),
            I2cTransaction::write(ADDR, vec![WRITE_PTR, 0x04]),
            status_ready(),
            I2cTransaction::write_read(ADDR, vec![READ_DATA], vec![0b0000_1100]),
            // Write it back with only the gain bits changed
            status_ready(),
            I2cTransaction::write(ADDR, vec![WRITE_PTR, 0x04 | 0x80]),
            status_ready(),
            I2cTransaction::write(ADDR, vec![WRITE_PTR, 0b0011_1100]),
        ]);

        let mut as7262 = As7262::new(i2c);
        as7262.control().modify(|_, w| w.gain_x(0b11)).unwrap();

        as7262.free().done();
    }

    #[test]
    fn extract_picks_field_out_of_wire_image() {
        let image = [0x88, 0x77, 0xfe, 0xff];
        assert_eq!(extract_bits(&image, 24, 31), 0x88);
        assert_eq!(extract_bits(&image, 16, 23), 0x77);
        assert_eq!(extract_bits(&image, 0, 15), 0xfeff);
    }

    #[test]
    fn extract_handles_sub_byte_fields() {
        let image = [0b0011_0110];
        assert_eq!(extract_bits(&image, 4, 5), 0b11);
        assert_eq!(extract_bits(&image, 2, 3), 0b01);
        assert_eq!(extract_bits(&image, 1, 1), 0b1);
    }

    #[test]
    fn insert_truncates_to_field_width() {
        let mut image = [0u8];
        insert_bits(&mut image, 4, 5, 0b111);
        assert_eq!(image[0], 0b0011_0000);
    }

    #[test]
    fn insert_leaves_other_bits_alone() {
        let mut image = [0xff_u8];
        insert_bits(&mut image, 2, 3, 0);
        assert_eq!(image[0], 0b1111_0011);
    }

    #[test]
    fn insert_spans_byte_boundaries() {
        let mut image = [0u8; 12];
        insert_bits(&mut image, 80, 95, 0xabcd);
        assert_eq!(image[0], 0xab);
        assert_eq!(image[1], 0xcd);
        assert_eq!(extract_bits(&image, 80, 95), 0xabcd);
    }
}
