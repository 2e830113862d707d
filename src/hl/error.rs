use core::fmt;
use core::fmt::{Display, Formatter};

use embedded_hal::i2c;

use crate::{adapter::InvalidFieldValue, ll};

/// An error that can occur when operating the AS7262
pub enum Error<I2C>
where
    I2C: i2c::ErrorType,
{
    /// Error occured while accessing a virtual register
    I2c(ll::Error<I2C>),

    /// A value could not be converted by a field's adapter
    InvalidFieldValue,
}

impl<I2C> From<ll::Error<I2C>> for Error<I2C>
where
    I2C: i2c::ErrorType,
{
    fn from(error: ll::Error<I2C>) -> Self {
        Error::I2c(error)
    }
}

impl<I2C> From<InvalidFieldValue> for Error<I2C>
where
    I2C: i2c::ErrorType,
{
    fn from(_: InvalidFieldValue) -> Self {
        Error::InvalidFieldValue
    }
}

impl<I2C> Display for Error<I2C>
where
    I2C: i2c::ErrorType,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[cfg(feature = "std")]
impl<I2C> std::error::Error for Error<I2C> where I2C: i2c::ErrorType {}

// We can't derive this implementation, as `Debug` is only implemented
// conditionally for `ll::Error`.
impl<I2C> fmt::Debug for Error<I2C>
where
    I2C: i2c::ErrorType,
    I2C::Error: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::I2c(error) => write!(f, "I2c({:?})", error),
            Error::InvalidFieldValue => write!(f, "InvalidFieldValue"),
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
            Error::I2c(error) => defmt::write!(f, "I2c({:?})", error),
            Error::InvalidFieldValue => defmt::write!(f, "InvalidFieldValue"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use embedded_hal_mock::eh1::i2c::Mock as I2cMock;

    #[test]
    fn display_names_the_variant() {
        let error: Error<I2cMock> = Error::InvalidFieldValue;

        assert_eq!(format!("{}", error), "InvalidFieldValue");
    }
}
