//! Driver crate for the AS7262 visible light spectral sensor
//!
//! The recommended way to use this driver is the [high-level interface]. If you
//! require a higher degree of flexibility, you can use the
//! [register-level interface] instead.
//!
//! The AS7262 hides its register file behind a three-register virtual
//! interface: every logical register access is a sequence of status polls and
//! pointer writes on the physical bus. The register-level interface implements
//! that handshake; the high-level interface adds typed accessors for every
//! field, including the encoded ones (gain, LED current limits, integration
//! time, firmware version, calibrated channel floats).
//!
//! This driver is built on top of [`embedded-hal`], which means it is portable
//! and can be used on any platform that implements the `embedded-hal` API.
//!
//! [high-level interface]: hl/index.html
//! [register-level interface]: ll/index.html
//! [`embedded-hal`]: https://crates.io/crates/embedded-hal
#![cfg_attr(not(any(test, feature = "std")), no_std)]

pub mod adapter;
pub mod configs;
pub mod hl;
pub mod ll;

pub use crate::{
    adapter::{FirmwareVersion, InvalidFieldValue},
    configs::MeasurementMode,
    hl::{As7262, CalibratedValues, Error, RawValues, Version},
    ll::DEFAULT_ADDRESS,
};
