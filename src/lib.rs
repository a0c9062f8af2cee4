//! Build & flash automation for the AVR gamepad boards.
//!
//! The library drives three external tool families through one capability
//! interface ([`toolchain::ToolRunner`]): the `cargo` cross build, the
//! `avrdude` serial ISP programmer, and the `dfu-programmer`/`avr-objcopy`/
//! `lsusb` trio used for the USB interface chip's DFU bootloader.
//!
//! [`api`] holds the user-facing entry points; everything underneath is a
//! plain sequential pipeline that reports progress through
//! [`operation::OperationEvent`] callbacks.

pub mod api;
pub mod build;
pub mod descriptor;
pub mod dfu;
pub mod isp;
pub mod operation;
pub mod profiles;
pub mod toolchain;
