#![cfg_attr(not(test), no_std)]

//! avr-blink - blink the indicator LED of an AVR board
//!
//! The LED wiring and timing are resolved at build time by `build.rs` (see
//! [`config`] and [`wiring`]); the firmware only pokes two registers and
//! spins between them.

pub mod blink;
pub mod config;
pub mod delay;
pub mod error;
pub mod register;
pub mod wiring;

pub use blink::Blinker;
pub use config::{BlinkTiming, BuildConfig};
pub use delay::CycleDelay;
pub use error::ConfigError;
pub use register::{Mmio, Register};
pub use wiring::{DeviceFamily, LedWiring, Port};
