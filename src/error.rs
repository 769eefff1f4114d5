//! Build configuration errors
//!
//! Every variant is raised while `build.rs` resolves the LED wiring and
//! aborts the build. None of them can occur on the device.

use thiserror::Error;

use crate::wiring::{DeviceFamily, Port};

/// Result type for build configuration
pub type Result<T> = core::result::Result<T, ConfigError>;

/// Reasons the LED wiring or timing could not be resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// No complete override set and no known device family
    #[error(
        "BLINK_LED_PORT/BLINK_LED_PIN/BLINK_LED_DDR are not all set, and the LED wiring \
         could not be determined from the device family"
    )]
    UnresolvedTarget,
    /// Override value is not a register name
    #[error("{var} does not name a port register")]
    InvalidRegister { var: &'static str },
    /// Override names a register of the wrong kind, e.g. `DDRB` for the output
    #[error("{var} names the wrong kind of register")]
    WrongRegisterKind { var: &'static str },
    /// Direction and output registers belong to different ports
    #[error("output register PORT{output} and direction register DDR{direction} belong to different ports")]
    PortMismatch { output: Port, direction: Port },
    /// Bit position does not parse as a number
    #[error("BLINK_LED_PIN is not a bit position")]
    InvalidPin,
    /// Bit position outside an 8-bit port
    #[error("BLINK_LED_PIN {0} is out of range 0-7")]
    PinOutOfRange(u8),
    /// Port does not exist on the selected device
    #[error("port {port} does not exist on {family}")]
    PortNotOnDevice { port: Port, family: DeviceFamily },
    /// Duration is not a positive number of milliseconds
    #[error("{var} must be a positive number of milliseconds")]
    InvalidDuration { var: &'static str },
    /// Clock frequency is not a positive number of Hz
    #[error("AVR_CPU_FREQUENCY_HZ must be a positive frequency in Hz")]
    InvalidFrequency,
    /// More than one device family feature is enabled
    #[error("device family features {first} and {second} are both enabled")]
    MultipleFamilies {
        first: DeviceFamily,
        second: DeviceFamily,
    },
    /// Family feature and `-C target-cpu` name chips wired differently
    #[error("device family feature {feature} does not match target-cpu {target_cpu}")]
    FamilyMismatch {
        feature: DeviceFamily,
        target_cpu: DeviceFamily,
    },
}

impl ConfigError {
    /// What to change in the build to get past this error, if there is a
    /// generic answer
    pub fn help(&self) -> Option<&'static str> {
        match self {
            ConfigError::UnresolvedTarget => Some(
                "enable one of the device family features, or set \
                 BLINK_LED_PORT, BLINK_LED_DDR and BLINK_LED_PIN",
            ),
            _ => None,
        }
    }
}
