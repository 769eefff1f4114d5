//! LED wiring: ports, register names and the device family table
//!
//! This module is also compiled into `build.rs`, so it must stay free of
//! anything that only exists on the device.

use core::fmt;

use crate::error::{ConfigError, Result};

/// Output register override, e.g. `PORTB`
pub const ENV_LED_PORT: &str = "BLINK_LED_PORT";
/// Direction register override, e.g. `DDRB`
pub const ENV_LED_DDR: &str = "BLINK_LED_DDR";
/// Bit position override, `0`-`7`
pub const ENV_LED_PIN: &str = "BLINK_LED_PIN";

/// An 8-bit megaAVR I/O port
///
/// Each port has three consecutive data-space registers: `PINx`, `DDRx`
/// and `PORTx`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Port {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    J,
    K,
    L,
}

impl Port {
    /// Data-space address of `PINx`
    pub const fn pin_address(self) -> u16 {
        match self {
            Port::A => 0x20,
            Port::B => 0x23,
            Port::C => 0x26,
            Port::D => 0x29,
            Port::E => 0x2C,
            Port::F => 0x2F,
            Port::G => 0x32,
            // Ports H-L live past the I/O space, only on the 640/1280/2560.
            Port::H => 0x100,
            Port::J => 0x103,
            Port::K => 0x106,
            Port::L => 0x109,
        }
    }

    /// Data-space address of `DDRx`
    pub const fn direction_address(self) -> u16 {
        self.pin_address() + 1
    }

    /// Data-space address of `PORTx`
    pub const fn output_address(self) -> u16 {
        self.pin_address() + 2
    }

    pub const fn letter(self) -> char {
        match self {
            Port::A => 'A',
            Port::B => 'B',
            Port::C => 'C',
            Port::D => 'D',
            Port::E => 'E',
            Port::F => 'F',
            Port::G => 'G',
            Port::H => 'H',
            Port::J => 'J',
            Port::K => 'K',
            Port::L => 'L',
        }
    }

    pub fn from_letter(letter: char) -> Option<Self> {
        let port = match letter.to_ascii_uppercase() {
            'A' => Port::A,
            'B' => Port::B,
            'C' => Port::C,
            'D' => Port::D,
            'E' => Port::E,
            'F' => Port::F,
            'G' => Port::G,
            'H' => Port::H,
            'J' => Port::J,
            'K' => Port::K,
            'L' => Port::L,
            _ => return None,
        };
        Some(port)
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Which register of a port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterKind {
    /// `DDRx`, selects input or output per pin
    Direction,
    /// `PORTx`, drives the level of output pins
    Output,
}

/// A named port register such as `PORTB` or `DDRC`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterName {
    pub kind: RegisterKind,
    pub port: Port,
}

impl RegisterName {
    /// Parse `PORTx` or `DDRx`, ignoring case and surrounding whitespace
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        let (kind, rest) = if let Some(rest) = strip_prefix_ignore_case(name, "PORT") {
            (RegisterKind::Output, rest)
        } else if let Some(rest) = strip_prefix_ignore_case(name, "DDR") {
            (RegisterKind::Direction, rest)
        } else {
            return None;
        };

        let mut chars = rest.chars();
        let port = Port::from_letter(chars.next()?)?;
        if chars.next().is_some() {
            return None;
        }
        Some(Self { kind, port })
    }

}

impl fmt::Display for RegisterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            RegisterKind::Direction => write!(f, "DDR{}", self.port),
            RegisterKind::Output => write!(f, "PORT{}", self.port),
        }
    }
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        s.get(prefix.len()..)
    } else {
        None
    }
}

/// The pin an LED is wired to: one bit of one port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedWiring {
    port: Port,
    pin: u8,
}

impl LedWiring {
    /// Returns `None` unless `pin` is a bit of an 8-bit port
    pub const fn new(port: Port, pin: u8) -> Option<Self> {
        if pin < 8 {
            Some(Self { port, pin })
        } else {
            None
        }
    }

    pub const fn port(&self) -> Port {
        self.port
    }

    pub const fn pin(&self) -> u8 {
        self.pin
    }

    /// Single-bit mask selecting the pin within its port
    pub const fn mask(&self) -> u8 {
        1 << self.pin
    }

    pub const fn direction_address(&self) -> u16 {
        self.port.direction_address()
    }

    pub const fn output_address(&self) -> u16 {
        self.port.output_address()
    }
}

impl fmt::Display for LedWiring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PORT{}{}", self.port, self.pin)
    }
}

/// Chip families with a known on-board indicator LED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceFamily {
    Atmega328p,
    Atmega328,
    Atmega168,
    Atmega2560,
    Atmega1280,
    Atmega32u4,
    Atmega16u4,
}

const PORTS_X8: &[Port] = &[Port::B, Port::C, Port::D];
const PORTS_XX0: &[Port] = &[
    Port::A,
    Port::B,
    Port::C,
    Port::D,
    Port::E,
    Port::F,
    Port::G,
    Port::H,
    Port::J,
    Port::K,
    Port::L,
];
const PORTS_U4: &[Port] = &[Port::B, Port::C, Port::D, Port::E, Port::F];

impl DeviceFamily {
    pub const ALL: [DeviceFamily; 7] = [
        DeviceFamily::Atmega328p,
        DeviceFamily::Atmega328,
        DeviceFamily::Atmega168,
        DeviceFamily::Atmega2560,
        DeviceFamily::Atmega1280,
        DeviceFamily::Atmega32u4,
        DeviceFamily::Atmega16u4,
    ];

    /// MCU name as used by Cargo features and `-C target-cpu`
    pub const fn mcu(self) -> &'static str {
        match self {
            DeviceFamily::Atmega328p => "atmega328p",
            DeviceFamily::Atmega328 => "atmega328",
            DeviceFamily::Atmega168 => "atmega168",
            DeviceFamily::Atmega2560 => "atmega2560",
            DeviceFamily::Atmega1280 => "atmega1280",
            DeviceFamily::Atmega32u4 => "atmega32u4",
            DeviceFamily::Atmega16u4 => "atmega16u4",
        }
    }

    pub fn from_mcu(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|family| family.mcu().eq_ignore_ascii_case(name))
    }

    /// Where the board's indicator LED is wired
    pub const fn default_led(self) -> LedWiring {
        match self {
            // Arduino Uno, Arduino Nano
            DeviceFamily::Atmega328p | DeviceFamily::Atmega328 | DeviceFamily::Atmega168 => {
                LedWiring { port: Port::B, pin: 5 }
            }
            // Arduino Mega
            DeviceFamily::Atmega2560 | DeviceFamily::Atmega1280 => {
                LedWiring { port: Port::B, pin: 7 }
            }
            // Arduino Leonardo
            DeviceFamily::Atmega32u4 | DeviceFamily::Atmega16u4 => {
                LedWiring { port: Port::C, pin: 7 }
            }
        }
    }

    pub const fn ports(self) -> &'static [Port] {
        match self {
            DeviceFamily::Atmega328p | DeviceFamily::Atmega328 | DeviceFamily::Atmega168 => {
                PORTS_X8
            }
            DeviceFamily::Atmega2560 | DeviceFamily::Atmega1280 => PORTS_XX0,
            DeviceFamily::Atmega32u4 | DeviceFamily::Atmega16u4 => PORTS_U4,
        }
    }

    pub fn has_port(self, port: Port) -> bool {
        self.ports().contains(&port)
    }

    /// Same indicator LED and same ports, so one build fits both
    pub fn shares_wiring(self, other: DeviceFamily) -> bool {
        self.default_led() == other.default_led() && self.ports() == other.ports()
    }
}

impl fmt::Display for DeviceFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mcu())
    }
}

/// Raw wiring override values, as read from the build environment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WiringOverrides<'a> {
    pub port: Option<&'a str>,
    pub ddr: Option<&'a str>,
    pub pin: Option<&'a str>,
}

impl WiringOverrides<'_> {
    pub fn is_complete(&self) -> bool {
        self.port.is_some() && self.ddr.is_some() && self.pin.is_some()
    }

    /// Variables that were set, in `PORT`, `DDR`, `PIN` order
    pub fn set_vars(&self) -> impl Iterator<Item = &'static str> {
        [
            (ENV_LED_PORT, self.port.is_some()),
            (ENV_LED_DDR, self.ddr.is_some()),
            (ENV_LED_PIN, self.pin.is_some()),
        ]
        .into_iter()
        .filter_map(|(var, set)| set.then_some(var))
    }
}

/// Resolve the LED wiring
///
/// A complete set of overrides wins over the family table whatever the
/// family. An incomplete set is dropped as a whole and the family table is
/// used, and without a known family there is nothing safe to pick.
pub fn resolve(family: Option<DeviceFamily>, overrides: &WiringOverrides<'_>) -> Result<LedWiring> {
    let (Some(port), Some(ddr), Some(pin)) = (overrides.port, overrides.ddr, overrides.pin) else {
        return family
            .map(DeviceFamily::default_led)
            .ok_or(ConfigError::UnresolvedTarget);
    };

    let output = parse_register(port, ENV_LED_PORT, RegisterKind::Output)?;
    let direction = parse_register(ddr, ENV_LED_DDR, RegisterKind::Direction)?;
    if output.port != direction.port {
        return Err(ConfigError::PortMismatch {
            output: output.port,
            direction: direction.port,
        });
    }

    let pin: u8 = pin.trim().parse().map_err(|_| ConfigError::InvalidPin)?;
    let led = LedWiring::new(output.port, pin).ok_or(ConfigError::PinOutOfRange(pin))?;

    if let Some(family) = family {
        if !family.has_port(led.port) {
            return Err(ConfigError::PortNotOnDevice {
                port: led.port,
                family,
            });
        }
    }

    Ok(led)
}

fn parse_register(value: &str, var: &'static str, kind: RegisterKind) -> Result<RegisterName> {
    let name = RegisterName::parse(value).ok_or(ConfigError::InvalidRegister { var })?;
    if name.kind != kind {
        return Err(ConfigError::WrongRegisterKind { var });
    }
    Ok(name)
}
