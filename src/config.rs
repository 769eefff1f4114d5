//! Build-time configuration
//!
//! `build.rs` feeds the build environment through [`BuildConfig::from_lookup`]
//! and bakes the result into the firmware as constants.

use crate::error::{ConfigError, Result};
use crate::wiring::{self, DeviceFamily, LedWiring, WiringOverrides};

/// On-duration in milliseconds
pub const ENV_LED_TIME: &str = "BLINK_LED_TIME";
/// Off-duration in milliseconds
pub const ENV_LED_DELAY: &str = "BLINK_LED_DELAY";
/// CPU clock used to calibrate the busy-wait
pub const ENV_CPU_FREQUENCY: &str = "AVR_CPU_FREQUENCY_HZ";

/// Every variable the build reads
pub const ENV_VARS: [&str; 6] = [
    wiring::ENV_LED_PORT,
    wiring::ENV_LED_DDR,
    wiring::ENV_LED_PIN,
    ENV_LED_TIME,
    ENV_LED_DELAY,
    ENV_CPU_FREQUENCY,
];

pub const DEFAULT_ON_MS: u32 = 1000;
pub const DEFAULT_OFF_MS: u32 = 3000;
/// Every supported Arduino board runs at 16 MHz
pub const DEFAULT_CPU_FREQUENCY_HZ: u32 = 16_000_000;

/// How long the LED stays on and off
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlinkTiming {
    pub on_ms: u32,
    pub off_ms: u32,
}

impl Default for BlinkTiming {
    fn default() -> Self {
        Self {
            on_ms: DEFAULT_ON_MS,
            off_ms: DEFAULT_OFF_MS,
        }
    }
}

/// Everything the firmware needs, resolved before it is compiled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildConfig {
    pub family: Option<DeviceFamily>,
    pub led: LedWiring,
    pub timing: BlinkTiming,
    pub cpu_frequency_hz: u32,
    /// The wiring came from overrides rather than the family table
    pub overridden: bool,
    /// Variables of an incomplete override set, dropped in favour of the
    /// family table
    pub ignored_overrides: [Option<&'static str>; 3],
}

impl BuildConfig {
    /// Resolve the configuration, reading variables through `lookup`
    ///
    /// Variables that are unset or blank count as absent.
    pub fn from_lookup<F, S>(family: Option<DeviceFamily>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<S>,
        S: AsRef<str>,
    {
        let port = lookup(wiring::ENV_LED_PORT);
        let ddr = lookup(wiring::ENV_LED_DDR);
        let pin = lookup(wiring::ENV_LED_PIN);
        let overrides = WiringOverrides {
            port: non_blank(&port),
            ddr: non_blank(&ddr),
            pin: non_blank(&pin),
        };
        let led = wiring::resolve(family, &overrides)?;

        let mut ignored_overrides = [None; 3];
        if !overrides.is_complete() {
            for (slot, var) in ignored_overrides.iter_mut().zip(overrides.set_vars()) {
                *slot = Some(var);
            }
        }

        let on = lookup(ENV_LED_TIME);
        let off = lookup(ENV_LED_DELAY);
        let timing = BlinkTiming {
            on_ms: parse_duration(non_blank(&on), ENV_LED_TIME, DEFAULT_ON_MS)?,
            off_ms: parse_duration(non_blank(&off), ENV_LED_DELAY, DEFAULT_OFF_MS)?,
        };

        let frequency = lookup(ENV_CPU_FREQUENCY);
        let cpu_frequency_hz = match non_blank(&frequency) {
            None => DEFAULT_CPU_FREQUENCY_HZ,
            Some(value) => parse_positive(value).ok_or(ConfigError::InvalidFrequency)?,
        };

        Ok(Self {
            family,
            led,
            timing,
            cpu_frequency_hz,
            overridden: overrides.is_complete(),
            ignored_overrides,
        })
    }
}

/// Work out the device family from the enabled family features and the
/// `-C target-cpu` flag
///
/// A target-cpu outside the family table is not an error: the chip may
/// still be driven through overrides. Feature and target-cpu may name
/// different chips as long as they share the LED wiring and ports, e.g.
/// `atmega328` with `atmega328p`; the feature's family is used.
pub fn detect_family<I>(features: I, target_cpu: Option<&str>) -> Result<Option<DeviceFamily>>
where
    I: IntoIterator<Item = DeviceFamily>,
{
    let mut enabled = features.into_iter();
    let feature = enabled.next();
    if let (Some(first), Some(second)) = (feature, enabled.next()) {
        return Err(ConfigError::MultipleFamilies { first, second });
    }

    let cpu = target_cpu.and_then(DeviceFamily::from_mcu);
    match (feature, cpu) {
        (Some(feature), Some(target_cpu)) if !feature.shares_wiring(target_cpu) => {
            Err(ConfigError::FamilyMismatch {
                feature,
                target_cpu,
            })
        }
        (Some(family), _) | (None, Some(family)) => Ok(Some(family)),
        (None, None) => Ok(None),
    }
}

/// Pull the `target-cpu` out of `CARGO_ENCODED_RUSTFLAGS`
///
/// Flags are separated by `0x1f`; both `-Ctarget-cpu=x` and
/// `-C target-cpu=x` spellings are accepted.
pub fn target_cpu_from_rustflags(encoded: &str) -> Option<&str> {
    let mut flags = encoded.split('\x1f');
    let mut found = None;
    while let Some(flag) = flags.next() {
        let codegen = match flag.strip_prefix("-C") {
            Some("") => flags.next().unwrap_or(""),
            Some(rest) => rest,
            None => continue,
        };
        if let Some(cpu) = codegen.strip_prefix("target-cpu=") {
            // Later flags override earlier ones, as in rustc.
            found = Some(cpu);
        }
    }
    found
}

fn non_blank<S: AsRef<str>>(value: &Option<S>) -> Option<&str> {
    value
        .as_ref()
        .map(|v| v.as_ref().trim())
        .filter(|v| !v.is_empty())
}

fn parse_duration(value: Option<&str>, var: &'static str, default: u32) -> Result<u32> {
    match value {
        None => Ok(default),
        Some(value) => parse_positive(value).ok_or(ConfigError::InvalidDuration { var }),
    }
}

fn parse_positive(value: &str) -> Option<u32> {
    value.parse::<u32>().ok().filter(|v| *v > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wiring::Port;
    use std::collections::HashMap;

    fn lookup_in(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = BuildConfig::from_lookup(Some(DeviceFamily::Atmega328p), lookup_in(&[])).unwrap();
        assert_eq!(config.timing.on_ms, 1000);
        assert_eq!(config.timing.off_ms, 3000);
        assert_eq!(config.timing, BlinkTiming::default());
        assert_eq!(config.cpu_frequency_hz, 16_000_000);
        assert_eq!(config.led.to_string(), "PORTB5");
        assert!(!config.overridden);
        assert_eq!(config.ignored_overrides, [None; 3]);
    }

    #[test]
    fn test_partial_overrides_ignored() {
        let lookup = lookup_in(&[(wiring::ENV_LED_PIN, "3")]);
        let config = BuildConfig::from_lookup(Some(DeviceFamily::Atmega328p), lookup).unwrap();
        assert_eq!(config.led.to_string(), "PORTB5");
        assert!(!config.overridden);
        assert_eq!(
            config.ignored_overrides,
            [Some(wiring::ENV_LED_PIN), None, None]
        );

        let lookup = lookup_in(&[(wiring::ENV_LED_PIN, "3")]);
        assert_eq!(
            BuildConfig::from_lookup(None, lookup),
            Err(ConfigError::UnresolvedTarget)
        );
    }

    #[test]
    fn test_duration_overrides() {
        let lookup = lookup_in(&[(ENV_LED_TIME, "250"), (ENV_LED_DELAY, " 750 ")]);
        let config = BuildConfig::from_lookup(Some(DeviceFamily::Atmega2560), lookup).unwrap();
        assert_eq!(config.timing, BlinkTiming { on_ms: 250, off_ms: 750 });
    }

    #[test]
    fn test_zero_duration_rejected() {
        let lookup = lookup_in(&[(ENV_LED_TIME, "0")]);
        assert_eq!(
            BuildConfig::from_lookup(Some(DeviceFamily::Atmega328p), lookup),
            Err(ConfigError::InvalidDuration { var: ENV_LED_TIME })
        );

        let lookup = lookup_in(&[(ENV_LED_DELAY, "-5")]);
        assert_eq!(
            BuildConfig::from_lookup(Some(DeviceFamily::Atmega328p), lookup),
            Err(ConfigError::InvalidDuration { var: ENV_LED_DELAY })
        );
    }

    #[test]
    fn test_frequency() {
        let lookup = lookup_in(&[(ENV_CPU_FREQUENCY, "8000000")]);
        let config = BuildConfig::from_lookup(Some(DeviceFamily::Atmega328p), lookup).unwrap();
        assert_eq!(config.cpu_frequency_hz, 8_000_000);

        let lookup = lookup_in(&[(ENV_CPU_FREQUENCY, "16MHz")]);
        assert_eq!(
            BuildConfig::from_lookup(Some(DeviceFamily::Atmega328p), lookup),
            Err(ConfigError::InvalidFrequency)
        );
    }

    #[test]
    fn test_wiring_overrides() {
        let lookup = lookup_in(&[
            (wiring::ENV_LED_PORT, "PORTD"),
            (wiring::ENV_LED_DDR, "DDRD"),
            (wiring::ENV_LED_PIN, "2"),
        ]);
        let config = BuildConfig::from_lookup(Some(DeviceFamily::Atmega32u4), lookup).unwrap();
        assert_eq!(config.led.port(), Port::D);
        assert_eq!(config.led.pin(), 2);
        assert!(config.overridden);
        assert_eq!(config.ignored_overrides, [None; 3]);
    }

    #[test]
    fn test_blank_values_are_absent() {
        let lookup = lookup_in(&[
            (wiring::ENV_LED_PORT, ""),
            (wiring::ENV_LED_DDR, "  "),
            (ENV_LED_TIME, ""),
        ]);
        let config = BuildConfig::from_lookup(Some(DeviceFamily::Atmega168), lookup).unwrap();
        assert_eq!(config.led.to_string(), "PORTB5");
        assert_eq!(config.timing.on_ms, DEFAULT_ON_MS);
    }

    #[test]
    fn test_unresolved_target() {
        assert_eq!(
            BuildConfig::from_lookup(None, lookup_in(&[])),
            Err(ConfigError::UnresolvedTarget)
        );
    }

    const NO_FEATURES: [DeviceFamily; 0] = [];

    #[test]
    fn test_detect_family() {
        assert_eq!(detect_family(NO_FEATURES, None), Ok(None));
        assert_eq!(
            detect_family([DeviceFamily::Atmega2560], None),
            Ok(Some(DeviceFamily::Atmega2560))
        );
        assert_eq!(
            detect_family(NO_FEATURES, Some("atmega32u4")),
            Ok(Some(DeviceFamily::Atmega32u4))
        );
        assert_eq!(
            detect_family([DeviceFamily::Atmega328p], Some("atmega328p")),
            Ok(Some(DeviceFamily::Atmega328p))
        );
        assert_eq!(detect_family(NO_FEATURES, Some("attiny85")), Ok(None));
    }

    #[test]
    fn test_detect_family_register_compatible_cpu() {
        assert_eq!(
            detect_family([DeviceFamily::Atmega328], Some("atmega328p")),
            Ok(Some(DeviceFamily::Atmega328))
        );
        assert_eq!(
            detect_family([DeviceFamily::Atmega16u4], Some("atmega32u4")),
            Ok(Some(DeviceFamily::Atmega16u4))
        );
        assert_eq!(
            detect_family([DeviceFamily::Atmega1280], Some("atmega2560")),
            Ok(Some(DeviceFamily::Atmega1280))
        );
    }

    #[test]
    fn test_detect_family_conflicts() {
        assert_eq!(
            detect_family([DeviceFamily::Atmega328p, DeviceFamily::Atmega168], None),
            Err(ConfigError::MultipleFamilies {
                first: DeviceFamily::Atmega328p,
                second: DeviceFamily::Atmega168
            })
        );
        assert_eq!(
            detect_family([DeviceFamily::Atmega32u4], Some("atmega328p")),
            Err(ConfigError::FamilyMismatch {
                feature: DeviceFamily::Atmega32u4,
                target_cpu: DeviceFamily::Atmega328p
            })
        );
        assert_eq!(
            detect_family([DeviceFamily::Atmega328p], Some("atmega2560")),
            Err(ConfigError::FamilyMismatch {
                feature: DeviceFamily::Atmega328p,
                target_cpu: DeviceFamily::Atmega2560
            })
        );
    }

    #[test]
    fn test_target_cpu_from_rustflags() {
        assert_eq!(target_cpu_from_rustflags(""), None);
        assert_eq!(
            target_cpu_from_rustflags("-Ctarget-cpu=atmega328p"),
            Some("atmega328p")
        );
        assert_eq!(
            target_cpu_from_rustflags("-C\x1ftarget-cpu=atmega2560\x1f-Copt-level=s"),
            Some("atmega2560")
        );
        assert_eq!(
            target_cpu_from_rustflags("-Ctarget-cpu=atmega168\x1f-Ctarget-cpu=atmega32u4"),
            Some("atmega32u4")
        );
        assert_eq!(target_cpu_from_rustflags("-Clink-arg=-Wl,--gc-sections"), None);
    }
}
