use std::env;
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;
use std::process;

// The resolution logic is shared with the library so it is unit tested there.
#[allow(dead_code)]
#[path = "src/error.rs"]
mod error;
#[allow(dead_code)]
#[path = "src/wiring.rs"]
mod wiring;
#[allow(dead_code)]
#[path = "src/config.rs"]
mod config;

use config::BuildConfig;
use error::ConfigError;
use wiring::DeviceFamily;

fn main() {
    for var in config::ENV_VARS {
        println!("cargo:rerun-if-env-changed={var}");
    }
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=src/error.rs");
    println!("cargo:rerun-if-changed=src/wiring.rs");
    println!("cargo:rerun-if-changed=src/config.rs");

    // Host builds of the library (tests, docs) have no LED to resolve.
    let avr = env::var("CARGO_CFG_TARGET_ARCH").is_ok_and(|arch| arch == "avr");
    let firmware = env::var_os("CARGO_FEATURE_RT").is_some();
    if !avr && !firmware {
        return;
    }

    let rustflags = env::var("CARGO_ENCODED_RUSTFLAGS").unwrap_or_default();
    let target_cpu = config::target_cpu_from_rustflags(&rustflags);

    let config = match resolve(target_cpu) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            if let Some(cpu) = target_cpu {
                eprintln!("note: building for target-cpu {cpu}");
            }
            if let Some(help) = err.help() {
                eprintln!("help: {help}");
                eprintln!("help: device family features: {}", family_list());
            }
            process::exit(1);
        }
    };

    let ignored: Vec<&str> = config.ignored_overrides.iter().flatten().copied().collect();
    if !ignored.is_empty() {
        println!(
            "cargo:warning=Ignoring incomplete LED wiring overrides ({}); using {} from the device family",
            ignored.join(", "),
            config.led
        );
    }

    if config.overridden {
        println!(
            "cargo:warning=Using LED wiring from environment: {} (DDR{})",
            config.led,
            config.led.port()
        );
    }

    let out = PathBuf::from(env::var_os("OUT_DIR").expect("cargo sets OUT_DIR"));
    fs::write(out.join("led_config.rs"), render(&config)).expect("failed to write led_config.rs");
}

fn resolve(target_cpu: Option<&str>) -> Result<BuildConfig, ConfigError> {
    let features = DeviceFamily::ALL.into_iter().filter(|family| {
        let var = format!("CARGO_FEATURE_{}", family.mcu().to_ascii_uppercase());
        env::var_os(var).is_some()
    });
    let family = config::detect_family(features, target_cpu)?;
    BuildConfig::from_lookup(family, |name| env::var(name).ok())
}

fn family_list() -> String {
    DeviceFamily::ALL
        .iter()
        .map(|family| family.mcu())
        .collect::<Vec<_>>()
        .join(", ")
}

fn render(config: &BuildConfig) -> String {
    let mut src = String::new();
    let target = config.family.map_or("an overridden target", DeviceFamily::mcu);
    let _ = writeln!(src, "// Generated by build.rs for {target}.");
    let _ = writeln!(src, "use avr_blink::{{BlinkTiming, LedWiring, Port}};");
    let _ = writeln!(src);
    let _ = writeln!(
        src,
        "pub const LED: LedWiring = match LedWiring::new(Port::{:?}, {}) {{\n    \
         Some(led) => led,\n    \
         None => panic!(\"LED bit position out of range\"),\n\
         }};",
        config.led.port(),
        config.led.pin()
    );
    let _ = writeln!(
        src,
        "pub const TIMING: BlinkTiming = BlinkTiming {{ on_ms: {}, off_ms: {} }};",
        config.timing.on_ms, config.timing.off_ms
    );
    let _ = writeln!(
        src,
        "pub const CPU_FREQUENCY_HZ: u32 = {};",
        config.cpu_frequency_hz
    );
    src
}
