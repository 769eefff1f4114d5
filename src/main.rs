#![no_std]
#![no_main]

#[cfg(not(target_arch = "avr"))]
compile_error!("avr-blink only supports AVR targets");

use avr_blink::{Blinker, CycleDelay, Mmio};
use panic_halt as _;

/// Constants resolved by `build.rs`: `LED`, `TIMING`, `CPU_FREQUENCY_HZ`
mod led_config {
    include!(concat!(env!("OUT_DIR"), "/led_config.rs"));
}

use led_config::{CPU_FREQUENCY_HZ, LED, TIMING};

#[avr_device::entry]
fn main() -> ! {
    // SAFETY: the addresses come from the wiring table of the chip we are
    // built for, and the blinker is the only code touching these registers.
    let (direction, output) = unsafe {
        (
            Mmio::new(LED.direction_address()),
            Mmio::new(LED.output_address()),
        )
    };

    let delay = CycleDelay::new(CPU_FREQUENCY_HZ);
    Blinker::new(LED, direction, output, TIMING, delay).run()
}
