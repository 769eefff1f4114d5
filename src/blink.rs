//! The LED blink loop

use embedded_hal::delay::DelayNs;
use log::{info, trace};

use crate::config::BlinkTiming;
use crate::register::Register;
use crate::wiring::LedWiring;

/// Drives one LED pin through its port's `DDRx` and `PORTx` registers
///
/// The blinker owns both registers for its whole life. Only the LED's bit is
/// ever changed; the other pins of the port keep whatever state they had.
pub struct Blinker<R, D> {
    led: LedWiring,
    direction: R,
    output: R,
    timing: BlinkTiming,
    delay: D,
}

impl<R, D> Blinker<R, D>
where
    R: Register,
    D: DelayNs,
{
    pub fn new(led: LedWiring, direction: R, output: R, timing: BlinkTiming, delay: D) -> Self {
        Self {
            led,
            direction,
            output,
            timing,
            delay,
        }
    }

    /// Make the LED pin an output (`DDRx |= mask`)
    pub fn configure_output(&mut self) {
        self.direction.set_bits(self.led.mask());
        info!(
            "LED on {}: {} ms on, {} ms off",
            self.led, self.timing.on_ms, self.timing.off_ms
        );
    }

    /// `PORTx |= mask`
    pub fn led_on(&mut self) {
        self.output.set_bits(self.led.mask());
        trace!("LED high");
    }

    /// `PORTx &= !mask`
    pub fn led_off(&mut self) {
        self.output.clear_bits(self.led.mask());
        trace!("LED low");
    }

    /// One full period: on, hold, off, hold
    pub fn cycle(&mut self) {
        self.led_on();
        self.delay.delay_ms(self.timing.on_ms);
        self.led_off();
        self.delay.delay_ms(self.timing.off_ms);
    }

    /// Configure the pin and blink until reset
    pub fn run(mut self) -> ! {
        self.configure_output();
        loop {
            self.cycle();
        }
    }

    /// Give back the registers and the delay
    pub fn release(self) -> (R, R, D) {
        (self.direction, self.output, self.delay)
    }
}
