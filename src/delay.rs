//! Busy-wait delay calibrated to the CPU clock
//!
//! Nothing yields here: the core spins for the requested number of cycles.
//! Interrupts are never enabled by this firmware, so the spin is not
//! stretched.

/// Blocking delay that counts CPU cycles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleDelay {
    cpu_frequency_hz: u32,
    cycles_per_us: u32,
    cycles_per_ms: u32,
}

impl CycleDelay {
    pub const fn new(cpu_frequency_hz: u32) -> Self {
        Self {
            cpu_frequency_hz,
            cycles_per_us: cycles_for_ns(cpu_frequency_hz, 1_000),
            cycles_per_ms: cycles_for_ns(cpu_frequency_hz, 1_000_000),
        }
    }

    pub const fn cpu_frequency_hz(&self) -> u32 {
        self.cpu_frequency_hz
    }

    pub const fn cycles_per_us(&self) -> u32 {
        self.cycles_per_us
    }

    pub const fn cycles_per_ms(&self) -> u32 {
        self.cycles_per_ms
    }
}

/// Cycles needed to cover `ns` nanoseconds, rounded up
pub const fn cycles_for_ns(cpu_frequency_hz: u32, ns: u32) -> u32 {
    let cycles = (ns as u64 * cpu_frequency_hz as u64).div_ceil(1_000_000_000);
    if cycles > u32::MAX as u64 {
        u32::MAX
    } else {
        cycles as u32
    }
}

/// Largest microsecond span whose nanoseconds still fit a `u32`
#[cfg_attr(not(target_arch = "avr"), allow(dead_code))]
const MAX_US_PER_SPIN: u32 = u32::MAX / 1_000;

/// Split a microsecond delay into as few cycle spins as possible
///
/// Each chunk is converted to cycles on its own so `us * 1000` never
/// overflows.
#[cfg_attr(not(target_arch = "avr"), allow(dead_code))]
fn spin_us(cpu_frequency_hz: u32, mut us: u32, mut spin: impl FnMut(u32)) {
    while us > 0 {
        let chunk = us.min(MAX_US_PER_SPIN);
        spin(cycles_for_ns(cpu_frequency_hz, chunk * 1_000));
        us -= chunk;
    }
}

#[cfg(target_arch = "avr")]
impl embedded_hal::delay::DelayNs for CycleDelay {
    fn delay_ns(&mut self, ns: u32) {
        avr_device::asm::delay_cycles(cycles_for_ns(self.cpu_frequency_hz, ns));
    }

    fn delay_us(&mut self, us: u32) {
        spin_us(self.cpu_frequency_hz, us, avr_device::asm::delay_cycles);
    }

    fn delay_ms(&mut self, ms: u32) {
        for _ in 0..ms {
            avr_device::asm::delay_cycles(self.cycles_per_ms);
        }
    }
}
