//! 8-bit register access

/// An 8-bit hardware register
///
/// `set_bits` and `clear_bits` are read-modify-write: bits outside the mask
/// keep their value.
pub trait Register {
    fn read(&self) -> u8;

    fn write(&mut self, value: u8);

    fn set_bits(&mut self, mask: u8) {
        let value = self.read();
        self.write(value | mask);
    }

    fn clear_bits(&mut self, mask: u8) {
        let value = self.read();
        self.write(value & !mask);
    }
}

/// A memory-mapped register at a fixed data-space address
#[derive(Debug)]
pub struct Mmio {
    ptr: *mut u8,
}

impl Mmio {
    /// # Safety
    ///
    /// `address` must be a readable and writable 8-bit register, and the
    /// returned handle must be its only owner for as long as it lives.
    pub const unsafe fn new(address: u16) -> Self {
        Self {
            ptr: address as usize as *mut u8,
        }
    }

    /// # Safety
    ///
    /// Same contract as [`Mmio::new`], for an arbitrary pointer.
    pub const unsafe fn from_ptr(ptr: *mut u8) -> Self {
        Self { ptr }
    }
}

impl Register for Mmio {
    fn read(&self) -> u8 {
        // SAFETY: valid, exclusively owned register per the constructor contract
        unsafe { core::ptr::read_volatile(self.ptr) }
    }

    fn write(&mut self, value: u8) {
        // SAFETY: valid, exclusively owned register per the constructor contract
        unsafe { core::ptr::write_volatile(self.ptr, value) }
    }
}
