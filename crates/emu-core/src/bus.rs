//! Memory and I/O bus interface.

use thiserror::Error;

/// Memory and I/O bus interface.
///
/// Components access memory and peripherals through this trait. The bus
/// handles address decoding and routing to the appropriate device. Every
/// address in `$0000-$FFFF` must read as some defined byte, and every write
/// must be accepted (writes to ROM may simply be dropped).
pub trait Bus {
    /// Read a byte from the given address.
    ///
    /// Takes `&mut self` because some devices have read side effects
    /// (e.g. clearing a status latch).
    fn read(&mut self, address: u16) -> u8;

    /// Write a byte to the given address.
    fn write(&mut self, address: u16, value: u8);
}

/// Errors raised while preparing bus contents on the host side.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    /// The image does not fit between its load address and `$FFFF`.
    #[error("image of {len} bytes at ${address:04X} runs past the end of the address space")]
    ImageTooLarge { address: u16, len: usize },
}

/// Flat 64K RAM bus with no devices.
///
/// Useful for tests and for hosts that only need plain memory.
#[derive(Clone)]
pub struct SimpleBus {
    ram: Box<[u8; 0x10000]>,
}

impl Default for SimpleBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SimpleBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimpleBus").finish_non_exhaustive()
    }
}

impl SimpleBus {
    /// Create a bus with all 64K zeroed.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ram: Box::new([0; 0x10000]),
        }
    }

    /// Copy `data` into memory starting at `address`.
    pub fn load(&mut self, address: u16, data: &[u8]) -> Result<(), BusError> {
        let start = usize::from(address);
        let end = start + data.len();
        if end > self.ram.len() {
            return Err(BusError::ImageTooLarge {
                address,
                len: data.len(),
            });
        }
        self.ram[start..end].copy_from_slice(data);
        Ok(())
    }

    /// Store a little-endian 16-bit vector at `address` (e.g. `$FFFC`).
    pub fn set_vector(&mut self, address: u16, target: u16) {
        let [lo, hi] = target.to_le_bytes();
        self.ram[usize::from(address)] = lo;
        self.ram[usize::from(address.wrapping_add(1))] = hi;
    }

    /// Read memory without going through the bus interface.
    #[must_use]
    pub fn peek(&self, address: u16) -> u8 {
        self.ram[usize::from(address)]
    }

    /// Write memory without going through the bus interface.
    pub fn poke(&mut self, address: u16, value: u8) {
        self.ram[usize::from(address)] = value;
    }
}

impl Bus for SimpleBus {
    fn read(&mut self, address: u16) -> u8 {
        self.ram[usize::from(address)]
    }

    fn write(&mut self, address: u16, value: u8) {
        self.ram[usize::from(address)] = value;
    }
}
