#[cfg(feature = "defmt")]
use defmt::info;
use heapless::Vec;
#[cfg(not(feature = "defmt"))]
use log::info;

/// Maximum number of ROM slots we keep track of.
pub const MAX_BOOT_SLOTS: usize = 4;

/// Boot configuration as reported by the bootloader.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BootSlots {
    /// Index of the slot we are running from.
    pub current: u8,
    /// Number of bootable slots.
    pub count: u8,
    /// Flash offset of each slot, may be empty if the bootloader doesn't expose it.
    pub offsets: Vec<u32, MAX_BOOT_SLOTS>,
}

impl BootSlots {
    pub fn new(current: u8, count: u8) -> Self {
        Self {
            current,
            count,
            offsets: Vec::new(),
        }
    }

    /// The slot to fall back to, wraps around. A device without slots counts as a single slot.
    pub fn next_slot(&self) -> u8 {
        let count = u16::from(self.count.max(1));
        ((u16::from(self.current) + 1) % count) as u8
    }

    pub fn has_alternate(&self) -> bool {
        self.count > 1
    }

    pub fn log(&self) {
        info!("Running on boot slot {} / {}", self.current, self.count);
        for (idx, offset) in self.offsets.iter().enumerate() {
            let marker = if idx == usize::from(self.current) { '*' } else { ' ' };
            info!("{}{}: offset {:#x}", marker, idx, offset);
        }
    }
}

/// The primitives the bootloader exposes to the application.
pub trait Bootloader {
    /// Returns the active slot and the slot table.
    fn boot_slots(&mut self) -> crate::Result<BootSlots>;

    /// Makes `slot` the one booted after the next restart.
    fn set_active_slot(&mut self, slot: u8) -> crate::Result<()>;

    /// Restarts the device, never returns.
    fn restart(&mut self) -> !;
}
