use core::cell::RefCell;

use embassy_embedded_hal::flash::partition::BlockingPartition;
use embassy_nrf::Peri;
use embassy_nrf::nvmc::Nvmc;
use embassy_nrf::peripherals::NVMC;
use embassy_sync::blocking_mutex::{Mutex, raw::CriticalSectionRawMutex};
use static_cell::StaticCell;

unsafe extern "C" {
    // These symbols are provided by the linker script (memory.x)
    unsafe static _crash_log_start: u32;
    unsafe static _crash_log_end: u32;
    unsafe static __bootloader_state_start: u32;
    unsafe static __bootloader_state_end: u32;
}

/// NVMC shared by the crash log and the bootloader state. The lock has to work from the
/// HardFault handler, hence the critical section.
pub type SharedNvmc = Mutex<CriticalSectionRawMutex, RefCell<Nvmc<'static>>>;
pub type FlashPartition = BlockingPartition<'static, CriticalSectionRawMutex, Nvmc<'static>>;

static NVMC: StaticCell<SharedNvmc> = StaticCell::new();

/// A wrapper around the NVMC handing out the flash partitions we write to.
pub struct Flash {
    nvmc: &'static SharedNvmc,
}

impl Flash {
    pub fn new(nvmc: Peri<'static, NVMC>) -> Self {
        let nvmc = NVMC.init(Mutex::new(RefCell::new(Nvmc::new(nvmc))));
        Self { nvmc }
    }

    /// Partition holding the crash records, starts at offset 0.
    pub fn crash_log(&self) -> FlashPartition {
        let (start, end) = unsafe {
            (
                &_crash_log_start as *const u32 as u32,
                &_crash_log_end as *const u32 as u32,
            )
        };
        BlockingPartition::new(self.nvmc, start, end - start)
    }

    /// Partition with the embassy-boot state.
    pub fn bootloader_state(&self) -> FlashPartition {
        let (start, end) = unsafe {
            (
                &__bootloader_state_start as *const u32 as u32,
                &__bootloader_state_end as *const u32 as u32,
            )
        };
        BlockingPartition::new(self.nvmc, start, end - start)
    }
}
