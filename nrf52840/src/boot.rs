use embassy_boot_nrf::{AlignedBuffer, BlockingFirmwareState};
use otaguard_common::boot::{BootSlots, Bootloader};
use otaguard_common::error::Error;
use static_cell::StaticCell;

use crate::flash::FlashPartition;

unsafe extern "C" {
    // These symbols are provided by the linker script (memory.x)
    unsafe static __bootloader_active_start: u32;
    unsafe static __bootloader_dfu_start: u32;
}

/// The image we are running from.
pub const ACTIVE_SLOT: u8 = 0;
/// After an update the DFU partition holds the previous image.
pub const DFU_SLOT: u8 = 1;

// NVMC writes words
static MAGIC: StaticCell<AlignedBuffer<4>> = StaticCell::new();

/// embassy-boot seen as a two-slot bootloader.
///
/// embassy-boot always runs the ACTIVE partition, so the current slot is always [`ACTIVE_SLOT`].
/// Selecting [`DFU_SLOT`] asks the bootloader to swap the partitions on the next reset.
pub struct EmbassyBootloader {
    state: BlockingFirmwareState<'static, FlashPartition>,
}

impl EmbassyBootloader {
    pub fn new(state_partition: FlashPartition) -> Self {
        let magic = MAGIC.init(AlignedBuffer([0; 4]));
        Self {
            state: BlockingFirmwareState::new(state_partition, &mut magic.0),
        }
    }

    /// Marks the running image as good, otherwise the bootloader reverts it on the next reset.
    pub fn confirm(&mut self) -> otaguard_common::Result<()> {
        self.state.mark_booted().map_err(|_| Error::BootloaderError)
    }
}

impl Bootloader for EmbassyBootloader {
    fn boot_slots(&mut self) -> otaguard_common::Result<BootSlots> {
        let mut slots = BootSlots::new(ACTIVE_SLOT, 2);
        let offsets = unsafe {
            [
                &__bootloader_active_start as *const u32 as u32,
                &__bootloader_dfu_start as *const u32 as u32,
            ]
        };
        for offset in offsets {
            slots.offsets.push(offset).map_err(|_| Error::BufferTooSmallError)?;
        }
        Ok(slots)
    }

    fn set_active_slot(&mut self, slot: u8) -> otaguard_common::Result<()> {
        match slot {
            ACTIVE_SLOT => self.state.mark_booted(),
            DFU_SLOT => self.state.mark_updated(),
            _ => return Err(Error::BootloaderError),
        }
        .map_err(|_| Error::BootloaderError)
    }

    fn restart(&mut self) -> ! {
        cortex_m::peripheral::SCB::sys_reset()
    }
}
