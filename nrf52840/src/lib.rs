#![no_std]

pub mod boot;
pub mod flash;
pub mod guard;
pub mod runtime;

use defmt_rtt as _;
use panic_probe as _;

// Panics end up in HardFault, so they are handled by the crash guard as well
#[defmt::panic_handler]
fn panic() -> ! {
    cortex_m::asm::udf()
}

/// Hardfault handler.
///
/// Runs the registered crash handler, which may roll back to the previous image, then resets.
#[cortex_m_rt::exception]
unsafe fn HardFault(_frame: &cortex_m_rt::ExceptionFrame) -> ! {
    runtime::FAULT_HANDLER.invoke();
    cortex_m::peripheral::SCB::sys_reset()
}
