use embassy_time::Instant;
use otaguard_common::runtime::{HandlerSlot, TickSource};

/// Handler run by the HardFault exception.
pub static FAULT_HANDLER: HandlerSlot = HandlerSlot::new();

/// Milliseconds since boot from the embassy time driver (RTC1).
pub struct RtcClock;

impl TickSource for RtcClock {
    const TICK_MS: u32 = 1;

    fn ticks(&self) -> u32 {
        Instant::now().as_millis() as u32
    }
}
