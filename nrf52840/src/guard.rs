use defmt::{error, info};
use embassy_nrf::Peri;
use embassy_nrf::peripherals::NVMC;
use otaguard_common::config::GuardConfig;
use otaguard_common::guard::CrashGuard;
use otaguard_common::hook::CrashHook;

use crate::boot::EmbassyBootloader;
use crate::flash::{Flash, FlashPartition};
use crate::runtime::{FAULT_HANDLER, RtcClock};

pub type NrfCrashGuard = CrashGuard<FlashPartition, EmbassyBootloader, RtcClock>;

pub static CRASH_HOOK: CrashHook<FlashPartition, EmbassyBootloader, RtcClock> = CrashHook::new();

/// Arms the crash guard. Call it first thing after boot.
///
/// The running image is confirmed with the bootloader, from now on only the crash guard decides
/// about rolling back.
pub fn init(
    nvmc: Peri<'static, NVMC>,
    build_info: &'static str,
    max_crash_count: u8,
    crash_window_ms: u32,
) {
    info!("Build info: {}", build_info);
    let flash = Flash::new(nvmc);
    let mut bootloader = EmbassyBootloader::new(flash.bootloader_state());
    if let Err(err) = bootloader.confirm() {
        error!("Cannot confirm the running image: {}", err);
    }

    let config = GuardConfig {
        build_info,
        max_crashes: max_crash_count,
        crash_window_ms,
        region_base: 0,
    };
    let guard: NrfCrashGuard = CrashGuard::new(flash.crash_log(), bootloader, RtcClock, config);
    CRASH_HOOK.init(guard, &FAULT_HANDLER);
}
