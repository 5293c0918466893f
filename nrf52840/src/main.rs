#![no_std]
#![no_main]

use defmt::info;
use embassy_executor::Spawner;
use embassy_time::Timer;
use otaguard_common::config::{DEFAULT_CRASH_WINDOW_MS, DEFAULT_MAX_CRASHES};
use otaguard_nrf52840::{self as _, guard};

const BUILD_INFO: &str = env!("OTAGUARD_BUILD_INFO");

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    let p = embassy_nrf::init(Default::default());
    guard::init(p.NVMC, BUILD_INFO, DEFAULT_MAX_CRASHES, DEFAULT_CRASH_WINDOW_MS);

    #[cfg(feature = "crash-loop-demo")]
    {
        Timer::after_millis(100).await;
        panic!("Crash loop demo");
    }

    #[allow(unreachable_code)]
    loop {
        Timer::after_secs(60).await;
        info!("Build {} still running", BUILD_INFO);
    }
}
