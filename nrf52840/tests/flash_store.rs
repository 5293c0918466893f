// Note: if the test is successful it ends with: "Error: CPU halted unexpectedly."
// This is caused by the final call to `asm::bkpt()`.
#![no_std]
#![no_main]

use otaguard_common::crash_log::CrashLog;
use otaguard_common::record::{BuildVersion, CrashRecord};
use otaguard_common::store::FlashRecordStore;
use otaguard_nrf52840 as _;
use otaguard_nrf52840::flash::Flash;

use embassy_executor::Spawner;

#[embassy_executor::main]
async fn crash_log_on_flash(_spawner: Spawner) {
    let p = embassy_nrf::init(Default::default());
    let flash = Flash::new(p.NVMC);
    let store = FlashRecordStore::new(flash.crash_log(), 0, 3);
    let mut log = CrashLog::new(store);

    log.reset().unwrap();
    assert!(log.is_empty().unwrap());

    let build = BuildVersion::new("2025-01-02 03:04:05");
    assert_eq!(log.append(&CrashRecord::new(build, 100)).unwrap(), 0);
    assert_eq!(log.append(&CrashRecord::new(build, 250)).unwrap(), 1);
    assert_eq!(log.len().unwrap(), 2);

    let tail = log.read_tail().unwrap().unwrap();
    assert!(tail.matches_build(&build));
    assert_eq!(tail.crash_tick, 250);

    log.reset().unwrap();
    assert_eq!(log.find_next_empty_slot().unwrap(), Some(0));

    defmt::info!("Test OK");
    cortex_m::asm::bkpt();
}
