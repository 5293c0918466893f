use otaguard_common::config::GuardConfig;
use otaguard_common::fake::{FakeBootloader, FakeClock, FakeFlash, Restarted, catch_restart};
use otaguard_common::guard::CrashGuard;
use otaguard_common::hook::CrashHook;
use otaguard_common::record::BuildVersion;
use otaguard_common::runtime::{CrashHandler, HandlerSlot};

type Hook = CrashHook<FakeFlash, FakeBootloader, FakeClock>;
type Guard = CrashGuard<FakeFlash, FakeBootloader, FakeClock>;

fn guard(flash: &FakeFlash, boot: &FakeBootloader, build: &'static str, max_crashes: u8) -> Guard {
    let config = GuardConfig {
        build_info: build,
        max_crashes,
        region_base: 0,
        ..Default::default()
    };
    CrashGuard::new(flash.clone(), boot.clone(), FakeClock::default(), config)
}

fn tail_build(flash: &FakeFlash, boot: &FakeBootloader) -> Option<BuildVersion> {
    let mut guard = guard(flash, boot, "", 10);
    let tail = guard.crash_log().read_tail().unwrap();
    tail.map(|record| record.build_version)
}

#[test]
fn inert_until_initialized() {
    static HANDLER: HandlerSlot = HandlerSlot::new();
    static HOOK: Hook = CrashHook::new();

    assert!(!HANDLER.invoke());
    assert!(!HOOK.is_armed());
    HOOK.on_crash();

    let flash = FakeFlash::new(4096);
    let boot = FakeBootloader::new(0, 2);
    HOOK.init(guard(&flash, &boot, "v1", 10), &HANDLER);
    assert!(HANDLER.is_set());
    assert!(HOOK.is_armed());
    assert_eq!(flash.write_count(), 0);
}

#[test]
fn handles_one_crash_per_boot() {
    static HANDLER: HandlerSlot = HandlerSlot::new();
    static HOOK: Hook = CrashHook::new();

    let flash = FakeFlash::new(4096);
    let boot = FakeBootloader::new(0, 2);
    HOOK.init(guard(&flash, &boot, "v1", 10), &HANDLER);

    assert!(HANDLER.invoke());
    assert!(HANDLER.invoke());
    assert_eq!(flash.write_count(), 1);
    assert!(!HOOK.is_armed());
    assert_eq!(tail_build(&flash, &boot), Some(BuildVersion::new("v1")));
}

#[test]
fn second_init_replaces_the_guard() {
    static HANDLER: HandlerSlot = HandlerSlot::new();
    static HOOK: Hook = CrashHook::new();

    let flash = FakeFlash::new(4096);
    let boot = FakeBootloader::new(0, 2);
    HOOK.init(guard(&flash, &boot, "v1", 10), &HANDLER);
    HOOK.init(guard(&flash, &boot, "v2", 10), &HANDLER);

    assert!(HANDLER.invoke());
    assert_eq!(flash.write_count(), 1);
    assert_eq!(tail_build(&flash, &boot), Some(BuildVersion::new("v2")));
}

#[test]
fn init_rearms_after_handled_crash() {
    static HANDLER: HandlerSlot = HandlerSlot::new();
    static HOOK: Hook = CrashHook::new();

    let flash = FakeFlash::new(4096);
    let boot = FakeBootloader::new(0, 2);
    HOOK.init(guard(&flash, &boot, "v1", 10), &HANDLER);
    assert!(HANDLER.invoke());
    assert!(!HOOK.is_armed());

    HOOK.init(guard(&flash, &boot, "v2", 10), &HANDLER);
    assert!(HOOK.is_armed());
    assert!(HANDLER.invoke());
    assert_eq!(flash.write_count(), 2);
    assert_eq!(tail_build(&flash, &boot), Some(BuildVersion::new("v2")));
}

#[test]
fn last_registered_handler_wins() {
    static HANDLER: HandlerSlot = HandlerSlot::new();
    static FIRST: Hook = CrashHook::new();
    static SECOND: Hook = CrashHook::new();

    let flash = FakeFlash::new(4096);
    let boot = FakeBootloader::new(0, 2);
    FIRST.init(guard(&flash, &boot, "v1", 10), &HANDLER);
    SECOND.init(guard(&flash, &boot, "v2", 10), &HANDLER);

    assert!(HANDLER.invoke());
    assert!(FIRST.is_armed());
    assert!(!SECOND.is_armed());
    assert_eq!(tail_build(&flash, &boot), Some(BuildVersion::new("v2")));
}

#[test]
fn rollback_from_fault_path() {
    static HANDLER: HandlerSlot = HandlerSlot::new();
    static HOOK: Hook = CrashHook::new();

    let flash = FakeFlash::new(4096);
    let boot = FakeBootloader::new(0, 2);
    HOOK.init(guard(&flash, &boot, "v1", 1), &HANDLER);

    assert_eq!(catch_restart(|| HANDLER.invoke()), Err(Restarted));
    assert_eq!(boot.switches(), vec![1]);
    assert_eq!(boot.restarts(), 1);
    assert_eq!(flash.erase_count(), 1);
    assert!(!HOOK.is_armed());
}
