//! Replays a schedule of crashes against the crash guard running on fake hardware.
//!
//! cargo run -p otaguard-common --example crash_loop --features std -- \
//!     --crash v1@0 --crash v1@10 --crash v1@20 --max-crashes 3
use clap::Parser;
use log::{error, info};
use otaguard_common::config::GuardConfig;
use otaguard_common::fake::{FakeBootloader, FakeClock, FakeFlash, catch_restart};
use otaguard_common::guard::CrashGuard;

#[derive(Parser, Debug)]
struct Args {
    /// Crash of a build at a tick count (10 ms per tick), formatted as `build@tick`
    #[arg(short, long, value_parser = parse_crash)]
    crash: Vec<(String, u32)>,
    #[arg(short, long, default_value_t = 10)]
    max_crashes: u8,
    #[arg(short, long, default_value_t = 500)]
    window_ms: u32,
    /// Number of boot slots
    #[arg(short, long, default_value_t = 2)]
    slots: u8,
}

fn parse_crash(entry: &str) -> Result<(String, u32), String> {
    let (build, tick) = entry
        .split_once('@')
        .ok_or_else(|| format!("'{entry}' is not in the `build@tick` format"))?;
    let tick = tick
        .parse()
        .map_err(|err| format!("wrong tick count in '{entry}': {err}"))?;
    Ok((build.to_owned(), tick))
}

fn main() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .format_timestamp_millis()
        .init();
    // Restarts unwind out of the guard, the default hook would print each of them
    std::panic::set_hook(Box::new(|_| {}));

    let args = Args::parse();
    let flash = FakeFlash::new(8192);
    let boot = FakeBootloader::new(0, args.slots);
    let clock = FakeClock::default();

    for (build, tick) in args.crash {
        let config = GuardConfig {
            build_info: build.leak(),
            max_crashes: args.max_crashes,
            crash_window_ms: args.window_ms,
            region_base: 0,
        };
        let mut guard = CrashGuard::new(flash.clone(), boot.clone(), clock.clone(), config);
        guard.report();
        clock.set(tick);
        match catch_restart(move || guard.on_crash()) {
            Ok(Ok(verdict)) => info!("{verdict:?}"),
            Ok(Err(err)) => error!("Crash guard failed: {err}"),
            Err(_) => info!("Device restarted into boot slot {}", boot.current_slot()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_crash() {
        assert_eq!(parse_crash("v1@20"), Ok(("v1".to_owned(), 20)));
        assert_eq!(
            parse_crash("2025-01-02 03:04:05@7"),
            Ok(("2025-01-02 03:04:05".to_owned(), 7))
        );
        assert!(parse_crash("v1").is_err());
        assert!(parse_crash("v1@-3").is_err());
        assert!(Args::try_parse_from(["crash_loop", "--crash", "v1@x"]).is_err());

        let args = Args::try_parse_from(["crash_loop", "-c", "v1@0", "-c", "v2@10"]).unwrap();
        assert_eq!(args.crash, vec![("v1".to_owned(), 0), ("v2".to_owned(), 10)]);
    }
}
