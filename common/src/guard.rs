use core::convert::Infallible;

#[cfg(feature = "defmt")]
use defmt::{debug, error, info, warn};
use embedded_storage::nor_flash::{NorFlash, ReadNorFlash};
#[cfg(not(feature = "defmt"))]
use log::{debug, error, info, warn};

use crate::boot::Bootloader;
use crate::config::GuardConfig;
use crate::crash_log::CrashLog;
use crate::error::Error;
use crate::record::{BuildVersion, CrashRecord, RECORD_SIZE};
use crate::runtime::TickSource;
use crate::store::FlashRecordStore;

/// Outcome of a crash that didn't end in a rollback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Verdict {
    /// The crash was written to the log at `slot`.
    Recorded { slot: u8 },
    /// The log held crashes of another build, it was erased and the crash written to `slot`.
    NewBuild { slot: u8 },
    /// The previous crash is too old, this one is unrelated and isn't counted.
    Skipped { age_ms: u32 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Decision {
    Append,
    Skip { age_ms: u32 },
    Rollback,
}

/// Milliseconds between two tick counts.
///
/// Ticks restart from zero on every boot, so the distance is symmetric and computed modulo 2^32.
pub fn crash_age_ms(prev_tick: u32, now: u32, tick_ms: u32) -> u32 {
    let ticks = now.wrapping_sub(prev_tick).min(prev_tick.wrapping_sub(now));
    u32::try_from(u64::from(ticks) * u64::from(tick_ms)).unwrap_or(u32::MAX)
}

/// Decides what to do with a crash at tick `now`. The `tail` must come from the running build,
/// `recorded` is the number of records in the log.
fn judge(
    config: &GuardConfig,
    tick_ms: u32,
    tail: Option<&CrashRecord>,
    recorded: u8,
    now: u32,
) -> Decision {
    if let Some(tail) = tail {
        if recorded < config.max_crashes {
            let age_ms = crash_age_ms(tail.crash_tick, now, tick_ms);
            if age_ms > config.crash_window_ms {
                return Decision::Skip { age_ms };
            }
        }
    }
    // This crash would be the last one the log has room for
    if u16::from(recorded) + 1 >= u16::from(config.max_crashes) {
        Decision::Rollback
    } else {
        Decision::Append
    }
}

/// Number of records (at most `u8::MAX`) that fit between `base` and the end of the flash. The
/// region is erased in whole sectors, so only complete sectors count.
fn fitting_slots<F: NorFlash>(flash: &F, base: u32) -> usize {
    let available = flash.capacity().saturating_sub(base as usize);
    let available = available - available % F::ERASE_SIZE;
    (available / RECORD_SIZE).min(usize::from(u8::MAX))
}

/// Crash-loop detector: counts quick successive crashes of one build and falls back to the
/// previous boot slot when there are too many of them.
pub struct CrashGuard<F, B, C> {
    log: CrashLog<F>,
    boot: B,
    clock: C,
    build: BuildVersion,
    config: GuardConfig,
}

impl<F: NorFlash, B: Bootloader, C: TickSource> CrashGuard<F, B, C> {
    pub fn new(flash: F, boot: B, clock: C, mut config: GuardConfig) -> Self {
        if config.max_crashes == 0 {
            warn!("Maximum crash count can't be 0, using 1");
            config.max_crashes = 1;
        }
        let fitting = fitting_slots(&flash, config.region_base);
        if fitting > 0 && usize::from(config.max_crashes) > fitting {
            warn!(
                "{} crashes don't fit the flash at {:#x}, using {}",
                config.max_crashes, config.region_base, fitting
            );
            config.max_crashes = fitting as u8;
        }
        let store = FlashRecordStore::new(flash, config.region_base, config.max_crashes);
        Self {
            log: CrashLog::new(store),
            boot,
            clock,
            build: BuildVersion::new(config.build_info),
            config,
        }
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    pub fn crash_log(&mut self) -> &mut CrashLog<F> {
        &mut self.log
    }

    /// Logs the boot slots and the most recent crash.
    pub fn report(&mut self) {
        info!("Crash guard armed for build {}", self.config.build_info);
        match self.boot.boot_slots() {
            Ok(slots) => slots.log(),
            Err(err) => warn!("Cannot read boot slots: {}", err),
        }
        match self.log.read_tail() {
            Ok(Some(tail)) => info!(
                "Last crash: build {}, tick {}",
                tail.build_version, tail.crash_tick
            ),
            Ok(None) => debug!("No crash recorded"),
            Err(err) => warn!("Cannot read crash log: {}", err),
        }
    }

    /// Handles a crash happening now, see [`CrashGuard::handle_crash`].
    pub fn on_crash(&mut self) -> crate::Result<Verdict> {
        let now = self.clock.ticks();
        self.handle_crash(now)
    }

    /// Records a crash at tick `now`, or rolls back if the crash completes a crash loop.
    ///
    /// Returns only if there was no rollback. A flash error aborts the handling and nothing else
    /// is attempted.
    pub fn handle_crash(&mut self, now: u32) -> crate::Result<Verdict> {
        info!("Handling crash of build {} at tick {}", self.build, now);
        let next_slot = self.log.find_next_empty_slot()?;
        let mut recorded = next_slot.unwrap_or(self.log.capacity());
        let mut tail = match recorded {
            0 => None,
            len => self.log.read_slot(len - 1)?,
        };

        let mut new_build = false;
        if let Some(prev) = tail.filter(|prev| !prev.matches_build(&self.build)) {
            info!(
                "New build {} detected, erasing crashes of {}",
                self.build, prev.build_version
            );
            self.log.reset()?;
            tail = None;
            recorded = 0;
            new_build = true;
        }

        match judge(&self.config, C::TICK_MS, tail.as_ref(), recorded, now) {
            Decision::Append => {
                let record = CrashRecord::new(self.build, now);
                match self.log.append(&record) {
                    Ok(slot) => {
                        info!("Crash {} of {} recorded", slot + 1, self.config.max_crashes);
                        Ok(if new_build {
                            Verdict::NewBuild { slot }
                        } else {
                            Verdict::Recorded { slot }
                        })
                    }
                    Err(Error::LogFull) => match self.trigger_rollback()? {},
                    Err(err) => Err(err),
                }
            }
            Decision::Skip { age_ms } => {
                info!(
                    "Previous crash was {} ms ago, outside of {} ms, not counting it",
                    age_ms, self.config.crash_window_ms
                );
                Ok(Verdict::Skipped { age_ms })
            }
            Decision::Rollback => match self.trigger_rollback()? {},
        }
    }

    /// Erases the log, selects the next boot slot and restarts.
    ///
    /// Returns only if the log can't be erased, in which case the boot slot stays as it is.
    pub fn trigger_rollback(&mut self) -> crate::Result<Infallible> {
        warn!("Crash loop of build {} detected, rolling back", self.build);
        self.log.reset()?;

        match self.boot.boot_slots() {
            Ok(slots) => {
                let next = slots.next_slot();
                if !slots.has_alternate() {
                    warn!("Only one boot slot, restarting into the same image");
                }
                info!("Switching boot slot {} -> {}", slots.current, next);
                if let Err(err) = self.boot.set_active_slot(next) {
                    error!("Cannot switch boot slot: {}", err);
                }
            }
            Err(err) => error!("Cannot read boot slots: {}", err),
        }
        self.boot.restart()
    }
}
