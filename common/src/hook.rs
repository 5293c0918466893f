use core::cell::RefCell;

#[cfg(feature = "defmt")]
use defmt::{debug, error, info, warn};
use embassy_sync::blocking_mutex::{Mutex, raw::CriticalSectionRawMutex};
use embedded_storage::nor_flash::NorFlash;
#[cfg(not(feature = "defmt"))]
use log::{debug, error, info, warn};

use crate::boot::Bootloader;
use crate::guard::CrashGuard;
use crate::runtime::{CrashHandler, ExceptionHooks, TickSource};

struct HookState<F, B, C> {
    guard: Option<CrashGuard<F, B, C>>,
    fired: bool,
}

/// Connects a [`CrashGuard`] to the global exception handler of the runtime.
///
/// Meant to live in a `static`. Until [`CrashHook::init`] is called the hook does nothing, and
/// it handles at most one crash per `init`.
pub struct CrashHook<F, B, C> {
    state: Mutex<CriticalSectionRawMutex, RefCell<HookState<F, B, C>>>,
}

impl<F, B, C> CrashHook<F, B, C> {
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(RefCell::new(HookState {
                guard: None,
                fired: false,
            })),
        }
    }

    /// Whether the next crash will be handled.
    pub fn is_armed(&self) -> bool {
        self.state.lock(|state| {
            let state = state.borrow();
            state.guard.is_some() && !state.fired
        })
    }
}

impl<F, B, C> Default for CrashHook<F, B, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F, B, C> CrashHook<F, B, C>
where
    F: NorFlash + Send + 'static,
    B: Bootloader + Send + 'static,
    C: TickSource + Send + 'static,
{
    /// Arms the hook with `guard` and installs it as the exception handler.
    ///
    /// A second call replaces the guard and re-arms the hook, even after a handled crash. The
    /// hook stays the only installed handler.
    pub fn init(&'static self, mut guard: CrashGuard<F, B, C>, hooks: &impl ExceptionHooks) {
        guard.report();
        self.state.lock(|state| {
            let mut state = state.borrow_mut();
            state.guard = Some(guard);
            state.fired = false;
        });
        hooks.set_exception_handler(self);
    }
}

impl<F, B, C> CrashHandler for CrashHook<F, B, C>
where
    F: NorFlash + Send,
    B: Bootloader + Send,
    C: TickSource + Send,
{
    fn on_crash(&self) {
        // The guard runs outside of the critical section, it may never come back
        let guard = self.state.lock(|state| {
            let mut state = state.borrow_mut();
            if state.fired {
                warn!("Crash already handled");
                return None;
            }
            state.fired = state.guard.is_some();
            state.guard.take()
        });
        let Some(mut guard) = guard else {
            debug!("Crash guard not armed");
            return;
        };

        match guard.on_crash() {
            Ok(verdict) => info!("Crash handled: {:?}", verdict),
            Err(err) => error!("Crash guard failed: {}", err),
        }
        self.state.lock(|state| state.borrow_mut().guard = Some(guard));
    }
}
