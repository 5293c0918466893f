use core::cell::Cell;

use embassy_sync::blocking_mutex::{Mutex, raw::CriticalSectionRawMutex};

/// Monotonic tick counter of the runtime, restarts from zero on every boot.
pub trait TickSource {
    /// Length of one tick in milliseconds.
    const TICK_MS: u32;

    fn ticks(&self) -> u32;
}

/// Callback run from the runtime's fault path.
pub trait CrashHandler: Sync {
    fn on_crash(&self);
}

/// Registration of the single global exception handler.
pub trait ExceptionHooks {
    /// Installs `handler`, replacing any previously installed one.
    fn set_exception_handler(&self, handler: &'static dyn CrashHandler);
}

/// Storage for the one exception handler a runtime invokes on a fault.
///
/// The fault handler runs in handler mode, so this uses a critical section rather than a
/// thread-mode mutex.
pub struct HandlerSlot {
    handler: Mutex<CriticalSectionRawMutex, Cell<Option<&'static dyn CrashHandler>>>,
}

impl HandlerSlot {
    pub const fn new() -> Self {
        Self {
            handler: Mutex::new(Cell::new(None)),
        }
    }

    pub fn is_set(&self) -> bool {
        self.handler.lock(|handler| handler.get().is_some())
    }

    /// Runs the installed handler, returns false if there is none.
    pub fn invoke(&self) -> bool {
        // The handler is copied out, so it doesn't run inside the critical section of the slot
        let handler = self.handler.lock(|handler| handler.get());
        match handler {
            Some(handler) => {
                handler.on_crash();
                true
            }
            None => false,
        }
    }
}

impl Default for HandlerSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl ExceptionHooks for HandlerSlot {
    fn set_exception_handler(&self, handler: &'static dyn CrashHandler) {
        self.handler.lock(|slot| slot.set(Some(handler)));
    }
}
