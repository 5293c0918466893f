//! Host stand-ins for the flash, the bootloader and the tick counter.
extern crate std;

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::vec::Vec;

use embedded_storage::nor_flash::{
    ErrorType, NorFlash, NorFlashErrorKind, ReadNorFlash, check_erase, check_read, check_write,
};

use crate::boot::{BootSlots, Bootloader};
use crate::error::Error;
use crate::record::ERASED_BYTE;
use crate::runtime::TickSource;

#[derive(Default)]
struct FlashState {
    data: Vec<u8>,
    reads: usize,
    writes: usize,
    erases: usize,
    fail_reads: bool,
    fail_writes: bool,
    fail_erases: bool,
}

/// NOR flash in memory. Clones share the same contents, so a test can keep a handle to a flash
/// that was moved into the guard.
#[derive(Clone, Default)]
pub struct FakeFlash {
    state: Arc<Mutex<FlashState>>,
}

impl FakeFlash {
    /// Erased flash of `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        let state = FlashState {
            data: std::vec![ERASED_BYTE; capacity],
            ..Default::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn state(&self) -> MutexGuard<'_, FlashState> {
        self.state.lock().unwrap()
    }

    pub fn bytes(&self, offset: u32, len: usize) -> Vec<u8> {
        let offset = offset as usize;
        self.state().data[offset..offset + len].to_vec()
    }

    /// Overwrites flash contents, ignoring NOR semantics.
    pub fn set_bytes(&self, offset: u32, bytes: &[u8]) {
        let offset = offset as usize;
        self.state().data[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    pub fn read_count(&self) -> usize {
        self.state().reads
    }

    pub fn write_count(&self) -> usize {
        self.state().writes
    }

    pub fn erase_count(&self) -> usize {
        self.state().erases
    }

    pub fn fail_reads(&self, fail: bool) {
        self.state().fail_reads = fail;
    }

    pub fn fail_writes(&self, fail: bool) {
        self.state().fail_writes = fail;
    }

    pub fn fail_erases(&self, fail: bool) {
        self.state().fail_erases = fail;
    }
}

impl ErrorType for FakeFlash {
    type Error = NorFlashErrorKind;
}

impl ReadNorFlash for FakeFlash {
    const READ_SIZE: usize = 1;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        check_read(self, offset, bytes.len())?;
        let mut state = self.state();
        if state.fail_reads {
            return Err(NorFlashErrorKind::Other);
        }
        state.reads += 1;
        let offset = offset as usize;
        bytes.copy_from_slice(&state.data[offset..offset + bytes.len()]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.state().data.len()
    }
}

impl NorFlash for FakeFlash {
    const WRITE_SIZE: usize = 4;
    const ERASE_SIZE: usize = 4096;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        check_erase(self, from, to)?;
        let mut state = self.state();
        if state.fail_erases {
            return Err(NorFlashErrorKind::Other);
        }
        state.erases += 1;
        state.data[from as usize..to as usize].fill(ERASED_BYTE);
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        check_write(self, offset, bytes.len())?;
        let mut state = self.state();
        if state.fail_writes {
            return Err(NorFlashErrorKind::Other);
        }
        state.writes += 1;
        let offset = offset as usize;
        // Programming can only clear bits
        for (cell, byte) in state.data[offset..offset + bytes.len()].iter_mut().zip(bytes) {
            *cell &= *byte;
        }
        Ok(())
    }
}

struct BootState {
    slots: BootSlots,
    switches: Vec<u8>,
    restarts: usize,
    fail_query: bool,
    fail_switch: bool,
}

/// Panic payload used by [`FakeBootloader::restart`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Restarted;

/// Bootloader recording the requested slot switches. Clones share the same state.
#[derive(Clone)]
pub struct FakeBootloader {
    state: Arc<Mutex<BootState>>,
}

impl FakeBootloader {
    pub fn new(current: u8, count: u8) -> Self {
        let mut slots = BootSlots::new(current, count);
        for slot in 0..u32::from(count) {
            let _ = slots.offsets.push(0x2000 + slot * 0x10_0000);
        }
        let state = BootState {
            slots,
            switches: Vec::new(),
            restarts: 0,
            fail_query: false,
            fail_switch: false,
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn state(&self) -> MutexGuard<'_, BootState> {
        self.state.lock().unwrap()
    }

    /// Slots passed to `set_active_slot`, in order.
    pub fn switches(&self) -> Vec<u8> {
        self.state().switches.clone()
    }

    pub fn restarts(&self) -> usize {
        self.state().restarts
    }

    pub fn current_slot(&self) -> u8 {
        self.state().slots.current
    }

    pub fn fail_query(&self, fail: bool) {
        self.state().fail_query = fail;
    }

    pub fn fail_switch(&self, fail: bool) {
        self.state().fail_switch = fail;
    }
}

impl Bootloader for FakeBootloader {
    fn boot_slots(&mut self) -> crate::Result<BootSlots> {
        let state = self.state();
        if state.fail_query {
            return Err(Error::BootloaderError);
        }
        Ok(state.slots.clone())
    }

    fn set_active_slot(&mut self, slot: u8) -> crate::Result<()> {
        let mut state = self.state();
        state.switches.push(slot);
        if state.fail_switch {
            return Err(Error::BootloaderError);
        }
        state.slots.current = slot;
        Ok(())
    }

    fn restart(&mut self) -> ! {
        self.state().restarts += 1;
        panic::panic_any(Restarted)
    }
}

/// Runs `f`, turning a restart of [`FakeBootloader`] into `Err(Restarted)`.
pub fn catch_restart<R>(f: impl FnOnce() -> R) -> Result<R, Restarted> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => Ok(result),
        Err(payload) if payload.is::<Restarted>() => Err(Restarted),
        Err(payload) => panic::resume_unwind(payload),
    }
}

/// Tick counter set by the test, 10 ms per tick. Clones share the counter.
#[derive(Clone, Default)]
pub struct FakeClock {
    ticks: Arc<AtomicU32>,
}

impl FakeClock {
    pub fn set(&self, ticks: u32) {
        self.ticks.store(ticks, Ordering::Relaxed);
    }
}

impl TickSource for FakeClock {
    const TICK_MS: u32 = 10;

    fn ticks(&self) -> u32 {
        self.ticks.load(Ordering::Relaxed)
    }
}
