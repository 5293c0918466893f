#[cfg(feature = "defmt")]
use defmt::debug;
use embedded_storage::nor_flash::NorFlash;
#[cfg(not(feature = "defmt"))]
use log::debug;

use crate::error::Error;
use crate::record::{CrashRecord, RECORD_SIZE, RawRecord, is_erased};
use crate::store::FlashRecordStore;

/// Append-only log of crash records.
///
/// Written records form a contiguous prefix of the region, the first erased slot marks the end.
/// Nothing else is persisted, so a scan is all it takes to recover the state after a reset.
pub struct CrashLog<F> {
    store: FlashRecordStore<F>,
}

impl<F: NorFlash> CrashLog<F> {
    pub fn new(store: FlashRecordStore<F>) -> Self {
        Self { store }
    }

    pub fn capacity(&self) -> u8 {
        self.store.slots()
    }

    fn read_raw(&mut self, slot: u8) -> crate::Result<RawRecord> {
        let mut raw = [0; RECORD_SIZE];
        let offset = self.store.slot_offset(slot);
        self.store.read(offset, &mut raw)?;
        Ok(raw)
    }

    /// Index of the first erased slot, `None` if all slots are taken.
    pub fn find_next_empty_slot(&mut self) -> crate::Result<Option<u8>> {
        for slot in 0..self.capacity() {
            if is_erased(&self.read_raw(slot)?) {
                return Ok(Some(slot));
            }
        }
        Ok(None)
    }

    /// Number of records in the log.
    pub fn len(&mut self) -> crate::Result<u8> {
        Ok(self.find_next_empty_slot()?.unwrap_or(self.capacity()))
    }

    pub fn is_empty(&mut self) -> crate::Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Reads the record at `slot`, `None` if the slot is erased.
    pub fn read_slot(&mut self, slot: u8) -> crate::Result<Option<CrashRecord>> {
        let raw = self.read_raw(slot)?;
        if is_erased(&raw) {
            Ok(None)
        } else {
            CrashRecord::decode(&raw).map(Some)
        }
    }

    /// The most recent record.
    pub fn read_tail(&mut self) -> crate::Result<Option<CrashRecord>> {
        match self.len()? {
            0 => Ok(None),
            len => self.read_slot(len - 1),
        }
    }

    /// Writes `record` into the first erased slot and returns the slot index.
    pub fn append(&mut self, record: &CrashRecord) -> crate::Result<u8> {
        let slot = self.find_next_empty_slot()?.ok_or(Error::LogFull)?;
        self.write_slot(slot, record)?;
        Ok(slot)
    }

    fn write_slot(&mut self, slot: u8, record: &CrashRecord) -> crate::Result<()> {
        debug!("Writing crash record to slot {}", slot);
        let offset = self.store.slot_offset(slot);
        self.store.write(offset, &record.encode())
    }

    /// Erases the whole log.
    pub fn reset(&mut self) -> crate::Result<()> {
        debug!("Erasing crash log");
        self.store.erase_region()
    }

    pub fn store(&self) -> &FlashRecordStore<F> {
        &self.store
    }
}
