use embedded_storage::nor_flash::NorFlash;

use crate::error::Error;
use crate::record::RECORD_SIZE;

/// Raw access to the flash region holding the crash records.
///
/// Knows the geometry of the region (base offset and number of record slots), nothing about
/// what the records mean.
pub struct FlashRecordStore<F> {
    flash: F,
    base: u32,
    slots: u8,
}

impl<F: NorFlash> FlashRecordStore<F> {
    pub fn new(flash: F, base: u32, slots: u8) -> Self {
        Self { flash, base, slots }
    }

    pub fn slots(&self) -> u8 {
        self.slots
    }

    /// Absolute flash offset of the given slot.
    pub fn slot_offset(&self, slot: u8) -> u32 {
        self.base + u32::from(slot) * RECORD_SIZE as u32
    }

    pub fn region_len(&self) -> u32 {
        u32::from(self.slots) * RECORD_SIZE as u32
    }

    /// Fills the whole of `buffer`, a failed read is never partial.
    pub fn read(&mut self, offset: u32, buffer: &mut [u8]) -> crate::Result<()> {
        self.flash.read(offset, buffer).map_err(|_| Error::FlashError)
    }

    pub fn write(&mut self, offset: u32, bytes: &[u8]) -> crate::Result<()> {
        self.flash.write(offset, bytes).map_err(|_| Error::FlashError)
    }

    /// Erases every sector overlapped by the region.
    pub fn erase_region(&mut self) -> crate::Result<()> {
        let erase_size = F::ERASE_SIZE as u32;
        let end = self.base + self.region_len().div_ceil(erase_size) * erase_size;
        self.flash.erase(self.base, end).map_err(|_| Error::FlashError)
    }

    pub fn flash(&self) -> &F {
        &self.flash
    }
}

#[cfg(feature = "std")]
#[cfg(test)]
mod test {
    use super::*;
    use crate::fake::FakeFlash;
    use crate::record::{BuildVersion, CrashRecord, ERASED_BYTE};

    #[test]
    fn test_record_round_trip() -> crate::Result<()> {
        let flash = FakeFlash::new(8192);
        let mut store = FlashRecordStore::new(flash.clone(), 4096, 10);
        let record = CrashRecord::new(BuildVersion::new("2024-12-24 10:48:23"), 1234);

        store.write(store.slot_offset(3), &record.encode())?;
        let mut raw = [0; RECORD_SIZE];
        store.read(store.slot_offset(3), &mut raw)?;
        let read_back = CrashRecord::decode(&raw)?;
        assert_eq!(read_back.build_version, record.build_version);
        assert_eq!(read_back.crash_tick, 1234);
        assert_eq!(flash.bytes(4096 + 3 * 24, 2), b"20");
        Ok(())
    }

    #[test]
    fn test_erase_region() -> crate::Result<()> {
        let flash = FakeFlash::new(8192);
        let mut store = FlashRecordStore::new(flash.clone(), 4096, 10);
        store.write(store.slot_offset(9), &[0; RECORD_SIZE])?;
        store.erase_region()?;
        assert!(flash.bytes(4096, 4096).iter().all(|b| *b == ERASED_BYTE));
        assert_eq!(flash.erase_count(), 1);
        Ok(())
    }

    #[test]
    fn test_misaligned_region() {
        let mut store = FlashRecordStore::new(FakeFlash::new(8192), 24, 10);
        assert_eq!(store.erase_region().unwrap_err(), Error::FlashError);
    }

    #[test]
    fn test_flash_failures() {
        let flash = FakeFlash::new(8192);
        let mut store = FlashRecordStore::new(flash.clone(), 0, 10);
        flash.fail_reads(true);
        let mut raw = [0; RECORD_SIZE];
        assert_eq!(store.read(0, &mut raw).unwrap_err(), Error::FlashError);
        flash.fail_writes(true);
        assert_eq!(store.write(0, &raw).unwrap_err(), Error::FlashError);
    }
}
