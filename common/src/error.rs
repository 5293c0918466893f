use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    #[error("Buffer too small")]
    BufferTooSmallError,
    #[error("Flash I/O error")]
    FlashError,
    #[error("Crash log is full")]
    LogFull,
    #[error("Bootloader error")]
    BootloaderError,
}
