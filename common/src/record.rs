//! Binary layout of a single crash record.
//!
//! A record occupies [`RECORD_SIZE`] bytes on flash:
//!
//! | bytes  | content                                        |
//! |--------|------------------------------------------------|
//! | 0..19  | build version, truncated and zero-padded       |
//! | 19     | layout tag, [`RECORD_LAYOUT`]                  |
//! | 20..24 | crash tick, u32 little-endian                  |
//!
//! The layout tag sits where a C compiler would put the alignment padding between a 19-byte
//! string and a `u32`. Bump it whenever the shape changes: records with a different tag are
//! treated as coming from a different build.

use core::fmt;

use crate::error::Error;

/// Capacity of the build version field.
pub const BUILD_VERSION_LEN: usize = 19;
/// Size of one encoded record.
pub const RECORD_SIZE: usize = 24;
/// Current record layout.
pub const RECORD_LAYOUT: u8 = 1;
/// Value of every byte of erased flash.
pub const ERASED_BYTE: u8 = 0xFF;

const LAYOUT_OFFSET: usize = BUILD_VERSION_LEN;
const TICK_OFFSET: usize = LAYOUT_OFFSET + 1;

pub type RawRecord = [u8; RECORD_SIZE];

/// Build identifier as stored on flash, compared byte-for-byte.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct BuildVersion([u8; BUILD_VERSION_LEN]);

impl BuildVersion {
    /// Truncates `build` to [`BUILD_VERSION_LEN`] bytes, padding the rest with zeros.
    pub fn new(build: &str) -> Self {
        let mut bytes = [0; BUILD_VERSION_LEN];
        let len = build.len().min(BUILD_VERSION_LEN);
        bytes[..len].copy_from_slice(&build.as_bytes()[..len]);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; BUILD_VERSION_LEN] {
        &self.0
    }

    /// Text up to the first zero byte, or `"<invalid>"` for a garbled field.
    pub fn as_str(&self) -> &str {
        let end = self.0.iter().position(|b| *b == 0).unwrap_or(BUILD_VERSION_LEN);
        core::str::from_utf8(&self.0[..end]).unwrap_or("<invalid>")
    }
}

impl fmt::Display for BuildVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for BuildVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BuildVersion({:?})", self.as_str())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for BuildVersion {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{}", self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CrashRecord {
    pub build_version: BuildVersion,
    pub crash_tick: u32,
    layout: u8,
}

impl CrashRecord {
    pub fn new(build_version: BuildVersion, crash_tick: u32) -> Self {
        Self {
            build_version,
            crash_tick,
            layout: RECORD_LAYOUT,
        }
    }

    pub fn layout(&self) -> u8 {
        self.layout
    }

    /// Whether this record was written by `build` using the current layout.
    pub fn matches_build(&self, build: &BuildVersion) -> bool {
        self.layout == RECORD_LAYOUT && self.build_version == *build
    }

    pub fn encode(&self) -> RawRecord {
        let mut raw = [0; RECORD_SIZE];
        raw[..BUILD_VERSION_LEN].copy_from_slice(self.build_version.as_bytes());
        raw[LAYOUT_OFFSET] = self.layout;
        raw[TICK_OFFSET..].copy_from_slice(&self.crash_tick.to_le_bytes());
        raw
    }

    /// Decodes a record without judging its content, a half-written record decodes as well.
    pub fn decode(bytes: &[u8]) -> crate::Result<Self> {
        let raw: &RawRecord = bytes
            .get(..RECORD_SIZE)
            .and_then(|raw| raw.try_into().ok())
            .ok_or(Error::BufferTooSmallError)?;

        let mut build_version = [0; BUILD_VERSION_LEN];
        build_version.copy_from_slice(&raw[..BUILD_VERSION_LEN]);
        let mut tick = [0; 4];
        tick.copy_from_slice(&raw[TICK_OFFSET..]);
        Ok(Self {
            build_version: BuildVersion(build_version),
            crash_tick: u32::from_le_bytes(tick),
            layout: raw[LAYOUT_OFFSET],
        })
    }
}

/// An erased slot reads back as [`ERASED_BYTE`] everywhere.
pub fn is_erased(bytes: &[u8]) -> bool {
    bytes.iter().all(|b| *b == ERASED_BYTE)
}

#[cfg(test)]
mod test_record {
    use super::*;

    #[test]
    fn test_build_version_truncation() {
        let build = BuildVersion::new("2024-12-24 10:48:23 extra");
        assert_eq!(build.as_str(), "2024-12-24 10:48:23");
        assert_eq!(build, BuildVersion::new("2024-12-24 10:48:23"));

        let short = BuildVersion::new("v1");
        assert_eq!(&short.as_bytes()[..3], b"v1\0");
        assert_eq!(short.as_str(), "v1");
    }

    #[test]
    fn test_record_layout() {
        let record = CrashRecord::new(BuildVersion::new("v1"), 0x0403_0201);
        let raw = record.encode();
        assert_eq!(&raw[..2], b"v1");
        assert!(raw[2..BUILD_VERSION_LEN].iter().all(|b| *b == 0));
        assert_eq!(raw[19], RECORD_LAYOUT);
        assert_eq!(&raw[20..], &[1, 2, 3, 4]);
        assert!(!is_erased(&raw));
    }

    #[test]
    fn test_decode() -> crate::Result<()> {
        let record = CrashRecord::new(BuildVersion::new("2024-12-24 10:48:23"), u32::MAX);
        let decoded = CrashRecord::decode(&record.encode())?;
        assert_eq!(decoded, record);
        assert!(decoded.matches_build(&BuildVersion::new("2024-12-24 10:48:23")));

        assert_eq!(
            CrashRecord::decode(&[0; RECORD_SIZE - 1]).unwrap_err(),
            Error::BufferTooSmallError
        );
        Ok(())
    }

    #[test]
    fn test_torn_record() -> crate::Result<()> {
        // Power lost after the first half-word hit the flash
        let mut raw = [ERASED_BYTE; RECORD_SIZE];
        raw[..2].copy_from_slice(b"v1");
        assert!(!is_erased(&raw));

        let torn = CrashRecord::decode(&raw)?;
        assert_eq!(torn.layout(), ERASED_BYTE);
        assert_eq!(torn.build_version.as_str(), "<invalid>");
        assert!(!torn.matches_build(&BuildVersion::new("v1")));
        Ok(())
    }
}
