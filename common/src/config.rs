/// Default number of crashes tracked before rolling back.
pub const DEFAULT_MAX_CRASHES: u8 = 10;
/// Crashes closer than this to the previous one count as a crash loop.
pub const DEFAULT_CRASH_WINDOW_MS: u32 = 500;
/// Default flash offset of the crash log.
pub const DEFAULT_REGION_BASE: u32 = 0x30_0000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GuardConfig {
    /// Identifier of the running build, only the first 19 bytes are stored.
    pub build_info: &'static str,
    /// Number of quick successive crashes that triggers a rollback.
    pub max_crashes: u8,
    /// Maximum distance of two crashes that belong to the same crash loop.
    pub crash_window_ms: u32,
    /// Flash offset of the crash log, has to be aligned to an erase sector.
    pub region_base: u32,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            build_info: "",
            max_crashes: DEFAULT_MAX_CRASHES,
            crash_window_ms: DEFAULT_CRASH_WINDOW_MS,
            region_base: DEFAULT_REGION_BASE,
        }
    }
}
