#![no_std]

pub mod boot;
pub mod config;
pub mod crash_log;
pub mod error;
#[cfg(feature = "std")]
pub mod fake;
pub mod guard;
pub mod hook;
pub mod record;
pub mod runtime;
pub mod store;

pub type Result<T> = core::result::Result<T, error::Error>;
