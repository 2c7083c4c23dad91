//! Remote version check against the package registry.

pub mod checker;
pub mod version;

pub use {
    checker::{UpdateCheck, UpdateCheckError, UpdateChecker, format_status_line, format_update_notice},
    version::{compare_versions, is_newer_version},
};
