//! Workspace facade crate.
//!
//! Host applications depend on `music-switcher` and get the service facade
//! plus the types needed to configure it. The `desktop-shims` feature (on by
//! default) maps to `core-service/desktop-shims`.

pub use core_service::*;
