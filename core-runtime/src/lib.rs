//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the music switcher core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! ## Overview
//!
//! This crate holds the pieces every other crate leans on: how logs are
//! emitted and forwarded to the host, how the core is configured with its
//! bridges, and how routing and preference activity is broadcast to observers.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
