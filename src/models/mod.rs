// src/models/mod.rs

//! Domain models for the notifier application.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod course;
mod identity;
mod payload;

// Re-export all public types
pub use config::{BootstrapConfig, Config, HttpConfig, PortalConfig};
pub use course::{ItemKind, PendingItem};
pub use identity::{DEFAULT_RECIPIENT, Identity};
pub use payload::{NotificationPayload, SourceTag, UserRef};
