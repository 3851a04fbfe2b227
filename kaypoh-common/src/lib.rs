//! # Kaypoh Common Library
//!
//! Shared code for the Kaypoh review services:
//! - Error type and result alias
//! - Configuration resolution (environment → TOML → defaults)
//! - Tracing initialisation
//! - Progress event types and the broadcast EventBus

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
