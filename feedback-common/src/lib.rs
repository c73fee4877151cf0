//! Feedback Common - shared configuration and logging.
//!
//! This crate provides:
//! - Configuration types, loading and environment overrides
//! - Configuration validation
//! - Logging setup

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod logging;
pub mod validation;

pub use config::{
    AdminConfig, Config, DatabaseConfig, LlmConfig, NetworkConfig, ObservabilityConfig,
    SecretsConfig, ServiceConfig,
};
pub use validation::{Validate, ValidationError, ValidationResult};
