//! Infrastructure Services
//!
//! This module provides the core infrastructure services for the application:
//!
//! - **client**: backend client with credential, profile, and storage operations
//! - **config**: configuration management and validation
//! - **errors**: registration flow error types and staging

pub mod client;
pub mod config;
pub mod errors;
