//! Dashsync daemon library
//!
//! This module provides the core components for the dashsync daemon:
//! - Layered configuration
//! - The ConfigMap watch and mounted directory sources
//! - Server lifecycle management

pub mod config;
pub mod configmaps;
pub mod error;
pub mod server;
pub mod source;

pub use config::{ConfigOverrides, DaemonConfig, SourceKind};
pub use configmaps::ConfigMapSource;
pub use error::{DaemonError, DaemonResult};
pub use server::Server;
pub use source::DirectorySource;
