//! Infrastructure layer - External concerns
//!
//! This layer contains:
//! - Config: YAML configuration loading
//! - Storage: JSON document persistence
//! - Extensions: manifest discovery and shared-library loading
//! - Adapters: gateway implementations (console, in-memory)

pub mod adapters;
pub mod config;
pub mod extensions;
pub mod storage;
