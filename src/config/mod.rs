//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → AuditConfig (validated, immutable)
//!     → AuditDispatcher::from_config builds the backends
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → AuditDispatcher::apply_config swaps switch and service labels
//! ```
//!
//! # Design Decisions
//! - Backends are built once; reload only touches dispatch-level state
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{AuditConfig, LogConfig, MetricsConfig, ServiceAuditConfig};
pub use validation::ValidationError;
