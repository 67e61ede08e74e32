//! Host-facing surface: session owner, persisted config and file access.

pub mod config;
pub mod host;
pub mod session;

pub use config::{SESSION_CONFIG_JSON_SCHEMA_V1, SessionConfig, SessionConfigJsonContractV1};
pub use host::{FileStat, HostFs, StdHost};
pub use session::AnnotationSession;
