//! # us-observability
//!
//! Logging, metrics, and audit infrastructure for UnderSight.
//!
//! This crate provides structured logging with tracing, inventory and access
//! metrics, and an in-memory audit trail of triage decisions.

pub mod audit;
pub mod logging;
pub mod metrics;

pub use audit::{AuditEventType, AuditLog, AuditLogEntry, AuditResult};
pub use logging::{init_logging, LoggingConfig};
pub use metrics::{InventoryStats, MetricsCollector};
