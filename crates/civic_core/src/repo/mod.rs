//! Persistent storage abstractions.
//!
//! # Responsibility
//! - Define the whole-value key storage contract the state store writes to.
//! - Keep SQLite details out of the service layer.
//!
//! # Invariants
//! - Quota violations are reported as `RepoError::QuotaExceeded`, distinct
//!   from transport failures.

pub mod kv_repo;
