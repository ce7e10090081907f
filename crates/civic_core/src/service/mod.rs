//! Core use-case services.
//!
//! # Responsibility
//! - Own the document lifecycle (`state_store`) and the operations the
//!   presentation layer calls back into.
//! - Keep rendering code decoupled from storage details.

pub mod metrics;
pub mod record_service;
pub mod snapshot;
pub mod state_store;
