//! Repository implementations for data persistence.
//!
//! This module provides PostgreSQL-backed implementations of the data access
//! traits the worker depends on.

mod tournament_repository;

pub use tournament_repository::*;
