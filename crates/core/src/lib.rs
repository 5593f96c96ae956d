//! Core enrollment approval logic for Campus.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! The persistence layer loads snapshots, asks these types what should happen,
//! and writes the result.
//!
//! # Modules
//!
//! - `workflow` - Approval chain, authorization, step sync and enrollment lifecycle
//! - `clock` - Injectable time source
//! - `cache` - Read-through TTL cache for lookup data

pub mod cache;
pub mod clock;
pub mod workflow;
