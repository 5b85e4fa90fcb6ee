//! # Meal Planner Shared Library
//!
//! Domain logic for shared meal planning: groups and their members, role-based
//! permissions, invite links, meal attendance and cooks, and incremental sync.
//!
//! ## Module Organization
//!
//! - `permissions`: Role → action matrix
//! - `participants`: Participant counting and roster ordering
//! - `sync`: Live/tombstone delta computation
//! - `error`: Domain error taxonomy
//! - `auth`: Authentication and group-scoped authorization
//! - `db`: Connection pool and migrations
//! - `models`: Database models
//! - `services`: Domain operations

pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod participants;
pub mod permissions;
pub mod services;
pub mod sync;

/// Current version of the shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
