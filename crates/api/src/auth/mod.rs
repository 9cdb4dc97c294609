//! Authentication and authorization primitives.
//!
//! - [`password`] -- Argon2id password hashing and verification.
//! - [`jwt`] -- JWT access-token generation, validation, and refresh-token helpers.
//! - [`permissions`] -- Per-user effective permission cache.

pub mod jwt;
pub mod password;
pub mod permissions;
