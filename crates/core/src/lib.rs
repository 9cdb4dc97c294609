//! Domain logic for storyboard planning.
//!
//! Everything in this crate is pure: no database, no HTTP. The `db` crate
//! persists the types defined here and the `api` crate drives them.

pub mod analytics;
pub mod completion;
pub mod editor;
pub mod error;
pub mod export;
pub mod permissions;
pub mod roles;
pub mod search;
pub mod storyboard;
pub mod types;
pub mod upload;
pub mod writer;
