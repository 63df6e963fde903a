//! # rostersync-directory
//!
//! Blocking HTTP adapter implementing [`rostersync_engine::GroupDirectory`]
//! against the Google Admin Directory and Groups Settings REST APIs.
//!
//! Authentication is a pre-obtained OAuth bearer token supplied by the
//! caller; obtaining and refreshing credentials is outside this crate.

pub mod client;
mod wire;

pub use client::DirectoryClient;
