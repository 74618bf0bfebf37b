//! Core domain + application logic for the confession bot.
//!
//! This crate is framework-agnostic. The chat platform lives behind the
//! `MessagingPort` trait, implemented in adapter crates.

pub mod audit;
pub mod config;
pub mod confessions;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod gate;
pub mod locks;
pub mod logging;
pub mod messaging;
pub mod store;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;

pub use errors::{Error, Result};
