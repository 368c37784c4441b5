//! Cartsync Core - Shared types library.
//!
//! This crate provides the domain types used by the relay service:
//! - validated email addresses and the subscriber hash derived from them
//! - user identifiers
//! - abandoned-cart line items and their human-readable formatting
//! - closed merge-field records sent to the marketing platform
//! - tag sets with union semantics
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients. This keeps it lightweight and easy to test in isolation.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
