//! Cartsync relay library.
//!
//! Relays user-registration and abandoned-cart events from the storefront
//! to a Mailchimp audience. Exposed as a library so the router can be booted
//! in-process by the integration tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
