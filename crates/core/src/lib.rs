//! AllBlackery Core - Shared domain types.
//!
//! This crate provides the common types used across the AllBlackery
//! storefront components:
//! - `storefront` - Headless storefront client (API client + workflows)
//! - Rendering layers that consume the storefront crate
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no async.
//! This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, contact channels, OTP codes, money, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
