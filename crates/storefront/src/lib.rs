//! AllBlackery headless storefront client.
//!
//! This crate owns the storefront's workflow logic and its typed REST API
//! client. Rendering layers (web, desktop) hold a [`Storefront`] and drive
//! the workflows from user input; nothing in here draws pixels.
//!
//! # Modules
//!
//! - [`api`] - Typed client for the AllBlackery REST backend
//! - [`services`] - Checkout wizard, OTP sessions, payment confirmation
//! - [`config`] - Environment-based configuration
//! - [`error`] - Unified error type
//!
//! # Example
//!
//! ```rust,ignore
//! use allblackery_storefront::{Storefront, config::StorefrontConfig};
//!
//! let config = StorefrontConfig::from_env()?;
//! let storefront = Storefront::new(config)?;
//!
//! let cart = storefront.api().get_cart().await?;
//! let mut wizard = storefront.begin_checkout(&cart)?;
//! wizard.apply_promo("SAVE10")?;
//! let summary = wizard.summary();
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod error;
pub mod services;
mod state;

pub use error::{Result, StorefrontError};
pub use state::Storefront;
