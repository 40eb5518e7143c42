//! Core types for the AllBlackery storefront.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod contact;
pub mod id;
pub mod money;
pub mod otp;
pub mod status;

pub use contact::{ChannelTarget, Email, EmailError, Phone, PhoneError};
pub use id::*;
pub use money::{CurrencyCode, Money};
pub use otp::{OtpCode, OtpCodeError, OtpPurpose};
pub use status::*;
