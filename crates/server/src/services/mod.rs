//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Password, SMS-code and dev logins; JWT tokens
//! - `catalog` - Category tree rules, category cache, product presentation
//! - `checkout` - Cart to order in one transaction
//! - `content` - Static home page blocks
//! - `media` - Uploaded image files
//! - `sms` - One-time verification codes

pub mod auth;
pub mod catalog;
pub mod checkout;
pub mod content;
pub mod media;
pub mod sms;
