//! Storefront: a self-hosted e-commerce backend.
//!
//! ## Features
//! - User registration, login, profiles, and address book
//! - Product catalog with categories, search, and stock tracking
//! - Per-user shopping cart with price-lock and quantity merging
//! - Transactional checkout with guarded stock decrements
//! - Payment-gateway checkout sessions and webhook-driven order status
//! - Admin dashboard and period-bucketed sales reporting

pub mod auth;
pub mod checkout;
pub mod config;
pub mod domain;
pub mod error;
pub mod events;
pub mod http;
pub mod payments;
pub mod report;
pub mod service;

pub use error::{Error, Result};
