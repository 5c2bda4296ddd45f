//! Persistent domain entities and their pure invariants.

pub mod cart;
pub mod catalog;
pub mod order;
pub mod user;
