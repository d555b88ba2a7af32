//! Event bus primitives.
//!
//! The bus knows nothing about plugins; the host wraps one bus per root
//! instance.

pub mod event_bus;
