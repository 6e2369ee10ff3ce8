//! Debounced batching.
//!
//! [`Debouncer`] collects items until a quiet window passes and hands them to
//! a [`BatchHandler`] in one call. [`RefreshPublisher`] is the
//! notification-shaped use of it: many "something changed" signals become one
//! client refresh.

mod debouncer;
mod refresh;

pub use debouncer::{BatchHandler, Debouncer, Gate};
pub use refresh::RefreshPublisher;
