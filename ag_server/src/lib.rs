//! Authentication server built on `authguard`.
//!
//! Exposes the router and its pieces so integration tests can drive the
//! full request pipeline without binding a socket.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
