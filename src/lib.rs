//! Chat Relay - streaming chat proxy and client runtime
//!
//! The server side forwards chat messages to an automation webhook and
//! streams the reply back untouched. The client side decodes that stream
//! into an incrementally updated message log, one turn at a time.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod frame;
pub mod relay;
pub mod runtime;
pub mod session;
pub mod state_machine;
