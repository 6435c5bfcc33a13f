//! PyTurbo AI gateway.
//!
//! Backend for the Python optimizer front end: a pooled-SQLite
//! credential store, the signup/login auth service over it, and a
//! completion proxy that forwards submitted code to an external
//! OpenAI-compatible provider — all behind an axum HTTP surface.
//! The [`shell`] module carries the client side: an explicit session
//! state machine and a typed API client.

pub mod auth;
pub mod config;
pub mod gateway;
pub mod proxy;
pub mod shell;
