//! Client shell: the session state machine and gateway API client
//! behind the login/signup forms and the two-pane workspace.
//!
//! Rendering is out of scope here; the shell exposes the pieces a
//! front end drives: explicit state transitions ([`state`]) and typed
//! HTTP calls ([`api`]).

pub mod api;
pub mod state;

pub use api::{ClientError, ShellClient};
pub use state::{next, Event, Screen, Session};
