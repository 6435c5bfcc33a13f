//! Client-side session state, modeled as explicit transitions.
//!
//! Each interaction computes the next state value from the current one
//! and passes it forward; there is no process-wide mutable flag. The
//! state is transient: it resets on logout and on process restart.

/// Which screen the shell is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Signup,
    /// Two-pane workspace: code input, markdown output.
    Workspace,
}

/// Transient session state held by the client process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub authenticated: bool,
    pub user: Option<String>,
    pub screen: Screen,
}

impl Session {
    /// The state at process start: unauthenticated, on the login form.
    pub fn new() -> Self {
        Self {
            authenticated: false,
            user: None,
            screen: Screen::Login,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of a shell interaction that can change session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Signup succeeded — the user must still log in.
    SignupSucceeded,
    LoginSucceeded { username: String },
    /// A failed signup or login keeps the user on the current form.
    AuthFailed,
    LoggedOut,
    SwitchToSignup,
    SwitchToLogin,
}

/// Compute the next session state for an event. Pure: the caller owns
/// both states and re-renders from the returned one.
pub fn next(current: &Session, event: Event) -> Session {
    match event {
        Event::SignupSucceeded => Session {
            authenticated: false,
            user: None,
            screen: Screen::Login,
        },
        Event::LoginSucceeded { username } => Session {
            authenticated: true,
            user: Some(username),
            screen: Screen::Workspace,
        },
        Event::AuthFailed => Session {
            authenticated: false,
            user: None,
            screen: current.screen,
        },
        Event::LoggedOut => Session::new(),
        Event::SwitchToSignup => Session {
            screen: Screen::Signup,
            ..current.clone()
        },
        Event::SwitchToLogin => Session {
            screen: Screen::Login,
            ..current.clone()
        },
    }
}

// ── Tests ───────────────────────────────────────────────────────────
