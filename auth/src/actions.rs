//! Session actions.

use crate::state::User;

/// Mutations of the client-side session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Replace the stored user (`None` clears it).
    SetUser {
        /// New user
        user: Option<User>,
    },

    /// Replace the authenticated flag.
    SetAuthenticated {
        /// New flag
        status: bool,
    },

    /// Clear the user and the flag.
    Logout,
}
