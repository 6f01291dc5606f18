//! Auth reducers.

pub mod session;

pub use session::SessionReducer;
