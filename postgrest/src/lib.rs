//! # Todolist PostgREST backend
//!
//! [`PostgrestBackend`] executes the record store's table operations against
//! the hosted database's REST API.
//!
//! | Operation | Request |
//! |-----------|---------|
//! | `select`  | `GET /rest/v1/<table>?select=..&<col>=<op>.<value>&order=..&limit=..` |
//! | `insert`  | `POST /rest/v1/<table>` with `Prefer: return=representation` |
//! | `update`  | `PATCH /rest/v1/<table>?<filters>` with `Prefer: return=representation` |
//! | `delete`  | `DELETE /rest/v1/<table>?<filters>` |
//!
//! Error bodies `{message, code, details, hint}` decode into
//! [`BackendError`](todolist_core::BackendError).

pub mod backend;
pub mod query;

pub use backend::{FETCH_ERROR, PostgrestBackend};
pub use query::{render_filters, render_query};
