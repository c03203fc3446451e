//! Domain services used by the HTML and JSON routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own validation, scoring and the remote collaborators
//! (auth, document store, email) so route handlers can stay focused on
//! request parsing, cookies and rendering.

pub mod auth;
pub mod catalog;
pub mod charts;
pub mod laboratories;
pub mod notify;
pub mod scraper;
pub mod search;
pub mod session;
pub mod stats;
pub mod store;
pub mod submission;
