//! HTTP layer for the generative language API.
//!
//! URL construction and response checking live in [`common`]; the
//! reqwest-backed [`HttpTransport`] wires them into the [`crate::Transport`]
//! seam.

pub(crate) mod common;
mod transport;

pub use transport::HttpTransport;
