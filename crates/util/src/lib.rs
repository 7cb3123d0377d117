//! Shared helpers for the Arazzo engine workspace.
//!
//! Currently: RFC 6901 JSON-Pointer traversal over value trees and the
//! retry-delay conversion used by failure actions.

pub mod duration;
pub mod pointer;

pub use duration::retry_after_duration;
pub use pointer::{escape_token, resolve_pointer, set_pointer, unescape_token};
