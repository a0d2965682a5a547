//! Core types and error handling for modmirror.
//!
//! The error system follows two principles:
//! 1. **Strongly-typed errors** ([`MirrorError`]) for precise handling in code
//! 2. **User-friendly messages** ([`ErrorContext`]) with actionable suggestions
//!    for CLI users

pub mod error;

pub use error::{ErrorContext, MirrorError, user_friendly_error};
