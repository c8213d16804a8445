//! Error types for Casement
//!
//! This module defines all error types used throughout the Casement runtime.
//! Uses `thiserror` for ergonomic error handling with automatic `Display` and
//! `Error` trait implementations.
//!
//! Recoverable failures from action dispatch (unknown windows, validation
//! errors, handler faults) are *not* errors; they travel back to the model
//! as failed [`crate::actions::ActionResult`] values. The variants here cover
//! genuinely exceptional conditions: misconfiguration, model-bridge failures,
//! and exhausted interaction loops.

use thiserror::Error;

/// The primary error type for Casement operations.
#[derive(Error, Debug)]
pub enum CasementError {
    /// Configuration-related errors (invalid config, missing required fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Model bridge failures. The orchestrator normalizes whatever a bridge
    /// raised into this variant, preserving the message.
    #[error("Model error: {0}")]
    Model(String),

    /// Session composition errors (duplicate agent ids, unknown agents, etc.)
    #[error("Session error: {0}")]
    Session(String),

    /// Background task errors (duplicate task ids, runner shut down, etc.)
    #[error("Task error: {0}")]
    Task(String),

    /// The interaction exceeded the bound on consecutive tool-call turns.
    ///
    /// Terminal for that interaction but structured: the caller decides how
    /// to report it. Never raised as a panic.
    #[error("Too many consecutive tool-call turns ({0})")]
    TooManyToolTurns(u32),

    /// Snapshot export/import errors (shape mismatches, unknown agent ids)
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    /// Standard I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Resource not found (agents, windows, tasks, etc.)
    #[error("Not found: {0}")]
    NotFound(String),
}

/// A specialized `Result` type for Casement operations.
pub type Result<T> = std::result::Result<T, CasementError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CasementError::Config("missing model name".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing model name");
    }

    #[test]
    fn test_too_many_tool_turns_display() {
        let err = CasementError::TooManyToolTurns(12);
        assert_eq!(
            err.to_string(),
            "Too many consecutive tool-call turns (12)"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: CasementError = io_err.into();
        assert!(matches!(err, CasementError::Io(_)));
    }

    #[test]
    fn test_error_from_json() {
        let bad = serde_json::from_str::<serde_json::Value>("{not json");
        let err: CasementError = bad.unwrap_err().into();
        assert!(matches!(err, CasementError::Json(_)));
    }

    #[test]
    fn test_result_type() {
        fn returns_result() -> Result<i32> {
            Ok(42)
        }
        assert_eq!(returns_result().unwrap(), 42);
    }

    #[test]
    fn test_error_variants() {
        // Ensure all variants can be created
        let _ = CasementError::Config("test".into());
        let _ = CasementError::Model("test".into());
        let _ = CasementError::Session("test".into());
        let _ = CasementError::Task("test".into());
        let _ = CasementError::TooManyToolTurns(1);
        let _ = CasementError::Snapshot("test".into());
        let _ = CasementError::NotFound("test".into());
    }
}
