use thiserror::Error;

use crate::core::loop_state::RunState;

#[derive(Debug, Error)]
pub enum OrbitError {
    /// A loop command that does not apply to the current run state.
    #[error("Cannot {action} a loop that is {from}")]
    InvalidTransition { action: &'static str, from: RunState },

    #[error("Store error: {0}")]
    Store(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Out of range: {0}")]
    OutOfRange(String),

    /// A marker id prefix matched nothing.
    #[error("No marker matches {0:?}")]
    MarkerNotFound(String),

    /// A marker id prefix matched more than one marker.
    #[error("Marker id {prefix:?} is ambiguous: {}", .ids.join(", "))]
    AmbiguousMarker { prefix: String, ids: Vec<String> },

    /// The notification collaborator could not display a firing.
    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, OrbitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_transition_message() {
        let err = OrbitError::InvalidTransition {
            action: "pause",
            from: RunState::Idle,
        };
        assert_eq!(err.to_string(), "Cannot pause a loop that is idle");
    }

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "loop.org");
        let err: OrbitError = io_err.into();
        assert!(matches!(err, OrbitError::Io(_)));
        assert!(err.to_string().contains("loop.org"));
    }

    #[test]
    fn json_error_converts() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: OrbitError = json_err.into();
        assert!(matches!(err, OrbitError::Json(_)));
    }
}
