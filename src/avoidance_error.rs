//! Error handling for the obstacle avoidance constraint and its configuration sources

use std::io;

/// Unified error to report failures while configuring, binding or evaluating
/// the obstacle avoidance constraint.
#[derive(Debug)]
pub enum AvoidanceError {
    IoError(io::Error),
    ParseError(String),
    /// Parameter mutation for a link that has never been added.
    UnknownLink(String),
    InvalidParameter { link: String, name: &'static str, value: f64 },
    /// No kinematic sub-chain exists between the chain base and the link.
    SubChainUnavailable { base: String, link: String },
    /// `evaluate` was called before `bind`.
    NotBound,
    /// Binding failed earlier, the constraint cannot produce rows.
    Invalid(String),
    JointCountMismatch { expected: usize, found: usize },
}

impl std::fmt::Display for AvoidanceError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            AvoidanceError::IoError(ref err) =>
                write!(f, "IO Error: {}", err),
            AvoidanceError::ParseError(ref msg) =>
                write!(f, "Parse Error: {}", msg),
            AvoidanceError::UnknownLink(ref link) =>
                write!(f, "Link '{}' is not registered for obstacle avoidance", link),
            AvoidanceError::InvalidParameter { ref link, name, value } =>
                write!(f, "Invalid {} for link '{}': {}", name, link, value),
            AvoidanceError::SubChainUnavailable { ref base, ref link } =>
                write!(f, "No kinematic chain between links '{}' and '{}'", base, link),
            AvoidanceError::NotBound =>
                write!(f, "Obstacle avoidance constraint is not bound to a kinematic chain"),
            AvoidanceError::Invalid(ref reason) =>
                write!(f, "Obstacle avoidance constraint is invalid: {}", reason),
            AvoidanceError::JointCountMismatch { expected, found } =>
                write!(f, "Joint count mismatch: expected {}, found {}", expected, found),
        }
    }
}

impl std::error::Error for AvoidanceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AvoidanceError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for AvoidanceError {
    fn from(err: io::Error) -> Self {
        AvoidanceError::IoError(err)
    }
}
