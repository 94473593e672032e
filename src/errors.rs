use std::fmt;
use std::error::Error;

/// Represents errors that can occur while setting up or stepping a simulation.
#[derive(Debug, Clone)]
pub enum DynamicsError {
    /// Indicates an invalid mass value (e.g., negative or zero mass).
    InvalidMass,
    /// Indicates an invalid time step value (e.g., negative or zero dt).
    InvalidTime,
    /// Indicates that a collection grew past the capacity of its index type.
    CapacityExceeded,
    /// Indicates that a body index does not refer to a live body.
    BodyNotFound,
    /// A general error for calculations that produce invalid results.
    CalculationError(String),
}

impl fmt::Display for DynamicsError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DynamicsError::InvalidMass => write!(f, "Invalid mass value"),
            DynamicsError::InvalidTime => write!(f, "Invalid time step value"),
            DynamicsError::CapacityExceeded => write!(f, "Collection exceeds index capacity"),
            DynamicsError::BodyNotFound => write!(f, "Body index does not refer to a live body"),
            DynamicsError::CalculationError(msg) => write!(f, "Calculation error: {}", msg),
        }
    }
}

impl Error for DynamicsError {}
