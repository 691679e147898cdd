//! Error types for the rx_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for rx_core operations
///
/// Every ledger operation returns one of these as a value; nothing here is
/// fatal to the process.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Operation called with the wrong number of arguments
    #[error("Incorrect number of arguments for {operation}. Expecting {expected}, got {actual}")]
    InvalidArgumentCount {
        operation: String,
        expected: usize,
        actual: usize,
    },

    /// Dosage argument is not an integer
    #[error("Dosage must be a numeric string, got {0:?}")]
    InvalidDosageFormat(String),

    /// Init argument is not an integer
    #[error("Expecting integer value for asset holding, got {0:?}")]
    InvalidAssetValue(String),

    /// No record stored under the prescription id
    #[error("Prescription {0} not found. This is not a legitimate prescription.")]
    PrescriptionNotFound(String),

    /// Double-fill attempt
    #[error("Prescription {id} was previously filled by {pharmacist}. This is a double fill attempt.")]
    AlreadyFilled { id: String, pharmacist: String },

    /// Fill attempted without naming a pharmacist
    #[error("Prescription {0} cannot be filled without a pharmacist")]
    MissingPharmacist(String),

    /// Ledger rejected a write
    #[error("Failed to write {key:?} to the ledger: {reason}")]
    StoreWrite { key: String, reason: String },

    /// Ledger failed to serve a read
    #[error("Failed to read {key:?} from the ledger: {reason}")]
    StoreRead { key: String, reason: String },

    /// Registry entry exists but cannot be read or decoded
    #[error("Failed to get prescription registry: {0}")]
    RegistryRead(String),

    /// Record store holds a prescription the registry does not
    #[error("Prescription {0} not found in the registry")]
    RegistryEntryNotFound(String),

    /// Stored record bytes do not decode as a prescription
    #[error("Corrupt record under {key:?}: {reason}")]
    CorruptRecord { key: String, reason: String },

    /// Dispatch received an operation name it does not route
    #[error("Received unknown function invocation: {0}")]
    UnknownOperation(String),

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn arity(operation: &str, expected: usize, actual: usize) -> Self {
        Error::InvalidArgumentCount {
            operation: operation.to_string(),
            expected,
            actual,
        }
    }

    pub(crate) fn store_write(key: &str, err: impl std::fmt::Display) -> Self {
        Error::StoreWrite {
            key: key.to_string(),
            reason: err.to_string(),
        }
    }

    pub(crate) fn store_read(key: &str, err: impl std::fmt::Display) -> Self {
        Error::StoreRead {
            key: key.to_string(),
            reason: err.to_string(),
        }
    }
}
