use thiserror::Error;

use crate::matrix::StorageType;

// Unified error type for nsgs

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NsError {
    #[error("unsupported matrix storage format: {0:?}")]
    UnsupportedStorageFormat(StorageType),
    #[error("allocation of {requested} doubles failed")]
    AllocationFailure { requested: usize },
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("contact {contact} out of range (problem has {contacts} contacts)")]
    ContactOutOfRange { contact: usize, contacts: usize },
    #[error("no diagonal block stored for block row {0}")]
    MissingDiagonalBlock(usize),
    #[error("invalid sparsity pattern: {0}")]
    InvalidPattern(String),
    #[error("{0} problems carry no per-contact coefficients")]
    UnexpectedCoefficients(&'static str),
    #[error("toolkit capability `{0}` is not bound")]
    MissingCapability(&'static str),
    #[error("invalid solver option: {0}")]
    InvalidOption(String),
    #[error("QP solver error: {0}")]
    QpFailure(String),
}
