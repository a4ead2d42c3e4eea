use thiserror::Error;

/// Errors returned by the access layer.
///
/// Every failure surfaces to the immediate caller unmodified; the only
/// defined defaulting is the empty-token / empty-continuation round trip,
/// which is not an error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// A query builder could not produce a wire request.
    #[error("Failed to build query: {0}")]
    Build(String),
    /// A pagination token could not be encoded or decoded.
    #[error("Pagination token error: {0}")]
    Token(String),
    /// A wire-level DynamoDB failure.
    #[error("Store error: {0}")]
    Store(String),
    /// Result rows or a cursor payload did not match the expected shape.
    #[error("Decode error: {0}")]
    Decode(String),
    /// Dispatch needed to write results into the query builder, but the
    /// builder exposes no writable target.
    #[error("query builder exposes no results target; implement results() or set_rows()")]
    Unaddressable,
    /// Batch size outside the permitted `1..=25` range.
    #[error("Invalid batch size {0}: must be between 1 and 25")]
    InvalidBatchSize(usize),
    /// A required dependency or configuration input is missing.
    #[error("Configuration error: {0}")]
    Config(String),
    /// A lookup that expected at least one item found none.
    #[error("item query returned no items")]
    NoItems,
    /// The item does not carry an entity-type attribute.
    #[error("item has no ddb:type attribute")]
    NoEntityType,
    /// An object could not be serialized into its item representation.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// The compiled transaction exceeds DynamoDB's atomic write cap.
    #[error("Transaction has {0} items, exceeding the limit of 100")]
    TransactionTooLarge(usize),
}

/// Result type for access-layer operations.
pub type Result<T> = std::result::Result<T, Error>;
