//! Query access patterns.
//!
//! A [`QueryBuilder`] declares a query intent: how to build the wire
//! request, and which of three targets the result rows land on. The three
//! tiers, in strict precedence order, are:
//!
//! 1. a custom unmarshal hook ([`QueryBuilder::unmarshal_query_response`]),
//!    for access patterns that mix row types in one response;
//! 2. a designated results field ([`QueryBuilder::results`]), the common
//!    case for parameterized queries;
//! 3. the builder itself as the container ([`QueryBuilder::set_rows`]), for
//!    intents that are bare row collections.
//!
//! When writing a new access pattern you should always implement
//! integration tests for it against a live DynamoDB table.

use serde::de::DeserializeOwned;

use crate::error::Result;
use crate::wire::{QueryRequest, QueryResponse};

/// A declared query access pattern.
pub trait QueryBuilder: Send {
    /// The row type results decode into.
    type Row: DeserializeOwned + Send;

    /// Builds the wire request from the builder's own field values.
    ///
    /// Builders don't necessarily know which table the client uses; the
    /// engine overrides the request's table name after this call.
    fn build_query(&self) -> Result<QueryRequest>;

    /// Tier 1: take over unmarshaling of the raw response entirely.
    ///
    /// Returning `Some` short-circuits dispatch; the inner result is
    /// returned to the caller verbatim and no row decoding happens.
    fn unmarshal_query_response(&mut self, _response: &QueryResponse) -> Option<Result<()>> {
        None
    }

    /// Tier 2: the designated results field, if the builder has one.
    fn results(&mut self) -> Option<&mut Vec<Self::Row>> {
        None
    }

    /// Tier 3: replace the builder's own contents with the decoded rows.
    ///
    /// The default declines, failing dispatch with
    /// [`Error::Unaddressable`](crate::Error::Unaddressable) when neither
    /// higher tier applies.
    fn set_rows(&mut self, _rows: Vec<Self::Row>) -> Result<()> {
        Err(crate::error::Error::Unaddressable)
    }
}

/// Options applied to a single query call.
#[derive(Debug, Default, Clone)]
pub struct QueryOptions {
    /// Opaque page token from a previous [`QueryResult::next_page`];
    /// decoded into the request's exclusive start key.
    pub page: Option<String>,
    /// Caps the number of returned rows.
    pub limit: Option<i32>,
}

impl QueryOptions {
    /// Options resuming from the given page token.
    pub fn page(token: impl Into<String>) -> Self {
        Self {
            page: Some(token.into()),
            ..Default::default()
        }
    }
}

/// The outcome of a query call.
#[derive(Debug, Clone)]
pub struct QueryResult {
    /// The raw response. Usually not needed, as rows are dispatched onto
    /// the query builder.
    pub response: QueryResponse,
    /// Opaque token for the next page; empty when the scan is exhausted.
    pub next_page: String,
}
