//! Result dispatch.
//!
//! Routes a raw query response onto its builder through the three-tier
//! precedence declared by [`QueryBuilder`]: custom unmarshal hook, then
//! designated results field, then the builder itself.

use serde::de::DeserializeOwned;
use serde_dynamo::aws_sdk_dynamodb_1::from_item;

use crate::error::{Error, Result};
use crate::query::QueryBuilder;
use crate::wire::QueryResponse;

/// Delivers a query response to the builder that produced the request.
///
/// The custom hook is consulted before any row decoding, so a builder that
/// takes over unmarshaling never pays for (or fails on) the default
/// deserialization path.
pub(crate) fn dispatch<Q: QueryBuilder>(qb: &mut Q, response: &QueryResponse) -> Result<()> {
    if let Some(result) = qb.unmarshal_query_response(response) {
        return result;
    }

    let rows = decode_rows::<Q::Row>(response)?;

    if let Some(results) = qb.results() {
        *results = rows;
        return Ok(());
    }

    qb.set_rows(rows)
}

/// Decodes every response item into the builder's row type.
pub(crate) fn decode_rows<R: DeserializeOwned>(response: &QueryResponse) -> Result<Vec<R>> {
    response
        .items
        .iter()
        .map(|item| from_item(item.clone()).map_err(|e| Error::Decode(e.to_string())))
        .collect()
}
