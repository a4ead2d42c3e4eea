//! Entity-type labels for heterogeneous collections.
//!
//! When a [`Keyer`](crate::Keyer) reports an entity type, the marshaled item
//! carries a `ddb:type` attribute naming it. Queries that return multiple
//! item types in one collection (for example an invoice alongside its line
//! items) can read the label back to decide how to decode each row.

use crate::error::{Error, Result};
use crate::wire::Item;

/// Attribute holding the entity-type label.
pub const ENTITY_TYPE_ATTRIBUTE: &str = "ddb:type";

/// Reads the entity-type label from a raw item.
///
/// Returns [`Error::NoEntityType`] if the attribute is missing or is not a
/// string.
pub fn item_entity_type(item: &Item) -> Result<String> {
    item.get(ENTITY_TYPE_ATTRIBUTE)
        .and_then(|value| value.as_s().ok())
        .cloned()
        .ok_or(Error::NoEntityType)
}
