//! Item marshaling.
//!
//! Turns domain objects into their stored representation: the serde-encoded
//! attributes of the object, merged with the non-empty key slots from its
//! [`Keyer`] implementation and, when declared, the entity-type attribute.

use aws_sdk_dynamodb::types::AttributeValue;
use serde::Serialize;
use serde_dynamo::aws_sdk_dynamodb_1::to_item;

use crate::entity_type::ENTITY_TYPE_ATTRIBUTE;
use crate::error::{Error, Result};
use crate::keys::{Keyer, Keys};
use crate::wire::Item;

/// Marshals an item into its DynamoDB representation.
///
/// Key slot values always win over same-named data attributes. Empty key
/// slots are never written.
pub fn marshal_item<T>(item: &T) -> Result<Item>
where
    T: Keyer + Serialize + ?Sized,
{
    let keys = item.keys()?;

    let mut attrs: Item = to_item(item).map_err(|e| Error::Serialization(e.to_string()))?;

    for (name, value) in keys.named_slots() {
        attrs.insert(name.to_string(), AttributeValue::S(value.to_string()));
    }

    if let Some(entity_type) = item.entity_type() {
        attrs.insert(
            ENTITY_TYPE_ATTRIBUTE.to_string(),
            AttributeValue::S(entity_type.to_string()),
        );
    }

    Ok(attrs)
}

/// Returns the primary-key attributes (`PK`/`SK`) for a set of key slots.
pub(crate) fn primary_key(keys: &Keys) -> Item {
    Item::from([
        ("PK".to_string(), AttributeValue::S(keys.pk.clone())),
        ("SK".to_string(), AttributeValue::S(keys.sk.clone())),
    ])
}

/// Object-safe capability for items that can be written to the table.
///
/// Blanket-implemented for any [`Keyer`] that is also [`Serialize`], so
/// pending writes of mixed concrete types can be boxed together by the
/// transaction builder.
pub trait Storable: Keyer {
    /// Marshals the item into its stored representation.
    fn marshal(&self) -> Result<Item>;
}

impl<T> Storable for T
where
    T: Keyer + Serialize,
{
    fn marshal(&self) -> Result<Item> {
        marshal_item(self)
    }
}
