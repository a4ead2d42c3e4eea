//! Key slots for stored items.
//!
//! The crate is opinionated on key naming: every table uses a `PK`/`SK`
//! primary pair and up to three Global Secondary Index pairs named
//! `GSI1PK`..`GSI3SK`.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Primary and Global Secondary Index (GSI) keys to be used when storing an
/// item.
///
/// Slots left as the empty string are omitted from the stored item; an
/// empty-valued key attribute is never written.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keys {
    #[serde(rename = "PK", default, skip_serializing_if = "String::is_empty")]
    pub pk: String,
    #[serde(rename = "SK", default, skip_serializing_if = "String::is_empty")]
    pub sk: String,
    #[serde(rename = "GSI1PK", default, skip_serializing_if = "String::is_empty")]
    pub gsi1pk: String,
    #[serde(rename = "GSI1SK", default, skip_serializing_if = "String::is_empty")]
    pub gsi1sk: String,
    #[serde(rename = "GSI2PK", default, skip_serializing_if = "String::is_empty")]
    pub gsi2pk: String,
    #[serde(rename = "GSI2SK", default, skip_serializing_if = "String::is_empty")]
    pub gsi2sk: String,
    #[serde(rename = "GSI3PK", default, skip_serializing_if = "String::is_empty")]
    pub gsi3pk: String,
    #[serde(rename = "GSI3SK", default, skip_serializing_if = "String::is_empty")]
    pub gsi3sk: String,
}

impl Keys {
    /// Returns the named slots paired with their stored attribute names,
    /// skipping any slot left empty.
    pub fn named_slots(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        [
            ("PK", self.pk.as_str()),
            ("SK", self.sk.as_str()),
            ("GSI1PK", self.gsi1pk.as_str()),
            ("GSI1SK", self.gsi1sk.as_str()),
            ("GSI2PK", self.gsi2pk.as_str()),
            ("GSI2SK", self.gsi2sk.as_str()),
            ("GSI3PK", self.gsi3pk.as_str()),
            ("GSI3SK", self.gsi3sk.as_str()),
        ]
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
    }
}

/// Keyers give DynamoDB keys to be used when inserting an item.
///
/// The [`Keys`] value is derived, not stored: it is computed fresh on every
/// write.
pub trait Keyer: Send + Sync {
    /// Produces the key slots for this item.
    fn keys(&self) -> Result<Keys>;

    /// Optional entity-type label.
    ///
    /// When `Some`, the marshaled item carries a `ddb:type` attribute naming
    /// the label, so heterogeneous item types can share one logical
    /// collection and be disambiguated on read.
    fn entity_type(&self) -> Option<&'static str> {
        None
    }
}

/// The key of an item to fetch with a point lookup.
///
/// The GetItem API always uses the primary key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetKey {
    pub pk: String,
    pub sk: String,
}

impl GetKey {
    pub fn new(pk: impl Into<String>, sk: impl Into<String>) -> Self {
        Self {
            pk: pk.into(),
            sk: sk.into(),
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.pk.is_empty() || self.sk.is_empty() {
            return Err(Error::Config(
                "GetKey requires both a partition and a sort key".to_string(),
            ));
        }
        Ok(())
    }
}
