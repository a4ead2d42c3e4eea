//! Pagination-token codecs.
//!
//! A [`Tokenizer`] turns the store's continuation key into an opaque string
//! callers can hand back to resume a scan, and reverses it on the way in.
//! The contract is `decode(encode(m)) == m` for every valid key map,
//! including the empty map, which round-trips as the empty string.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{Error, Result};
use crate::wire::Item;

/// A continuation key: key attribute name to string value.
///
/// Key attributes in this key scheme are always strings.
pub type KeyMap = HashMap<String, String>;

/// Encodes and decodes opaque pagination tokens.
#[async_trait]
pub trait Tokenizer: Send + Sync {
    /// Encodes a continuation key as an opaque token. The empty map encodes
    /// to the empty string.
    async fn encode(&self, key: &KeyMap) -> Result<String>;

    /// Decodes an opaque token back into a continuation key. The empty
    /// string decodes to the empty map.
    async fn decode(&self, token: &str) -> Result<KeyMap>;
}

/// Plain JSON token codec. Reversible, no confidentiality.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonTokenizer;

#[async_trait]
impl Tokenizer for JsonTokenizer {
    async fn encode(&self, key: &KeyMap) -> Result<String> {
        if key.is_empty() {
            return Ok(String::new());
        }
        serde_json::to_string(key).map_err(|e| Error::Token(format!("failed to encode page token: {e}")))
    }

    async fn decode(&self, token: &str) -> Result<KeyMap> {
        if token.is_empty() {
            return Ok(KeyMap::new());
        }
        serde_json::from_str(token).map_err(|e| Error::Token(format!("failed to decode page token: {e}")))
    }
}

/// An external envelope-encryption service.
///
/// The encrypted tokenizer delegates confidentiality to this boundary; any
/// service failure surfaces as [`Error::Token`].
#[async_trait]
pub trait EncryptionService: Send + Sync {
    async fn encrypt(&self, plaintext: Vec<u8>) -> Result<Vec<u8>>;
    async fn decrypt(&self, ciphertext: Vec<u8>) -> Result<Vec<u8>>;
}

/// Envelope encryption backed by AWS KMS.
#[derive(Debug, Clone)]
pub struct KmsEncryptionService {
    client: aws_sdk_kms::Client,
    key_id: String,
}

impl KmsEncryptionService {
    pub fn new(client: aws_sdk_kms::Client, key_id: impl Into<String>) -> Self {
        Self {
            client,
            key_id: key_id.into(),
        }
    }

    /// Creates a service using the default AWS credential chain.
    pub async fn from_env(key_id: impl Into<String>) -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(aws_sdk_kms::Client::new(&config), key_id)
    }
}

#[async_trait]
impl EncryptionService for KmsEncryptionService {
    async fn encrypt(&self, plaintext: Vec<u8>) -> Result<Vec<u8>> {
        let output = self
            .client
            .encrypt()
            .key_id(&self.key_id)
            .plaintext(aws_sdk_kms::primitives::Blob::new(plaintext))
            .send()
            .await
            .map_err(|e| Error::Token(format!("KMS encrypt failed: {e}")))?;

        output
            .ciphertext_blob
            .map(|blob| blob.into_inner())
            .ok_or_else(|| Error::Token("KMS encrypt returned no ciphertext".to_string()))
    }

    async fn decrypt(&self, ciphertext: Vec<u8>) -> Result<Vec<u8>> {
        let output = self
            .client
            .decrypt()
            .key_id(&self.key_id)
            .ciphertext_blob(aws_sdk_kms::primitives::Blob::new(ciphertext))
            .send()
            .await
            .map_err(|e| Error::Token(format!("KMS decrypt failed: {e}")))?;

        output
            .plaintext
            .map(|blob| blob.into_inner())
            .ok_or_else(|| Error::Token("KMS decrypt returned no plaintext".to_string()))
    }
}

/// Token codec that encrypts the JSON key map through an external
/// [`EncryptionService`] and base64-encodes the ciphertext for transport.
#[derive(Clone)]
pub struct EnvelopeTokenizer {
    service: Arc<dyn EncryptionService>,
}

impl EnvelopeTokenizer {
    pub fn new(service: Arc<dyn EncryptionService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Tokenizer for EnvelopeTokenizer {
    async fn encode(&self, key: &KeyMap) -> Result<String> {
        if key.is_empty() {
            return Ok(String::new());
        }
        let plaintext = serde_json::to_vec(key)
            .map_err(|e| Error::Token(format!("failed to encode page token: {e}")))?;
        let ciphertext = self.service.encrypt(plaintext).await?;
        Ok(STANDARD.encode(ciphertext))
    }

    async fn decode(&self, token: &str) -> Result<KeyMap> {
        if token.is_empty() {
            return Ok(KeyMap::new());
        }
        let ciphertext = STANDARD
            .decode(token)
            .map_err(|e| Error::Token(format!("page token is not valid base64: {e}")))?;
        let plaintext = self.service.decrypt(ciphertext).await?;
        serde_json::from_slice(&plaintext)
            .map_err(|e| Error::Token(format!("failed to decode page token: {e}")))
    }
}

/// Converts a continuation key to exclusive-start-key attributes.
pub(crate) fn key_map_to_attrs(key: &KeyMap) -> Item {
    key.iter()
        .map(|(name, value)| (name.clone(), AttributeValue::S(value.clone())))
        .collect()
}

/// Converts a last-evaluated-key attribute map into a continuation key.
///
/// Non-string key attributes cannot be represented in a token and fail with
/// [`Error::Token`].
pub(crate) fn attrs_to_key_map(attrs: &Item) -> Result<KeyMap> {
    attrs
        .iter()
        .map(|(name, value)| {
            value
                .as_s()
                .map(|s| (name.clone(), s.clone()))
                .map_err(|_| Error::Token(format!("continuation key attribute {name} is not a string")))
        })
        .collect()
}
