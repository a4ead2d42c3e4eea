//! Self-contained encrypted cursors.
//!
//! An alternative to the [`Tokenizer`](crate::Tokenizer) path for callers
//! who want server-independent cursors: the continuation point is sealed
//! with a caller-held AES-256-GCM secret, so no server-side key lookup is
//! needed to resume. Wrapping the cursor in a dedicated type also keeps
//! user-supplied tokens out of database queries until they have been
//! authenticated and decrypted.

use std::fmt;

use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::Aes256Gcm;
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use rand::RngCore;

use crate::error::{Error, Result};

/// AES-256 key length in bytes.
pub const SECRET_LEN: usize = 32;

const NONCE_LEN: usize = 12;

/// A caller-held symmetric secret for sealing cursors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationSecret {
    pub value: Vec<u8>,
}

impl PaginationSecret {
    /// Generates a fresh 32-byte AES-256 key from the OS random source.
    pub fn generate() -> Self {
        let mut key = vec![0u8; SECRET_LEN];
        rand::rng().fill_bytes(&mut key);
        Self { value: key }
    }

    fn cipher(&self) -> Result<Aes256Gcm> {
        if self.value.len() != SECRET_LEN {
            return Err(Error::Config(format!(
                "pagination secret must be {SECRET_LEN} bytes, got {}",
                self.value.len()
            )));
        }
        Ok(Aes256Gcm::new(GenericArray::from_slice(&self.value)))
    }
}

/// The store's continuation point: the primary key of the last item
/// returned by a partial scan.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Cursor {
    pub pk: String,
    pub sk: String,
}

impl fmt::Display for Cursor {
    /// The plaintext cursor layout: `PK:SK`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.pk, self.sk)
    }
}

impl Cursor {
    pub fn new(pk: impl Into<String>, sk: impl Into<String>) -> Self {
        Self {
            pk: pk.into(),
            sk: sk.into(),
        }
    }

    /// Seals the cursor with the provided secret.
    ///
    /// The payload is `base64url(nonce || seal(nonce, "PK:SK"))` with a
    /// random 12-byte nonce.
    pub fn encrypt(&self, secret: &PaginationSecret) -> Result<String> {
        let cipher = secret.cipher()?;

        let mut nonce = [0u8; NONCE_LEN];
        rand::rng().fill_bytes(&mut nonce);

        let ciphertext = cipher
            .encrypt(GenericArray::from_slice(&nonce), self.to_string().as_bytes())
            .map_err(|e| Error::Token(format!("cursor encryption failed: {e}")))?;

        let mut payload = nonce.to_vec();
        payload.extend_from_slice(&ciphertext);
        Ok(URL_SAFE.encode(payload))
    }

    /// Opens a sealed cursor.
    ///
    /// A tampered or truncated token fails with [`Error::Decode`]; it can
    /// never silently resume from a wrong position.
    pub fn decrypt(token: &str, secret: &PaginationSecret) -> Result<Self> {
        let cipher = secret.cipher()?;

        let payload = URL_SAFE
            .decode(token)
            .map_err(|e| Error::Decode(format!("cursor is not valid base64: {e}")))?;

        if payload.len() < NONCE_LEN {
            return Err(Error::Decode("cursor payload is too short".to_string()));
        }

        let (nonce, ciphertext) = payload.split_at(NONCE_LEN);
        let plaintext = cipher
            .decrypt(GenericArray::from_slice(nonce), ciphertext)
            .map_err(|_| Error::Decode("cursor authentication failed".to_string()))?;

        let plaintext = String::from_utf8(plaintext)
            .map_err(|_| Error::Decode("cursor plaintext is not valid UTF-8".to_string()))?;

        let parts: Vec<&str> = plaintext.split(':').collect();
        if parts.len() != 2 {
            return Err(Error::Decode(
                "expected cursor to be PRIMARY_KEY:SORT_KEY format".to_string(),
            ));
        }

        Ok(Self {
            pk: parts[0].to_string(),
            sk: parts[1].to_string(),
        })
    }
}
