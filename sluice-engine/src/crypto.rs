//! Connection credential store
//!
//! Symmetric encryption of connection configs with AES-256-CBC and a random
//! IV per call. Ciphertext format is `<ivHex>:<encryptedHex>`.
//!
//! The key is derived once from a secret and handed to
//! [`CredentialStore::new`]; there is no process-global key.

use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use rand::RngCore;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};

use crate::error::CredentialError;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

const KEY_LENGTH: usize = 32;
const IV_LENGTH: usize = 16;
const BLOCK_SIZE: usize = 16;

/// AES-256 key derived from a shared secret
#[derive(Clone)]
pub struct CredentialKey([u8; KEY_LENGTH]);

impl CredentialKey {
    /// Key bytes are the first 32 characters of `base64(sha256(secret))`
    pub fn derive(secret: &str) -> Self {
        let encoded = BASE64.encode(Sha256::digest(secret.as_bytes()));
        let mut key = [0u8; KEY_LENGTH];
        key.copy_from_slice(&encoded.as_bytes()[..KEY_LENGTH]);
        Self(key)
    }
}

impl std::fmt::Debug for CredentialKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CredentialKey([REDACTED])")
    }
}

/// Encrypts and decrypts connection configuration blobs
#[derive(Debug, Clone)]
pub struct CredentialStore {
    key: CredentialKey,
}

impl CredentialStore {
    pub fn new(key: CredentialKey) -> Self {
        Self { key }
    }

    pub fn encrypt(&self, plaintext: &str) -> String {
        let mut iv = [0u8; IV_LENGTH];
        rand::rng().fill_bytes(&mut iv);

        let encrypted = Aes256CbcEnc::new(&self.key.0.into(), &iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());

        format!("{}:{}", hex::encode(iv), hex::encode(encrypted))
    }

    pub fn decrypt(&self, ciphertext: &str) -> Result<String, CredentialError> {
        let (iv_hex, body_hex) = ciphertext
            .split_once(':')
            .ok_or_else(|| decryption("missing IV separator"))?;

        let iv: [u8; IV_LENGTH] = hex::decode(iv_hex)
            .map_err(|e| decryption(format!("IV is not valid hex: {e}")))?
            .try_into()
            .map_err(|_| decryption("IV must be 16 bytes"))?;

        let body = hex::decode(body_hex)
            .map_err(|e| decryption(format!("ciphertext is not valid hex: {e}")))?;
        if body.is_empty() || body.len() % BLOCK_SIZE != 0 {
            return Err(decryption("ciphertext length is not a whole number of blocks"));
        }

        let plaintext = Aes256CbcDec::new(&self.key.0.into(), &iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(&body)
            .map_err(|_| decryption("wrong key or corrupted ciphertext"))?;

        String::from_utf8(plaintext).map_err(|_| decryption("wrong key or corrupted ciphertext"))
    }

    /// Serializes `value` to JSON and encrypts it
    pub fn seal<T: Serialize>(&self, value: &T) -> Result<String, CredentialError> {
        let json = serde_json::to_string(value)
            .map_err(|e| CredentialError::InvalidConfig(e.to_string()))?;
        Ok(self.encrypt(&json))
    }

    /// Decrypts a JSON config and deserializes it as `T`
    pub fn open<T: DeserializeOwned>(&self, ciphertext: &str) -> Result<T, CredentialError> {
        let json = self.decrypt(ciphertext)?;
        serde_json::from_str(&json).map_err(|e| CredentialError::InvalidConfig(e.to_string()))
    }
}

fn decryption(message: impl Into<String>) -> CredentialError {
    CredentialError::Decryption(message.into())
}
