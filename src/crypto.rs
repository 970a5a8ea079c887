//! Passphrase envelope for documents at rest.
//!
//! The format is the one OpenSSL `enc` and CryptoJS produce for passphrase
//! encryption: `base64("Salted__" || salt || AES-256-CBC(plaintext))`, with
//! key and IV derived from the passphrase and salt by EVP_BytesToKey (MD5,
//! one round).
//!
//! The passphrase is compiled into the binary, so this hides document
//! contents from casual inspection only. Anyone who can read the binary
//! can decrypt the files.

use aes::Aes256;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use md5::{Digest, Md5};

/// Fixed application passphrase shared with files written by earlier releases
pub const DEFAULT_PASSPHRASE: &str = "your-secret-key-change-this";

const SALT_MAGIC: &[u8; 8] = b"Salted__";
const SALT_LEN: usize = 8;
const KEY_LEN: usize = 32;
const IV_LEN: usize = 16;
const BLOCK_LEN: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("envelope is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("envelope is missing the salt header")]
    MissingHeader,

    #[error("ciphertext length {0} is not a positive multiple of the block size")]
    InvalidLength(usize),

    #[error("invalid key or IV length")]
    InvalidKeyLength,

    #[error("decryption failed (wrong passphrase or corrupt data)")]
    BadPadding,
}

fn derive_key_iv(passphrase: &[u8], salt: &[u8; SALT_LEN]) -> ([u8; KEY_LEN], [u8; IV_LEN]) {
    let mut material = Vec::with_capacity(KEY_LEN + IV_LEN + 16);
    let mut block: Vec<u8> = Vec::new();
    while material.len() < KEY_LEN + IV_LEN {
        let mut hasher = Md5::new();
        hasher.update(&block);
        hasher.update(passphrase);
        hasher.update(salt);
        block = hasher.finalize().to_vec();
        material.extend_from_slice(&block);
    }

    let mut key = [0u8; KEY_LEN];
    let mut iv = [0u8; IV_LEN];
    key.copy_from_slice(&material[..KEY_LEN]);
    iv.copy_from_slice(&material[KEY_LEN..KEY_LEN + IV_LEN]);
    (key, iv)
}

/// Encrypt `plaintext` under `passphrase` with a fresh random salt.
pub fn encrypt(plaintext: &[u8], passphrase: &str) -> Result<String, CryptoError> {
    let salt: [u8; SALT_LEN] = rand::random();
    encrypt_with_salt(plaintext, passphrase, &salt)
}

pub fn encrypt_with_salt(
    plaintext: &[u8],
    passphrase: &str,
    salt: &[u8; SALT_LEN],
) -> Result<String, CryptoError> {
    let (key, iv) = derive_key_iv(passphrase.as_bytes(), salt);
    let ciphertext = cbc::Encryptor::<Aes256>::new_from_slices(&key, &iv)
        .map_err(|_| CryptoError::InvalidKeyLength)?
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext);

    let mut envelope = Vec::with_capacity(SALT_MAGIC.len() + SALT_LEN + ciphertext.len());
    envelope.extend_from_slice(SALT_MAGIC);
    envelope.extend_from_slice(salt);
    envelope.extend_from_slice(&ciphertext);
    Ok(STANDARD.encode(envelope))
}

pub fn decrypt(envelope: &str, passphrase: &str) -> Result<Vec<u8>, CryptoError> {
    let raw = STANDARD.decode(envelope.trim())?;
    if raw.len() < SALT_MAGIC.len() + SALT_LEN || &raw[..SALT_MAGIC.len()] != SALT_MAGIC {
        return Err(CryptoError::MissingHeader);
    }

    let mut salt = [0u8; SALT_LEN];
    salt.copy_from_slice(&raw[SALT_MAGIC.len()..SALT_MAGIC.len() + SALT_LEN]);
    let ciphertext = &raw[SALT_MAGIC.len() + SALT_LEN..];
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_LEN != 0 {
        return Err(CryptoError::InvalidLength(ciphertext.len()));
    }

    let (key, iv) = derive_key_iv(passphrase.as_bytes(), &salt);
    cbc::Decryptor::<Aes256>::new_from_slices(&key, &iv)
        .map_err(|_| CryptoError::InvalidKeyLength)?
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| CryptoError::BadPadding)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Produced by `openssl enc -aes-256-cbc -md md5` with salt 0102030405060708.
    const OPENSSL_VECTOR: &str = "U2FsdGVkX18BAgMEBQYHCEP3EtQLeYI/ZHAgBVn4Ht+yvE3lVUA0VClvNsn90+o1";

    #[test]
    fn test_matches_openssl_envelope() {
        let salt = [1, 2, 3, 4, 5, 6, 7, 8];
        let envelope = encrypt_with_salt(br#"{"theme":"dark"}"#, DEFAULT_PASSPHRASE, &salt).unwrap();
        assert_eq!(envelope, OPENSSL_VECTOR);
        assert_eq!(
            decrypt(OPENSSL_VECTOR, DEFAULT_PASSPHRASE).unwrap(),
            br#"{"theme":"dark"}"#
        );
    }

    #[test]
    fn test_random_salt_changes_ciphertext() {
        let a = encrypt(b"same", DEFAULT_PASSPHRASE).unwrap();
        let b = encrypt(b"same", DEFAULT_PASSPHRASE).unwrap();
        assert_ne!(a, b);
        assert_eq!(decrypt(&a, DEFAULT_PASSPHRASE).unwrap(), b"same");
        assert_eq!(decrypt(&b, DEFAULT_PASSPHRASE).unwrap(), b"same");
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(
            decrypt("not base64!!", DEFAULT_PASSPHRASE),
            Err(CryptoError::Base64(_))
        ));
        assert!(matches!(
            decrypt(&STANDARD.encode(b"plain json"), DEFAULT_PASSPHRASE),
            Err(CryptoError::MissingHeader)
        ));
        let truncated = STANDARD.encode(b"Salted__12345678abc");
        assert!(matches!(
            decrypt(&truncated, DEFAULT_PASSPHRASE),
            Err(CryptoError::InvalidLength(3))
        ));
    }

    #[test]
    fn test_plaintext_not_visible_in_envelope() {
        let envelope = encrypt(b"kick-drum-secret", DEFAULT_PASSPHRASE).unwrap();
        let raw = STANDARD.decode(&envelope).unwrap();
        assert!(!raw.windows(4).any(|w| w == b"kick"));
    }
}
