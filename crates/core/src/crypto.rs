//! Password-based encryption of a finished archive.
//!
//! # Envelope Format
//!
//! ```text
//! +-----------+---------+---------------------------+
//! | salt (16) | iv (16) | AES-256-CBC ciphertext    |
//! +-----------+---------+---------------------------+
//! ```
//!
//! The key is PBKDF2-HMAC-SHA256 over the password and salt with
//! [`KDF_ITERATIONS`] rounds. Plaintext is PKCS#7 padded, so the ciphertext is
//! always a non-empty multiple of the block size.
//!
//! CBC has no authentication: a wrong password is detected only through the
//! padding check here, and through archive parsing and the integrity trailer
//! one layer up.

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;

use crate::error::{CryptoError, Result};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

pub const SALT_LEN: usize = 16;
pub const IV_LEN: usize = 16;
pub const KEY_LEN: usize = 32;
pub const BLOCK_LEN: usize = 16;
pub const KDF_ITERATIONS: u32 = 100_000;

/// Smallest valid envelope: salt, IV and one padded block.
pub const MIN_ENVELOPE_LEN: usize = SALT_LEN + IV_LEN + BLOCK_LEN;

/// Derive the 256-bit cipher key for `password` and `salt`.
pub fn derive_key(password: &str, salt: &[u8]) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, KDF_ITERATIONS, &mut key);
    key
}

/// Encrypt `plain` under `password` with a fresh random salt and IV.
///
/// An empty password is accepted and still encrypts.
pub fn encrypt(plain: &[u8], password: &str) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    let mut salt = [0u8; SALT_LEN];
    let mut iv = [0u8; IV_LEN];
    rng.fill_bytes(&mut salt);
    rng.fill_bytes(&mut iv);

    let key = derive_key(password, &salt);
    let ciphertext =
        Aes256CbcEnc::new(&key.into(), &iv.into()).encrypt_padded_vec_mut::<Pkcs7>(plain);

    let mut out = Vec::with_capacity(SALT_LEN + IV_LEN + ciphertext.len());
    out.extend_from_slice(&salt);
    out.extend_from_slice(&iv);
    out.extend_from_slice(&ciphertext);
    out
}

/// Decrypt an envelope produced by [`encrypt`].
///
/// # Errors
/// - `CryptoError::Truncated` if the input is shorter than salt, IV and one
///   block, or the ciphertext is not block-aligned
/// - `CryptoError::BadPadding` if the padding check fails (wrong password or
///   corrupted ciphertext)
pub fn decrypt(data: &[u8], password: &str) -> Result<Vec<u8>> {
    if data.len() < MIN_ENVELOPE_LEN || (data.len() - SALT_LEN - IV_LEN) % BLOCK_LEN != 0 {
        return Err(CryptoError::Truncated { len: data.len() }.into());
    }

    let (salt, rest) = data.split_at(SALT_LEN);
    let (iv, ciphertext) = rest.split_at(IV_LEN);

    let key = derive_key(password, salt);
    let mut iv_block = [0u8; IV_LEN];
    iv_block.copy_from_slice(iv);

    Aes256CbcDec::new(&key.into(), &iv_block.into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| CryptoError::BadPadding.into())
}
