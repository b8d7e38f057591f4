//! AES-256-CBC encryption and decryption of state values.
//!
//! **Algorithm:** AES-256 in CBC mode with PKCS#7 padding. CBC carries no
//! authentication tag, so a padding failure on decrypt is the only integrity
//! signal. It is surfaced as [`CipherError::Padding`] and must not be swallowed.
//!
//! **Never reuse an IV with the same key for different plaintexts.** Call
//! [`generate_iv`] for every encryption.

use aes::Aes256;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand_core::{OsRng, RngCore};
use thiserror::Error;

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Byte length of an AES-CBC initialisation vector (one block).
pub const IV_LEN: usize = 16;

/// AES block size in bytes.
pub const BLOCK_LEN: usize = 16;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Errors produced by the cipher layer.
#[derive(Debug, Error)]
pub enum CipherError {
    /// The cipher could not be constructed from the supplied key and IV.
    #[error("cipher initialisation failed: {0}")]
    CipherInit(String),

    /// The padded encryption step failed.
    #[error("cipher update failed")]
    CipherUpdate,

    /// Decrypted padding is malformed: wrong key, wrong IV, or corrupted ciphertext.
    #[error("invalid padding")]
    Padding,

    /// The OS random source could not fill the requested buffer.
    #[error("secure random source unavailable: {0}")]
    RandomSource(String),

    /// Ciphertext is empty or not a whole number of blocks.
    #[error("invalid ciphertext length {0}: must be a non-zero multiple of {BLOCK_LEN}")]
    InvalidCiphertextLength(usize),

    /// An IV of this length cannot be generated.
    #[error("invalid IV length requested: {0}")]
    InvalidIvLength(usize),
}

impl CipherError {
    /// Returns `true` if retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CipherError::RandomSource(_))
    }
}

/// Encrypt `plaintext` with AES-256-CBC and PKCS#7 padding.
///
/// The output is always `16 * (plaintext.len() / 16 + 1)` bytes long. The IV is
/// not included in the output; the caller stores it alongside the ciphertext.
///
/// # Errors
///
/// Returns [`CipherError::CipherInit`] if `key` is not [`KEY_LEN`] bytes or `iv`
/// is not [`IV_LEN`] bytes, and [`CipherError::CipherUpdate`] if padding the
/// final block fails.
pub fn encrypt(plaintext: &[u8], key: &[u8], iv: &[u8]) -> Result<Vec<u8>, CipherError> {
    check_lengths(key, iv)?;
    let cipher = Aes256CbcEnc::new_from_slices(key, iv)
        .map_err(|e| CipherError::CipherInit(e.to_string()))?;

    let mut out = vec![0u8; plaintext.len() + BLOCK_LEN];
    let written = cipher
        .encrypt_padded_b2b_mut::<Pkcs7>(plaintext, &mut out)
        .map_err(|_| CipherError::CipherUpdate)?
        .len();
    out.truncate(written);
    Ok(out)
}

/// Decrypt AES-256-CBC `ciphertext` and strip its PKCS#7 padding.
///
/// # Errors
///
/// Returns [`CipherError::CipherInit`] on a bad key or IV length,
/// [`CipherError::InvalidCiphertextLength`] if `ciphertext` is not a non-zero
/// multiple of [`BLOCK_LEN`], and [`CipherError::Padding`] if the decrypted
/// padding is invalid.
pub fn decrypt(ciphertext: &[u8], key: &[u8], iv: &[u8]) -> Result<Vec<u8>, CipherError> {
    check_lengths(key, iv)?;
    let cipher = Aes256CbcDec::new_from_slices(key, iv)
        .map_err(|e| CipherError::CipherInit(e.to_string()))?;

    if ciphertext.is_empty() || ciphertext.len() % BLOCK_LEN != 0 {
        return Err(CipherError::InvalidCiphertextLength(ciphertext.len()));
    }

    cipher
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| CipherError::Padding)
}

/// Generate `length` bytes of IV material from the OS CSPRNG.
///
/// # Errors
///
/// Returns [`CipherError::InvalidIvLength`] if `length` is zero and
/// [`CipherError::RandomSource`] if the OS source fails. There is no fallback
/// to a weaker generator.
pub fn generate_iv(length: usize) -> Result<Vec<u8>, CipherError> {
    if length == 0 {
        return Err(CipherError::InvalidIvLength(length));
    }
    let mut iv = vec![0u8; length];
    fill_random(&mut OsRng, &mut iv)?;
    Ok(iv)
}

/// Generate a single AES-CBC IV.
///
/// # Errors
///
/// Returns [`CipherError::RandomSource`] if the OS source fails.
pub fn generate_iv16() -> Result<[u8; IV_LEN], CipherError> {
    let mut iv = [0u8; IV_LEN];
    fill_random(&mut OsRng, &mut iv)?;
    Ok(iv)
}

fn fill_random<R: RngCore>(rng: &mut R, buf: &mut [u8]) -> Result<(), CipherError> {
    rng.try_fill_bytes(buf)
        .map_err(|e| CipherError::RandomSource(e.to_string()))
}

fn check_lengths(key: &[u8], iv: &[u8]) -> Result<(), CipherError> {
    if key.len() != KEY_LEN {
        return Err(CipherError::CipherInit(format!(
            "key must be {KEY_LEN} bytes, got {}",
            key.len()
        )));
    }
    if iv.len() != IV_LEN {
        return Err(CipherError::CipherInit(format!(
            "iv must be {IV_LEN} bytes, got {}",
            iv.len()
        )));
    }
    Ok(())
}
