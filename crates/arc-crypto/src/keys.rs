//! Keypair generation, session key generation, RSA-OAEP key wrapping

use arc_core::config::KeySize;
use arc_core::{ArcError, ArcResult};
use rand::RngCore;
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use zeroize::Zeroize;

use crate::{IV_SIZE, KEY_SIZE, OAEP_HASH_SIZE};

/// A per-encryption 256-bit AES key. Zeroized on drop.
pub struct SessionKey {
    bytes: [u8; KEY_SIZE],
}

impl SessionKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for SessionKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Generate a random 256-bit session key.
pub fn generate_session_key() -> SessionKey {
    let mut bytes = [0u8; KEY_SIZE];
    rand::thread_rng().fill_bytes(&mut bytes);
    SessionKey::from_bytes(bytes)
}

/// Generate a random 128-bit IV.
pub fn generate_iv() -> [u8; IV_SIZE] {
    let mut iv = [0u8; IV_SIZE];
    rand::thread_rng().fill_bytes(&mut iv);
    iv
}

/// Generate a fresh RSA keypair (public exponent 65537).
///
/// The public half is meant to wrap exactly one session key and then be
/// dropped; only the private half is persisted.
pub fn generate_keypair(size: KeySize) -> ArcResult<(RsaPrivateKey, RsaPublicKey)> {
    let private_key = RsaPrivateKey::new(&mut rand::thread_rng(), size.bits())
        .map_err(|e| ArcError::Crypto(format!("RSA key generation failed: {e}")))?;
    let public_key = RsaPublicKey::from(&private_key);
    Ok((private_key, public_key))
}

/// Smallest modulus, in bytes, that can OAEP-wrap a session key with SHA-256.
pub const fn min_wrapping_modulus() -> usize {
    KEY_SIZE + 2 * OAEP_HASH_SIZE + 2
}

/// Wrap (encrypt) a session key with RSA-OAEP (MGF1-SHA-256, empty label).
///
/// Output length equals the modulus size in bytes.
pub fn wrap_key(public_key: &RsaPublicKey, session_key: &SessionKey) -> ArcResult<Vec<u8>> {
    let modulus = public_key.size();
    if modulus < min_wrapping_modulus() {
        return Err(ArcError::Crypto(format!(
            "RSA modulus of {modulus} bytes cannot wrap a {KEY_SIZE}-byte key \
             (need at least {})",
            min_wrapping_modulus()
        )));
    }

    public_key
        .encrypt(
            &mut rand::thread_rng(),
            Oaep::new::<Sha256>(),
            session_key.as_bytes(),
        )
        .map_err(|e| ArcError::Crypto(format!("key wrapping failed: {e}")))
}

/// Unwrap (decrypt) a session key with the matching private key.
pub fn unwrap_key(private_key: &RsaPrivateKey, wrapped: &[u8]) -> ArcResult<SessionKey> {
    if wrapped.len() != private_key.size() {
        return Err(ArcError::Crypto(format!(
            "wrapped key is {} bytes, expected {}",
            wrapped.len(),
            private_key.size()
        )));
    }

    let mut plaintext = private_key
        .decrypt(Oaep::new::<Sha256>(), wrapped)
        .map_err(|_| {
            ArcError::Crypto("key unwrapping failed: wrong private key or corrupted data".into())
        })?;

    if plaintext.len() != KEY_SIZE {
        let len = plaintext.len();
        plaintext.zeroize();
        return Err(ArcError::Crypto(format!(
            "unwrapped key has wrong size: {len} bytes (expected {KEY_SIZE})"
        )));
    }

    let mut key_bytes = [0u8; KEY_SIZE];
    key_bytes.copy_from_slice(&plaintext);
    plaintext.zeroize();

    Ok(SessionKey::from_bytes(key_bytes))
}
