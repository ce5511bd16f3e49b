//! arc-crypto: per-recipient hybrid encryption for arc letters
//!
//! Architecture: one fresh RSA keypair and one fresh AES session key per
//! recipient per send. Nothing is shared between recipients.
//!
//! Pipeline: payload → PKCS#7 pad → AES-256-CBC → container, session key → RSA-OAEP wrap
//!
//! Container layout:
//! ```text
//! [16 bytes: IV][k bytes: RSA-OAEP(SHA-256) wrapped session key][N*16 bytes: AES-256-CBC ciphertext]
//! k = modulus size in bytes (256 for RSA-2048)
//! ```
//!
//! The container does not record `k`; the decrypting private key supplies it.
//!
//! Private keys are persisted as PKCS#8 PEM. By default they are written
//! unencrypted, which leaves the key readable by anyone with access to the
//! key directory. [`KeyProtection::Passphrase`] opts into encrypted PKCS#8.

pub mod envelope;
pub mod keys;
pub mod store;

pub use arc_core::config::KeySize;
pub use envelope::{decrypt, encrypt, ContainerLayout};
pub use keys::{generate_keypair, generate_session_key, unwrap_key, wrap_key, SessionKey};
pub use rsa::{RsaPrivateKey, RsaPublicKey};
pub use store::{
    container_file_name, is_encrypted_key, key_path, read_container, read_private_key,
    store_private_key, write_container, write_private_key, KeyProtection,
};

/// Size of an AES-256 session key in bytes
pub const KEY_SIZE: usize = 32;

/// Size of an AES-CBC initialization vector
pub const IV_SIZE: usize = 16;

/// AES block size; ciphertext length is always a multiple of this
pub const BLOCK_SIZE: usize = 16;

/// Output length of SHA-256, the OAEP hash
pub(crate) const OAEP_HASH_SIZE: usize = 32;
