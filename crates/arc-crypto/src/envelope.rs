//! Hybrid container encryption/decryption
//!
//! Container format (binary):
//! ```text
//! [16 bytes: random IV][k bytes: RSA-OAEP wrapped session key][AES-256-CBC ciphertext]
//! ```
//!
//! Padding is PKCS#7, so every payload (including the empty one and payloads
//! ending in zero bytes) round-trips exactly, and the ciphertext is always at
//! least one block.

use aes::Aes256;
use arc_core::{ArcError, ArcResult};
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::keys::{generate_iv, generate_session_key, unwrap_key, wrap_key};
use crate::{BLOCK_SIZE, IV_SIZE};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Fixed field lengths of a container for a given RSA modulus size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerLayout {
    wrapped_len: usize,
}

/// A container split into its three fields.
#[derive(Debug)]
pub struct ContainerParts<'a> {
    pub iv: [u8; IV_SIZE],
    pub wrapped_key: &'a [u8],
    pub ciphertext: &'a [u8],
}

impl ContainerLayout {
    pub fn for_modulus(modulus_bytes: usize) -> Self {
        Self {
            wrapped_len: modulus_bytes,
        }
    }

    pub fn for_private_key(private_key: &RsaPrivateKey) -> Self {
        Self::for_modulus(private_key.size())
    }

    pub fn wrapped_len(&self) -> usize {
        self.wrapped_len
    }

    /// Smallest well-formed container: IV, wrapped key, one ciphertext block.
    pub fn min_len(&self) -> usize {
        IV_SIZE + self.wrapped_len + BLOCK_SIZE
    }

    /// Exact container length for a payload of `payload_len` bytes.
    pub fn container_len(&self, payload_len: usize) -> usize {
        IV_SIZE + self.wrapped_len + padded_len(payload_len)
    }

    /// Split a container by the fixed field lengths.
    pub fn split<'a>(&self, container: &'a [u8]) -> ArcResult<ContainerParts<'a>> {
        if container.len() < self.min_len() {
            return Err(ArcError::Crypto(format!(
                "container too short: {} bytes (minimum {})",
                container.len(),
                self.min_len()
            )));
        }

        let (iv_bytes, rest) = container.split_at(IV_SIZE);
        let (wrapped_key, ciphertext) = rest.split_at(self.wrapped_len);

        if ciphertext.len() % BLOCK_SIZE != 0 {
            return Err(ArcError::Crypto(format!(
                "ciphertext length {} is not a multiple of the {BLOCK_SIZE}-byte block size",
                ciphertext.len()
            )));
        }

        let mut iv = [0u8; IV_SIZE];
        iv.copy_from_slice(iv_bytes);

        Ok(ContainerParts {
            iv,
            wrapped_key,
            ciphertext,
        })
    }
}

/// PKCS#7 output length: always adds 1..=16 bytes.
pub fn padded_len(payload_len: usize) -> usize {
    (payload_len / BLOCK_SIZE + 1) * BLOCK_SIZE
}

/// Encrypt `data` for the holder of `public_key`.
///
/// A fresh session key and IV are drawn for every call, so encrypting the
/// same payload twice yields different containers. The session key is
/// zeroized when this returns.
///
/// Returns: `[16-byte IV][wrapped key][ciphertext]`
pub fn encrypt(data: &[u8], public_key: &RsaPublicKey) -> ArcResult<Vec<u8>> {
    let session_key = generate_session_key();
    let iv = generate_iv();

    // Wrap first: an undersized modulus is rejected before any payload work.
    let wrapped = wrap_key(public_key, &session_key)?;

    let ciphertext = Aes256CbcEnc::new(session_key.as_bytes().into(), (&iv).into())
        .encrypt_padded_vec_mut::<Pkcs7>(data);

    let mut result = Vec::with_capacity(IV_SIZE + wrapped.len() + ciphertext.len());
    result.extend_from_slice(&iv);
    result.extend_from_slice(&wrapped);
    result.extend_from_slice(&ciphertext);
    Ok(result)
}

/// Decrypt a container produced by [`encrypt`].
///
/// Fails with a crypto error if the container is truncated or misaligned,
/// if the wrapped key does not open under `private_key`, or if the padding
/// is invalid.
pub fn decrypt(container: &[u8], private_key: &RsaPrivateKey) -> ArcResult<Vec<u8>> {
    let parts = ContainerLayout::for_private_key(private_key).split(container)?;
    let session_key = unwrap_key(private_key, parts.wrapped_key)?;

    Aes256CbcDec::new(session_key.as_bytes().into(), (&parts.iv).into())
        .decrypt_padded_vec_mut::<Pkcs7>(parts.ciphertext)
        .map_err(|_| ArcError::Crypto("payload decryption failed: invalid padding".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::generate_keypair;
    use crate::keys::tests::shared_keypair;
    use crate::KeySize;
    use proptest::prelude::*;

    #[test]
    fn test_hello_world_scenario() {
        let (private_key, public_key) = generate_keypair(KeySize::Rsa2048).unwrap();

        let container = encrypt(b"hello world", &public_key).unwrap();
        // IV (16) + wrapped key (256) + one padded block (16)
        assert_eq!(container.len(), 16 + 256 + 16);

        let decrypted = decrypt(&container, &private_key).unwrap();
        assert_eq!(decrypted, b"hello world");
    }

    #[test]
    fn test_roundtrip_edge_lengths() {
        let (private_key, public_key) = shared_keypair();

        for len in [0usize, 1, 15, 16, 17, 32, 1000] {
            let data: Vec<u8> = (0..len).map(|i| (i * 31) as u8).collect();
            let container = encrypt(&data, public_key).unwrap();
            assert_eq!(
                container.len(),
                ContainerLayout::for_modulus(256).container_len(len)
            );
            assert_eq!(decrypt(&container, private_key).unwrap(), data, "len {len}");
        }
    }

    #[test]
    fn test_trailing_zero_bytes_survive() {
        let (private_key, public_key) = shared_keypair();
        let data = b"ends in zeros\0\0\0".to_vec();

        let container = encrypt(&data, public_key).unwrap();
        assert_eq!(decrypt(&container, private_key).unwrap(), data);
    }

    #[test]
    fn test_encrypt_is_nondeterministic() {
        let (_, public_key) = shared_keypair();

        let c1 = encrypt(b"same input", public_key).unwrap();
        let c2 = encrypt(b"same input", public_key).unwrap();

        assert_ne!(c1, c2);
        assert_ne!(c1[..IV_SIZE], c2[..IV_SIZE], "IVs must differ");
    }

    #[test]
    fn test_tampered_wrapped_key() {
        let (private_key, public_key) = shared_keypair();
        let mut container = encrypt(b"secret data", public_key).unwrap();

        // Flip one bit inside the wrapped-key field
        container[IV_SIZE + 100] ^= 0x01;

        let err = decrypt(&container, private_key).unwrap_err();
        assert!(err.is_crypto(), "tampered wrapped key must fail: {err}");
    }

    #[test]
    fn test_cross_key_rejection() {
        let (_, public_a) = shared_keypair();
        let (private_b, _) = generate_keypair(KeySize::Rsa2048).unwrap();

        let container = encrypt(b"for A only", public_a).unwrap();
        let err = decrypt(&container, &private_b).unwrap_err();
        assert!(err.is_crypto());
    }

    #[test]
    fn test_encrypt_rejects_undersized_key() {
        let private_key = RsaPrivateKey::new(&mut rand::thread_rng(), 512).unwrap();
        let public_key = RsaPublicKey::from(&private_key);

        let err = encrypt(b"hello", &public_key).unwrap_err();
        assert!(err.is_crypto(), "got: {err}");
    }

    #[test]
    fn test_truncated_container() {
        let (private_key, public_key) = shared_keypair();
        let container = encrypt(b"secret data", public_key).unwrap();

        let err = decrypt(&container[..IV_SIZE + 256], private_key).unwrap_err();
        assert!(err.is_crypto());
        assert!(err.to_string().contains("too short"), "got: {err}");
    }

    #[test]
    fn test_misaligned_ciphertext() {
        let (private_key, public_key) = shared_keypair();
        let mut container = encrypt(b"secret data", public_key).unwrap();
        container.push(0);

        let err = decrypt(&container, private_key).unwrap_err();
        assert!(err.is_crypto());
        assert!(err.to_string().contains("multiple"), "got: {err}");
    }

    #[test]
    fn test_layout_split() {
        let layout = ContainerLayout::for_modulus(256);
        let container: Vec<u8> = (0..(16 + 256 + 32)).map(|i| i as u8).collect();

        let parts = layout.split(&container).unwrap();
        assert_eq!(parts.iv, container[..16]);
        assert_eq!(parts.wrapped_key, &container[16..272]);
        assert_eq!(parts.ciphertext.len(), 32);
    }

    #[test]
    fn test_padded_len() {
        assert_eq!(padded_len(0), 16);
        assert_eq!(padded_len(11), 16);
        assert_eq!(padded_len(16), 32);
        assert_eq!(padded_len(17), 32);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn roundtrip_any_payload(data in proptest::collection::vec(any::<u8>(), 0..=2048)) {
            let (private_key, public_key) = shared_keypair();
            let container = encrypt(&data, public_key).unwrap();
            prop_assert_eq!(container.len(), ContainerLayout::for_modulus(256).container_len(data.len()));
            let decrypted = decrypt(&container, private_key).unwrap();
            prop_assert_eq!(decrypted, data);
        }
    }
}
