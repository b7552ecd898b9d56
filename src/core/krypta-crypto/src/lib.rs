//! # Krypta Crypto
//!
//! The encryption boundary of the Krypta key store.
//!
//! Key material is encrypted before it touches storage and decrypted on the
//! way back out; nothing outside this crate sees both the cipher key and the
//! plaintext. This crate provides:
//! - [`KeysetCipher`], the capability consumed by the key store manager
//! - [`Aes256GcmCipher`], the default AES-256-GCM implementation
//! - [`SymmetricKey`], a zeroize-on-drop key wrapper

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cipher;
pub mod error;
pub mod keys;
pub mod random;

pub use cipher::{Aes256GcmCipher, KeysetCipher};
pub use error::CryptoError;
pub use keys::SymmetricKey;
