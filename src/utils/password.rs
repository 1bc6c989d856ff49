use rand::{Rng, distr::Alphanumeric};
use sha_crypt::{ROUNDS_DEFAULT, Sha256Params, sha256_crypt_b64};
use thiserror::Error;

/// Salt length used for user list passwords
pub const SALT_LENGTH: usize = 5;

#[derive(Error, Debug)]
pub enum PasswordError {
    #[error("invalid salt: {0}")]
    InvalidSalt(String),
    #[error("sha256-crypt failed: {0}")]
    Crypt(String),
}

/// Hash with SHA-256-crypt (`$5$<salt>$<hash>`) under a fresh random salt.
///
/// The result is sent to the proxy as a pre-hashed (`secure_password`) value.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SALT_LENGTH)
        .map(char::from)
        .collect();
    hash_password_with_salt(password, &salt)
}

pub fn hash_password_with_salt(password: &str, salt: &str) -> Result<String, PasswordError> {
    if salt.is_empty() || salt.contains('$') {
        return Err(PasswordError::InvalidSalt(salt.to_string()));
    }
    let params =
        Sha256Params::new(ROUNDS_DEFAULT).map_err(|e| PasswordError::Crypt(format!("{e:?}")))?;
    let hash = sha256_crypt_b64(password.as_bytes(), salt.as_bytes(), &params)
        .map_err(|e| PasswordError::Crypt(format!("{e:?}")))?;
    Ok(format!("$5${salt}${hash}"))
}
