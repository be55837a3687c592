/// Passcode hashing module using Argon2id
///
/// Staff passcodes are never stored or compared in plaintext. Every stored
/// credential is an Argon2id PHC string and verification goes through
/// [`verify_password`], which compares in constant time.
///
/// # Parameters
///
/// - **Algorithm**: Argon2id
/// - **Memory**: 64 MB (65536 KB)
/// - **Iterations**: 3 passes
/// - **Parallelism**: 4 lanes
/// - **Output**: 32-byte hash
///
/// # Example
///
/// ```
/// use monume_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("ori3")?;
///
/// assert!(verify_password("ori3", &hash)?);
/// assert!(!verify_password("wrong", &hash)?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder, Version,
};
use std::sync::OnceLock;

/// Shortest passcode accepted when creating or rotating credentials
pub const MIN_PASSCODE_LENGTH: usize = 4;

/// Longest passcode accepted (bounds hashing cost per request)
pub const MAX_PASSCODE_LENGTH: usize = 128;

/// Error type for password hashing operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashError(String),

    /// Failed to verify password
    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    /// Invalid password hash format
    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),
}

fn argon2_instance() -> Result<Argon2<'static>, PasswordError> {
    let params = ParamsBuilder::new()
        .m_cost(65536) // 64 MB
        .t_cost(3)
        .p_cost(4)
        .output_len(32)
        .build()
        .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

    Ok(Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params))
}

/// Hashes a passcode using Argon2id with a fresh random salt
///
/// # Returns
///
/// PHC string format hash, e.g.
/// ```text
/// $argon2id$v=19$m=65536,t=3,p=4$c2FsdHNhbHRzYWx0$hash...
/// ```
///
/// # Errors
///
/// Returns `PasswordError::HashError` if hashing fails
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let password_hash = argon2_instance()?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(format!("Hash generation failed: {}", e)))?;

    Ok(password_hash.to_string())
}

/// Verifies a passcode against a stored hash
///
/// Returns `Ok(false)` for a wrong passcode and an error only when the
/// stored hash itself is unusable.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| PasswordError::InvalidHash(format!("Failed to parse hash: {}", e)))?;

    // Parameters are embedded in the hash
    let argon2 = Argon2::default();

    match argon2.verify_password(password.as_bytes(), &parsed_hash) {
        Ok(_) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(format!("Verification failed: {}", e))),
    }
}

/// Burns one verification against a fixed hash
///
/// Called when a login names a username that does not exist so that the
/// response time matches the wrong-passcode path.
pub fn verify_against_dummy(password: &str) {
    static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();

    let dummy = DUMMY_HASH.get_or_init(|| hash_password("monume-dummy-passcode").ok());
    if let Some(hash) = dummy {
        let _ = verify_password(password, hash);
    }
}

/// Validates a new passcode
///
/// Store passcodes are short shared-terminal codes, so the policy is a
/// length window rather than a character-class check.
///
/// # Example
///
/// ```
/// use monume_shared::auth::password::validate_passcode;
///
/// assert!(validate_passcode("ori3").is_ok());
/// assert!(validate_passcode("abc").is_err());
/// assert!(validate_passcode("  ").is_err());
/// ```
pub fn validate_passcode(passcode: &str) -> Result<(), String> {
    if passcode.trim().is_empty() {
        return Err("Passcode must not be blank".to_string());
    }

    let length = passcode.chars().count();
    if length < MIN_PASSCODE_LENGTH {
        return Err(format!(
            "Passcode must be at least {} characters long",
            MIN_PASSCODE_LENGTH
        ));
    }

    if length > MAX_PASSCODE_LENGTH {
        return Err(format!(
            "Passcode must be at most {} characters long",
            MAX_PASSCODE_LENGTH
        ));
    }

    Ok(())
}
