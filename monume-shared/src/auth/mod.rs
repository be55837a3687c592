/// Authentication and authorization utilities
///
/// # Modules
///
/// - [`password`]: Argon2id passcode hashing and validation
/// - [`jwt`]: Signed session tokens
/// - [`session`]: Login, logout and per-request session resolution
/// - [`authorization`]: Route access levels and user-management rules
///
/// # Security Features
///
/// - **Passcode Hashing**: Argon2id with 64 MB memory, 3 iterations
/// - **Session Tokens**: HS256 signing, absolute expiry plus idle timeout
/// - **Revocation**: tokens name a server-side session row
/// - **Constant-time Comparison**: verification goes through argon2
///
/// # Example
///
/// ```no_run
/// use monume_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("ori3")?;
/// assert!(verify_password("ori3", &hash)?);
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod password;
pub mod session;
