use anyhow::anyhow;
use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::{info, warn};

use super::repo_types::User;
use crate::{error::ApiError, state::AppState};

/// PHC-encoded argon2id hash with a fresh random salt.
pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow!("argon2 hash: {e}"))
}

/// `Ok(false)` on a mismatch; `Err` only when the stored hash is unusable.
pub fn verify_password(plain: &str, stored: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(stored).map_err(|e| anyhow!("stored hash unreadable: {e}"))?;
    match Argon2::default().verify_password(plain.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(anyhow!("argon2 verify: {e}")),
    }
}

/// Hashes the password and stores a new user under a normalized email.
pub async fn register_user(st: &AppState, email: String, password: &str) -> Result<User, ApiError> {
    if password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }
    let user = User::new(email, hash_password(password)?);
    st.users
        .create(&user)
        .await
        .map_err(|e| ApiError::from_store(e, "User not found"))?;
    info!(user_id = %user.user_id, email = %user.email, "user registered");
    Ok(user)
}

/// Checks credentials and issues a bearer token for the matching user.
pub async fn authenticate(
    st: &AppState,
    email: &str,
    password: &str,
) -> Result<(User, String), ApiError> {
    let Some(user) = st.users.find_by_email(email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(ApiError::not_found("User not found"));
    };

    if !verify_password(password, &user.password_hash)? {
        warn!(user_id = %user.user_id, "login invalid password");
        return Err(ApiError::validation("Invalid credentials"));
    }

    let token = st.jwt.sign(&user.user_id)?;
    info!(user_id = %user.user_id, "user logged in");
    Ok((user, token))
}
