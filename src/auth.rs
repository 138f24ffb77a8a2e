use axum::http::HeaderMap;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::Admin;

const TOKEN_TTL_HOURS: i64 = 24;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
}

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    Ok(bcrypt::hash(password, bcrypt::DEFAULT_COST)?)
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

/// Username/password check against the admins table. Inactive accounts
/// fail the same way as bad credentials.
pub fn authenticate(
    conn: &Connection,
    username: &str,
    password: &str,
) -> Result<Admin, AppError> {
    let admin = queries::get_admin_by_username(conn, username)?
        .filter(|a| a.is_active)
        .ok_or(AppError::Unauthorized)?;

    if !verify_password(password, &admin.password_hash) {
        return Err(AppError::Unauthorized);
    }

    Ok(admin)
}

pub fn issue_token(secret: &str, username: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: username.to_string(),
        exp: (Utc::now() + Duration::hours(TOKEN_TTL_HOURS)).timestamp(),
    };
    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}

pub fn verify_token(secret: &str, token: &str) -> Result<Claims, AppError> {
    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|_| AppError::Unauthorized)?;
    Ok(decoded.claims)
}

/// Resolves the bearer token in `headers` to an active admin row. Every
/// admin-only handler calls this first; public booking routes never do.
pub fn require_admin(headers: &HeaderMap, secret: &str, conn: &Connection) -> Result<Admin, AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").ok_or(AppError::Unauthorized)?;
    let claims = verify_token(secret, token)?;

    queries::get_admin_by_username(conn, &claims.sub)?
        .filter(|a| a.is_active)
        .ok_or(AppError::Unauthorized)
}

/// Creates the configured admin account on first start; later starts find
/// the row and do nothing.
pub fn bootstrap_admin(
    conn: &Connection,
    username: &str,
    email: &str,
    password: &str,
) -> anyhow::Result<()> {
    if queries::get_admin_by_username(conn, username)?.is_some() {
        return Ok(());
    }

    let hash = hash_password(password)?;
    queries::create_admin(conn, username, email, &hash)?;
    tracing::info!("created default admin account '{username}'");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("admin123").unwrap();
        assert!(verify_password("admin123", &hash));
        assert!(!verify_password("wrong", &hash));
    }

    #[test]
    fn token_round_trip_and_tamper() {
        let token = issue_token("secret", "admin").unwrap();
        let claims = verify_token("secret", &token).unwrap();
        assert_eq!(claims.sub, "admin");

        assert!(verify_token("other-secret", &token).is_err());
        assert!(verify_token("secret", "not.a.token").is_err());
    }

    #[test]
    fn authenticate_rejects_inactive_and_bad_password() {
        let conn = db::init_db(":memory:").unwrap();
        let hash = hash_password("pw").unwrap();
        queries::create_admin(&conn, "admin", "admin@example.com", &hash).unwrap();

        assert!(authenticate(&conn, "admin", "pw").is_ok());
        assert!(authenticate(&conn, "admin", "nope").is_err());
        assert!(authenticate(&conn, "ghost", "pw").is_err());

        conn.execute("UPDATE admins SET is_active = 0 WHERE username = 'admin'", [])
            .unwrap();
        assert!(authenticate(&conn, "admin", "pw").is_err());
    }

    #[test]
    fn bootstrap_is_idempotent() {
        let conn = db::init_db(":memory:").unwrap();
        bootstrap_admin(&conn, "admin", "admin@example.com", "pw").unwrap();
        bootstrap_admin(&conn, "admin", "admin@example.com", "pw").unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM admins", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
