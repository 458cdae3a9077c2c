use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{JwtClaims, Role, TokenPair, TokenType, User};

pub fn issue_token(
    user_id: Uuid,
    email: &str,
    role: Role,
    token_type: TokenType,
    ttl: Duration,
    jwt_secret: &str,
) -> Result<String, String> {
    if jwt_secret.is_empty() {
        return Err("JWT secret is not set".to_string());
    }

    let now = Utc::now();
    let claims = JwtClaims {
        sub: user_id.to_string(),
        email: email.to_string(),
        role,
        token_type,
        iat: now.timestamp().max(0) as u64,
        exp: (now + ttl).timestamp().max(0) as u64,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .map_err(|e| format!("Failed to sign token: {}", e))
}

/// Issues the access/refresh pair returned by every login endpoint.
pub fn issue_token_pair(
    user_id: Uuid,
    email: &str,
    role: Role,
    config: &AppConfig,
) -> Result<TokenPair, String> {
    let access = issue_token(
        user_id,
        email,
        role,
        TokenType::Access,
        Duration::minutes(config.access_token_ttl_minutes),
        &config.jwt_secret,
    )?;
    let refresh = issue_token(
        user_id,
        email,
        role,
        TokenType::Refresh,
        Duration::minutes(config.refresh_token_ttl_minutes),
        &config.jwt_secret,
    )?;

    Ok(TokenPair { access, refresh })
}

pub fn decode_claims(token: &str, jwt_secret: &str) -> Result<JwtClaims, String> {
    if jwt_secret.is_empty() {
        return Err("JWT secret is not set".to_string());
    }

    let validation = Validation::new(Algorithm::HS256);
    let data = decode::<JwtClaims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        debug!("Token rejected: {}", e);
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => "Token expired".to_string(),
            jsonwebtoken::errors::ErrorKind::InvalidSignature => "Invalid token signature".to_string(),
            _ => "Invalid token".to_string(),
        }
    })?;

    Ok(data.claims)
}

/// Validates a token of the expected type and returns the caller it names.
pub fn validate_token(token: &str, jwt_secret: &str, expected: TokenType) -> Result<User, String> {
    let claims = decode_claims(token, jwt_secret)?;

    if claims.token_type != expected {
        return Err("Wrong token type".to_string());
    }

    let id = Uuid::parse_str(&claims.sub).map_err(|_| "Invalid token subject".to_string())?;

    let user = User {
        id,
        email: claims.email,
        role: claims.role,
    };

    debug!("Token validated successfully for user: {}", user.id);
    Ok(user)
}
