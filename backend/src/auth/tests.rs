use super::*;
use jsonwebtoken::{EncodingKey, Header, encode};

const SECRET: &str = "supersecretjwtsecretforunittesting123";

fn token(secret: &str, role: &str, exp: usize) -> String {
    let claims = SupabaseClaims {
        sub: "123e4567-e89b-12d3-a456-426614174000".to_string(),
        role: role.to_string(),
        email: Some("test@example.com".to_string()),
        exp,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

#[test]
fn accepts_valid_token() {
    let claims = validate_supabase_jwt(&token(SECRET, "authenticated", 9999999999), SECRET)
        .expect("Valid token should pass");

    assert_eq!(claims.sub, "123e4567-e89b-12d3-a456-426614174000");
    assert_eq!(claims.email.as_deref(), Some("test@example.com"));
    assert_eq!(claims.role, "authenticated");
}

#[test]
fn rejects_expired_token() {
    let result = validate_supabase_jwt(&token(SECRET, "authenticated", 1), SECRET);
    assert!(result.is_err());
}

#[test]
fn rejects_token_signed_with_another_secret() {
    let result = validate_supabase_jwt(&token("wrongsecret", "authenticated", 9999999999), SECRET);
    assert!(result.is_err());
}

#[test]
fn keeps_the_service_role() {
    let claims = validate_supabase_jwt(&token(SECRET, ADMIN_ROLE, 9999999999), SECRET).unwrap();
    assert_eq!(claims.role, ADMIN_ROLE);
}
