use uuid::Uuid;

/// Surrogate identifier assigned by the store (BIGSERIAL / explicit dense ids).
pub type Id = i64;

/// Generate an opaque session token
pub fn generate_token() -> String {
    Uuid::new_v4().to_string()
}
