use chrono::{Duration, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::model::{generate_token, Id, Session};

/// Sessions live for 30 days; carts and logins ride on the same row
const SESSION_TTL_DAYS: i64 = 30;

/// Produce a salted digest in `salt$hexdigest` form
pub fn hash_password(password: &str) -> String {
    let salt = Uuid::new_v4().simple().to_string();
    format!("{}${}", salt, digest(&salt, password))
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt, expected)) = stored.split_once('$') else {
        return false;
    };
    digest(salt, password) == expected
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Mint a fresh session row. Anonymous sessions carry no customer and
/// still own a cart; login binds the customer afterwards.
pub fn new_session(customer_id: Option<Id>, is_admin: bool) -> Session {
    let now = Utc::now();
    Session {
        token: generate_token(),
        customer_id,
        is_admin,
        created_at: now,
        expires_at: now + Duration::days(SESSION_TTL_DAYS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_round_trip() {
        let stored = hash_password("correct horse");
        assert!(verify_password("correct horse", &stored));
        assert!(!verify_password("wrong horse", &stored));
    }

    #[test]
    fn test_digests_are_salted() {
        assert_ne!(hash_password("same"), hash_password("same"));
    }

    #[test]
    fn test_malformed_digest_never_verifies() {
        assert!(!verify_password("anything", "no-separator-here"));
    }

    #[test]
    fn test_new_session_shape() {
        let session = new_session(Some(7), false);
        assert_eq!(session.customer_id, Some(7));
        assert!(!session.is_admin);
        assert!(!session.is_expired());
    }
}
