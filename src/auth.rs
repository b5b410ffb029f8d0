use axum::http::{header::AUTHORIZATION, HeaderMap};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Server-side table of issued edit sessions.
#[derive(Debug)]
pub struct Sessions {
    ttl: Duration,
    issued: HashMap<String, Instant>,
}

impl Sessions {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            issued: HashMap::new(),
        }
    }

    pub fn issue(&mut self) -> String {
        self.issue_at(Instant::now())
    }

    pub fn is_valid(&mut self, token: &str) -> bool {
        self.is_valid_at(token, Instant::now())
    }

    pub fn revoke(&mut self, token: &str) -> bool {
        self.issued.remove(token).is_some()
    }

    fn issue_at(&mut self, now: Instant) -> String {
        self.prune(now);
        let token = Uuid::new_v4().to_string();
        self.issued.insert(token.clone(), now);
        token
    }

    fn is_valid_at(&mut self, token: &str, now: Instant) -> bool {
        self.prune(now);
        self.issued.contains_key(token)
    }

    fn prune(&mut self, now: Instant) {
        let ttl = self.ttl;
        self.issued
            .retain(|_, issued| now.saturating_duration_since(*issued) < ttl);
    }
}

/// Extracts `<token>` from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

/// Compares without short-circuiting on the first differing byte.
pub fn password_matches(expected: &str, given: &str) -> bool {
    let expected = expected.as_bytes();
    let given = given.as_bytes();
    if expected.len() != given.len() {
        return false;
    }
    expected
        .iter()
        .zip(given)
        .fold(0u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}
