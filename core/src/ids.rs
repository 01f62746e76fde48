use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rand::Rng;

/// Alphabet task ids are drawn from; lowercase alphanumeric only.
pub const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Length of a generated task id.
pub const ID_LEN: usize = 8;

/// Returns true if `s` matches `^[0-9a-z]{8}$`.
pub fn is_valid_id(s: &str) -> bool {
    s.len() == ID_LEN && s.bytes().all(|b| ID_ALPHABET.contains(&b))
}

fn random_id() -> String {
    let mut rng = rand::thread_rng();
    (0..ID_LEN)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect()
}

/// Generates an 8-char id from [`ID_ALPHABET`], retrying on collision
/// against `existing`.
pub fn generate_id(existing: &HashSet<String>) -> String {
    loop {
        let candidate = random_id();
        if !existing.contains(&candidate) {
            return candidate;
        }
    }
}

/// Wall-clock source, injectable so archival age checks and timestamped
/// operations are deterministically testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Real wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock pinned to a fixed instant, for tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
