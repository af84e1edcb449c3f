use std::sync::atomic::{AtomicU32, Ordering};

use fake::faker::name::en::{FirstName, LastName};
use fake::Fake;
use rand::seq::SliceRandom;
use rand::Rng;

const SUFFIX_CHARS: &str = "abcdefghijklmnopqrstuvwxyz0123456789";

/// Synthesizes throwaway signup identities. One generator is shared across a
/// whole run so the numeric mailbox prefix cycles globally, not per session.
pub struct IdentityGenerator {
    /// Next mailbox prefix, cycling 1–999. The target site rejects longer
    /// local parts, hence the fixed range.
    counter: AtomicU32,
    domains: Vec<String>,
}

impl IdentityGenerator {
    pub fn new(domains: Vec<String>) -> Self {
        Self {
            counter: AtomicU32::new(1),
            domains,
        }
    }

    /// Local throwaway address: cycling numeric prefix, 8 random lowercase
    /// alphanumerics, uniformly chosen configured domain.
    pub fn next_address(&self) -> String {
        let number = self
            .counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                Some(if n >= 999 { 1 } else { n + 1 })
            })
            .unwrap_or(1);

        let mut rng = rand::thread_rng();
        let suffix: String = (0..8)
            .map(|_| {
                let index = rng.gen_range(0..SUFFIX_CHARS.len());
                SUFFIX_CHARS.as_bytes()[index] as char
            })
            .collect();
        let domain = self
            .domains
            .choose(&mut rng)
            .map(String::as_str)
            .unwrap_or("example.com");

        format!("{}{}@{}", number, suffix, domain)
    }

    pub fn random_name(&self) -> (String, String) {
        (FirstName().fake(), LastName().fake())
    }
}
