//! One-time SMS verification codes.
//!
//! No SMS gateway is wired in: codes are logged (and echoed back in dev mode).

use std::time::Duration;

use moka::future::Cache;
use moka::ops::compute::{CompResult, Op};
use rand::Rng;

use dronshop_core::Phone;

/// Pending codes keyed by normalized phone. Entries expire after the TTL and
/// are removed on successful verification.
#[derive(Clone)]
pub struct SmsCodeStore {
    codes: Cache<String, String>,
    code_length: u32,
}

impl SmsCodeStore {
    #[must_use]
    pub fn new(code_length: u32, ttl: Duration) -> Self {
        Self {
            codes: Cache::builder()
                .max_capacity(100_000)
                .time_to_live(ttl)
                .build(),
            code_length: code_length.clamp(1, 9),
        }
    }

    /// Generate a code for `phone`, replacing any pending one.
    pub async fn issue(&self, phone: &Phone) -> String {
        let code = generate_code(self.code_length);
        self.codes
            .insert(phone.as_str().to_owned(), code.clone())
            .await;
        code
    }

    /// Check `provided` against the pending code; a match consumes it.
    ///
    /// Compare and removal happen under the cache's per-key lock, so a code
    /// is accepted at most once even under concurrent requests.
    pub async fn verify(&self, phone: &Phone, provided: &str) -> bool {
        let provided = provided.trim();
        let result = self
            .codes
            .entry_by_ref(phone.as_str())
            .and_compute_with(|entry| {
                let op = match entry {
                    Some(entry) if entry.value() == provided => Op::Remove,
                    _ => Op::Nop,
                };
                std::future::ready(op)
            })
            .await;
        matches!(result, CompResult::Removed(_))
    }
}

fn generate_code(length: u32) -> String {
    let upper = 10_u32.pow(length);
    let value = rand::rng().random_range(0..upper);
    format!("{value:0width$}", width = length as usize)
}
