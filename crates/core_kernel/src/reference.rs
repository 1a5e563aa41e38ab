//! Human-facing reference codes
//!
//! Claim numbers, referral codes and MRNs share one format:
//! `<PREFIX>-<base36 milliseconds>-<5 random characters>`, uppercased.
//! The random suffix is drawn from a v4 UUID, which is sourced from the
//! operating system's CSPRNG. Codes are not guaranteed unique on their own;
//! the datastore enforces uniqueness and callers retry on conflict.

use chrono::{DateTime, Utc};
use uuid::Uuid;

const ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const SUFFIX_LEN: usize = 5;

/// Generates a reference code such as `CLM-MB3K9Q2L-7Q4ZD`
pub fn generate_reference(prefix: &str) -> String {
    generate_reference_at(prefix, Utc::now())
}

/// Generates a reference code stamped with the given instant
pub fn generate_reference_at(prefix: &str, at: DateTime<Utc>) -> String {
    let millis = u64::try_from(at.timestamp_millis()).unwrap_or_default();
    format!("{}-{}-{}", prefix.to_uppercase(), to_base36(millis), random_suffix())
}

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(ALPHABET[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}

fn random_suffix() -> String {
    Uuid::new_v4()
        .as_bytes()
        .iter()
        .take(SUFFIX_LEN)
        .map(|b| ALPHABET[(*b as usize) % ALPHABET.len()] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_base36_encoding() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "Z");
        assert_eq!(to_base36(36), "10");
    }

    #[test]
    fn test_reference_shape() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 8, 30, 0).unwrap();
        let code = generate_reference_at("clm", at);
        let parts: Vec<&str> = code.split('-').collect();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "CLM");
        assert_eq!(parts[1], to_base36(at.timestamp_millis() as u64));
        assert_eq!(parts[2].len(), SUFFIX_LEN);
        assert!(code.chars().all(|c| c == '-' || c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn test_references_differ_within_same_millisecond() {
        let at = Utc::now();
        let a = generate_reference_at("REF", at);
        let b = generate_reference_at("REF", at);
        // 36^5 suffixes; a collision here would indicate a broken source
        assert_ne!(a, b);
    }
}
