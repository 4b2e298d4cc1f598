use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Produce a human-readable reference number: `PREFIX-YYYYMMDD-XXXXXXXX`.
///
/// The date component is the UTC date at the creation instant; the token is
/// the first eight hex characters of a v4 uuid, uppercased. Collision
/// probability across a municipality's volume is negligible, so no uniqueness
/// retry loop is required (the store still enforces uniqueness on insert).
///
/// An alternative human-sequential scheme, `PREFIX-<year>-<zero-padded
/// sequence>`, is equally acceptable but needs an externally coordinated
/// counter; this implementation uses the random-token scheme exclusively.
pub fn generate(prefix: &str, now: DateTime<Utc>) -> String {
    let date_part = now.format("%Y%m%d");
    let token = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
    format!("{prefix}-{date_part}-{token}")
}

/// Structural check used by tests and intake validation.
pub fn matches_format(prefix: &str, candidate: &str) -> bool {
    let Some(rest) = candidate.strip_prefix(prefix) else {
        return false;
    };
    let Some(rest) = rest.strip_prefix('-') else {
        return false;
    };
    let mut parts = rest.splitn(2, '-');
    let (Some(date), Some(token)) = (parts.next(), parts.next()) else {
        return false;
    };
    date.len() == 8
        && date.bytes().all(|b| b.is_ascii_digit())
        && token.len() == 8
        && token.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn generated_numbers_match_declared_format() {
        let now = Utc.with_ymd_and_hms(2026, 2, 13, 23, 59, 59).unwrap();
        let reference = generate("CLR", now);
        assert!(reference.starts_with("CLR-20260213-"), "{reference}");
        assert!(matches_format("CLR", &reference), "{reference}");
    }

    #[test]
    fn format_check_rejects_malformed_candidates() {
        assert!(!matches_format("CLR", "CLR-2026021-ABCDEF01"));
        assert!(!matches_format("CLR", "CLR-20260213-abcdef01"));
        assert!(!matches_format("CLR", "BRGY-20260213-ABCDEF01"));
        assert!(!matches_format("CLR", "CLR-20260213"));
    }
}
