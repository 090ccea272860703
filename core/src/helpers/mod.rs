use std::sync::atomic::{AtomicU64, Ordering};

use rand::{distr::Alphanumeric, Rng};

static STAGING_SEQUENCE: AtomicU64 = AtomicU64::new(0);

pub fn generate_random_id(len: usize) -> String {
    rand::rng().sample_iter(&Alphanumeric).take(len).map(char::from).collect()
}

/// Token for a staging table name: a process wide sequence number plus a
/// random suffix, lowercase so the resulting identifier never needs quoting.
pub fn generate_staging_token() -> String {
    let sequence = STAGING_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("{}_{}", sequence, generate_random_id(8).to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_generate_random_id_length() {
        let id = generate_random_id(12);
        assert_eq!(id.len(), 12);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_staging_tokens_are_unique_identifiers() {
        let tokens: HashSet<String> = (0..1000).map(|_| generate_staging_token()).collect();
        assert_eq!(tokens.len(), 1000);
        assert!(tokens
            .iter()
            .all(|t| t.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase() || c == '_')));
    }
}
