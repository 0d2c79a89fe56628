//! Unique identifier generation for sessions and request correlation.
//!
//! IDs are built synchronously from the current time, the process id and
//! 64 random bits, so two instances generating at the same millisecond still
//! diverge.

use std::time::{SystemTime, UNIX_EPOCH};

const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

fn base36(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::with_capacity(13);
    while n > 0 {
        digits.push(ALPHABET[(n % 36) as usize]);
        n /= 36;
    }
    digits.reverse();
    // Only ASCII alphanumerics were pushed
    String::from_utf8(digits).unwrap_or_default()
}

/// Generate a new identifier.
///
/// # Example
///
/// ```
/// use authguard::token::id_gen::new_id;
///
/// let a = new_id();
/// let b = new_id();
/// assert_ne!(a, b);
/// assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
/// ```
pub fn new_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default();

    let mut id = base36(millis);
    id.push_str(&std::process::id().to_string());
    id.push_str(&base36(rand::random::<u64>()));
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_base36() {
        assert_eq!(base36(0), "0");
        assert_eq!(base36(35), "z");
        assert_eq!(base36(36), "10");
    }

    #[test]
    fn test_ids_are_unique() {
        let ids: HashSet<String> = (0..10_000).map(|_| new_id()).collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn test_id_contains_pid() {
        assert!(new_id().contains(&std::process::id().to_string()));
    }
}
