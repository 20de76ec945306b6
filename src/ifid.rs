//! Interactive Fiction IDs
use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

static IFID_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9A-F]{8}-[0-9A-F]{4}-4[0-9A-F]{3}-[89AB][0-9A-F]{3}-[0-9A-F]{12}$")
        .unwrap()
});

/// Returns true if `ifid` is shaped like an uppercase version 4 UUID
pub fn is_valid(ifid: &str) -> bool {
    IFID_REGEX.is_match(ifid)
}

/// Generates a fresh, uppercase IFID
pub fn generate() -> String {
    Uuid::new_v4().to_string().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation() {
        assert!(is_valid("22F25A58-7062-4927-95B6-F424DDB2EC65"));
        assert!(!is_valid("22f25a58-7062-4927-95b6-f424ddb2ec65"));
        // Version 1
        assert!(!is_valid("22F25A58-7062-1927-95B6-F424DDB2EC65"));
        // Bad variant
        assert!(!is_valid("22F25A58-7062-4927-C5B6-F424DDB2EC65"));
        assert!(!is_valid(""));
        assert!(!is_valid("X"));
    }

    #[test]
    fn generated_ids_are_valid_and_uppercase() {
        let ifid = generate();
        assert!(is_valid(&ifid));
        assert_eq!(ifid, ifid.to_uppercase());
        assert_ne!(ifid, generate());
    }
}
