//! Store key layout.

pub const PAPER_PREFIX: &str = "cp:";
pub const ACCOUNT_PREFIX: &str = "acct:";
pub const PERSON_PREFIX: &str = "pers:";
pub const COMPANY_PREFIX: &str = "comp:";

pub fn paper(cusip: &str) -> String {
    format!("{PAPER_PREFIX}{cusip}")
}

pub fn account(id: &str) -> String {
    format!("{ACCOUNT_PREFIX}{id}")
}

pub fn person(id: &str) -> String {
    format!("{PERSON_PREFIX}{id}")
}

pub fn company(id: &str) -> String {
    format!("{COMPANY_PREFIX}{id}")
}

/// Lowercases and strips every space, the rule behind person and company ids.
pub fn normalize_id(raw: &str) -> String {
    raw.to_lowercase().replace(' ', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_spaces_and_case() {
        assert_eq!(normalize_id("Test Ltd"), "testltd");
        assert_eq!(normalize_id("  Mary Ann "), "maryann");
        assert_eq!(normalize_id("   "), "");
    }

    #[test]
    fn keys_carry_prefixes() {
        assert_eq!(paper("1000AAX"), "cp:1000AAX");
        assert_eq!(account("company1"), "acct:company1");
        assert_eq!(person("johnsmith"), "pers:johnsmith");
        assert_eq!(company("acme"), "comp:acme");
    }
}
