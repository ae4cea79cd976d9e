//! Parsing of the account list `token|label@token|label@...`.
//!
//! Malformed segments are kept as [`AccountEntry::Malformed`] instead of being
//! dropped, so they still show up in the report and count toward chunking.

use std::fmt;

/// Separates accounts in the configured list.
pub const ENTRY_DELIMITER: char = '@';
/// Separates the token from the label inside one account.
pub const FIELD_DELIMITER: char = '|';

/// An opaque member token plus the free-text label used in reports.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
    label: String,
}

impl Credential {
    pub fn new(token: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            label: label.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// First and last four characters of the token, for display.
    pub fn masked_token(&self) -> String {
        let chars: Vec<char> = self.token.chars().collect();
        if chars.len() <= 8 {
            return "*".repeat(chars.len());
        }
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}…{tail}")
    }
}

// Tokens never reach logs through Debug.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &self.masked_token())
            .field("label", &self.label)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountEntry {
    Valid(Credential),
    /// Wrong field count, empty token or empty label. Holds the raw segment.
    Malformed(String),
}

impl AccountEntry {
    pub fn credential(&self) -> Option<&Credential> {
        match self {
            AccountEntry::Valid(credential) => Some(credential),
            AccountEntry::Malformed(_) => None,
        }
    }
}

/// Splits the raw list into entries, in input order. Empty segments are
/// skipped; every non-empty segment yields exactly one entry.
pub fn parse_accounts(raw: &str) -> Vec<AccountEntry> {
    raw.split(ENTRY_DELIMITER)
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(parse_entry)
        .collect()
}

fn parse_entry(segment: &str) -> AccountEntry {
    let parts: Vec<&str> = segment.split(FIELD_DELIMITER).map(str::trim).collect();
    match parts.as_slice() {
        [token, label] if !token.is_empty() && !label.is_empty() => {
            AccountEntry::Valid(Credential::new(*token, *label))
        }
        _ => AccountEntry::Malformed(segment.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_entries_in_order() {
        let entries = parse_accounts("tokA|main@tokB|alt");
        assert_eq!(
            entries,
            vec![
                AccountEntry::Valid(Credential::new("tokA", "main")),
                AccountEntry::Valid(Credential::new("tokB", "alt")),
            ]
        );
    }

    #[test]
    fn empty_segments_are_skipped() {
        assert!(parse_accounts("").is_empty());
        assert!(parse_accounts("@@ @").is_empty());
        assert_eq!(parse_accounts("@tok|a@@tok2|b@").len(), 2);
    }

    #[test]
    fn entry_count_matches_non_empty_segments() {
        for raw in [
            "a|b",
            "a|b@c|d@e|f",
            "a|b@@c",
            "x@y@z",
            "|@a|@|b@a|b|c",
            "  a | b  @ c|d ",
        ] {
            let expected = raw.split('@').filter(|s| !s.trim().is_empty()).count();
            assert_eq!(parse_accounts(raw).len(), expected, "input {raw:?}");
        }
    }

    #[test]
    fn malformed_entries_are_kept() {
        let entries = parse_accounts("only-token@|label@token|@a|b|c@good|ok");
        assert_eq!(entries.len(), 5);
        assert_eq!(entries[0], AccountEntry::Malformed("only-token".into()));
        assert_eq!(entries[1], AccountEntry::Malformed("|label".into()));
        assert_eq!(entries[2], AccountEntry::Malformed("token|".into()));
        assert_eq!(entries[3], AccountEntry::Malformed("a|b|c".into()));
        assert_eq!(entries[4].credential().unwrap().label(), "ok");
    }

    #[test]
    fn fields_are_trimmed() {
        let entries = parse_accounts(" tok | my phone ");
        let credential = entries[0].credential().unwrap();
        assert_eq!(credential.token(), "tok");
        assert_eq!(credential.label(), "my phone");
    }

    #[test]
    fn debug_masks_token() {
        let credential = Credential::new("abcdefgh12345678", "main");
        let rendered = format!("{credential:?}");
        assert!(!rendered.contains("abcdefgh12345678"));
        assert!(rendered.contains("abcd…5678"));
        assert_eq!(Credential::new("short", "x").masked_token(), "*****");
    }
}
