/// Surface forms a judge may answer with, after lower-casing and trimming.
///
/// Membership in this table is the only way an answer becomes a verdict.
pub const VERDICT_ALIASES: &[(&str, bool)] = &[
    ("true", true),
    ("yes", true),
    ("correct", true),
    ("1", true),
    ("y", true),
    ("false", false),
    ("no", false),
    ("incorrect", false),
    ("0", false),
    ("n", false),
];

/// Maps raw judge text to a verdict, or `None` when it matches no alias.
pub fn normalize_verdict(raw: &str) -> Option<bool> {
    let normalized = raw.trim().to_lowercase();
    VERDICT_ALIASES
        .iter()
        .find(|(alias, _)| *alias == normalized)
        .map(|(_, verdict)| *verdict)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_alias() {
        for alias in ["true", "yes", "correct", "1", "y"] {
            assert_eq!(normalize_verdict(alias), Some(true), "{alias}");
        }
        for alias in ["false", "no", "incorrect", "0", "n"] {
            assert_eq!(normalize_verdict(alias), Some(false), "{alias}");
        }
        assert_eq!(VERDICT_ALIASES.len(), 10);
    }

    #[test]
    fn test_case_and_whitespace_insensitive() {
        assert_eq!(normalize_verdict(" Yes \n"), Some(true));
        assert_eq!(normalize_verdict("\tINCORRECT "), Some(false));
        assert_eq!(normalize_verdict("True"), Some(true));
    }

    #[test]
    fn test_unlisted_answers() {
        for raw in ["maybe", "", "yes.", "no, it is not", "2", "yes yes", "ye s"] {
            assert_eq!(normalize_verdict(raw), None, "{raw:?}");
        }
    }
}
