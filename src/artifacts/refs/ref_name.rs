use crate::artifacts::refs::{HEAD_REF_NAME, INVALID_REF_NAME, REF_ALIASES};
use crate::errors::{OdbError, OdbResult};
use std::path::Path;

/// A validated reference name such as `HEAD` or `refs/heads/main`
///
/// The name doubles as the ref's path relative to the git directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RefName(String);

impl RefName {
    pub fn try_parse(name: impl Into<String>) -> OdbResult<Self> {
        let name = name.into();
        let name = match REF_ALIASES.get(name.as_str()) {
            Some(alias) => alias.to_string(),
            None => name,
        };

        if name.is_empty() {
            return Err(OdbError::InvalidRefName(
                "ref name cannot be empty".to_string(),
            ));
        }

        if INVALID_REF_NAME.is_match(&name) || name.contains("//") || name.ends_with('.') {
            return Err(OdbError::InvalidRefName(name));
        }

        Ok(Self(name))
    }

    /// Build a name read back from disk, where validation already happened
    /// when the ref was written
    pub(crate) fn new_unchecked(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn head() -> Self {
        Self(HEAD_REF_NAME.to_string())
    }

    pub fn is_head(&self) -> bool {
        self.0 == HEAD_REF_NAME
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_path(&self) -> &Path {
        Path::new(&self.0)
    }
}

impl AsRef<str> for RefName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RefName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::proptest;
    use rstest::rstest;

    proptest! {
        #[test]
        fn test_is_valid_ref_name_with_valid_ref_name(
            ref_name in "[a-zA-Z0-9_-]+"
        ) {
            assert!(RefName::try_parse(ref_name).is_ok());
        }

        #[test]
        fn test_is_valid_ref_name_with_slashes(
            prefix in "[a-zA-Z0-9_-]+",
            suffix in "[a-zA-Z0-9_-]+"
        ) {
            let ref_name = format!("refs/{}/{}", prefix, suffix);
            assert!(RefName::try_parse(ref_name).is_ok());
        }

        #[test]
        fn test_is_invalid_ref_name_starting_with_dot(
            suffix in "[a-zA-Z0-9_-]+"
        ) {
            let ref_name = format!(".{}", suffix);
            assert!(RefName::try_parse(ref_name).is_err());
        }

        #[test]
        fn test_is_invalid_ref_name_ending_with_lock(
            prefix in "[a-zA-Z0-9_-]+"
        ) {
            let ref_name = format!("refs/heads/{}.lock", prefix);
            assert!(RefName::try_parse(ref_name).is_err());
        }

        #[test]
        fn test_is_invalid_ref_name_with_consecutive_dots(
            prefix in "[a-zA-Z0-9_-]+",
            suffix in "[a-zA-Z0-9_-]+"
        ) {
            let ref_name = format!("{}..{}", prefix, suffix);
            assert!(RefName::try_parse(ref_name).is_err());
        }

        #[test]
        fn test_is_invalid_ref_name_with_slash_dot(
            prefix in "[a-zA-Z0-9_-]+",
            suffix in "[a-zA-Z0-9_-]+"
        ) {
            let ref_name = format!("{}/.{}", prefix, suffix);
            assert!(RefName::try_parse(ref_name).is_err());
        }

        #[test]
        fn test_is_invalid_ref_name_with_at_brace(
            prefix in "[a-zA-Z0-9_-]+",
            suffix in "[a-zA-Z0-9_-]+"
        ) {
            let ref_name = format!("{}@{{{}}}", prefix, suffix);
            assert!(RefName::try_parse(ref_name).is_err());
        }

        #[test]
        fn test_is_invalid_ref_name_with_special_chars(
            prefix in "[a-zA-Z0-9_-]+",
            suffix in "[a-zA-Z0-9_-]+",
            special_char in r"[\*:\?\[\\^~ ]"
        ) {
            let ref_name = format!("{}{}{}", prefix, special_char, suffix);
            assert!(RefName::try_parse(ref_name).is_err());
        }
    }

    #[rstest]
    #[case("")]
    #[case("/refs/heads/main")]
    #[case("refs/heads/")]
    #[case("refs//heads")]
    #[case("refs/heads/main.")]
    #[case("refs/heads/a\x00b")]
    fn rejects_malformed_names(#[case] name: &str) {
        assert!(matches!(
            RefName::try_parse(name),
            Err(OdbError::InvalidRefName(_))
        ));
    }

    #[test]
    fn at_sign_means_head() {
        let name = RefName::try_parse("@").unwrap();

        assert!(name.is_head());
        assert_eq!(name, RefName::head());
    }
}
