use crate::artifacts::refs::{ANCESTOR, PARENT};
use crate::errors::{OdbError, OdbResult};

/// A revision expression naming a single object
///
/// Supports:
/// - ref names in any of the short forms git accepts: `main`, `heads/main`, `v1.0`, `HEAD`, `@`
/// - full 40-character object ids (used when no ref of that name exists)
/// - parent notation: `<revision>^`
/// - ancestor notation: `<revision>~<n>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Revision {
    Name(String),
    Parent(Box<Revision>),
    Ancestor(Box<Revision>, usize),
}

impl Revision {
    pub fn try_parse(revision: &str) -> OdbResult<Revision> {
        if let Some(caps) = PARENT.captures(revision) {
            let base = Self::try_parse(&caps[1])?;
            return Ok(Revision::Parent(Box::new(base)));
        }

        if let Some(caps) = ANCESTOR.captures(revision) {
            let base = Self::try_parse(&caps[1])?;
            let generations = caps[2]
                .parse::<usize>()
                .map_err(|_| OdbError::InvalidRefName(revision.to_string()))?;
            return Ok(Revision::Ancestor(Box::new(base), generations));
        }

        if revision.is_empty() || revision.contains(['^', '~']) {
            return Err(OdbError::InvalidRefName(format!(
                "invalid revision '{revision}'"
            )));
        }

        Ok(Revision::Name(revision.to_string()))
    }
}

/// Full ref names a short name may stand for, in the order git tries them
pub fn ref_candidates(name: &str) -> Vec<String> {
    vec![
        name.to_string(),
        format!("refs/{name}"),
        format!("refs/tags/{name}"),
        format!("refs/heads/{name}"),
        format!("refs/remotes/{name}"),
        format!("refs/remotes/{name}/HEAD"),
    ]
}
