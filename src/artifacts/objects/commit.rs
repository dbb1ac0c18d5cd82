//! Git commit object
//!
//! Commits represent snapshots of the repository at specific points in time.
//! They contain:
//! - A tree object ID (directory snapshot)
//! - Parent commit ID(s) (for history)
//! - Author and committer information
//! - Any further headers (`encoding`, `gpgsig`, `mergetag`, ...)
//! - Commit message
//!
//! ## Format
//!
//! On disk:
//! ```text
//! commit <size>\0
//! tree <tree-sha>
//! parent <parent-sha>
//! author <name> <email> <timestamp> <timezone>
//! committer <name> <email> <timestamp> <timezone>
//!
//! <commit message>
//! ```

use crate::artifacts::objects::headers;
use crate::artifacts::objects::object::{Object, Packable, Unpackable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::errors::{OdbError, OdbResult};
use bytes::Bytes;
use chrono::{DateTime, FixedOffset};
use std::borrow::Cow;
use std::io::BufRead;
use std::ops::Range;

/// Author, committer or tagger information
///
/// Identities read from objects keep their `Name <email>` part and timezone
/// exactly as written, so that re-encoding yields the same bytes (an empty
/// name, a `-0000` zone or a name in a legacy charset all survive).
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Author {
    /// `Name <email>`, verbatim
    identity: Bytes,
    /// Where the email sits inside `identity`, between the angle brackets
    email: Range<usize>,
    timestamp: DateTime<FixedOffset>,
    /// `+hhmm` or `-hhmm`, verbatim
    timezone: String,
}

impl Author {
    /// Create a new author with the current timestamp
    pub fn new(name: String, email: String) -> Self {
        Self::new_with_timestamp(name, email, chrono::Local::now().fixed_offset())
    }

    pub fn new_with_timestamp(
        name: String,
        email: String,
        timestamp: DateTime<FixedOffset>,
    ) -> Self {
        let identity = format!("{name} <{email}>");
        let email_start = name.len() + 2;

        Author {
            email: email_start..email_start + email.len(),
            identity: Bytes::from(identity),
            timestamp,
            timezone: timestamp.format("%z").to_string(),
        }
    }

    pub fn name(&self) -> Cow<'_, str> {
        let name = &self.identity[..self.email.start - 1];
        String::from_utf8_lossy(name.trim_ascii_end())
    }

    pub fn email(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.identity[self.email.clone()])
    }

    pub fn timestamp(&self) -> DateTime<FixedOffset> {
        self.timestamp
    }

    /// Format author name and email as "Name <email@example.com>"
    pub fn display_name(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.identity)
    }

    /// Encode as "Name <email> timestamp timezone"
    pub fn encode(&self) -> Vec<u8> {
        let mut encoded = self.identity.to_vec();
        encoded.extend_from_slice(
            format!(" {} {}", self.timestamp.timestamp(), self.timezone).as_bytes(),
        );
        encoded
    }
}

impl TryFrom<&[u8]> for Author {
    type Error = OdbError;

    fn try_from(value: &[u8]) -> OdbResult<Self> {
        let invalid = || {
            OdbError::format(format!(
                "invalid identity: {}",
                String::from_utf8_lossy(value)
            ))
        };

        // Split from right to get timezone and timestamp first
        let parts: Vec<&[u8]> = value.rsplitn(3, |byte| *byte == b' ').collect();
        if parts.len() < 3 {
            return Err(invalid());
        }

        let timezone = std::str::from_utf8(parts[0]).map_err(|_| invalid())?;
        let offset = parse_offset(timezone)?;
        let seconds = std::str::from_utf8(parts[1])
            .ok()
            .and_then(|seconds| seconds.parse::<i64>().ok())
            .ok_or_else(invalid)?;
        let identity = parts[2];

        let email_start = identity
            .iter()
            .position(|byte| *byte == b'<')
            .ok_or_else(|| OdbError::format("invalid identity: missing '<'"))?;
        let email_end = identity
            .iter()
            .rposition(|byte| *byte == b'>')
            .filter(|end| *end > email_start)
            .ok_or_else(|| OdbError::format("invalid identity: missing '>'"))?;

        let timestamp = DateTime::from_timestamp(seconds, 0)
            .ok_or_else(|| OdbError::format(format!("timestamp out of range: {seconds}")))?
            .with_timezone(&offset);

        Ok(Author {
            identity: Bytes::copy_from_slice(identity),
            email: email_start + 1..email_end,
            timestamp,
            timezone: timezone.to_string(),
        })
    }
}

/// Parse a `+hhmm` / `-hhmm` timezone
fn parse_offset(value: &str) -> OdbResult<FixedOffset> {
    let invalid = || OdbError::format(format!("invalid timezone: {value}"));

    let (sign, digits) = match value.split_at_checked(1) {
        Some(("+", digits)) => (1, digits),
        Some(("-", digits)) => (-1, digits),
        _ => return Err(invalid()),
    };
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let hours: i32 = digits[..2].parse().map_err(|_| invalid())?;
    let minutes: i32 = digits[2..].parse().map_err(|_| invalid())?;

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

/// Git commit object
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Commit {
    /// Parent commit IDs (empty for a root commit, several for merges)
    parents: Vec<ObjectId>,
    tree_oid: ObjectId,
    author: Author,
    committer: Author,
    /// Headers after `committer`, kept in their original order
    extra_headers: Vec<(String, Bytes)>,
    /// Message, verbatim (including its trailing newline, if any)
    message: Bytes,
}

impl Commit {
    pub fn new(
        parents: Vec<ObjectId>,
        tree_oid: ObjectId,
        author: Author,
        committer: Author,
        message: String,
    ) -> Self {
        Commit {
            parents,
            tree_oid,
            author,
            committer,
            extra_headers: Vec::new(),
            message: Bytes::from(message),
        }
    }

    pub fn with_extra_headers(mut self, headers: Vec<(String, Bytes)>) -> Self {
        self.extra_headers = headers;
        self
    }

    /// First line of the commit message
    pub fn short_message(&self) -> String {
        self.message().lines().next().unwrap_or("").to_string()
    }

    pub fn message(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.message)
    }

    /// Message bytes, in the charset named by `encoding()`
    pub fn raw_message(&self) -> &[u8] {
        &self.message
    }

    /// Value of the `encoding` header; absent means UTF-8
    pub fn encoding(&self) -> Option<Cow<'_, str>> {
        self.extra_headers
            .iter()
            .find(|(key, _)| key == "encoding")
            .map(|(_, value)| String::from_utf8_lossy(value))
    }

    pub fn tree_oid(&self) -> &ObjectId {
        &self.tree_oid
    }

    pub fn parents(&self) -> &[ObjectId] {
        &self.parents
    }

    pub fn parent(&self) -> Option<&ObjectId> {
        self.parents.first()
    }

    pub fn author(&self) -> &Author {
        &self.author
    }

    pub fn committer(&self) -> &Author {
        &self.committer
    }

    pub fn extra_headers(&self) -> &[(String, Bytes)] {
        &self.extra_headers
    }

    fn render(&self) -> Vec<u8> {
        let tree = self.tree_oid.to_string();
        let parents = self.parents.iter().map(ObjectId::to_string).collect::<Vec<_>>();
        let author = self.author.encode();
        let committer = self.committer.encode();

        let mut lines: Vec<(&str, &[u8])> = vec![("tree", tree.as_bytes())];
        lines.extend(parents.iter().map(|parent| ("parent", parent.as_bytes())));
        lines.push(("author", author.as_slice()));
        lines.push(("committer", committer.as_slice()));
        lines.extend(
            self.extra_headers
                .iter()
                .map(|(key, value)| (key.as_str(), &value[..])),
        );

        headers::render(&lines, &self.message)
    }
}

impl Packable for Commit {
    fn serialize(&self) -> OdbResult<Bytes> {
        Ok(Bytes::from(self.render()))
    }
}

impl Unpackable for Commit {
    fn deserialize(mut reader: impl BufRead) -> OdbResult<Self> {
        let mut body = Vec::new();
        reader
            .read_to_end(&mut body)
            .map_err(|e| OdbError::format(format!("unreadable commit: {e}")))?;

        let (parsed, message) = headers::parse(&body)?;
        let mut parsed = parsed.into_iter().peekable();

        let tree_oid = headers::take_next(&mut parsed, "tree")
            .ok_or_else(|| OdbError::format("commit is missing its tree"))?;
        let tree_oid = headers::parse_oid(&tree_oid, "tree")?;

        let mut parents = Vec::new();
        while let Some(parent) = headers::take_next(&mut parsed, "parent") {
            parents.push(headers::parse_oid(&parent, "parent")?);
        }

        let author = headers::take_next(&mut parsed, "author")
            .ok_or_else(|| OdbError::format("commit is missing its author"))?;
        let committer = headers::take_next(&mut parsed, "committer")
            .ok_or_else(|| OdbError::format("commit is missing its committer"))?;

        Ok(Commit {
            parents,
            tree_oid,
            author: Author::try_from(&author[..])?,
            committer: Author::try_from(&committer[..])?,
            extra_headers: parsed.collect(),
            message,
        })
    }
}

impl Object for Commit {
    fn object_type(&self) -> ObjectType {
        ObjectType::Commit
    }

    fn display(&self) -> String {
        String::from_utf8_lossy(&self.render()).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use rstest::rstest;
    use std::io::Cursor;

    const MERGE: &str = "tree 4b825dc642cb6eb9a060e54bf8d69288fbee4904\n\
        parent ce013625030ba8dba906f756967f9e9ca394464a\n\
        parent e69de29bb2d1d6434b8b29ae775ad8c2e48c5391\n\
        author A U Thor <author@example.com> 1112911993 -0700\n\
        committer C O Mitter <committer@example.com> 1112912053 +0530\n\
        encoding ISO-8859-1\n\
        \n\
        Merge branches\n\
        \n\
        With a body.\n";

    #[test]
    fn decodes_every_header() {
        let commit = Commit::deserialize(Cursor::new(MERGE.as_bytes())).unwrap();

        assert_eq!(
            commit.tree_oid().to_string(),
            "4b825dc642cb6eb9a060e54bf8d69288fbee4904"
        );
        assert_eq!(commit.parents().len(), 2);
        assert_eq!(commit.author().name(), "A U Thor");
        assert_eq!(commit.author().email(), "author@example.com");
        assert_eq!(commit.author().timestamp().timestamp(), 1112911993);
        assert_eq!(commit.author().timestamp().offset().local_minus_utc(), -7 * 3600);
        assert_eq!(
            commit.committer().timestamp().offset().local_minus_utc(),
            5 * 3600 + 30 * 60
        );
        assert_eq!(
            commit.extra_headers(),
            &[("encoding".to_string(), Bytes::from_static(b"ISO-8859-1"))]
        );
        assert_eq!(commit.encoding().as_deref(), Some("ISO-8859-1"));
        assert_eq!(commit.short_message(), "Merge branches");
    }

    #[test]
    fn reencodes_byte_for_byte() {
        let commit = Commit::deserialize(Cursor::new(MERGE.as_bytes())).unwrap();

        assert_eq!(commit.serialize().unwrap().as_ref(), MERGE.as_bytes());
    }

    const SIGNED: &[u8] = b"tree 4b825dc642cb6eb9a060e54bf8d69288fbee4904\n\
        author A U Thor <author@example.com> 1112911993 -0000\n\
        committer  <nameless@example.com> 1112912053 +0000\n\
        gpgsig -----BEGIN PGP SIGNATURE-----\n \n iQEzBAABCAAdFiEE\n =abcd\n -----END PGP SIGNATURE-----\n\
        \n\
        Signed\n";

    const LATIN1: &[u8] = b"tree 4b825dc642cb6eb9a060e54bf8d69288fbee4904\n\
        author Andr\xe9 <andre@example.com> 1112911993 +0100\n\
        committer Andr\xe9 <andre@example.com> 1112911993 +0100\n\
        encoding ISO-8859-1\n\
        \n\
        caf\xe9\n";

    #[rstest]
    #[case::merge(MERGE.as_bytes())]
    #[case::signed_with_negative_zero_zone(SIGNED)]
    #[case::legacy_charset(LATIN1)]
    #[case::no_message(b"tree 4b825dc642cb6eb9a060e54bf8d69288fbee4904\nauthor a <a> 0 +0000\ncommitter a <a> 0 +0000\n\n")]
    fn git_bodies_reencode_exactly(#[case] body: &[u8]) {
        let commit = Commit::deserialize(Cursor::new(body)).unwrap();

        assert_eq!(commit.serialize().unwrap().as_ref(), body);
    }

    #[test]
    fn identities_keep_their_spelling() {
        let commit = Commit::deserialize(Cursor::new(SIGNED)).unwrap();

        assert_eq!(commit.author().timestamp().offset().local_minus_utc(), 0);
        assert_eq!(commit.author().encode(), b"A U Thor <author@example.com> 1112911993 -0000");
        assert_eq!(commit.committer().name(), "");
        assert_eq!(commit.committer().email(), "nameless@example.com");

        let latin1 = Commit::deserialize(Cursor::new(LATIN1)).unwrap();
        assert_eq!(latin1.raw_message(), b"caf\xe9\n");
        assert_eq!(latin1.author().email(), "andre@example.com");
    }

    proptest! {
        #[test]
        fn generated_commits_reencode_exactly(
            name in "[^<>\n]{0,12}",
            email in "[a-z.@]{0,12}",
            seconds in 0i64..4_000_000_000,
            sign in "[+-]",
            hours in 0u32..15,
            minutes in prop::sample::select(vec![0u32, 15, 30, 45]),
            signature in prop::option::of("[A-Za-z0-9+/=\n]{1,40}"),
            message in proptest::collection::vec(any::<u8>(), 0..64),
        ) {
            let mut body = format!(
                "tree 4b825dc642cb6eb9a060e54bf8d69288fbee4904\n\
                author {name} <{email}> {seconds} {sign}{hours:02}{minutes:02}\n\
                committer {name} <{email}> {seconds} {sign}{hours:02}{minutes:02}\n"
            )
            .into_bytes();
            if let Some(signature) = signature {
                body.extend_from_slice(b"gpgsig ");
                body.extend_from_slice(signature.replace('\n', "\n ").as_bytes());
                body.push(b'\n');
            }
            body.push(b'\n');
            body.extend_from_slice(&message);

            let commit = Commit::deserialize(Cursor::new(body.as_slice())).unwrap();
            prop_assert_eq!(commit.serialize().unwrap().to_vec(), body);
        }
    }

    #[rstest]
    #[case("tree nothex\nauthor a <a> 0 +0000\ncommitter a <a> 0 +0000\n\nm")]
    #[case("author a <a> 0 +0000\ncommitter a <a> 0 +0000\n\nm")]
    #[case("tree 4b825dc642cb6eb9a060e54bf8d69288fbee4904\ncommitter a <a> 0 +0000\n\nm")]
    #[case("tree 4b825dc642cb6eb9a060e54bf8d69288fbee4904\nauthor a <a> 0 0000\ncommitter a <a> 0 +0000\n\nm")]
    fn malformed_commits_are_format_errors(#[case] body: &str) {
        let result = Commit::deserialize(Cursor::new(body.as_bytes()));

        assert!(matches!(result, Err(OdbError::Format(_))), "{result:?}");
    }

    #[rstest]
    #[case("+0000", 0)]
    #[case("-0130", -5400)]
    #[case("+1400", 14 * 3600)]
    fn parses_timezones(#[case] value: &str, #[case] seconds: i32) {
        assert_eq!(parse_offset(value).unwrap().local_minus_utc(), seconds);
    }
}
