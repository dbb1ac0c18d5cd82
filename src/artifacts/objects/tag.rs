//! Git annotated tag object
//!
//! ## Format
//!
//! ```text
//! tag <size>\0
//! object <target-sha>
//! type <target-type>
//! tag <name>
//! tagger <name> <email> <timestamp> <timezone>
//!
//! <message, including any signature block>
//! ```
//!
//! Very old tags carry no `tagger` line, so it is optional.

use crate::artifacts::objects::commit::Author;
use crate::artifacts::objects::headers;
use crate::artifacts::objects::object::{Object, Packable, Unpackable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::errors::{OdbError, OdbResult};
use bytes::Bytes;
use std::borrow::Cow;
use std::io::BufRead;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Tag {
    target: ObjectId,
    target_type: ObjectType,
    name: Bytes,
    tagger: Option<Author>,
    extra_headers: Vec<(String, Bytes)>,
    message: Bytes,
}

impl Tag {
    pub fn new(
        target: ObjectId,
        target_type: ObjectType,
        name: String,
        tagger: Option<Author>,
        message: String,
    ) -> Self {
        Tag {
            target,
            target_type,
            name: Bytes::from(name),
            tagger,
            extra_headers: Vec::new(),
            message: Bytes::from(message),
        }
    }

    pub fn target(&self) -> &ObjectId {
        &self.target
    }

    pub fn target_type(&self) -> ObjectType {
        self.target_type
    }

    pub fn name(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.name)
    }

    pub fn tagger(&self) -> Option<&Author> {
        self.tagger.as_ref()
    }

    pub fn extra_headers(&self) -> &[(String, Bytes)] {
        &self.extra_headers
    }

    pub fn message(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.message)
    }

    pub fn raw_message(&self) -> &[u8] {
        &self.message
    }

    fn render(&self) -> Vec<u8> {
        let target = self.target.to_string();
        let tagger = self.tagger.as_ref().map(Author::encode);

        let mut lines: Vec<(&str, &[u8])> = vec![
            ("object", target.as_bytes()),
            ("type", self.target_type.as_str().as_bytes()),
            ("tag", &self.name[..]),
        ];
        if let Some(tagger) = &tagger {
            lines.push(("tagger", tagger.as_slice()));
        }
        lines.extend(
            self.extra_headers
                .iter()
                .map(|(key, value)| (key.as_str(), &value[..])),
        );

        headers::render(&lines, &self.message)
    }
}

impl Packable for Tag {
    fn serialize(&self) -> OdbResult<Bytes> {
        Ok(Bytes::from(self.render()))
    }
}

impl Unpackable for Tag {
    fn deserialize(mut reader: impl BufRead) -> OdbResult<Self> {
        let mut body = Vec::new();
        reader
            .read_to_end(&mut body)
            .map_err(|e| OdbError::format(format!("unreadable tag: {e}")))?;

        let (parsed, message) = headers::parse(&body)?;
        let mut parsed = parsed.into_iter().peekable();

        let target = headers::take_next(&mut parsed, "object")
            .ok_or_else(|| OdbError::format("tag is missing its object"))?;
        let target_type = headers::take_next(&mut parsed, "type")
            .ok_or_else(|| OdbError::format("tag is missing its type"))?;
        let name = headers::take_next(&mut parsed, "tag")
            .ok_or_else(|| OdbError::format("tag is missing its name"))?;
        let tagger = headers::take_next(&mut parsed, "tagger")
            .map(|tagger| Author::try_from(&tagger[..]))
            .transpose()?;

        Ok(Tag {
            target: headers::parse_oid(&target, "object")?,
            target_type: ObjectType::try_from(headers::text(&target_type, "type")?)?,
            name,
            tagger,
            extra_headers: parsed.collect(),
            message,
        })
    }
}

impl Object for Tag {
    fn object_type(&self) -> ObjectType {
        ObjectType::Tag
    }

    fn display(&self) -> String {
        String::from_utf8_lossy(&self.render()).into_owned()
    }
}
