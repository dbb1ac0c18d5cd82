//! The `packed-refs` file
//!
//! ```text
//! # pack-refs with: peeled fully-peeled sorted
//! <40 hex> refs/heads/main
//! <40 hex> refs/tags/v1.0
//! ^<40 hex>                  peeled target of the annotated tag above
//! ```
//!
//! Lines are parsed one at a time rather than by fixed offsets into the text.

use crate::artifacts::objects::OBJECT_ID_LENGTH;
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::{OdbError, OdbResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedRef {
    pub name: String,
    pub oid: ObjectId,
    /// Object an annotated tag ultimately points at
    pub peeled: Option<ObjectId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackedRefs {
    refs: Vec<PackedRef>,
}

impl PackedRefs {
    pub fn parse(text: &str) -> OdbResult<Self> {
        let mut refs: Vec<PackedRef> = Vec::new();

        for (number, line) in text.lines().enumerate() {
            let line = line.trim_end();
            let malformed =
                |reason: &str| OdbError::format(format!("packed-refs line {}: {reason}", number + 1));

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(peeled) = line.strip_prefix('^') {
                let previous = refs
                    .last_mut()
                    .ok_or_else(|| malformed("peeled line without a ref"))?;
                let peeled =
                    ObjectId::try_parse(peeled).map_err(|_| malformed("invalid peeled id"))?;
                previous.peeled = Some(peeled);
                continue;
            }

            let (hash, name) = line
                .split_at_checked(OBJECT_ID_LENGTH)
                .ok_or_else(|| malformed("line is too short"))?;
            let name = name
                .strip_prefix(' ')
                .filter(|name| !name.is_empty())
                .ok_or_else(|| malformed("expected `<id> <name>`"))?;
            let oid = ObjectId::try_parse(hash).map_err(|_| malformed("invalid object id"))?;

            refs.push(PackedRef {
                name: name.to_string(),
                oid,
                peeled: None,
            });
        }

        Ok(PackedRefs { refs })
    }

    pub fn find(&self, name: &str) -> Option<&PackedRef> {
        self.refs.iter().find(|packed| packed.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PackedRef> {
        self.refs.iter()
    }

    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }
}
