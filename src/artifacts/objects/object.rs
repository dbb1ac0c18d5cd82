use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::tag::Tag;
use crate::artifacts::objects::tree::Tree;
use crate::errors::{OdbError, OdbResult};
use bytes::Bytes;
use std::io::{BufRead, Cursor};

/// Encodes an object's body (without the framing header)
pub trait Packable {
    fn serialize(&self) -> OdbResult<Bytes>;
}

/// Decodes an object's body (the framing header has already been consumed)
pub trait Unpackable {
    fn deserialize(reader: impl BufRead) -> OdbResult<Self>
    where
        Self: Sized;
}

pub trait Object: Packable {
    fn object_type(&self) -> ObjectType;

    fn display(&self) -> String;

    fn framed(&self) -> OdbResult<Bytes> {
        Ok(frame(self.object_type(), &self.serialize()?))
    }

    fn object_id(&self) -> OdbResult<ObjectId> {
        Ok(ObjectId::hash(&self.framed()?))
    }
}

/// Produce the canonical `<type> <len>\0<body>` byte sequence
pub fn frame(object_type: ObjectType, body: &[u8]) -> Bytes {
    let header = format!("{} {}\0", object_type.as_str(), body.len());

    let mut framed = Vec::with_capacity(header.len() + body.len());
    framed.extend_from_slice(header.as_bytes());
    framed.extend_from_slice(body);

    Bytes::from(framed)
}

/// Split framed bytes into their type and body, validating the header
///
/// The declared length must match the number of bytes after the NUL exactly.
pub fn deframe(data: &Bytes) -> OdbResult<(ObjectType, Bytes)> {
    let mut reader = Cursor::new(data.as_ref());
    let (object_type, size) = ObjectType::parse_header(&mut reader)?;

    let body_start = reader.position() as usize;
    let body_len = data.len() - body_start;
    if body_len != size {
        return Err(OdbError::format(format!(
            "{object_type} declares {size} bytes but carries {body_len}"
        )));
    }

    Ok((object_type, data.slice(body_start..)))
}

/// A decoded object of any type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectBox {
    Blob(Box<Blob>),
    Tree(Box<Tree>),
    Commit(Box<Commit>),
    Tag(Box<Tag>),
}

impl ObjectBox {
    /// Decode a body with the decoder of the given type
    pub fn decode(object_type: ObjectType, body: &[u8]) -> OdbResult<Self> {
        let reader = Cursor::new(body);

        Ok(match object_type {
            ObjectType::Blob => ObjectBox::Blob(Box::new(Blob::deserialize(reader)?)),
            ObjectType::Tree => ObjectBox::Tree(Box::new(Tree::deserialize(reader)?)),
            ObjectType::Commit => ObjectBox::Commit(Box::new(Commit::deserialize(reader)?)),
            ObjectType::Tag => ObjectBox::Tag(Box::new(Tag::deserialize(reader)?)),
        })
    }
}

impl Packable for ObjectBox {
    fn serialize(&self) -> OdbResult<Bytes> {
        match self {
            ObjectBox::Blob(blob) => blob.serialize(),
            ObjectBox::Tree(tree) => tree.serialize(),
            ObjectBox::Commit(commit) => commit.serialize(),
            ObjectBox::Tag(tag) => tag.serialize(),
        }
    }
}

impl Object for ObjectBox {
    fn object_type(&self) -> ObjectType {
        match self {
            ObjectBox::Blob(_) => ObjectType::Blob,
            ObjectBox::Tree(_) => ObjectType::Tree,
            ObjectBox::Commit(_) => ObjectType::Commit,
            ObjectBox::Tag(_) => ObjectType::Tag,
        }
    }

    fn display(&self) -> String {
        match self {
            ObjectBox::Blob(blob) => blob.display(),
            ObjectBox::Tree(tree) => tree.display(),
            ObjectBox::Commit(commit) => commit.display(),
            ObjectBox::Tag(tag) => tag.display(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn frames_body_with_type_and_length() {
        let framed = frame(ObjectType::Blob, b"hello\n");

        assert_eq!(framed.as_ref(), b"blob 6\0hello\n");
        assert_eq!(
            ObjectId::hash(&framed).to_string(),
            "ce013625030ba8dba906f756967f9e9ca394464a"
        );
    }

    #[test]
    fn deframe_yields_type_and_body() {
        let framed = Bytes::from_static(b"commit 5\0hello");
        let (object_type, body) = deframe(&framed).unwrap();

        assert_eq!(object_type, ObjectType::Commit);
        assert_eq!(body.as_ref(), b"hello");
    }

    #[test]
    fn deframe_rejects_length_mismatch() {
        let too_long = Bytes::from_static(b"blob 3\0abcd");
        let too_short = Bytes::from_static(b"blob 5\0abcd");

        assert!(matches!(deframe(&too_long), Err(OdbError::Format(_))));
        assert!(matches!(deframe(&too_short), Err(OdbError::Format(_))));
    }

    #[test]
    fn deframe_rejects_missing_terminator() {
        let framed = Bytes::from_static(b"blob 4abcd");

        assert!(matches!(deframe(&framed), Err(OdbError::Format(_))));
    }

    #[test]
    fn boxed_object_frames_like_its_content() {
        let blob = Blob::new(Bytes::from_static(b"hello\n"));
        let boxed = ObjectBox::Blob(Box::new(blob.clone()));

        assert_eq!(boxed.object_id().unwrap(), blob.object_id().unwrap());
        assert_eq!(boxed.object_type(), ObjectType::Blob);
    }
}
