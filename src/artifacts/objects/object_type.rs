use crate::errors::{OdbError, OdbResult};
use std::io::BufRead;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Blob,
    Tree,
    Commit,
    Tag,
}

impl ObjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Blob => "blob",
            ObjectType::Tree => "tree",
            ObjectType::Commit => "commit",
            ObjectType::Tag => "tag",
        }
    }

    /// Parse a `<type> <length>\0` header, leaving the reader at the first body byte.
    ///
    /// The type word must be followed by a single space, the length must be a
    /// non-empty run of ASCII digits, and the header must end with a NUL.
    pub fn parse_header(data_reader: &mut impl BufRead) -> OdbResult<(ObjectType, usize)> {
        let mut object_type = Vec::new();
        data_reader
            .read_until(b' ', &mut object_type)
            .map_err(|e| OdbError::format(format!("unreadable object header: {e}")))?;
        if object_type.pop() != Some(b' ') || object_type.is_empty() {
            return Err(OdbError::format("object header is missing its type"));
        }

        let object_type = std::str::from_utf8(&object_type)
            .map_err(|_| OdbError::format("object type is not valid UTF-8"))?;
        let object_type = ObjectType::try_from(object_type)?;

        let mut size = Vec::new();
        data_reader
            .read_until(b'\0', &mut size)
            .map_err(|e| OdbError::format(format!("unreadable object header: {e}")))?;
        if size.pop() != Some(b'\0') {
            return Err(OdbError::format("object header is not NUL-terminated"));
        }
        if size.is_empty() || !size.iter().all(u8::is_ascii_digit) {
            return Err(OdbError::format("object length is not a decimal number"));
        }

        // digits only, so this is valid UTF-8
        let size = String::from_utf8_lossy(&size)
            .parse::<usize>()
            .map_err(|_| OdbError::format("object length overflows"))?;

        Ok((object_type, size))
    }
}

impl TryFrom<&str> for ObjectType {
    type Error = OdbError;

    fn try_from(value: &str) -> OdbResult<Self> {
        match value {
            "blob" => Ok(ObjectType::Blob),
            "tree" => Ok(ObjectType::Tree),
            "commit" => Ok(ObjectType::Commit),
            "tag" => Ok(ObjectType::Tag),
            _ => Err(OdbError::format(format!("invalid object type: {value}"))),
        }
    }
}

impl std::str::FromStr for ObjectType {
    type Err = OdbError;

    fn from_str(s: &str) -> OdbResult<Self> {
        ObjectType::try_from(s)
    }
}

impl std::fmt::Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
