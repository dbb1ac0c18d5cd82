//! Header block shared by commits and tags
//!
//! ```text
//! <key> <value>
//! <key> <value line 1>
//!  <value line 2>          (continuation lines start with a single space)
//!
//! <message, verbatim>
//! ```
//!
//! Values and messages are raw bytes. A commit with an `encoding` header may
//! carry text in any charset, so nothing past the header keys is assumed to
//! be UTF-8.

use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::{OdbError, OdbResult};
use bytes::Bytes;

pub(crate) type Headers = Vec<(String, Bytes)>;

/// Split a commit or tag body into its ordered headers and verbatim message
pub(crate) fn parse(body: &[u8]) -> OdbResult<(Headers, Bytes)> {
    let (block, message) = match body.windows(2).position(|pair| pair == b"\n\n") {
        Some(split) => (&body[..split], &body[split + 2..]),
        None => (body.strip_suffix(b"\n").unwrap_or(body), &[][..]),
    };

    let mut headers: Vec<(String, Vec<u8>)> = Vec::new();
    for line in block.split(|byte| *byte == b'\n') {
        if let Some(continuation) = line.strip_prefix(b" ") {
            let (_, value) = headers
                .last_mut()
                .ok_or_else(|| OdbError::format("continuation line without a header"))?;
            value.push(b'\n');
            value.extend_from_slice(continuation);
            continue;
        }

        let space = line.iter().position(|byte| *byte == b' ').ok_or_else(|| {
            OdbError::format(format!(
                "malformed header line: {}",
                String::from_utf8_lossy(line)
            ))
        })?;
        let key = std::str::from_utf8(&line[..space])
            .map_err(|_| OdbError::format("header key is not ASCII"))?;
        headers.push((key.to_string(), line[space + 1..].to_vec()));
    }

    let headers = headers
        .into_iter()
        .map(|(key, value)| (key, Bytes::from(value)))
        .collect();

    Ok((headers, Bytes::copy_from_slice(message)))
}

/// Render headers followed by a blank line and the message
pub(crate) fn render(headers: &[(&str, &[u8])], message: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();

    for (key, value) in headers {
        body.extend_from_slice(key.as_bytes());
        body.push(b' ');
        for byte in value.iter() {
            body.push(*byte);
            if *byte == b'\n' {
                body.push(b' ');
            }
        }
        body.push(b'\n');
    }
    body.push(b'\n');
    body.extend_from_slice(message);

    body
}

/// Take the first header named `key`, if it is the next one
pub(crate) fn take_next(
    headers: &mut std::iter::Peekable<std::vec::IntoIter<(String, Bytes)>>,
    key: &str,
) -> Option<Bytes> {
    match headers.peek() {
        Some((next_key, _)) if next_key == key => headers.next().map(|(_, value)| value),
        _ => None,
    }
}

/// A header value that must be text, such as an id or a type name
pub(crate) fn text<'a>(value: &'a [u8], header: &str) -> OdbResult<&'a str> {
    std::str::from_utf8(value)
        .map_err(|_| OdbError::format(format!("{header} header is not valid UTF-8")))
}

/// Parse an id embedded in a body; a bad id means the body is malformed
pub(crate) fn parse_oid(value: &[u8], header: &str) -> OdbResult<ObjectId> {
    let value = text(value, header)?;
    ObjectId::try_parse(value)
        .map_err(|_| OdbError::format(format!("invalid {header} id: {value}")))
}
