//! The update messages the build watcher pushes to the viewer.
//!
//! Each message is a JSON object of the form `{"event": ..., "data": ...}`. We read them as JSON
//! lines, so a stream of updates is one message per line.

use crate::diff::RawDiffOperation;
use serde::{Deserialize, Serialize};
use std::io::BufRead;
use thiserror::Error;

/// A single update from the build watcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum Message {
    /// A rebuild has started.
    Building,
    /// A complete snapshot of the diff between the original and rebuilt binaries.
    Diff(Vec<RawDiffOperation>),
    /// The rebuilt binary matches the original.
    Match,
    /// The rebuild failed. Carries the build output.
    BuildError(String),
}

/// A message that could not be decoded.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Failed to read message on line {line}")]
    Read {
        line: usize,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid message on line {line}: {source}")]
    Malformed {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

impl DecodeError {
    /// Whether the rest of the stream can still be read after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, DecodeError::Malformed { .. })
    }
}

impl Message {
    /// Decode a single message from the raw bytes of one line.
    pub fn decode(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// Iterate over the messages in a JSON lines stream.
///
/// Blank lines are skipped. Line numbers in errors start at 1. Lines are split on raw bytes, so a
/// line that isn't valid UTF-8 is reported as malformed and the lines after it are still read.
pub fn read_messages<R: BufRead>(reader: R) -> impl Iterator<Item = Result<Message, DecodeError>> {
    reader
        .split(b'\n')
        .enumerate()
        .map(|(index, line)| (index + 1, line))
        .filter(|(_, line)| !matches!(line, Ok(bytes) if bytes.trim_ascii().is_empty()))
        .map(|(line, bytes)| {
            let bytes = bytes.map_err(|source| DecodeError::Read { line, source })?;
            Message::decode(&bytes).map_err(|source| DecodeError::Malformed { line, source })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;
    use test_case::test_case;

    #[test_case(r#"{"event": "building"}"#, Message::Building)]
    #[test_case(r#"{"event": "building", "data": null}"#, Message::Building)]
    #[test_case(r#"{"event": "match"}"#, Message::Match)]
    #[test_case(r#"{"event": "build_error", "data": "undefined reference"}"#, Message::BuildError("undefined reference".into()))]
    #[test_case(r#"{"event": "diff", "data": []}"#, Message::Diff(vec![]))]
    fn test_decode(input: &str, expected: Message) {
        assert_eq!(Message::decode(input.as_bytes()).unwrap(), expected);
    }

    #[test]
    fn test_decode_diff_keeps_raw_opcodes() {
        let msg = Message::decode(
            br#"{"event": "diff", "data": [
                {"opcode": "+", "type": "code", "address": 0, "size": 2, "text": "bx lr"}
            ]}"#,
        )
        .unwrap();
        let Message::Diff(ops) = msg else {
            panic!("expected a diff message");
        };
        assert_eq!(ops[0].opcode, "+");
        assert_eq!(ops[0].text, "bx lr");
    }

    #[test_case(r#"{"event": "reload"}"#)]
    #[test_case(r#"{"data": []}"#)]
    #[test_case("not json")]
    fn test_decode_invalid(input: &str) {
        assert!(Message::decode(input.as_bytes()).is_err());
    }

    #[test]
    fn test_read_messages() {
        let input = "{\"event\": \"building\"}\n\n   \nnope\n{\"event\": \"match\"}\n";
        let results: Vec<_> = read_messages(Cursor::new(input)).collect();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap(), &Message::Building);
        let err = results[1].as_ref().unwrap_err();
        assert!(err.is_recoverable());
        assert!(matches!(err, DecodeError::Malformed { line: 4, .. }));
        assert_eq!(results[2].as_ref().unwrap(), &Message::Match);
    }

    #[test]
    fn test_invalid_utf8_is_skipped() {
        let mut input = b"{\"event\": \"building\"}\n".to_vec();
        input.extend_from_slice(b"{\"event\": \"build_error\", \"data\": \"\xff\xfe\"}\r\n");
        input.extend_from_slice(b"{\"event\": \"match\"}");
        let results: Vec<_> = read_messages(Cursor::new(input)).collect();
        assert_eq!(results.len(), 3);
        let err = results[1].as_ref().unwrap_err();
        assert!(err.is_recoverable());
        assert!(matches!(err, DecodeError::Malformed { line: 2, .. }));
        assert_eq!(results[2].as_ref().unwrap(), &Message::Match);
    }
}
