//! Copying parts of the selected record to the terminal clipboard.
//!
//! Text is delivered with an OSC 52 escape, which most terminal emulators
//! (and tmux with `set-clipboard on`) forward to the system clipboard, also
//! over SSH.

use std::io::Write;

use base64::prelude::BASE64_STANDARD;
use base64::Engine;

use crate::error::{Result, ViewerError};
use crate::model::Record;

/// What to copy from a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyAction {
    /// The decoded payload text
    Content,
    /// Base64 of the original bytes, or the content when there are none
    RawBinary,
    TypeName,
    TypeId,
    /// Two-line `//` comment naming the packet, for pasting into code
    HeaderComment,
}

impl CopyAction {
    pub fn label(self) -> &'static str {
        match self {
            CopyAction::Content => "content",
            CopyAction::RawBinary => "raw binary",
            CopyAction::TypeName => "type name",
            CopyAction::TypeId => "type id",
            CopyAction::HeaderComment => "header comment",
        }
    }
}

/// The text `action` produces for `record`.
pub fn copy_text(action: CopyAction, record: &Record) -> String {
    match action {
        CopyAction::Content => record.content.clone(),
        CopyAction::RawBinary => record
            .raw_binary
            .clone()
            .unwrap_or_else(|| record.content.clone()),
        CopyAction::TypeName => record.type_name.clone(),
        CopyAction::TypeId => record.type_id.to_string(),
        CopyAction::HeaderComment => format!(
            "// {}\n// packet id {}, {} -> {}",
            record.type_name,
            record.type_id,
            record.origin,
            record.origin.opposite()
        ),
    }
}

/// Write `text` to `out` as an OSC 52 clipboard request.
pub fn write_osc52<W: Write>(out: &mut W, text: &str) -> Result<()> {
    let encoded = BASE64_STANDARD.encode(text.as_bytes());
    write!(out, "\x1b]52;c;{encoded}\x07")
        .and_then(|()| out.flush())
        .map_err(|e| ViewerError::Clipboard(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Origin;

    fn record() -> Record {
        let mut record = Record::undecoded(5, Origin::Client, 4, 0.0);
        record.type_name = "PingReq".to_string();
        record.content = r#"{"seq":1}"#.to_string();
        record
    }

    #[test]
    fn test_copy_fields() {
        let record = record();
        assert_eq!(copy_text(CopyAction::Content, &record), r#"{"seq":1}"#);
        assert_eq!(copy_text(CopyAction::TypeName, &record), "PingReq");
        assert_eq!(copy_text(CopyAction::TypeId, &record), "5");
        assert_eq!(
            copy_text(CopyAction::HeaderComment, &record),
            "// PingReq\n// packet id 5, client -> server"
        );
    }

    #[test]
    fn test_raw_binary_falls_back_to_content() {
        let mut record = record();
        assert_eq!(copy_text(CopyAction::RawBinary, &record), r#"{"seq":1}"#);

        record.raw_binary = Some("AAEC".to_string());
        assert_eq!(copy_text(CopyAction::RawBinary, &record), "AAEC");
    }

    #[test]
    fn test_osc52_sequence() {
        let mut out = Vec::new();
        write_osc52(&mut out, "hi").unwrap();
        assert_eq!(out, b"\x1b]52;c;aGk=\x07");
    }
}
