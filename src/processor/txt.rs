use bytes::{BufMut as _, BytesMut};
use mime::Mime;
use serde_json::Value;

use super::{value_kind, ProcessError, ResponseProcessor};

/// Writes strings, numbers and booleans as `text/plain`.
///
/// Structured payloads are rejected with [`ProcessError::Unsupported`].
#[derive(Debug, Clone)]
pub struct Txt {
    content_type: Mime,
}

impl Txt {
    /// Constructs a processor writing `text/plain; charset=utf-8`.
    pub fn new() -> Self {
        Txt {
            content_type: mime::TEXT_PLAIN_UTF_8,
        }
    }

    /// Overrides the `Content-Type` of produced responses.
    pub fn with_content_type(mut self, content_type: Mime) -> Self {
        self.content_type = content_type;
        self
    }
}

impl Default for Txt {
    fn default() -> Self {
        Txt::new()
    }
}

impl ResponseProcessor for Txt {
    fn can_process(&self, media_range: &str, _language: &str) -> bool {
        media_range.eq_ignore_ascii_case("text/plain") || media_range.eq_ignore_ascii_case("text/*")
    }

    fn content_type(&self) -> Mime {
        self.content_type.clone()
    }

    fn process(
        &self,
        out: &mut BytesMut,
        _template: &str,
        data: &Value,
    ) -> Result<(), ProcessError> {
        match data {
            Value::String(text) => out.extend_from_slice(text.as_bytes()),
            Value::Number(_) | Value::Bool(_) => out.extend_from_slice(data.to_string().as_bytes()),
            other => {
                return Err(ProcessError::Unsupported {
                    content_type: "text/plain",
                    kind: value_kind(other),
                })
            }
        }

        out.put_u8(b'\n');
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn accepted_media_types() {
        let p = Txt::new();
        assert!(p.can_process("text/plain", ""));
        assert!(p.can_process("text/*", "en"));
        assert!(!p.can_process("text/html", ""));
        assert!(!p.can_process("application/json", ""));
    }

    #[test]
    fn writes_scalars_with_newline() {
        let p = Txt::new();
        for (data, expected) in [
            (json!("Joe Bloggs"), "Joe Bloggs\n"),
            (json!(42), "42\n"),
            (json!(true), "true\n"),
        ] {
            let mut out = BytesMut::new();
            p.process(&mut out, "", &data).unwrap();
            assert_eq!(&out[..], expected.as_bytes());
        }
    }

    #[test]
    fn rejects_structured_data() {
        let mut out = BytesMut::new();
        let err = Txt::new()
            .process(&mut out, "", &json!({ "a": 1 }))
            .unwrap_err();
        assert!(matches!(
            err,
            ProcessError::Unsupported { kind: "object", .. }
        ));
        assert!(out.is_empty());
    }

    #[test]
    fn content_type_override() {
        let p = Txt::new().with_content_type(mime::TEXT_HTML);
        assert_eq!(p.content_type(), mime::TEXT_HTML);
    }
}
