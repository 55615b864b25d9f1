use bytes::{BufMut as _, BytesMut};
use mime::Mime;
use serde::Serialize as _;
use serde_json::{ser::PrettyFormatter, Serializer, Value};

use super::{ProcessError, ResponseProcessor};

/// Writes payloads as JSON.
///
/// Handles `application/json`, `application/json-*` and any `+json` structured syntax suffix.
/// Output is dense by default and always ends with a newline.
#[derive(Debug, Clone)]
pub struct Json {
    indent: Option<String>,
    content_type: Mime,
}

impl Json {
    /// Constructs a processor writing dense JSON.
    pub fn new() -> Self {
        Json {
            indent: None,
            content_type: mime::APPLICATION_JSON,
        }
    }

    /// Constructs a processor writing JSON indented with `indent`.
    pub fn indented(indent: impl Into<String>) -> Self {
        Json {
            indent: Some(indent.into()),
            ..Json::new()
        }
    }

    /// Overrides the `Content-Type` of produced responses.
    pub fn with_content_type(mut self, content_type: Mime) -> Self {
        self.content_type = content_type;
        self
    }
}

impl Default for Json {
    fn default() -> Self {
        Json::new()
    }
}

impl ResponseProcessor for Json {
    fn can_process(&self, media_range: &str, _language: &str) -> bool {
        let media_range = media_range.to_ascii_lowercase();

        media_range == "application/json"
            || media_range.starts_with("application/json-")
            || media_range.ends_with("+json")
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
        match self.indent {
            Some(ref indent) => {
                let formatter = PrettyFormatter::with_indent(indent.as_bytes());
                let mut ser = Serializer::with_formatter((&mut *out).writer(), formatter);
                data.serialize(&mut ser).map_err(ProcessError::Json)?;
            }
            None => serde_json::to_writer((&mut *out).writer(), data).map_err(ProcessError::Json)?,
        }

        out.put_u8(b'\n');
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn render(processor: &Json, data: Value) -> String {
        let mut out = BytesMut::new();
        processor.process(&mut out, "", &data).unwrap();
        String::from_utf8(out.to_vec()).unwrap()
    }

    #[test]
    fn accepted_media_types() {
        let p = Json::new();
        for (media_range, expected) in [
            ("application/json", true),
            ("APPLICATION/JSON", true),
            ("application/json-patch", true),
            ("application/ld+json", true),
            ("application/*", false),
            ("text/json", false),
            ("application/xml", false),
        ] {
            assert_eq!(p.can_process(media_range, ""), expected, "{}", media_range);
        }
    }

    #[test]
    fn dense_output() {
        let out = render(&Json::new(), json!({ "Name": "Joe Bloggs" }));
        assert_eq!(out, "{\"Name\":\"Joe Bloggs\"}\n");
    }

    #[test]
    fn indented_output() {
        let out = render(&Json::indented("  "), json!({ "Name": "Joe Bloggs" }));
        assert_eq!(out, "{\n  \"Name\": \"Joe Bloggs\"\n}\n");
    }

    #[test]
    fn content_type_override() {
        let p = Json::new().with_content_type("application/vnd.api+json".parse().unwrap());
        assert_eq!(p.content_type().essence_str(), "application/vnd.api+json");
        assert_eq!(Json::new().content_type(), mime::APPLICATION_JSON);
    }
}
