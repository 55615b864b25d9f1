use bytes::{BufMut as _, BytesMut};
use mime::Mime;
use quick_xml::{
    events::{BytesEnd, BytesStart, BytesText, Event},
    Writer,
};
use serde_json::Value;

use super::{ProcessError, ResponseProcessor};

/// Writes payloads as XML.
///
/// The payload is wrapped in a root element (`<data>` by default). Object keys become child
/// elements and array elements are written as repeated `<item>` elements. Keys that are not valid
/// XML names are an error.
#[derive(Debug, Clone)]
pub struct Xml {
    root: String,
    indent: Option<usize>,
    content_type: Mime,
}

impl Xml {
    /// Constructs a processor writing compact XML as `text/xml`.
    pub fn new() -> Self {
        Xml {
            root: "data".to_owned(),
            indent: None,
            content_type: mime::TEXT_XML,
        }
    }

    /// Indents nested elements by `spaces`.
    pub fn indented(mut self, spaces: usize) -> Self {
        self.indent = Some(spaces);
        self
    }

    /// Sets the name of the root element.
    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into();
        self
    }

    /// Overrides the `Content-Type` of produced responses.
    pub fn with_content_type(mut self, content_type: Mime) -> Self {
        self.content_type = content_type;
        self
    }
}

impl Default for Xml {
    fn default() -> Self {
        Xml::new()
    }
}

impl ResponseProcessor for Xml {
    fn can_process(&self, media_range: &str, _language: &str) -> bool {
        let media_range = media_range.to_ascii_lowercase();
        media_range.contains("/xml") || media_range.ends_with("+xml")
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
        let mut writer = match self.indent {
            Some(spaces) => Writer::new_with_indent(Vec::new(), b' ', spaces),
            None => Writer::new(Vec::new()),
        };

        write_element(&mut writer, &self.root, data)?;

        out.extend_from_slice(&writer.into_inner());
        out.put_u8(b'\n');
        Ok(())
    }
}

fn write_element(
    writer: &mut Writer<Vec<u8>>,
    name: &str,
    value: &Value,
) -> Result<(), ProcessError> {
    if !is_valid_name(name) {
        return Err(ProcessError::Xml(format!("invalid element name {name:?}")));
    }

    match value {
        Value::Null => emit(writer, Event::Empty(BytesStart::new(name))),
        Value::Array(items) if items.is_empty() => {
            emit(writer, Event::Empty(BytesStart::new(name)))
        }
        Value::Object(map) if map.is_empty() => emit(writer, Event::Empty(BytesStart::new(name))),

        Value::Array(items) => {
            emit(writer, Event::Start(BytesStart::new(name)))?;
            for item in items {
                write_element(writer, "item", item)?;
            }
            emit(writer, Event::End(BytesEnd::new(name)))
        }

        Value::Object(map) => {
            emit(writer, Event::Start(BytesStart::new(name)))?;
            for (key, item) in map {
                write_element(writer, key, item)?;
            }
            emit(writer, Event::End(BytesEnd::new(name)))
        }

        scalar => {
            let text = match scalar {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };

            emit(writer, Event::Start(BytesStart::new(name)))?;
            emit(writer, Event::Text(BytesText::new(&text)))?;
            emit(writer, Event::End(BytesEnd::new(name)))
        }
    }
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), ProcessError> {
    writer
        .write_event(event)
        .map_err(|err| ProcessError::Xml(err.to_string()))
}

/// Accepts a conservative subset of XML names: ASCII letters or `_` first, then letters, digits,
/// `-`, `_` or `.`.
fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();

    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }

    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}
