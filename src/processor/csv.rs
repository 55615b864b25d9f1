use bytes::BytesMut;
use mime::Mime;
use serde_json::Value;

use super::{value_kind, ProcessError, ResponseProcessor};

/// Writes payloads as CSV.
///
/// A string is written as a single line, an array of scalars as one record, and an array of
/// arrays or objects as one record per element (object values in key order). A single object
/// becomes one record of its values.
#[derive(Debug, Clone)]
pub struct Csv {
    delimiter: u8,
    content_type: Mime,
}

impl Csv {
    /// Constructs a comma separated processor.
    pub fn new() -> Self {
        Csv {
            delimiter: b',',
            content_type: mime::TEXT_CSV,
        }
    }

    /// Sets the field delimiter, e.g. `b'\t'`.
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Overrides the `Content-Type` of produced responses.
    pub fn with_content_type(mut self, content_type: Mime) -> Self {
        self.content_type = content_type;
        self
    }
}

impl Default for Csv {
    fn default() -> Self {
        Csv::new()
    }
}

impl ResponseProcessor for Csv {
    fn can_process(&self, media_range: &str, _language: &str) -> bool {
        media_range.eq_ignore_ascii_case("text/csv") || media_range.eq_ignore_ascii_case("text/*")
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
        let mut wtr = ::csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .terminator(::csv::Terminator::Any(b'\n'))
            .has_headers(false)
            .flexible(true)
            .from_writer(Vec::new());

        match data {
            Value::Array(items) if items.is_empty() => {}
            Value::Array(items) if items.iter().all(is_record) => {
                for item in items {
                    wtr.write_record(record(item))
                        .map_err(ProcessError::Csv)?;
                }
            }
            Value::Array(items) => {
                if let Some(nested) = items.iter().find(|item| is_record(item)) {
                    return Err(ProcessError::Unsupported {
                        content_type: "text/csv",
                        kind: value_kind(nested),
                    });
                }
                wtr.write_record(items.iter().map(cell))
                    .map_err(ProcessError::Csv)?;
            }
            other => {
                wtr.write_record(record(other)).map_err(ProcessError::Csv)?;
            }
        }

        let bytes = wtr
            .into_inner()
            .map_err(|err| ProcessError::Csv(err.into_error().into()))?;
        out.extend_from_slice(&bytes);

        Ok(())
    }
}

fn is_record(value: &Value) -> bool {
    matches!(value, Value::Array(_) | Value::Object(_))
}

fn record(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().map(cell).collect(),
        Value::Object(map) => map.values().map(cell).collect(),
        scalar => vec![cell(scalar)],
    }
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn render(processor: &Csv, data: Value) -> String {
        let mut out = BytesMut::new();
        processor.process(&mut out, "", &data).unwrap();
        String::from_utf8(out.to_vec()).unwrap()
    }

    #[test]
    fn accepted_media_types() {
        let p = Csv::new();
        assert!(p.can_process("text/csv", ""));
        assert!(p.can_process("text/*", ""));
        assert!(!p.can_process("text/plain", ""));
    }

    #[test]
    fn writes_records() {
        let p = Csv::new();
        assert_eq!(render(&p, json!("Joe Bloggs")), "Joe Bloggs\n");
        assert_eq!(render(&p, json!(["Red", "Green", "Blue"])), "Red,Green,Blue\n");
        assert_eq!(
            render(&p, json!([["Red", "Green", "Blue"], ["Cyan", "Magenta", "Yellow"]])),
            "Red,Green,Blue\nCyan,Magenta,Yellow\n"
        );
        assert_eq!(render(&p, json!([101, -5, 42])), "101,-5,42\n");
        assert_eq!(render(&p, json!([[101, 42], [39, 7]])), "101,42\n39,7\n");
    }

    #[test]
    fn objects_and_quoting() {
        let p = Csv::new();
        assert_eq!(
            render(&p, json!({ "a": "x,y", "b": 9, "c": true })),
            "\"x,y\",9,true\n"
        );
        assert_eq!(
            render(&p, json!([{ "a": "x", "b": 9 }, { "a": "y", "b": 7 }])),
            "x,9\ny,7\n"
        );
    }

    #[test]
    fn tab_delimited() {
        let p = Csv::new().with_delimiter(b'\t');
        assert_eq!(
            render(&p, json!([["Red", "Green"], ["Cyan", "Magenta"]])),
            "Red\tGreen\nCyan\tMagenta\n"
        );
    }

    #[test]
    fn mixed_arrays_are_rejected() {
        let mut out = BytesMut::new();
        let err = Csv::new()
            .process(&mut out, "", &json!(["a", ["b"]]))
            .unwrap_err();
        assert!(matches!(err, ProcessError::Unsupported { kind: "array", .. }));
    }
}
