//! Response processors: the encoders that write a negotiated payload.
//!
//! Four processors are provided: [`Json`], [`Xml`], [`Csv`] and [`Txt`]. Custom processors
//! implement [`ResponseProcessor`] and are registered with a [`Negotiator`] wrapped in a
//! [`Processor`], which also records whether the processor answers Ajax requests.
//!
//! [`Negotiator`]: crate::Negotiator

use std::{fmt, sync::Arc};

use bytes::BytesMut;
use derive_more::{Display, Error};
use mime::Mime;
use serde_json::Value;

mod csv;
mod json;
mod txt;
mod xml;

pub use self::csv::Csv;
pub use self::json::Json;
pub use self::txt::Txt;
pub use self::xml::Xml;

/// The contract for encoders taking part in content negotiation.
pub trait ResponseProcessor: Send + Sync {
    /// Returns true if this processor can produce the given media type (`type/subtype`, possibly
    /// a range such as `text/*`) in the given language (blank or `*` if any).
    fn can_process(&self, media_range: &str, language: &str) -> bool;

    /// The `Content-Type` of responses produced by this processor.
    fn content_type(&self) -> Mime;

    /// Writes `data` to `out`. Headers are set by the caller.
    fn process(&self, out: &mut BytesMut, template: &str, data: &Value) -> Result<(), ProcessError>;
}

/// A registered processor, tagged with its capabilities.
#[derive(Clone)]
pub enum Processor {
    /// A processor only chosen through regular negotiation.
    Standard(Arc<dyn ResponseProcessor>),

    /// A processor that also answers Ajax (`X-Requested-With: XMLHttpRequest`) requests,
    /// regardless of their `Accept` header.
    AjaxResponder(Arc<dyn ResponseProcessor>),
}

impl Processor {
    /// Wraps a processor that only takes part in regular negotiation.
    pub fn standard<P: ResponseProcessor + 'static>(processor: P) -> Self {
        Processor::Standard(Arc::new(processor))
    }

    /// Wraps a processor that also answers Ajax requests.
    pub fn ajax<P: ResponseProcessor + 'static>(processor: P) -> Self {
        Processor::AjaxResponder(Arc::new(processor))
    }

    /// Returns true if this processor answers Ajax requests.
    pub fn is_ajax_responder(&self) -> bool {
        matches!(self, Processor::AjaxResponder(_))
    }

    /// Returns the wrapped processor.
    pub fn get_ref(&self) -> &dyn ResponseProcessor {
        match self {
            Processor::Standard(processor) | Processor::AjaxResponder(processor) => {
                processor.as_ref()
            }
        }
    }
}

impl fmt::Debug for Processor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let variant = match self {
            Processor::Standard(_) => "Standard",
            Processor::AjaxResponder(_) => "AjaxResponder",
        };

        f.debug_tuple(variant)
            .field(&self.get_ref().content_type().essence_str())
            .finish()
    }
}

/// A JSON processor, registered as an Ajax responder.
pub fn json() -> Processor {
    Processor::ajax(Json::new())
}

/// An XML processor.
pub fn xml() -> Processor {
    Processor::standard(Xml::new())
}

/// A CSV processor.
pub fn csv() -> Processor {
    Processor::standard(Csv::new())
}

/// A plain text processor.
pub fn txt() -> Processor {
    Processor::standard(Txt::new())
}

/// Errors a processor can raise while writing a payload.
#[derive(Debug, Display, Error)]
#[non_exhaustive]
pub enum ProcessError {
    /// JSON serialization failed.
    #[display("JSON serialization failed: {_0}")]
    Json(serde_json::Error),

    /// XML serialization failed.
    #[display("XML serialization failed: {_0}")]
    Xml(#[error(not(source))] String),

    /// CSV serialization failed.
    #[display("CSV serialization failed: {_0}")]
    Csv(::csv::Error),

    /// The payload has a shape this processor cannot represent.
    #[display("cannot write {kind} as {content_type}")]
    Unsupported {
        /// The processor's media type.
        content_type: &'static str,

        /// The kind of value that was rejected, e.g. `object`.
        kind: &'static str,
    },
}

/// Short name of a JSON value's kind, for error messages.
pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_tags() {
        assert!(json().is_ajax_responder());
        assert!(!xml().is_ajax_responder());
        assert!(!csv().is_ajax_responder());
        assert!(!Processor::standard(Json::new()).is_ajax_responder());
    }

    #[test]
    fn debug_shows_content_type() {
        assert_eq!(format!("{:?}", json()), "AjaxResponder(\"application/json\")");
        assert_eq!(format!("{:?}", txt()), "Standard(\"text/plain\")");
    }
}
