//! Server-side candidate representations.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::{error::NegotiationError, media_range::split_media_type};

/// Maximum number of providers resolved in a chain before giving up.
pub const MAX_PROVIDER_DEPTH: usize = 16;

/// The payload of an [`Offer`].
///
/// Payloads can be computed lazily: a supplier is only called once its offer has been chosen, so
/// expensive or per-language content is never built for offers that lose the negotiation. A
/// supplier may itself return another supplier; chains are followed up to
/// [`MAX_PROVIDER_DEPTH`] levels.
///
/// A payload that resolves to JSON `null` is sent as `204 No Content`.
pub enum Data {
    /// A ready value.
    Value(Value),

    /// A zero-argument provider.
    Supplier(Box<dyn FnOnce() -> Data>),

    /// A provider called with the negotiated language, or `""` if no concrete language was
    /// negotiated.
    LanguageSupplier(Box<dyn FnOnce(&str) -> Data>),
}

impl Data {
    /// Wraps a ready value.
    pub fn value(value: impl Into<Value>) -> Self {
        Data::Value(value.into())
    }

    /// The empty payload, sent as `204 No Content`.
    pub fn empty() -> Self {
        Data::Value(Value::Null)
    }

    /// Converts any serializable value into a payload.
    pub fn serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(Data::Value)
    }

    /// Wraps a zero-argument provider.
    pub fn supplier<F>(f: F) -> Self
    where
        F: FnOnce() -> Data + 'static,
    {
        Data::Supplier(Box::new(f))
    }

    /// Wraps a provider that builds the payload for a given language.
    pub fn language_supplier<F>(f: F) -> Self
    where
        F: FnOnce(&str) -> Data + 'static,
    {
        Data::LanguageSupplier(Box::new(f))
    }

    /// Calls providers until a value results.
    pub(crate) fn resolve(self, language: &str) -> Result<Value, NegotiationError> {
        let mut data = self;

        for _ in 0..=MAX_PROVIDER_DEPTH {
            data = match data {
                Data::Value(value) => return Ok(value),
                Data::Supplier(f) => f(),
                Data::LanguageSupplier(f) => f(language),
            };
        }

        Err(NegotiationError::ProviderDepth)
    }
}

impl Default for Data {
    fn default() -> Self {
        Data::empty()
    }
}

impl fmt::Debug for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Data::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Data::Supplier(_) => f.write_str("Supplier(..)"),
            Data::LanguageSupplier(_) => f.write_str("LanguageSupplier(..)"),
        }
    }
}

impl From<Value> for Data {
    fn from(value: Value) -> Self {
        Data::Value(value)
    }
}

impl From<&str> for Data {
    fn from(value: &str) -> Self {
        Data::Value(Value::from(value))
    }
}

impl From<String> for Data {
    fn from(value: String) -> Self {
        Data::Value(Value::from(value))
    }
}

/// A candidate representation offered to content negotiation.
///
/// A blank media type or language means "any". Offers are consumed by negotiation; only the
/// chosen one has its [`Data`] resolved.
///
/// # Examples
/// ```
/// use actix_negotiate::Offer;
///
/// let offer = Offer::new()
///     .with_media_type("text/html")
///     .with_language("en")
///     .with_template("home.html")
///     .with_data("hello");
/// assert_eq!(offer.media_type, "text/html");
/// ```
#[derive(Debug, Default)]
pub struct Offer {
    /// Media type, e.g. `text/html`. Blank or `*/*` for any.
    pub media_type: String,

    /// Language tag, e.g. `en-GB`. Blank or `*` for any.
    pub language: String,

    /// Opaque template name passed on to the processor.
    pub template: String,

    /// The payload.
    pub data: Data,
}

impl Offer {
    /// Constructs an offer of any media type in any language, with an empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the media type.
    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = media_type.into();
        self
    }

    /// Sets the language.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Sets the template name.
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    /// Sets the payload.
    pub fn with_data(mut self, data: impl Into<Data>) -> Self {
        self.data = data.into();
        self
    }

    /// Type and subtype, with blank normalized to `*/*`.
    pub(crate) fn type_subtype(&self) -> (String, String) {
        split_media_type(&self.media_type)
    }

    /// Language, with blank normalized to `*`.
    pub(crate) fn language_or_any(&self) -> &str {
        match self.language.trim() {
            "" => "*",
            language => language,
        }
    }
}

impl fmt::Display for Offer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (type_, subtype) = self.type_subtype();
        write!(f, "{}/{} ({})", type_, subtype, self.language_or_any())
    }
}

/// An ordered list of offers, most preferred by the server first.
#[derive(Debug, Default)]
pub struct Offers(Vec<Offer>);

impl Offers {
    /// Returns the media type of each offer, in order.
    pub fn media_types(&self) -> Vec<&str> {
        self.0.iter().map(|offer| offer.media_type.as_str()).collect()
    }

    /// Returns the offers.
    pub fn as_slice(&self) -> &[Offer] {
        &self.0
    }

    /// Returns the number of offers.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no offers.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn into_vec(self) -> Vec<Offer> {
        self.0
    }
}

impl From<Vec<Offer>> for Offers {
    fn from(offers: Vec<Offer>) -> Self {
        Offers(offers)
    }
}

impl From<Offer> for Offers {
    fn from(offer: Offer) -> Self {
        Offers(vec![offer])
    }
}

impl<const N: usize> From<[Offer; N]> for Offers {
    fn from(offers: [Offer; N]) -> Self {
        Offers(Vec::from(offers))
    }
}

impl FromIterator<Offer> for Offers {
    fn from_iter<I: IntoIterator<Item = Offer>>(iter: I) -> Self {
        Offers(iter.into_iter().collect())
    }
}

impl IntoIterator for Offers {
    type Item = Offer;
    type IntoIter = std::vec::IntoIter<Offer>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, rc::Rc};

    use serde_json::json;

    use super::*;

    #[test]
    fn blank_fields_are_wildcards() {
        let offer = Offer::new();
        assert_eq!(offer.type_subtype(), ("*".to_owned(), "*".to_owned()));
        assert_eq!(offer.language_or_any(), "*");
        assert_eq!(offer.to_string(), "*/* (*)");

        let offer = Offer::new().with_media_type("text/csv").with_language(" de ");
        assert_eq!(offer.type_subtype(), ("text".to_owned(), "csv".to_owned()));
        assert_eq!(offer.language_or_any(), "de");
    }

    #[test]
    fn resolves_plain_values() {
        assert_eq!(Data::from("x").resolve("").unwrap(), json!("x"));
        assert_eq!(Data::empty().resolve("en").unwrap(), Value::Null);
    }

    #[test]
    fn resolves_supplier_chains() {
        let data = Data::supplier(|| {
            Data::language_supplier(|lang| {
                let greeting = format!("hi-{lang}");
                Data::supplier(move || Data::value(greeting))
            })
        });
        assert_eq!(data.resolve("fr").unwrap(), json!("hi-fr"));
    }

    #[test]
    fn endless_chain_is_an_error() {
        fn endless() -> Data {
            Data::supplier(endless)
        }

        assert!(matches!(
            endless().resolve(""),
            Err(NegotiationError::ProviderDepth)
        ));
    }

    #[test]
    fn chain_at_depth_limit_resolves() {
        let mut data = Data::value(1);
        for _ in 0..MAX_PROVIDER_DEPTH {
            let inner = data;
            data = Data::supplier(move || inner);
        }
        assert_eq!(data.resolve("").unwrap(), json!(1));
    }

    #[test]
    fn serialize_any_value() {
        #[derive(Serialize)]
        struct User {
            name: &'static str,
        }

        let data = Data::serialize(&User { name: "Joe" }).unwrap();
        assert_eq!(data.resolve("").unwrap(), json!({ "name": "Joe" }));
    }

    #[test]
    fn supplier_not_called_until_resolved() {
        let called = Rc::new(Cell::new(false));
        let flag = Rc::clone(&called);
        let offer = Offer::new().with_data(Data::supplier(move || {
            flag.set(true);
            Data::value("x")
        }));

        assert!(!called.get());
        offer.data.resolve("").unwrap();
        assert!(called.get());
    }

    #[test]
    fn offers_media_types() {
        let offers = Offers::from([
            Offer::new().with_media_type("text/html"),
            Offer::new().with_media_type("application/json"),
        ]);
        assert_eq!(offers.media_types(), vec!["text/html", "application/json"]);
        assert_eq!(offers.len(), 2);
    }
}
