//! Selection of a representation from client preferences and server offers.

use std::{fmt, sync::Arc};

use actix_web::{
    http::{
        header::{self, HeaderName},
        StatusCode,
    },
    HttpRequest, HttpResponse,
};
use derive_more::Display;

use crate::{
    diagnostics::{Diagnostics, LogDiagnostics},
    error::NegotiationError,
    media_range::{parse_accept, MediaRange},
    offer::{Offer, Offers},
    precedence::{language_matches, parse_accept_language, PrecedenceValue},
    processor::{self, Processor},
    render::{Negotiated, RequestContext},
};

/// The `X-Requested-With` header, sent by most JavaScript HTTP clients.
pub const X_REQUESTED_WITH: HeaderName = HeaderName::from_static("x-requested-with");

/// The `X-Requested-With` value that marks a request as Ajax.
pub const XML_HTTP_REQUEST: &str = "XMLHttpRequest";

/// Returns true if the request carries exactly one `X-Requested-With: XMLHttpRequest` header.
pub fn is_ajax(req: &HttpRequest) -> bool {
    let mut values = req.headers().get_all(&X_REQUESTED_WITH);

    match (values.next(), values.next()) {
        (Some(value), None) => value == XML_HTTP_REQUEST,
        _ => false,
    }
}

/// Joins repeated header lines into one list. Values that are not visible ASCII are ignored.
pub(crate) fn joined_header(req: &HttpRequest, name: &HeaderName) -> String {
    let mut joined = String::new();

    for value in req.headers().get_all(name).filter_map(|val| val.to_str().ok()) {
        if !joined.is_empty() {
            joined.push_str(", ");
        }
        joined.push_str(value);
    }

    joined
}

/// The client's ranked preferences.
#[derive(Debug, Clone)]
pub struct Preferences {
    /// Accepted media ranges, most preferred first. Never empty.
    pub media_ranges: Vec<MediaRange>,

    /// Accepted languages, most preferred first. Never empty.
    pub languages: Vec<PrecedenceValue>,

    /// Whether the request is an Ajax request.
    pub ajax: bool,
}

impl Preferences {
    /// Parses `Accept` and `Accept-Language` header values. Blank values accept anything.
    pub fn new(accept: &str, accept_language: &str) -> Self {
        let mut media_ranges = parse_accept(accept);

        if media_ranges.is_empty() {
            media_ranges.push(MediaRange::any());
        }

        Preferences {
            media_ranges,
            languages: parse_accept_language(accept_language),
            ajax: false,
        }
    }

    /// Marks the preferences as coming from an Ajax request.
    pub fn ajax(mut self, ajax: bool) -> Self {
        self.ajax = ajax;
        self
    }

    /// Reads preferences from the request headers.
    pub fn from_request(req: &HttpRequest) -> Self {
        Preferences::new(
            &joined_header(req, &header::ACCEPT),
            &joined_header(req, &header::ACCEPT_LANGUAGE),
        )
        .ajax(is_ajax(req))
    }
}

impl Default for Preferences {
    fn default() -> Self {
        Preferences::new("", "")
    }
}

/// How a [`Selection`] was found.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// A concrete accepted media type matched a concrete offer.
    #[display("exact")]
    Exact,

    /// The match needed a wildcard on either side.
    #[display("wildcard")]
    Wildcard,

    /// The Ajax policy picked a JSON-capable offer.
    #[display("ajax")]
    Ajax,
}

/// The outcome of a successful negotiation.
#[derive(Debug)]
pub struct Selection {
    /// The processor that will write the response.
    pub processor: Processor,

    /// The chosen offer. Its data has not been resolved yet.
    pub offer: Offer,

    /// The negotiated language, or blank if none was negotiated.
    pub language: String,

    /// How the match was found.
    pub kind: MatchKind,
}

type ErrorHandler = dyn Fn(StatusCode, &str) -> HttpResponse + Send + Sync;

/// Content negotiation configuration.
///
/// A negotiator is an immutable value: [`add`](Self::add), [`with_error_handler`] and
/// [`with_diagnostics`] return a new negotiator and leave the original untouched. Clones are
/// cheap, so one negotiator is usually shared through [`web::Data`].
///
/// # Examples
/// ```
/// use actix_web::{get, web, HttpRequest, Responder};
/// use actix_negotiate::{Negotiator, Offer};
///
/// #[get("/")]
/// async fn index(req: HttpRequest, neg: web::Data<Negotiator>) -> impl Responder {
///     neg.negotiate(&req, [
///         Offer::new().with_media_type("application/json").with_data("hello"),
///         Offer::new().with_media_type("application/xml").with_data("hello"),
///     ])
/// }
/// ```
///
/// [`with_error_handler`]: Self::with_error_handler
/// [`with_diagnostics`]: Self::with_diagnostics
/// [`web::Data`]: actix_web::web::Data
#[derive(Clone)]
pub struct Negotiator {
    processors: Arc<[Processor]>,
    error_handler: Arc<ErrorHandler>,
    diagnostics: Arc<dyn Diagnostics>,
}

impl Negotiator {
    /// Constructs a negotiator using the given processors, in order of preference.
    pub fn new(processors: impl IntoIterator<Item = Processor>) -> Self {
        Negotiator {
            processors: processors.into_iter().collect(),
            error_handler: Arc::new(default_error_handler),
            diagnostics: Arc::new(LogDiagnostics),
        }
    }

    /// Constructs a negotiator using the given processors followed by the JSON and XML ones.
    pub fn with_json_and_xml(processors: impl IntoIterator<Item = Processor>) -> Self {
        Negotiator::new(
            processors
                .into_iter()
                .chain([processor::json(), processor::xml()]),
        )
    }

    /// Returns a negotiator with `processors` appended.
    pub fn add(&self, processors: impl IntoIterator<Item = Processor>) -> Self {
        Negotiator {
            processors: self.processors.iter().cloned().chain(processors).collect(),
            ..self.clone()
        }
    }

    /// Returns a negotiator that renders failures with `handler`.
    ///
    /// The handler receives the status code (`406` or `500`) and a message safe to show the
    /// client.
    pub fn with_error_handler<F>(&self, handler: F) -> Self
    where
        F: Fn(StatusCode, &str) -> HttpResponse + Send + Sync + 'static,
    {
        Negotiator {
            error_handler: Arc::new(handler),
            ..self.clone()
        }
    }

    /// Returns a negotiator that reports diagnostics to `diagnostics`.
    pub fn with_diagnostics<D: Diagnostics + 'static>(&self, diagnostics: D) -> Self {
        Negotiator {
            diagnostics: Arc::new(diagnostics),
            ..self.clone()
        }
    }

    /// Returns the registered processors, in order of preference.
    pub fn processors(&self) -> &[Processor] {
        &self.processors
    }

    /// Negotiates a response for `req` from `offers`, most preferred by the server first.
    pub fn negotiate(&self, req: &HttpRequest, offers: impl Into<Offers>) -> Negotiated {
        let offers = offers.into();

        let context = RequestContext {
            accept: joined_header(req, &header::ACCEPT),
            accept_language: joined_header(req, &header::ACCEPT_LANGUAGE),
            offers: describe(offers.as_slice()),
        };

        let prefs = Preferences::new(&context.accept, &context.accept_language).ajax(is_ajax(req));
        let result = self.select(&prefs, offers);

        Negotiated::new(self.clone(), result, context)
    }

    /// Chooses an offer and the processor that will write it.
    ///
    /// Offers whose media type is refused with `q=0` are discarded first. The remaining offers
    /// are searched in order of client preference: for each accepted media range and then each
    /// accepted language, the first matching offer wins. Exact media type matches are tried
    /// before wildcard ones; a `*` language on either side matches any language. A match against
    /// a range or language refused with `q=0` ends the search.
    ///
    /// Ajax requests skip all of this when a JSON-capable offer and an Ajax responder exist.
    pub fn select(
        &self,
        prefs: &Preferences,
        offers: impl Into<Offers>,
    ) -> Result<Selection, NegotiationError> {
        let mut offers = offers.into().into_vec();

        if self.processors.is_empty() {
            self.log(log::Level::Debug, "no processors registered", &[]);
            return Err(NegotiationError::NotAcceptable);
        }

        if prefs.ajax {
            match self.select_ajax(&mut offers) {
                Some(selection) => return Ok(self.chosen(selection)),
                None => self.log(log::Level::Trace, "no ajax match; negotiating", &[]),
            }
        }

        let mut candidates = offers
            .into_iter()
            .filter_map(|offer| {
                let candidate = Candidate::new(&offer);

                if candidate.is_refused_by(&prefs.media_ranges) {
                    self.log(
                        log::Level::Trace,
                        "offer refused",
                        &[("offer", offer.to_string().as_str())],
                    );
                    None
                } else {
                    Some((candidate, offer))
                }
            })
            .collect::<Vec<_>>();

        for kind in [MatchKind::Exact, MatchKind::Wildcard] {
            self.log(log::Level::Trace, "searching", &[("pass", kind.to_string().as_str())]);

            if let Some(found) = self.search(prefs, &candidates, kind)? {
                let (_, offer) = candidates.swap_remove(found.index);

                return Ok(self.chosen(Selection {
                    processor: found.processor,
                    offer,
                    language: found.language,
                    kind,
                }));
            }
        }

        self.log(log::Level::Debug, "no acceptable representation", &[]);
        Err(NegotiationError::NotAcceptable)
    }

    fn select_ajax(&self, offers: &mut Vec<Offer>) -> Option<Selection> {
        let processor = self.processors.iter().find(|p| p.is_ajax_responder())?;

        let index = offers.iter().position(|offer| {
            let (type_, subtype) = offer.type_subtype();
            matches!(
                (type_.as_str(), subtype.as_str()),
                ("*", "*") | ("application", "*") | ("application", "json")
            )
        })?;

        let offer = offers.remove(index);
        let language = content_language(offer.language_or_any(), "*");

        Some(Selection {
            processor: processor.clone(),
            offer,
            language,
            kind: MatchKind::Ajax,
        })
    }

    fn search(
        &self,
        prefs: &Preferences,
        candidates: &[(Candidate, Offer)],
        kind: MatchKind,
    ) -> Result<Option<Found>, NegotiationError> {
        let wildcard = kind == MatchKind::Wildcard;

        for range in &prefs.media_ranges {
            if !wildcard && !range.is_exact() {
                continue;
            }

            for language in &prefs.languages {
                for (index, (candidate, offer)) in candidates.iter().enumerate() {
                    let media_matches = if wildcard {
                        range.matches(&candidate.type_, &candidate.subtype)
                    } else {
                        range.matches_exactly(&candidate.type_, &candidate.subtype)
                    };

                    if !media_matches || !language_matches(&language.value, &candidate.language) {
                        continue;
                    }

                    if range.quality.is_zero() || language.quality.is_zero() {
                        self.log(
                            log::Level::Debug,
                            "offer refused by client",
                            &[
                                ("offer", offer.to_string().as_str()),
                                ("range", range.to_string().as_str()),
                                ("language", language.to_string().as_str()),
                            ],
                        );
                        return Err(NegotiationError::NotAcceptable);
                    }

                    let content_language = content_language(&candidate.language, &language.value);

                    match self.processor_for(range, candidate, &content_language) {
                        Some(processor) => {
                            return Ok(Some(Found {
                                index,
                                processor: processor.clone(),
                                language: content_language,
                            }))
                        }
                        None => self.log(
                            log::Level::Trace,
                            "no processor for match",
                            &[
                                ("offer", offer.to_string().as_str()),
                                ("range", range.to_string().as_str()),
                            ],
                        ),
                    }
                }
            }
        }

        Ok(None)
    }

    /// Finds a processor for the more specific of the matched range and offer. An offer of `*/*`
    /// is the default representation and always goes to the first processor.
    fn processor_for(
        &self,
        range: &MediaRange,
        candidate: &Candidate,
        language: &str,
    ) -> Option<&Processor> {
        if candidate.type_ == "*" && candidate.subtype == "*" {
            return self.processors.first();
        }

        let media_type = if specificity(&candidate.type_, &candidate.subtype)
            >= specificity(&range.type_, &range.subtype)
        {
            format!("{}/{}", candidate.type_, candidate.subtype)
        } else {
            range.essence()
        };

        self.processors
            .iter()
            .find(|p| p.get_ref().can_process(&media_type, language))
    }

    fn chosen(&self, selection: Selection) -> Selection {
        self.log(
            log::Level::Debug,
            "representation chosen",
            &[
                ("match", selection.kind.to_string().as_str()),
                ("offer", selection.offer.to_string().as_str()),
                ("processor", format!("{:?}", selection.processor).as_str()),
            ],
        );

        selection
    }

    pub(crate) fn log(&self, level: log::Level, message: &str, context: &[(&str, &str)]) {
        self.diagnostics.log(level, message, context);
    }

    pub(crate) fn error_response(&self, status: StatusCode, message: &str) -> HttpResponse {
        (self.error_handler)(status, message)
    }
}

impl Default for Negotiator {
    fn default() -> Self {
        Negotiator::with_json_and_xml([])
    }
}

impl fmt::Debug for Negotiator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Negotiator")
            .field("processors", &self.processors)
            .finish_non_exhaustive()
    }
}

fn default_error_handler(status: StatusCode, message: &str) -> HttpResponse {
    HttpResponse::build(status)
        .content_type(mime::TEXT_PLAIN_UTF_8)
        .body(message.to_owned())
}

/// An offer's normalized media type and language.
#[derive(Debug)]
struct Candidate {
    type_: String,
    subtype: String,
    language: String,
}

impl Candidate {
    fn new(offer: &Offer) -> Self {
        let (type_, subtype) = offer.type_subtype();

        Candidate {
            type_,
            subtype,
            language: offer.language_or_any().to_owned(),
        }
    }

    /// Returns true if the most specific range naming this media type has `q=0`.
    ///
    /// Ranges are consulted from exact, to `type/*`, to `*/*`. Offers with a wildcard media type
    /// are never refused here.
    fn is_refused_by(&self, ranges: &[MediaRange]) -> bool {
        if self.type_ == "*" || self.subtype == "*" {
            return false;
        }

        let exact = |r: &MediaRange| r.matches_exactly(&self.type_, &self.subtype);
        let type_star = |r: &MediaRange| r.type_ == self.type_ && r.subtype == "*";
        let star_star = |r: &MediaRange| r.type_ == "*";

        for level in [&exact as &dyn Fn(&MediaRange) -> bool, &type_star, &star_star] {
            let mut named = ranges.iter().filter(|r| level(r)).peekable();

            if named.peek().is_some() {
                return named.any(|r| r.quality.is_zero());
            }
        }

        false
    }
}

struct Found {
    index: usize,
    processor: Processor,
    language: String,
}

/// Number of concrete parts in a media type.
fn specificity(type_: &str, subtype: &str) -> u8 {
    u8::from(type_ != "*") + u8::from(subtype != "*")
}

/// The offered language if concrete, else the accepted one if concrete, else blank.
fn content_language(offered: &str, accepted: &str) -> String {
    [offered, accepted]
        .into_iter()
        .find(|lang| !lang.is_empty() && *lang != "*")
        .unwrap_or_default()
        .to_owned()
}

fn describe(offers: &[Offer]) -> String {
    offers
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
