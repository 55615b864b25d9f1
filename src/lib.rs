//! HTTP content negotiation for Actix Web.
//!
//! Parses `Accept` and `Accept-Language` (and `Accept-Charset`/`Accept-Encoding`) into ranked
//! preference lists, chooses the best of the representations a handler offers, and writes it with
//! a matching [response processor](processor).
//!
//! # Example
//! ```rust
//! use actix_web::{web, App, HttpRequest, Responder};
//! use actix_negotiate::{Negotiator, Offer};
//! use serde_json::json;
//!
//! async fn user(req: HttpRequest, neg: web::Data<Negotiator>) -> impl Responder {
//!     let user = json!({ "name": "Joe Bloggs" });
//!
//!     neg.negotiate(&req, [
//!         Offer::new().with_media_type("application/json").with_data(user.clone()),
//!         Offer::new().with_media_type("application/xml").with_data(user),
//!     ])
//! }
//!
//! let app = App::new()
//!     .app_data(web::Data::new(Negotiator::default()))
//!     .route("/user", web::get().to(user));
//! ```

#![deny(rust_2018_idioms)]
#![warn(missing_docs, missing_debug_implementations)]

mod diagnostics;
mod error;
mod media_range;
mod negotiate;
mod offer;
mod precedence;
pub mod processor;
mod quality;
mod render;

pub use crate::diagnostics::{Diagnostics, LogDiagnostics, LOG_TARGET};
pub use crate::error::{NegotiationError, NOT_ACCEPTABLE_MESSAGE, PROCESSING_FAILED_MESSAGE};
pub use crate::media_range::{
    parse_accept, MediaRange, PARAMETERED_RANGE_QUALITY, STAR_STAR_RANGE_QUALITY,
    TYPE_STAR_RANGE_QUALITY, TYPE_SUBTYPE_RANGE_QUALITY,
};
pub use crate::negotiate::{
    is_ajax, MatchKind, Negotiator, Preferences, Selection, XML_HTTP_REQUEST, X_REQUESTED_WITH,
};
pub use crate::offer::{Data, Offer, Offers, MAX_PROVIDER_DEPTH};
pub use crate::precedence::{
    parse, parse_accept_charset, parse_accept_encoding, parse_accept_language, parse_list, Param,
    PrecedenceValue,
};
pub use crate::processor::{ProcessError, Processor, ResponseProcessor};
pub use crate::quality::{q, InvalidQuality, Quality, QualityOutOfBounds};
pub use crate::render::Negotiated;
