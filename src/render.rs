//! Writing negotiated representations into responses.

use actix_web::{
    body::BoxBody, http::header, HttpRequest, HttpResponse, Responder, ResponseError,
};
use bytes::BytesMut;

use crate::{
    error::NegotiationError,
    negotiate::{Negotiator, Selection},
};

/// Request details kept for failure diagnostics.
#[derive(Debug, Default)]
pub(crate) struct RequestContext {
    pub(crate) accept: String,
    pub(crate) accept_language: String,
    pub(crate) offers: String,
}

/// The result of [`Negotiator::negotiate`], ready to be returned from a handler.
///
/// On success the chosen offer's data is resolved and written by the chosen processor, with
/// `Content-Type` and, when a language was negotiated, `Content-Language` set. Data resolving to
/// `null` produces `204 No Content`. Failures are rendered by the negotiator's error handler as
/// `406 Not Acceptable` or `500 Internal Server Error`.
#[derive(Debug)]
pub struct Negotiated {
    negotiator: Negotiator,
    result: Result<Selection, NegotiationError>,
    context: RequestContext,
}

impl Negotiated {
    pub(crate) fn new(
        negotiator: Negotiator,
        result: Result<Selection, NegotiationError>,
        context: RequestContext,
    ) -> Self {
        Negotiated {
            negotiator,
            result,
            context,
        }
    }

    /// Returns the selection, if negotiation succeeded.
    pub fn selection(&self) -> Option<&Selection> {
        self.result.as_ref().ok()
    }

    /// Returns the negotiation result without producing a response.
    pub fn into_result(self) -> Result<Selection, NegotiationError> {
        self.result
    }

    /// Produces the response.
    pub fn into_response(self) -> HttpResponse {
        let Negotiated {
            negotiator,
            result,
            context,
        } = self;

        match result.and_then(write_selection) {
            Ok(res) => res,
            Err(err) => {
                let status = err.status_code();

                if status.is_server_error() {
                    negotiator.log(
                        log::Level::Error,
                        &format!("failed to produce response: {}", err),
                        &[
                            ("accept", context.accept.as_str()),
                            ("accept-language", context.accept_language.as_str()),
                            ("offers", context.offers.as_str()),
                        ],
                    );
                }

                negotiator.error_response(status, err.public_message())
            }
        }
    }
}

fn write_selection(selection: Selection) -> Result<HttpResponse, NegotiationError> {
    let Selection {
        processor,
        offer,
        language,
        ..
    } = selection;

    let data = offer.data.resolve(&language)?;

    if data.is_null() {
        return Ok(HttpResponse::NoContent().finish());
    }

    let processor = processor.get_ref();
    let mut body = BytesMut::new();
    processor.process(&mut body, &offer.template, &data)?;

    let mut res = HttpResponse::Ok();
    res.content_type(processor.content_type());

    if !language.is_empty() {
        res.insert_header((header::CONTENT_LANGUAGE, language));
    }

    Ok(res.body(body.freeze()))
}

impl Responder for Negotiated {
    type Body = BoxBody;

    fn respond_to(self, _req: &HttpRequest) -> HttpResponse<Self::Body> {
        self.into_response()
    }
}
