use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use derive_more::{Display, Error};

use crate::{offer::MAX_PROVIDER_DEPTH, processor::ProcessError};

/// Body of a `406 Not Acceptable` response.
pub const NOT_ACCEPTABLE_MESSAGE: &str = "the accepted formats are not offered by the server";

/// Body of a `500 Internal Server Error` response. Details are only logged.
pub const PROCESSING_FAILED_MESSAGE: &str = "the response could not be produced";

/// Errors which can occur while negotiating and producing a response.
#[derive(Debug, Display, Error)]
#[non_exhaustive]
pub enum NegotiationError {
    /// None of the offers is acceptable to the client, or no processor can produce them.
    #[display("the accepted formats are not offered by the server")]
    NotAcceptable,

    /// The chosen processor failed to serialize the payload.
    #[display("response processor failed: {_0}")]
    Process(ProcessError),

    /// A data provider kept returning providers.
    #[display("data provider chain is longer than {} levels", MAX_PROVIDER_DEPTH)]
    ProviderDepth,
}

impl NegotiationError {
    /// The message sent to the client. Never contains internal detail.
    pub fn public_message(&self) -> &'static str {
        match self {
            NegotiationError::NotAcceptable => NOT_ACCEPTABLE_MESSAGE,
            _ => PROCESSING_FAILED_MESSAGE,
        }
    }
}

impl From<ProcessError> for NegotiationError {
    fn from(err: ProcessError) -> Self {
        NegotiationError::Process(err)
    }
}

/// Return `NotAcceptable` for unmatched preferences and `InternalServerError` otherwise.
impl ResponseError for NegotiationError {
    fn status_code(&self) -> StatusCode {
        match self {
            NegotiationError::NotAcceptable => StatusCode::NOT_ACCEPTABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .content_type(mime::TEXT_PLAIN_UTF_8)
            .body(self.public_message())
    }
}
