use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use thiserror::Error;
use thriftverse_engine::OrderFlowError;

use crate::gateways::GatewayError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Payment could not be verified. {0}")]
    PaymentVerification(#[from] GatewayError),
    #[error("The gateway reported {reported}, but {quoted} was quoted for this transaction.")]
    AmountMismatch { reported: String, quoted: String },
    #[error("The payment channel '{0}' is not configured on this server.")]
    ChannelNotConfigured(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Order error. {0}")]
    OrderFlow(OrderFlowError),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::PaymentVerification(e) => match e {
                GatewayError::SignatureInvalid => StatusCode::FORBIDDEN,
                GatewayError::PaymentNotSuccessful(_) => StatusCode::PAYMENT_REQUIRED,
                GatewayError::MalformedCallback(_) => StatusCode::BAD_REQUEST,
                GatewayError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            },
            Self::AmountMismatch { .. } => StatusCode::BAD_REQUEST,
            Self::ChannelNotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::OrderFlow(e) => match e {
                OrderFlowError::MetadataNotFound(_) => StatusCode::NOT_FOUND,
                OrderFlowError::ProductNotFound(_) => StatusCode::NOT_FOUND,
                OrderFlowError::InsufficientStock { .. } => StatusCode::CONFLICT,
                OrderFlowError::InvalidQuantity(_) => StatusCode::BAD_REQUEST,
                OrderFlowError::AmountBelowShippingFee { .. } => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<OrderFlowError> for ServerError {
    fn from(e: OrderFlowError) -> Self {
        Self::OrderFlow(e)
    }
}
