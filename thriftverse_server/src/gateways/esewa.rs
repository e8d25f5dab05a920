//! eSewa ePay v2 adapter.
//!
//! Checkout is an auto-submitted POST form against the ePay endpoint. The signature is a base64 HMAC-SHA256 over
//! `total_amount=X,transaction_uuid=Y,product_code=Z` (the fields named by `signed_field_names`, in order). The
//! return callback arrives as a single `data` query parameter holding a base64-encoded JSON document, signed with
//! the same scheme over the fields its own `signed_field_names` lists.

use log::*;
use serde::Deserialize;
use thriftverse_engine::db_types::{PaymentMetadata, TransactionId};

use crate::{
    config::EsewaConfig,
    gateways::{GatewayError, RedirectPayload, SignedRedirect, VerifiedPayment},
    helpers::{gateway_amount, hmac_sha256_base64, parse_gateway_amount, verify_hmac_sha256_base64},
};

const SIGNED_FIELDS: &str = "total_amount,transaction_uuid,product_code";

#[derive(Clone, Debug)]
pub struct EsewaGateway {
    config: EsewaConfig,
}

/// The JSON document inside the base64 `data` callback parameter.
#[derive(Debug, Clone, Deserialize)]
struct EsewaCallbackPayload {
    transaction_code: String,
    status: String,
    total_amount: String,
    transaction_uuid: String,
    product_code: String,
    signed_field_names: String,
    signature: String,
}

impl EsewaGateway {
    pub fn new(config: EsewaConfig) -> Self {
        Self { config }
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Build the signed checkout form for a staged payment.
    pub fn checkout_redirect(&self, meta: &PaymentMetadata) -> Result<SignedRedirect, GatewayError> {
        if !self.is_configured() {
            return Err(GatewayError::NotConfigured);
        }
        let total_amount = gateway_amount(meta.amount);
        let message = format!(
            "total_amount={total_amount},transaction_uuid={},product_code={}",
            meta.transaction_id, self.config.product_code
        );
        let signature = hmac_sha256_base64(self.config.secret_key.reveal(), &message);
        let fields = vec![
            ("amount".to_string(), total_amount.clone()),
            ("tax_amount".to_string(), "0".to_string()),
            ("total_amount".to_string(), total_amount),
            ("transaction_uuid".to_string(), meta.transaction_id.to_string()),
            ("product_code".to_string(), self.config.product_code.clone()),
            ("product_service_charge".to_string(), "0".to_string()),
            ("product_delivery_charge".to_string(), "0".to_string()),
            ("success_url".to_string(), self.config.return_url.clone()),
            ("failure_url".to_string(), self.config.return_url.clone()),
            ("signed_field_names".to_string(), SIGNED_FIELDS.to_string()),
            ("signature".to_string(), signature),
        ];
        debug!("💳️ Built eSewa redirect for transaction [{}]", meta.transaction_id);
        Ok(SignedRedirect {
            transaction_id: meta.transaction_id.clone(),
            gateway_url: self.config.gateway_url.clone(),
            payload: RedirectPayload::Form { fields },
        })
    }

    /// Parse and verify the base64 `data` callback parameter. Signature first, then status; a valid signature on a
    /// failed payment is still a failed payment.
    pub fn verify_callback(&self, data: &str) -> Result<VerifiedPayment, GatewayError> {
        if !self.is_configured() {
            return Err(GatewayError::NotConfigured);
        }
        let decoded = base64::decode(data)
            .map_err(|e| GatewayError::MalformedCallback(format!("data is not valid base64: {e}")))?;
        let payload: EsewaCallbackPayload = serde_json::from_slice(&decoded)
            .map_err(|e| GatewayError::MalformedCallback(format!("data is not a valid eSewa payload: {e}")))?;

        let message = payload
            .signed_field_names
            .split(',')
            .map(|field| {
                let value = match field {
                    "transaction_code" => payload.transaction_code.as_str(),
                    "status" => payload.status.as_str(),
                    "total_amount" => payload.total_amount.as_str(),
                    "transaction_uuid" => payload.transaction_uuid.as_str(),
                    "product_code" => payload.product_code.as_str(),
                    "signed_field_names" => payload.signed_field_names.as_str(),
                    other => {
                        warn!("💳️ eSewa callback signs an unknown field: {other}");
                        ""
                    },
                };
                format!("{field}={value}")
            })
            .collect::<Vec<String>>()
            .join(",");
        if !verify_hmac_sha256_base64(self.config.secret_key.reveal(), &message, &payload.signature) {
            warn!("💳️ eSewa callback signature failed verification for transaction [{}]", payload.transaction_uuid);
            return Err(GatewayError::SignatureInvalid);
        }
        if payload.status != "COMPLETE" {
            info!(
                "💳️ eSewa reports status {} for transaction [{}]; no order will be created",
                payload.status, payload.transaction_uuid
            );
            return Err(GatewayError::PaymentNotSuccessful(payload.status));
        }
        let amount = parse_gateway_amount(&payload.total_amount).ok_or_else(|| {
            GatewayError::MalformedCallback(format!("total_amount '{}' is not an amount", payload.total_amount))
        })?;
        Ok(VerifiedPayment {
            transaction_id: TransactionId::from(payload.transaction_uuid),
            transaction_code: payload.transaction_code,
            amount,
        })
    }
}
