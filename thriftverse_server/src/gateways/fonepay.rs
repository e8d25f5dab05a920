//! FonePay adapter.
//!
//! Checkout is a plain GET against the merchant endpoint with the payment parameters in the query string, sealed by
//! `DV`: a hex HMAC-SHA512 over the comma-joined parameter values in a fixed order. The return callback carries its
//! own parameter set and `DV`, computed the same way over `PRN,PID,PS,RC,UID,BC,INI,P_AMT,R_AMT`.

use chrono::Utc;
use log::*;
use serde::Deserialize;
use thriftverse_engine::db_types::{PaymentMetadata, TransactionId};

use crate::{
    config::FonepayConfig,
    gateways::{GatewayError, RedirectPayload, SignedRedirect, VerifiedPayment},
    helpers::{gateway_amount, hmac_sha512_hex, parse_gateway_amount, verify_hmac_sha512_hex},
};

#[derive(Clone, Debug)]
pub struct FonepayGateway {
    config: FonepayConfig,
}

/// The query parameters FonePay appends to the return URL.
#[derive(Debug, Clone, Deserialize)]
#[allow(non_snake_case)]
pub struct FonepayCallbackParams {
    /// The merchant's payment reference number, i.e. our transaction id.
    pub PRN: String,
    pub PID: String,
    /// "true" when the payment went through.
    pub PS: String,
    /// Response code; "successful" on success.
    pub RC: String,
    /// FonePay's trace id for the payment.
    pub UID: String,
    /// Bank code.
    #[serde(default)]
    pub BC: String,
    /// Initiator.
    #[serde(default)]
    pub INI: String,
    /// Paid amount.
    pub P_AMT: String,
    /// Requested amount.
    #[serde(default)]
    pub R_AMT: String,
    pub DV: String,
}

impl FonepayGateway {
    pub fn new(config: FonepayConfig) -> Self {
        Self { config }
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Build the signed GET redirect for a staged payment.
    pub fn checkout_redirect(&self, meta: &PaymentMetadata) -> Result<SignedRedirect, GatewayError> {
        if !self.is_configured() {
            return Err(GatewayError::NotConfigured);
        }
        let amount = gateway_amount(meta.amount);
        let date = Utc::now().format("%m/%d/%Y").to_string();
        let remarks = meta.product_id.clone();
        let params: Vec<(&str, String)> = vec![
            ("PID", self.config.merchant_code.clone()),
            ("MD", "P".to_string()),
            ("PRN", meta.transaction_id.to_string()),
            ("AMT", amount),
            ("CRN", tv_common::NPR_CURRENCY_CODE.to_string()),
            ("DT", date),
            ("R1", remarks),
            ("R2", "N/A".to_string()),
            ("RU", self.config.return_url.clone()),
        ];
        let message = params.iter().map(|(_, v)| v.as_str()).collect::<Vec<&str>>().join(",");
        let dv = hmac_sha512_hex(self.config.secret_key.reveal(), &message);
        let query = params
            .iter()
            .map(|(k, v)| format!("{k}={}", urlencode(v)))
            .chain(std::iter::once(format!("DV={dv}")))
            .collect::<Vec<String>>()
            .join("&");
        debug!("💳️ Built FonePay redirect for transaction [{}]", meta.transaction_id);
        Ok(SignedRedirect {
            transaction_id: meta.transaction_id.clone(),
            gateway_url: self.config.gateway_url.clone(),
            payload: RedirectPayload::Url { query },
        })
    }

    /// Verify the return parameters. Signature first, then payment status.
    pub fn verify_callback(&self, params: &FonepayCallbackParams) -> Result<VerifiedPayment, GatewayError> {
        if !self.is_configured() {
            return Err(GatewayError::NotConfigured);
        }
        let message = [
            params.PRN.as_str(),
            params.PID.as_str(),
            params.PS.as_str(),
            params.RC.as_str(),
            params.UID.as_str(),
            params.BC.as_str(),
            params.INI.as_str(),
            params.P_AMT.as_str(),
            params.R_AMT.as_str(),
        ]
        .join(",");
        if !verify_hmac_sha512_hex(self.config.secret_key.reveal(), &message, &params.DV) {
            warn!("💳️ FonePay callback DV failed verification for transaction [{}]", params.PRN);
            return Err(GatewayError::SignatureInvalid);
        }
        if !(params.PS.eq_ignore_ascii_case("true") && params.RC.eq_ignore_ascii_case("successful")) {
            info!(
                "💳️ FonePay reports PS={} RC={} for transaction [{}]; no order will be created",
                params.PS, params.RC, params.PRN
            );
            return Err(GatewayError::PaymentNotSuccessful(format!("PS={} RC={}", params.PS, params.RC)));
        }
        let amount = parse_gateway_amount(&params.P_AMT)
            .ok_or_else(|| GatewayError::MalformedCallback(format!("P_AMT '{}' is not an amount", params.P_AMT)))?;
        Ok(VerifiedPayment {
            transaction_id: TransactionId::from(params.PRN.clone()),
            transaction_code: params.UID.clone(),
            amount,
        })
    }
}

/// Percent-encode a query value. Only the characters that matter in a query string are escaped.
fn urlencode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(b as char),
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}
