use std::{net::IpAddr, str::FromStr};

use actix_web::HttpRequest;
use hmac::{Hmac, Mac};
use log::{debug, trace};
use sha2::{Sha256, Sha512};
use tv_common::Rupees;

type HmacSha256 = Hmac<Sha256>;
type HmacSha512 = Hmac<Sha512>;

/// Base64-encoded HMAC-SHA256, as eSewa's ePay v2 signature scheme specifies.
pub fn hmac_sha256_base64(secret: &str, message: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(message.as_bytes());
    base64::encode(mac.finalize().into_bytes())
}

/// Verify a base64-encoded HMAC-SHA256 signature. Comparison happens inside `verify_slice`, which is constant-time.
pub fn verify_hmac_sha256_base64(secret: &str, message: &str, signature: &str) -> bool {
    let Ok(sig) = base64::decode(signature) else {
        return false;
    };
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(message.as_bytes());
    mac.verify_slice(&sig).is_ok()
}

/// Hex-encoded HMAC-SHA512, the FonePay `DV` scheme.
pub fn hmac_sha512_hex(secret: &str, message: &str) -> String {
    let mut mac = HmacSha512::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(message.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Verify a hex-encoded HMAC-SHA512 digest. FonePay is inconsistent about hex case, so decode first and let
/// `verify_slice` do a constant-time comparison on the raw bytes.
pub fn verify_hmac_sha512_hex(secret: &str, message: &str, signature: &str) -> bool {
    let Ok(sig) = hex::decode(signature) else {
        return false;
    };
    let mut mac = HmacSha512::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(message.as_bytes());
    mac.verify_slice(&sig).is_ok()
}

/// Format an amount the way the gateways expect it: decimal rupees, no symbol, no trailing `.00` on whole amounts.
pub fn gateway_amount(amount: Rupees) -> String {
    let paisa = amount.value();
    if paisa % 100 == 0 {
        format!("{}", paisa / 100)
    } else {
        format!("{}.{:02}", paisa / 100, paisa.abs() % 100)
    }
}

/// Parse an amount as reported by a gateway. eSewa inserts thousands separators ("1,170.0"); FonePay reports plain
/// decimals. Returns `None` for anything that does not parse to a non-negative amount.
pub fn parse_gateway_amount(s: &str) -> Option<Rupees> {
    let cleaned = s.trim().replace(',', "");
    let (rupees, paisa) = match cleaned.split_once('.') {
        Some((r, p)) => (r, p),
        None => (cleaned.as_str(), ""),
    };
    let rupees = rupees.parse::<i64>().ok()?;
    let paisa = match paisa.len() {
        0 => 0,
        1 => paisa.parse::<i64>().ok()? * 10,
        2 => paisa.parse::<i64>().ok()?,
        // More than 2 decimals never represents a real rupee amount
        _ => return None,
    };
    if rupees < 0 || paisa < 0 {
        return None;
    }
    Some(Rupees::from(rupees * 100 + paisa))
}

/// Get the remote IP address from the request: the `X-Forwarded-For` header if the deployment sits behind a proxy
/// and `use_x_forwarded_for` is set, otherwise the peer address from the connection info.
pub fn get_remote_ip(req: &HttpRequest, use_x_forwarded_for: bool) -> Option<IpAddr> {
    let mut result = None;
    if use_x_forwarded_for {
        trace!("Checking X-Forwarded-For header");
        result = req
            .headers()
            .get("X-Forwarded-For")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(|s| IpAddr::from_str(s.trim()).ok());
        if let Some(ip) = result {
            debug!("Using X-Forwarded-For header for remote address: {ip}");
        }
    }
    result.or_else(|| {
        let peer_addr = req.connection_info().peer_addr().map(|a| a.to_string());
        trace!("Using Peer address for remote address: {:?}", peer_addr);
        peer_addr.and_then(|s| IpAddr::from_str(&s).ok())
    })
}
