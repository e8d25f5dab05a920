use std::env;

use log::*;
use tv_common::{parse_boolean_flag, Secret};

const DEFAULT_TV_HOST: &str = "127.0.0.1";
const DEFAULT_TV_PORT: u16 = 4460;
const DEFAULT_ESEWA_GATEWAY_URL: &str = "https://rc-epay.esewa.com.np/api/epay/main/v2/form";
const DEFAULT_FONEPAY_GATEWAY_URL: &str = "https://dev-clientapi.fonepay.com/api/merchantRequest";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    pub esewa: EsewaConfig,
    pub fonepay: FonepayConfig,
    pub notifications: NotificationConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_TV_HOST.to_string(),
            port: DEFAULT_TV_PORT,
            database_url: String::default(),
            use_x_forwarded_for: false,
            esewa: EsewaConfig::default(),
            fonepay: FonepayConfig::default(),
            notifications: NotificationConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_env_or_default() -> Self {
        let host = env::var("TV_HOST").ok().unwrap_or_else(|| DEFAULT_TV_HOST.into());
        let port = env::var("TV_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!("🪛️ {s} is not a valid port for TV_PORT. {e} Using the default, {DEFAULT_TV_PORT}, instead.");
                    DEFAULT_TV_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_TV_PORT);
        let database_url = env::var("TV_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ TV_DATABASE_URL is not set. Please set it to the URL for the ThriftVerse database.");
            String::default()
        });
        let use_x_forwarded_for = parse_boolean_flag(env::var("TV_USE_X_FORWARDED_FOR").ok(), false);
        let esewa = EsewaConfig::from_env_or_default();
        let fonepay = FonepayConfig::from_env_or_default();
        let notifications = NotificationConfig::from_env_or_default();
        Self { host, port, database_url, use_x_forwarded_for, esewa, fonepay, notifications }
    }
}

//--------------------------------------     EsewaConfig     ---------------------------------------------------------
#[derive(Clone, Debug, Default)]
pub struct EsewaConfig {
    /// The merchant product code issued by eSewa, e.g. "EPAYTEST".
    pub product_code: String,
    pub secret_key: Secret<String>,
    /// The ePay form endpoint buyers are redirected to.
    pub gateway_url: String,
    /// Where eSewa sends the buyer (and the signed payload) after payment.
    pub return_url: String,
}

impl EsewaConfig {
    pub fn from_env_or_default() -> Self {
        let product_code = env::var("TV_ESEWA_PRODUCT_CODE").ok().unwrap_or_else(|| {
            error!("🪛️ TV_ESEWA_PRODUCT_CODE is not set. eSewa checkouts will be rejected.");
            String::default()
        });
        let secret_key = env::var("TV_ESEWA_SECRET_KEY").ok().unwrap_or_else(|| {
            error!("🪛️ TV_ESEWA_SECRET_KEY is not set. eSewa checkouts will be rejected.");
            String::default()
        });
        let gateway_url = env::var("TV_ESEWA_GATEWAY_URL").ok().unwrap_or_else(|| {
            info!("🪛️ TV_ESEWA_GATEWAY_URL is not set. Using the sandbox endpoint.");
            DEFAULT_ESEWA_GATEWAY_URL.into()
        });
        let return_url = env::var("TV_ESEWA_RETURN_URL").ok().unwrap_or_else(|| {
            error!("🪛️ TV_ESEWA_RETURN_URL is not set. eSewa will have nowhere to send buyers back to.");
            String::default()
        });
        Self { product_code, secret_key: Secret::new(secret_key), gateway_url, return_url }
    }

    pub fn is_configured(&self) -> bool {
        !self.product_code.is_empty() && !self.secret_key.is_blank() && !self.return_url.is_empty()
    }
}

//--------------------------------------    FonepayConfig    ---------------------------------------------------------
#[derive(Clone, Debug, Default)]
pub struct FonepayConfig {
    /// The merchant code issued by FonePay (the `PID` request parameter).
    pub merchant_code: String,
    pub secret_key: Secret<String>,
    pub gateway_url: String,
    pub return_url: String,
}

impl FonepayConfig {
    pub fn from_env_or_default() -> Self {
        let merchant_code = env::var("TV_FONEPAY_MERCHANT_CODE").ok().unwrap_or_else(|| {
            error!("🪛️ TV_FONEPAY_MERCHANT_CODE is not set. FonePay checkouts will be rejected.");
            String::default()
        });
        let secret_key = env::var("TV_FONEPAY_SECRET_KEY").ok().unwrap_or_else(|| {
            error!("🪛️ TV_FONEPAY_SECRET_KEY is not set. FonePay checkouts will be rejected.");
            String::default()
        });
        let gateway_url = env::var("TV_FONEPAY_GATEWAY_URL").ok().unwrap_or_else(|| {
            info!("🪛️ TV_FONEPAY_GATEWAY_URL is not set. Using the sandbox endpoint.");
            DEFAULT_FONEPAY_GATEWAY_URL.into()
        });
        let return_url = env::var("TV_FONEPAY_RETURN_URL").ok().unwrap_or_else(|| {
            error!("🪛️ TV_FONEPAY_RETURN_URL is not set. FonePay will have nowhere to send buyers back to.");
            String::default()
        });
        Self { merchant_code, secret_key: Secret::new(secret_key), gateway_url, return_url }
    }

    pub fn is_configured(&self) -> bool {
        !self.merchant_code.is_empty() && !self.secret_key.is_blank() && !self.return_url.is_empty()
    }
}

//--------------------------------------  NotificationConfig ---------------------------------------------------------
/// Outbound delivery channels. Either integration may be left unconfigured, in which case the corresponding channel
/// is a logged no-op and only the in-app notification record is written.
#[derive(Clone, Debug, Default)]
pub struct NotificationConfig {
    pub mail_api_url: String,
    pub mail_api_key: Secret<String>,
    pub mail_from: String,
    pub push_api_url: String,
}

impl NotificationConfig {
    pub fn from_env_or_default() -> Self {
        let mail_api_url = env::var("TV_MAIL_API_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ TV_MAIL_API_URL is not set. Order confirmation emails will not be sent.");
            String::default()
        });
        let mail_api_key = Secret::new(env::var("TV_MAIL_API_KEY").ok().unwrap_or_default());
        let mail_from =
            env::var("TV_MAIL_FROM").ok().unwrap_or_else(|| "orders@thriftverse.example.com".to_string());
        let push_api_url = env::var("TV_PUSH_API_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ TV_PUSH_API_URL is not set. Seller push messages will not be sent.");
            String::default()
        });
        Self { mail_api_url, mail_api_key, mail_from, push_api_url }
    }

    pub fn mail_enabled(&self) -> bool {
        !self.mail_api_url.is_empty()
    }

    pub fn push_enabled(&self) -> bool {
        !self.push_api_url.is_empty()
    }
}
