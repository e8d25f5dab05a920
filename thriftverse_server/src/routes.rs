//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause
//! the current worker to stop processing new requests. Any long, non-cpu-bound operation (I/O, database calls, the
//! engine APIs) must therefore be awaited, never blocked on.

use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use log::*;
use thriftverse_engine::{
    db_types::{PaymentChannel, TransactionId},
    MarketplaceDatabase,
    OrderFlowApi,
};

use crate::{
    config::ServerConfig,
    data_objects::{CheckoutRequest, EsewaReturnQuery, OrderSummary},
    errors::ServerError,
    gateways::{EsewaGateway, FonepayGateway, VerifiedPayment},
    helpers::get_remote_ip,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------  Checkout  ----------------------------------------------------
route!(checkout_esewa => Post "/checkout/esewa" impl MarketplaceDatabase);
/// Stage an eSewa checkout and return the signed POST form for the client to auto-submit.
///
/// The metadata row is committed before the response leaves the server, so by the time the buyer reaches eSewa the
/// eventual callback already has something to join against.
pub async fn checkout_esewa<B: MarketplaceDatabase>(
    body: web::Json<CheckoutRequest>,
    api: web::Data<OrderFlowApi<B>>,
    gateway: web::Data<EsewaGateway>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Received eSewa checkout request");
    if !gateway.is_configured() {
        return Err(ServerError::ChannelNotConfigured("esewa".to_string()));
    }
    let intent = body.into_inner();
    let staged = api.stage_checkout(intent, PaymentChannel::Esewa).await?;
    let redirect = gateway.checkout_redirect(&staged)?;
    info!("💻️ eSewa checkout staged as [{}] for {}", staged.transaction_id, staged.amount);
    Ok(HttpResponse::Ok().json(redirect))
}

route!(checkout_fonepay => Post "/checkout/fonepay" impl MarketplaceDatabase);
/// Stage a FonePay checkout and return the signed GET redirect.
pub async fn checkout_fonepay<B: MarketplaceDatabase>(
    body: web::Json<CheckoutRequest>,
    api: web::Data<OrderFlowApi<B>>,
    gateway: web::Data<FonepayGateway>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Received FonePay checkout request");
    if !gateway.is_configured() {
        return Err(ServerError::ChannelNotConfigured("fonepay".to_string()));
    }
    let intent = body.into_inner();
    let staged = api.stage_checkout(intent, PaymentChannel::Fonepay).await?;
    let redirect = gateway.checkout_redirect(&staged)?;
    info!("💻️ FonePay checkout staged as [{}] for {}", staged.transaction_id, staged.amount);
    Ok(HttpResponse::Ok().json(redirect))
}

//----------------------------------------------  Callbacks ----------------------------------------------------
route!(esewa_return => Get "/payments/esewa/return" impl MarketplaceDatabase);
/// eSewa return callback. Verifies the signed payload, cross-checks the amount against the staged quote, and then
/// drives the idempotent materialization. Safe to hit any number of times.
pub async fn esewa_return<B: MarketplaceDatabase>(
    req: HttpRequest,
    query: web::Query<EsewaReturnQuery>,
    api: web::Data<OrderFlowApi<B>>,
    gateway: web::Data<EsewaGateway>,
    config: web::Data<ServerConfig>,
) -> Result<HttpResponse, ServerError> {
    let peer = get_remote_ip(&req, config.use_x_forwarded_for);
    trace!("💻️ Received eSewa return callback from {peer:?}");
    let verified = gateway.verify_callback(&query.data)?;
    settle_verified_payment(&api, verified).await
}

route!(fonepay_return => Get "/payments/fonepay/return" impl MarketplaceDatabase);
/// FonePay return callback. Same contract as the eSewa one.
pub async fn fonepay_return<B: MarketplaceDatabase>(
    req: HttpRequest,
    query: web::Query<crate::gateways::FonepayCallbackParams>,
    api: web::Data<OrderFlowApi<B>>,
    gateway: web::Data<FonepayGateway>,
    config: web::Data<ServerConfig>,
) -> Result<HttpResponse, ServerError> {
    let peer = get_remote_ip(&req, config.use_x_forwarded_for);
    trace!("💻️ Received FonePay return callback from {peer:?}");
    let verified = gateway.verify_callback(&query)?;
    settle_verified_payment(&api, verified).await
}

/// The gateway-agnostic tail of both callbacks: amount cross-check, then materialization.
async fn settle_verified_payment<B: MarketplaceDatabase>(
    api: &OrderFlowApi<B>,
    verified: VerifiedPayment,
) -> Result<HttpResponse, ServerError> {
    let txid = verified.transaction_id.clone();
    let meta = api
        .payment_metadata(&txid)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("No payment was staged for transaction [{txid}]")))?;
    if meta.amount != verified.amount {
        warn!(
            "💻️ Amount mismatch on transaction [{txid}]: gateway reports {}, {} was quoted",
            verified.amount, meta.amount
        );
        return Err(ServerError::AmountMismatch {
            reported: verified.amount.to_string(),
            quoted: meta.amount.to_string(),
        });
    }
    let result = api.create_order_from_payment(&txid, &verified.transaction_code).await?;
    let mut builder = if result.newly_created { HttpResponse::Created() } else { HttpResponse::Ok() };
    Ok(builder.json(OrderSummary::from_order(result.order, result.newly_created)))
}

//----------------------------------------------     COD    ----------------------------------------------------
route!(cod_order => Post "/orders/cod" impl MarketplaceDatabase);
/// Place a cash-on-delivery order. No gateway, no signature; the total is quoted from the live product price and
/// the COD platform fee rate applies.
pub async fn cod_order<B: MarketplaceDatabase>(
    body: web::Json<CheckoutRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Received COD order request");
    let result = api.create_cod_order(body.into_inner()).await?;
    info!("💻️ COD order {} placed for {}", result.order.order_code, result.order.amount);
    Ok(HttpResponse::Created().json(OrderSummary::from_order(result.order, result.newly_created)))
}

//---------------------------------------------- Order poll ----------------------------------------------------
route!(order_by_transaction => Get "/payments/{txid}/order" impl MarketplaceDatabase);
/// Client re-poll: "has my payment turned into an order yet?" 404 until the callback has landed.
pub async fn order_by_transaction<B: MarketplaceDatabase>(
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let txid = TransactionId::from(path.into_inner());
    trace!("💻️ Received order poll for transaction [{txid}]");
    let order = api
        .order_by_transaction_id(&txid)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("No order exists for transaction [{txid}]")))?;
    Ok(HttpResponse::Ok().json(OrderSummary::from_order(order, false)))
}
