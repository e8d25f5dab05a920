use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use thriftverse_engine::{
    db,
    events::{EventHandlers, EventHooks, EventProducers},
    notifications::NotificationDispatcher,
    OrderFlowApi,
    SqliteDatabase,
};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    gateways::{EsewaGateway, FonepayGateway},
    integrations::{ExpoPushClient, HttpMailer},
    routes::{
        health,
        CheckoutEsewaRoute,
        CheckoutFonepayRoute,
        CodOrderRoute,
        EsewaReturnRoute,
        FonepayReturnRoute,
        OrderByTransactionRoute,
    },
};

const EVENT_BUFFER_SIZE: usize = 25;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let database_url = if config.database_url.is_empty() { db::db_url() } else { config.database_url.clone() };
    let db = SqliteDatabase::new_with_url(&database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = create_event_handlers(&config, db.clone())?;
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// Wire the order-created hook up to the notification dispatcher. The dispatcher gets its own database handle and
/// runs on the event-handler task, so a slow mail provider never holds up a callback response.
pub fn create_event_handlers(config: &ServerConfig, db: SqliteDatabase) -> Result<EventHandlers, ServerError> {
    let mailer = HttpMailer::new(config.notifications.clone())
        .map_err(|e| ServerError::InitializeError(format!("Could not create the mail client. {e}")))?;
    let push = ExpoPushClient::new(config.notifications.clone())
        .map_err(|e| ServerError::InitializeError(format!("Could not create the push client. {e}")))?;
    let dispatcher = NotificationDispatcher::new(db, mailer, push);
    let mut hooks = EventHooks::default();
    hooks.on_order_created(move |event| {
        let dispatcher = dispatcher.clone();
        Box::pin(async move {
            dispatcher.handle_order_created(event).await;
        })
    });
    Ok(EventHandlers::new(EVENT_BUFFER_SIZE, hooks))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    if !config.esewa.is_configured() {
        warn!("🚨️ eSewa is not fully configured. eSewa checkouts and callbacks will be rejected.");
    }
    if !config.fonepay.is_configured() {
        warn!("🚨️ FonePay is not fully configured. FonePay checkouts and callbacks will be rejected.");
    }
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let orders_api = OrderFlowApi::new(db.clone(), producers.clone());
        let esewa = EsewaGateway::new(config.esewa.clone());
        let fonepay = FonepayGateway::new(config.fonepay.clone());
        let json_cfg = web::JsonConfig::default()
            .error_handler(|err, _req| ServerError::InvalidRequestBody(err.to_string()).into());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("tv::access_log"))
            .app_data(json_cfg)
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(esewa))
            .app_data(web::Data::new(fonepay))
            .app_data(web::Data::new(config.clone()))
            .service(health)
            .service(CheckoutEsewaRoute::<SqliteDatabase>::new())
            .service(CheckoutFonepayRoute::<SqliteDatabase>::new())
            .service(EsewaReturnRoute::<SqliteDatabase>::new())
            .service(FonepayReturnRoute::<SqliteDatabase>::new())
            .service(CodOrderRoute::<SqliteDatabase>::new())
            .service(OrderByTransactionRoute::<SqliteDatabase>::new())
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}
