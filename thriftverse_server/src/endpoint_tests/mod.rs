use actix_http::Request;
use actix_web::{
    body::MessageBody,
    dev::{Service, ServiceResponse},
    http::StatusCode,
    test,
    test::TestRequest,
    web,
    App,
    Error,
};
use serde_json::json;
use thriftverse_engine::{
    events::EventProducers,
    test_utils::{
        prepare_env::{prepare_test_env, random_db_path},
        seed::{seed_product, seed_seller},
    },
    OrderFlowApi,
    SqliteDatabase,
};
use tv_common::{Rupees, Secret};

use crate::{
    config::{EsewaConfig, FonepayConfig, ServerConfig},
    data_objects::OrderSummary,
    errors::ServerError,
    gateways::{EsewaGateway, FonepayGateway},
    helpers::hmac_sha256_base64,
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

const ESEWA_SECRET: &str = "8gBm/:&EnhH.1/q";

fn test_config() -> ServerConfig {
    ServerConfig {
        esewa: EsewaConfig {
            product_code: "EPAYTEST".to_string(),
            secret_key: Secret::new(ESEWA_SECRET.to_string()),
            gateway_url: "https://rc-epay.esewa.com.np/api/epay/main/v2/form".to_string(),
            return_url: "http://localhost:4460/payments/esewa/return".to_string(),
        },
        fonepay: FonepayConfig {
            merchant_code: "NBQM".to_string(),
            secret_key: Secret::new("a7e3512f5032480a83137793cb2021dc".to_string()),
            gateway_url: "https://dev-clientapi.fonepay.com/api/merchantRequest".to_string(),
            return_url: "http://localhost:4460/payments/fonepay/return".to_string(),
        },
        ..Default::default()
    }
}

async fn test_service(
    db: SqliteDatabase,
    config: ServerConfig,
) -> impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = Error> {
    let orders_api = OrderFlowApi::new(db, EventProducers::default());
    let json_cfg = web::JsonConfig::default()
        .error_handler(|err, _req| ServerError::InvalidRequestBody(err.to_string()).into());
    let app = App::new()
        .app_data(json_cfg)
        .app_data(web::Data::new(orders_api))
        .app_data(web::Data::new(EsewaGateway::new(config.esewa.clone())))
        .app_data(web::Data::new(FonepayGateway::new(config.fonepay.clone())))
        .app_data(web::Data::new(config))
        .service(health)
        .service(CheckoutEsewaRoute::<SqliteDatabase>::new())
        .service(CheckoutFonepayRoute::<SqliteDatabase>::new())
        .service(EsewaReturnRoute::<SqliteDatabase>::new())
        .service(FonepayReturnRoute::<SqliteDatabase>::new())
        .service(CodOrderRoute::<SqliteDatabase>::new())
        .service(OrderByTransactionRoute::<SqliteDatabase>::new());
    test::init_service(app).await
}

async fn new_db(name: &str) -> SqliteDatabase {
    let url = random_db_path(name);
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

fn checkout_body(product_id: &str, quantity: i64, shipping: &str) -> serde_json::Value {
    json!({
        "product_id": product_id,
        "buyer_email": "buyer@example.com",
        "buyer_name": "Binita Shrestha",
        "shipping_address": {
            "street": "Jhamsikhel Marg 12",
            "city": "Lalitpur",
            "district": "Lalitpur",
            "country": "Nepal",
            "phone": "+977-9801234567"
        },
        "quantity": quantity,
        "shipping_option": shipping
    })
}

#[actix_web::test]
async fn health_check() {
    let db = new_db("ep_health").await;
    let service = test_service(db, test_config()).await;
    let req = TestRequest::get().uri("/health").to_request();
    let res = test::call_service(&service, req).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[actix_web::test]
async fn cod_order_end_to_end() {
    let db = new_db("ep_cod").await;
    seed_product(db.pool(), "prod-1", "seller-1", Rupees::from_rupees(450), 4).await;
    seed_seller(db.pool(), "seller-1", "seller@example.com", None, false).await;
    let service = test_service(db, test_config()).await;

    let req = TestRequest::post().uri("/orders/cod").set_json(checkout_body("prod-1", 2, "branch")).to_request();
    let res = test::call_service(&service, req).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let summary: OrderSummary = test::read_body_json(res).await;
    assert!(summary.newly_created);
    assert_eq!(summary.amount, "Rs1020.00");
    assert_eq!(summary.quantity, 2);
    assert!(summary.order_code.starts_with("TV-"));
}

#[actix_web::test]
async fn cod_order_for_unknown_product_is_404() {
    let db = new_db("ep_cod_missing").await;
    let service = test_service(db, test_config()).await;
    let req = TestRequest::post().uri("/orders/cod").set_json(checkout_body("nope", 1, "home")).to_request();
    let res = test::call_service(&service, req).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn checkout_of_a_sold_out_product_is_a_409() {
    let db = new_db("ep_sold_out").await;
    seed_product(db.pool(), "prod-1", "seller-1", Rupees::from_rupees(1000), 0).await;
    let service = test_service(db, test_config()).await;
    let req = TestRequest::post().uri("/checkout/esewa").set_json(checkout_body("prod-1", 1, "home")).to_request();
    let res = test::call_service(&service, req).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[actix_web::test]
async fn esewa_checkout_then_callback_creates_the_order() {
    let db = new_db("ep_esewa_flow").await;
    seed_product(db.pool(), "prod-1", "seller-1", Rupees::from_rupees(1000), 5).await;
    let service = test_service(db, test_config()).await;

    // Checkout: stage and fetch the signed form
    let req = TestRequest::post().uri("/checkout/esewa").set_json(checkout_body("prod-1", 1, "home")).to_request();
    let res = test::call_service(&service, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let redirect: serde_json::Value = test::read_body_json(res).await;
    let txid = redirect["transaction_id"].as_str().expect("redirect carries the transaction id").to_string();
    let fields = redirect["fields"].as_array().expect("eSewa redirect is a form");
    let total_amount = fields
        .iter()
        .find(|f| f[0] == "total_amount")
        .and_then(|f| f[1].as_str())
        .expect("form carries total_amount");
    assert_eq!(total_amount, "1170");

    // Simulate the gateway: sign a COMPLETE payload for the staged transaction
    let message = format!(
        "transaction_code=0007X,status=COMPLETE,total_amount=1170,transaction_uuid={txid},product_code=EPAYTEST,\
         signed_field_names=transaction_code,status,total_amount,transaction_uuid,product_code,signed_field_names"
    );
    let signature = hmac_sha256_base64(ESEWA_SECRET, &message);
    let payload = json!({
        "transaction_code": "0007X",
        "status": "COMPLETE",
        "total_amount": "1170",
        "transaction_uuid": txid,
        "product_code": "EPAYTEST",
        "signed_field_names": "transaction_code,status,total_amount,transaction_uuid,product_code,signed_field_names",
        "signature": signature,
    });
    let data = base64::encode(payload.to_string());
    let encoded = data.replace('+', "%2B").replace('/', "%2F").replace('=', "%3D");

    let req = TestRequest::get().uri(&format!("/payments/esewa/return?data={encoded}")).to_request();
    let res = test::call_service(&service, req).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let summary: OrderSummary = test::read_body_json(res).await;
    assert!(summary.newly_created);
    assert_eq!(summary.transaction_code, "0007X");

    // A replayed callback is a 200 re-reporting the same order
    let req = TestRequest::get().uri(&format!("/payments/esewa/return?data={encoded}")).to_request();
    let res = test::call_service(&service, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let replay: OrderSummary = test::read_body_json(res).await;
    assert!(!replay.newly_created);
    assert_eq!(replay.order_code, summary.order_code);

    // And the poll endpoint now finds it
    let req = TestRequest::get().uri(&format!("/payments/{txid}/order")).to_request();
    let res = test::call_service(&service, req).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[actix_web::test]
async fn forged_esewa_callback_is_forbidden() {
    let db = new_db("ep_esewa_forged").await;
    seed_product(db.pool(), "prod-1", "seller-1", Rupees::from_rupees(1000), 5).await;
    let service = test_service(db, test_config()).await;

    let payload = json!({
        "transaction_code": "EVIL",
        "status": "COMPLETE",
        "total_amount": "1170",
        "transaction_uuid": "tx-unknown",
        "product_code": "EPAYTEST",
        "signed_field_names": "transaction_code,status,total_amount,transaction_uuid,product_code,signed_field_names",
        "signature": "bm90IGEgcmVhbCBzaWduYXR1cmU=",
    });
    let data = base64::encode(payload.to_string());
    let encoded = data.replace('+', "%2B").replace('/', "%2F").replace('=', "%3D");
    let req = TestRequest::get().uri(&format!("/payments/esewa/return?data={encoded}")).to_request();
    let res = test::call_service(&service, req).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn unconfigured_gateway_rejects_checkout() {
    let db = new_db("ep_unconfigured").await;
    seed_product(db.pool(), "prod-1", "seller-1", Rupees::from_rupees(1000), 5).await;
    let mut config = test_config();
    config.esewa = EsewaConfig::default();
    let service = test_service(db, config).await;

    let req = TestRequest::post().uri("/checkout/esewa").set_json(checkout_body("prod-1", 1, "home")).to_request();
    let res = test::call_service(&service, req).await;
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[actix_web::test]
async fn malformed_checkout_body_is_a_400() {
    let db = new_db("ep_bad_body").await;
    let service = test_service(db, test_config()).await;
    let req = TestRequest::post().uri("/orders/cod").set_json(json!({"product_id": "prod-1"})).to_request();
    let res = test::call_service(&service, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn order_poll_is_404_before_the_callback() {
    let db = new_db("ep_poll").await;
    let service = test_service(db, test_config()).await;
    let req = TestRequest::get().uri("/payments/tx-nothing/order").to_request();
    let res = test::call_service(&service, req).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}
