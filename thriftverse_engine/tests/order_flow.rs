use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use log::*;
use thriftverse_engine::{
    db_types::{
        CheckoutIntent,
        MetadataState,
        NewPaymentMetadata,
        OrderStatusType,
        PaymentChannel,
        ProductStatus,
        ShippingAddress,
        ShippingOption,
        TransactionId,
    },
    events::{EventHandler, EventProducers},
    test_utils::{
        prepare_env::{prepare_test_env, random_db_path},
        seed::{seed_product, seed_seller},
    },
    MarketplaceDatabase,
    MarketplaceError,
    OrderFlowApi,
    OrderFlowError,
    SqliteDatabase,
};
use tv_common::Rupees;

fn kathmandu_address() -> ShippingAddress {
    ShippingAddress {
        street: "Jhamsikhel Marg 12".to_string(),
        city: "Lalitpur".to_string(),
        district: "Lalitpur".to_string(),
        country: "Nepal".to_string(),
        phone: "+977-9801234567".to_string(),
    }
}

fn staged_payment(
    txid: &TransactionId,
    product_id: &str,
    seller_id: &str,
    amount: Rupees,
    quantity: i64,
    shipping_option: ShippingOption,
    channel: PaymentChannel,
) -> NewPaymentMetadata {
    NewPaymentMetadata {
        transaction_id: txid.clone(),
        product_id: product_id.to_string(),
        seller_id: seller_id.to_string(),
        buyer_email: "buyer@example.com".to_string(),
        buyer_name: "Binita Shrestha".to_string(),
        shipping_address: kathmandu_address(),
        amount,
        quantity,
        shipping_option,
        payment_channel: channel,
        buyer_notes: None,
    }
}

async fn new_db(name: &str) -> SqliteDatabase {
    let url = random_db_path(name);
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

#[tokio::test]
async fn repeated_callbacks_materialize_one_order() {
    let db = new_db("repeat_callbacks").await;
    seed_product(db.pool(), "prod-1", "seller-1", Rupees::from_rupees(1000), 5).await;
    let api = OrderFlowApi::new(db.clone(), EventProducers::default());

    let txid = TransactionId::fresh();
    let meta = staged_payment(
        &txid,
        "prod-1",
        "seller-1",
        Rupees::from_rupees(1170),
        1,
        ShippingOption::Home,
        PaymentChannel::Esewa,
    );
    api.stage_payment(meta).await.expect("Error staging payment");

    let first = api.create_order_from_payment(&txid, "ESW-000123").await.expect("Error creating order");
    assert!(first.newly_created);
    let second = api.create_order_from_payment(&txid, "ESW-000123").await.expect("Error on repeat callback");
    assert!(!second.newly_created);
    assert_eq!(first.order.id, second.order.id);
    assert_eq!(first.order.order_code, second.order.order_code);

    // Inventory moved exactly once
    let product = db.fetch_product("prod-1").await.expect("Error fetching product").expect("Product missing");
    assert_eq!(product.availability_count, 4);
    assert_eq!(product.status, ProductStatus::Available);

    // Metadata reached its terminal state, carrying the gateway reference and order id
    let meta = db.fetch_payment_metadata(&txid).await.expect("Error fetching metadata").expect("Metadata missing");
    assert_eq!(meta.state, MetadataState::Processed {
        transaction_code: "ESW-000123".to_string(),
        order_id: first.order.id
    });

    let mut db = db;
    db.close().await.expect("Error closing database");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_callback_burst_yields_one_order() {
    let db = new_db("concurrent_callbacks").await;
    seed_product(db.pool(), "prod-1", "seller-1", Rupees::from_rupees(500), 10).await;
    let api = Arc::new(OrderFlowApi::new(db.clone(), EventProducers::default()));

    let txid = TransactionId::fresh();
    let meta = staged_payment(
        &txid,
        "prod-1",
        "seller-1",
        Rupees::from_rupees(620),
        1,
        ShippingOption::Branch,
        PaymentChannel::Fonepay,
    );
    api.stage_payment(meta).await.expect("Error staging payment");

    let mut handles = Vec::new();
    for i in 0..8 {
        let api = Arc::clone(&api);
        let txid = txid.clone();
        handles.push(tokio::spawn(async move {
            debug!("Callback attempt {i}");
            api.create_order_from_payment(&txid, "FP-77001").await
        }));
    }
    let mut fresh = 0;
    let mut order_ids = Vec::new();
    for handle in handles {
        let result = handle.await.expect("Task panicked").expect("Error materializing order");
        if result.newly_created {
            fresh += 1;
        }
        order_ids.push(result.order.id);
    }
    assert_eq!(fresh, 1, "exactly one callback should win the materialization race");
    assert!(order_ids.windows(2).all(|w| w[0] == w[1]), "every caller sees the same order");

    let product = db.fetch_product("prod-1").await.expect("Error fetching product").expect("Product missing");
    assert_eq!(product.availability_count, 9, "inventory decremented exactly once");
}

#[tokio::test]
async fn earnings_split_by_channel() {
    let db = new_db("earnings_split").await;
    seed_product(db.pool(), "prod-gw", "seller-1", Rupees::from_rupees(1000), 5).await;
    seed_product(db.pool(), "prod-cod", "seller-1", Rupees::from_rupees(1000), 5).await;
    let api = OrderFlowApi::new(db.clone(), EventProducers::default());

    // Gateway payment: 3% platform fee on the product cost, shipping excluded from the split
    let txid = TransactionId::fresh();
    let meta = staged_payment(
        &txid,
        "prod-gw",
        "seller-1",
        Rupees::from_rupees(1170),
        1,
        ShippingOption::Home,
        PaymentChannel::Esewa,
    );
    api.stage_payment(meta).await.expect("Error staging payment");
    let order = api.create_order_from_payment(&txid, "ESW-55").await.expect("Error creating order").order;
    assert_eq!(order.amount, Rupees::from_rupees(1170));
    assert_eq!(order.shipping_fee, Rupees::from_rupees(170));
    assert_eq!(order.product_cost(), Rupees::from_rupees(1000));
    assert_eq!(order.sellers_earning, Rupees::from_rupees(950));
    assert_eq!(order.platform_earnings, Rupees::from_rupees(30));

    // COD: 5% platform fee on the same product cost
    let intent = CheckoutIntent {
        product_id: "prod-cod".to_string(),
        buyer_email: "buyer@example.com".to_string(),
        buyer_name: "Binita Shrestha".to_string(),
        shipping_address: kathmandu_address(),
        quantity: 1,
        shipping_option: ShippingOption::Home,
        buyer_notes: None,
    };
    let order = api.create_cod_order(intent).await.expect("Error creating COD order").order;
    assert_eq!(order.amount, Rupees::from_rupees(1170));
    assert_eq!(order.sellers_earning, Rupees::from_rupees(950));
    assert_eq!(order.platform_earnings, Rupees::from_rupees(50));
}

#[tokio::test]
async fn oversell_floors_stock_at_zero() {
    let db = new_db("oversell").await;
    seed_product(db.pool(), "prod-1", "seller-1", Rupees::from_rupees(200), 2).await;
    let api = OrderFlowApi::new(db.clone(), EventProducers::default());

    let txid = TransactionId::fresh();
    let meta = staged_payment(
        &txid,
        "prod-1",
        "seller-1",
        Rupees::from_rupees(1000),
        5,
        ShippingOption::None,
        PaymentChannel::Esewa,
    );
    api.stage_payment(meta).await.expect("Error staging payment");
    let order = api.create_order_from_payment(&txid, "ESW-90").await.expect("Error creating order").order;
    assert_eq!(order.quantity, 5, "the order records what the buyer paid for");

    let product = db.fetch_product("prod-1").await.expect("Error fetching product").expect("Product missing");
    assert_eq!(product.availability_count, 0, "stock floors at zero instead of going negative");
    assert_eq!(product.status, ProductStatus::OutOfStock);
}

#[tokio::test]
async fn shipping_fee_comes_from_the_stored_option() {
    let db = new_db("shipping_fees").await;
    let api = OrderFlowApi::new(db.clone(), EventProducers::default());
    let cases = [
        (ShippingOption::Home, Rupees::from_rupees(170)),
        (ShippingOption::Branch, Rupees::from_rupees(120)),
        (ShippingOption::None, Rupees::from_rupees(0)),
    ];
    for (i, (option, fee)) in cases.into_iter().enumerate() {
        let product_id = format!("prod-{i}");
        seed_product(db.pool(), &product_id, "seller-1", Rupees::from_rupees(300), 3).await;
        let txid = TransactionId::fresh();
        let amount = Rupees::from_rupees(300) + fee;
        let meta =
            staged_payment(&txid, &product_id, "seller-1", amount, 1, option, PaymentChannel::Fonepay);
        api.stage_payment(meta).await.expect("Error staging payment");
        let order = api.create_order_from_payment(&txid, "FP-1").await.expect("Error creating order").order;
        assert_eq!(order.shipping_fee, fee);
        assert_eq!(order.amount, order.product_cost() + order.shipping_fee);
    }
}

#[tokio::test]
async fn checkout_quotes_the_amount_from_the_product() {
    let db = new_db("checkout_quote").await;
    seed_product(db.pool(), "prod-1", "seller-1", Rupees::from_rupees(250), 6).await;
    let api = OrderFlowApi::new(db.clone(), EventProducers::default());

    let intent = CheckoutIntent {
        product_id: "prod-1".to_string(),
        buyer_email: "buyer@example.com".to_string(),
        buyer_name: "Binita Shrestha".to_string(),
        shipping_address: kathmandu_address(),
        quantity: 3,
        shipping_option: ShippingOption::Branch,
        buyer_notes: None,
    };
    let staged = api.stage_checkout(intent, PaymentChannel::Esewa).await.expect("Error staging checkout");
    // 3 × 250 + 120 branch shipping
    assert_eq!(staged.amount, Rupees::from_rupees(870));
    assert_eq!(staged.seller_id, "seller-1");
    assert!(!staged.state.is_processed());

    let fetched = api
        .payment_metadata(&staged.transaction_id)
        .await
        .expect("Error fetching metadata")
        .expect("Metadata missing");
    assert_eq!(fetched.amount, staged.amount);
}

#[tokio::test]
async fn checkout_rejects_orders_the_stock_cannot_cover() {
    let db = new_db("checkout_stock_gate").await;
    seed_product(db.pool(), "prod-empty", "seller-1", Rupees::from_rupees(300), 0).await;
    seed_product(db.pool(), "prod-low", "seller-1", Rupees::from_rupees(300), 1).await;
    let api = OrderFlowApi::new(db, EventProducers::default());

    let mut intent = CheckoutIntent {
        product_id: "prod-empty".to_string(),
        buyer_email: "buyer@example.com".to_string(),
        buyer_name: "Binita Shrestha".to_string(),
        shipping_address: kathmandu_address(),
        quantity: 1,
        shipping_option: ShippingOption::Branch,
        buyer_notes: None,
    };
    let err = api
        .stage_checkout(intent.clone(), PaymentChannel::Esewa)
        .await
        .expect_err("A sold-out product must not be checked out");
    assert!(matches!(err, OrderFlowError::InsufficientStock { available: 0, .. }));

    // A listing with some stock still cannot cover a larger order
    intent.product_id = "prod-low".to_string();
    intent.quantity = 2;
    let err = api
        .stage_checkout(intent, PaymentChannel::Fonepay)
        .await
        .expect_err("Quantity above the available stock must be rejected");
    assert!(matches!(err, OrderFlowError::InsufficientStock { requested: 2, available: 1, .. }));
}

#[tokio::test]
async fn cod_orders_respect_the_stock_gate() {
    let db = new_db("cod_stock_gate").await;
    seed_product(db.pool(), "prod-1", "seller-1", Rupees::from_rupees(450), 0).await;
    let api = OrderFlowApi::new(db.clone(), EventProducers::default());

    let intent = CheckoutIntent {
        product_id: "prod-1".to_string(),
        buyer_email: "buyer@example.com".to_string(),
        buyer_name: "Binita Shrestha".to_string(),
        shipping_address: kathmandu_address(),
        quantity: 1,
        shipping_option: ShippingOption::Home,
        buyer_notes: None,
    };
    let err = api.create_cod_order(intent).await.expect_err("A sold-out product must not be COD-ordered");
    assert!(matches!(err, OrderFlowError::InsufficientStock { available: 0, .. }));

    let product = db.fetch_product("prod-1").await.expect("Error fetching product").expect("Product missing");
    assert_eq!(product.availability_count, 0, "a rejected order must not touch inventory");
}

#[tokio::test]
async fn staging_rejects_bad_quantities_and_amounts() {
    let db = new_db("staging_validation").await;
    let api = OrderFlowApi::new(db, EventProducers::default());

    let txid = TransactionId::fresh();
    let mut meta = staged_payment(
        &txid,
        "prod-1",
        "seller-1",
        Rupees::from_rupees(500),
        0,
        ShippingOption::Home,
        PaymentChannel::Esewa,
    );
    let err = api.stage_payment(meta.clone()).await.expect_err("Zero quantity must be rejected");
    assert!(matches!(err, OrderFlowError::InvalidQuantity(0)));

    meta.quantity = 1;
    meta.amount = Rupees::from_rupees(100);
    let err = api.stage_payment(meta).await.expect_err("Amount below the shipping fee must be rejected");
    assert!(matches!(err, OrderFlowError::AmountBelowShippingFee { .. }));
}

#[tokio::test]
async fn cod_orders_skip_the_gateway() {
    let db = new_db("cod_orders").await;
    seed_product(db.pool(), "prod-1", "seller-1", Rupees::from_rupees(450), 4).await;
    let api = OrderFlowApi::new(db.clone(), EventProducers::default());

    let intent = CheckoutIntent {
        product_id: "prod-1".to_string(),
        buyer_email: "buyer@example.com".to_string(),
        buyer_name: "Binita Shrestha".to_string(),
        shipping_address: kathmandu_address(),
        quantity: 2,
        shipping_option: ShippingOption::Branch,
        buyer_notes: Some("Call before delivery".to_string()),
    };
    let result = api.create_cod_order(intent).await.expect("Error creating COD order");
    assert!(result.newly_created);
    let order = result.order;
    // The server quotes the total itself: 2 × 450 + 120 shipping
    assert_eq!(order.amount, Rupees::from_rupees(1020));
    assert_eq!(order.payment_channel, PaymentChannel::Cod);
    assert!(order.transaction_uuid.as_str().starts_with("cod-"));

    let product = db.fetch_product("prod-1").await.expect("Error fetching product").expect("Product missing");
    assert_eq!(product.availability_count, 2);

    // The synthesized metadata row went straight to Processed
    let meta = db
        .fetch_payment_metadata(&order.transaction_uuid)
        .await
        .expect("Error fetching metadata")
        .expect("Metadata missing");
    assert!(meta.state.is_processed());
    assert_eq!(meta.payment_channel, PaymentChannel::Cod);
}

#[tokio::test]
async fn order_status_moves_forward_only() {
    let db = new_db("order_status").await;
    seed_product(db.pool(), "prod-1", "seller-1", Rupees::from_rupees(600), 3).await;
    let api = OrderFlowApi::new(db.clone(), EventProducers::default());

    let intent = CheckoutIntent {
        product_id: "prod-1".to_string(),
        buyer_email: "buyer@example.com".to_string(),
        buyer_name: "Binita Shrestha".to_string(),
        shipping_address: kathmandu_address(),
        quantity: 1,
        shipping_option: ShippingOption::None,
        buyer_notes: None,
    };
    let order = api.create_cod_order(intent).await.expect("Error creating order").order;
    assert_eq!(order.status, OrderStatusType::Pending);

    // The seller app can look the order up by its human-facing code
    let fetched = api.order_by_code(&order.order_code).await.expect("Error fetching order").expect("Order missing");
    assert_eq!(fetched.id, order.id);

    let order = db.update_order_status(order.id, OrderStatusType::Completed).await.expect("Error updating status");
    assert_eq!(order.status, OrderStatusType::Completed);

    // Completed is terminal; nothing moves it back
    let err = db
        .update_order_status(order.id, OrderStatusType::Cancelled)
        .await
        .expect_err("Terminal orders must not change status");
    assert!(matches!(err, MarketplaceError::IllegalStatusChange(_)));
}

#[tokio::test]
async fn order_created_event_fires_once_per_order() {
    let db = new_db("order_events").await;
    seed_product(db.pool(), "prod-1", "seller-1", Rupees::from_rupees(800), 5).await;
    seed_seller(db.pool(), "seller-1", "seller@example.com", None, false).await;

    let count = Arc::new(AtomicUsize::new(0));
    let c2 = count.clone();
    let handler = EventHandler::new(10, Arc::new(move |_ev| {
        let count = count.clone();
        Box::pin(async move {
            count.fetch_add(1, Ordering::SeqCst);
        }) as std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>>
    }));
    let producers = EventProducers { order_created_producer: vec![handler.subscribe()] };
    let api = OrderFlowApi::new(db, producers);

    let txid = TransactionId::fresh();
    let meta = staged_payment(
        &txid,
        "prod-1",
        "seller-1",
        Rupees::from_rupees(970),
        1,
        ShippingOption::Home,
        PaymentChannel::Esewa,
    );
    api.stage_payment(meta).await.expect("Error staging payment");
    api.create_order_from_payment(&txid, "ESW-1").await.expect("Error creating order");
    api.create_order_from_payment(&txid, "ESW-1").await.expect("Error on repeat callback");
    api.create_order_from_payment(&txid, "ESW-1").await.expect("Error on repeat callback");

    // Dropping the api drops the last producer; the handler loop then drains and exits
    drop(api);
    handler.start_handler().await;
    assert_eq!(c2.load(Ordering::SeqCst), 1, "three callbacks, one event");
}
