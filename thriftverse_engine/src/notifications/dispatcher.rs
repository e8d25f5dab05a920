use log::*;

use crate::{
    db_types::{NewNotification, Order, SellerProfile},
    events::OrderCreatedEvent,
    notifications::{EmailSender, PushSender},
    traits::MarketplaceDatabase,
};

/// Fans an [`OrderCreatedEvent`] out to the buyer and seller. Runs on the event-handler task, with its own database
/// handle, fully decoupled from the request that created the order.
#[derive(Clone)]
pub struct NotificationDispatcher<B, M, P> {
    db: B,
    mailer: M,
    push: P,
}

impl<B, M, P> NotificationDispatcher<B, M, P>
where
    B: MarketplaceDatabase,
    M: EmailSender,
    P: PushSender,
{
    pub fn new(db: B, mailer: M, push: P) -> Self {
        Self { db, mailer, push }
    }

    /// Handle a single order-created event. Infallible by design: each delivery failure is logged and swallowed.
    pub async fn handle_order_created(&self, event: OrderCreatedEvent) {
        let order = &event.order;
        debug!("📬️ Dispatching notifications for order {}", order.order_code);

        self.send_buyer_confirmation(order).await;

        let profile = match self.db.fetch_seller_profile(&order.seller_id).await {
            Ok(Some(profile)) => Some(profile),
            Ok(None) => {
                warn!("📬️ No profile found for seller {} of order {}", order.seller_id, order.order_code);
                None
            },
            Err(e) => {
                error!("📬️ Could not load seller profile for order {}: {e}", order.order_code);
                None
            },
        };
        if let Some(profile) = &profile {
            self.send_seller_email(order, profile).await;
            self.send_seller_push(order, profile).await;
        }
        // The in-app record is written even when the seller profile could not be loaded or push is muted
        self.write_in_app_record(order).await;
    }

    async fn send_buyer_confirmation(&self, order: &Order) {
        let subject = format!("Your ThriftVerse order {} is confirmed", order.order_code);
        let body = format!(
            "Hi {},\n\nWe received your payment of {} (incl. {} shipping). Your order {} is now with the seller.\n\n\
             Payment reference: {}\n",
            order.buyer_name, order.amount, order.shipping_fee, order.order_code, order.transaction_code
        );
        match self.mailer.send(&order.buyer_email, &subject, &body).await {
            Ok(()) => debug!("📬️ Buyer confirmation sent for order {}", order.order_code),
            Err(e) => error!("📬️ Buyer confirmation for order {} failed: {e}", order.order_code),
        }
    }

    async fn send_seller_email(&self, order: &Order, profile: &SellerProfile) {
        let subject = format!("You sold an item! Order {}", order.order_code);
        let body = format!(
            "Hi {},\n\nOrder {} has been placed for {} unit(s). Your earning on this sale is {}.\n\nShip to: {}\n",
            profile.name,
            order.order_code,
            order.quantity,
            order.sellers_earning,
            order.shipping_address.0
        );
        match self.mailer.send(&profile.email, &subject, &body).await {
            Ok(()) => debug!("📬️ Seller email sent for order {}", order.order_code),
            Err(e) => error!("📬️ Seller email for order {} failed: {e}", order.order_code),
        }
    }

    async fn send_seller_push(&self, order: &Order, profile: &SellerProfile) {
        if profile.notifications_muted {
            info!("📬️ Seller {} has muted notifications; skipping push for order {}", profile.id, order.order_code);
            return;
        }
        let Some(token) = profile.push_token.as_deref() else {
            debug!("📬️ Seller {} has no push token registered; skipping push", profile.id);
            return;
        };
        let title = "Item sold!".to_string();
        let body = format!("Order {} · {} for {}", order.order_code, order.quantity, order.amount);
        match self.push.send(token, &title, &body).await {
            Ok(()) => debug!("📬️ Push sent to seller {} for order {}", profile.id, order.order_code),
            Err(e) => error!("📬️ Push to seller {} for order {} failed: {e}", profile.id, order.order_code),
        }
    }

    async fn write_in_app_record(&self, order: &Order) {
        let note = NewNotification {
            seller_id: order.seller_id.clone(),
            order_id: order.id,
            title: "Item sold".to_string(),
            body: format!("Order {} was placed for {} unit(s), {} total", order.order_code, order.quantity, order.amount),
        };
        match self.db.insert_notification(note).await {
            Ok(id) => debug!("📬️ In-app notification #{id} written for order {}", order.order_code),
            Err(e) => error!("📬️ In-app notification for order {} failed: {e}", order.order_code),
        }
    }
}
