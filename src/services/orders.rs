//! Order placement and back-office order handling.
//!
//! Account and guest orders share one path. The owner only decides which
//! account the order is filed under and where the contact details come from.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::db::orders::AdminOrderSummary;
use crate::db::{OrderRepository, UserRepository};
use crate::domain::aggregates::order::{
    NewOrder, Order, OrderDetail, OrderOwner, OrderReceipt, OrderStatus, OrderSummary, PlaceOrder, ValidatedOrder,
};
use crate::domain::checkout::OrderGateway;
use crate::domain::events::OrderEvent;
use crate::domain::value_objects::OrderNumber;
use crate::error::{AppError, Result};
use crate::state::AppState;

#[derive(Clone)]
pub struct OrderService {
    state: AppState,
}

impl OrderService {
    pub fn new(state: AppState) -> Self { Self { state } }

    pub async fn place_order(&self, owner: OrderOwner, request: PlaceOrder) -> Result<OrderReceipt> {
        self.place_order_on(owner, request, Utc::now().date_naive()).await
    }

    /// Validates, stores the order and its lines atomically, then fires the
    /// confirmation email and `orders.placed` event without waiting on either.
    pub async fn place_order_on(&self, owner: OrderOwner, request: PlaceOrder, today: NaiveDate) -> Result<OrderReceipt> {
        let valid = request.validate(owner)?;
        let new_order = self.prepare(owner, valid, today).await?;

        let order = OrderRepository::new(self.state.pool()).create(&new_order).await?;
        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            total = %order.total_amount,
            items = new_order.items.len(),
            guest = matches!(owner, OrderOwner::Guest),
            "Order placed"
        );

        self.send_confirmation(&order);
        self.state
            .events()
            .publish(OrderEvent::Placed {
                order_id: order.id,
                order_number: order.order_number.clone(),
                total: order.total_amount,
                guest: matches!(owner, OrderOwner::Guest),
            })
            .await;

        Ok(OrderReceipt {
            order_id: order.id,
            order_number: order.order_number,
            total: order.total_amount,
            estimated_delivery: order.estimated_delivery,
        })
    }

    async fn prepare(&self, owner: OrderOwner, valid: ValidatedOrder, today: NaiveDate) -> Result<NewOrder> {
        let config = self.state.config();
        let (customer_name, contact_email) = match owner {
            OrderOwner::Account(id) => {
                let user = UserRepository::new(self.state.pool())
                    .get_by_id(id)
                    .await?
                    .ok_or_else(|| AppError::NotFound("User not found".into()))?;
                (user.full_name(), user.email)
            }
            OrderOwner::Guest => {
                let guest = valid.guest.clone().ok_or_else(|| AppError::BadRequest("Missing order data".into()))?;
                (guest.name, guest.email.to_string())
            }
        };

        Ok(NewOrder {
            order_number: valid.order_number.unwrap_or_else(OrderNumber::generate),
            user_id: owner.account_id(config.guest_account_id),
            customer_name,
            contact_email,
            totals: valid.totals,
            payment_method: valid.payment_method,
            shipping_method: valid.shipping_method,
            status: OrderStatus::Processing,
            delivery: valid.delivery,
            estimated_delivery: config.checkout.delivery_policy.estimate(today),
            items: valid.items,
        })
    }

    fn send_confirmation(&self, order: &Order) {
        let Some(email) = self.state.email().cloned() else { return };
        let order = order.clone();
        tokio::spawn(async move {
            let greeting = order.customer_name.split_whitespace().next().unwrap_or("there").to_string();
            if let Err(e) = email.send_order_confirmation(&order.contact_email, &greeting, &order).await {
                tracing::warn!(order_number = %order.order_number, error = %e, "Order confirmation email failed");
            }
        });
    }

    pub async fn history(&self, user_id: Uuid) -> Result<Vec<OrderSummary>> {
        Ok(OrderRepository::new(self.state.pool()).list_for_user(user_id).await?)
    }

    pub async fn detail_for(&self, user_id: Uuid, order_id: Uuid) -> Result<OrderDetail> {
        OrderRepository::new(self.state.pool())
            .get_for_user(user_id, order_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Order not found".into()))
    }

    pub async fn all_orders(&self) -> Result<Vec<AdminOrderSummary>> {
        Ok(OrderRepository::new(self.state.pool()).list_all(self.state.config().guest_account_id).await?)
    }

    pub async fn detail(&self, order_id: Uuid) -> Result<OrderDetail> {
        OrderRepository::new(self.state.pool())
            .get(order_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Order not found".into()))
    }

    /// Any status may follow any other.
    pub async fn update_status(&self, order_id: Uuid, status: OrderStatus) -> Result<Order> {
        let (order, previous) = OrderRepository::new(self.state.pool()).update_status(order_id, status).await?;
        tracing::info!(order_id = %order_id, from = %previous, to = %status, "Order status updated");
        self.state.events().publish(OrderEvent::StatusChanged { order_id, from: previous, to: status }).await;
        Ok(order)
    }
}

/// Submits checkout orders straight to [`OrderService`] for a fixed owner.
#[derive(Clone)]
pub struct InProcessGateway {
    service: OrderService,
    owner: OrderOwner,
}

impl InProcessGateway {
    pub fn new(service: OrderService, owner: OrderOwner) -> Self { Self { service, owner } }
}

#[async_trait]
impl OrderGateway for InProcessGateway {
    type Error = AppError;

    async fn place_order(&self, order: PlaceOrder) -> Result<OrderReceipt> {
        self.service.place_order(self.owner, order).await
    }
}
