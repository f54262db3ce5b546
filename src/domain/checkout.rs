//! Checkout workflow
//!
//! Validates the shipping/contact form, turns the cart into an order payload
//! and hands it to an [`OrderGateway`]. At most one submission runs at a time
//! per workflow.

use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

use crate::domain::aggregates::cart::{Cart, CartItem, CartTotals};
use crate::domain::aggregates::order::{CustomerContact, OrderHeader, OrderLine, OrderReceipt, OrderTotals, PlaceOrder};
use crate::domain::field_errors::FieldErrors;
use crate::domain::value_objects::{EmailAddress, Money, OrderNumber};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CheckoutForm {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub mobile: String,
    pub address: String,
    pub city: String,
    pub region: String,
    pub country: String,
    pub postal_code: String,
    pub shipping_method: ShippingMethod,
    pub payment_method: String,
}

impl Default for CheckoutForm {
    fn default() -> Self {
        Self {
            email: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            mobile: String::new(),
            address: String::new(),
            city: "Islamabad".to_string(),
            region: "Islamabad Capital Territory".to_string(),
            country: "Pakistan".to_string(),
            postal_code: String::new(),
            shipping_method: ShippingMethod::Standard,
            payment_method: PlaceOrder::DEFAULT_PAYMENT_METHOD.to_string(),
        }
    }
}

impl CheckoutForm {
    /// Field-keyed errors; empty when the form may be submitted.
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if let Err(e) = EmailAddress::parse(&self.email) {
            errors.add("email", e.to_string());
        }
        let required = [
            ("firstName", &self.first_name, "First name is required"),
            ("lastName", &self.last_name, "Last name is required"),
            ("mobile", &self.mobile, "Mobile number is required"),
            ("address", &self.address, "Address is required"),
            ("postalCode", &self.postal_code, "Postal code is required"),
        ];
        for (field, value, message) in required {
            if value.trim().is_empty() {
                errors.add(field, message);
            }
        }
        errors
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
    }
}

/// No threshold upgrade: `Free` is only ever chosen explicitly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShippingMethod {
    #[default]
    Standard,
    Free,
}

impl ShippingMethod {
    pub fn cost(&self, standard_fee: Money) -> Money {
        match self {
            Self::Standard => standard_fee,
            Self::Free => Money::ZERO,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "Standard",
            Self::Free => "Free",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeliveryPolicy {
    /// Count forward this many weekdays, skipping Saturday and Sunday.
    BusinessDays(u32),
    CalendarDays(u32),
}

impl Default for DeliveryPolicy {
    fn default() -> Self { Self::BusinessDays(7) }
}

impl DeliveryPolicy {
    pub fn estimate(&self, today: NaiveDate) -> NaiveDate {
        match *self {
            Self::CalendarDays(days) => today + Duration::days(i64::from(days)),
            Self::BusinessDays(days) => {
                let mut date = today;
                let mut remaining = days;
                while remaining > 0 {
                    date += Duration::days(1);
                    if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
                        remaining -= 1;
                    }
                }
                date
            }
        }
    }
}

impl FromStr for DeliveryPolicy {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "business-days" => Ok(Self::BusinessDays(7)),
            "calendar-days" => Ok(Self::CalendarDays(7)),
            other => Err(format!("unknown delivery policy `{other}`")),
        }
    }
}

impl fmt::Display for DeliveryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BusinessDays(n) => write!(f, "{n} business days"),
            Self::CalendarDays(n) => write!(f, "{n} calendar days"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CheckoutSettings {
    pub shipping_fee: Money,
    pub delivery_policy: DeliveryPolicy,
}

impl Default for CheckoutSettings {
    fn default() -> Self {
        Self { shipping_fee: Money::from(220), delivery_policy: DeliveryPolicy::default() }
    }
}

/// A cart plus form rendered into the order payload.
#[derive(Clone, Debug)]
pub struct OrderDraft {
    pub request: PlaceOrder,
    pub order_number: OrderNumber,
    pub totals: OrderTotals,
    pub estimated_delivery: NaiveDate,
}

impl OrderDraft {
    pub fn from_cart(cart: &Cart, form: &CheckoutForm, settings: &CheckoutSettings, today: NaiveDate) -> Self {
        let cart_totals = cart.totals();
        let shipping = form.shipping_method.cost(settings.shipping_fee);
        let totals = OrderTotals::compute(cart_totals.subtotal, cart_totals.discount, shipping);
        let order_number = OrderNumber::generate();
        let estimated_delivery = settings.delivery_policy.estimate(today);
        let payment_method = match form.payment_method.trim() {
            "" => PlaceOrder::DEFAULT_PAYMENT_METHOD.to_string(),
            label => label.to_string(),
        };

        let request = PlaceOrder {
            customer: Some(CustomerContact {
                name: form.full_name(),
                email: form.email.trim().to_string(),
                phone: Some(form.mobile.trim().to_string()),
                address: Some(form.address.trim().to_string()),
            }),
            order: OrderHeader {
                order_number: Some(order_number.to_string()),
                subtotal: totals.subtotal.amount(),
                shipping_cost: totals.shipping.amount(),
                discount: totals.discount.amount(),
                total_amount: totals.total.amount(),
                payment_method: Some(payment_method),
                shipping_method: Some(form.shipping_method.as_str().to_string()),
                delivery_address: Some(form.address.trim().to_string()),
                delivery_city: Some(form.city.trim().to_string()),
                delivery_postal_code: Some(form.postal_code.trim().to_string()),
                delivery_phone: Some(form.mobile.trim().to_string()),
            },
            items: cart.items().iter().map(order_line).collect(),
        };
        Self { request, order_number, totals, estimated_delivery }
    }
}

fn order_line(item: &CartItem) -> OrderLine {
    OrderLine {
        product_id: Some(item.product_id),
        product_name: item.name.clone(),
        quantity: i64::from(item.quantity),
        price: item.unit_price.amount(),
    }
}

/// Where a checkout sends its order.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn place_order(&self, order: PlaceOrder) -> Result<OrderReceipt, Self::Error>;
}

/// Snapshot of the last successful order, for a confirmation screen.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Confirmation {
    pub receipt: OrderReceipt,
    pub email: String,
    pub items: Vec<CartItem>,
    pub cart_totals: CartTotals,
    pub shipping: Money,
}

#[derive(Debug, Error)]
pub enum CheckoutError<E: std::error::Error + 'static> {
    #[error("An order is already being submitted")]
    InFlight,
    #[error("Please fill in all required fields")]
    Invalid(FieldErrors),
    #[error("Your cart is empty")]
    EmptyCart,
    #[error("{0}")]
    Rejected(E),
}

pub struct CheckoutWorkflow<G> {
    gateway: G,
    settings: CheckoutSettings,
    in_flight: AtomicBool,
    last_order: Mutex<Option<Confirmation>>,
}

/// Releases the in-flight flag when dropped, whatever the outcome.
struct SubmitGuard<'a>(&'a AtomicBool);

impl<'a> SubmitGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).ok().map(|_| Self(flag))
    }
}

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) { self.0.store(false, Ordering::Release); }
}

impl<G: OrderGateway> CheckoutWorkflow<G> {
    pub fn new(gateway: G, settings: CheckoutSettings) -> Self {
        Self { gateway, settings, in_flight: AtomicBool::new(false), last_order: Mutex::new(None) }
    }

    pub fn is_submitting(&self) -> bool { self.in_flight.load(Ordering::Acquire) }

    pub fn last_order(&self) -> Option<Confirmation> {
        self.last_order.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub async fn submit(&self, cart: &mut Cart, form: &CheckoutForm) -> Result<Confirmation, CheckoutError<G::Error>> {
        self.submit_on(cart, form, Utc::now().date_naive()).await
    }

    /// Validation and the empty-cart check run before the gateway is called.
    /// The cart is cleared only after the gateway accepts the order.
    pub async fn submit_on(
        &self,
        cart: &mut Cart,
        form: &CheckoutForm,
        today: NaiveDate,
    ) -> Result<Confirmation, CheckoutError<G::Error>> {
        let _guard = SubmitGuard::acquire(&self.in_flight).ok_or(CheckoutError::InFlight)?;

        form.validate().into_result(()).map_err(CheckoutError::Invalid)?;
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let draft = OrderDraft::from_cart(cart, form, &self.settings, today);
        let receipt = self.gateway.place_order(draft.request).await.map_err(CheckoutError::Rejected)?;
        tracing::info!(order_number = %receipt.order_number, total = %receipt.total, "Checkout completed");

        let confirmation = Confirmation {
            receipt,
            email: form.email.trim().to_string(),
            items: cart.items().to_vec(),
            cart_totals: cart.totals(),
            shipping: draft.totals.shipping,
        };
        *self.last_order.lock().unwrap_or_else(PoisonError::into_inner) = Some(confirmation.clone());
        cart.clear();
        Ok(confirmation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use uuid::Uuid;

    #[derive(Debug, Error)]
    #[error("{0}")]
    struct GatewayError(String);

    #[derive(Default)]
    struct FakeGateway {
        calls: AtomicUsize,
        fail_with: Option<String>,
        sent: Mutex<Vec<PlaceOrder>>,
    }

    #[async_trait]
    impl OrderGateway for FakeGateway {
        type Error = GatewayError;

        async fn place_order(&self, order: PlaceOrder) -> Result<OrderReceipt, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            if let Some(message) = &self.fail_with {
                return Err(GatewayError(message.clone()));
            }
            let receipt = OrderReceipt {
                order_id: Uuid::new_v4(),
                order_number: order.order.order_number.clone().unwrap_or_default(),
                total: order.order.total_amount,
                estimated_delivery: DeliveryPolicy::default().estimate(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()),
            };
            self.sent.lock().unwrap().push(order);
            Ok(receipt)
        }
    }

    fn form() -> CheckoutForm {
        CheckoutForm {
            email: "sara@example.com".into(),
            first_name: "Sara".into(),
            last_name: "Malik".into(),
            mobile: "03001234567".into(),
            address: "House 12, F-7".into(),
            postal_code: "44000".into(),
            ..Default::default()
        }
    }

    fn cart() -> Cart {
        let mut cart = Cart::new();
        cart.add_item(CartItem {
            product_id: Uuid::new_v4(),
            name: "Flat White".into(),
            unit_price: Money::from(350),
            quantity: 2,
            image_url: None,
        });
        cart
    }

    fn friday() -> NaiveDate { NaiveDate::from_ymd_opt(2024, 3, 1).unwrap() }

    #[test]
    fn test_blank_fields_are_reported_per_field() {
        let errors = CheckoutForm { email: "nope".into(), ..Default::default() }.validate();
        for field in ["email", "firstName", "lastName", "mobile", "address", "postalCode"] {
            assert!(errors.contains(field), "missing {field}");
        }
        assert_eq!(errors.get("email"), Some("Invalid email format"));
        assert!(form().validate().is_empty());
    }

    #[test]
    fn test_delivery_estimates() {
        assert_eq!(DeliveryPolicy::BusinessDays(7).estimate(friday()), NaiveDate::from_ymd_opt(2024, 3, 12).unwrap());
        assert_eq!(DeliveryPolicy::CalendarDays(7).estimate(friday()), NaiveDate::from_ymd_opt(2024, 3, 8).unwrap());
        let saturday = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        assert_eq!(DeliveryPolicy::BusinessDays(7).estimate(saturday), NaiveDate::from_ymd_opt(2024, 3, 12).unwrap());
        assert_eq!("calendar-days".parse::<DeliveryPolicy>(), Ok(DeliveryPolicy::CalendarDays(7)));
        assert!("weekly".parse::<DeliveryPolicy>().is_err());
    }

    #[test]
    fn test_draft_from_cart() {
        let mut c = cart();
        c.apply_voucher("SAVE10").unwrap();
        let draft = OrderDraft::from_cart(&c, &form(), &CheckoutSettings::default(), friday());
        assert_eq!(draft.totals.subtotal, Money::from(700));
        assert_eq!(draft.totals.discount, Money::from(70));
        assert_eq!(draft.totals.shipping, Money::from(220));
        assert_eq!(draft.totals.total, Money::from(850));
        assert_eq!(draft.request.items.len(), 1);
        assert_eq!(draft.request.items[0].quantity, 2);
        assert_eq!(draft.request.order.payment_method.as_deref(), Some("COD"));
        assert!(draft.order_number.as_str().starts_with("#ORD-"));
        assert!(draft.request.validate(crate::domain::aggregates::order::OrderOwner::Guest).is_ok());
    }

    #[test]
    fn test_free_shipping_costs_nothing() {
        let f = CheckoutForm { shipping_method: ShippingMethod::Free, ..form() };
        let draft = OrderDraft::from_cart(&cart(), &f, &CheckoutSettings::default(), friday());
        assert_eq!(draft.totals.shipping, Money::ZERO);
        assert_eq!(draft.totals.total, Money::from(700));
    }

    #[tokio::test]
    async fn test_invalid_form_never_reaches_gateway() {
        let workflow = CheckoutWorkflow::new(FakeGateway::default(), CheckoutSettings::default());
        let mut c = cart();
        let result = workflow.submit_on(&mut c, &CheckoutForm { mobile: " ".into(), ..form() }, friday()).await;
        assert!(matches!(result, Err(CheckoutError::Invalid(ref e)) if e.contains("mobile")));
        assert_eq!(workflow.gateway.calls.load(Ordering::SeqCst), 0);
        assert!(!c.is_empty());
        assert!(!workflow.is_submitting());
    }

    #[tokio::test]
    async fn test_empty_cart_is_rejected() {
        let workflow = CheckoutWorkflow::new(FakeGateway::default(), CheckoutSettings::default());
        let result = workflow.submit_on(&mut Cart::new(), &form(), friday()).await;
        assert!(matches!(result, Err(CheckoutError::EmptyCart)));
        assert_eq!(workflow.gateway.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failure_keeps_cart_and_message() {
        let gateway = FakeGateway { fail_with: Some("Failed to create order".into()), ..Default::default() };
        let workflow = CheckoutWorkflow::new(gateway, CheckoutSettings::default());
        let mut c = cart();
        let err = workflow.submit_on(&mut c, &form(), friday()).await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to create order");
        assert_eq!(c.items().len(), 1);
        assert!(workflow.last_order().is_none());
        assert!(!workflow.is_submitting());
    }

    #[tokio::test]
    async fn test_success_clears_cart_and_records_confirmation() {
        let workflow = CheckoutWorkflow::new(FakeGateway::default(), CheckoutSettings::default());
        let mut c = cart();
        let confirmation = workflow.submit_on(&mut c, &form(), friday()).await.unwrap();
        assert!(c.is_empty());
        assert_eq!(confirmation.receipt.estimated_delivery, NaiveDate::from_ymd_opt(2024, 3, 12).unwrap());
        assert_eq!(confirmation.items.len(), 1);
        assert_eq!(workflow.last_order(), Some(confirmation));
        assert_eq!(workflow.gateway.calls.load(Ordering::SeqCst), 1);
        let sent = workflow.gateway.sent.lock().unwrap();
        assert_eq!(sent[0].customer.as_ref().map(|c| c.name.as_str()), Some("Sara Malik"));
    }

    #[tokio::test]
    async fn test_second_submission_while_in_flight() {
        let workflow = CheckoutWorkflow::new(FakeGateway::default(), CheckoutSettings::default());
        let (mut first, mut second) = (cart(), cart());
        let f = form();
        let (a, b) = tokio::join!(workflow.submit_on(&mut first, &f, friday()), workflow.submit_on(&mut second, &f, friday()));
        assert!(a.is_ok());
        assert!(matches!(b, Err(CheckoutError::InFlight)));
        assert_eq!(workflow.gateway.calls.load(Ordering::SeqCst), 1);
        assert!(!second.is_empty());

        // Released after settling.
        assert!(workflow.submit_on(&mut second, &f, friday()).await.is_ok());
    }
}
