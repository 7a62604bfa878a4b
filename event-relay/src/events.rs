//! Storefront event reshaping.
//!
//! Each inbound event name maps to an [`EventKind`]. The kind decides how
//! the caller's properties become one or more vendor events. Transforms are
//! pure: they only plan the calls, the track route performs them.

use crate::errors::{RelayError, Result};
use crate::protocol::Properties;
use serde_json::{Map as JsonMap, Value as JsonValue};

pub const DISTINCT_ID: &str = "distinct_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    AddToCart,
    CreateCheckout,
    UpdateCheckout,
    KlarnaPaymentInit,
    StripePaymentInit,
    Order,
    /// Any name not listed above
    Generic,
}

const NAMED_KINDS: &[(&str, EventKind)] = &[
    ("Add to Cart", EventKind::AddToCart),
    ("Create Checkout", EventKind::CreateCheckout),
    ("Update Checkout", EventKind::UpdateCheckout),
    ("Klarna Payment Init", EventKind::KlarnaPaymentInit),
    ("Stripe Payment Init", EventKind::StripePaymentInit),
    ("Order", EventKind::Order),
];

impl EventKind {
    pub fn from_name(name: &str) -> Self {
        NAMED_KINDS
            .iter()
            .find(|(known, _)| *known == name)
            .map(|(_, kind)| *kind)
            .unwrap_or(EventKind::Generic)
    }

    /// Metric tag for this kind.
    pub const fn as_str(&self) -> &'static str {
        match self {
            EventKind::AddToCart => "add_to_cart",
            EventKind::CreateCheckout => "create_checkout",
            EventKind::UpdateCheckout => "update_checkout",
            EventKind::KlarnaPaymentInit => "klarna_payment_init",
            EventKind::StripePaymentInit => "stripe_payment_init",
            EventKind::Order => "order",
            EventKind::Generic => "generic",
        }
    }

    /// Plans the vendor calls for `event` sent on behalf of `user_id`.
    pub fn plan(
        &self,
        event: &str,
        properties: Properties,
        user_id: &str,
    ) -> Result<Dispatch> {
        match self {
            EventKind::AddToCart => add_to_cart(event, &properties, user_id).map(Dispatch::FanOut),
            EventKind::Order => order(event, &properties, user_id).map(Dispatch::Single),
            EventKind::CreateCheckout
            | EventKind::UpdateCheckout
            | EventKind::KlarnaPaymentInit
            | EventKind::StripePaymentInit
            | EventKind::Generic => Ok(Dispatch::Single(pass_through(event, properties, user_id))),
        }
    }
}

/// One planned vendor track call
#[derive(Debug, Clone, PartialEq)]
pub struct VendorEvent {
    pub name: String,
    pub properties: Properties,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Reported to the caller as a single vendor response
    Single(VendorEvent),
    /// Sent concurrently, reported as a sequence in the same order
    FanOut(Vec<VendorEvent>),
}

impl Dispatch {
    pub fn len(&self) -> usize {
        match self {
            Dispatch::Single(_) => 1,
            Dispatch::FanOut(events) => events.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Forwards the caller's properties with `distinct_id` set to the user.
fn pass_through(event: &str, mut properties: Properties, user_id: &str) -> VendorEvent {
    properties.insert(DISTINCT_ID.into(), user_id.into());
    VendorEvent {
        name: event.to_string(),
        properties,
    }
}

/// One event per cart item, sharing currency and shipping country.
fn add_to_cart(
    event: &str,
    properties: &Properties,
    user_id: &str,
) -> Result<Vec<VendorEvent>> {
    let items = items(event, properties)?;
    let currency = present(properties.get("Currency"));
    let shipping_country = present(properties.get("Shipping Country"));

    let events = items
        .iter()
        .map(|item| {
            let mut out = Properties::new();
            out.insert(DISTINCT_ID.into(), user_id.into());
            insert_present(&mut out, "Currency", currency);
            insert_present(&mut out, "Quantity", present(item.get("quantity")));
            insert_present(&mut out, "ProductId", present(item.get("id")));
            insert_present(&mut out, "Shipping Country", shipping_country);

            VendorEvent {
                name: event.to_string(),
                properties: out,
            }
        })
        .collect();

    Ok(events)
}

/// A single event summarising the order and its line items.
fn order(event: &str, properties: &Properties, user_id: &str) -> Result<VendorEvent> {
    let items = items(event, properties)?;

    let line_items: Vec<JsonValue> = items
        .iter()
        .map(|item| {
            let mut line = serde_json::Map::new();
            for (from, to) in [
                ("id", "Product Id"),
                ("name", "Product Name"),
                ("quantity", "Quantity"),
                ("price", "Price"),
            ] {
                if let Some(value) = present(item.get(from)) {
                    line.insert(to.into(), value.clone());
                }
            }
            JsonValue::Object(line)
        })
        .collect();

    let mut out = Properties::new();
    out.insert(DISTINCT_ID.into(), user_id.into());
    insert_present(&mut out, "Order ID", present(properties.get("orderId")));
    insert_present(&mut out, "Total Amount", present(properties.get("total")));
    insert_present(&mut out, "Currency", present(properties.get("currency")));
    out.insert("Number of Items".into(), items.len().into());
    insert_present(
        &mut out,
        "Shipping Country",
        present(properties.get("shippingCountry")),
    );
    insert_present(
        &mut out,
        "Payment Method",
        present(properties.get("paymentMethod")),
    );
    out.insert("Items".into(), JsonValue::Array(line_items));

    Ok(VendorEvent {
        name: event.to_string(),
        properties: out,
    })
}

/// The `items` array, every entry of which must be an object.
fn items<'a>(event: &str, properties: &'a Properties) -> Result<Vec<&'a JsonMap<String, JsonValue>>> {
    let invalid = |reason: &str| RelayError::InvalidProperties {
        event: event.to_string(),
        reason: reason.to_string(),
    };

    properties
        .get("items")
        .and_then(JsonValue::as_array)
        .ok_or_else(|| invalid("`items` must be an array"))?
        .iter()
        .map(|item| item.as_object().ok_or_else(|| invalid("`items` entries must be objects")))
        .collect()
}

fn present(value: Option<&JsonValue>) -> Option<&JsonValue> {
    value.filter(|v| !v.is_null())
}

fn insert_present(out: &mut Properties, key: &str, value: Option<&JsonValue>) {
    if let Some(value) = value {
        out.insert(key.to_string(), value.clone());
    }
}
