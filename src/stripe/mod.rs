//! Stripe integration via REST API (no SDK dependency)

use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use sha2::Sha256;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// One checkout line item (amounts in USD cents)
pub struct CheckoutItem {
    pub name: String,
    pub unit_amount_cents: i64,
    pub quantity: i64,
}

/// Shipping details carried through the session metadata so the webhook
/// can build the order without another lookup.
pub struct CheckoutShipping {
    pub street: String,
    pub city: String,
    pub country: String,
    pub postal_code: String,
    pub phone: String,
}

/// A created checkout session: redirect URL plus the session id
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// Convert a NUMERIC(12,2) amount to Stripe cents.
pub fn to_cents(amount: Decimal) -> Option<i64> {
    (amount * Decimal::from(100)).round().to_i64()
}

/// Create a Stripe Checkout Session (payment mode)
pub async fn create_checkout_session(
    client: &reqwest::Client,
    secret_key: &str,
    customer_email: &str,
    cart_id: &str,
    items: &[CheckoutItem],
    discount_cents: i64,
    shipping: &CheckoutShipping,
    success_url: &str,
    cancel_url: &str,
) -> Result<CheckoutSession, BoxError> {
    let mut form: Vec<(String, String)> = vec![
        ("mode".into(), "payment".into()),
        ("customer_email".into(), customer_email.into()),
        ("client_reference_id".into(), cart_id.into()),
        ("success_url".into(), success_url.into()),
        ("cancel_url".into(), cancel_url.into()),
        ("metadata[cart_id]".into(), cart_id.into()),
        ("metadata[ship_street]".into(), shipping.street.clone()),
        ("metadata[ship_city]".into(), shipping.city.clone()),
        ("metadata[ship_country]".into(), shipping.country.clone()),
        (
            "metadata[ship_postal_code]".into(),
            shipping.postal_code.clone(),
        ),
        ("metadata[ship_phone]".into(), shipping.phone.clone()),
    ];

    for (i, item) in items.iter().enumerate() {
        form.push((
            format!("line_items[{i}][price_data][currency]"),
            "usd".into(),
        ));
        form.push((
            format!("line_items[{i}][price_data][product_data][name]"),
            item.name.clone(),
        ));
        form.push((
            format!("line_items[{i}][price_data][unit_amount]"),
            item.unit_amount_cents.to_string(),
        ));
        form.push((
            format!("line_items[{i}][quantity]"),
            item.quantity.to_string(),
        ));
    }

    // Cart-level discount is passed as a one-off negative-free coupon:
    // Stripe has no negative line items, so create an amount-off coupon inline.
    if discount_cents > 0 {
        let coupon_id = create_amount_off_coupon(client, secret_key, discount_cents).await?;
        form.push(("discounts[0][coupon]".into(), coupon_id));
    }

    let resp: serde_json::Value = client
        .post("https://api.stripe.com/v1/checkout/sessions")
        .basic_auth(secret_key, None::<&str>)
        .form(&form)
        .send()
        .await?
        .json()
        .await?;

    match (resp["id"].as_str(), resp["url"].as_str()) {
        (Some(id), Some(url)) => Ok(CheckoutSession {
            id: id.to_string(),
            url: url.to_string(),
        }),
        _ => Err(format!("Stripe create_checkout failed: {resp}").into()),
    }
}

/// Create a one-off amount-off coupon for a cart-level discount
async fn create_amount_off_coupon(
    client: &reqwest::Client,
    secret_key: &str,
    amount_cents: i64,
) -> Result<String, BoxError> {
    let resp: serde_json::Value = client
        .post("https://api.stripe.com/v1/coupons")
        .basic_auth(secret_key, None::<&str>)
        .form(&[
            ("amount_off", amount_cents.to_string()),
            ("currency", "usd".to_string()),
            ("duration", "once".to_string()),
        ])
        .send()
        .await?
        .json()
        .await?;

    resp["id"]
        .as_str()
        .map(String::from)
        .ok_or_else(|| format!("Stripe create_coupon failed: {resp}").into())
}

/// Retrieve a Checkout Session (used by the client confirmation endpoint)
pub async fn retrieve_checkout_session(
    client: &reqwest::Client,
    secret_key: &str,
    session_id: &str,
) -> Result<serde_json::Value, BoxError> {
    let resp: serde_json::Value = client
        .get(format!(
            "https://api.stripe.com/v1/checkout/sessions/{session_id}"
        ))
        .basic_auth(secret_key, None::<&str>)
        .send()
        .await?
        .json()
        .await?;

    if resp["id"].as_str().is_none() {
        return Err(format!("Stripe retrieve_session failed: {resp}").into());
    }
    Ok(resp)
}

/// Create a full refund for a payment intent
pub async fn create_refund(
    client: &reqwest::Client,
    secret_key: &str,
    payment_intent_id: &str,
) -> Result<String, BoxError> {
    let resp: serde_json::Value = client
        .post("https://api.stripe.com/v1/refunds")
        .basic_auth(secret_key, None::<&str>)
        .form(&[("payment_intent", payment_intent_id)])
        .send()
        .await?
        .json()
        .await?;

    resp["id"]
        .as_str()
        .map(String::from)
        .ok_or_else(|| format!("Stripe create_refund failed: {resp}").into())
}

/// Verify Stripe webhook signature (HMAC-SHA256)
pub fn verify_webhook_signature(
    payload: &[u8],
    sig_header: &str,
    secret: &str,
) -> Result<(), &'static str> {
    let mut timestamp = "";
    let mut signature = "";
    for part in sig_header.split(',') {
        if let Some(t) = part.strip_prefix("t=") {
            timestamp = t;
        } else if let Some(v) = part.strip_prefix("v1=") {
            signature = v;
        }
    }

    if timestamp.is_empty() || signature.is_empty() {
        return Err("Invalid Stripe-Signature header");
    }

    let signed_payload = format!("{timestamp}.{}", std::str::from_utf8(payload).unwrap_or(""));
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).map_err(|_| "HMAC key error")?;
    mac.update(signed_payload.as_bytes());

    // Decode hex signature and use constant-time comparison via hmac::verify_slice
    let sig_bytes = hex::decode(signature).map_err(|_| "Invalid signature hex")?;
    mac.verify_slice(&sig_bytes)
        .map_err(|_| "Webhook signature mismatch")?;

    // Reject events older than 5 minutes to prevent replay attacks
    let ts: i64 = timestamp.parse().map_err(|_| "Invalid timestamp")?;
    let now = chrono::Utc::now().timestamp();
    if (now - ts).abs() > 300 {
        return Err("Webhook timestamp too old");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(payload: &[u8], timestamp: i64, secret: &str) -> String {
        let signed = format!("{timestamp}.{}", std::str::from_utf8(payload).unwrap());
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(signed.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_verify_webhook_signature_valid() {
        let payload = br#"{"id":"evt_1","type":"checkout.session.completed"}"#;
        let ts = chrono::Utc::now().timestamp();
        let sig = sign(payload, ts, "whsec_test");
        let header = format!("t={ts},v1={sig}");
        assert!(verify_webhook_signature(payload, &header, "whsec_test").is_ok());
    }

    #[test]
    fn test_verify_webhook_signature_wrong_secret() {
        let payload = br#"{"id":"evt_1"}"#;
        let ts = chrono::Utc::now().timestamp();
        let sig = sign(payload, ts, "whsec_test");
        let header = format!("t={ts},v1={sig}");
        assert!(verify_webhook_signature(payload, &header, "whsec_other").is_err());
    }

    #[test]
    fn test_verify_webhook_signature_replay() {
        let payload = br#"{"id":"evt_1"}"#;
        let ts = chrono::Utc::now().timestamp() - 600;
        let sig = sign(payload, ts, "whsec_test");
        let header = format!("t={ts},v1={sig}");
        assert_eq!(
            verify_webhook_signature(payload, &header, "whsec_test"),
            Err("Webhook timestamp too old")
        );
    }

    #[test]
    fn test_verify_webhook_signature_malformed_header() {
        assert!(verify_webhook_signature(b"{}", "garbage", "whsec_test").is_err());
    }

    #[test]
    fn test_to_cents() {
        assert_eq!(to_cents(Decimal::new(1999, 2)), Some(1999));
        assert_eq!(to_cents(Decimal::ZERO), Some(0));
        assert_eq!(to_cents(Decimal::from(100)), Some(10000));
    }
}
