use aws_sdk_sesv2::Client as SesClient;
use aws_sdk_sesv2::types::{Body, Content, Destination, EmailContent, Message};

pub async fn send_verification_code(
    ses: &SesClient,
    from: &str,
    to: &str,
    code: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let subject = Content::builder().data("Your verification code").build()?;

    let body_text = format!(
        "Your verification code is: {code}\n\
         Valid for 10 minutes.\n\n\
         If you did not create an account, you can ignore this email."
    );

    let body = Body::builder()
        .text(Content::builder().data(body_text).build()?)
        .build();

    let message = Message::builder().subject(subject).body(body).build();

    ses.send_email()
        .from_email_address(from)
        .destination(Destination::builder().to_addresses(to).build())
        .content(EmailContent::builder().simple(message).build())
        .send()
        .await?;

    tracing::info!(to = to, "Verification code sent");
    Ok(())
}

pub async fn send_password_reset_code(
    ses: &SesClient,
    from: &str,
    to: &str,
    code: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let subject = Content::builder().data("Reset your password").build()?;

    let body_text = format!(
        "Your password reset code is: {code}\n\
         Valid for 10 minutes.\n\n\
         If you did not request a reset, you can ignore this email."
    );

    let body = Body::builder()
        .text(Content::builder().data(body_text).build()?)
        .build();

    let message = Message::builder().subject(subject).body(body).build();

    ses.send_email()
        .from_email_address(from)
        .destination(Destination::builder().to_addresses(to).build())
        .content(EmailContent::builder().simple(message).build())
        .send()
        .await?;

    tracing::info!(to = to, "Password reset code sent");
    Ok(())
}

pub async fn send_order_confirmation(
    ses: &SesClient,
    from: &str,
    to: &str,
    order_id: &str,
    total: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let subject = Content::builder()
        .data(format!("Order {order_id} confirmed"))
        .build()?;

    let body_text = format!(
        "Thank you for your order!\n\n\
         Order ID: {order_id}\n\
         Total: ${total}\n\n\
         We'll let you know when it ships."
    );

    let body = Body::builder()
        .text(Content::builder().data(body_text).build()?)
        .build();

    let message = Message::builder().subject(subject).body(body).build();

    ses.send_email()
        .from_email_address(from)
        .destination(Destination::builder().to_addresses(to).build())
        .content(EmailContent::builder().simple(message).build())
        .send()
        .await?;

    tracing::info!(to = to, order_id = order_id, "Order confirmation sent");
    Ok(())
}

pub async fn send_admin_order_notification(
    ses: &SesClient,
    from: &str,
    admin: &str,
    order_id: &str,
    customer_email: &str,
    total: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let subject = Content::builder()
        .data(format!("New order {order_id}"))
        .build()?;

    let body_text = format!(
        "A new order has been placed.\n\n\
         Order ID: {order_id}\n\
         Customer: {customer_email}\n\
         Total: ${total}"
    );

    let body = Body::builder()
        .text(Content::builder().data(body_text).build()?)
        .build();

    let message = Message::builder().subject(subject).body(body).build();

    ses.send_email()
        .from_email_address(from)
        .destination(Destination::builder().to_addresses(admin).build())
        .content(EmailContent::builder().simple(message).build())
        .send()
        .await?;

    tracing::info!(order_id = order_id, "Admin order notification sent");
    Ok(())
}

pub async fn send_message_response(
    ses: &SesClient,
    from: &str,
    to: &str,
    subject_line: &str,
    response: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let subject = Content::builder()
        .data(format!("Re: {subject_line}"))
        .build()?;

    let body = Body::builder()
        .text(Content::builder().data(response.to_string()).build()?)
        .build();

    let message = Message::builder().subject(subject).body(body).build();

    ses.send_email()
        .from_email_address(from)
        .destination(Destination::builder().to_addresses(to).build())
        .content(EmailContent::builder().simple(message).build())
        .send()
        .await?;

    tracing::info!(to = to, "Contact message response sent");
    Ok(())
}

pub async fn send_refund_processed(
    ses: &SesClient,
    from: &str,
    to: &str,
    order_id: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let subject = Content::builder().data("Refund processed").build()?;

    let body_text = format!(
        "Your refund for order {order_id} has been processed.\n\
         The amount will be returned to your original payment method."
    );

    let body = Body::builder()
        .text(Content::builder().data(body_text).build()?)
        .build();

    let message = Message::builder().subject(subject).body(body).build();

    ses.send_email()
        .from_email_address(from)
        .destination(Destination::builder().to_addresses(to).build())
        .content(EmailContent::builder().simple(message).build())
        .send()
        .await?;

    tracing::info!(to = to, order_id = order_id, "Refund processed email sent");
    Ok(())
}
