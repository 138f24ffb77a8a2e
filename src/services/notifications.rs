use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::AppConfig;
use crate::services::appointments::BookedAppointment;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> anyhow::Result<()>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_email: String,
}

impl SmtpMailer {
    pub fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let creds = Credentials::new(config.smtp_user.clone(), config.smtp_password.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(creds)
            .build();

        Ok(Self {
            transport,
            from_email: config.from_email.clone(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> anyhow::Result<()> {
        let email = Message::builder()
            .from(self.from_email.parse()?)
            .to(to.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body.to_string())?;

        self.transport.send(email).await?;
        Ok(())
    }
}

/// Fire-and-forget booking confirmation. Email failures are logged and
/// swallowed; the appointment has already been persisted and must stand.
pub async fn send_booking_confirmation(
    mailer: &dyn Mailer,
    frontend_url: &str,
    booked: &BookedAppointment,
) {
    let cancel_url = format!("{frontend_url}/cancel/{}", booked.appointment.token);
    let service_names = booked
        .services
        .iter()
        .map(|s| s.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    let body = format!(
        "<html><body>\
         <h1>Your appointment is booked</h1>\
         <p>Hello {name}!</p>\
         <p>Your appointment is confirmed. The details:</p>\
         <ul>\
         <li><strong>Barber:</strong> {barber}</li>\
         <li><strong>Services:</strong> {services}</li>\
         <li><strong>Date &amp; Time:</strong> {when}</li>\
         <li><strong>Duration:</strong> {duration} minutes</li>\
         <li><strong>Price:</strong> ${price:.2}</li>\
         </ul>\
         <p>Need to cancel? You can do so up to 2 hours before the \
         appointment:</p>\
         <p><a href=\"{cancel_url}\">{cancel_url}</a></p>\
         <p>If you didn't book this appointment, please ignore this email.</p>\
         </body></html>",
        name = booked.appointment.client_name,
        barber = booked.barber.name,
        services = service_names,
        when = booked.appointment.appointment_datetime.format("%Y-%m-%d %H:%M"),
        duration = booked.total_duration,
        price = booked.total_price,
    );

    if let Err(e) = mailer
        .send(
            &booked.appointment.client_email,
            "Your Barbershop Appointment",
            &body,
        )
        .await
    {
        tracing::warn!(
            appointment_id = booked.appointment.id,
            "failed to send booking confirmation email: {e}"
        );
    }
}

/// Best-effort cancellation notice, same policy as the booking email.
pub async fn send_cancellation_confirmation(
    mailer: &dyn Mailer,
    client_email: &str,
    client_name: &str,
    when: &str,
) {
    let body = format!(
        "<html><body>\
         <h1>Appointment cancelled</h1>\
         <p>Hello {client_name}!</p>\
         <p>Your appointment on {when} has been cancelled.</p>\
         <p>We hope to see you again soon.</p>\
         </body></html>"
    );

    if let Err(e) = mailer
        .send(client_email, "Your Appointment Has Been Cancelled", &body)
        .await
    {
        tracing::warn!("failed to send cancellation email to {client_email}: {e}");
    }
}
