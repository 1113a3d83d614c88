use serde_json::{Map, Value};

use crate::utils::currency::format_inr;

const BASE_STYLES: &str = r#"<style>
  body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; line-height: 1.6; color: #333; }
  .container { max-width: 600px; margin: 0 auto; padding: 20px; }
  .header { background: #2563eb; color: white; padding: 20px; border-radius: 8px 8px 0 0; }
  .content { background: #f8fafc; padding: 30px; border-radius: 0 0 8px 8px; }
  .button { background: #2563eb; color: white; padding: 12px 24px; text-decoration: none; border-radius: 6px; display: inline-block; }
</style>"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailTemplate {
    Welcome,
    InvoiceCreated,
    InvoicePaid,
    ProjectUpdate,
    FileUploaded,
    SubscriptionCreated,
    SubscriptionCancelled,
}

impl EmailTemplate {
    pub const ALL: [EmailTemplate; 7] = [
        EmailTemplate::Welcome,
        EmailTemplate::InvoiceCreated,
        EmailTemplate::InvoicePaid,
        EmailTemplate::ProjectUpdate,
        EmailTemplate::FileUploaded,
        EmailTemplate::SubscriptionCreated,
        EmailTemplate::SubscriptionCancelled,
    ];

    pub fn key(self) -> &'static str {
        match self {
            EmailTemplate::Welcome => "welcome",
            EmailTemplate::InvoiceCreated => "invoice-created",
            EmailTemplate::InvoicePaid => "invoice-paid",
            EmailTemplate::ProjectUpdate => "project-update",
            EmailTemplate::FileUploaded => "file-uploaded",
            EmailTemplate::SubscriptionCreated => "subscription-created",
            EmailTemplate::SubscriptionCancelled => "subscription-cancelled",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.key() == key)
    }
}

/// Full HTML document for `template_key`. Unknown keys get the generic
/// notification body.
pub fn render_email_html(template_key: &str, data: &Map<String, Value>) -> String {
    let field = |name: &str| escape_html(&text(data, name));
    let price = || escape_html(&amount(data, "amount"));

    let (heading, body) = match EmailTemplate::from_key(template_key) {
        Some(EmailTemplate::Welcome) => (
            "Welcome to Zyntic!".to_string(),
            format!(
                "<p>Hi {},</p>\
                 <p>Welcome to Zyntic Client Portal! Your account has been successfully created.</p>\
                 <p>You can now start managing your clients and projects efficiently.</p>\
                 <a href=\"{}\" class=\"button\">Go to Dashboard</a>",
                field("firstName"),
                field("dashboardUrl"),
            ),
        ),
        Some(EmailTemplate::InvoiceCreated) => (
            "New Invoice Created".to_string(),
            format!(
                "<p>Hi {},</p>\
                 <p>A new invoice has been created for you:</p>\
                 <ul><li>Invoice Number: {}</li><li>Amount: {}</li><li>Due Date: {}</li></ul>\
                 <a href=\"{}\" class=\"button\">View Invoice</a>",
                field("clientName"),
                field("invoiceNumber"),
                price(),
                field("dueDate"),
                field("invoiceUrl"),
            ),
        ),
        Some(EmailTemplate::InvoicePaid) => (
            "Payment Received".to_string(),
            format!(
                "<p>Hi {},</p>\
                 <p>We have received your payment. Thank you!</p>\
                 <ul><li>Invoice Number: {}</li><li>Amount Paid: {}</li><li>Paid On: {}</li></ul>\
                 <a href=\"{}\" class=\"button\">View Receipt</a>",
                field("clientName"),
                field("invoiceNumber"),
                price(),
                field("paidDate"),
                field("invoiceUrl"),
            ),
        ),
        Some(EmailTemplate::ProjectUpdate) => (
            "Project Update".to_string(),
            format!(
                "<p>Hi {},</p>\
                 <p>There is a new update on <strong>{}</strong>:</p>\
                 <p>{}</p>\
                 <a href=\"{}\" class=\"button\">View Project</a>",
                field("clientName"),
                field("projectName"),
                field("message"),
                field("projectUrl"),
            ),
        ),
        Some(EmailTemplate::FileUploaded) => (
            "New File Shared".to_string(),
            format!(
                "<p>Hi {},</p>\
                 <p>A new file, <strong>{}</strong>, was shared with you on {}.</p>\
                 <a href=\"{}\" class=\"button\">View File</a>",
                field("clientName"),
                field("fileName"),
                field("projectName"),
                field("fileUrl"),
            ),
        ),
        Some(EmailTemplate::SubscriptionCreated) => (
            format!("Welcome to the {} plan!", field("planName")),
            format!(
                "<p>Hi {},</p>\
                 <p>Your subscription to the <strong>{}</strong> plan is set up.</p>\
                 <p>Amount: {} per month</p>\
                 <a href=\"{}\" class=\"button\">Go to Dashboard</a>",
                field("firstName"),
                field("planName"),
                price(),
                field("dashboardUrl"),
            ),
        ),
        Some(EmailTemplate::SubscriptionCancelled) => (
            "Subscription Cancelled".to_string(),
            format!(
                "<p>Hi {},</p>\
                 <p>Your <strong>{}</strong> subscription has been cancelled.</p>\
                 <p>We're sorry to see you go. You can resubscribe at any time.</p>\
                 <a href=\"{}\" class=\"button\">Manage Subscription</a>",
                field("firstName"),
                field("planName"),
                field("dashboardUrl"),
            ),
        ),
        None => (
            "Notification from Zyntic".to_string(),
            "<p>You have a new notification.</p>".to_string(),
        ),
    };

    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\">{BASE_STYLES}</head><body>\
         <div class=\"container\"><div class=\"header\"><h1>{heading}</h1></div>\
         <div class=\"content\">{body}</div></div></body></html>"
    )
}

fn text(data: &Map<String, Value>, name: &str) -> String {
    match data.get(name) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn amount(data: &Map<String, Value>, name: &str) -> String {
    match data.get(name) {
        Some(Value::Number(n)) => n.as_f64().map(format_inr).unwrap_or_default(),
        _ => text(data, name),
    }
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
