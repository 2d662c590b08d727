//! "Back in stock" email template

use serde::Serialize;

/// Rendered restock message, ready to hand to an email provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestockEmail {
    pub subject: String,
    pub html: String,
    pub text: String,
}

impl RestockEmail {
    pub fn render(product_name: &str, product_url: &str) -> Self {
        let name = escape_html(product_name);
        let url = escape_html(product_url);

        let html = format!(
            "<h2>Good news! {name} is back in stock.</h2>\
             <p>The product you are tracking is available again.</p>\
             <p><a href=\"{url}\">View {name}</a></p>\
             <p style=\"color:#888;font-size:12px\">{url}</p>"
        );
        let text = format!(
            "Good news! {product_name} is back in stock.\n\n\
             The product you are tracking is available again:\n{product_url}\n"
        );

        Self {
            subject: format!("Back in stock: {product_name}"),
            html,
            text,
        }
    }
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
