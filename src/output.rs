//! Output formatting for CLI display.
//!
//! Provides the [`PrettyPrint`] trait for human-readable output
//! as an alternative to JSON serialization, and [`DoubleRow`] for
//! tabular listings.

use serde_json::Value;
use tabled::Tabled;

use crate::double::Double;
use crate::resolver::{ResolvedResponse, ResponseBody};

/// Trait for human-readable key-value output.
pub trait PrettyPrint {
    /// Returns a formatted string for terminal display.
    fn pretty_print(&self) -> String;
}

impl PrettyPrint for Double {
    fn pretty_print(&self) -> String {
        let heading = format!("{} {}", self.method(), self.url());
        let divider = "─".repeat(heading.chars().count().max(30));

        let mut lines = vec![
            heading,
            divider,
            format!("Route:          {}", self.route()),
        ];

        if let Some(status) = self.status() {
            lines.push(format!("Status:         {}", status.as_u16()));
        }

        if let Some(location) = self.response().and_then(|r| r.redirect_url.as_deref()) {
            lines.push(format!("Redirect:       {location}"));
        }

        if let Some(attachment) = self.attachment() {
            lines.push(format!("Attachment:     {}", attachment.path().display()));
        }

        if let Some(fixture) = self.fixture() {
            lines.push(format!("Fixture:        {fixture}"));
        }

        if let Some(data) = self.response().and_then(|r| r.data.as_ref()) {
            lines.push(format!("Data:           {data}"));
        }

        lines.join("\n")
    }
}

impl PrettyPrint for ResolvedResponse {
    fn pretty_print(&self) -> String {
        let mut lines = vec![format!("Status:         {}", self.status)];

        for (name, value) in &self.headers {
            lines.push(format!(
                "{:<16}{}",
                format!("{name}:"),
                value.to_str().unwrap_or("<binary>")
            ));
        }

        match &self.body {
            ResponseBody::Empty => {}
            ResponseBody::Text(text) => {
                lines.push(String::new());
                lines.push(text.clone());
            }
            ResponseBody::Json(value) => {
                lines.push(String::new());
                let pretty =
                    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
                lines.push(pretty);
            }
            ResponseBody::Stream(_) => {
                lines.push(String::new());
                lines.push("<attachment stream>".to_string());
            }
        }

        lines.join("\n")
    }
}

/// One line of a double listing.
#[derive(Debug, Clone, PartialEq, Eq, Tabled)]
pub struct DoubleRow {
    pub method: String,
    pub url: String,
    pub status: String,
    /// What the double answers with, in resolution order.
    pub response: String,
}

impl From<&Double> for DoubleRow {
    fn from(d: &Double) -> Self {
        let response = d.response();
        let kind = if let Some(location) = response.and_then(|r| r.redirect_url.as_deref()) {
            format!("redirect to {location}")
        } else if let Some(attachment) = d.attachment() {
            format!("attachment {}", attachment.path().display())
        } else if let Some(fixture) = d.fixture() {
            format!("fixture {fixture}")
        } else {
            match response.and_then(|r| r.data.as_ref()) {
                None => "empty".to_string(),
                Some(Value::String(_)) => "text".to_string(),
                Some(_) => "json".to_string(),
            }
        };

        Self {
            method: d.method().to_string(),
            url: d.url().to_string(),
            status: d
                .status()
                .map(|s| s.as_u16().to_string())
                .unwrap_or_else(|| "200".to_string()),
            response: kind,
        }
    }
}
