//! Status card construction and wire serialization.

use serde::{Deserialize, Serialize};

use crate::data::AlertState;

/// Theme color for an all-healthy card.
pub const THEME_HEALTHY: &str = "1b9e77";
/// Theme color when any check alerts, and for shutdown cards.
pub const THEME_ALERT: &str = "d95f02";

/// One name/value line in the card's fact list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fact {
    pub name: String,
    pub value: String,
}

impl Fact {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A notification payload, independent of transport.
#[derive(Debug, Clone)]
pub struct StatusCard {
    pub title: String,
    pub theme_color: &'static str,
    pub body_title: String,
    pub body_subtitle: String,
    pub text: String,
    pub facts: Vec<Fact>,
}

impl StatusCard {
    /// The periodic status card: subtitle counts healthy checks, the text
    /// names the alerting ones, and the theme reflects overall health.
    pub fn status(hostname: &str, location: &str, alerts: &AlertState, facts: Vec<Fact>) -> Self {
        let failing = alerts.failing();
        let theme_color = if failing.is_empty() {
            THEME_HEALTHY
        } else {
            THEME_ALERT
        };
        Self {
            title: format!("{}/{}", hostname, location),
            theme_color,
            body_title: "Status Update".to_string(),
            body_subtitle: format!(
                "{} / {} checks healthy",
                alerts.healthy(),
                alerts.evaluated()
            ),
            text: format!("Checks that alerted: {}", failing.join(" ")),
            facts,
        }
    }

    /// The immediate shutdown card: fixed body title and caller-supplied
    /// subtitle, always alert-themed, no health gating.
    pub fn shutdown(hostname: &str, location: &str, subtitle: &str, facts: Vec<Fact>) -> Self {
        Self {
            title: format!("{}/{}", hostname, location),
            theme_color: THEME_ALERT,
            body_title: "Shutting system down".to_string(),
            body_subtitle: subtitle.to_string(),
            text: String::new(),
            facts,
        }
    }

    /// The message-card wire shape the webhook endpoint expects.
    pub fn to_payload(&self, timestamp_secs: u64) -> MessageCard<'_> {
        MessageCard {
            card_type: "MessageCard",
            context: "https://schema.org/extensions",
            summary: format!("Status Update - {}", timestamp_secs),
            theme_color: self.theme_color,
            title: &self.title,
            sections: vec![Section {
                activity_title: &self.body_title,
                activity_subtitle: &self.body_subtitle,
                facts: &self.facts,
                text: &self.text,
            }],
        }
    }
}

/// Serialized card envelope.
#[derive(Debug, Serialize)]
pub struct MessageCard<'a> {
    #[serde(rename = "@type")]
    card_type: &'static str,
    #[serde(rename = "@context")]
    context: &'static str,
    summary: String,
    #[serde(rename = "themeColor")]
    theme_color: &'a str,
    title: &'a str,
    sections: Vec<Section<'a>>,
}

#[derive(Debug, Serialize)]
struct Section<'a> {
    #[serde(rename = "activityTitle")]
    activity_title: &'a str,
    #[serde(rename = "activitySubtitle")]
    activity_subtitle: &'a str,
    facts: &'a [Fact],
    text: &'a str,
}
