//! Status notification cards and their delivery.
//!
//! Notifications are message cards: a title identifying the station, a
//! theme color, a body title/subtitle, free text, and a list of name/value
//! facts - one fact per metric with at least one reading this window.
//! Delivery ([`WebhookNotifier`]) is strictly best-effort: one POST with a
//! short timeout, failures logged and forgotten.

mod card;
mod webhook;

pub use card::{Fact, StatusCard, THEME_ALERT, THEME_HEALTHY};
pub use webhook::{NotifyError, WebhookNotifier};
