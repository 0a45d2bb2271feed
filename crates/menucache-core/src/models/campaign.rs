use serde::{Deserialize, Serialize};

use super::payload::string_or_number;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Campaign {
    #[serde(alias = "_id", deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(alias = "title")]
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(rename = "startDate", default)]
    pub start_date: Option<String>,
    #[serde(rename = "endDate", default)]
    pub end_date: Option<String>,
}

impl Campaign {
    pub fn is_active(&self) -> bool {
        self.status
            .as_deref()
            .map(|s| s.eq_ignore_ascii_case("active"))
            .unwrap_or(false)
    }

    /// Date range for display, e.g. "2026-05-01 → 2026-05-31"
    pub fn date_range(&self) -> String {
        match (&self.start_date, &self.end_date) {
            (Some(start), Some(end)) => format!("{} → {}", short_date(start), short_date(end)),
            (Some(start), None) => format!("from {}", short_date(start)),
            (None, Some(end)) => format!("until {}", short_date(end)),
            (None, None) => String::new(),
        }
    }
}

/// Dates arrive as ISO timestamps; only the day is shown.
fn short_date(s: &str) -> &str {
    s.split('T').next().unwrap_or(s)
}
