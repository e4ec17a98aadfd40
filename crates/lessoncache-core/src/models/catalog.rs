use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    Video,
    Audio,
}

/// A purchasable lesson in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "mediaType", default)]
    pub media_type: MediaType,
    /// Price in cents
    #[serde(default)]
    pub price: i64,
    #[serde(rename = "durationSeconds", default)]
    pub duration_seconds: Option<u32>,
    #[serde(rename = "thumbnailUrl", default)]
    pub thumbnail_url: Option<String>,
    #[serde(rename = "mediaUrl", default)]
    pub media_url: Option<String>,
    #[serde(default)]
    pub published: bool,
    #[serde(rename = "ageRestricted", default)]
    pub age_restricted: bool,
}

impl Module {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            media_type: MediaType::Video,
            price: 0,
            duration_seconds: None,
            thumbnail_url: None,
            media_url: None,
            published: true,
            age_restricted: false,
        }
    }

    pub fn is_free(&self) -> bool {
        self.price == 0
    }

    /// Price formatted as dollars, e.g. "$4.99" or "-$0.50" for refunds
    pub fn price_display(&self) -> String {
        if self.is_free() {
            return "Free".to_string();
        }
        let sign = if self.price < 0 { "-" } else { "" };
        let cents = self.price.unsigned_abs();
        format!("{}${}.{:02}", sign, cents / 100, cents % 100)
    }
}
