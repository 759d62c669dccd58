use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Writing style derived from existing posts; conditions every generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleGuide {
    #[serde(default)]
    pub tone: String,
    #[serde(default)]
    pub sentence_structure: String,
    #[serde(default)]
    pub paragraph_length: String,
    #[serde(default, alias = "formattingStyle")]
    pub formatting: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default = "Utc::now")]
    pub analyzed_at: DateTime<Utc>,
}

impl StyleGuide {
    pub fn as_prompt(&self) -> String {
        format!(
            "Tone: {}\nSentence structure: {}\nParagraph length: {}\nFormatting: {}\nSummary: {}",
            self.tone, self.sentence_structure, self.paragraph_length, self.formatting, self.summary
        )
    }
}

/// An existing post on the host site, used as style-analysis input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSample {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreshnessReport {
    /// 0 to 100. Fractional or out-of-range model answers are rounded and clamped.
    #[serde(default, deserialize_with = "clamped_score")]
    pub score: u8,
    #[serde(default)]
    pub needs_update: bool,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

fn clamped_score<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer)?;
    if raw.is_nan() {
        return Ok(0);
    }
    Ok(raw.round().clamp(0.0, 100.0) as u8)
}
