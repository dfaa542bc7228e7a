//! Embed records
//!
//! The unit of data a block saves and restores. The same shape doubles as a
//! partial update: unset and empty fields leave the current value alone.

use crate::dimension::Dimension;
use crate::matcher::MatchResult;
use serde::{Deserialize, Serialize};

/// Saved data of one embed block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedRecord {
    /// Registry key; unset means the block still shows its input form
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    /// URL the user supplied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Embeddable URL derived from `source`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embed: Option<String>,
    /// Display width hint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<Dimension>,
    /// Display height hint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<Dimension>,
    /// Reserved; not populated by the block itself
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

impl EmbedRecord {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a service has been chosen
    pub fn has_service(&self) -> bool {
        self.service.as_deref().is_some_and(|s| !s.is_empty())
    }

    /// Merge a partial update, field by field
    ///
    /// A field in `update` replaces the current value only when it is set and
    /// not an empty string.
    pub fn merge(&mut self, update: EmbedRecord) {
        merge_text(&mut self.service, update.service);
        merge_text(&mut self.source, update.source);
        merge_text(&mut self.embed, update.embed);
        merge_dimension(&mut self.width, update.width);
        merge_dimension(&mut self.height, update.height);
        merge_text(&mut self.caption, update.caption);
    }
}

fn merge_text(current: &mut Option<String>, update: Option<String>) {
    if let Some(value) = update.filter(|v| !v.is_empty()) {
        *current = Some(value);
    }
}

fn merge_dimension(current: &mut Option<Dimension>, update: Option<Dimension>) {
    match update {
        Some(Dimension::Length(s)) if s.is_empty() => {}
        Some(value) => *current = Some(value),
        None => {}
    }
}

impl From<MatchResult> for EmbedRecord {
    fn from(result: MatchResult) -> Self {
        Self {
            service: Some(result.service),
            source: Some(result.source),
            embed: Some(result.embed),
            width: result.width,
            height: result.height,
            caption: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> EmbedRecord {
        EmbedRecord {
            service: Some("a".into()),
            source: Some("u1".into()),
            embed: Some("e1".into()),
            width: Some(Dimension::px(10.0)),
            height: Some(Dimension::px(20.0)),
            caption: None,
        }
    }

    #[test]
    fn test_partial_update_changes_only_given_field() {
        let mut record = sample();
        record.merge(EmbedRecord {
            source: Some("u2".into()),
            ..EmbedRecord::default()
        });

        let mut expected = sample();
        expected.source = Some("u2".into());
        assert_eq!(record, expected);
    }

    #[test]
    fn test_empty_values_do_not_overwrite() {
        let mut record = sample();
        record.merge(EmbedRecord {
            service: Some(String::new()),
            embed: Some(String::new()),
            width: Some(Dimension::Length(String::new())),
            ..EmbedRecord::default()
        });
        assert_eq!(record, sample());
    }

    #[test]
    fn test_last_write_wins() {
        let mut record = sample();
        record.merge(EmbedRecord {
            service: Some("b".into()),
            height: Some(Dimension::Length("100%".into())),
            ..EmbedRecord::default()
        });
        assert_eq!(record.service.as_deref(), Some("b"));
        assert_eq!(record.height, Some(Dimension::Length("100%".into())));
        assert_eq!(record.width, Some(Dimension::px(10.0)));
    }

    #[test]
    fn test_has_service() {
        assert!(!EmbedRecord::new().has_service());
        assert!(!EmbedRecord { service: Some(String::new()), ..EmbedRecord::default() }.has_service());
        assert!(sample().has_service());
    }

    #[test]
    fn test_saved_shape() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(
            json,
            json!({"service": "a", "source": "u1", "embed": "e1", "width": 10, "height": 20})
        );

        let restored: EmbedRecord = serde_json::from_value(json!({
            "service": "youtube",
            "source": "https://youtu.be/x",
            "embed": "https://www.youtube.com/embed/x",
            "width": 580,
            "height": "320px",
            "caption": ""
        }))
        .unwrap();
        assert_eq!(restored.width, Some(Dimension::px(580.0)));
        assert_eq!(restored.height, Some(Dimension::Length("320px".into())));
    }
}
