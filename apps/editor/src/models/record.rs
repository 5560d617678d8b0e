use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::models::document::{EditorState, ResumeDocument, ResumeSettings};

pub const DEFAULT_TITLE: &str = "My Resume";
pub const DEFAULT_TEMPLATE_ID: &str = "classic";

/// Listing row returned by the record store. Timestamps are kept as the raw
/// strings the store sent; see [`pick_most_recent`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeMetadata {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub template_id: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeRecord {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub template_id: String,
    #[serde(rename = "data", default)]
    pub document: ResumeDocument,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

impl ResumeRecord {
    pub fn metadata(&self) -> ResumeMetadata {
        ResumeMetadata {
            id: self.id.clone(),
            title: self.title.clone(),
            template_id: self.template_id.clone(),
            created_at: self.created_at.clone(),
            updated_at: self.updated_at.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateResume {
    pub title: String,
    pub template_id: String,
    #[serde(rename = "data")]
    pub document: ResumeDocument,
}

impl CreateResume {
    pub fn with_defaults(document: ResumeDocument) -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            template_id: DEFAULT_TEMPLATE_ID.to_string(),
            document,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResume {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    #[serde(rename = "data", skip_serializing_if = "Option::is_none")]
    pub document: Option<ResumeDocument>,
}

impl UpdateResume {
    pub fn document(document: ResumeDocument) -> Self {
        Self {
            document: Some(document),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub id: String,
    #[serde(default)]
    pub email: String,
}

/// Body sent to the rendering service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratePdfRequest {
    pub data: ResumeDocument,
    pub settings: ResumeSettings,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
}

impl GeneratePdfRequest {
    /// The photo rides along only when the settings ask for it and one is set.
    pub fn from_state(state: &EditorState) -> Self {
        let photo = (state.settings.show_photo && !state.photo.trim().is_empty())
            .then(|| state.photo.clone());
        Self {
            data: state.document.clone(),
            settings: state.settings.clone(),
            photo,
        }
    }
}

/// Selects the most recently updated record.
///
/// A candidate only displaces the current pick when both timestamps parse as
/// RFC 3339 and the candidate is strictly newer, so unparsable or tied
/// timestamps keep the store's ordering.
pub fn pick_most_recent(records: &[ResumeMetadata]) -> Option<&ResumeMetadata> {
    let mut iter = records.iter();
    let mut best = iter.next()?;
    for candidate in iter {
        if let (Some(best_at), Some(candidate_at)) =
            (parse_timestamp(&best.updated_at), parse_timestamp(&candidate.updated_at))
        {
            if candidate_at > best_at {
                best = candidate;
            }
        }
    }
    Some(best)
}

fn parse_timestamp(value: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(id: &str, updated_at: &str) -> ResumeMetadata {
        ResumeMetadata {
            id: id.to_string(),
            title: "Resume".to_string(),
            template_id: DEFAULT_TEMPLATE_ID.to_string(),
            created_at: "2026-02-20T10:00:00Z".to_string(),
            updated_at: updated_at.to_string(),
        }
    }

    #[test]
    fn test_pick_most_recent_empty() {
        assert!(pick_most_recent(&[]).is_none());
    }

    #[test]
    fn test_pick_most_recent_by_updated_at() {
        let records = vec![
            meta("resume-1", "2026-02-20T10:00:00Z"),
            meta("resume-3", "2026-02-22T09:00:00+02:00"),
            meta("resume-2", "2026-02-21T10:00:00Z"),
        ];
        assert_eq!(pick_most_recent(&records).unwrap().id, "resume-3");
    }

    #[test]
    fn test_pick_most_recent_keeps_order_on_ties_and_garbage() {
        let records = vec![
            meta("first", "2026-02-21T10:00:00Z"),
            meta("tie", "2026-02-21T10:00:00Z"),
            meta("garbage", "yesterday"),
        ];
        assert_eq!(pick_most_recent(&records).unwrap().id, "first");
    }

    #[test]
    fn test_pdf_request_omits_photo_unless_shown() {
        let mut state = EditorState::default();
        state.photo = "data:image/png;base64,abc".to_string();
        assert_eq!(GeneratePdfRequest::from_state(&state).photo, None);

        state.settings.show_photo = true;
        assert_eq!(
            GeneratePdfRequest::from_state(&state).photo.as_deref(),
            Some("data:image/png;base64,abc")
        );

        state.photo = "  ".to_string();
        assert_eq!(GeneratePdfRequest::from_state(&state).photo, None);
    }

    #[test]
    fn test_update_payload_only_carries_set_fields() {
        let value = serde_json::to_value(UpdateResume::document(ResumeDocument::default())).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 1);
        assert!(object.contains_key("data"));
    }
}
