//! The editable resume document, its presentation settings, and `EditorState`,
//! the unit that round-trips to local storage.
//!
//! Deserialization is lenient on purpose: stored documents from older editor
//! versions (missing sections, `null` lists, a flat `skills` list) are folded
//! into the current canonical shape on read.

use std::collections::HashSet;

use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

// ────────────────────────────────────────────────────────────────────────────
// Settings
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontFamily {
    #[default]
    Times,
    Garamond,
    Calibri,
    Arial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontSize {
    Small,
    #[default]
    Medium,
    Large,
}

/// Presentation-only settings. Never counted as content.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResumeSettings {
    pub show_photo: bool,
    pub font_size: FontSize,
    pub font_family: FontFamily,
}

// ────────────────────────────────────────────────────────────────────────────
// Document
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonalLink {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub label: String,
    #[serde(deserialize_with = "lenient_string")]
    pub url: String,
}

impl PersonalLink {
    pub fn blank() -> Self {
        Self {
            id: new_entry_id(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PersonalInfo {
    #[serde(deserialize_with = "lenient_string")]
    pub first_name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub last_name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub location: String,
    #[serde(deserialize_with = "lenient_string")]
    pub phone: String,
    #[serde(deserialize_with = "lenient_string")]
    pub email: String,
    #[serde(deserialize_with = "lenient_string")]
    pub linkedin: String,
    #[serde(deserialize_with = "lenient_string")]
    pub github: String,
    #[serde(deserialize_with = "lenient_string")]
    pub website: String,
    #[serde(deserialize_with = "lenient_list")]
    pub other_links: Vec<PersonalLink>,
}

impl PersonalInfo {
    fn scalar_fields(&self) -> [&str; 8] {
        [
            self.first_name.as_str(),
            self.last_name.as_str(),
            self.location.as_str(),
            self.phone.as_str(),
            self.email.as_str(),
            self.linkedin.as_str(),
            self.github.as_str(),
            self.website.as_str(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EducationEntry {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub institution: String,
    #[serde(deserialize_with = "lenient_string")]
    pub location: String,
    #[serde(deserialize_with = "lenient_string")]
    pub degree: String,
    #[serde(deserialize_with = "lenient_string")]
    pub start_date: String,
    #[serde(deserialize_with = "lenient_string")]
    pub end_date: String,
    #[serde(deserialize_with = "lenient_strings")]
    pub bullets: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExperienceEntry {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub company: String,
    #[serde(deserialize_with = "lenient_string")]
    pub location: String,
    #[serde(deserialize_with = "lenient_string")]
    pub role: String,
    #[serde(deserialize_with = "lenient_string")]
    pub start_date: String,
    #[serde(deserialize_with = "lenient_string")]
    pub end_date: String,
    #[serde(deserialize_with = "lenient_strings")]
    pub bullets: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectEntry {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub tech_stack: String,
    #[serde(deserialize_with = "lenient_string")]
    pub start_date: String,
    #[serde(deserialize_with = "lenient_string")]
    pub end_date: String,
    #[serde(deserialize_with = "lenient_strings")]
    pub bullets: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TechnicalSkills {
    #[serde(deserialize_with = "lenient_string")]
    pub languages: String,
    #[serde(deserialize_with = "lenient_string")]
    pub frameworks: String,
    #[serde(deserialize_with = "lenient_string")]
    pub developer_tools: String,
    #[serde(deserialize_with = "lenient_string")]
    pub libraries: String,
}

impl TechnicalSkills {
    fn categories(&self) -> [&str; 4] {
        [
            self.languages.as_str(),
            self.frameworks.as_str(),
            self.developer_tools.as_str(),
            self.libraries.as_str(),
        ]
    }
}

/// The user-entered resume content.
///
/// Serializes in the camelCase wire shape shared with the record store and the
/// rendering service. Deserializes through a lenient raw form, so every decoded
/// document has the full shape and every list item carries a unique id.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawDocument")]
pub struct ResumeDocument {
    pub personal_info: PersonalInfo,
    pub experience: Vec<ExperienceEntry>,
    pub education: Vec<EducationEntry>,
    pub projects: Vec<ProjectEntry>,
    pub technical_skills: TechnicalSkills,
}

impl ResumeDocument {
    /// True when any field holds non-blank user text. Entry and link ids are
    /// not content.
    pub fn has_content(&self) -> bool {
        let info = &self.personal_info;
        info.scalar_fields().into_iter().any(has_text)
            || info
                .other_links
                .iter()
                .any(|link| has_text(&link.label) || has_text(&link.url))
            || self.experience.iter().any(SectionEntry::has_content)
            || self.education.iter().any(SectionEntry::has_content)
            || self.projects.iter().any(SectionEntry::has_content)
            || self.technical_skills.categories().into_iter().any(has_text)
    }

    /// Serialized form used to compare against the last persisted baseline.
    pub fn to_canonical_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Section entries
// ────────────────────────────────────────────────────────────────────────────

/// Shared behavior of the three repeated resume sections.
pub trait SectionEntry: Clone {
    /// A fresh entry with a newly assigned id and every field blank.
    fn blank() -> Self;
    fn id(&self) -> &str;
    fn id_mut(&mut self) -> &mut String;
    fn scalar_fields(&self) -> Vec<&str>;
    fn bullets(&self) -> &[String];
    fn bullets_mut(&mut self) -> &mut Vec<String>;

    fn has_content(&self) -> bool {
        self.scalar_fields().into_iter().any(has_text) || self.bullets().iter().any(|b| has_text(b))
    }
}

impl SectionEntry for EducationEntry {
    fn blank() -> Self {
        Self {
            id: new_entry_id(),
            ..Self::default()
        }
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn id_mut(&mut self) -> &mut String {
        &mut self.id
    }

    fn scalar_fields(&self) -> Vec<&str> {
        vec![
            self.institution.as_str(),
            self.location.as_str(),
            self.degree.as_str(),
            self.start_date.as_str(),
            self.end_date.as_str(),
        ]
    }

    fn bullets(&self) -> &[String] {
        &self.bullets
    }

    fn bullets_mut(&mut self) -> &mut Vec<String> {
        &mut self.bullets
    }
}

impl SectionEntry for ExperienceEntry {
    fn blank() -> Self {
        Self {
            id: new_entry_id(),
            ..Self::default()
        }
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn id_mut(&mut self) -> &mut String {
        &mut self.id
    }

    fn scalar_fields(&self) -> Vec<&str> {
        vec![
            self.company.as_str(),
            self.location.as_str(),
            self.role.as_str(),
            self.start_date.as_str(),
            self.end_date.as_str(),
        ]
    }

    fn bullets(&self) -> &[String] {
        &self.bullets
    }

    fn bullets_mut(&mut self) -> &mut Vec<String> {
        &mut self.bullets
    }
}

impl SectionEntry for ProjectEntry {
    fn blank() -> Self {
        Self {
            id: new_entry_id(),
            ..Self::default()
        }
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn id_mut(&mut self) -> &mut String {
        &mut self.id
    }

    fn scalar_fields(&self) -> Vec<&str> {
        vec![
            self.name.as_str(),
            self.tech_stack.as_str(),
            self.start_date.as_str(),
            self.end_date.as_str(),
        ]
    }

    fn bullets(&self) -> &[String] {
        &self.bullets
    }

    fn bullets_mut(&mut self) -> &mut Vec<String> {
        &mut self.bullets
    }
}

pub fn new_entry_id() -> String {
    Uuid::new_v4().to_string()
}

pub fn has_text(value: &str) -> bool {
    !value.trim().is_empty()
}

// ────────────────────────────────────────────────────────────────────────────
// Legacy normalization
// ────────────────────────────────────────────────────────────────────────────

/// Any document shape the editor has ever written.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawDocument {
    #[serde(deserialize_with = "lenient")]
    personal_info: PersonalInfo,
    #[serde(deserialize_with = "lenient_list")]
    experience: Vec<ExperienceEntry>,
    #[serde(deserialize_with = "lenient_list")]
    education: Vec<EducationEntry>,
    #[serde(deserialize_with = "lenient_list")]
    projects: Vec<ProjectEntry>,
    #[serde(deserialize_with = "lenient")]
    technical_skills: Option<TechnicalSkills>,
    /// Pre-category skill list, folded into `technicalSkills.languages`.
    #[serde(deserialize_with = "lenient_strings")]
    skills: Vec<String>,
}

impl From<RawDocument> for ResumeDocument {
    fn from(raw: RawDocument) -> Self {
        let RawDocument {
            mut personal_info,
            mut experience,
            mut education,
            mut projects,
            technical_skills,
            skills,
        } = raw;

        assign_unique_ids(personal_info.other_links.iter_mut().map(|l| &mut l.id));
        assign_unique_ids(experience.iter_mut().map(SectionEntry::id_mut));
        assign_unique_ids(education.iter_mut().map(SectionEntry::id_mut));
        assign_unique_ids(projects.iter_mut().map(SectionEntry::id_mut));

        let technical_skills = technical_skills.unwrap_or_else(|| TechnicalSkills {
            languages: skills.join(", "),
            ..TechnicalSkills::default()
        });

        Self {
            personal_info,
            experience,
            education,
            projects,
            technical_skills,
        }
    }
}

/// Gives every blank or repeated id in one list a fresh id. Ids already unique
/// are left untouched.
fn assign_unique_ids<'a>(ids: impl Iterator<Item = &'a mut String>) {
    let mut seen = HashSet::new();
    for id in ids {
        if !has_text(id) || !seen.insert(id.clone()) {
            *id = new_entry_id();
            seen.insert(id.clone());
        }
    }
}

// Field-level decoders: a value of the wrong type degrades to the field's
// default instead of failing the enclosing document.

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(value) => value,
        _ => String::new(),
    })
}

/// Keeps only the string items of an array.
fn lenient_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(value) => Some(value),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

/// Keeps the array items that decode as `T`.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + DeserializeOwned,
{
    Ok(serde_json::from_value(Value::deserialize(deserializer)?).unwrap_or_default())
}

// ────────────────────────────────────────────────────────────────────────────
// EditorState
// ────────────────────────────────────────────────────────────────────────────

/// Document + settings + photo: the exact unit persisted per user.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct EditorState {
    #[serde(rename = "data")]
    pub document: ResumeDocument,
    pub settings: ResumeSettings,
    /// Photo as a data URI; empty when no photo is set.
    pub photo: String,
}

impl EditorState {
    /// An empty scaffold has the canonical shape but nothing the user typed.
    pub fn is_empty_scaffold(&self) -> bool {
        !self.document.has_content() && !has_text(&self.photo)
    }

    /// Decodes a stored state. Fails only when `raw` is not a JSON object;
    /// sections that do not decode fall back to their defaults.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(raw)?;
        let Value::Object(mut fields) = value else {
            return Err(serde::de::Error::custom("editor state must be a JSON object"));
        };

        let document = match fields.remove("data") {
            Some(data) => serde_json::from_value(data).unwrap_or_else(|e| {
                warn!("Discarding undecodable stored document: {e}");
                ResumeDocument::default()
            }),
            None => ResumeDocument::default(),
        };
        let settings = match fields.remove("settings") {
            Some(settings) => serde_json::from_value(settings).unwrap_or_else(|e| {
                warn!("Discarding undecodable stored settings: {e}");
                ResumeSettings::default()
            }),
            None => ResumeSettings::default(),
        };
        let photo = match fields.remove("photo") {
            Some(Value::String(photo)) => photo,
            _ => String::new(),
        };

        Ok(Self {
            document,
            settings,
            photo,
        })
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
