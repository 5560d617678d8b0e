//! The only place the document shape changes.
//!
//! `reduce` is a pure `(state, action) -> state` transition. Every action other
//! than `LoadState` and `Reset` touches exactly one field or list item, and an
//! index that does not exist turns the action into a no-op.

use crate::models::document::{
    EditorState, EducationEntry, ExperienceEntry, FontFamily, FontSize, PersonalInfo,
    PersonalLink, ProjectEntry, ResumeDocument, SectionEntry, TechnicalSkills,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Education,
    Experience,
    Project,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonalInfoField {
    FirstName,
    LastName,
    Location,
    Phone,
    Email,
    Linkedin,
    Github,
    Website,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkField {
    Label,
    Url,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EducationField {
    Institution,
    Location,
    Degree,
    StartDate,
    EndDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExperienceField {
    Company,
    Location,
    Role,
    StartDate,
    EndDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectField {
    Name,
    TechStack,
    StartDate,
    EndDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkillCategory {
    Languages,
    Frameworks,
    DeveloperTools,
    Libraries,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorAction {
    UpdatePersonalInfo {
        field: PersonalInfoField,
        value: String,
    },
    AddLink,
    UpdateLink {
        index: usize,
        field: LinkField,
        value: String,
    },
    RemoveLink {
        index: usize,
    },
    AddEntry {
        section: Section,
    },
    RemoveEntry {
        section: Section,
        index: usize,
    },
    UpdateEducation {
        index: usize,
        field: EducationField,
        value: String,
    },
    UpdateExperience {
        index: usize,
        field: ExperienceField,
        value: String,
    },
    UpdateProject {
        index: usize,
        field: ProjectField,
        value: String,
    },
    /// Appends an empty bullet line to one entry.
    AddBullet {
        section: Section,
        index: usize,
    },
    UpdateBullet {
        section: Section,
        index: usize,
        bullet: usize,
        value: String,
    },
    RemoveBullet {
        section: Section,
        index: usize,
        bullet: usize,
    },
    UpdateTechnicalSkill {
        category: SkillCategory,
        value: String,
    },
    SetFontFamily(FontFamily),
    SetFontSize(FontSize),
    SetShowPhoto(bool),
    SetPhoto(String),
    ClearPhoto,
    /// Replaces the whole state. Used by hydration.
    LoadState(Box<EditorState>),
    Reset,
}

pub fn reduce(mut state: EditorState, action: EditorAction) -> EditorState {
    let doc = &mut state.document;
    match action {
        EditorAction::UpdatePersonalInfo { field, value } => {
            *personal_info_slot(&mut doc.personal_info, field) = value;
        }
        EditorAction::AddLink => doc.personal_info.other_links.push(PersonalLink::blank()),
        EditorAction::UpdateLink {
            index,
            field,
            value,
        } => {
            if let Some(link) = doc.personal_info.other_links.get_mut(index) {
                match field {
                    LinkField::Label => link.label = value,
                    LinkField::Url => link.url = value,
                }
            }
        }
        EditorAction::RemoveLink { index } => remove_at(&mut doc.personal_info.other_links, index),
        EditorAction::AddEntry { section } => match section {
            Section::Education => doc.education.push(EducationEntry::blank()),
            Section::Experience => doc.experience.push(ExperienceEntry::blank()),
            Section::Project => doc.projects.push(ProjectEntry::blank()),
        },
        EditorAction::RemoveEntry { section, index } => match section {
            Section::Education => remove_at(&mut doc.education, index),
            Section::Experience => remove_at(&mut doc.experience, index),
            Section::Project => remove_at(&mut doc.projects, index),
        },
        EditorAction::UpdateEducation {
            index,
            field,
            value,
        } => {
            if let Some(entry) = doc.education.get_mut(index) {
                *education_slot(entry, field) = value;
            }
        }
        EditorAction::UpdateExperience {
            index,
            field,
            value,
        } => {
            if let Some(entry) = doc.experience.get_mut(index) {
                *experience_slot(entry, field) = value;
            }
        }
        EditorAction::UpdateProject {
            index,
            field,
            value,
        } => {
            if let Some(entry) = doc.projects.get_mut(index) {
                *project_slot(entry, field) = value;
            }
        }
        EditorAction::AddBullet { section, index } => {
            with_bullets(doc, section, index, |bullets| bullets.push(String::new()));
        }
        EditorAction::UpdateBullet {
            section,
            index,
            bullet,
            value,
        } => with_bullets(doc, section, index, |bullets| {
            if let Some(line) = bullets.get_mut(bullet) {
                *line = value;
            }
        }),
        EditorAction::RemoveBullet {
            section,
            index,
            bullet,
        } => with_bullets(doc, section, index, |bullets| remove_at(bullets, bullet)),
        EditorAction::UpdateTechnicalSkill { category, value } => {
            *skill_slot(&mut doc.technical_skills, category) = value;
        }
        EditorAction::SetFontFamily(family) => state.settings.font_family = family,
        EditorAction::SetFontSize(size) => state.settings.font_size = size,
        EditorAction::SetShowPhoto(show) => state.settings.show_photo = show,
        EditorAction::SetPhoto(photo) => state.photo = photo,
        EditorAction::ClearPhoto => state.photo.clear(),
        EditorAction::LoadState(next) => return *next,
        EditorAction::Reset => return EditorState::default(),
    }
    state
}

fn remove_at<T>(items: &mut Vec<T>, index: usize) {
    if index < items.len() {
        items.remove(index);
    }
}

fn with_bullets(
    doc: &mut ResumeDocument,
    section: Section,
    index: usize,
    edit: impl FnOnce(&mut Vec<String>),
) {
    let bullets = match section {
        Section::Education => doc.education.get_mut(index).map(SectionEntry::bullets_mut),
        Section::Experience => doc.experience.get_mut(index).map(SectionEntry::bullets_mut),
        Section::Project => doc.projects.get_mut(index).map(SectionEntry::bullets_mut),
    };
    if let Some(bullets) = bullets {
        edit(bullets);
    }
}

fn personal_info_slot(info: &mut PersonalInfo, field: PersonalInfoField) -> &mut String {
    match field {
        PersonalInfoField::FirstName => &mut info.first_name,
        PersonalInfoField::LastName => &mut info.last_name,
        PersonalInfoField::Location => &mut info.location,
        PersonalInfoField::Phone => &mut info.phone,
        PersonalInfoField::Email => &mut info.email,
        PersonalInfoField::Linkedin => &mut info.linkedin,
        PersonalInfoField::Github => &mut info.github,
        PersonalInfoField::Website => &mut info.website,
    }
}

fn education_slot(entry: &mut EducationEntry, field: EducationField) -> &mut String {
    match field {
        EducationField::Institution => &mut entry.institution,
        EducationField::Location => &mut entry.location,
        EducationField::Degree => &mut entry.degree,
        EducationField::StartDate => &mut entry.start_date,
        EducationField::EndDate => &mut entry.end_date,
    }
}

fn experience_slot(entry: &mut ExperienceEntry, field: ExperienceField) -> &mut String {
    match field {
        ExperienceField::Company => &mut entry.company,
        ExperienceField::Location => &mut entry.location,
        ExperienceField::Role => &mut entry.role,
        ExperienceField::StartDate => &mut entry.start_date,
        ExperienceField::EndDate => &mut entry.end_date,
    }
}

fn project_slot(entry: &mut ProjectEntry, field: ProjectField) -> &mut String {
    match field {
        ProjectField::Name => &mut entry.name,
        ProjectField::TechStack => &mut entry.tech_stack,
        ProjectField::StartDate => &mut entry.start_date,
        ProjectField::EndDate => &mut entry.end_date,
    }
}

fn skill_slot(skills: &mut TechnicalSkills, category: SkillCategory) -> &mut String {
    match category {
        SkillCategory::Languages => &mut skills.languages,
        SkillCategory::Frameworks => &mut skills.frameworks,
        SkillCategory::DeveloperTools => &mut skills.developer_tools,
        SkillCategory::Libraries => &mut skills.libraries,
    }
}
