use crate::models::document::{has_text, ResumeDocument};

/// Checks run before a document is sent for rendering. Returns user-facing
/// messages in display order; an empty list means the document can render.
pub fn validate_for_download(doc: &ResumeDocument) -> Vec<String> {
    let mut errors = Vec::new();

    if !has_text(&doc.personal_info.first_name) {
        errors.push("First name is required.".to_string());
    }
    if !has_text(&doc.personal_info.last_name) {
        errors.push("Last name is required.".to_string());
    }

    let skills = &doc.technical_skills;
    let has_skills = [
        &skills.languages,
        &skills.frameworks,
        &skills.developer_tools,
        &skills.libraries,
    ]
    .into_iter()
    .any(|s| has_text(s));

    if doc.experience.is_empty() && doc.education.is_empty() && doc.projects.is_empty() && !has_skills
    {
        errors.push(
            "Add at least one education, experience, project, or technical skill entry."
                .to_string(),
        );
    }

    if doc
        .experience
        .iter()
        .any(|e| !has_text(&e.role) && !has_text(&e.company))
    {
        errors.push("Each experience entry must include at least role or company.".to_string());
    }

    if doc.projects.iter().any(|p| !has_text(&p.name)) {
        errors.push("Each project entry must include a project name.".to_string());
    }

    errors
}

/// `First_Last_Resume.pdf`, or `Resume.pdf` when either name is blank.
pub fn download_filename(doc: &ResumeDocument) -> String {
    let first = doc.personal_info.first_name.trim();
    let last = doc.personal_info.last_name.trim();
    if first.is_empty() || last.is_empty() {
        "Resume.pdf".to_string()
    } else {
        format!("{first}_{last}_Resume.pdf")
    }
}
