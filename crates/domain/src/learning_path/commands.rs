//! Learning path requests.

use common::LearningPathId;

use crate::error::DomainError;

use super::LearningPath;

/// Maximum title length, matching the `learning_paths.title` column.
pub const MAX_TITLE_LEN: usize = 200;

/// Maximum community length, matching the `learning_paths.community` column.
pub const MAX_COMMUNITY_LEN: usize = 200;

/// Maximum skill name length, matching the `skills.name` column.
pub const MAX_SKILL_NAME_LEN: usize = 100;

/// Request to create a learning path together with its diagram.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateLearningPath {
    pub title: String,
    pub description: String,
    pub is_public: bool,
    pub thumbnail: String,
    pub skills: Vec<String>,
    pub community: String,
}

impl CreateLearningPath {
    /// Creates a public learning path request with the given title and community.
    pub fn new(title: impl Into<String>, community: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            community: community.into(),
            is_public: true,
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_visibility(mut self, is_public: bool) -> Self {
        self.is_public = is_public;
        self
    }

    pub fn with_thumbnail(mut self, thumbnail: impl Into<String>) -> Self {
        self.thumbnail = thumbnail.into();
        self
    }

    pub fn with_skills<I, T>(mut self, skills: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.skills = skills.into_iter().map(Into::into).collect();
        self
    }

    /// Validates the request and returns a normalized copy.
    ///
    /// The title and community are trimmed; skill names are trimmed, blank
    /// names dropped, and duplicates collapsed keeping the first occurrence.
    pub fn validate(self) -> Result<Self, DomainError> {
        let title = validate_title(&self.title)?;
        let community = self.community.trim().to_string();
        if community.is_empty() {
            return Err(DomainError::EmptyField { field: "community" });
        }
        check_length("community", &community, MAX_COMMUNITY_LEN)?;
        check_no_nul("community", &community)?;
        check_no_nul("description", &self.description)?;
        check_no_nul("thumbnail", &self.thumbnail)?;
        let skills = normalize_skill_names(&self.skills)?;

        Ok(Self {
            title,
            community,
            skills,
            ..self
        })
    }
}

/// Partial update of a learning path.
///
/// Only the fields listed here are mutable; anything else in an incoming
/// payload is ignored by construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateLearningPath {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// The concrete field values an update will write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldValues {
    pub title: String,
    pub description: String,
}

impl FieldValues {
    /// Captures the current values of a row, used as the compensation snapshot.
    pub fn of(path: &LearningPath) -> Self {
        Self {
            title: path.title.clone(),
            description: path.description.clone(),
        }
    }
}

impl UpdateLearningPath {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none()
    }

    /// Validates the patch and returns a normalized copy.
    pub fn validate(self) -> Result<Self, DomainError> {
        if self.is_empty() {
            return Err(DomainError::EmptyUpdate);
        }
        let title = self.title.as_deref().map(validate_title).transpose()?;
        if let Some(description) = &self.description {
            check_no_nul("description", description)?;
        }
        Ok(Self {
            title,
            description: self.description,
        })
    }

    /// Applies the patch on top of the current row values.
    pub fn resolve(&self, current: &LearningPath) -> FieldValues {
        FieldValues {
            title: self.title.clone().unwrap_or_else(|| current.title.clone()),
            description: self
                .description
                .clone()
                .unwrap_or_else(|| current.description.clone()),
        }
    }
}

/// Parses a learning path identifier supplied by a caller.
pub fn parse_learning_path_id(raw: &str) -> Result<LearningPathId, DomainError> {
    raw.parse()
        .map_err(|_| DomainError::InvalidIdentifier(raw.to_string()))
}

fn validate_title(raw: &str) -> Result<String, DomainError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(DomainError::EmptyField { field: "title" });
    }
    check_length("title", title, MAX_TITLE_LEN)?;
    check_no_nul("title", title)?;
    Ok(title.to_string())
}

fn check_length(field: &'static str, value: &str, max: usize) -> Result<(), DomainError> {
    let actual = value.chars().count();
    if actual > max {
        return Err(DomainError::TooLong { field, max, actual });
    }
    Ok(())
}

fn check_no_nul(field: &'static str, value: &str) -> Result<(), DomainError> {
    if value.contains('\0') {
        return Err(DomainError::NulCharacter { field });
    }
    Ok(())
}

fn normalize_skill_names(raw: &[String]) -> Result<Vec<String>, DomainError> {
    let mut names: Vec<String> = Vec::with_capacity(raw.len());
    for name in raw.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        check_length("skill name", name, MAX_SKILL_NAME_LEN)?;
        check_no_nul("skill name", name)?;
        if !names.iter().any(|existing| existing == name) {
            names.push(name.to_string());
        }
    }
    Ok(names)
}
