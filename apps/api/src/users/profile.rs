//! Profile editing rules: field validation, skill list maintenance and the
//! profile-completion flag.

use serde::Deserialize;
use validator::Validate;

use crate::errors::AppError;
use crate::models::user::{ExperienceLevel, UserRow};
use crate::validation::{clean_string_list, parse_label, FieldErrors};

/// Partial profile update. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[validate(length(min = 2, message = "Name must be at least 2 characters long"))]
    pub name: Option<String>,
    #[validate(length(max = 1000, message = "Bio must be less than 1000 characters"))]
    pub bio: Option<String>,
    #[validate(url(message = "Please provide a valid LinkedIn URL"))]
    pub linkedin_url: Option<String>,
    pub skills: Option<Vec<String>>,
    pub experience_level: Option<String>,
    #[validate(length(min = 1, message = "Location cannot be empty"))]
    pub location: Option<String>,
    pub remote: Option<bool>,
}

impl ProfileUpdate {
    /// Trims every present text field.
    pub fn normalized(mut self) -> Self {
        for field in [
            &mut self.name,
            &mut self.bio,
            &mut self.linkedin_url,
            &mut self.experience_level,
            &mut self.location,
        ] {
            if let Some(value) = field {
                *value = value.trim().to_string();
            }
        }
        self
    }

    pub fn check(&self) -> Result<(), AppError> {
        let mut errors = FieldErrors::validated(self);
        if let Some(level) = &self.experience_level {
            errors.check(
                parse_label::<ExperienceLevel>(level).is_some(),
                "experienceLevel",
                "Invalid experience level",
            );
        }
        errors.into_result()
    }

    /// Applies the update to `user` and refreshes `profile_completed`.
    /// Call `check` first.
    pub fn apply(self, user: &mut UserRow) {
        if let Some(name) = self.name {
            user.name = name.trim().to_string();
        }
        if let Some(bio) = self.bio {
            user.bio = Some(bio.trim().to_string());
        }
        if let Some(url) = self.linkedin_url {
            user.linkedin_url = Some(url.trim().to_string());
        }
        if let Some(skills) = self.skills {
            user.skills = clean_string_list(&skills);
        }
        if let Some(level) = self.experience_level.as_deref().and_then(parse_label) {
            user.experience_level = level;
        }
        if let Some(location) = self.location {
            user.location = Some(location.trim().to_string());
        }
        if let Some(remote) = self.remote {
            user.remote = remote;
        }
        user.profile_completed = is_profile_complete(user);
    }
}

/// A profile is complete once name, bio, at least one skill, experience
/// level and location are all filled in.
pub fn is_profile_complete(user: &UserRow) -> bool {
    let filled = |value: &Option<String>| {
        value
            .as_deref()
            .map(|v| !v.trim().is_empty())
            .unwrap_or(false)
    };
    !user.name.trim().is_empty()
        && filled(&user.bio)
        && !user.skills.is_empty()
        && filled(&user.location)
}

/// Adds `skill` unless an identical entry exists. Returns whether it was added.
pub fn add_skill(skills: &mut Vec<String>, skill: &str) -> bool {
    let skill = skill.trim();
    if skill.is_empty() || skills.iter().any(|s| s == skill) {
        return false;
    }
    skills.push(skill.to_string());
    true
}

/// Removes every entry equal to `skill`. Returns whether anything changed.
pub fn remove_skill(skills: &mut Vec<String>, skill: &str) -> bool {
    let before = skills.len();
    skills.retain(|s| s != skill);
    skills.len() != before
}
