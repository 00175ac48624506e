use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Seniority ladder shared by candidate profiles and job postings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "experience_level", rename_all = "lowercase")]
pub enum ExperienceLevel {
    Entry,
    Junior,
    Mid,
    Senior,
    Lead,
}

impl ExperienceLevel {
    pub const ALL: [ExperienceLevel; 5] = [
        ExperienceLevel::Entry,
        ExperienceLevel::Junior,
        ExperienceLevel::Mid,
        ExperienceLevel::Senior,
        ExperienceLevel::Lead,
    ];

    /// Position on the ladder, entry = 0 through lead = 4.
    pub fn index(self) -> i32 {
        match self {
            ExperienceLevel::Entry => 0,
            ExperienceLevel::Junior => 1,
            ExperienceLevel::Mid => 2,
            ExperienceLevel::Senior => 3,
            ExperienceLevel::Lead => 4,
        }
    }

    /// Case-insensitive lookup; unknown labels yield `None`.
    pub fn parse(label: &str) -> Option<Self> {
        let label = label.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|level| level.as_str() == label)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExperienceLevel::Entry => "entry",
            ExperienceLevel::Junior => "junior",
            ExperienceLevel::Mid => "mid",
            ExperienceLevel::Senior => "senior",
            ExperienceLevel::Lead => "lead",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "subscription_tier", rename_all = "lowercase")]
pub enum Subscription {
    Free,
    Premium,
    Enterprise,
}

#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub bio: Option<String>,
    pub linkedin_url: Option<String>,
    pub skills: Vec<String>,
    pub experience_level: ExperienceLevel,
    pub location: Option<String>,
    pub remote: bool,
    pub wallet_address: Option<String>,
    pub profile_completed: bool,
    pub is_verified: bool,
    pub subscription: Subscription,
    pub subscription_expires_at: Option<DateTime<Utc>>,
    pub job_alerts: bool,
    pub email_notifications: bool,
    pub push_notifications: bool,
    pub jobs_posted: i32,
    pub applications_submitted: i32,
    pub jobs_hired: i32,
    pub total_earned: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub jobs_posted: i32,
    pub applications_submitted: i32,
    pub jobs_hired: i32,
    pub total_earned: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub job_alerts: bool,
    pub email_notifications: bool,
    pub push_notifications: bool,
}

/// The caller's own account, as returned by auth and profile endpoints.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub bio: Option<String>,
    pub linkedin_url: Option<String>,
    pub skills: Vec<String>,
    pub experience_level: ExperienceLevel,
    pub location: Option<String>,
    pub remote: bool,
    pub wallet_address: Option<String>,
    pub profile_completed: bool,
    pub is_verified: bool,
    pub subscription: Subscription,
    pub preferences: Preferences,
    pub stats: UserStats,
    pub created_at: DateTime<Utc>,
}

/// Profile visible to anyone: no email, preferences or subscription expiry.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    pub id: Uuid,
    pub name: String,
    pub bio: Option<String>,
    pub linkedin_url: Option<String>,
    pub skills: Vec<String>,
    pub experience_level: ExperienceLevel,
    pub location: Option<String>,
    pub remote: bool,
    pub wallet_address: Option<String>,
    pub profile_completed: bool,
    pub is_verified: bool,
    pub stats: UserStats,
    pub created_at: DateTime<Utc>,
}

/// Compact applicant/employer card embedded in job responses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub bio: Option<String>,
    pub skills: Vec<String>,
    pub experience_level: ExperienceLevel,
    pub location: Option<String>,
}

impl UserRow {
    pub fn stats(&self) -> UserStats {
        UserStats {
            jobs_posted: self.jobs_posted,
            applications_submitted: self.applications_submitted,
            jobs_hired: self.jobs_hired,
            total_earned: self.total_earned,
        }
    }

    pub fn account_view(&self) -> AccountView {
        AccountView {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            bio: self.bio.clone(),
            linkedin_url: self.linkedin_url.clone(),
            skills: self.skills.clone(),
            experience_level: self.experience_level,
            location: self.location.clone(),
            remote: self.remote,
            wallet_address: self.wallet_address.clone(),
            profile_completed: self.profile_completed,
            is_verified: self.is_verified,
            subscription: self.subscription,
            preferences: Preferences {
                job_alerts: self.job_alerts,
                email_notifications: self.email_notifications,
                push_notifications: self.push_notifications,
            },
            stats: self.stats(),
            created_at: self.created_at,
        }
    }

    pub fn public_profile(&self) -> PublicProfile {
        PublicProfile {
            id: self.id,
            name: self.name.clone(),
            bio: self.bio.clone(),
            linkedin_url: self.linkedin_url.clone(),
            skills: self.skills.clone(),
            experience_level: self.experience_level,
            location: self.location.clone(),
            remote: self.remote,
            wallet_address: self.wallet_address.clone(),
            profile_completed: self.profile_completed,
            is_verified: self.is_verified,
            stats: self.stats(),
            created_at: self.created_at,
        }
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            name: self.name.clone(),
            bio: self.bio.clone(),
            skills: self.skills.clone(),
            experience_level: self.experience_level,
            location: self.location.clone(),
        }
    }
}
