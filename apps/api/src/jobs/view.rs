use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::job::{
    ApplicationRow, ApplicationStatus, BlockchainNetwork, Budget, JobDuration, JobRow, JobStatus,
    JobType, PaymentMethod,
};
use crate::models::user::{ExperienceLevel, UserSummary};

/// Job as returned by the API, with derived `budgetRange` and `timeAgo`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub employer: EmployerRef,
    pub skills: Vec<String>,
    pub experience_level: ExperienceLevel,
    pub job_type: JobType,
    pub location: String,
    pub remote: bool,
    pub budget: Budget,
    pub budget_range: String,
    pub duration: JobDuration,
    pub status: JobStatus,
    pub payment_method: PaymentMethod,
    pub blockchain_network: BlockchainNetwork,
    pub payment_verified: bool,
    pub payment_transaction_hash: Option<String>,
    pub tags: Vec<String>,
    pub requirements: Vec<String>,
    pub benefits: Vec<String>,
    pub views: i32,
    pub applications_count: i32,
    pub is_featured: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub time_ago: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applications: Option<Vec<ApplicationView>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_score: Option<u32>,
}

/// The employer summary when the account still exists, otherwise just its id.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum EmployerRef {
    Summary(UserSummary),
    Id(Uuid),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationView {
    pub id: Uuid,
    pub applicant: Option<UserSummary>,
    pub cover_letter: String,
    pub proposed_budget: f64,
    pub estimated_duration: String,
    pub status: ApplicationStatus,
    pub match_score: i32,
    pub applied_at: DateTime<Utc>,
}

/// An application to one of the caller's jobs.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivedApplicationView {
    #[serde(flatten)]
    pub application: ApplicationView,
    pub job_title: String,
    pub job_id: Uuid,
}

/// `"<currency> <min> - <max>"`, e.g. `USD 100 - 200`.
pub fn budget_range(job: &JobRow) -> String {
    format!(
        "{} {} - {}",
        job.budget_currency.as_str(),
        job.budget_min,
        job.budget_max
    )
}

/// Coarse age of a posting: `Just now`, `Nh ago`, `Nd ago`, `Nw ago`, `Nm ago`.
pub fn time_ago(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let hours = (now - created_at).num_hours();
    if hours < 1 {
        return "Just now".to_string();
    }
    if hours < 24 {
        return format!("{hours}h ago");
    }
    let days = hours / 24;
    if days < 7 {
        return format!("{days}d ago");
    }
    let weeks = days / 7;
    if weeks < 4 {
        return format!("{weeks}w ago");
    }
    format!("{}m ago", (days / 30).max(1))
}

impl ApplicationView {
    pub fn new(application: &ApplicationRow, applicant: Option<UserSummary>) -> Self {
        ApplicationView {
            id: application.id,
            applicant,
            cover_letter: application.cover_letter.clone(),
            proposed_budget: application.proposed_budget,
            estimated_duration: application.estimated_duration.clone(),
            status: application.status,
            match_score: application.match_score,
            applied_at: application.applied_at,
        }
    }
}

impl JobView {
    pub fn new(job: &JobRow, employer: Option<UserSummary>, now: DateTime<Utc>) -> Self {
        JobView {
            id: job.id,
            title: job.title.clone(),
            description: job.description.clone(),
            employer: employer
                .map(EmployerRef::Summary)
                .unwrap_or(EmployerRef::Id(job.employer_id)),
            skills: job.skills.clone(),
            experience_level: job.experience_level,
            job_type: job.job_type,
            location: job.location.clone(),
            remote: job.remote,
            budget: job.budget(),
            budget_range: budget_range(job),
            duration: job.duration,
            status: job.status,
            payment_method: job.payment_method,
            blockchain_network: job.blockchain_network,
            payment_verified: job.payment_verified,
            payment_transaction_hash: job.payment_transaction_hash.clone(),
            tags: job.tags.clone(),
            requirements: job.requirements.clone(),
            benefits: job.benefits.clone(),
            views: job.views,
            applications_count: job.applications_count,
            is_featured: job.is_featured,
            expires_at: job.expires_at,
            created_at: job.created_at,
            updated_at: job.updated_at,
            time_ago: time_ago(job.created_at, now),
            applications: None,
            match_score: None,
        }
    }

    pub fn with_applications(mut self, applications: Vec<ApplicationView>) -> Self {
        self.applications = Some(applications);
        self
    }

    pub fn with_match_score(mut self, score: u32) -> Self {
        self.match_score = Some(score);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::rules::tests::make_job;
    use crate::models::job::Currency;
    use crate::users::profile::tests::make_user;
    use chrono::Duration;

    #[test]
    fn test_time_ago_buckets() {
        let now = Utc::now();
        let cases = [
            (Duration::minutes(59), "Just now"),
            (Duration::hours(5), "5h ago"),
            (Duration::hours(23), "23h ago"),
            (Duration::days(1), "1d ago"),
            (Duration::days(6), "6d ago"),
            (Duration::days(7), "1w ago"),
            (Duration::days(27), "3w ago"),
            (Duration::days(28), "1m ago"),
            (Duration::days(95), "3m ago"),
        ];
        for (age, expected) in cases {
            assert_eq!(time_ago(now - age, now), expected, "age {age}");
        }
    }

    #[test]
    fn test_budget_range_formats_whole_numbers() {
        let mut job = make_job(Uuid::new_v4());
        assert_eq!(budget_range(&job), "USD 100 - 200");
        job.budget_currency = Currency::Eth;
        job.budget_min = 0.5;
        job.budget_max = 1.25;
        assert_eq!(budget_range(&job), "ETH 0.5 - 1.25");
    }

    #[test]
    fn test_job_view_json_shape() {
        let employer = make_user("Carol");
        let job = make_job(employer.id);
        let view = JobView::new(&job, Some(employer.summary()), job.created_at);
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["budgetRange"], "USD 100 - 200");
        assert_eq!(json["timeAgo"], "Just now");
        assert_eq!(json["jobType"], "full-time");
        assert_eq!(json["employer"]["name"], "Carol");
        assert!(json.get("applications").is_none());
        assert!(json.get("matchScore").is_none());

        let json = serde_json::to_value(view.with_match_score(77)).unwrap();
        assert_eq!(json["matchScore"], 77);
    }

    #[test]
    fn test_missing_employer_renders_id() {
        let job = make_job(Uuid::new_v4());
        let json = serde_json::to_value(JobView::new(&job, None, Utc::now())).unwrap();
        assert_eq!(json["employer"], job.employer_id.to_string());
    }
}
