use uuid::Uuid;

use crate::errors::AppError;
use crate::models::job::{ApplicationStatus, JobRow, JobStatus};

pub const NOT_ACCEPTING: &str = "This job is not accepting applications";
pub const OWN_JOB: &str = "You cannot apply to your own job";
pub const ALREADY_APPLIED: &str = "You have already applied to this job";

/// Business rules for a new application, checked in order: the job must be
/// active, must not belong to the applicant, and must not already hold an
/// application from them.
pub fn check_application_allowed(
    job: &JobRow,
    applicant_id: Uuid,
    already_applied: bool,
) -> Result<(), AppError> {
    if job.status != JobStatus::Active {
        return Err(AppError::BadRequest(NOT_ACCEPTING.to_string()));
    }
    if job.employer_id == applicant_id {
        return Err(AppError::BadRequest(OWN_JOB.to_string()));
    }
    if already_applied {
        return Err(AppError::BadRequest(ALREADY_APPLIED.to_string()));
    }
    Ok(())
}

/// 403 unless `user_id` posted `job`.
pub fn ensure_owner(job: &JobRow, user_id: Uuid, action: &str) -> Result<(), AppError> {
    if job.employer_id == user_id {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!("Not authorized to {action}")))
    }
}

/// Only a transition into `hired` counts towards the applicant's hires.
pub fn counts_as_new_hire(previous: ApplicationStatus, next: ApplicationStatus) -> bool {
    next == ApplicationStatus::Hired && previous != ApplicationStatus::Hired
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::job::{
        BlockchainNetwork, Currency, JobDuration, JobType, PaymentMethod,
    };
    use crate::models::user::ExperienceLevel;
    use chrono::{Duration, Utc};

    pub(crate) fn make_job(employer_id: Uuid) -> JobRow {
        let now = Utc::now();
        JobRow {
            id: Uuid::new_v4(),
            title: "Rust backend engineer".to_string(),
            description: "Build the settlement service for our exchange.".to_string(),
            employer_id,
            skills: vec!["rust".to_string(), "postgresql".to_string()],
            experience_level: ExperienceLevel::Mid,
            job_type: JobType::FullTime,
            location: "Berlin".to_string(),
            remote: true,
            budget_min: 100.0,
            budget_max: 200.0,
            budget_currency: Currency::Usd,
            duration: JobDuration::Ongoing,
            status: JobStatus::Active,
            payment_method: PaymentMethod::Crypto,
            blockchain_network: BlockchainNetwork::Ethereum,
            payment_verified: false,
            payment_transaction_hash: None,
            tags: vec![],
            requirements: vec![],
            benefits: vec![],
            views: 0,
            applications_count: 0,
            is_featured: false,
            expires_at: now + Duration::days(30),
            created_at: now,
            updated_at: now,
        }
    }

    fn rejection(result: Result<(), AppError>) -> String {
        match result {
            Err(AppError::BadRequest(msg)) => msg,
            other => panic!("expected a bad request, got {other:?}"),
        }
    }

    #[test]
    fn test_allowed_application() {
        let job = make_job(Uuid::new_v4());
        assert!(check_application_allowed(&job, Uuid::new_v4(), false).is_ok());
    }

    #[test]
    fn test_inactive_job_is_checked_first() {
        let employer = Uuid::new_v4();
        let mut job = make_job(employer);
        job.status = JobStatus::Paused;
        assert_eq!(rejection(check_application_allowed(&job, employer, true)), NOT_ACCEPTING);
    }

    #[test]
    fn test_own_job_before_duplicate() {
        let employer = Uuid::new_v4();
        let job = make_job(employer);
        assert_eq!(rejection(check_application_allowed(&job, employer, true)), OWN_JOB);
    }

    #[test]
    fn test_second_application_rejected() {
        let job = make_job(Uuid::new_v4());
        assert_eq!(
            rejection(check_application_allowed(&job, Uuid::new_v4(), true)),
            ALREADY_APPLIED
        );
    }

    #[test]
    fn test_ensure_owner() {
        let employer = Uuid::new_v4();
        let job = make_job(employer);
        assert!(ensure_owner(&job, employer, "update this job").is_ok());
        assert!(matches!(
            ensure_owner(&job, Uuid::new_v4(), "update this job"),
            Err(AppError::Forbidden(msg)) if msg == "Not authorized to update this job"
        ));
    }

    #[test]
    fn test_new_hire_only_on_transition() {
        use ApplicationStatus::*;
        assert!(counts_as_new_hire(Pending, Hired));
        assert!(counts_as_new_hire(Shortlisted, Hired));
        assert!(!counts_as_new_hire(Hired, Hired));
        assert!(!counts_as_new_hire(Pending, Rejected));
    }
}
