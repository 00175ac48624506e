use std::collections::HashMap;

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::db::is_unique_violation;
use crate::errors::AppError;
use crate::jobs::queries::{self, JobFilters, APPLICATION_CONSTRAINT};
use crate::jobs::rules::{check_application_allowed, counts_as_new_hire, ensure_owner, ALREADY_APPLIED};
use crate::jobs::validation::{ApplyInput, JobInput, StatusInput};
use crate::jobs::view::{ApplicationView, JobView, ReceivedApplicationView};
use crate::matching::score::{compute_match, match_score, recommend, CandidateProfile, JobCriteria, MatchBreakdown};
use crate::matching::skills::extract_skills;
use crate::models::job::{JobRow, JobType};
use crate::models::user::{ExperienceLevel, UserSummary};
use crate::pagination::{PageParams, Pagination};
use crate::payments::queries::claim_platform_fee;
use crate::state::AppState;
use crate::users::queries::{self as user_queries, split_csv, UserStat};
use crate::validation::{parse_label, AppJson, AppPath, AppQuery, FieldErrors};

pub const RECOMMENDATION_LIMIT: usize = 10;

async fn summaries(pool: &PgPool, ids: Vec<Uuid>) -> Result<HashMap<Uuid, UserSummary>, AppError> {
    let mut ids = ids;
    ids.sort();
    ids.dedup();
    Ok(user_queries::find_many(pool, &ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u.summary()))
        .collect())
}

/// Renders jobs with their employer summaries.
async fn job_views(pool: &PgPool, jobs: &[JobRow]) -> Result<Vec<JobView>, AppError> {
    let employers = summaries(pool, jobs.iter().map(|j| j.employer_id).collect()).await?;
    let now = Utc::now();
    Ok(jobs
        .iter()
        .map(|job| JobView::new(job, employers.get(&job.employer_id).cloned(), now))
        .collect())
}

fn load_job(job: Option<JobRow>) -> Result<JobRow, AppError> {
    job.ok_or_else(|| AppError::NotFound("Job not found".to_string()))
}

// ────────────────────────────────────────────────────────────────────────────
// Listing
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub skills: Option<String>,
    pub location: Option<String>,
    pub experience_level: Option<String>,
    pub job_type: Option<String>,
    pub remote: Option<String>,
    pub min_budget: Option<String>,
    pub max_budget: Option<String>,
    pub search: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl JobListQuery {
    fn filters(&self) -> Result<JobFilters, AppError> {
        let mut errors = FieldErrors::new();

        let experience_level = non_blank(&self.experience_level).and_then(|raw| {
            let level = ExperienceLevel::parse(raw);
            errors.check(level.is_some(), "experienceLevel", "Invalid experience level");
            level
        });
        let job_type = non_blank(&self.job_type).and_then(|raw| {
            let job_type = parse_label::<JobType>(raw);
            errors.check(job_type.is_some(), "jobType", "Invalid job type");
            job_type
        });
        let mut budget = |value: &Option<String>, field: &str| {
            non_blank(value).and_then(|raw| {
                let parsed = raw.parse::<f64>().ok().filter(|n| n.is_finite());
                errors.check(parsed.is_some(), field, "Budget must be a number");
                parsed
            })
        };
        let min_budget = budget(&self.min_budget, "minBudget");
        let max_budget = budget(&self.max_budget, "maxBudget");
        errors.into_result()?;

        Ok(JobFilters {
            skills: split_csv(self.skills.as_deref()),
            location: non_blank(&self.location).map(str::to_string),
            experience_level,
            job_type,
            remote: self.remote.as_deref().map(|r| r.trim() == "true"),
            min_budget,
            max_budget,
            search: non_blank(&self.search).map(str::to_string),
        })
    }
}

#[derive(Serialize)]
pub struct JobListResponse {
    pub jobs: Vec<JobView>,
    pub pagination: Pagination,
}

/// GET /api/jobs
pub async fn list_jobs(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<JobListQuery>,
) -> Result<Json<JobListResponse>, AppError> {
    let filters = query.filters()?;
    let page = PageParams {
        page: query.page,
        limit: query.limit,
    };
    let (jobs, total) = queries::list_jobs(&state.db, &filters, page.limit(), page.offset()).await?;
    Ok(Json(JobListResponse {
        jobs: job_views(&state.db, &jobs).await?,
        pagination: page.envelope(total),
    }))
}

#[derive(Serialize)]
pub struct JobsResponse {
    pub jobs: Vec<JobView>,
}

/// GET /api/jobs/my-jobs
pub async fn my_jobs(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<JobsResponse>, AppError> {
    let jobs = queries::jobs_by_employer(&state.db, user.id).await?;
    let now = Utc::now();
    let employer = user.summary();
    Ok(Json(JobsResponse {
        jobs: jobs
            .iter()
            .map(|job| JobView::new(job, Some(employer.clone()), now))
            .collect(),
    }))
}

#[derive(Serialize)]
pub struct ReceivedApplicationsResponse {
    pub applications: Vec<ReceivedApplicationView>,
}

/// GET /api/jobs/applications
pub async fn received_applications(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<ReceivedApplicationsResponse>, AppError> {
    let jobs = queries::jobs_by_employer(&state.db, user.id).await?;
    let job_ids: Vec<Uuid> = jobs.iter().map(|j| j.id).collect();
    let applications = queries::applications_for_jobs(&state.db, &job_ids).await?;
    let applicants = summaries(&state.db, applications.iter().map(|a| a.applicant_id).collect()).await?;
    let applicants = &applicants;

    let received = jobs
        .iter()
        .flat_map(|job| {
            applications
                .iter()
                .filter(move |a| a.job_id == job.id)
                .map(move |a| ReceivedApplicationView {
                    application: ApplicationView::new(a, applicants.get(&a.applicant_id).cloned()),
                    job_title: job.title.clone(),
                    job_id: job.id,
                })
        })
        .collect();

    Ok(Json(ReceivedApplicationsResponse {
        applications: received,
    }))
}

/// GET /api/jobs/recommended
pub async fn recommended(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<JobsResponse>, AppError> {
    let jobs = queries::active_jobs(&state.db).await?;
    let ranked = recommend(&jobs, &CandidateProfile::from(&user), RECOMMENDATION_LIMIT);

    let employers = summaries(&state.db, ranked.iter().map(|(j, _)| j.employer_id).collect()).await?;
    let now = Utc::now();
    Ok(Json(JobsResponse {
        jobs: ranked
            .into_iter()
            .map(|(job, score)| {
                JobView::new(job, employers.get(&job.employer_id).cloned(), now)
                    .with_match_score(score)
            })
            .collect(),
    }))
}

// ────────────────────────────────────────────────────────────────────────────
// Single job
// ────────────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct JobResponse {
    pub job: JobView,
}

/// GET /api/jobs/:id
pub async fn get_job(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<JobResponse>, AppError> {
    let job = load_job(queries::increment_views(&state.db, id).await?)?;
    let applications = queries::applications_for_jobs(&state.db, &[job.id]).await?;

    let mut people: Vec<Uuid> = applications.iter().map(|a| a.applicant_id).collect();
    people.push(job.employer_id);
    let users = summaries(&state.db, people).await?;

    let applications = applications
        .iter()
        .map(|a| ApplicationView::new(a, users.get(&a.applicant_id).cloned()))
        .collect();
    let view = JobView::new(&job, users.get(&job.employer_id).cloned(), Utc::now())
        .with_applications(applications);
    Ok(Json(JobResponse { job: view }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResponse {
    pub job_id: Uuid,
    #[serde(rename = "match")]
    pub breakdown: MatchBreakdown,
}

/// GET /api/jobs/:id/match
pub async fn job_match(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<MatchResponse>, AppError> {
    let job = load_job(queries::find_job(&state.db, id).await?)?;
    Ok(Json(MatchResponse {
        job_id: job.id,
        breakdown: compute_match(&JobCriteria::from(&job), &CandidateProfile::from(&user)),
    }))
}

#[derive(Serialize)]
pub struct JobMutationResponse {
    pub message: &'static str,
    pub job: JobView,
}

/// POST /api/jobs
pub async fn create_job(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppJson(input): AppJson<JobInput>,
) -> Result<(StatusCode, Json<JobMutationResponse>), AppError> {
    let draft = input.into_draft()?;
    if state.config.require_platform_fee && draft.payment_transaction_hash.is_none() {
        return Err(AppError::invalid(
            "paymentTransactionHash",
            "A platform fee payment is required to post a job",
        ));
    }

    let mut tx = state.db.begin().await?;
    let job = queries::insert_job(
        &mut *tx,
        user.id,
        &draft,
        draft.payment_transaction_hash.is_some(),
    )
    .await?;

    if let Some(hash) = &draft.payment_transaction_hash {
        if claim_platform_fee(&mut *tx, user.id, hash, job.id).await?.is_none() {
            warn!(user_id = %user.id, %hash, "Job posted with unusable platform fee");
            return Err(AppError::BadRequest(
                "No unused platform fee payment found for this transaction".to_string(),
            ));
        }
    }

    user_queries::increment_stat(&mut *tx, user.id, UserStat::JobsPosted).await?;
    tx.commit().await?;

    info!(job_id = %job.id, employer_id = %user.id, "Job posted");
    Ok((
        StatusCode::CREATED,
        Json(JobMutationResponse {
            message: "Job posted successfully",
            job: JobView::new(&job, Some(user.summary()), Utc::now()),
        }),
    ))
}

/// PUT /api/jobs/:id
pub async fn update_job(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(input): AppJson<JobInput>,
) -> Result<Json<JobMutationResponse>, AppError> {
    let patch = input.into_patch()?;
    let mut job = load_job(queries::find_job(&state.db, id).await?)?;
    ensure_owner(&job, user.id, "update this job")?;

    patch.apply(&mut job);
    let job = queries::save_job(&state.db, &job).await?;

    info!(job_id = %job.id, "Job updated");
    Ok(Json(JobMutationResponse {
        message: "Job updated successfully",
        job: JobView::new(&job, Some(user.summary()), Utc::now()),
    }))
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// DELETE /api/jobs/:id
pub async fn delete_job(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    let job = load_job(queries::find_job(&state.db, id).await?)?;
    ensure_owner(&job, user.id, "delete this job")?;
    queries::delete_job(&state.db, job.id).await?;

    info!(job_id = %job.id, "Job deleted");
    Ok(Json(MessageResponse {
        message: "Job deleted successfully",
    }))
}

// ────────────────────────────────────────────────────────────────────────────
// Applications
// ────────────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ApplicationResponse {
    pub message: &'static str,
    pub application: ApplicationView,
}

/// POST /api/jobs/:id/apply
pub async fn apply(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(input): AppJson<ApplyInput>,
) -> Result<(StatusCode, Json<ApplicationResponse>), AppError> {
    let draft = input.into_draft()?;
    let job = load_job(queries::find_job(&state.db, id).await?)?;
    let already_applied = queries::has_applied(&state.db, job.id, user.id).await?;
    check_application_allowed(&job, user.id, already_applied)?;

    let score = match_score(&JobCriteria::from(&job), &CandidateProfile::from(&user));

    let mut tx = state.db.begin().await?;
    let application = match queries::insert_application(&mut tx, job.id, user.id, &draft, score).await {
        Ok(application) => application,
        Err(e) if is_unique_violation(&e, APPLICATION_CONSTRAINT) => {
            return Err(AppError::BadRequest(ALREADY_APPLIED.to_string()))
        }
        Err(e) => return Err(e.into()),
    };
    user_queries::increment_stat(&mut *tx, user.id, UserStat::ApplicationsSubmitted).await?;
    tx.commit().await?;

    info!(job_id = %job.id, applicant_id = %user.id, score, "Application submitted");
    Ok((
        StatusCode::CREATED,
        Json(ApplicationResponse {
            message: "Application submitted successfully",
            application: ApplicationView::new(&application, Some(user.summary())),
        }),
    ))
}

/// PUT /api/jobs/:job_id/applications/:application_id
pub async fn update_application_status(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath((job_id, application_id)): AppPath<(Uuid, Uuid)>,
    AppJson(input): AppJson<StatusInput>,
) -> Result<Json<ApplicationResponse>, AppError> {
    let status = input.parse()?;
    let job = load_job(queries::find_job(&state.db, job_id).await?)?;
    ensure_owner(&job, user.id, "update this application")?;

    let mut tx = state.db.begin().await?;
    let current = queries::lock_application(&mut *tx, job.id, application_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Application not found".to_string()))?;
    let updated = queries::set_application_status(&mut *tx, current.id, status).await?;
    if counts_as_new_hire(current.status, status) {
        user_queries::increment_stat(&mut *tx, current.applicant_id, UserStat::JobsHired).await?;
    }
    tx.commit().await?;

    info!(application_id = %updated.id, status = ?updated.status, "Application status updated");
    let applicant = user_queries::find_by_id(&state.db, updated.applicant_id)
        .await?
        .map(|u| u.summary());
    Ok(Json(ApplicationResponse {
        message: "Application status updated successfully",
        application: ApplicationView::new(&updated, applicant),
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ExtractSkillsRequest {
    pub text: String,
}

#[derive(Serialize)]
pub struct ExtractSkillsResponse {
    pub skills: Vec<&'static str>,
}

/// POST /api/jobs/extract-skills
pub async fn extract(AppJson(req): AppJson<ExtractSkillsRequest>) -> Json<ExtractSkillsResponse> {
    Json(ExtractSkillsResponse {
        skills: extract_skills(&req.text),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_filters_parse_query_values() {
        let query = JobListQuery {
            skills: Some("react, solidity".to_string()),
            location: Some(" ".to_string()),
            experience_level: Some("mid".to_string()),
            job_type: Some("full-time".to_string()),
            remote: Some("true".to_string()),
            min_budget: Some("100".to_string()),
            max_budget: Some("".to_string()),
            search: Some("defi".to_string()),
            ..Default::default()
        };
        let filters = query.filters().unwrap();
        assert_eq!(filters.skills, vec!["react", "solidity"]);
        assert_eq!(filters.location, None);
        assert_eq!(filters.experience_level, Some(ExperienceLevel::Mid));
        assert_eq!(filters.job_type, Some(JobType::FullTime));
        assert_eq!(filters.remote, Some(true));
        assert_eq!(filters.min_budget, Some(100.0));
        assert_eq!(filters.max_budget, None);
        assert_eq!(filters.search.as_deref(), Some("defi"));
    }

    #[test]
    fn test_remote_flag_is_false_unless_true() {
        let query = JobListQuery {
            remote: Some("yes".to_string()),
            ..Default::default()
        };
        assert_eq!(query.filters().unwrap().remote, Some(false));
        assert_eq!(JobListQuery::default().filters().unwrap().remote, None);
    }

    #[test]
    fn test_list_filters_reject_bad_values() {
        let query = JobListQuery {
            job_type: Some("gig".to_string()),
            min_budget: Some("cheap".to_string()),
            ..Default::default()
        };
        match query.filters() {
            Err(AppError::InvalidFields(errors)) => {
                let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
                assert_eq!(fields, vec!["jobType", "minBudget"]);
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_extract_handler() {
        let Json(response) = extract(AppJson(ExtractSkillsRequest {
            text: "Senior Rust and Docker engineer".to_string(),
        }))
        .await;
        assert_eq!(response.skills, vec!["rust", "docker"]);
    }
}
