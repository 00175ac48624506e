use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::jobs::validation::{ApplicationDraft, JobDraft};
use crate::models::job::{ApplicationRow, ApplicationStatus, JobRow, JobType};
use crate::models::user::ExperienceLevel;
use crate::users::queries::{like_pattern, like_patterns};

pub const APPLICATION_CONSTRAINT: &str = "applications_job_applicant_key";

// ────────────────────────────────────────────────────────────────────────────
// Jobs
// ────────────────────────────────────────────────────────────────────────────

pub async fn insert_job<'e, E>(
    executor: E,
    employer_id: Uuid,
    draft: &JobDraft,
    payment_verified: bool,
) -> Result<JobRow, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, JobRow>(
        r#"
        INSERT INTO jobs
            (id, title, description, employer_id, skills, experience_level, job_type,
             location, remote, budget_min, budget_max, budget_currency, duration,
             payment_method, blockchain_network, payment_verified, payment_transaction_hash,
             tags, requirements, benefits)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
                $18, $19, $20)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&draft.title)
    .bind(&draft.description)
    .bind(employer_id)
    .bind(&draft.skills)
    .bind(draft.experience_level)
    .bind(draft.job_type)
    .bind(&draft.location)
    .bind(draft.remote)
    .bind(draft.budget_min)
    .bind(draft.budget_max)
    .bind(draft.budget_currency)
    .bind(draft.duration)
    .bind(draft.payment_method)
    .bind(draft.blockchain_network)
    .bind(payment_verified)
    .bind(&draft.payment_transaction_hash)
    .bind(&draft.tags)
    .bind(&draft.requirements)
    .bind(&draft.benefits)
    .fetch_one(executor)
    .await
}

pub async fn find_job(pool: &PgPool, id: Uuid) -> Result<Option<JobRow>, sqlx::Error> {
    sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Bumps the view counter and returns the updated row.
pub async fn increment_views(pool: &PgPool, id: Uuid) -> Result<Option<JobRow>, sqlx::Error> {
    sqlx::query_as::<_, JobRow>("UPDATE jobs SET views = views + 1 WHERE id = $1 RETURNING *")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Writes every editable column of `job`.
pub async fn save_job(pool: &PgPool, job: &JobRow) -> Result<JobRow, sqlx::Error> {
    sqlx::query_as::<_, JobRow>(
        r#"
        UPDATE jobs SET
            title = $2, description = $3, skills = $4, experience_level = $5, job_type = $6,
            location = $7, remote = $8, budget_min = $9, budget_max = $10,
            budget_currency = $11, duration = $12, status = $13, payment_method = $14,
            blockchain_network = $15, tags = $16, requirements = $17, benefits = $18,
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(job.id)
    .bind(&job.title)
    .bind(&job.description)
    .bind(&job.skills)
    .bind(job.experience_level)
    .bind(job.job_type)
    .bind(&job.location)
    .bind(job.remote)
    .bind(job.budget_min)
    .bind(job.budget_max)
    .bind(job.budget_currency)
    .bind(job.duration)
    .bind(job.status)
    .bind(job.payment_method)
    .bind(job.blockchain_network)
    .bind(&job.tags)
    .bind(&job.requirements)
    .bind(&job.benefits)
    .fetch_one(pool)
    .await
}

pub async fn delete_job(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM jobs WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Filters for the public job board. Only active jobs are ever listed.
#[derive(Debug, Default)]
pub struct JobFilters {
    pub skills: Vec<String>,
    pub location: Option<String>,
    pub experience_level: Option<ExperienceLevel>,
    pub job_type: Option<JobType>,
    pub remote: Option<bool>,
    pub min_budget: Option<f64>,
    pub max_budget: Option<f64>,
    pub search: Option<String>,
}

fn push_job_filters(builder: &mut QueryBuilder<'_, Postgres>, filters: &JobFilters) {
    builder.push(" WHERE status = 'active'");
    if !filters.skills.is_empty() {
        builder
            .push(" AND EXISTS (SELECT 1 FROM unnest(skills) AS s, unnest(")
            .push_bind(like_patterns(&filters.skills))
            .push("::text[]) AS p WHERE s ILIKE p)");
    }
    if let Some(location) = &filters.location {
        builder
            .push(" AND location ILIKE ")
            .push_bind(like_pattern(location));
    }
    if let Some(level) = filters.experience_level {
        builder.push(" AND experience_level = ").push_bind(level);
    }
    if let Some(job_type) = filters.job_type {
        builder.push(" AND job_type = ").push_bind(job_type);
    }
    if let Some(remote) = filters.remote {
        builder.push(" AND remote = ").push_bind(remote);
    }
    if let Some(min) = filters.min_budget {
        builder.push(" AND budget_min >= ").push_bind(min);
    }
    if let Some(max) = filters.max_budget {
        builder.push(" AND budget_max <= ").push_bind(max);
    }
    if let Some(search) = &filters.search {
        builder
            .push(" AND to_tsvector('english', title || ' ' || description) @@ plainto_tsquery('english', ")
            .push_bind(search.clone())
            .push(")");
    }
}

/// Newest-first page of active jobs matching `filters`, plus the total count.
pub async fn list_jobs(
    pool: &PgPool,
    filters: &JobFilters,
    limit: i64,
    offset: i64,
) -> Result<(Vec<JobRow>, i64), sqlx::Error> {
    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM jobs");
    push_job_filters(&mut count, filters);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut select = QueryBuilder::<Postgres>::new("SELECT * FROM jobs");
    push_job_filters(&mut select, filters);
    select
        .push(" ORDER BY created_at DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);
    let jobs = select.build_query_as::<JobRow>().fetch_all(pool).await?;

    Ok((jobs, total))
}

pub async fn active_jobs(pool: &PgPool) -> Result<Vec<JobRow>, sqlx::Error> {
    sqlx::query_as::<_, JobRow>(
        "SELECT * FROM jobs WHERE status = 'active' ORDER BY created_at DESC",
    )
    .fetch_all(pool)
    .await
}

pub async fn jobs_by_employer(pool: &PgPool, employer_id: Uuid) -> Result<Vec<JobRow>, sqlx::Error> {
    sqlx::query_as::<_, JobRow>(
        "SELECT * FROM jobs WHERE employer_id = $1 ORDER BY created_at DESC",
    )
    .bind(employer_id)
    .fetch_all(pool)
    .await
}

// ────────────────────────────────────────────────────────────────────────────
// Applications
// ────────────────────────────────────────────────────────────────────────────

pub async fn has_applied(pool: &PgPool, job_id: Uuid, applicant_id: Uuid) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM applications WHERE job_id = $1 AND applicant_id = $2)",
    )
    .bind(job_id)
    .bind(applicant_id)
    .fetch_one(pool)
    .await
}

/// Inserts the application and bumps the job's `applications_count`.
/// Run inside a transaction so both happen or neither does.
pub async fn insert_application(
    conn: &mut sqlx::PgConnection,
    job_id: Uuid,
    applicant_id: Uuid,
    draft: &ApplicationDraft,
    match_score: u32,
) -> Result<ApplicationRow, sqlx::Error> {
    let application = sqlx::query_as::<_, ApplicationRow>(
        r#"
        INSERT INTO applications
            (id, job_id, applicant_id, cover_letter, proposed_budget, estimated_duration, match_score)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(job_id)
    .bind(applicant_id)
    .bind(&draft.cover_letter)
    .bind(draft.proposed_budget)
    .bind(&draft.estimated_duration)
    .bind(match_score.min(100) as i32)
    .fetch_one(&mut *conn)
    .await?;

    sqlx::query(
        "UPDATE jobs SET applications_count = applications_count + 1, updated_at = NOW() WHERE id = $1",
    )
    .bind(job_id)
    .execute(&mut *conn)
    .await?;

    Ok(application)
}

pub async fn applications_for_jobs(
    pool: &PgPool,
    job_ids: &[Uuid],
) -> Result<Vec<ApplicationRow>, sqlx::Error> {
    if job_ids.is_empty() {
        return Ok(vec![]);
    }
    sqlx::query_as::<_, ApplicationRow>(
        "SELECT * FROM applications WHERE job_id = ANY($1) ORDER BY applied_at ASC",
    )
    .bind(job_ids)
    .fetch_all(pool)
    .await
}

const LOCK_APPLICATION: &str =
    "SELECT * FROM applications WHERE id = $1 AND job_id = $2 FOR UPDATE";

/// Reads an application and holds its row lock until the surrounding
/// transaction ends, so concurrent status changes see each other's result.
pub async fn lock_application<'e, E>(
    executor: E,
    job_id: Uuid,
    application_id: Uuid,
) -> Result<Option<ApplicationRow>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, ApplicationRow>(LOCK_APPLICATION)
        .bind(application_id)
        .bind(job_id)
        .fetch_optional(executor)
        .await
}

pub async fn set_application_status<'e, E>(
    executor: E,
    application_id: Uuid,
    status: ApplicationStatus,
) -> Result<ApplicationRow, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, ApplicationRow>(
        "UPDATE applications SET status = $2 WHERE id = $1 RETURNING *",
    )
    .bind(application_id)
    .bind(status)
    .fetch_one(executor)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_application_lookup_takes_row_lock() {
        assert!(LOCK_APPLICATION.ends_with("FOR UPDATE"));
        assert!(LOCK_APPLICATION.contains("job_id = $2"));
    }

    #[test]
    fn test_active_only_without_filters() {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT * FROM jobs");
        push_job_filters(&mut builder, &JobFilters::default());
        assert_eq!(builder.sql(), "SELECT * FROM jobs WHERE status = 'active'");
    }

    #[test]
    fn test_budget_filters_use_their_own_bounds() {
        let filters = JobFilters {
            min_budget: Some(100.0),
            max_budget: Some(500.0),
            ..Default::default()
        };
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM jobs");
        push_job_filters(&mut builder, &filters);
        let sql = builder.sql();
        assert!(sql.contains("budget_min >= $1"));
        assert!(sql.contains("budget_max <= $2"));
    }

    #[test]
    fn test_all_filters_bind_in_order() {
        let filters = JobFilters {
            skills: vec!["rust".to_string()],
            location: Some("berlin".to_string()),
            experience_level: Some(ExperienceLevel::Mid),
            job_type: Some(JobType::Contract),
            remote: Some(true),
            min_budget: Some(1.0),
            max_budget: Some(2.0),
            search: Some("defi".to_string()),
        };
        let mut builder = QueryBuilder::<Postgres>::new("SELECT * FROM jobs");
        push_job_filters(&mut builder, &filters);
        let sql = builder.sql();
        assert!(sql.contains("unnest($1::text[])"));
        assert!(sql.contains("location ILIKE $2"));
        assert!(sql.contains("experience_level = $3"));
        assert!(sql.contains("job_type = $4"));
        assert!(sql.contains("remote = $5"));
        assert!(sql.contains("plainto_tsquery('english', $8)"));
    }
}
