use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::models::user::{ExperienceLevel, UserRow};

pub const EMAIL_CONSTRAINT: &str = "users_email_key";
pub const WALLET_CONSTRAINT: &str = "users_wallet_address_key";

/// Fields supplied at registration.
pub struct NewUser<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub bio: Option<&'a str>,
    pub linkedin_url: Option<&'a str>,
    pub skills: &'a [String],
    pub experience_level: ExperienceLevel,
    pub location: Option<&'a str>,
    pub remote: bool,
    pub wallet_address: Option<&'a str>,
    pub profile_completed: bool,
}

pub async fn insert_user(pool: &PgPool, user: NewUser<'_>) -> Result<UserRow, sqlx::Error> {
    sqlx::query_as::<_, UserRow>(
        r#"
        INSERT INTO users
            (id, name, email, password_hash, bio, linkedin_url, skills,
             experience_level, location, remote, wallet_address, profile_completed)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.name)
    .bind(user.email)
    .bind(user.password_hash)
    .bind(user.bio)
    .bind(user.linkedin_url)
    .bind(user.skills)
    .bind(user.experience_level)
    .bind(user.location)
    .bind(user.remote)
    .bind(user.wallet_address)
    .bind(user.profile_completed)
    .fetch_one(pool)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<UserRow>, sqlx::Error> {
    sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<UserRow>, sqlx::Error> {
    sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_wallet(pool: &PgPool, wallet: &str) -> Result<Option<UserRow>, sqlx::Error> {
    sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE wallet_address = $1")
        .bind(wallet)
        .fetch_optional(pool)
        .await
}

pub async fn find_many(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<UserRow>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(vec![]);
    }
    sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(pool)
        .await
}

/// Persists the editable profile fields of `user`.
pub async fn save_profile(pool: &PgPool, user: &UserRow) -> Result<UserRow, sqlx::Error> {
    sqlx::query_as::<_, UserRow>(
        r#"
        UPDATE users SET
            name = $2, bio = $3, linkedin_url = $4, skills = $5, experience_level = $6,
            location = $7, remote = $8, profile_completed = $9, updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(user.id)
    .bind(&user.name)
    .bind(&user.bio)
    .bind(&user.linkedin_url)
    .bind(&user.skills)
    .bind(user.experience_level)
    .bind(&user.location)
    .bind(user.remote)
    .bind(user.profile_completed)
    .fetch_one(pool)
    .await
}

pub async fn set_wallet(pool: &PgPool, id: Uuid, wallet: &str) -> Result<UserRow, sqlx::Error> {
    sqlx::query_as::<_, UserRow>(
        "UPDATE users SET wallet_address = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(wallet)
    .fetch_one(pool)
    .await
}

/// Usage counters kept on the user row.
#[derive(Debug, Clone, Copy)]
pub enum UserStat {
    JobsPosted,
    ApplicationsSubmitted,
    JobsHired,
}

impl UserStat {
    fn column(self) -> &'static str {
        match self {
            UserStat::JobsPosted => "jobs_posted",
            UserStat::ApplicationsSubmitted => "applications_submitted",
            UserStat::JobsHired => "jobs_hired",
        }
    }
}

/// Atomic `+1` on one of the user's counters.
pub async fn increment_stat<'e, E>(executor: E, id: Uuid, stat: UserStat) -> Result<(), sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let column = stat.column();
    sqlx::query(&format!(
        "UPDATE users SET {column} = {column} + 1, updated_at = NOW() WHERE id = $1"
    ))
    .bind(id)
    .execute(executor)
    .await?;
    Ok(())
}

#[derive(Debug, Default)]
pub struct UserSearch {
    pub text: Option<String>,
    pub skills: Vec<String>,
    pub location: Option<String>,
    pub experience_level: Option<ExperienceLevel>,
}

fn push_search_filters(builder: &mut QueryBuilder<'_, Postgres>, search: &UserSearch) {
    builder.push(" WHERE TRUE");
    if let Some(text) = &search.text {
        builder
            .push(" AND to_tsvector('english', name || ' ' || coalesce(bio, '') || ' ' || coalesce(location, '') || ' ' || array_to_string(skills, ' ')) @@ plainto_tsquery('english', ")
            .push_bind(text.clone())
            .push(")");
    }
    if !search.skills.is_empty() {
        builder
            .push(" AND EXISTS (SELECT 1 FROM unnest(skills) AS s, unnest(")
            .push_bind(like_patterns(&search.skills))
            .push("::text[]) AS p WHERE s ILIKE p)");
    }
    if let Some(location) = &search.location {
        builder
            .push(" AND location ILIKE ")
            .push_bind(like_pattern(location));
    }
    if let Some(level) = search.experience_level {
        builder.push(" AND experience_level = ").push_bind(level);
    }
}

/// Newest-first page of users matching `search`, plus the total match count.
pub async fn search_users(
    pool: &PgPool,
    search: &UserSearch,
    limit: i64,
    offset: i64,
) -> Result<(Vec<UserRow>, i64), sqlx::Error> {
    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users");
    push_search_filters(&mut count, search);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut select = QueryBuilder::<Postgres>::new("SELECT * FROM users");
    push_search_filters(&mut select, search);
    select
        .push(" ORDER BY created_at DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);
    let users = select.build_query_as::<UserRow>().fetch_all(pool).await?;

    Ok((users, total))
}

/// `%value%` with LIKE metacharacters escaped.
pub fn like_pattern(value: &str) -> String {
    let escaped = value
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

pub fn like_patterns(values: &[String]) -> Vec<String> {
    values.iter().map(|v| like_pattern(v)).collect()
}

/// Splits a comma-separated query value into trimmed, non-empty parts.
pub fn split_csv(value: Option<&str>) -> Vec<String> {
    value
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern(" react "), "%react%");
        assert_eq!(like_pattern("100%_done"), "%100\\%\\_done%");
    }

    #[test]
    fn test_split_csv() {
        assert_eq!(split_csv(Some("rust, go ,,solidity")), vec!["rust", "go", "solidity"]);
        assert!(split_csv(None).is_empty());
        assert!(split_csv(Some(" , ")).is_empty());
    }

    #[test]
    fn test_search_filters_sql() {
        let search = UserSearch {
            text: Some("rust".to_string()),
            skills: vec!["rust".to_string()],
            location: Some("berlin".to_string()),
            experience_level: Some(ExperienceLevel::Senior),
        };
        let mut builder = QueryBuilder::<Postgres>::new("SELECT * FROM users");
        push_search_filters(&mut builder, &search);
        let sql = builder.sql();
        assert!(sql.contains("plainto_tsquery('english', $1)"));
        assert!(sql.contains("unnest($2::text[])"));
        assert!(sql.contains("location ILIKE $3"));
        assert!(sql.contains("experience_level = $4"));
    }
}
