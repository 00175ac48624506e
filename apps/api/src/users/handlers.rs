use axum::{
    extract::State,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::user::{AccountView, ExperienceLevel, PublicProfile, UserStats};
use crate::pagination::{PageParams, Pagination};
use crate::state::AppState;
use crate::users::profile::{add_skill, is_profile_complete, remove_skill, ProfileUpdate};
use crate::users::queries::{self, split_csv, UserSearch};
use crate::validation::{AppJson, AppPath, AppQuery};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSearchQuery {
    pub q: Option<String>,
    pub skills: Option<String>,
    pub location: Option<String>,
    pub experience_level: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl UserSearchQuery {
    fn filters(&self) -> Result<UserSearch, AppError> {
        let experience_level = match self.experience_level.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(label) => Some(
                ExperienceLevel::parse(label)
                    .ok_or_else(|| AppError::invalid("experienceLevel", "Invalid experience level"))?,
            ),
        };
        let non_blank = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        Ok(UserSearch {
            text: non_blank(&self.q),
            skills: split_csv(self.skills.as_deref()),
            location: non_blank(&self.location),
            experience_level,
        })
    }
}

#[derive(Serialize)]
pub struct UserSearchResponse {
    pub users: Vec<PublicProfile>,
    pub pagination: Pagination,
}

/// GET /api/users/search
pub async fn search(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<UserSearchQuery>,
) -> Result<Json<UserSearchResponse>, AppError> {
    let filters = query.filters()?;
    let page = PageParams {
        page: query.page,
        limit: query.limit,
    };
    let (users, total) =
        queries::search_users(&state.db, &filters, page.limit(), page.offset()).await?;
    Ok(Json(UserSearchResponse {
        users: users.iter().map(|u| u.public_profile()).collect(),
        pagination: page.envelope(total),
    }))
}

#[derive(Serialize)]
pub struct PublicProfileResponse {
    pub user: PublicProfile,
}

/// GET /api/users/:id
pub async fn get_by_id(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<PublicProfileResponse>, AppError> {
    let user = queries::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(Json(PublicProfileResponse {
        user: user.public_profile(),
    }))
}

#[derive(Serialize)]
pub struct ProfileResponse {
    pub message: &'static str,
    pub user: AccountView,
}

/// PUT /api/users/profile and PUT /api/auth/profile
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(mut user): AuthUser,
    AppJson(update): AppJson<ProfileUpdate>,
) -> Result<Json<ProfileResponse>, AppError> {
    let update = update.normalized();
    update.check()?;
    update.apply(&mut user);
    let user = queries::save_profile(&state.db, &user).await?;
    tracing::info!(user_id = %user.id, completed = user.profile_completed, "Profile updated");
    Ok(Json(ProfileResponse {
        message: "Profile updated successfully",
        user: user.account_view(),
    }))
}

#[derive(Deserialize)]
pub struct AddSkillRequest {
    #[serde(default)]
    pub skill: String,
}

#[derive(Serialize)]
pub struct SkillsResponse {
    pub message: &'static str,
    pub skills: Vec<String>,
}

/// POST /api/users/skills
pub async fn add_user_skill(
    State(state): State<AppState>,
    AuthUser(mut user): AuthUser,
    AppJson(req): AppJson<AddSkillRequest>,
) -> Result<Json<SkillsResponse>, AppError> {
    if req.skill.trim().is_empty() {
        return Err(AppError::invalid("skill", "Skill cannot be empty"));
    }
    if add_skill(&mut user.skills, &req.skill) {
        user.profile_completed = is_profile_complete(&user);
        user = queries::save_profile(&state.db, &user).await?;
    }
    Ok(Json(SkillsResponse {
        message: "Skill added successfully",
        skills: user.skills,
    }))
}

/// DELETE /api/users/skills/:skill
pub async fn remove_user_skill(
    State(state): State<AppState>,
    AuthUser(mut user): AuthUser,
    AppPath(skill): AppPath<String>,
) -> Result<Json<SkillsResponse>, AppError> {
    if remove_skill(&mut user.skills, &skill) {
        user.profile_completed = is_profile_complete(&user);
        user = queries::save_profile(&state.db, &user).await?;
    }
    Ok(Json(SkillsResponse {
        message: "Skill removed successfully",
        skills: user.skills,
    }))
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub stats: UserStats,
}

/// GET /api/users/stats
pub async fn stats(AuthUser(user): AuthUser) -> Json<StatsResponse> {
    Json(StatsResponse {
        stats: user.stats(),
    })
}
