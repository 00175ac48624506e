use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::auth::jwt::issue_token;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::wallet::recover_personal_signer;
use crate::auth::AuthUser;
use crate::db::is_unique_violation;
use crate::errors::AppError;
use crate::models::user::{AccountView, ExperienceLevel, UserRow};
use crate::state::AppState;
use crate::users::queries::{self, NewUser, EMAIL_CONSTRAINT, WALLET_CONSTRAINT};
use crate::validation::{
    clean_string_list, is_eth_address, normalize_email, parse_label, AppJson, FieldErrors,
};

const EMAIL_TAKEN: &str = "User already exists with this email";
const WALLET_TAKEN: &str = "This wallet is already connected to another account";
const INVALID_CREDENTIALS: &str = "Invalid credentials";

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterRequest {
    #[validate(length(min = 2, message = "Name must be at least 2 characters long"))]
    pub name: String,
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters long"))]
    pub password: String,
    #[validate(must_match(
        other = "password",
        message = "Password confirmation does not match password"
    ))]
    pub confirm_password: String,
    #[validate(length(max = 1000, message = "Bio must be less than 1000 characters"))]
    pub bio: Option<String>,
    #[validate(url(message = "Please provide a valid LinkedIn URL"))]
    pub linkedin_url: Option<String>,
    pub skills: Vec<String>,
    pub experience_level: Option<String>,
    pub location: Option<String>,
    pub remote: bool,
    pub wallet_address: Option<String>,
}

impl RegisterRequest {
    /// Trims text fields and lowercases the email. Blank optional fields
    /// count as absent.
    fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.email = normalize_email(&self.email);
        for field in [
            &mut self.bio,
            &mut self.linkedin_url,
            &mut self.experience_level,
            &mut self.location,
            &mut self.wallet_address,
        ] {
            *field = field
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string);
        }
        self
    }

    fn check(&self) -> Result<(), AppError> {
        let mut errors = FieldErrors::validated(self);
        if let Some(level) = &self.experience_level {
            errors.check(
                parse_label::<ExperienceLevel>(level).is_some(),
                "experienceLevel",
                "Invalid experience level",
            );
        }
        if let Some(wallet) = &self.wallet_address {
            errors.check(
                is_eth_address(wallet),
                "walletAddress",
                "Please provide a valid wallet address",
            );
        }
        errors.into_result()
    }
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub message: &'static str,
    pub token: String,
    pub user: AccountView,
}

fn token_for(state: &AppState, user_id: Uuid) -> Result<String, AppError> {
    issue_token(user_id, &state.config.jwt_secret, state.config.jwt_expiry_days)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to sign token: {e}")))
}

fn auth_response(
    state: &AppState,
    message: &'static str,
    user: &UserRow,
) -> Result<AuthResponse, AppError> {
    Ok(AuthResponse {
        message,
        token: token_for(state, user.id)?,
        user: user.account_view(),
    })
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    AppJson(req): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let req = req.normalized();
    req.check()?;

    let email = &req.email;
    if queries::find_by_email(&state.db, email).await?.is_some() {
        return Err(AppError::BadRequest(EMAIL_TAKEN.to_string()));
    }

    let password_hash = hash_password(req.password.clone()).await?;
    let name = req.name.as_str();
    let bio = req.bio.as_deref();
    let location = req.location.as_deref();
    let skills = clean_string_list(&req.skills);
    let wallet = req.wallet_address.as_deref().map(str::to_lowercase);
    let experience_level = req
        .experience_level
        .as_deref()
        .and_then(parse_label)
        .unwrap_or(ExperienceLevel::Entry);
    let profile_completed = bio.is_some() && !skills.is_empty() && location.is_some();

    let inserted = queries::insert_user(
        &state.db,
        NewUser {
            name,
            email,
            password_hash: &password_hash,
            bio,
            linkedin_url: req.linkedin_url.as_deref(),
            skills: &skills,
            experience_level,
            location,
            remote: req.remote,
            wallet_address: wallet.as_deref(),
            profile_completed,
        },
    )
    .await;

    let user = match inserted {
        Ok(user) => user,
        Err(e) if is_unique_violation(&e, EMAIL_CONSTRAINT) => {
            return Err(AppError::BadRequest(EMAIL_TAKEN.to_string()))
        }
        Err(e) if is_unique_violation(&e, WALLET_CONSTRAINT) => {
            return Err(AppError::BadRequest(WALLET_TAKEN.to_string()))
        }
        Err(e) => return Err(e.into()),
    };

    info!(user_id = %user.id, "User registered");
    Ok((
        StatusCode::CREATED,
        Json(auth_response(&state, "User registered successfully", &user)?),
    ))
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct LoginRequest {
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let req = LoginRequest {
        email: normalize_email(&req.email),
        ..req
    };
    FieldErrors::validated(&req).into_result()?;

    let user = queries::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| AppError::BadRequest(INVALID_CREDENTIALS.to_string()))?;

    if !verify_password(req.password, user.password_hash.clone()).await? {
        warn!(user_id = %user.id, "Failed login attempt");
        return Err(AppError::BadRequest(INVALID_CREDENTIALS.to_string()));
    }

    Ok(Json(auth_response(&state, "Login successful", &user)?))
}

#[derive(Serialize)]
pub struct MeResponse {
    pub user: AccountView,
}

/// GET /api/auth/me
pub async fn me(AuthUser(user): AuthUser) -> Json<MeResponse> {
    Json(MeResponse {
        user: user.account_view(),
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WalletLoginRequest {
    pub wallet_address: String,
    pub signature: String,
    pub message: String,
}

/// POST /api/auth/wallet-login
pub async fn wallet_login(
    State(state): State<AppState>,
    AppJson(req): AppJson<WalletLoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let mut errors = FieldErrors::new();
    errors.check(
        is_eth_address(req.wallet_address.trim()),
        "walletAddress",
        "Please provide a valid wallet address",
    );
    errors.check(!req.signature.trim().is_empty(), "signature", "Signature is required");
    errors.check(!req.message.is_empty(), "message", "Message is required");
    errors.into_result()?;

    let wallet = req.wallet_address.trim().to_lowercase();
    let signer = recover_personal_signer(&req.message, &req.signature).map_err(|e| {
        warn!("Wallet login with unusable signature: {e}");
        AppError::BadRequest("Invalid wallet signature".to_string())
    })?;
    if signer != wallet {
        warn!(%wallet, %signer, "Wallet signature does not match address");
        return Err(AppError::BadRequest("Invalid wallet signature".to_string()));
    }

    let user = queries::find_by_wallet(&state.db, &wallet)
        .await?
        .ok_or_else(|| AppError::BadRequest("No user found with this wallet address".to_string()))?;

    Ok(Json(auth_response(&state, "Wallet login successful", &user)?))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectWalletRequest {
    pub wallet_address: String,
}

#[derive(Serialize)]
pub struct ConnectWalletResponse {
    pub message: &'static str,
    pub user: AccountView,
}

/// POST /api/auth/connect-wallet
pub async fn connect_wallet(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppJson(req): AppJson<ConnectWalletRequest>,
) -> Result<Json<ConnectWalletResponse>, AppError> {
    let wallet = req.wallet_address.trim().to_lowercase();
    if !is_eth_address(&wallet) {
        return Err(AppError::invalid(
            "walletAddress",
            "Please provide a valid wallet address",
        ));
    }

    if let Some(owner) = queries::find_by_wallet(&state.db, &wallet).await? {
        if owner.id != user.id {
            return Err(AppError::BadRequest(WALLET_TAKEN.to_string()));
        }
    }

    let user = match queries::set_wallet(&state.db, user.id, &wallet).await {
        Ok(user) => user,
        Err(e) if is_unique_violation(&e, WALLET_CONSTRAINT) => {
            return Err(AppError::BadRequest(WALLET_TAKEN.to_string()))
        }
        Err(e) => return Err(e.into()),
    };

    info!(user_id = %user.id, %wallet, "Wallet connected");
    Ok(Json(ConnectWalletResponse {
        message: "Wallet connected successfully",
        user: user.account_view(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_request() -> RegisterRequest {
        RegisterRequest {
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            password: "hunter22".to_string(),
            confirm_password: "hunter22".to_string(),
            ..Default::default()
        }
    }

    fn failed_fields(req: RegisterRequest) -> Vec<String> {
        match req.normalized().check() {
            Ok(()) => vec![],
            Err(AppError::InvalidFields(errors)) => errors.into_iter().map(|e| e.field).collect(),
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_valid_registration_passes() {
        assert!(failed_fields(valid_request()).is_empty());
    }

    #[test]
    fn test_password_confirmation_must_match() {
        let req = RegisterRequest {
            confirm_password: "hunter23".to_string(),
            ..valid_request()
        };
        assert_eq!(failed_fields(req), vec!["confirmPassword"]);
    }

    #[test]
    fn test_registration_collects_all_failures() {
        let req = RegisterRequest {
            name: " A ".to_string(),
            email: "nope".to_string(),
            password: "123".to_string(),
            confirm_password: "123".to_string(),
            experience_level: Some("guru".to_string()),
            wallet_address: Some("0x123".to_string()),
            ..Default::default()
        };
        assert_eq!(
            failed_fields(req),
            vec!["email", "name", "password", "experienceLevel", "walletAddress"]
        );
    }

    #[test]
    fn test_blank_optional_fields_are_ignored() {
        let req = RegisterRequest {
            linkedin_url: Some("".to_string()),
            experience_level: Some("  ".to_string()),
            wallet_address: Some("".to_string()),
            ..valid_request()
        };
        assert!(failed_fields(req).is_empty());
    }

    #[test]
    fn test_normalized_trims_and_lowercases() {
        let req = RegisterRequest {
            name: "  Alice  ".to_string(),
            email: " Alice@Example.COM ".to_string(),
            bio: Some("   ".to_string()),
            location: Some(" Lisbon ".to_string()),
            ..valid_request()
        }
        .normalized();
        assert_eq!(req.name, "Alice");
        assert_eq!(req.email, "alice@example.com");
        assert_eq!(req.bio, None);
        assert_eq!(req.location.as_deref(), Some("Lisbon"));
    }

    #[test]
    fn test_bad_linkedin_url_is_rejected() {
        let req = RegisterRequest {
            linkedin_url: Some("linkedin.com/in/alice".to_string()),
            ..valid_request()
        };
        assert_eq!(failed_fields(req), vec!["linkedinUrl"]);
    }

    #[test]
    fn test_login_requires_email_and_password() {
        let req = LoginRequest {
            email: "nope".to_string(),
            password: String::new(),
        };
        match FieldErrors::validated(&req).into_result() {
            Err(AppError::InvalidFields(errors)) => {
                let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
                assert_eq!(fields, vec!["email", "password"]);
                assert_eq!(errors[1].message, "Password is required");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
