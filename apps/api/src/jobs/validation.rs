//! Request bodies for job and application endpoints, and their conversion
//! into typed drafts.
//!
//! Enum-valued fields arrive as plain strings and numbers may arrive as
//! numeric strings, so every field is checked here and failures are reported
//! per field instead of as a single deserialization error.

use serde::Deserialize;
use serde_json::Value;
use validator::Validate;

use crate::errors::AppError;
use crate::models::job::{
    ApplicationStatus, BlockchainNetwork, Currency, JobDuration, JobRow, JobStatus, JobType,
    PaymentMethod,
};
use crate::models::user::ExperienceLevel;
use crate::validation::{
    as_number, clean_string_list, is_tx_hash, parse_label, FieldErrors,
};

const TITLE_MESSAGE: &str = "Title must be between 5 and 200 characters";
const DESCRIPTION_MESSAGE: &str = "Description must be between 20 and 5000 characters";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetInput {
    pub min: Option<Value>,
    pub max: Option<Value>,
    pub currency: Option<String>,
}

/// Body of `POST /api/jobs` and `PUT /api/jobs/:id`. On update every field
/// is optional; on create the required ones are enforced by
/// [`JobInput::into_draft`].
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub skills: Option<Vec<String>>,
    pub experience_level: Option<String>,
    pub job_type: Option<String>,
    pub location: Option<String>,
    pub remote: Option<bool>,
    pub budget: Option<BudgetInput>,
    pub duration: Option<String>,
    pub status: Option<String>,
    pub payment_method: Option<String>,
    pub blockchain_network: Option<String>,
    pub payment_transaction_hash: Option<String>,
    pub tags: Option<Vec<String>>,
    pub requirements: Option<Vec<String>>,
    pub benefits: Option<Vec<String>>,
}

/// A fully validated new job.
#[derive(Debug, Clone)]
pub struct JobDraft {
    pub title: String,
    pub description: String,
    pub skills: Vec<String>,
    pub experience_level: ExperienceLevel,
    pub job_type: JobType,
    pub location: String,
    pub remote: bool,
    pub budget_min: f64,
    pub budget_max: f64,
    pub budget_currency: Currency,
    pub duration: JobDuration,
    pub payment_method: PaymentMethod,
    pub blockchain_network: BlockchainNetwork,
    pub payment_transaction_hash: Option<String>,
    pub tags: Vec<String>,
    pub requirements: Vec<String>,
    pub benefits: Vec<String>,
}

/// A validated partial update. `None` leaves the column unchanged.
#[derive(Debug, Default, Validate)]
pub struct JobPatch {
    #[validate(length(min = 5, max = 200, message = "Title must be between 5 and 200 characters"))]
    pub title: Option<String>,
    #[validate(length(
        min = 20,
        max = 5000,
        message = "Description must be between 20 and 5000 characters"
    ))]
    pub description: Option<String>,
    #[validate(length(min = 1, message = "At least one skill is required"))]
    pub skills: Option<Vec<String>>,
    pub experience_level: Option<ExperienceLevel>,
    pub job_type: Option<JobType>,
    #[validate(length(min = 1, message = "Location is required"))]
    pub location: Option<String>,
    pub remote: Option<bool>,
    pub budget_min: Option<f64>,
    pub budget_max: Option<f64>,
    pub budget_currency: Option<Currency>,
    pub duration: Option<JobDuration>,
    pub status: Option<JobStatus>,
    pub payment_method: Option<PaymentMethod>,
    pub blockchain_network: Option<BlockchainNetwork>,
    pub tags: Option<Vec<String>>,
    pub requirements: Option<Vec<String>>,
    pub benefits: Option<Vec<String>>,
}

/// Parses an optional label, recording `message` if it is present but unknown.
fn label<T: serde::de::DeserializeOwned>(
    errors: &mut FieldErrors,
    value: &Option<String>,
    field: &str,
    message: &str,
) -> Option<T> {
    let raw = value.as_deref()?;
    let parsed = parse_label(raw);
    errors.check(parsed.is_some(), field, message);
    parsed
}

fn number(errors: &mut FieldErrors, value: &Option<Value>, field: &str, message: &str) -> Option<f64> {
    let raw = value.as_ref()?;
    let parsed = as_number(raw);
    errors.check(parsed.is_some(), field, message);
    parsed
}

/// Field checks shared by create and update. Each check only runs when the
/// field is present.
fn check_fields(input: &JobInput, errors: &mut FieldErrors) -> JobPatch {
    if let Some(hash) = &input.payment_transaction_hash {
        errors.check(
            is_tx_hash(hash.trim()),
            "paymentTransactionHash",
            "Invalid transaction hash",
        );
    }

    let budget = input.budget.as_ref();
    let patch = JobPatch {
        title: input.title.as_ref().map(|t| t.trim().to_string()),
        description: input.description.as_ref().map(|d| d.trim().to_string()),
        skills: input.skills.as_ref().map(|s| clean_string_list(s)),
        experience_level: label(
            errors,
            &input.experience_level,
            "experienceLevel",
            "Invalid experience level",
        ),
        job_type: label(errors, &input.job_type, "jobType", "Invalid job type"),
        location: input.location.as_ref().map(|l| l.trim().to_string()),
        remote: input.remote,
        budget_min: budget.and_then(|b| {
            number(errors, &b.min, "budget.min", "Minimum budget must be a number")
        }),
        budget_max: budget.and_then(|b| {
            number(errors, &b.max, "budget.max", "Maximum budget must be a number")
        }),
        budget_currency: budget
            .and_then(|b| label(errors, &b.currency, "budget.currency", "Invalid currency")),
        duration: label(errors, &input.duration, "duration", "Invalid duration"),
        status: label(errors, &input.status, "status", "Invalid status"),
        payment_method: label(
            errors,
            &input.payment_method,
            "paymentMethod",
            "Invalid payment method",
        ),
        blockchain_network: label(
            errors,
            &input.blockchain_network,
            "blockchainNetwork",
            "Invalid blockchain network",
        ),
        tags: input.tags.as_ref().map(|t| clean_string_list(t)),
        requirements: input.requirements.as_ref().map(|r| clean_string_list(r)),
        benefits: input.benefits.as_ref().map(|b| clean_string_list(b)),
    };
    if let Err(failures) = patch.validate() {
        errors.record(&failures);
    }
    patch
}

impl JobInput {
    /// Validates a create request. `budget.min > budget.max` is accepted;
    /// `budget.currency` is required.
    pub fn into_draft(self) -> Result<JobDraft, AppError> {
        let mut errors = FieldErrors::new();
        errors.check(self.title.is_some(), "title", TITLE_MESSAGE);
        errors.check(self.description.is_some(), "description", DESCRIPTION_MESSAGE);
        errors.check(self.skills.is_some(), "skills", "At least one skill is required");
        errors.check(
            self.experience_level.is_some(),
            "experienceLevel",
            "Invalid experience level",
        );
        errors.check(self.job_type.is_some(), "jobType", "Invalid job type");
        errors.check(self.location.is_some(), "location", "Location is required");
        let budget = self.budget.as_ref();
        errors.check(
            budget.map(|b| b.min.is_some()).unwrap_or(false),
            "budget.min",
            "Minimum budget must be a number",
        );
        errors.check(
            budget.map(|b| b.max.is_some()).unwrap_or(false),
            "budget.max",
            "Maximum budget must be a number",
        );
        errors.check(
            budget.map(|b| b.currency.is_some()).unwrap_or(false),
            "budget.currency",
            "Invalid currency",
        );

        let patch = check_fields(&self, &mut errors);
        errors.into_result()?;

        match patch {
            JobPatch {
                title: Some(title),
                description: Some(description),
                skills: Some(skills),
                experience_level: Some(experience_level),
                job_type: Some(job_type),
                location: Some(location),
                budget_min: Some(budget_min),
                budget_max: Some(budget_max),
                budget_currency: Some(budget_currency),
                remote,
                duration,
                payment_method,
                blockchain_network,
                tags,
                requirements,
                benefits,
                status: _,
            } => Ok(JobDraft {
                title,
                description,
                skills,
                experience_level,
                job_type,
                location,
                remote: remote.unwrap_or(false),
                budget_min,
                budget_max,
                budget_currency,
                duration: duration.unwrap_or_default(),
                payment_method: payment_method.unwrap_or_default(),
                blockchain_network: blockchain_network.unwrap_or_default(),
                payment_transaction_hash: self
                    .payment_transaction_hash
                    .map(|h| h.trim().to_lowercase()),
                tags: tags.unwrap_or_default(),
                requirements: requirements.unwrap_or_default(),
                benefits: benefits.unwrap_or_default(),
            }),
            _ => Err(AppError::BadRequest("Incomplete job posting".to_string())),
        }
    }

    /// Validates an update request.
    pub fn into_patch(self) -> Result<JobPatch, AppError> {
        let mut errors = FieldErrors::new();
        let patch = check_fields(&self, &mut errors);
        errors.into_result()?;
        Ok(patch)
    }
}

impl JobPatch {
    pub fn apply(self, job: &mut JobRow) {
        if let Some(v) = self.title {
            job.title = v;
        }
        if let Some(v) = self.description {
            job.description = v;
        }
        if let Some(v) = self.skills {
            job.skills = v;
        }
        if let Some(v) = self.experience_level {
            job.experience_level = v;
        }
        if let Some(v) = self.job_type {
            job.job_type = v;
        }
        if let Some(v) = self.location {
            job.location = v;
        }
        if let Some(v) = self.remote {
            job.remote = v;
        }
        if let Some(v) = self.budget_min {
            job.budget_min = v;
        }
        if let Some(v) = self.budget_max {
            job.budget_max = v;
        }
        if let Some(v) = self.budget_currency {
            job.budget_currency = v;
        }
        if let Some(v) = self.duration {
            job.duration = v;
        }
        if let Some(v) = self.status {
            job.status = v;
        }
        if let Some(v) = self.payment_method {
            job.payment_method = v;
        }
        if let Some(v) = self.blockchain_network {
            job.blockchain_network = v;
        }
        if let Some(v) = self.tags {
            job.tags = v;
        }
        if let Some(v) = self.requirements {
            job.requirements = v;
        }
        if let Some(v) = self.benefits {
            job.benefits = v;
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyInput {
    pub cover_letter: Option<String>,
    pub proposed_budget: Option<Value>,
    pub estimated_duration: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Validate)]
pub struct ApplicationDraft {
    #[validate(length(
        min = 10,
        max = 2000,
        message = "Cover letter must be between 10 and 2000 characters"
    ))]
    pub cover_letter: String,
    pub proposed_budget: f64,
    #[validate(length(min = 1, message = "Estimated duration is required"))]
    pub estimated_duration: String,
}

impl ApplyInput {
    pub fn into_draft(self) -> Result<ApplicationDraft, AppError> {
        let proposed_budget = self.proposed_budget.as_ref().and_then(as_number);
        let draft = ApplicationDraft {
            cover_letter: self.cover_letter.unwrap_or_default().trim().to_string(),
            proposed_budget: proposed_budget.unwrap_or_default(),
            estimated_duration: self.estimated_duration.unwrap_or_default().trim().to_string(),
        };
        let mut errors = FieldErrors::validated(&draft);
        errors.check(
            proposed_budget.is_some(),
            "proposedBudget",
            "Proposed budget must be a number",
        );
        errors.into_result()?;
        Ok(draft)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusInput {
    pub status: Option<String>,
}

impl StatusInput {
    pub fn parse(&self) -> Result<ApplicationStatus, AppError> {
        self.status
            .as_deref()
            .and_then(parse_label)
            .ok_or_else(|| AppError::invalid("status", "Invalid status"))
    }
}
