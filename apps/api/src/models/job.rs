use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::user::ExperienceLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(type_name = "job_type", rename_all = "kebab-case")]
pub enum JobType {
    FullTime,
    PartTime,
    Contract,
    Freelance,
    Internship,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "budget_currency", rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Usd,
    Eur,
    Eth,
    Matic,
    Sol,
}

impl Currency {
    pub fn as_str(self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Eth => "ETH",
            Currency::Matic => "MATIC",
            Currency::Sol => "SOL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(type_name = "job_duration", rename_all = "kebab-case")]
pub enum JobDuration {
    #[default]
    OneTime,
    Ongoing,
    FixedTerm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "job_status", rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Active,
    Paused,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "payment_method", rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Crypto,
    Fiat,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "blockchain_network", rename_all = "lowercase")]
pub enum BlockchainNetwork {
    #[default]
    Ethereum,
    Polygon,
    Solana,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "application_status", rename_all = "lowercase")]
pub enum ApplicationStatus {
    #[default]
    Pending,
    Reviewed,
    Shortlisted,
    Hired,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    pub min: f64,
    pub max: f64,
    #[serde(default)]
    pub currency: Currency,
}

#[derive(Debug, Clone, FromRow)]
pub struct JobRow {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub employer_id: Uuid,
    pub skills: Vec<String>,
    pub experience_level: ExperienceLevel,
    pub job_type: JobType,
    pub location: String,
    pub remote: bool,
    pub budget_min: f64,
    pub budget_max: f64,
    pub budget_currency: Currency,
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
}

impl JobRow {
    pub fn budget(&self) -> Budget {
        Budget {
            min: self.budget_min,
            max: self.budget_max,
            currency: self.budget_currency,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ApplicationRow {
    pub id: Uuid,
    pub job_id: Uuid,
    pub applicant_id: Uuid,
    pub cover_letter: String,
    pub proposed_budget: f64,
    pub estimated_duration: String,
    pub status: ApplicationStatus,
    pub match_score: i32,
    pub applied_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kebab_case_enums_round_trip_labels() {
        assert_eq!(serde_json::to_string(&JobType::FullTime).unwrap(), "\"full-time\"");
        assert_eq!(serde_json::to_string(&JobDuration::FixedTerm).unwrap(), "\"fixed-term\"");
        let job_type: JobType = serde_json::from_str("\"part-time\"").unwrap();
        assert_eq!(job_type, JobType::PartTime);
    }

    #[test]
    fn test_currency_labels_are_uppercase() {
        assert_eq!(serde_json::to_string(&Currency::Matic).unwrap(), "\"MATIC\"");
        assert!(serde_json::from_str::<Currency>("\"BTC\"").is_err());
        assert_eq!(Currency::Eth.as_str(), "ETH");
    }

    #[test]
    fn test_budget_currency_defaults_to_usd() {
        let budget: Budget = serde_json::from_str(r#"{"min": 10, "max": 20}"#).unwrap();
        assert_eq!(budget.currency, Currency::Usd);
    }
}
