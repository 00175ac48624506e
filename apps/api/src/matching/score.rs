//! Match scoring: a weighted 0-100 compatibility score between a job posting
//! and a candidate profile.
//!
//! Components:
//! - skills (0.5): share of required skills covered by a candidate skill,
//!   where "covered" means either string contains the other, ignoring case
//! - experience (0.3): distance on the entry..lead ladder; under-qualified
//!   candidates lose 20 points per step, over-qualified ones 10
//! - location (0.2): needs a location on both sides; 100 when they match,
//!   80 when they differ but both sides allow remote work, otherwise 0

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::job::{JobRow, JobStatus};
use crate::models::user::{ExperienceLevel, UserRow};

pub const SKILL_WEIGHT: f64 = 0.5;
pub const EXPERIENCE_WEIGHT: f64 = 0.3;
pub const LOCATION_WEIGHT: f64 = 0.2;

/// Jobs must score strictly above this to be recommended.
pub const RECOMMENDATION_THRESHOLD: u32 = 30;

const SAME_LOCATION: f64 = 100.0;
const BOTH_REMOTE: f64 = 80.0;

// ────────────────────────────────────────────────────────────────────────────
// Inputs / outputs
// ────────────────────────────────────────────────────────────────────────────

/// The parts of a job posting the score looks at.
#[derive(Debug, Clone, Copy)]
pub struct JobCriteria<'a> {
    pub skills: &'a [String],
    pub experience_level: Option<ExperienceLevel>,
    pub location: Option<&'a str>,
    pub remote: bool,
}

/// The parts of a candidate profile the score looks at.
#[derive(Debug, Clone, Copy)]
pub struct CandidateProfile<'a> {
    pub skills: &'a [String],
    pub experience_level: Option<ExperienceLevel>,
    pub location: Option<&'a str>,
    pub remote: bool,
}

impl<'a> From<&'a JobRow> for JobCriteria<'a> {
    fn from(job: &'a JobRow) -> Self {
        JobCriteria {
            skills: &job.skills,
            experience_level: Some(job.experience_level),
            location: Some(job.location.as_str()),
            remote: job.remote,
        }
    }
}

impl<'a> From<&'a UserRow> for CandidateProfile<'a> {
    fn from(user: &'a UserRow) -> Self {
        CandidateProfile {
            skills: &user.skills,
            experience_level: Some(user.experience_level),
            location: user.location.as_deref(),
            remote: user.remote,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchBreakdown {
    pub score: u32,
    pub skill_match: f64,
    pub experience_match: f64,
    pub location_match: f64,
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Scoring
// ────────────────────────────────────────────────────────────────────────────

/// Full per-component breakdown of the match between `job` and `candidate`.
pub fn compute_match(job: &JobCriteria<'_>, candidate: &CandidateProfile<'_>) -> MatchBreakdown {
    let (matched_skills, missing_skills) = partition_skills(job.skills, candidate.skills);
    let skill_match =
        matched_skills.len() as f64 / job.skills.len().max(1) as f64 * 100.0;
    let experience_match = experience_match(job.experience_level, candidate.experience_level);
    let location_match = location_match(job, candidate);

    let weighted = skill_match * SKILL_WEIGHT
        + experience_match * EXPERIENCE_WEIGHT
        + location_match * LOCATION_WEIGHT;

    MatchBreakdown {
        score: weighted.round().clamp(0.0, 100.0) as u32,
        skill_match,
        experience_match,
        location_match,
        matched_skills,
        missing_skills,
    }
}

/// Integer 0–100 compatibility score.
pub fn match_score(job: &JobCriteria<'_>, candidate: &CandidateProfile<'_>) -> u32 {
    compute_match(job, candidate).score
}

/// Splits required skills into those some candidate skill covers and those
/// none does. Blank candidate skills never cover anything.
fn partition_skills(required: &[String], offered: &[String]) -> (Vec<String>, Vec<String>) {
    let offered: Vec<String> = offered
        .iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();

    required.iter().cloned().partition(|skill| {
        let skill_lower = skill.to_lowercase();
        offered
            .iter()
            .any(|own| own.contains(&skill_lower) || skill_lower.contains(own.as_str()))
    })
}

fn level_index(level: Option<ExperienceLevel>) -> i32 {
    level.map(ExperienceLevel::index).unwrap_or(-1)
}

fn experience_match(job: Option<ExperienceLevel>, candidate: Option<ExperienceLevel>) -> f64 {
    let job_level = level_index(job);
    let candidate_level = level_index(candidate);
    let distance = (job_level - candidate_level).abs();

    let raw = if job_level >= candidate_level {
        100 - distance * 20
    } else {
        (100 - distance * 10).max(0)
    };
    raw.clamp(0, 100) as f64
}

fn location_match(job: &JobCriteria<'_>, candidate: &CandidateProfile<'_>) -> f64 {
    let job_location = job.location.map(str::trim).filter(|l| !l.is_empty());
    let candidate_location = candidate.location.map(str::trim).filter(|l| !l.is_empty());

    let (Some(a), Some(b)) = (job_location, candidate_location) else {
        return 0.0;
    };
    if a.to_lowercase() == b.to_lowercase() {
        SAME_LOCATION
    } else if job.remote && candidate.remote {
        BOTH_REMOTE
    } else {
        0.0
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Recommendations
// ────────────────────────────────────────────────────────────────────────────

/// Scores every active job against `candidate`, keeps those above
/// [`RECOMMENDATION_THRESHOLD`], and orders them by score then newest first.
pub fn recommend<'a>(
    jobs: &'a [JobRow],
    candidate: &CandidateProfile<'_>,
    limit: usize,
) -> Vec<(&'a JobRow, u32)> {
    let mut scored: Vec<(&JobRow, u32)> = jobs
        .iter()
        .filter(|job| job.status == JobStatus::Active)
        .map(|job| (job, match_score(&JobCriteria::from(job), candidate)))
        .filter(|(_, score)| *score > RECOMMENDATION_THRESHOLD)
        .collect();

    scored.sort_by(|(a, score_a), (b, score_b)| {
        score_b
            .cmp(score_a)
            .then_with(|| newest_first(a.created_at, b.created_at))
    });
    scored.truncate(limit);
    scored
}

fn newest_first(a: DateTime<Utc>, b: DateTime<Utc>) -> std::cmp::Ordering {
    b.cmp(&a)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
