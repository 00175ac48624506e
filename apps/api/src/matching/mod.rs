// Candidate/job matching: weighted match scores, job recommendations and
// vocabulary-based skill extraction. Pure functions only; no I/O here.

pub mod score;
pub mod skills;
