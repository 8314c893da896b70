use chrono::{ DateTime, TimeZone };
use std::collections::BTreeMap;
use crate::models::interview::{ CandidateProfile, Interview };

pub const INTERVIEW_ID_PREFIX: &str = "interview_";

/// Outcome of mapping an incoming turn to an interview record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    Existing(String),
    New(String),
}

impl Resolution {
    pub fn id(&self) -> &str {
        match self {
            Resolution::Existing(id) | Resolution::New(id) => id,
        }
    }

    pub fn into_id(self) -> String {
        match self {
            Resolution::Existing(id) | Resolution::New(id) => id,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, Resolution::New(_))
    }
}

/// Decides which interview a turn belongs to.
///
/// A session token naming a stored interview with the same profile wins.
/// Otherwise the first stored interview (in id order) whose profile is equal
/// field for field is reused. Failing both, a fresh id is minted from `now`.
pub fn resolve<Tz: TimeZone>(
    profile: &CandidateProfile,
    session_token: Option<&str>,
    existing: &BTreeMap<String, Interview>,
    now: &DateTime<Tz>
) -> Resolution
    where Tz::Offset: std::fmt::Display
{
    if let Some(token) = session_token {
        if let Some(interview) = existing.get(token) {
            if &interview.candidate_info == profile {
                return Resolution::Existing(interview.id.clone());
            }
        }
    }

    existing
        .values()
        .find(|interview| &interview.candidate_info == profile)
        .map(|interview| Resolution::Existing(interview.id.clone()))
        .unwrap_or_else(|| Resolution::New(new_interview_id(now, existing)))
}

/// `interview_YYYYMMDD_HHMMSS`, suffixed with `_2`, `_3`, ... while the base id
/// is already taken.
pub fn new_interview_id<Tz: TimeZone>(
    now: &DateTime<Tz>,
    existing: &BTreeMap<String, Interview>
) -> String
    where Tz::Offset: std::fmt::Display
{
    let base = format!("{}{}", INTERVIEW_ID_PREFIX, now.format("%Y%m%d_%H%M%S"));
    if !existing.contains_key(&base) {
        return base;
    }
    (2..)
        .map(|n| format!("{}_{}", base, n))
        .find(|candidate| !existing.contains_key(candidate))
        .unwrap_or(base)
}
