use serde::{ Deserialize, Serialize };
use super::chat::Message;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub name: String,
    pub experience_years: u32,
    pub tech_stack: Vec<String>,
    pub position: String,
}

/// Persisted record of one candidate's conversation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Interview {
    pub id: String,
    pub candidate_info: CandidateProfile,
    pub messages: Vec<Message>,
    /// RFC 3339 instant of the last successful turn.
    pub timestamp: String,
    #[serde(default)]
    pub evaluation_scores: Option<ScoreSet>,
}

#[derive(Deserialize)]
struct RawScoreSet {
    technical_depth: f64,
    communication: f64,
    problem_solving: f64,
    experience: f64,
}

impl From<RawScoreSet> for ScoreSet {
    fn from(raw: RawScoreSet) -> Self {
        ScoreSet::new(raw.technical_depth, raw.communication, raw.problem_solving, raw.experience)
    }
}

/// Normalized evaluation of a candidate's answers. Every dimension is kept in
/// `[0.0, 1.0]`, including values read back from the store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawScoreSet")]
pub struct ScoreSet {
    pub technical_depth: f64,
    pub communication: f64,
    pub problem_solving: f64,
    pub experience: f64,
}

fn unit(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}

impl ScoreSet {
    pub fn new(
        technical_depth: f64,
        communication: f64,
        problem_solving: f64,
        experience: f64
    ) -> Self {
        Self {
            technical_depth: unit(technical_depth),
            communication: unit(communication),
            problem_solving: unit(problem_solving),
            experience: unit(experience),
        }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn values(&self) -> [f64; 4] {
        [self.technical_depth, self.communication, self.problem_solving, self.experience]
    }

    pub fn mean(&self) -> f64 {
        self.values().iter().sum::<f64>() / 4.0
    }
}
