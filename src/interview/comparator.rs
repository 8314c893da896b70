use serde::{ Deserialize, Serialize };
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use crate::interview::evaluator::evaluate;
use crate::models::interview::{ Interview, ScoreSet };

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Recommendation {
    Strong,
    Good,
    Junior,
}

impl Recommendation {
    pub fn from_mean(mean: f64) -> Self {
        if mean >= 0.8 {
            Recommendation::Strong
        } else if mean >= 0.6 {
            Recommendation::Good
        } else {
            Recommendation::Junior
        }
    }

    pub fn for_scores(scores: &ScoreSet) -> Self {
        Self::from_mean(scores.mean())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::Strong =>
                "Strong candidate with excellent technical skills and communication",
            Recommendation::Good =>
                "Good candidate with solid foundation, some areas for improvement",
            Recommendation::Junior => "May need more experience, consider for junior positions",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Comparison {
    pub comparison: BTreeMap<String, ScoreSet>,
    pub recommendations: BTreeMap<String, String>,
    /// Found interview ids, best mean score first.
    pub ranking: Vec<String>,
}

/// Cached scores when the record has them, otherwise a fresh evaluation.
pub fn scores_for(interview: &Interview) -> ScoreSet {
    interview.evaluation_scores.unwrap_or_else(|| evaluate(&interview.messages))
}

/// Scores and recommends each requested interview. Ids with no stored
/// interview are left out of the result.
pub fn compare(interviews: &BTreeMap<String, Interview>, ids: &[String]) -> Comparison {
    let mut result = Comparison::default();

    for id in ids {
        let Some(interview) = interviews.get(id) else {
            continue;
        };
        if result.comparison.contains_key(id) {
            continue;
        }
        let scores = scores_for(interview);
        result.recommendations.insert(id.clone(), Recommendation::for_scores(&scores).to_string());
        result.comparison.insert(id.clone(), scores);
    }

    let mut ranked: Vec<(&String, f64)> = result.comparison
        .iter()
        .map(|(id, scores)| (id, scores.mean()))
        .collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal).then_with(|| a.0.cmp(b.0)));
    result.ranking = ranked
        .into_iter()
        .map(|(id, _)| id.clone())
        .collect();

    result
}
