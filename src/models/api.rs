use serde::{ Deserialize, Serialize };
use super::chat::Message;
use super::interview::{ CandidateProfile, Interview };

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    pub candidate_info: CandidateProfile,
    pub messages: Vec<Message>,
    /// Identifier returned by a previous turn. Sessions without one fall back
    /// to matching on the full candidate profile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interview_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub message: String,
    #[serde(default)]
    pub interview_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListInterviewsResponse {
    pub interviews: Vec<Interview>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GetInterviewResponse {
    pub interview: Option<Interview>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CompareInterviewsRequest {
    pub interview_ids: Vec<String>,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Serialize, Deserialize)]
pub struct ReloadResponse {
    pub success: bool,
    pub message: String,
    pub details: Option<Vec<String>>,
}
