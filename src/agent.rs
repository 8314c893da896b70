use crate::cli::Args;
use crate::config::prompt::{ self, PromptConfig, PromptError };
use crate::history::{ initialize_transcript_store, StoreError, TranscriptStore };
use crate::interview::{ compare, evaluate, resolve, Comparison, Resolution };
use crate::llm::chat::{ new_client as new_chat_client, ChatClient, LlmError, LlmMessage, LlmRole };
use crate::llm::{ LlmConfig, LlmType };
use crate::models::api::{ ChatRequest, ChatResponse };
use crate::models::chat::{ Message, Role };
use crate::models::interview::{ CandidateProfile, Interview };

use chrono::{ Local, SecondsFormat, Utc };
use log::{ debug, error, info, warn };
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Why a turn ended with the fallback reply instead of a recorded exchange.
#[derive(Debug, thiserror::Error)]
enum TurnError {
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct InterviewAgent {
    chat_client: Arc<dyn ChatClient>,
    transcripts: TranscriptStore,
    prompt_config: RwLock<Arc<PromptConfig>>,
    prompts_path: Option<String>,
    llm_timeout: Duration,
}

/// Caller-supplied history with the interviewer mapped to `assistant` and
/// every other author to `user`, behind the rendered interviewer persona.
pub fn build_llm_context(
    config: &PromptConfig,
    profile: &CandidateProfile,
    messages: &[Message]
) -> Vec<LlmMessage> {
    let mut context = Vec::with_capacity(messages.len() + 1);
    context.push(LlmMessage::new(LlmRole::System, prompt::render_system_prompt(config, profile)));
    context.extend(
        messages.iter().map(|m| {
            let role = match m.role {
                Role::Interviewer => LlmRole::Assistant,
                Role::Candidate => LlmRole::User,
            };
            LlmMessage::new(role, m.content.clone())
        })
    );
    context
}

/// The transcript to store before the reply is appended. A stored transcript
/// is never shortened. Only the incoming messages past the longest prefix of
/// `incoming` that the stored transcript already ends with are appended, so a
/// client replaying its whole history adds nothing twice.
pub fn merge_transcript(stored: Option<&[Message]>, incoming: &[Message]) -> Vec<Message> {
    let Some(stored) = stored else {
        return incoming.to_vec();
    };
    let overlap = (0..=stored.len().min(incoming.len()))
        .rev()
        .find(|&k| stored.ends_with(&incoming[..k]))
        .unwrap_or(0);

    let mut merged = stored.to_vec();
    merged.extend_from_slice(&incoming[overlap..]);
    merged
}

impl InterviewAgent {
    fn initialize_llm_client(args: &Args) -> Result<Arc<dyn ChatClient>, Box<dyn Error + Send + Sync>> {
        let chat_llm_type: LlmType = args.chat_llm_type
            .parse()
            .map_err(|e| format!("Invalid chat LLM type: {}", e))?;
        let chat_api_key = if !args.chat_api_key.is_empty() {
            Some(args.chat_api_key.clone())
        } else {
            None
        };
        let chat_config = LlmConfig {
            llm_type: chat_llm_type,
            base_url: args.chat_base_url.clone(),
            api_key: chat_api_key,
            model: args.chat_model.clone(),
            max_tokens: args.llm_max_tokens,
            temperature: args.llm_temperature,
            top_p: args.llm_top_p,
        };
        let chat_client = new_chat_client(&chat_config)?;
        info!(
            "Chat client configured: Type={}, Model={:?}, BaseURL={:?}",
            args.chat_llm_type,
            chat_config.model.as_deref().unwrap_or("adapter default"),
            chat_client.get_base_url().as_deref().unwrap_or("adapter default")
        );
        Ok(chat_client)
    }

    pub async fn new(args: &Args) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let chat_client = Self::initialize_llm_client(args)?;
        let transcripts = initialize_transcript_store(args)?;
        let prompt_config = prompt::load_prompts_or_default(&args.prompts_path)?;

        Ok(Self {
            chat_client,
            transcripts,
            prompt_config: RwLock::new(prompt_config),
            prompts_path: Some(args.prompts_path.clone()),
            llm_timeout: Duration::from_secs(args.llm_timeout_secs),
        })
    }

    /// Assembles an agent from ready-made collaborators.
    pub fn with_components(
        chat_client: Arc<dyn ChatClient>,
        transcripts: TranscriptStore,
        prompt_config: Arc<PromptConfig>,
        llm_timeout: Duration
    ) -> Self {
        Self {
            chat_client,
            transcripts,
            prompt_config: RwLock::new(prompt_config),
            prompts_path: None,
            llm_timeout,
        }
    }

    pub fn with_prompts_path(mut self, path: impl Into<String>) -> Self {
        self.prompts_path = Some(path.into());
        self
    }

    async fn current_prompts(&self) -> Arc<PromptConfig> {
        Arc::clone(&*self.prompt_config.read().await)
    }

    async fn request_reply(&self, context: &[LlmMessage]) -> Result<String, LlmError> {
        match tokio::time::timeout(self.llm_timeout, self.chat_client.chat(context)).await {
            Ok(result) => result,
            Err(_) => Err(LlmError::Timeout(self.llm_timeout)),
        }
    }

    async fn record_turn(
        &self,
        request: &ChatRequest,
        prompts: &PromptConfig
    ) -> Result<(String, String), TurnError> {
        let existing = self.transcripts.load_interviews().await;
        let resolution = resolve(
            &request.candidate_info,
            request.interview_id.as_deref(),
            &existing,
            &Local::now()
        );
        match &resolution {
            Resolution::Existing(id) => debug!("Continuing interview {}", id),
            Resolution::New(id) => info!("Starting interview {}", id),
        }

        let context = build_llm_context(prompts, &request.candidate_info, &request.messages);
        let reply = self.request_reply(&context).await?;

        let stored = existing.get(resolution.id());
        let mut messages = merge_transcript(
            stored.map(|i| i.messages.as_slice()),
            &request.messages
        );
        let scores = evaluate(&messages);
        messages.push(Message::interviewer(reply.clone()));

        let interview = Interview {
            id: resolution.id().to_string(),
            candidate_info: stored
                .map(|i| i.candidate_info.clone())
                .unwrap_or_else(|| request.candidate_info.clone()),
            messages,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            evaluation_scores: Some(scores),
        };
        self.transcripts.save_interview(&interview).await?;

        Ok((reply, resolution.into_id()))
    }

    /// Handles one chat turn. Failures never reach the caller: they get the
    /// fallback reply, no interview id, and nothing is persisted.
    pub async fn submit_turn(&self, request: ChatRequest) -> ChatResponse {
        let prompts = self.current_prompts().await;

        match self.record_turn(&request, &prompts).await {
            Ok((message, interview_id)) =>
                ChatResponse {
                    message,
                    interview_id: Some(interview_id),
                },
            Err(e) => {
                match &e {
                    TurnError::Llm(llm) =>
                        error!("Error getting interviewer reply ({}): {}", llm.kind(), llm),
                    TurnError::Store(store) => error!("Error saving interview: {}", store),
                }
                ChatResponse {
                    message: prompts.fallback_reply.clone(),
                    interview_id: None,
                }
            }
        }
    }

    pub async fn list_interviews(&self) -> Vec<Interview> {
        self.transcripts.list_interviews().await
    }

    pub async fn get_interview(&self, interview_id: &str) -> Option<Interview> {
        self.transcripts.get_interview(interview_id).await
    }

    pub async fn compare_interviews(&self, interview_ids: &[String]) -> Comparison {
        let interviews = self.transcripts.load_interviews().await;
        let comparison = compare(&interviews, interview_ids);
        if comparison.comparison.len() < interview_ids.len() {
            debug!(
                "Compared {} of {} requested interviews",
                comparison.comparison.len(),
                interview_ids.len()
            );
        }
        comparison
    }

    /// Reloads the prompts file when it changed since it was last read.
    pub async fn reload_prompts_if_changed(&self) -> Result<bool, PromptError> {
        let Some(path) = &self.prompts_path else {
            warn!("Prompt reload requested but no prompts file is configured");
            return Ok(false);
        };

        let mut guard = self.prompt_config.write().await;
        match prompt::reload_prompts_if_changed(path, &guard)? {
            Some(new_config) => {
                *guard = new_config;
                info!("Prompts successfully reloaded from {}", path);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{ DocumentStore, MemoryDocumentStore };
    use crate::interview::evaluator;
    use async_trait::async_trait;
    use serde_json::{ json, Value as JsonValue };
    use std::sync::Mutex;

    enum Script {
        Reply(&'static str),
        Fail,
        Hang,
    }

    struct ScriptedChatClient {
        script: Script,
        seen: Mutex<Vec<Vec<LlmMessage>>>,
    }

    impl ScriptedChatClient {
        fn new(script: Script) -> Arc<Self> {
            Arc::new(Self { script, seen: Mutex::new(Vec::new()) })
        }
    }

    #[async_trait]
    impl ChatClient for ScriptedChatClient {
        async fn chat(&self, messages: &[LlmMessage]) -> Result<String, LlmError> {
            self.seen.lock().unwrap().push(messages.to_vec());
            match self.script {
                Script::Reply(text) => Ok(text.to_string()),
                Script::Fail => Err(LlmError::Status { status: 500, body: "boom".into() }),
                Script::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok("too late".to_string())
                }
            }
        }

        fn get_model(&self) -> String {
            "scripted".into()
        }

        fn get_base_url(&self) -> Option<String> {
            None
        }
    }

    fn ana() -> CandidateProfile {
        CandidateProfile {
            name: "Ana".into(),
            experience_years: 3,
            tech_stack: vec!["python".into(), "sql".into()],
            position: "Backend Engineer".into(),
        }
    }

    fn agent(client: Arc<ScriptedChatClient>) -> (InterviewAgent, Arc<MemoryDocumentStore>) {
        let backing = Arc::new(MemoryDocumentStore::new());
        let agent = InterviewAgent::with_components(
            client,
            TranscriptStore::new(backing.clone(), "interviews"),
            Arc::new(PromptConfig::default()),
            Duration::from_secs(5)
        );
        (agent, backing)
    }

    fn turn(messages: Vec<Message>) -> ChatRequest {
        ChatRequest { candidate_info: ana(), messages, interview_id: None }
    }

    #[test]
    fn context_starts_with_persona_and_maps_roles() {
        let messages = vec![
            Message::interviewer("Tell me about yourself"),
            Message::candidate("I build APIs")
        ];

        let context = build_llm_context(&PromptConfig::default(), &ana(), &messages);

        assert_eq!(context.len(), 3);
        assert_eq!(context[0].role, LlmRole::System);
        assert!(context[0].content.contains("Backend Engineer"));
        assert!(context[0].content.contains("python, sql"));
        assert_eq!(context[1], LlmMessage::new(LlmRole::Assistant, "Tell me about yourself"));
        assert_eq!(context[2], LlmMessage::new(LlmRole::User, "I build APIs"));
    }

    #[test]
    fn merge_keeps_extended_history_and_never_shrinks() {
        let stored = vec![Message::interviewer("Q1"), Message::candidate("A1")];
        let extended = vec![
            Message::interviewer("Q1"),
            Message::candidate("A1"),
            Message::interviewer("Q2"),
            Message::candidate("A2")
        ];
        assert_eq!(merge_transcript(Some(&stored), &extended), extended);

        let only_new = vec![Message::candidate("A2")];
        assert_eq!(
            merge_transcript(Some(&stored), &only_new),
            vec![Message::interviewer("Q1"), Message::candidate("A1"), Message::candidate("A2")]
        );
        assert_eq!(merge_transcript(None, &only_new), only_new);
    }

    #[test]
    fn merge_appends_only_unseen_tail_of_replayed_history() {
        let stored = vec![
            Message::interviewer("Q1"),
            Message::candidate("old answer"),
            Message::interviewer("Q1")
        ];
        let replayed = vec![Message::interviewer("Q1"), Message::candidate("api")];

        assert_eq!(
            merge_transcript(Some(&stored), &replayed),
            vec![
                Message::interviewer("Q1"),
                Message::candidate("old answer"),
                Message::interviewer("Q1"),
                Message::candidate("api")
            ]
        );
        assert_eq!(merge_transcript(Some(&stored), &[]), stored);
        assert_eq!(merge_transcript(Some(&stored), &stored[1..]), stored);
    }

    #[tokio::test]
    async fn restarted_session_with_same_profile_does_not_duplicate_history() {
        let (agent, _) = agent(ScriptedChatClient::new(Script::Reply("Q1")));

        agent.submit_turn(turn(vec![])).await;
        agent.submit_turn(
            turn(vec![Message::interviewer("Q1"), Message::candidate("old answer")])
        ).await;

        // The client starts over from an empty history for the same candidate.
        agent.submit_turn(turn(vec![])).await;
        agent.submit_turn(turn(vec![Message::interviewer("Q1"), Message::candidate("api")])).await;
        let last = agent.submit_turn(
            turn(
                vec![
                    Message::interviewer("Q1"),
                    Message::candidate("api"),
                    Message::interviewer("Q1"),
                    Message::candidate("ok")
                ]
            )
        ).await;

        let stored = agent.get_interview(&last.interview_id.unwrap()).await.unwrap();
        let api_copies = stored.messages
            .iter()
            .filter(|m| *m == &Message::candidate("api"))
            .count();
        assert_eq!(api_copies, 1);
        assert_eq!(
            stored.messages,
            vec![
                Message::interviewer("Q1"),
                Message::candidate("old answer"),
                Message::interviewer("Q1"),
                Message::interviewer("Q1"),
                Message::candidate("api"),
                Message::interviewer("Q1"),
                Message::candidate("ok"),
                Message::interviewer("Q1")
            ]
        );
        let candidate_turns: Vec<Message> = stored.messages
            .iter()
            .filter(|m| m.is_candidate())
            .cloned()
            .collect();
        assert_eq!(candidate_turns.len(), 3);
        assert_eq!(
            stored.evaluation_scores.unwrap(),
            evaluator::evaluate(&stored.messages[..stored.messages.len() - 1])
        );
    }

    #[tokio::test]
    async fn successful_turn_is_persisted_with_scores() {
        let client = ScriptedChatClient::new(Script::Reply("How did you test it?"));
        let (agent, _) = agent(client.clone());
        let answer = "I implemented a scalable API using a database and wrote automated testing for it";

        let response = agent.submit_turn(turn(vec![Message::candidate(answer)])).await;

        assert_eq!(response.message, "How did you test it?");
        let id = response.interview_id.expect("successful turn returns an id");
        assert!(id.starts_with("interview_"));

        let stored = agent.get_interview(&id).await.unwrap();
        assert_eq!(stored.candidate_info, ana());
        assert_eq!(
            stored.messages,
            vec![Message::candidate(answer), Message::interviewer("How did you test it?")]
        );
        let scores = stored.evaluation_scores.unwrap();
        assert_eq!(scores, evaluator::evaluate(&[Message::candidate(answer)]));
        assert_eq!(scores.technical_depth, 1.0);
        assert!(chrono::DateTime::parse_from_rfc3339(&stored.timestamp).is_ok());
        assert_eq!(client.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn follow_up_turn_extends_the_same_interview() {
        let (agent, _) = agent(ScriptedChatClient::new(Script::Reply("Next question")));

        let first = agent.submit_turn(turn(vec![Message::candidate("Hello")])).await;
        let second = agent.submit_turn(
            turn(
                vec![
                    Message::candidate("Hello"),
                    Message::interviewer("Next question"),
                    Message::candidate("I worked on a team")
                ]
            )
        ).await;

        assert_eq!(first.interview_id, second.interview_id);
        let interviews = agent.list_interviews().await;
        assert_eq!(interviews.len(), 1);
        assert_eq!(interviews[0].messages.len(), 4);
        assert_eq!(interviews[0].evaluation_scores.unwrap().experience, 0.5);
    }

    #[tokio::test]
    async fn llm_failure_returns_fallback_and_persists_nothing() {
        let (agent, backing) = agent(ScriptedChatClient::new(Script::Fail));

        let response = agent.submit_turn(turn(vec![Message::candidate("Hello")])).await;

        assert_eq!(response.message, prompt::DEFAULT_FALLBACK_REPLY);
        assert_eq!(response.interview_id, None);
        assert_eq!(backing.get("interviews", JsonValue::Null).await.unwrap(), JsonValue::Null);
    }

    #[tokio::test(start_paused = true)]
    async fn llm_timeout_takes_the_fallback_path() {
        let (agent, _) = agent(ScriptedChatClient::new(Script::Hang));

        let response = agent.submit_turn(turn(vec![Message::candidate("Hello")])).await;

        assert_eq!(response.interview_id, None);
        assert_eq!(response.message, prompt::DEFAULT_FALLBACK_REPLY);
        assert!(agent.list_interviews().await.is_empty());
    }

    #[tokio::test]
    async fn unwritable_store_takes_the_fallback_path() {
        let (agent, backing) = agent(ScriptedChatClient::new(Script::Reply("Hi")));
        backing.put("interviews", &json!("corrupted")).await.unwrap();

        let response = agent.submit_turn(turn(vec![Message::candidate("Hello")])).await;

        assert_eq!(response.interview_id, None);
        assert_eq!(backing.get("interviews", JsonValue::Null).await.unwrap(), json!("corrupted"));
    }

    #[tokio::test]
    async fn session_token_resumes_its_interview() {
        let (agent, _) = agent(ScriptedChatClient::new(Script::Reply("Go on")));
        let original = Interview {
            id: "interview_20240101_000000".into(),
            candidate_info: ana(),
            messages: vec![Message::candidate("old session")],
            timestamp: "2024-01-01T00:00:00+00:00".into(),
            evaluation_scores: None,
        };
        let retry = Interview {
            id: "interview_20240105_000000".into(),
            messages: vec![Message::candidate("retry session")],
            ..original.clone()
        };
        agent.transcripts.save_interview(&original).await.unwrap();
        agent.transcripts.save_interview(&retry).await.unwrap();

        let mut request = turn(vec![Message::candidate("retry session"), Message::candidate("more")]);
        request.interview_id = Some(retry.id.clone());
        let response = agent.submit_turn(request).await;

        assert_eq!(response.interview_id.as_deref(), Some("interview_20240105_000000"));
        let untouched = agent.get_interview(&original.id).await.unwrap();
        assert_eq!(untouched, original);
    }

    #[tokio::test]
    async fn compare_skips_unknown_ids() {
        let (agent, _) = agent(ScriptedChatClient::new(Script::Reply("Thanks")));
        let a = agent.submit_turn(turn(vec![Message::candidate("api database")])).await;
        let mut other = turn(vec![Message::candidate("I worked on it")]);
        other.candidate_info.name = "Bo".into();
        let b = agent.submit_turn(other).await;

        let ids = vec![a.interview_id.unwrap(), "interview_missing".to_string(), b.interview_id.unwrap()];
        let result = agent.compare_interviews(&ids).await;

        assert_eq!(result.comparison.len(), 2);
        assert_eq!(result.recommendations.len(), 2);
        assert_eq!(result.ranking.len(), 2);
    }

    #[tokio::test]
    async fn reload_without_prompts_file_is_a_no_op() {
        let (agent, _) = agent(ScriptedChatClient::new(Script::Reply("Hi")));
        assert!(!agent.reload_prompts_if_changed().await.unwrap());
    }

    #[tokio::test]
    async fn reloaded_prompts_change_the_fallback() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"fallback_reply": "Please say that again."}}"#).unwrap();
        let (agent, _) = agent(ScriptedChatClient::new(Script::Fail));
        let agent = agent.with_prompts_path(file.path().to_string_lossy());

        assert!(agent.reload_prompts_if_changed().await.unwrap());
        let response = agent.submit_turn(turn(vec![Message::candidate("Hello")])).await;

        assert_eq!(response.message, "Please say that again.");
    }
}
