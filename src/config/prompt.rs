use serde::Deserialize;
use std::error::Error;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;
use log::{ info, warn };
use crate::models::interview::CandidateProfile;

pub const DEFAULT_INTERVIEWER_SYSTEM: &str =
    "You are an experienced technical interviewer conducting an interview for a {position} position. \
The candidate, {name}, has {experience_years} years of experience and is skilled in {tech_stack}.

Interview Guidelines:
1. Ask one question at a time
2. Focus on technical questions related to their tech stack
3. Ask follow-up questions based on their responses
4. Keep responses concise and professional
5. Progress naturally through different interview stages:
   - Start with experience and background
   - Move to technical questions about their stack
   - Include some behavioral questions
   - End with opportunity for candidate questions
6. Evaluate answers for technical accuracy and depth

Remember to:
- Stay focused on their tech stack: {tech_stack}
- Ask for specific examples
- Probe deeper when answers lack detail
- Maintain a professional and encouraging tone";

pub const DEFAULT_FALLBACK_REPLY: &str =
    "I apologize, but I'm having trouble processing your response. Could you please try again?";

#[derive(Debug)]
pub enum PromptError {
    TemplateNotFound(String),
    IoError(std::io::Error),
    JsonError(serde_json::Error),
}

impl fmt::Display for PromptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptError::TemplateNotFound(key) => write!(f, "Prompt template '{}' is empty", key),
            PromptError::IoError(e) => write!(f, "Prompt file IO error: {}", e),
            PromptError::JsonError(e) => write!(f, "Prompt JSON parsing error: {}", e),
        }
    }
}

impl Error for PromptError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PromptError::IoError(e) => Some(e),
            PromptError::JsonError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PromptError {
    fn from(err: std::io::Error) -> Self {
        PromptError::IoError(err)
    }
}

impl From<serde_json::Error> for PromptError {
    fn from(err: serde_json::Error) -> Self {
        PromptError::JsonError(err)
    }
}

fn default_interviewer_system() -> String {
    DEFAULT_INTERVIEWER_SYSTEM.to_string()
}

fn default_fallback_reply() -> String {
    DEFAULT_FALLBACK_REPLY.to_string()
}

/// Interviewer persona and canned replies. Placeholders in
/// `interviewer_system`: `{position}`, `{name}`, `{experience_years}`,
/// `{tech_stack}`.
#[derive(Deserialize, Debug, Clone)]
pub struct PromptConfig {
    #[serde(default = "default_interviewer_system")]
    pub interviewer_system: String,
    #[serde(default = "default_fallback_reply")]
    pub fallback_reply: String,
    #[serde(skip)]
    pub last_loaded: Option<SystemTime>,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            interviewer_system: default_interviewer_system(),
            fallback_reply: default_fallback_reply(),
            last_loaded: None,
        }
    }
}

impl PromptConfig {
    fn validate(&self) -> Result<(), PromptError> {
        if self.interviewer_system.trim().is_empty() {
            return Err(PromptError::TemplateNotFound("interviewer_system".to_string()));
        }
        if self.fallback_reply.trim().is_empty() {
            return Err(PromptError::TemplateNotFound("fallback_reply".to_string()));
        }
        Ok(())
    }
}

pub fn load_prompts<P: AsRef<Path>>(path: P) -> Result<Arc<PromptConfig>, PromptError> {
    let file_content = fs::read_to_string(&path)?;
    let mut config: PromptConfig = serde_json::from_str(&file_content)?;
    config.validate()?;
    config.last_loaded = Some(SystemTime::now());
    Ok(Arc::new(config))
}

/// Like [`load_prompts`], but a missing file yields the built-in prompts.
pub fn load_prompts_or_default<P: AsRef<Path>>(path: P) -> Result<Arc<PromptConfig>, PromptError> {
    match load_prompts(&path) {
        Err(PromptError::IoError(e)) if e.kind() == ErrorKind::NotFound => {
            warn!(
                "Prompts file '{}' not found, using built-in interviewer prompts",
                path.as_ref().display()
            );
            Ok(Arc::new(PromptConfig::default()))
        }
        other => other,
    }
}

pub fn reload_prompts_if_changed<P: AsRef<Path>>(
    path: P,
    current_config: &Arc<PromptConfig>
) -> Result<Option<Arc<PromptConfig>>, PromptError> {
    let metadata = fs::metadata(&path)?;

    if let Ok(modified) = metadata.modified() {
        if let Some(last_loaded) = current_config.last_loaded {
            if modified > last_loaded {
                info!("Prompts file changed, reloading...");
                return load_prompts(&path).map(Some);
            }
        } else {
            info!("No last_loaded timestamp, reloading prompts...");
            return load_prompts(&path).map(Some);
        }
    }
    Ok(None)
}

/// Fills `{position}`, `{name}`, `{experience_years}` and `{tech_stack}` in a
/// single pass. Substituted values are never scanned for placeholders.
pub fn render_system_prompt(config: &PromptConfig, profile: &CandidateProfile) -> String {
    let template = config.interviewer_system.as_str();
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        rendered.push_str(&rest[..start]);
        let tail = &rest[start..];
        let value = tail.find('}').and_then(|end| {
            let value = match &tail[1..end] {
                "position" => profile.position.clone(),
                "name" => profile.name.clone(),
                "experience_years" => profile.experience_years.to_string(),
                "tech_stack" => profile.tech_stack.join(", "),
                _ => return None,
            };
            Some((value, end + 1))
        });
        match value {
            Some((value, consumed)) => {
                rendered.push_str(&value);
                rest = &tail[consumed..];
            }
            None => {
                rendered.push('{');
                rest = &tail[1..];
            }
        }
    }
    rendered.push_str(rest);
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn ana() -> CandidateProfile {
        CandidateProfile {
            name: "Ana".into(),
            experience_years: 3,
            tech_stack: vec!["python".into(), "sql".into()],
            position: "Backend Engineer".into(),
        }
    }

    #[test]
    fn default_prompt_mentions_position_and_stack() {
        let prompt = render_system_prompt(&PromptConfig::default(), &ana());
        assert!(prompt.contains("interview for a Backend Engineer position"));
        assert!(prompt.contains("The candidate, Ana, has 3 years of experience"));
        assert!(prompt.contains("Stay focused on their tech stack: python, sql"));
        assert!(!prompt.contains('{'));
    }

    #[test]
    fn profile_values_are_not_expanded_again() {
        let config = PromptConfig {
            interviewer_system: "{name} knows {tech_stack} ({unknown}) {".into(),
            ..PromptConfig::default()
        };
        let mut profile = ana();
        profile.name = "{tech_stack}".into();

        assert_eq!(
            render_system_prompt(&config, &profile),
            "{tech_stack} knows python, sql ({unknown}) {"
        );
    }

    #[test]
    fn file_overrides_only_given_templates() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"interviewer_system": "Interview {{name}} for {{position}}"}}"#).unwrap();

        let config = load_prompts(file.path()).unwrap();

        assert_eq!(render_system_prompt(&config, &ana()), "Interview Ana for Backend Engineer");
        assert_eq!(config.fallback_reply, DEFAULT_FALLBACK_REPLY);
        assert!(config.last_loaded.is_some());
    }

    #[test]
    fn empty_template_is_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"fallback_reply": "  "}}"#).unwrap();
        assert!(matches!(load_prompts(file.path()), Err(PromptError::TemplateNotFound(_))));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_prompts_or_default(dir.path().join("absent.json")).unwrap();
        assert_eq!(config.fallback_reply, DEFAULT_FALLBACK_REPLY);
        assert!(config.last_loaded.is_none());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(load_prompts_or_default(file.path()), Err(PromptError::JsonError(_))));
    }

    #[test]
    fn reload_picks_up_a_file_never_loaded() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"fallback_reply": "Please retry."}}"#).unwrap();

        let reloaded = reload_prompts_if_changed(file.path(), &Arc::new(PromptConfig::default()))
            .unwrap()
            .expect("defaults were never loaded from disk");
        assert_eq!(reloaded.fallback_reply, "Please retry.");

        assert!(reload_prompts_if_changed(file.path(), &reloaded).unwrap().is_none());
    }
}
