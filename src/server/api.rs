use crate::agent::InterviewAgent;
use crate::interview::Comparison;
use crate::models::api::{
    ChatRequest,
    ChatResponse,
    CompareInterviewsRequest,
    ErrorResponse,
    GetInterviewResponse,
    ListInterviewsResponse,
    ReloadResponse,
};
use axum::{
    extract::{ Path, Query, Request, State },
    http::StatusCode,
    middleware::{ self, Next },
    response::{ IntoResponse, Response },
    routing::{ get, post },
    Json,
    Router,
};
use governor::{ DefaultDirectRateLimiter, Quota, RateLimiter };
use log::{ debug, info, warn };
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use tower_http::cors::{ Any, CorsLayer };

#[derive(Clone)]
pub struct AppState {
    agent: Arc<InterviewAgent>,
    api_key: Option<String>,
    limiter: Arc<DefaultDirectRateLimiter>,
}

impl AppState {
    pub fn new(agent: Arc<InterviewAgent>, api_key: Option<String>, requests_per_second: u32) -> Self {
        let per_second = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        Self {
            agent,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            limiter: Arc::new(RateLimiter::direct(Quota::per_second(per_second))),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/chat", post(chat_handler))
        .route("/interviews", get(list_interviews_handler))
        .route("/interviews/{interview_id}", get(get_interview_handler))
        .route("/compare", post(compare_handler))
        .route("/api/reload-prompts", get(reload_prompts_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key))
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit))
        .route("/health", get(|| async { "ok" }))
        .layer(cors)
        .with_state(state)
}

fn rejection(status: StatusCode, message: &str) -> Response {
    (status, Json(ErrorResponse { success: false, message: message.to_string() })).into_response()
}

/// `X-API-Key` header first, then the `api_key` query parameter.
fn provided_api_key(req: &Request) -> Option<String> {
    let from_header = req
        .headers()
        .get("X-API-Key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    if from_header.is_some() {
        return from_header;
    }

    let Query(mut params) = Query::<HashMap<String, String>>::try_from_uri(req.uri()).ok()?;
    params.remove("api_key")
}

async fn require_api_key(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let Some(required) = state.api_key.as_deref() else {
        return next.run(req).await;
    };

    if provided_api_key(&req).as_deref() != Some(required) {
        warn!("{} {}: bad or missing API key", req.method(), req.uri().path());
        return rejection(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    next.run(req).await
}

async fn rate_limit(State(state): State<AppState>, req: Request, next: Next) -> Response {
    if state.limiter.check().is_err() {
        warn!("Global rate limit exceeded. Rejecting {} {}", req.method(), req.uri().path());
        return rejection(StatusCode::TOO_MANY_REQUESTS, "Too many requests");
    }
    next.run(req).await
}

async fn chat_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>
) -> Json<ChatResponse> {
    debug!(
        "Chat turn for {} ({} messages, token {:?})",
        request.candidate_info.name,
        request.messages.len(),
        request.interview_id
    );
    Json(state.agent.submit_turn(request).await)
}

async fn list_interviews_handler(State(state): State<AppState>) -> Json<ListInterviewsResponse> {
    Json(ListInterviewsResponse {
        interviews: state.agent.list_interviews().await,
    })
}

async fn get_interview_handler(
    State(state): State<AppState>,
    Path(interview_id): Path<String>
) -> Json<GetInterviewResponse> {
    Json(GetInterviewResponse {
        interview: state.agent.get_interview(&interview_id).await,
    })
}

async fn compare_handler(
    State(state): State<AppState>,
    Json(request): Json<CompareInterviewsRequest>
) -> Json<Comparison> {
    Json(state.agent.compare_interviews(&request.interview_ids).await)
}

async fn reload_prompts_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.agent.reload_prompts_if_changed().await {
        Ok(reloaded) => {
            let detail = if reloaded { "Prompts reloaded" } else { "Prompts unchanged" };
            info!("Prompt reload requested: {}", detail);
            (
                StatusCode::OK,
                Json(ReloadResponse {
                    success: true,
                    message: "Reload complete".into(),
                    details: Some(vec![detail.to_string()]),
                }),
            )
        }
        Err(e) => {
            warn!("Prompt reload failed: {}", e);
            (
                StatusCode::BAD_REQUEST,
                Json(ReloadResponse {
                    success: false,
                    message: "Reload errors".into(),
                    details: Some(vec![format!("Prompts error: {}", e)]),
                }),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request(uri: &str) -> Request {
        axum::http::Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[test]
    fn api_key_read_from_header() {
        let mut req = request("/interviews");
        req.headers_mut().insert("X-API-Key", "secret".parse().unwrap());
        assert_eq!(provided_api_key(&req).as_deref(), Some("secret"));
    }

    #[test]
    fn api_key_read_from_query() {
        let req = request("/interviews?page=1&api_key=secret");
        assert_eq!(provided_api_key(&req).as_deref(), Some("secret"));
        assert_eq!(provided_api_key(&request("/interviews?page=1")), None);
        assert_eq!(provided_api_key(&request("/interviews")), None);
    }

    #[test]
    fn query_api_key_is_percent_decoded() {
        let req = request("/interviews?api_key=s%26cr%3Det%2F1");
        assert_eq!(provided_api_key(&req).as_deref(), Some("s&cr=et/1"));
    }
}
