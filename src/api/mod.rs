use axum::{
    Router,
    extract::{
        Json, Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::catalog::Catalog;
use crate::core::{
    Instrument, MAX_INVEST_RATE, RenderIntent, WizardAction, WizardError, WizardState, suggest,
};

#[derive(Copy, Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
enum ApiAction {
    #[serde(alias = "submitIncome", alias = "submit_income", alias = "income")]
    SubmitIncome { amount: f64 },
    #[serde(alias = "submitExpenses", alias = "submit_expenses", alias = "expenses")]
    SubmitExpenses { amount: f64 },
    #[serde(alias = "analyse")]
    Analyze,
    #[serde(alias = "start-over", alias = "startOver", alias = "re-enter")]
    Reset,
}

impl From<ApiAction> for WizardAction {
    fn from(value: ApiAction) -> Self {
        match value {
            ApiAction::SubmitIncome { amount } => WizardAction::SubmitIncome(amount),
            ApiAction::SubmitExpenses { amount } => WizardAction::SubmitExpenses(amount),
            ApiAction::Analyze => WizardAction::Analyze,
            ApiAction::Reset => WizardAction::Reset,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SuggestPayload {
    investable_amount: Option<f64>,
    savings: Option<f64>,
}

pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

/// One wizard per session id, plus the intent produced by its last transition.
#[derive(Debug, Clone)]
struct Session {
    state: WizardState,
    view: RenderIntent,
    last_seen: Instant,
}

impl Session {
    fn new(now: Instant) -> Self {
        let state = WizardState::default();
        Self {
            view: state.intent(),
            state,
            last_seen: now,
        }
    }

    fn is_idle(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.last_seen) >= ttl
    }
}

#[derive(Clone)]
pub struct AppState {
    catalog: Catalog,
    sessions: Arc<Mutex<HashMap<Uuid, Session>>>,
    session_ttl: Duration,
    max_sessions: usize,
}

impl AppState {
    pub fn new(catalog: Catalog) -> Self {
        Self::with_session_limits(catalog, DEFAULT_SESSION_TTL, DEFAULT_MAX_SESSIONS)
    }

    /// Sessions untouched for `session_ttl` are dropped; at most `max_sessions` live at once.
    pub fn with_session_limits(
        catalog: Catalog,
        session_ttl: Duration,
        max_sessions: usize,
    ) -> Self {
        Self {
            catalog,
            sessions: Arc::new(Mutex::new(HashMap::new())),
            session_ttl,
            max_sessions,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ViewResponse {
    #[serde(flatten)]
    intent: RenderIntent,
    message: String,
}

impl From<&RenderIntent> for ViewResponse {
    fn from(intent: &RenderIntent) -> Self {
        Self {
            message: intent.message(),
            intent: intent.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    session_id: Uuid,
    state: WizardState,
    view: ViewResponse,
}

impl SessionResponse {
    fn new(session_id: Uuid, session: &Session) -> Self {
        Self {
            session_id,
            state: session.state,
            view: (&session.view).into(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SuggestResponse {
    investable_amount: f64,
    picks: Vec<Instrument>,
    message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CatalogResponse<'a> {
    instruments: &'a [Instrument],
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    session: Option<SessionResponse>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/sessions", post(create_session_handler))
        .route(
            "/api/sessions/:id",
            get(get_session_handler).delete(delete_session_handler),
        )
        .route(
            "/api/sessions/:id/actions",
            post(session_action_handler),
        )
        .route(
            "/api/suggest",
            get(suggest_get_handler).post(suggest_post_handler),
        )
        .route("/api/catalog", get(catalog_handler))
        .fallback(not_found_handler)
        .with_state(state)
}

pub async fn run_http_server(port: u16, state: AppState) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = build_router(state);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "investment wizard HTTP API listening");
    info!("Local access: http://127.0.0.1:{port}/api/sessions");

    axum::serve(listener, app).await
}

async fn create_session_handler(State(app): State<AppState>) -> Response {
    let now = Instant::now();
    let mut sessions = app.sessions.lock().await;

    let before = sessions.len();
    sessions.retain(|_, session| !session.is_idle(now, app.session_ttl));
    let expired = before - sessions.len();
    if expired > 0 {
        debug!(expired, "pruned idle wizard sessions");
    }

    if sessions.len() >= app.max_sessions {
        warn!(live = sessions.len(), "wizard session limit reached");
        return error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "Too many active sessions, try again later",
        );
    }

    let id = Uuid::new_v4();
    let session = Session::new(now);
    let body = SessionResponse::new(id, &session);
    sessions.insert(id, session);
    info!(session_id = %id, live = sessions.len(), "wizard session started");
    json_response(StatusCode::CREATED, body)
}

async fn get_session_handler(
    State(app): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Response {
    let id = match id {
        Ok(Path(id)) => id,
        Err(rejection) => return rejection_response(rejection.status(), rejection.body_text()),
    };

    let mut sessions = app.sessions.lock().await;
    match touch_session(&mut sessions, id, app.session_ttl) {
        Some(session) => json_response(StatusCode::OK, SessionResponse::new(id, session)),
        None => session_not_found(id),
    }
}

async fn delete_session_handler(
    State(app): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Response {
    let id = match id {
        Ok(Path(id)) => id,
        Err(rejection) => return rejection_response(rejection.status(), rejection.body_text()),
    };

    if app.sessions.lock().await.remove(&id).is_none() {
        return session_not_found(id);
    }
    info!(session_id = %id, "wizard session ended");
    with_cache_control(StatusCode::NO_CONTENT)
}

async fn session_action_handler(
    State(app): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    action: Result<Json<ApiAction>, JsonRejection>,
) -> Response {
    let id = match id {
        Ok(Path(id)) => id,
        Err(rejection) => return rejection_response(rejection.status(), rejection.body_text()),
    };
    let action = match action {
        Ok(Json(action)) => action,
        Err(rejection) => return rejection_response(rejection.status(), rejection.body_text()),
    };

    let mut sessions = app.sessions.lock().await;
    let Some(session) = touch_session(&mut sessions, id, app.session_ttl) else {
        return session_not_found(id);
    };

    match session
        .state
        .apply(action.into(), app.catalog.instruments())
    {
        Ok(transition) => {
            debug!(
                session_id = %id,
                from = ?session.state.step,
                to = ?transition.state.step,
                "wizard transition"
            );
            session.state = transition.state;
            session.view = transition.intent;
            json_response(StatusCode::OK, SessionResponse::new(id, session))
        }
        Err(err) => {
            warn!(session_id = %id, code = err.code(), "rejected wizard action: {err}");
            wizard_error_response(&err, SessionResponse::new(id, session))
        }
    }
}

async fn suggest_get_handler(
    State(app): State<AppState>,
    payload: Result<Query<SuggestPayload>, QueryRejection>,
) -> Response {
    match payload {
        Ok(Query(payload)) => suggest_handler_impl(&app, payload),
        Err(rejection) => rejection_response(rejection.status(), rejection.body_text()),
    }
}

async fn suggest_post_handler(
    State(app): State<AppState>,
    payload: Result<Json<SuggestPayload>, JsonRejection>,
) -> Response {
    match payload {
        Ok(Json(payload)) => suggest_handler_impl(&app, payload),
        Err(rejection) => rejection_response(rejection.status(), rejection.body_text()),
    }
}

fn suggest_handler_impl(app: &AppState, payload: SuggestPayload) -> Response {
    let investable_amount = match investable_amount_from_payload(&payload) {
        Ok(amount) => amount,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    let picks = suggest(app.catalog.instruments(), investable_amount);
    let intent = if picks.is_empty() {
        RenderIntent::NoAffordableInstruments { investable_amount }
    } else {
        RenderIntent::Shortlist {
            investable_amount,
            picks: picks.clone(),
        }
    };
    json_response(
        StatusCode::OK,
        SuggestResponse {
            investable_amount,
            picks,
            message: intent.message(),
        },
    )
}

async fn catalog_handler(State(app): State<AppState>) -> Response {
    json_response(
        StatusCode::OK,
        CatalogResponse {
            instruments: app.catalog.instruments(),
        },
    )
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

/// Returns the live session, refreshing its idle clock, or drops it if it has expired.
fn touch_session(
    sessions: &mut HashMap<Uuid, Session>,
    id: Uuid,
    ttl: Duration,
) -> Option<&mut Session> {
    let now = Instant::now();
    if sessions.get(&id).is_some_and(|s| s.is_idle(now, ttl)) {
        sessions.remove(&id);
        debug!(session_id = %id, "wizard session expired");
        return None;
    }
    let session = sessions.get_mut(&id)?;
    session.last_seen = now;
    Some(session)
}

fn investable_amount_from_payload(payload: &SuggestPayload) -> Result<f64, String> {
    if let Some(amount) = payload.investable_amount {
        if !amount.is_finite() || amount < 0.0 {
            return Err("investableAmount must be >= 0".to_string());
        }
        return Ok(amount);
    }

    if let Some(savings) = payload.savings {
        if !savings.is_finite() || savings <= 0.0 {
            return Err("savings must be > 0".to_string());
        }
        return Ok(savings * MAX_INVEST_RATE);
    }

    Err("either investableAmount or savings is required".to_string())
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)))
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
            code: None,
            session: None,
        },
    )
}

fn rejection_response(status: StatusCode, body_text: String) -> Response {
    error_response(status, &body_text)
}

fn wizard_error_response(err: &WizardError, session: SessionResponse) -> Response {
    json_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        ErrorResponse {
            error: err.to_string(),
            code: Some(err.code()),
            session: Some(session),
        },
    )
}

fn session_not_found(id: Uuid) -> Response {
    error_response(StatusCode::NOT_FOUND, &format!("Unknown session {id}"))
}
