//! Request Handlers
//!
//! Every session-scoped handler goes through `SessionStore::with_session`, so
//! requests against one session are serialized while other sessions proceed.

use super::{errors::ApiError, middleware::RequestId, models::*};
use crate::errors::EngineResult;
use crate::games::processor::GameProcessor;
use crate::games::types::GameResult;
use crate::games::verify::{verify_result, VerificationReport};
use crate::session::RevealedSeed;
use crate::store::SessionStore;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use std::sync::Arc;
use tracing::info;

/// Shared application state
pub struct AppState {
    pub store: Arc<SessionStore>,
    pub version: String,
}

impl AppState {
    pub fn new(store: Arc<SessionStore>) -> Self {
        Self {
            store,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

fn view_of(session_id: &str, processor: &GameProcessor) -> EngineResult<SessionView> {
    let session = processor.session()?;
    Ok(SessionView::new(
        session_id,
        session.commitment(),
        session.round_in_progress(),
    ))
}

/// Health check handler
/// GET /health
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "Running".to_string(),
        version: state.version.clone(),
        sessions: state.store.len(),
    })
}

/// Start a session and publish its commitment
/// POST /sessions
pub async fn create_session_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    body: Option<Json<SeedRequest>>,
) -> Result<Json<SessionView>, ApiError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let (session_id, commitment) = state
        .store
        .create(request.client_seed)
        .map_err(|e| ApiError::from_engine(request_id.0.clone(), e))?;

    info!(request_id = %request_id.0, session_id = %session_id, "Session opened");
    Ok(Json(SessionView::new(&session_id, commitment, false)))
}

/// GET /sessions/:id
pub async fn get_session_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionView>, ApiError> {
    state
        .store
        .with_session(&session_id, |p| view_of(&session_id, p))
        .map(Json)
        .map_err(|e| ApiError::from_engine(request_id.0, e))
}

/// Reveal the live server seed and forget the session
/// DELETE /sessions/:id
pub async fn close_session_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<CloseSessionResponse>, ApiError> {
    let revealed = state
        .store
        .close(&session_id)
        .map_err(|e| ApiError::from_engine(request_id.0.clone(), e))?;

    info!(request_id = %request_id.0, session_id = %session_id, "Session closed");
    Ok(Json(CloseSessionResponse {
        session_id,
        revealed,
    }))
}

/// Reveal the current server seed and commit to a new one
/// POST /sessions/:id/rotate
pub async fn rotate_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    body: Option<Json<SeedRequest>>,
) -> Result<Json<RotateResponse>, ApiError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    state
        .store
        .with_session(&session_id, |p| {
            let revealed = p.rotate_seeds(request.client_seed)?;
            Ok(RotateResponse {
                revealed,
                session: view_of(&session_id, p)?,
            })
        })
        .map(Json)
        .map_err(|e| ApiError::from_engine(request_id.0, e))
}

/// Every seed pair retired by this session
/// GET /sessions/:id/revealed
pub async fn revealed_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<Vec<RevealedSeed>>, ApiError> {
    state
        .store
        .with_session(&session_id, |p| Ok(p.revealed_seeds()?.to_vec()))
        .map(Json)
        .map_err(|e| ApiError::from_engine(request_id.0, e))
}

/// POST /sessions/:id/dice
pub async fn dice_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    body: Result<Json<DiceRequest>, JsonRejection>,
) -> Result<Json<GameResult>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::from_json_rejection(request_id.0.clone(), e))?;
    state
        .store
        .with_session(&session_id, |p| {
            p.play_dice(request.bet_amount, request.target, request.direction)
        })
        .map(Json)
        .map_err(|e| ApiError::from_engine(request_id.0, e))
}

/// POST /sessions/:id/plinko
pub async fn plinko_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    body: Result<Json<PlinkoRequest>, JsonRejection>,
) -> Result<Json<PlinkoResponse>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::from_json_rejection(request_id.0.clone(), e))?;
    let drops = state
        .store
        .with_session(&session_id, |p| {
            p.drop_plinko(request.bet_amount, request.rows, request.risk, request.balls)
        })
        .map_err(|e| ApiError::from_engine(request_id.0, e))?;

    let (results, paths): (Vec<_>, Vec<_>) = drops.into_iter().map(|d| (d.result, d.path)).unzip();
    Ok(Json(PlinkoResponse { results, paths }))
}

/// Deal a new blackjack round
/// POST /sessions/:id/blackjack
pub async fn blackjack_start_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    body: Result<Json<BlackjackStartRequest>, JsonRejection>,
) -> Result<Json<BlackjackResponse>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::from_json_rejection(request_id.0.clone(), e))?;
    state
        .store
        .with_session(&session_id, |p| p.start_blackjack(request.bet_amount))
        .map(|play| {
            Json(BlackjackResponse {
                view: play.view,
                result: play.result,
            })
        })
        .map_err(|e| ApiError::from_engine(request_id.0, e))
}

/// POST /sessions/:id/blackjack/action
pub async fn blackjack_action_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    body: Result<Json<BlackjackActionRequest>, JsonRejection>,
) -> Result<Json<BlackjackResponse>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::from_json_rejection(request_id.0.clone(), e))?;
    state
        .store
        .with_session(&session_id, |p| p.blackjack_action(request.action))
        .map(|play| {
            Json(BlackjackResponse {
                view: play.view,
                result: play.result,
            })
        })
        .map_err(|e| ApiError::from_engine(request_id.0, e))
}

/// View of the open round, for clients picking a round back up
/// GET /sessions/:id/blackjack
pub async fn blackjack_view_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<BlackjackResponse>, ApiError> {
    state
        .store
        .with_session(&session_id, |p| p.blackjack_view())
        .map(|view| Json(BlackjackResponse { view, result: None }))
        .map_err(|e| ApiError::from_engine(request_id.0, e))
}

/// Give up the open round; its nonce stays spent
/// POST /sessions/:id/blackjack/abandon
pub async fn blackjack_abandon_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionView>, ApiError> {
    state
        .store
        .with_session(&session_id, |p| {
            p.abandon_blackjack()?;
            view_of(&session_id, p)
        })
        .map(Json)
        .map_err(|e| ApiError::from_engine(request_id.0, e))
}

/// Check a stored result against a revealed server seed
/// POST /verify
pub async fn verify_handler(
    Extension(request_id): Extension<RequestId>,
    body: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<VerificationReport>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::from_json_rejection(request_id.0.clone(), e))?;
    verify_result(&request.server_seed, &request.result)
        .map(Json)
        .map_err(|e| ApiError::from_engine(request_id.0, e))
}
