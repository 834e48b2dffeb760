use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::header::SET_COOKIE,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use crate::{
    auth::{Credential, issue_cookie},
    error::AppError,
    household::Household,
    state::AppState,
};

#[derive(Deserialize)]
pub struct JoinQuery {
    code: String,
}

#[derive(Serialize)]
pub struct Created {
    id: String,
    join_code: String,
    state: Value,
}

#[derive(Serialize)]
pub struct Joined {
    ok: bool,
    id: String,
}

#[derive(Serialize)]
pub struct Meta {
    id: String,
    join_code: String,
}

#[derive(Serialize)]
pub struct Rotated {
    ok: bool,
    #[serde(rename = "startEpoch")]
    start_epoch: i64,
}

pub async fn root_handler() -> impl IntoResponse {
    Json(json!({ "message": "TidyUp backend with join codes is running!" }))
}

pub async fn create_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let household = Household::new();

    state.store.put(&household).await?;
    state
        .join_codes
        .insert(&household.join_code, &household.id)
        .await;

    info!(
        "Created household {}, {} join codes indexed",
        household.id,
        state.join_codes.len().await
    );

    let cookie = issue_cookie(&household.id, state.config.cookie_secure)
        .map_err(|e| AppError::InternalError(e.into()))?;

    Ok((
        [(SET_COOKIE, cookie)],
        Json(Created {
            id: household.id,
            join_code: household.join_code,
            state: household.state,
        }),
    ))
}

pub async fn join_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<JoinQuery>,
) -> Result<impl IntoResponse, AppError> {
    let id = state
        .join_codes
        .lookup(state.store.as_ref(), &query.code)
        .await?
        .ok_or(AppError::Forbidden("Invalid join code"))?;

    info!("Join code redeemed for household {id}");

    let cookie = issue_cookie(&id, state.config.cookie_secure)
        .map_err(|e| AppError::InternalError(e.into()))?;

    Ok(([(SET_COOKIE, cookie)], Json(Joined { ok: true, id })))
}

pub async fn meta_handler(
    State(state): State<Arc<AppState>>,
    Path(hid): Path<String>,
) -> Result<Json<Meta>, AppError> {
    let household = state.store.get(&hid).await?;

    Ok(Json(Meta {
        id: household.id,
        join_code: household.join_code,
    }))
}

pub async fn get_state_handler(
    State(state): State<Arc<AppState>>,
    Path(hid): Path<String>,
) -> Result<Json<Value>, AppError> {
    let household = state.store.get(&hid).await?;

    Ok(Json(household.state))
}

pub async fn set_state_handler(
    State(state): State<Arc<AppState>>,
    Path(hid): Path<String>,
    credential: Credential,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    credential.authorize(&hid)?;

    let new_state: Value =
        serde_json::from_slice(&body).map_err(|_| AppError::MalformedPayload)?;

    let mut household = state.store.get(&hid).await?;
    household.state = new_state;
    state.store.put(&household).await?;

    Ok(Json(json!({ "ok": true })))
}

pub async fn rotate_now_handler(
    State(state): State<Arc<AppState>>,
    Path(hid): Path<String>,
    credential: Credential,
) -> Result<Json<Rotated>, AppError> {
    credential.authorize(&hid)?;

    let mut household = state.store.get(&hid).await?;
    let start_epoch = household
        .rotate_now()
        .ok_or(AppError::MissingStartEpoch)?;
    state.store.put(&household).await?;

    info!("Rotated household {hid} back to {start_epoch}");

    Ok(Json(Rotated {
        ok: true,
        start_epoch,
    }))
}
