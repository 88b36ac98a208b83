use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;

use crate::api::AppState;
use crate::domain::{Decision, NewProject, Project, ProjectId, ProjectStatus};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct ProjectsQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionRequest {
    pub decision: Decision,
    #[serde(default)]
    pub reason: Option<String>,
}

pub async fn create_project(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<NewProject>,
) -> Result<(StatusCode, Json<Project>), AppError> {
    let caller = state.caller(&headers).await?;
    let project = state.tracker.create_project(&caller, body).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn list_projects(
    Query(params): Query<ProjectsQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<Project>>, AppError> {
    let status = params
        .status
        .as_deref()
        .map(str::parse::<ProjectStatus>)
        .transpose()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    Ok(Json(state.tracker.projects(status).await?))
}

pub async fn get_project(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Project>, AppError> {
    Ok(Json(state.tracker.project(&ProjectId::new(id)).await?))
}

pub async fn decide_project(
    Path(id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<DecisionRequest>,
) -> Result<Json<Project>, AppError> {
    let caller = state.caller(&headers).await?;
    let project = state
        .tracker
        .approve(&caller, &ProjectId::new(id), body.decision, body.reason)
        .await?;
    Ok(Json(project))
}

pub async fn cancel_project(
    Path(id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Project>, AppError> {
    let caller = state.caller(&headers).await?;
    Ok(Json(state.tracker.cancel(&caller, &ProjectId::new(id)).await?))
}
