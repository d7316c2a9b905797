use std::{net::SocketAddr, sync::Arc};

use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tracing::info;

use crate::{
    controller::{form::FormUpdate, ActionKind, ActionReport, Controller},
    network_runner::networks::Network,
};

type SharedController = State<Arc<Controller>>;

#[derive(Debug, Deserialize)]
struct SwitchRequest {
    network: Network,
}

/// Control API replacing the page's buttons and form.
pub fn router(controller: Arc<Controller>) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/connect", post(connect))
        .route("/disconnect", post(disconnect))
        .route("/state", get(state))
        .route("/form", get(form).patch(update_form))
        .route("/network/switch", post(switch_network))
        .route("/network/kopli", post(add_kopli_network))
        .route("/actions/:action", post(run_action))
        .route("/notifications", get(notifications))
        .with_state(controller)
}

pub async fn serve(controller: Arc<Controller>, port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting control server on {}", addr);

    axum::Server::bind(&addr)
        .serve(router(controller).into_make_service())
        .await?;

    Ok(())
}

impl IntoResponse for ActionReport {
    fn into_response(self) -> Response {
        let status = if self.succeeded {
            StatusCode::OK
        } else {
            StatusCode::UNPROCESSABLE_ENTITY
        };
        (status, Json(self)).into_response()
    }
}

/// Maps the last path segment of `/actions/...` to the action it triggers.
fn action_from_path(action: &str) -> Option<ActionKind> {
    match action {
        "health-factor" => Some(ActionKind::FetchHealthFactor),
        "deploy-callback" => Some(ActionKind::DeployCallback),
        "deploy-reactive" => Some(ActionKind::DeployReactive),
        "approve" => Some(ActionKind::ApproveCollateral),
        "allowance" => Some(ActionKind::CheckAllowance),
        "protection" => Some(ActionKind::CalculateProtection),
        _ => None,
    }
}

async fn connect(State(controller): SharedController) -> ActionReport {
    controller.connect().await
}

async fn disconnect(State(controller): SharedController) -> impl IntoResponse {
    Json(controller.disconnect().await)
}

async fn state(State(controller): SharedController) -> impl IntoResponse {
    Json(controller.state().await)
}

async fn form(State(controller): SharedController) -> impl IntoResponse {
    Json(controller.form().await)
}

async fn update_form(
    State(controller): SharedController,
    Json(update): Json<FormUpdate>,
) -> impl IntoResponse {
    Json(controller.update_form(update).await)
}

async fn switch_network(
    State(controller): SharedController,
    Json(request): Json<SwitchRequest>,
) -> ActionReport {
    controller.switch_network(request.network).await
}

async fn add_kopli_network(State(controller): SharedController) -> ActionReport {
    controller.add_kopli_network().await
}

async fn run_action(
    State(controller): SharedController,
    Path(action): Path<String>,
) -> Result<ActionReport, StatusCode> {
    let report = match action_from_path(&action).ok_or(StatusCode::NOT_FOUND)? {
        ActionKind::FetchHealthFactor => controller.fetch_health_factor().await,
        ActionKind::DeployCallback => controller.deploy_callback().await,
        ActionKind::DeployReactive => controller.deploy_reactive().await,
        ActionKind::ApproveCollateral => controller.approve_collateral().await,
        ActionKind::CheckAllowance => controller.check_allowance().await,
        ActionKind::CalculateProtection => controller.calculate_protection().await,
        _ => return Err(StatusCode::NOT_FOUND),
    };

    Ok(report)
}

async fn notifications(State(controller): SharedController) -> impl IntoResponse {
    Json(controller.notifications())
}
