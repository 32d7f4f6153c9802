use super::types::{
    DocsResponse, EndpointDoc, ErrorResponse, GenerateRequest, GenerateResponse, HealthResponse,
    HealthStatus, RootResponse,
};
use crate::{
    config::Config,
    pipeline::{ComputeDevice, Pipeline},
};
use axum::{
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::Json,
};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Shared, read-only state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub device: ComputeDevice,
    pub pipeline: Option<Arc<dyn Pipeline>>,
}

impl AppState {
    pub fn new(config: Config, device: ComputeDevice, pipeline: Option<Arc<dyn Pipeline>>) -> Self {
        Self {
            config: Arc::new(config),
            device,
            pipeline,
        }
    }

    pub fn model_loaded(&self) -> bool {
        self.pipeline.is_some()
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, detail: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            detail: detail.into(),
        }),
    )
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let model_loaded = state.model_loaded();
    Json(HealthResponse {
        status: if model_loaded {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        },
        model: state.config.model.name.clone(),
        task: state.config.model.task.clone(),
        environment: state.config.server.environment.clone(),
        model_loaded,
        device: state.device,
    })
}

pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Model Server API",
        docs: "/docs",
    })
}

pub async fn docs() -> Json<DocsResponse> {
    Json(DocsResponse {
        title: "Model Server API",
        version: env!("CARGO_PKG_VERSION"),
        endpoints: vec![
            EndpointDoc {
                method: "GET",
                path: "/health",
                summary: "Service status, configured model and compute device",
            },
            EndpointDoc {
                method: "GET",
                path: "/",
                summary: "Service information",
            },
            EndpointDoc {
                method: "POST",
                path: "/models/{model_name}/generate",
                summary: "Generate text from {text, max_length, num_return_sequences}",
            },
        ],
    })
}

pub async fn generate(
    State(state): State<AppState>,
    Path(model_name): Path<String>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let request_id = Uuid::new_v4();

    // Body errors are reported before model availability, in the JSON error shape.
    let Json(request) = payload.map_err(|rejection| {
        warn!(%request_id, "Rejecting malformed generate request: {}", rejection.body_text());
        api_error(rejection.status(), rejection.body_text())
    })?;

    let Some(pipeline) = state.pipeline.as_ref() else {
        warn!(%request_id, "Rejecting generate request: model not loaded");
        return Err(api_error(StatusCode::SERVICE_UNAVAILABLE, "Model not loaded"));
    };

    let configured = &state.config.model.name;
    if model_name != *configured {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!(
                "Model {} not available. This server is running {}",
                model_name, configured
            ),
        ));
    }

    info!(
        %request_id,
        max_length = request.max_length,
        num_return_sequences = request.num_return_sequences,
        "Generating text for model {}",
        model_name
    );

    match pipeline.generate(&request.text, request.params()).await {
        Ok(result) => {
            info!(%request_id, sequences = result.len(), "Generation finished");
            Ok(Json(GenerateResponse { result }))
        }
        Err(e) => {
            error!(%request_id, "Error generating text: {}", e);
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}
