use super::mocks::MockPipeline;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response},
};
use model_server::{
    config::{Config, LogsConfig, ModelConfig, ServerConfig},
    pipeline::{ComputeDevice, Pipeline},
    server::{AppState, build_router},
};
use serde_json::Value;
use std::sync::Arc;

/// Create a test configuration serving gpt2
pub fn create_test_config() -> Config {
    Config {
        model: ModelConfig {
            name: "gpt2".to_string(),
            task: "text-generation".to_string(),
        },
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8000,
            environment: "test".to_string(),
            logs: LogsConfig {
                level: "debug".to_string(),
            },
        },
    }
}

/// Router whose model handle is `pipeline`
pub fn create_test_app(pipeline: Option<Arc<MockPipeline>>) -> Router {
    let pipeline = pipeline.map(|p| p as Arc<dyn Pipeline>);
    build_router(AppState::new(
        create_test_config(),
        ComputeDevice::Cpu,
        pipeline,
    ))
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Sample configuration YAML for testing
pub const SAMPLE_CONFIG_YAML: &str = r#"
model:
  name: "distilgpt2"
  task: "text-generation"

server:
  host: "127.0.0.1"
  port: 9100
  environment: "staging"
  logs:
    level: "debug"
"#;
