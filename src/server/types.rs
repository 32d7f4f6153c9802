use crate::pipeline::{
    ComputeDevice, DEFAULT_MAX_LENGTH, DEFAULT_NUM_RETURN_SEQUENCES, GeneratedText,
    GenerationParams,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub text: String,
    #[serde(default = "default_max_length")]
    pub max_length: usize,
    #[serde(default = "default_num_return_sequences")]
    pub num_return_sequences: usize,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub top_p: Option<f64>,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl GenerateRequest {
    pub fn params(&self) -> GenerationParams {
        GenerationParams {
            max_length: self.max_length,
            num_return_sequences: self.num_return_sequences,
            temperature: self.temperature,
            top_p: self.top_p,
            seed: self.seed,
        }
    }
}

fn default_max_length() -> usize {
    DEFAULT_MAX_LENGTH
}

fn default_num_return_sequences() -> usize {
    DEFAULT_NUM_RETURN_SEQUENCES
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub result: Vec<GeneratedText>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub model: String,
    pub task: String,
    pub environment: String,
    pub model_loaded: bool,
    pub device: ComputeDevice,
}

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: &'static str,
    pub docs: &'static str,
}

#[derive(Debug, Serialize)]
pub struct EndpointDoc {
    pub method: &'static str,
    pub path: &'static str,
    pub summary: &'static str,
}

#[derive(Debug, Serialize)]
pub struct DocsResponse {
    pub title: &'static str,
    pub version: &'static str,
    pub endpoints: Vec<EndpointDoc>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}
