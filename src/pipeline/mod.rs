pub mod device;
pub mod gpt2;
mod text_generation;
mod types;

pub use device::ComputeDevice;
pub use text_generation::{ModelFiles, TextGenerationPipeline, TextGenerator};
pub use types::*;

use crate::{Error, Result, config::ModelConfig};
use async_trait::async_trait;
use candle_core::Device;
use std::sync::Arc;
use tracing::info;

/// An initialized inference pipeline for one task and one model.
#[async_trait]
pub trait Pipeline: Send + Sync {
    fn task(&self) -> Task;

    async fn generate(&self, text: &str, params: GenerationParams) -> Result<Vec<GeneratedText>>;
}

/// Builds the pipeline for the configured task and model on `device`.
pub async fn load(config: &ModelConfig, device: &Device) -> Result<Arc<dyn Pipeline>> {
    let task: Task = config.task.parse()?;
    info!(
        "Loading model {} for task {} on {}",
        config.name,
        task,
        ComputeDevice::of(device)
    );

    match task {
        Task::TextGeneration => {
            let name = config.name.clone();
            let device = device.clone();
            let pipeline =
                tokio::task::spawn_blocking(move || TextGenerationPipeline::load(&name, &device))
                    .await
                    .map_err(|e| Error::internal(format!("model loading task failed: {}", e)))??;
            Ok(Arc::new(pipeline))
        }
        other => Err(Error::UnsupportedTask {
            task: other.to_string(),
        }),
    }
}
