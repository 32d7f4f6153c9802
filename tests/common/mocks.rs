use async_trait::async_trait;
use model_server::{
    Error, Result,
    pipeline::{GeneratedText, GenerationParams, Pipeline, Task},
};
use std::sync::{Arc, Mutex};

/// Mock pipeline for testing
#[derive(Debug)]
pub struct MockPipeline {
    pub outputs: Vec<GeneratedText>,
    pub requests: Arc<Mutex<Vec<(String, GenerationParams)>>>,
    pub error: Option<String>,
}

impl MockPipeline {
    pub fn new() -> Self {
        Self {
            outputs: vec![GeneratedText::new("Hello, world!")],
            requests: Arc::new(Mutex::new(Vec::new())),
            error: None,
        }
    }

    pub fn with_outputs(mut self, outputs: Vec<GeneratedText>) -> Self {
        self.outputs = outputs;
        self
    }

    pub fn with_error(mut self, error: &str) -> Self {
        self.error = Some(error.to_string());
        self
    }

    pub fn get_requests(&self) -> Vec<(String, GenerationParams)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Pipeline for MockPipeline {
    fn task(&self) -> Task {
        Task::TextGeneration
    }

    async fn generate(&self, text: &str, params: GenerationParams) -> Result<Vec<GeneratedText>> {
        self.requests
            .lock()
            .unwrap()
            .push((text.to_string(), params.clone()));

        if let Some(ref error) = self.error {
            return Err(Error::invocation(error.clone()));
        }

        Ok(self
            .outputs
            .iter()
            .cycle()
            .take(params.num_return_sequences)
            .cloned()
            .collect())
    }
}

impl Default for MockPipeline {
    fn default() -> Self {
        Self::new()
    }
}
