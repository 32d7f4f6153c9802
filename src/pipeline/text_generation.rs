use super::{
    GeneratedText, GenerationParams, Pipeline, Task,
    gpt2::{Gpt2Cache, Gpt2Config, Gpt2Model},
    types::DEFAULT_SEED,
};
use crate::{Error, Result};
use async_trait::async_trait;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::generation::LogitsProcessor;
use hf_hub::api::sync::Api;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tokenizers::Tokenizer;
use tracing::{debug, info};

const CONFIG_FILE: &str = "config.json";
const TOKENIZER_FILE: &str = "tokenizer.json";
const WEIGHTS_FILE: &str = "model.safetensors";

/// Paths of the files a text-generation model is built from.
#[derive(Debug, Clone)]
pub struct ModelFiles {
    pub config: PathBuf,
    pub tokenizer: PathBuf,
    pub weights: PathBuf,
}

impl ModelFiles {
    /// Reads from `model_id` when it is a local directory, otherwise fetches
    /// through the Hugging Face Hub cache.
    pub fn resolve(model_id: &str) -> Result<Self> {
        let dir = Path::new(model_id);
        if dir.is_dir() {
            debug!("Using local model directory {}", dir.display());
            return Self::from_dir(dir);
        }

        debug!("Fetching {} from the Hugging Face Hub", model_id);
        let repo = Api::new()?.model(model_id.to_string());
        Ok(Self {
            config: repo.get(CONFIG_FILE)?,
            tokenizer: repo.get(TOKENIZER_FILE)?,
            weights: repo.get(WEIGHTS_FILE)?,
        })
    }

    pub fn from_dir(dir: &Path) -> Result<Self> {
        let files = Self {
            config: dir.join(CONFIG_FILE),
            tokenizer: dir.join(TOKENIZER_FILE),
            weights: dir.join(WEIGHTS_FILE),
        };
        for path in [&files.config, &files.tokenizer, &files.weights] {
            if !path.is_file() {
                return Err(Error::model_load(format!(
                    "missing model file {}",
                    path.display()
                )));
            }
        }
        Ok(files)
    }
}

/// Synchronous causal-LM generation over a loaded model and tokenizer.
pub struct TextGenerator {
    model: Gpt2Model,
    tokenizer: Tokenizer,
}

impl TextGenerator {
    pub fn new(model: Gpt2Model, tokenizer: Tokenizer) -> Self {
        Self { model, tokenizer }
    }

    pub fn load(files: &ModelFiles, device: &Device) -> Result<Self> {
        let config: Gpt2Config = serde_json::from_slice(&std::fs::read(&files.config)?)?;
        if config.model_type != "gpt2" {
            return Err(Error::model_load(format!(
                "unsupported architecture '{}', expected a gpt2 model",
                config.model_type
            )));
        }

        let tokenizer = Tokenizer::from_file(&files.tokenizer).map_err(Error::tokenizer)?;

        // SAFETY: the weights file is not modified while it is mapped.
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(
                std::slice::from_ref(&files.weights),
                DType::F32,
                device,
            )?
        };
        let model = Gpt2Model::load(vb, &config)?;

        Ok(Self::new(model, tokenizer))
    }

    pub fn model(&self) -> &Gpt2Model {
        &self.model
    }

    /// Extends `prompt` token by token until EOS or `max_length` tokens.
    pub fn generate_ids(
        &self,
        prompt: &[u32],
        max_length: usize,
        logits_processor: &mut LogitsProcessor,
    ) -> Result<Vec<u32>> {
        let config = self.model.config();
        let mut tokens = if prompt.is_empty() {
            vec![config.bos_token_id]
        } else {
            prompt.to_vec()
        };

        let mut cache = Gpt2Cache::new(config.n_layer);
        let mut pending = tokens.clone();

        while tokens.len() < max_length {
            let input = Tensor::new(pending.as_slice(), self.model.device())?.unsqueeze(0)?;
            let logits = self.model.forward(&input, &mut cache)?.squeeze(0)?;
            let next = logits_processor.sample(&logits)?;

            tokens.push(next);
            if next == config.eos_token_id {
                break;
            }
            pending = vec![next];
        }

        Ok(tokens)
    }

    pub fn generate(&self, text: &str, params: &GenerationParams) -> Result<Vec<GeneratedText>> {
        if params.num_return_sequences == 0 {
            return Err(Error::invocation("num_return_sequences must be at least 1"));
        }

        let encoding = self.tokenizer.encode(text, false).map_err(Error::tokenizer)?;
        let prompt = encoding.get_ids();

        let seed = params.seed.unwrap_or(DEFAULT_SEED);
        let temperature = if params.do_sample() {
            Some(params.temperature.unwrap_or(1.0))
        } else {
            None
        };

        (0..params.num_return_sequences)
            .map(|i| -> Result<GeneratedText> {
                let mut logits_processor =
                    LogitsProcessor::new(seed.wrapping_add(i as u64), temperature, params.top_p);
                let ids = self.generate_ids(prompt, params.max_length, &mut logits_processor)?;
                let text = self.tokenizer.decode(&ids, true).map_err(Error::tokenizer)?;
                Ok(GeneratedText::new(text))
            })
            .collect()
    }
}

/// `text-generation` pipeline; generation runs on the blocking pool.
pub struct TextGenerationPipeline {
    generator: Arc<TextGenerator>,
}

impl TextGenerationPipeline {
    pub fn new(generator: TextGenerator) -> Self {
        Self {
            generator: Arc::new(generator),
        }
    }

    pub fn load(model_id: &str, device: &Device) -> Result<Self> {
        let files = ModelFiles::resolve(model_id)?;
        let generator = TextGenerator::load(&files, device)?;
        info!(
            "Loaded {} ({} layers, {} positions)",
            model_id,
            generator.model().config().n_layer,
            generator.model().config().n_positions
        );
        Ok(Self::new(generator))
    }
}

#[async_trait]
impl Pipeline for TextGenerationPipeline {
    fn task(&self) -> Task {
        Task::TextGeneration
    }

    async fn generate(&self, text: &str, params: GenerationParams) -> Result<Vec<GeneratedText>> {
        let generator = Arc::clone(&self.generator);
        let text = text.to_string();

        tokio::task::spawn_blocking(move || generator.generate(&text, &params))
            .await
            .map_err(|e| Error::internal(format!("generation task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const TOKENIZER_JSON: &str = r#"{
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [],
        "normalizer": null,
        "pre_tokenizer": { "type": "Whitespace" },
        "post_processor": null,
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": { "<eos>": 0, "hello": 1, "world": 2, "again": 3 },
            "unk_token": "<eos>"
        }
    }"#;

    /// Weights whose logits always peak at `favored`: every layer is zero
    /// except the final norm bias and one embedding row.
    fn weights(config: &Gpt2Config, favored: u32) -> HashMap<String, Tensor> {
        let dev = &Device::Cpu;
        let (v, p, c, inner) = (
            config.vocab_size,
            config.n_positions,
            config.n_embd,
            config.inner_dim(),
        );
        let zeros = |shape: &[usize]| Tensor::zeros(shape, DType::F32, dev).unwrap();

        let mut wte = vec![0f32; v * c];
        wte[favored as usize * c] = 1.0;
        let mut ln_f_bias = vec![0f32; c];
        ln_f_bias[0] = 1.0;

        let mut ts = HashMap::new();
        ts.insert("wte.weight".to_string(), Tensor::from_vec(wte, (v, c), dev).unwrap());
        ts.insert("wpe.weight".to_string(), zeros(&[p, c]));
        ts.insert("ln_f.weight".to_string(), zeros(&[c]));
        ts.insert("ln_f.bias".to_string(), Tensor::from_vec(ln_f_bias, c, dev).unwrap());
        for i in 0..config.n_layer {
            let shapes: [(&str, Vec<usize>); 12] = [
                ("ln_1.weight", vec![c]),
                ("ln_1.bias", vec![c]),
                ("attn.c_attn.weight", vec![c, 3 * c]),
                ("attn.c_attn.bias", vec![3 * c]),
                ("attn.c_proj.weight", vec![c, c]),
                ("attn.c_proj.bias", vec![c]),
                ("ln_2.weight", vec![c]),
                ("ln_2.bias", vec![c]),
                ("mlp.c_fc.weight", vec![c, inner]),
                ("mlp.c_fc.bias", vec![inner]),
                ("mlp.c_proj.weight", vec![inner, c]),
                ("mlp.c_proj.bias", vec![c]),
            ];
            for (name, shape) in shapes {
                ts.insert(format!("h.{i}.{name}"), zeros(&shape));
            }
        }
        ts
    }

    /// Vocabulary of four words where id 0 is both BOS and EOS; greedy
    /// decoding always picks `favored`.
    fn generator(favored: u32) -> TextGenerator {
        let config: Gpt2Config = serde_json::from_value(serde_json::json!({
            "model_type": "gpt2",
            "vocab_size": 4,
            "n_positions": 16,
            "n_embd": 8,
            "n_layer": 1,
            "n_head": 2,
            "bos_token_id": 0,
            "eos_token_id": 0
        }))
        .unwrap();
        let vb = VarBuilder::from_tensors(weights(&config, favored), DType::F32, &Device::Cpu);
        let model = Gpt2Model::load(vb, &config).unwrap();
        let tokenizer = Tokenizer::from_bytes(TOKENIZER_JSON.as_bytes()).unwrap();
        TextGenerator::new(model, tokenizer)
    }

    #[test]
    fn test_greedy_stops_at_eos() {
        let generator = generator(0);
        let mut lp = LogitsProcessor::new(DEFAULT_SEED, None, None);
        let ids = generator.generate_ids(&[1, 2], 10, &mut lp).unwrap();
        assert_eq!(ids, vec![1, 2, 0]);
    }

    #[test]
    fn test_greedy_stops_at_max_length() {
        let generator = generator(3);
        let mut lp = LogitsProcessor::new(DEFAULT_SEED, None, None);
        let ids = generator.generate_ids(&[1, 2], 5, &mut lp).unwrap();
        assert_eq!(ids, vec![1, 2, 3, 3, 3]);
    }

    #[test]
    fn test_prompt_longer_than_max_length_is_returned_unchanged() {
        let generator = generator(3);
        let mut lp = LogitsProcessor::new(DEFAULT_SEED, None, None);
        let ids = generator.generate_ids(&[1, 2, 3], 2, &mut lp).unwrap();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_empty_prompt_starts_from_bos() {
        let generator = generator(3);
        let mut lp = LogitsProcessor::new(DEFAULT_SEED, None, None);
        let ids = generator.generate_ids(&[], 3, &mut lp).unwrap();
        assert_eq!(ids, vec![0, 3, 3]);
    }

    #[test]
    fn test_exceeding_context_window_fails() {
        let generator = generator(3);
        let params = GenerationParams {
            max_length: 40,
            ..GenerationParams::default()
        };
        let err = generator.generate("hello", &params).unwrap_err();
        assert!(err.to_string().contains("context window"));
    }

    #[test]
    fn test_generate_returns_requested_sequences() {
        let generator = generator(0);
        let params = GenerationParams {
            num_return_sequences: 3,
            ..GenerationParams::default()
        };
        let outputs = generator.generate("hello world", &params).unwrap();
        assert_eq!(outputs.len(), 3);
        for output in outputs {
            assert!(output.generated_text.starts_with("hello world"));
        }
    }

    #[test]
    fn test_zero_sequences_is_invocation_error() {
        let generator = generator(0);
        let params = GenerationParams {
            num_return_sequences: 0,
            ..GenerationParams::default()
        };
        let err = generator.generate("hello", &params).unwrap_err();
        assert!(matches!(err, Error::Invocation(_)));
    }

    #[test]
    fn test_missing_local_files() {
        let dir = tempfile::tempdir().unwrap();
        let err = ModelFiles::from_dir(dir.path()).unwrap_err();
        assert!(matches!(err, Error::ModelLoad(_)));
    }

    #[tokio::test]
    async fn test_pipeline_runs_on_blocking_pool() {
        let pipeline = TextGenerationPipeline::new(generator(0));
        assert_eq!(pipeline.task(), Task::TextGeneration);

        let outputs = pipeline
            .generate("hello", GenerationParams::default())
            .await
            .unwrap();
        assert_eq!(outputs.len(), 1);
    }
}
