//! GPT-2 family causal language model built on `candle-nn`.
//!
//! Checkpoints store the attention and MLP projections in Conv1D layout
//! (`[in, out]`), so they are transposed once at load time into regular
//! linear layers. The LM head shares its weights with the token embedding.

use candle_core::{D, Device, Module, Result as CandleResult, Tensor};
use candle_nn::{Embedding, LayerNorm, Linear, VarBuilder, embedding, layer_norm};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Gpt2Config {
    #[serde(default)]
    pub model_type: String,
    pub vocab_size: usize,
    pub n_positions: usize,
    pub n_embd: usize,
    pub n_layer: usize,
    pub n_head: usize,
    #[serde(default)]
    pub n_inner: Option<usize>,
    #[serde(default = "default_layer_norm_epsilon")]
    pub layer_norm_epsilon: f64,
    #[serde(default = "default_special_token_id")]
    pub bos_token_id: u32,
    #[serde(default = "default_special_token_id")]
    pub eos_token_id: u32,
}

fn default_layer_norm_epsilon() -> f64 {
    1e-5
}

fn default_special_token_id() -> u32 {
    50256
}

impl Gpt2Config {
    pub fn inner_dim(&self) -> usize {
        self.n_inner.unwrap_or(4 * self.n_embd)
    }
}

/// Keys and values of every layer for the tokens seen so far.
#[derive(Debug, Clone)]
pub struct Gpt2Cache {
    layers: Vec<Option<(Tensor, Tensor)>>,
    seq_len: usize,
}

impl Gpt2Cache {
    pub fn new(n_layer: usize) -> Self {
        Self {
            layers: vec![None; n_layer],
            seq_len: 0,
        }
    }

    /// Number of positions already processed.
    pub fn seq_len(&self) -> usize {
        self.seq_len
    }
}

fn conv1d(in_dim: usize, out_dim: usize, vb: VarBuilder) -> CandleResult<Linear> {
    let weight = vb.get((in_dim, out_dim), "weight")?.t()?.contiguous()?;
    let bias = vb.get(out_dim, "bias")?;
    Ok(Linear::new(weight, Some(bias)))
}

fn causal_mask(seq_len: usize, past_len: usize, device: &Device) -> CandleResult<Tensor> {
    let total = past_len + seq_len;
    let mask: Vec<f32> = (0..seq_len)
        .flat_map(|i| {
            (0..total).map(move |j| {
                if j > i + past_len {
                    f32::NEG_INFINITY
                } else {
                    0.0
                }
            })
        })
        .collect();
    Tensor::from_slice(&mask, (seq_len, total), device)
}

struct Attention {
    c_attn: Linear,
    c_proj: Linear,
    n_head: usize,
    head_dim: usize,
}

impl Attention {
    fn load(vb: VarBuilder, cfg: &Gpt2Config) -> CandleResult<Self> {
        if cfg.n_embd % cfg.n_head != 0 {
            candle_core::bail!(
                "n_embd ({}) is not divisible by n_head ({})",
                cfg.n_embd,
                cfg.n_head
            );
        }
        Ok(Self {
            c_attn: conv1d(cfg.n_embd, 3 * cfg.n_embd, vb.pp("c_attn"))?,
            c_proj: conv1d(cfg.n_embd, cfg.n_embd, vb.pp("c_proj"))?,
            n_head: cfg.n_head,
            head_dim: cfg.n_embd / cfg.n_head,
        })
    }

    fn forward(
        &self,
        xs: &Tensor,
        mask: Option<&Tensor>,
        cache: &mut Option<(Tensor, Tensor)>,
    ) -> CandleResult<Tensor> {
        let (b, t, c) = xs.dims3()?;
        let qkv = self.c_attn.forward(xs)?;

        let split_heads = |offset: usize| -> CandleResult<Tensor> {
            qkv.narrow(D::Minus1, offset, c)?
                .reshape((b, t, self.n_head, self.head_dim))?
                .transpose(1, 2)?
                .contiguous()
        };
        let q = split_heads(0)?;
        let k = split_heads(c)?;
        let v = split_heads(2 * c)?;

        let (k, v) = match cache.take() {
            Some((past_k, past_v)) => (
                Tensor::cat(&[&past_k, &k], 2)?,
                Tensor::cat(&[&past_v, &v], 2)?,
            ),
            None => (k, v),
        };
        *cache = Some((k.clone(), v.clone()));

        let scores = (q.matmul(&k.t()?.contiguous()?)? / (self.head_dim as f64).sqrt())?;
        let scores = match mask {
            Some(mask) => scores.broadcast_add(mask)?,
            None => scores,
        };
        let weights = candle_nn::ops::softmax_last_dim(&scores)?;

        let ys = weights
            .matmul(&v)?
            .transpose(1, 2)?
            .reshape((b, t, c))?;
        self.c_proj.forward(&ys)
    }
}

struct Mlp {
    c_fc: Linear,
    c_proj: Linear,
}

impl Mlp {
    fn load(vb: VarBuilder, cfg: &Gpt2Config) -> CandleResult<Self> {
        let inner = cfg.inner_dim();
        Ok(Self {
            c_fc: conv1d(cfg.n_embd, inner, vb.pp("c_fc"))?,
            c_proj: conv1d(inner, cfg.n_embd, vb.pp("c_proj"))?,
        })
    }

    fn forward(&self, xs: &Tensor) -> CandleResult<Tensor> {
        // gelu_new: tanh approximation
        self.c_proj.forward(&self.c_fc.forward(xs)?.gelu()?)
    }
}

struct Block {
    ln_1: LayerNorm,
    attn: Attention,
    ln_2: LayerNorm,
    mlp: Mlp,
}

impl Block {
    fn load(vb: VarBuilder, cfg: &Gpt2Config) -> CandleResult<Self> {
        Ok(Self {
            ln_1: layer_norm(cfg.n_embd, cfg.layer_norm_epsilon, vb.pp("ln_1"))?,
            attn: Attention::load(vb.pp("attn"), cfg)?,
            ln_2: layer_norm(cfg.n_embd, cfg.layer_norm_epsilon, vb.pp("ln_2"))?,
            mlp: Mlp::load(vb.pp("mlp"), cfg)?,
        })
    }

    fn forward(
        &self,
        xs: &Tensor,
        mask: Option<&Tensor>,
        cache: &mut Option<(Tensor, Tensor)>,
    ) -> CandleResult<Tensor> {
        let xs = (xs + self.attn.forward(&self.ln_1.forward(xs)?, mask, cache)?)?;
        &xs + self.mlp.forward(&self.ln_2.forward(&xs)?)?
    }
}

pub struct Gpt2Model {
    wte: Embedding,
    wpe: Embedding,
    blocks: Vec<Block>,
    ln_f: LayerNorm,
    lm_head: Linear,
    config: Gpt2Config,
    device: Device,
}

impl Gpt2Model {
    pub fn load(vb: VarBuilder, config: &Gpt2Config) -> CandleResult<Self> {
        // Hub checkpoints saved from the LM-head model carry a prefix.
        let vb = if vb.contains_tensor("transformer.wte.weight") {
            vb.pp("transformer")
        } else {
            vb
        };

        let wte = embedding(config.vocab_size, config.n_embd, vb.pp("wte"))?;
        let wpe = embedding(config.n_positions, config.n_embd, vb.pp("wpe"))?;
        let blocks = (0..config.n_layer)
            .map(|i| Block::load(vb.pp(format!("h.{i}")), config))
            .collect::<CandleResult<Vec<_>>>()?;
        let ln_f = layer_norm(config.n_embd, config.layer_norm_epsilon, vb.pp("ln_f"))?;
        let lm_head = Linear::new(wte.embeddings().clone(), None);

        Ok(Self {
            wte,
            wpe,
            blocks,
            ln_f,
            lm_head,
            config: config.clone(),
            device: vb.device().clone(),
        })
    }

    pub fn config(&self) -> &Gpt2Config {
        &self.config
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Runs `input_ids` (`[batch, seq]`, u32) after the positions already in
    /// `cache` and returns the next-token logits `[batch, vocab]`.
    pub fn forward(&self, input_ids: &Tensor, cache: &mut Gpt2Cache) -> CandleResult<Tensor> {
        let (_b, t) = input_ids.dims2()?;
        let past_len = cache.seq_len;
        if t == 0 {
            candle_core::bail!("empty input sequence");
        }
        if past_len + t > self.config.n_positions {
            candle_core::bail!(
                "sequence length {} exceeds the model context window of {} tokens",
                past_len + t,
                self.config.n_positions
            );
        }

        let positions = Tensor::arange(past_len as u32, (past_len + t) as u32, &self.device)?;
        let mut xs = self
            .wte
            .forward(input_ids)?
            .broadcast_add(&self.wpe.forward(&positions)?)?;

        let mask = if t > 1 {
            Some(causal_mask(t, past_len, &self.device)?)
        } else {
            None
        };

        for (block, layer_cache) in self.blocks.iter().zip(cache.layers.iter_mut()) {
            xs = block.forward(&xs, mask.as_ref(), layer_cache)?;
        }
        cache.seq_len += t;

        let last = self.ln_f.forward(&xs)?.narrow(1, t - 1, 1)?.squeeze(1)?;
        self.lm_head.forward(&last)
    }
}
