use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use serde_json::json;

use crate::core::check_run_config::check_run_config;
use crate::models::args::Args;
use crate::models::target::Target;

const PROMPT: &str = "Output many short tokens/words continuously. Keep going.";

/// Validated settings for a single run.
#[derive(Debug, Clone, Serialize)]
pub struct RunConfig {
    pub url: String,
    #[serde(skip)]
    pub target: Target,
    pub model: String,
    pub concurrency: usize,
    pub rounds: u64,
    pub abort_ratio: f64,
    pub abort_min_secs: f64,
    pub abort_max_secs: f64,
    pub timeout_secs: f64,
    pub max_tokens: u32,
    pub out_dir: Option<PathBuf>,
    pub seed: Option<u64>,
}

impl RunConfig {
    /// Defaults mirror the command line; only the target is required.
    pub fn new(url: &str) -> anyhow::Result<Self> {
        Ok(RunConfig {
            url: url.to_string(),
            target: Target::parse(url)?,
            model: "llama".to_string(),
            concurrency: 20,
            rounds: 200,
            abort_ratio: 0.6,
            abort_min_secs: 0.2,
            abort_max_secs: 3.0,
            timeout_secs: 10.0,
            max_tokens: 64,
            out_dir: None,
            seed: None,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_secs)
    }

    pub fn payload(&self) -> anyhow::Result<String> {
        let body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": [{"role": "user", "content": PROMPT}],
        });
        Ok(serde_json::to_string(&body)?)
    }
}

impl TryFrom<Args> for RunConfig {
    type Error = anyhow::Error;

    fn try_from(args: Args) -> anyhow::Result<Self> {
        let config = RunConfig {
            url: args.url.clone(),
            target: Target::parse(&args.url)?,
            model: args.model,
            concurrency: args.concurrency,
            rounds: args.rounds,
            abort_ratio: args.abort_ratio,
            abort_min_secs: args.abort_min,
            abort_max_secs: args.abort_max,
            timeout_secs: args.timeout,
            max_tokens: args.max_tokens,
            out_dir: args.save_logs.then_some(args.out_dir),
            seed: args.seed,
        };
        check_run_config(&config)?;
        Ok(config)
    }
}
