use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// 目标地址
    #[arg(short, long, default_value = "http://127.0.0.1:8080/v1/chat/completions?stream=true")]
    pub url: String,

    /// 请求体中的模型名称
    #[arg(short, long, default_value = "llama")]
    pub model: String,

    /// 并发数
    #[arg(short, long, default_value_t = 20)]
    pub concurrency: usize,

    /// 总轮数
    #[arg(short, long, default_value_t = 200)]
    pub rounds: u64,

    /// 主动断开的概率（0-1）
    #[arg(long, default_value_t = 0.6)]
    pub abort_ratio: f64,

    /// 主动断开的最小延迟（秒）
    #[arg(long, default_value_t = 0.2)]
    pub abort_min: f64,

    /// 主动断开的最大延迟（秒）
    #[arg(long, default_value_t = 3.0)]
    pub abort_max: f64,

    /// 超时时间（秒）
    #[arg(short, long, default_value_t = 10.0)]
    pub timeout: f64,

    /// 请求体中的max_tokens
    #[arg(long, default_value_t = 64)]
    pub max_tokens: u32,

    /// 保存每轮的原始响应
    #[arg(long, default_value_t = false)]
    pub save_logs: bool,

    /// 原始响应的保存目录
    #[arg(long, default_value = "/tmp/sse_stress")]
    pub out_dir: PathBuf,

    /// 随机数种子，固定后断开计划可复现
    #[arg(long)]
    pub seed: Option<u64>,

    /// 以json输出结果
    #[arg(long, default_value_t = false)]
    pub json: bool,
}
