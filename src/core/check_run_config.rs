use anyhow::anyhow;

use crate::models::run_config::RunConfig;

// 超时和断开延迟的上限：一天
pub(crate) const MAX_SECS: f64 = 86_400.0;

pub(crate) fn check_run_config(config: &RunConfig) -> anyhow::Result<()> {
    if config.concurrency == 0 {
        return Err(anyhow!("并发数必须大于0"));
    }
    if !config.abort_ratio.is_finite() || !(0.0..=1.0).contains(&config.abort_ratio) {
        return Err(anyhow!("abort_ratio必须在0到1之间: {}", config.abort_ratio));
    }
    for (name, value) in [
        ("abort_min", config.abort_min_secs),
        ("abort_max", config.abort_max_secs),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(anyhow!("{name}必须是非负数: {value}"));
        }
        if value > MAX_SECS {
            return Err(anyhow!("{name}不能超过{MAX_SECS}秒: {value}"));
        }
    }
    if config.abort_min_secs > config.abort_max_secs {
        return Err(anyhow!(
            "abort_min({})不能大于abort_max({})",
            config.abort_min_secs,
            config.abort_max_secs
        ));
    }
    if !config.timeout_secs.is_finite() || config.timeout_secs <= 0.0 {
        return Err(anyhow!("超时时间必须大于0: {}", config.timeout_secs));
    }
    if config.timeout_secs > MAX_SECS {
        return Err(anyhow!("超时时间不能超过{MAX_SECS}秒: {}", config.timeout_secs));
    }
    Ok(())
}
