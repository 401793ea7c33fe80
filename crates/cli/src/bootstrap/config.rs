use netlog_domain::{CliOverrides, Config};
use tracing::info;

pub fn load_config(
    config_path: Option<&str>,
    cli_overrides: CliOverrides,
) -> anyhow::Result<Config> {
    let config = Config::load(config_path, cli_overrides)?;
    config.validate()?;

    info!(
        config_file = config_path.unwrap_or("default"),
        database = %config.database.path,
        batch_size = config.batching.max_batch_size,
        flush_interval_ms = config.batching.flush_interval_ms,
        logs_enabled = config.netlog.logs_enabled,
        "Configuration loaded"
    );

    Ok(config)
}
