use switchyard::config::Config;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "switchyard=info".into()),
        )
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load()?;
    tracing::info!(
        listen = %cfg.listen_addr(),
        scheduler = ?cfg.server.scheduler,
        "Starting"
    );

    switchyard::server::run(&cfg)
}
