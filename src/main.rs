mod batch;
mod config;
mod discovery;
mod progress;

fn init_logging() -> anyhow::Result<()> {
    let logger = env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .build();
    progress::SuspendingLogger::new(logger).install()?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging()?;
    frame_transcoder::init()?;

    let config = config::config();
    batch::run(config).await?;
    Ok(())
}
