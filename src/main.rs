use anyhow::Context;
use std::sync::Arc;

use bhavna::config::Config;
use bhavna::frames::FfmpegExtractor;
use bhavna::pipeline::Pipeline;
use bhavna::{AppState, classifier, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let config = Config::from_env();

    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .with_context(|| format!("failed to create upload folder {:?}", config.upload_dir))?;
    tokio::fs::create_dir_all(&config.frames_work_dir)
        .await
        .with_context(|| format!("failed to create frames dir {:?}", config.frames_work_dir))?;

    // Loaded once; model download and weight mapping block, so keep them off
    // the async workers
    let classifier = {
        let config = config.clone();
        tokio::task::spawn_blocking(move || classifier::build(&config)).await??
    };

    let extractor = Arc::new(FfmpegExtractor::new(
        config.ffmpeg_path.clone(),
        config.ffmpeg_threads,
    ));
    let pipeline = Pipeline::new(
        extractor,
        classifier,
        config.frames_work_dir.clone(),
        config.frame_rate,
    );

    tracing::info!(
        "[server] Uploads in {:?}, frames in {:?}, sampling {} fps",
        config.upload_dir,
        config.frames_work_dir,
        pipeline.frame_rate()
    );

    let addr = format!("0.0.0.0:{}", config.port);
    let state = Arc::new(AppState {
        config,
        pipeline: Arc::new(pipeline),
    });
    let app = bhavna::app(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;

    tracing::info!("[server] Listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
