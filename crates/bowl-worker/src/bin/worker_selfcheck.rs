use std::path::Path;

use bowl_media::{check_ffmpeg, check_ffprobe, PoseCapability};
use bowl_worker::OverlayConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = OverlayConfig::from_env();

    println!(
        "worker-selfcheck: starting with work_dir={}",
        config.work_dir.display()
    );
    ensure_workdir(&config.work_dir).await?;
    check_ffmpeg().map_err(|e| anyhow::anyhow!("ffmpeg not available: {e}"))?;
    check_ffprobe().map_err(|e| anyhow::anyhow!("ffprobe not available: {e}"))?;

    match &config.pose {
        PoseCapability::Available { model_path } => {
            println!("worker-selfcheck: pose model {}", model_path.display())
        }
        PoseCapability::Unavailable { reason } => {
            println!("worker-selfcheck: pose unavailable ({reason}), overlays will be skipped")
        }
    }

    println!("worker-selfcheck: ok");
    Ok(())
}

async fn ensure_workdir<P: AsRef<Path>>(path: P) -> anyhow::Result<()> {
    let path = path.as_ref();
    tokio::fs::create_dir_all(path).await?;
    Ok(())
}
