use clap::Parser;
use squall_common::job::JobInput;
use squall_engine::config::PipelineConfig;
use squall_engine::diagnostics::ArtifactStore;
use squall_engine::runner;
use squall_h::backend::HeadlessBackend;
use squall_h::store::{LocalDataset, LocalKeyValueStore};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Job input JSON file ({"address": "..."})
    #[arg(long)]
    input: Option<PathBuf>,

    /// Run the browser headed (local runs only)
    #[arg(long)]
    visible: bool,

    /// Override the target application URL
    #[arg(long)]
    url: Option<String>,

    /// Directory for results and debug artifacts
    #[arg(long, default_value = "storage")]
    storage: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let hosted = is_hosted();

    // Fail before any browser exists when the input is unusable.
    let input = load_input(args.input.as_deref(), hosted)?;

    let mut config = PipelineConfig::default();
    if let Some(url) = args.url {
        config.target_url = url;
    }

    let mut store = LocalKeyValueStore::new(args.storage.join("key_value"));
    let mut sink = LocalDataset::new(args.storage.join("dataset.jsonl"));

    // Hosted runs are always headless and record the screen.
    let mut backend = HeadlessBackend::new(args.visible && !hosted, hosted);

    let result = runner::run_job(&mut backend, &mut store, &mut sink, &input, &config).await;

    if let Some(path) = backend.recording_path() {
        upload_recording(&mut store, path).await;
    }

    let record = result?;
    tracing::info!(
        address = %record.address,
        wind_speed = record.wind_speed.as_deref().unwrap_or_default(),
        "run complete"
    );
    Ok(())
}

fn is_hosted() -> bool {
    match std::env::var("SQUALL_AT_HOME") {
        Ok(value) => {
            let normalized = value.trim().to_ascii_lowercase();
            normalized == "1" || normalized == "true" || normalized == "yes" || normalized == "on"
        }
        Err(_) => false,
    }
}

/// Resolves the job input: an explicit file, the SQUALL_INPUT_FILE override,
/// the default input.json, and (local runs only) local_input.json.
fn load_input(path: Option<&Path>, hosted: bool) -> Result<JobInput, Box<dyn std::error::Error>> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Some(p) = path {
        candidates.push(p.to_path_buf());
    }
    if let Ok(p) = std::env::var("SQUALL_INPUT_FILE") {
        candidates.push(PathBuf::from(p));
    }
    candidates.push(PathBuf::from("input.json"));
    if !hosted {
        candidates.push(PathBuf::from("local_input.json"));
    }

    for candidate in candidates {
        let Ok(raw) = std::fs::read_to_string(&candidate) else {
            continue;
        };
        let value: serde_json::Value = serde_json::from_str(&raw)
            .map_err(|e| format!("Invalid input JSON in {}: {}", candidate.display(), e))?;
        let address = value
            .get("address")
            .and_then(|a| a.as_str())
            .unwrap_or_default()
            .trim()
            .to_string();
        if address.is_empty() {
            return Err(format!(
                "Input must contain \"address\" field. ({})",
                candidate.display()
            )
            .into());
        }
        tracing::info!("Loaded job input from {}", candidate.display());
        return Ok(JobInput { address });
    }

    Err("Input must contain \"address\" field.".into())
}

async fn upload_recording(store: &mut LocalKeyValueStore, path: &Path) {
    match tokio::fs::read(path).await {
        Ok(bytes) if !bytes.is_empty() => {
            if let Err(e) = store.put("RUN_VIDEO", &bytes, "video/webm").await {
                tracing::warn!("Failed to upload recording: {}", e);
            }
        }
        Ok(_) => tracing::debug!("Recording file is empty, skipping upload"),
        Err(e) => tracing::warn!("Recording file unreadable: {}", e),
    }
}
