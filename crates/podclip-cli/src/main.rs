//! podclip task binary.
//!
//! Reads one JSON task request from stdin, dispatches to the rendering
//! pipeline, streams progress events to stderr, and writes the final
//! JSON result to stdout.

mod presets;
mod task;

use std::io::Read;
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use podclip_media::{AudioEnergyAnalyzer, BatchRenderer, ClipRenderer, RenderConfig};

use presets::{get_preset, Preset};
use task::{
    AnalyzeEnergyParams, BatchClipsParams, CreateClipParams, ProgressEvent, TaskRequest,
    TaskResult, TaskType,
};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    let mut raw = String::new();
    if let Err(e) = std::io::stdin().read_to_string(&mut raw) {
        emit(&TaskResult::error("unknown", format!("failed to read stdin: {}", e)));
        std::process::exit(1);
    }

    let request: TaskRequest = match serde_json::from_str(&raw) {
        Ok(request) => request,
        Err(e) => {
            emit(&TaskResult::error("unknown", format!("invalid task JSON: {}", e)));
            return;
        }
    };

    info!(task_id = %request.task_id, task_type = ?request.task_type, "Task received");
    let result = dispatch(request).await;
    emit(&result);
}

fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("podclip=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

fn emit(result: &TaskResult) {
    match serde_json::to_string(result) {
        Ok(json) => println!("{}", json),
        Err(e) => error!("Failed to serialize result: {}", e),
    }
}

fn emit_progress(task_id: &str, stage: &str, percent: u8, message: &str) {
    let event = ProgressEvent {
        task_id: task_id.to_string(),
        stage: stage.to_string(),
        percent,
        message: message.to_string(),
    };
    if let Ok(json) = serde_json::to_string(&event) {
        eprintln!("{}", json);
    }
}

async fn dispatch(request: TaskRequest) -> TaskResult {
    let task_id = request.task_id.clone();
    let outcome = match request.task_type {
        TaskType::Ping => handle_ping().await,
        TaskType::CreateClip => handle_create_clip(&task_id, request.params).await,
        TaskType::BatchClips => handle_batch_clips(&task_id, request.params).await,
        TaskType::AnalyzeEnergy => handle_analyze_energy(request.params).await,
        TaskType::EncoderInfo => handle_encoder_info().await,
    };

    match outcome {
        Ok(data) => TaskResult::success(task_id, data),
        Err(e) => {
            error!(task_id = %task_id, "Task failed: {:#}", e);
            TaskResult::error(task_id, format!("{:#}", e))
        }
    }
}

async fn handle_ping() -> anyhow::Result<serde_json::Value> {
    Ok(serde_json::json!({
        "message": "pong",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Resolve the effective config: env defaults, then preset, then any
/// explicit output dir from the params.
fn resolve_config(preset: Option<&str>, output_dir: Option<&str>) -> anyhow::Result<(RenderConfig, Preset)> {
    let preset = match preset {
        Some(name) => get_preset(name)?,
        None => Preset::default(),
    };
    let mut config = RenderConfig::from_env()
        .with_time_adjust(preset.time_adjust)
        .with_target_lufs(preset.target_lufs)
        .with_max_clip_secs(preset.max_clip_duration);
    if let Some(dir) = output_dir {
        config = config.with_output_dir(dir);
    }
    Ok((config, preset))
}

async fn handle_create_clip(
    task_id: &str,
    params: serde_json::Value,
) -> anyhow::Result<serde_json::Value> {
    let params: CreateClipParams = serde_json::from_value(params)?;
    let (config, preset) = resolve_config(params.preset.as_deref(), params.output_dir.as_deref())?;

    let mut request = params.request;
    if request.logo_path.is_none() {
        request.logo_path = preset.logo_path.clone();
    }
    if request.outro_path.is_none() {
        request.outro_path = preset.outro_path.clone();
    }

    let renderer = ClipRenderer::new(config);
    let id = task_id.to_string();
    let result = renderer
        .render_with_progress(
            &request,
            &params.transcript_words,
            Arc::new(move |pct: u8, msg: &str| emit_progress(&id, "processing", pct, msg)),
        )
        .await?;

    Ok(serde_json::to_value(result)?)
}

async fn handle_batch_clips(
    task_id: &str,
    params: serde_json::Value,
) -> anyhow::Result<serde_json::Value> {
    let params: BatchClipsParams = serde_json::from_value(params)?;
    let (config, preset) = resolve_config(params.preset.as_deref(), params.output_dir.as_deref())?;

    let requests: Vec<_> = params
        .clips
        .into_iter()
        .map(|mut request| {
            if request.logo_path.is_none() {
                request.logo_path = preset.logo_path.clone();
            }
            if request.outro_path.is_none() {
                request.outro_path = preset.outro_path.clone();
            }
            request
        })
        .collect();

    let total = requests.len().max(1);
    let id = task_id.to_string();
    let batch = BatchRenderer::new(ClipRenderer::new(config));
    let report = batch
        .render_all_with_progress(&requests, &params.transcript_words, move |index, pct, msg| {
            // Fold per-clip progress into one 0-100 batch scale
            let overall = ((index * 100 + pct as usize) / total).min(100) as u8;
            emit_progress(&id, "batch", overall, msg);
        })
        .await?;

    Ok(serde_json::to_value(report)?)
}

async fn handle_analyze_energy(params: serde_json::Value) -> anyhow::Result<serde_json::Value> {
    let params: AnalyzeEnergyParams = serde_json::from_value(params)?;
    let analyzer = AudioEnergyAnalyzer::new();
    let profile = analyzer
        .analyze(&params.source_path, &params.segments)
        .await?;
    Ok(serde_json::to_value(profile)?)
}

async fn handle_encoder_info() -> anyhow::Result<serde_json::Value> {
    let profile = podclip_media::encoder::detect().await?;
    Ok(serde_json::to_value(profile)?)
}
