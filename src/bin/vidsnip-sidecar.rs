use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{Value, json};
use vidsnip_core::error::AppError;
use vidsnip_core::options::RawOptions;
use vidsnip_core::{PreviewConfig, sidecar_api};

const STARTUP_CLEANUP_MAX_AGE_HOURS: u64 = 24;

#[derive(Debug, Deserialize)]
struct RpcRequest {
    id: u64,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, serde::Serialize)]
struct RpcSuccess {
    id: u64,
    result: Value,
}

#[derive(Debug, serde::Serialize)]
struct RpcFailure {
    id: u64,
    error: RpcErrorPayload,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct RpcErrorPayload {
    summary: String,
    detail: String,
}

#[derive(Debug, serde::Serialize)]
struct RpcEvent {
    event: String,
    payload: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlanParams {
    duration: f64,
    #[serde(default)]
    options: RawOptions,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommandParams {
    duration: f64,
    #[serde(default)]
    options: RawOptions,
    input_path: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProduceParams {
    input_path: PathBuf,
    #[serde(default)]
    options: RawOptions,
}

#[derive(Debug, Deserialize)]
struct DiscardParams {
    path: PathBuf,
}

type SharedWriter = Arc<Mutex<io::Stdout>>;

fn write_json_line<T: serde::Serialize>(writer: &mut impl Write, value: &T) -> io::Result<()> {
    serde_json::to_writer(&mut *writer, value)
        .map_err(|e| io::Error::other(format!("serialize response: {}", e)))?;
    writer.write_all(b"\n")?;
    writer.flush()
}

fn write_json_line_shared<T: serde::Serialize>(writer: &SharedWriter, value: &T) -> io::Result<()> {
    let mut guard = writer.lock();
    write_json_line(&mut *guard, value)
}

fn emit_rpc_event(writer: &SharedWriter, event: &str, payload: Value) {
    let message = RpcEvent {
        event: event.to_string(),
        payload,
    };
    let _ = write_json_line_shared(writer, &message);
}

fn error_payload(err: &AppError) -> RpcErrorPayload {
    let (summary, detail) = err.summary_and_detail();
    RpcErrorPayload { summary, detail }
}

fn params_from_value<T: serde::de::DeserializeOwned>(params: Value) -> Result<T, AppError> {
    serde_json::from_value(params)
        .map_err(|e| AppError::InvalidRequest(format!("Invalid params payload: {}", e)))
}

fn to_result_value<T: serde::Serialize>(value: T, what: &str) -> Result<Value, AppError> {
    serde_json::to_value(value)
        .map_err(|e| AppError::InvalidRequest(format!("Failed to serialize {}: {}", what, e)))
}

fn dispatch_sync(method: &str, params: Value, config: &PreviewConfig) -> Result<Value, AppError> {
    match method {
        "app.capabilities" => to_result_value(sidecar_api::app_capabilities(), "capabilities"),
        "preview.plan" => {
            let parsed: PlanParams = params_from_value(params)?;
            let planned = sidecar_api::plan_preview(config, parsed.duration, &parsed.options)?;
            to_result_value(planned, "plan")
        }
        "preview.command" => {
            let parsed: CommandParams = params_from_value(params)?;
            let text = sidecar_api::preview_ffmpeg_command(
                config,
                parsed.duration,
                &parsed.options,
                parsed.input_path,
            )?;
            Ok(Value::String(text))
        }
        "preview.discard" => {
            let parsed: DiscardParams = params_from_value(params)?;
            sidecar_api::discard_preview(config, &parsed.path)?;
            Ok(json!({ "discarded": true }))
        }
        _ => Err(AppError::InvalidRequest(format!(
            "Unknown method: {}",
            method
        ))),
    }
}

fn write_response(writer: &SharedWriter, id: u64, result: Result<Value, AppError>) {
    let response = match result {
        Ok(result) => serde_json::to_value(RpcSuccess { id, result })
            .map_err(|e| io::Error::other(format!("serialize success: {}", e))),
        Err(err) => serde_json::to_value(RpcFailure {
            id,
            error: error_payload(&err),
        })
        .map_err(|e| io::Error::other(format!("serialize failure: {}", e))),
    };

    match response {
        Ok(value) => {
            let _ = write_json_line_shared(writer, &value);
        }
        Err(err) => {
            let failure = RpcFailure {
                id,
                error: RpcErrorPayload {
                    summary: "Serialization error".to_string(),
                    detail: err.to_string(),
                },
            };
            let _ = write_json_line_shared(writer, &failure);
        }
    }
}

fn handle_produce(
    request: RpcRequest,
    writer: &SharedWriter,
    config: &PreviewConfig,
    job_id: u64,
) {
    let parsed: ProduceParams = match params_from_value(request.params) {
        Ok(parsed) => parsed,
        Err(err) => {
            write_response(writer, request.id, Err(err));
            return;
        }
    };

    let writer_for_events = Arc::clone(writer);
    let progress: sidecar_api::SidecarProgressEmitter = Arc::new(move |progress| {
        emit_rpc_event(
            &writer_for_events,
            "preview.job.progress",
            json!({ "jobId": job_id, "progress": progress }),
        );
    });

    let result = sidecar_api::produce_preview(
        config,
        &parsed.input_path,
        &parsed.options,
        Some(progress),
    )
    .and_then(|outcome| to_result_value(outcome, "preview result"));

    if let Err(err) = &result {
        log::warn!(
            target: "vidsnip::sidecar",
            "preview.produce failed (jobId={}, input={}): {}",
            job_id,
            parsed.input_path.display(),
            err
        );
    }
    write_response(writer, request.id, result);
}

fn main() -> io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = match PreviewConfig::load(config_path.as_deref()) {
        Ok(config) => Arc::new(config),
        Err(err) => {
            log::error!(target: "vidsnip::sidecar", "Failed to load config: {}", err);
            return Err(io::Error::other(err.to_string()));
        }
    };

    sidecar_api::cleanup_startup(
        &config,
        Duration::from_secs(STARTUP_CLEANUP_MAX_AGE_HOURS * 3600),
    );

    let stdin = io::stdin();
    let stdout: SharedWriter = Arc::new(Mutex::new(io::stdout()));
    let next_job_id = AtomicU64::new(1);
    let mut workers: Vec<thread::JoinHandle<()>> = Vec::new();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                let failure = RpcFailure {
                    id: 0,
                    error: RpcErrorPayload {
                        summary: "Invalid input stream".to_string(),
                        detail: err.to_string(),
                    },
                };
                let _ = write_json_line_shared(&stdout, &failure);
                continue;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        let request: RpcRequest = match serde_json::from_str(&line) {
            Ok(request) => request,
            Err(err) => {
                let failure = RpcFailure {
                    id: 0,
                    error: RpcErrorPayload {
                        summary: "Invalid request".to_string(),
                        detail: err.to_string(),
                    },
                };
                let _ = write_json_line_shared(&stdout, &failure);
                continue;
            }
        };

        if request.method == "preview.produce" {
            let writer = Arc::clone(&stdout);
            let config = Arc::clone(&config);
            let job_id = next_job_id.fetch_add(1, Ordering::Relaxed);
            workers.push(thread::spawn(move || {
                handle_produce(request, &writer, &config, job_id);
            }));
        } else {
            let id = request.id;
            let result = dispatch_sync(&request.method, request.params, &config);
            write_response(&stdout, id, result);
        }
        workers.retain(|w| !w.is_finished());
    }

    for worker in workers {
        let _ = worker.join();
    }
    Ok(())
}
