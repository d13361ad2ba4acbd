use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use clap::{Parser, Subcommand};
use draftloom_context::{spawn_sweeper, ContextStore, FileJsonPersistence};
use draftloom_factcheck::FactCheckEngine;
use draftloom_observability::{canonical_logs_dir_from_root, init_process_logging, ProcessKind};
use draftloom_orchestrator::Orchestrator;
use draftloom_providers::{ProviderConfig, ProviderRegistry, ProvidersConfig, WorkerClient};
use draftloom_resilience::{CircuitBreakerRegistry, CostLedger, RateLimiter, ResponseCache};
use draftloom_router::Router;
use draftloom_types::{OrchestratorConfig, OrchestratorError, Request, WorkerKind};
use draftloom_workers::{FactCheckWorker, PromptWorker, WorkerRegistry};
use serde_json::json;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "draftloom-engine")]
#[command(about = "Headless multi-agent writing orchestration backend")]
struct Cli {
    #[arg(long, env = "DRAFTLOOM_STATE_DIR", default_value = ".draftloom")]
    state_dir: String,

    /// Repeatable config override, e.g. `--set max_concurrent_requests=20`.
    #[arg(long = "set", value_parser = parse_key_val)]
    overrides: Vec<(String, serde_json::Value)>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP dispatch surface.
    Serve {
        #[arg(long, alias = "host", default_value = "127.0.0.1")]
        hostname: String,
        #[arg(long, default_value_t = 4900)]
        port: u16,
    },
    /// Submit a single request and print the response.
    Submit {
        user_id: String,
        project_id: String,
        content: String,
        #[arg(long)]
        conversation_id: Option<String>,
        #[arg(long)]
        worker: Option<String>,
    },
    /// Print a user's monthly budget status.
    Status { user_id: String },
}

fn parse_key_val(raw: &str) -> Result<(String, serde_json::Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{raw}`"))?;
    let parsed = serde_json::from_str(value).unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Ok((key.to_string(), parsed))
}

fn parse_worker_kind(raw: &str) -> anyhow::Result<WorkerKind> {
    match raw {
        "ideation" => Ok(WorkerKind::Ideation),
        "refiner" => Ok(WorkerKind::Refiner),
        "media" => Ok(WorkerKind::Media),
        "factchecker" => Ok(WorkerKind::Factchecker),
        other => anyhow::bail!("unknown worker `{other}`, expected one of ideation|refiner|media|factchecker"),
    }
}

struct Runtime {
    orchestrator: Arc<Orchestrator>,
    ledger: Arc<CostLedger>,
}

/// Loads configuration with precedence defaults -> state-dir file -> env var
/// -> `--set` CLI overrides.
fn load_config(state_dir: &Path, overrides: &[(String, serde_json::Value)]) -> anyhow::Result<OrchestratorConfig> {
    let mut config = OrchestratorConfig::default();

    let config_path = state_dir.join("config.json");
    if let Ok(bytes) = std::fs::read(&config_path) {
        let file_value: serde_json::Value =
            serde_json::from_slice(&bytes).with_context(|| format!("parsing {}", config_path.display()))?;
        config = config.merge_override(file_value)?;
    }

    if let Ok(raw) = std::env::var("DRAFTLOOM_CONFIG") {
        let env_value: serde_json::Value = serde_json::from_str(&raw).context("parsing DRAFTLOOM_CONFIG")?;
        config = config.merge_override(env_value)?;
    }

    for (key, value) in overrides {
        config = config.merge_override(json!({ key: value }))?;
    }

    Ok(config)
}

/// Builds `ProvidersConfig` from whichever provider API keys are present in
/// the environment; with none set, provider registration falls back to
/// whatever local/no-op provider the registry defaults to.
fn providers_config_from_env() -> ProvidersConfig {
    let mut providers = HashMap::new();
    for (id, env_name) in [
        ("openai", "OPENAI_API_KEY"),
        ("openrouter", "OPENROUTER_API_KEY"),
        ("groq", "GROQ_API_KEY"),
    ] {
        if let Ok(key) = std::env::var(env_name) {
            if !key.trim().is_empty() {
                providers.insert(
                    id.to_string(),
                    ProviderConfig {
                        api_key: Some(key),
                        url: None,
                        default_model: None,
                    },
                );
            }
        }
    }
    ProvidersConfig {
        providers,
        default_provider: std::env::var("DRAFTLOOM_DEFAULT_PROVIDER").ok(),
    }
}

async fn build_runtime(state_dir: &Path, config: OrchestratorConfig) -> anyhow::Result<Runtime> {
    let providers = ProviderRegistry::new(providers_config_from_env());
    let breakers = CircuitBreakerRegistry::new(config.circuit_breaker.clone());
    let ledger = Arc::new(CostLedger::new(config.monthly_budget_usd));

    let client = Arc::new(WorkerClient::new(
        providers.clone(),
        ResponseCache::new(),
        breakers,
        ledger.clone(),
        config.retries.clone(),
        config.cache_ttl.clone(),
        Duration::from_millis(config.request_timeout_ms),
        config.usd_per_token,
    ));

    let mut workers = WorkerRegistry::new();
    for kind in [WorkerKind::Ideation, WorkerKind::Refiner, WorkerKind::Media] {
        workers.register(Arc::new(PromptWorker::new(
            kind,
            config.max_context_length,
            "gpt-4o-mini",
            None,
            client.clone(),
        )));
    }

    let factcheck_engine = Arc::new(FactCheckEngine::new(
        providers.clone(),
        std::env::var("DRAFTLOOM_SEARCH_API_KEY").ok(),
        config.circuit_breaker.clone(),
        config.trusted_domains.clone(),
    ));
    workers.register(Arc::new(FactCheckWorker::new(config.max_context_length, factcheck_engine)));

    let context_store = Arc::new(ContextStore::new(
        config.context_cache_size,
        Duration::from_millis(config.context_ttl_ms),
        Arc::new(FileJsonPersistence::new(state_dir.join("context"))),
    ));
    spawn_sweeper(context_store.clone(), Duration::from_secs(60));

    let router = Arc::new(Router::new(config.fallback_worker));
    let rate_limiter = Arc::new(RateLimiter::new(Duration::from_secs(60), config.max_requests_per_minute));

    let orchestrator = Arc::new(Orchestrator::new(
        config,
        router,
        workers,
        context_store,
        rate_limiter,
        ledger.clone(),
    ));

    Ok(Runtime { orchestrator, ledger })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let state_dir = PathBuf::from(&cli.state_dir);
    std::fs::create_dir_all(&state_dir).ok();

    let config = load_config(&state_dir, &cli.overrides)?;
    let process_kind = match &cli.command {
        Command::Serve { .. } => ProcessKind::Serve,
        Command::Submit { .. } => ProcessKind::Submit,
        Command::Status { .. } => ProcessKind::Status,
    };
    let logs_dir = canonical_logs_dir_from_root(&state_dir);
    let _guard = init_process_logging(process_kind, &logs_dir, config.log_retention_days).ok();

    match cli.command {
        Command::Serve { hostname, port } => {
            let runtime = build_runtime(&state_dir, config).await?;
            let addr: SocketAddr = format!("{hostname}:{port}").parse().context("invalid hostname or port")?;
            info!("starting draftloom-engine on http://{addr}");
            serve(addr, runtime.orchestrator).await?;
        }
        Command::Submit {
            user_id,
            project_id,
            content,
            conversation_id,
            worker,
        } => {
            let preferred_worker = worker.as_deref().map(parse_worker_kind).transpose()?;
            let runtime = build_runtime(&state_dir, config).await?;
            let request = Request {
                user_id,
                project_id,
                conversation_id,
                content,
                preferred_worker,
                options: HashMap::new(),
            };
            match runtime.orchestrator.process(request).await {
                Ok(response) => println!("{}", serde_json::to_string_pretty(&response)?),
                Err(err) => {
                    eprintln!("{}", serde_json::to_string_pretty(&error_body(&err))?);
                    std::process::exit(1);
                }
            }
        }
        Command::Status { user_id } => {
            let runtime = build_runtime(&state_dir, config).await?;
            let status = runtime.ledger.status(&user_id).await;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }

    Ok(())
}

#[derive(Clone)]
struct AppState {
    orchestrator: Arc<Orchestrator>,
}

async fn serve(addr: SocketAddr, orchestrator: Arc<Orchestrator>) -> anyhow::Result<()> {
    let app = axum::Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/v1/process", post(handle_process))
        .with_state(AppState { orchestrator });

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn handle_process(State(state): State<AppState>, Json(request): Json<Request>) -> impl IntoResponse {
    match state.orchestrator.process(request).await {
        Ok(response) => (StatusCode::OK, Json(json!(response))).into_response(),
        Err(err) => {
            let status = StatusCode::from_u16(err.http_like_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(error_body(&err))).into_response()
        }
    }
}

fn error_body(err: &OrchestratorError) -> serde_json::Value {
    json!({
        "kind": err.kind(),
        "http_like_status": err.http_like_status(),
        "message": err.to_string(),
    })
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received, draining in-flight requests");
}
