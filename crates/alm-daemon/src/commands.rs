//! Command implementations for the `alm` binary.

use std::fs;

use anyhow::{Context, Result};
use tracing::{info, warn};

use alm_agents::{retrieve_cheat_sheet_context, Services};
use alm_ingest::extract_statements;
use alm_types::{ErrorStatement, Settings};

/// Load configuration and install the tracing subscriber.
///
/// `RUST_LOG` wins over the configured level; `log_level_override` wins
/// over the config file and environment.
pub fn init(config_path: Option<&str>, log_level_override: Option<&str>) -> Result<Settings> {
    let mut settings = Settings::load(config_path).context("Failed to load configuration")?;
    if let Some(log_level) = log_level_override {
        settings.log_level = log_level.to_string();
    }

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.log_level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    Ok(settings)
}

/// Render extracted statements, one block per statement or a JSON array.
pub fn render_statements(statements: &[ErrorStatement], json: bool) -> Result<String> {
    if json {
        return serde_json::to_string_pretty(statements).context("Failed to serialize statements");
    }

    let mut out = String::new();
    for (i, statement) in statements.iter().enumerate() {
        out.push_str(&format!(
            "[{}] level={} host={}\n{}\n\n",
            i + 1,
            statement.level,
            statement.host.as_deref().unwrap_or("-"),
            statement.message
        ));
    }
    Ok(out)
}

/// Print the error statements of a log file.
pub fn extract_file(path: &str, json: bool) -> Result<()> {
    let raw = fs::read_to_string(path).with_context(|| format!("Failed to read {path}"))?;
    let statements = extract_statements(&raw);
    info!(file = path, statements = statements.len(), "Extracted error statements");
    print!("{}", render_statements(&statements, json)?);
    Ok(())
}

/// Returns whether a READY build is published.
pub async fn check_ready(settings: &Settings) -> Result<bool> {
    let services = Services::init(settings).context("Failed to initialize services")?;
    let ready = services.loader().check_ready().await;
    println!("{}", if ready { "ready" } else { "not ready" });
    services.shutdown().await;
    Ok(ready)
}

/// Poll until ready; returns whether the index became ready in time.
pub async fn wait_ready(settings: &Settings, timeout_secs: Option<u64>) -> Result<bool> {
    let mut settings = settings.clone();
    if let Some(secs) = timeout_secs {
        settings.rag.ready_timeout_secs = secs;
    }
    let services = Services::init(&settings).context("Failed to initialize services")?;
    let ready = services.wait_for_index().await;
    println!("{}", if ready { "ready" } else { "timed out" });
    services.shutdown().await;
    Ok(ready)
}

/// Load the published bundle and print its summary.
pub async fn load_index(settings: &Settings) -> Result<()> {
    let services = Services::init(settings).context("Failed to initialize services")?;
    let bundle = services
        .loader()
        .load()
        .await
        .context("Failed to load RAG index")?;

    println!("build_id: {}", bundle.build_id().unwrap_or("unknown"));
    println!("model: {}", bundle.model_name().unwrap_or("unknown"));
    println!("dimension: {}", bundle.dimension());
    println!("vectors: {}", bundle.vector_count());
    println!("records: {}", bundle.record_count());
    services.shutdown().await;
    Ok(())
}

/// Embed `text` and print the formatted context.
///
/// A bundle that cannot be loaded is logged and the command continues, so
/// the output degrades to an empty context the same way an alert would.
pub async fn print_context(settings: &Settings, text: &str, k: Option<usize>) -> Result<()> {
    let services = Services::init(settings).context("Failed to initialize services")?;
    if let Err(e) = services.loader().load().await {
        warn!(error = %e, "RAG index not loaded");
    }

    let k = k.unwrap_or(settings.rag.top_k);
    let context = retrieve_cheat_sheet_context(
        services.embedder().as_ref(),
        services.context(),
        text,
        k,
    )
    .await
    .context("Failed to build context")?;

    if context.is_empty() {
        warn!("No context retrieved");
    }
    print!("{context}");
    services.shutdown().await;
    Ok(())
}
