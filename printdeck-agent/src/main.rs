//! Printdeck Agent - LAN-side status poller
//!
//! Runs on a machine on the same network as the printers (a spare
//! Raspberry Pi works fine). Every sweep it fetches each printer's local
//! status API, wraps the body with the printer's identity and forwards it
//! to the kernel's ingest endpoint. One unreachable printer never stops
//! the sweep; failures are logged and retried on the next interval.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::time::interval;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
struct AgentConfig {
    /// Kernel ingest endpoint.
    post_url: String,
    poll_interval_secs: u64,
    printers: Vec<PrinterConf>,
}

#[derive(Debug, Deserialize, Clone)]
struct PrinterConf {
    name: String,
    ip: String,
    /// X-Api-Key auth, the usual setup for PrusaLink-style firmware.
    api_key: Option<String>,
    /// HTTP basic auth as a fallback for firmwares without key auth.
    username: Option<String>,
    password: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            post_url: "http://localhost:8080/status".into(),
            poll_interval_secs: 60,
            printers: Vec::new(),
        }
    }
}

/// Report shape the kernel expects: identity envelope around the raw
/// status body.
#[derive(Debug, Serialize)]
struct ReportEnvelope<'a> {
    printer: PrinterIdentity<'a>,
    status: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct PrinterIdentity<'a> {
    name: &'a str,
    ip: &'a str,
}

async fn load_config() -> Result<AgentConfig> {
    let path = std::env::var("PRINTDECK_AGENT_CONFIG").unwrap_or_else(|_| "agent.yaml".into());
    if !Path::new(&path).exists() {
        warn!("no {path} found, using default config (no printers)");
        return Ok(AgentConfig::default());
    }
    let txt = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("failed to read {path}"))?;
    serde_yaml::from_str(&txt).with_context(|| format!("invalid config {path}"))
}

/// Fetches one printer's status and forwards it to the kernel.
async fn poll_printer(client: &reqwest::Client, cfg: &AgentConfig, p: &PrinterConf) -> Result<()> {
    let status_url = format!("http://{}/api/v1/status", p.ip);

    let mut req = client.get(&status_url);
    if let Some(key) = &p.api_key {
        req = req.header("X-Api-Key", key);
    } else if let Some(user) = &p.username {
        req = req.basic_auth(user, p.password.as_deref());
    }

    let status: serde_json::Value = req
        .send()
        .await
        .with_context(|| format!("fetch from {status_url} failed"))?
        .error_for_status()
        .with_context(|| format!("{} rejected the status request", p.name))?
        .json()
        .await
        .with_context(|| format!("{} returned a non-JSON status body", p.name))?;

    let envelope = ReportEnvelope {
        printer: PrinterIdentity {
            name: &p.name,
            ip: &p.ip,
        },
        status,
    };

    let resp = client
        .post(&cfg.post_url)
        .json(&envelope)
        .send()
        .await
        .with_context(|| format!("post to {} failed", cfg.post_url))?
        .error_for_status()
        .context("kernel rejected the report")?;

    info!("{} -> {}", p.name, resp.status());
    Ok(())
}

async fn sweep(client: &reqwest::Client, cfg: &AgentConfig) {
    for p in &cfg.printers {
        if let Err(e) = poll_printer(client, cfg, p).await {
            error!("{} ({}): {e:#}", p.name, p.ip);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("printdeck_agent=info")),
        )
        .init();

    let cfg = load_config().await?;
    info!(
        "polling {} printers every {}s -> {}",
        cfg.printers.len(),
        cfg.poll_interval_secs,
        cfg.post_url
    );

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .context("failed to build HTTP client")?;

    let mut timer = interval(Duration::from_secs(cfg.poll_interval_secs.max(1)));
    loop {
        timer.tick().await;
        sweep(&client, &cfg).await;
    }
}
