use rmcp::service::Peer;
use rmcp::transport::TokioChildProcess;
use rmcp::{RoleClient, ServiceExt};
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, info};

use crate::IngestError;

pub const DESCRIPTION_PREVIEW_CHARS: usize = 60;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProbedTool {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProbeReport {
    pub server_name: Option<String>,
    pub tools: Vec<ProbedTool>,
}

/// Spawns an adapter process, completes the handshake, and lists its tools.
///
/// # Errors
/// Returns `IngestError::Probe` if the process cannot start, the handshake
/// fails, or the tool listing fails.
pub async fn probe_command(program: &str, args: &[String]) -> Result<ProbeReport, IngestError> {
    let mut command = Command::new(program);
    command.args(args);
    let transport = TokioChildProcess::new(command)
        .map_err(|err| IngestError::Probe(format!("failed to spawn {program}: {err}")))?;
    let client = ()
        .serve(transport)
        .await
        .map_err(|err| IngestError::Probe(format!("handshake with {program} failed: {err}")))?;
    debug!(program, "handshake complete");

    let report = describe_server(&client).await;
    if let Err(err) = client.cancel().await {
        debug!(error = %err, "client shutdown reported an error");
    }
    report
}

/// Reads the server name and tool catalog from a connected peer.
///
/// # Errors
/// Returns `IngestError::Probe` if the tool listing fails.
pub async fn describe_server(peer: &Peer<RoleClient>) -> Result<ProbeReport, IngestError> {
    let server_name = peer.peer_info().map(|info| info.server_info.name.clone());
    let tools = peer
        .list_all_tools()
        .await
        .map_err(|err| IngestError::Probe(format!("tools/list failed: {err}")))?;
    info!(server = ?server_name, tools = tools.len(), "probed server");
    Ok(ProbeReport {
        server_name,
        tools: tools
            .into_iter()
            .map(|tool| ProbedTool {
                name: tool.name.to_string(),
                description: tool
                    .description
                    .map(|description| description.to_string())
                    .unwrap_or_default(),
            })
            .collect(),
    })
}

/// Shortens a description to `max_chars` characters, marking the cut with `...`.
#[must_use]
pub fn preview(description: &str, max_chars: usize) -> String {
    let mut chars = description.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
