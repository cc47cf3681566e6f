//! Command implementations for aidectl. Output is ASCII only.

use crate::client::AideClient;
use crate::params::parse_params;
use aide_common::{MonitorState, MonitorStatus, ResultEnvelope, Role};
use anyhow::Result;
use owo_colors::OwoColorize;

/// One-line status tag for an envelope
pub fn envelope_tag(envelope: &ResultEnvelope) -> String {
    match envelope.error_kind() {
        None => "[OK]".to_string(),
        Some(kind) => format!("[{}]", kind.as_str().to_uppercase()),
    }
}

/// Uptime as HH:MM:SS, with days in front once it passes 24 hours
pub fn format_uptime(seconds: u64) -> String {
    let (days, rest) = (seconds / 86_400, seconds % 86_400);
    let clock = format!("{:02}:{:02}:{:02}", rest / 3600, (rest % 3600) / 60, rest % 60);
    if days > 0 {
        format!("{}d {}", days, clock)
    } else {
        clock
    }
}

fn print_envelope(envelope: &ResultEnvelope) -> Result<()> {
    let tag = envelope_tag(envelope);
    let text = if envelope.is_success() {
        envelope.message().unwrap_or("ok").to_string()
    } else {
        envelope.error_detail().unwrap_or("failed").to_string()
    };

    if envelope.is_success() {
        println!("{} {}", tag.bright_green(), text);
    } else {
        println!("{} {}", tag.bright_red(), text);
    }
    if let Some(data) = envelope.data() {
        println!("{}", serde_json::to_string_pretty(data)?);
    }
    Ok(())
}

fn print_monitor(status: &MonitorStatus) {
    let state = match status.state {
        MonitorState::Running => status.state.to_string().bright_green().to_string(),
        MonitorState::Stopping => status.state.to_string().yellow().to_string(),
        MonitorState::Stopped => status.state.to_string().dimmed().to_string(),
    };
    println!("Monitor:   {}", state);
    if let Some(secs) = status.interval_secs {
        println!("Interval:  {}s", secs);
    }
    println!("Log:       {}", status.log_path);
    println!("Entries:   {}", status.entries);
}

pub async fn health(client: &AideClient) -> Result<()> {
    let health = client.health().await?;
    println!("{} aided v{} at {}", "[OK]".bright_green(), health.version, client.base_url());
    println!("Music:     {}", health.music_backend.cyan());
    println!("Monitor:   {}", health.monitor);
    println!("Actions:   set v{}", health.action_set_version);
    println!("Uptime:    {}", format_uptime(health.uptime_secs));
    Ok(())
}

pub async fn chat(client: &AideClient, message: &str) -> Result<()> {
    let turn = client.chat(message).await?;
    println!("{}", turn.reply);
    if let (Some(action), Some(result)) = (&turn.action, &turn.result) {
        println!();
        println!("{} {}", envelope_tag(result).dimmed(), action.dimmed());
    }
    Ok(())
}

pub async fn exec(client: &AideClient, action: &str, params: &[String]) -> Result<()> {
    let params = parse_params(params)?;
    let envelope = client.execute(action, params).await?;
    print_envelope(&envelope)
}

pub async fn monitor_start(client: &AideClient, interval_secs: Option<u64>) -> Result<()> {
    print_monitor(&client.monitor_start(interval_secs).await?);
    Ok(())
}

pub async fn monitor_stop(client: &AideClient) -> Result<()> {
    print_monitor(&client.monitor_stop().await?);
    Ok(())
}

pub async fn monitor_status(client: &AideClient) -> Result<()> {
    print_monitor(&client.monitor_status().await?);
    Ok(())
}

pub async fn monitor_latest(client: &AideClient) -> Result<()> {
    match client.monitor_latest().await? {
        Some(snapshot) => println!("{}", serde_json::to_string_pretty(&snapshot)?),
        None => println!("{} No monitoring data recorded yet", "[NOTE]".yellow()),
    }
    Ok(())
}

pub async fn history(client: &AideClient) -> Result<()> {
    let history = client.history().await?;
    if history.entries.is_empty() {
        println!("No conversation yet (capacity {})", history.capacity);
        return Ok(());
    }
    for entry in &history.entries {
        let who = match entry.role {
            Role::User => "you ".cyan().to_string(),
            Role::Assistant => "aide".bright_green().to_string(),
        };
        println!("{} {} {}", entry.timestamp.format("%H:%M:%S").dimmed(), who, entry.text);
    }
    Ok(())
}

pub async fn forget(client: &AideClient) -> Result<()> {
    print_envelope(&client.forget().await?)
}
