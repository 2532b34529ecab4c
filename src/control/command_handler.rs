// control/command_handler.rs

use crate::control::Shutdown;
use crate::updater::{ForceOutcome, UpdateOrchestrator, UpdateSchedule};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

const HELP: &str = "Available commands:\n\
    stop: shut down (exit code 1)\n\
    restart: shut down (exit code 0)\n\
    update disable: pause scheduled updates\n\
    update enable: resume scheduled updates\n\
    update now: force an update\n\
    status: cache and timer state\n\
    help: command list";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    Stop,
    Restart,
    DisableUpdates,
    EnableUpdates,
    UpdateNow,
    Status,
    Help,
    Unknown(String),
}

impl ControlCommand {
    /// Reads one console line. Blank lines are not commands.
    pub fn parse(line: &str) -> Option<Self> {
        let words: Vec<String> = line
            .split_whitespace()
            .map(|w| w.to_ascii_lowercase())
            .collect();
        let words: Vec<&str> = words.iter().map(String::as_str).collect();

        let command = match words.as_slice() {
            [] => return None,
            ["stop"] => ControlCommand::Stop,
            ["restart"] => ControlCommand::Restart,
            ["update", "disable"] => ControlCommand::DisableUpdates,
            ["update", "enable"] => ControlCommand::EnableUpdates,
            ["update", "now"] => ControlCommand::UpdateNow,
            ["status"] => ControlCommand::Status,
            ["help"] => ControlCommand::Help,
            _ => ControlCommand::Unknown(line.trim().to_string()),
        };
        Some(command)
    }
}

/// What the console needs to act on.
pub struct ControlContext {
    pub orchestrator: Arc<UpdateOrchestrator>,
    pub schedule: Arc<UpdateSchedule>,
    pub started: Instant,
}

/// Handles a console command. Returns the shutdown it requests, if any.
pub async fn handle_command(command: ControlCommand, ctx: &ControlContext) -> Option<Shutdown> {
    info!("Handling command: {:?}", command);
    match command {
        ControlCommand::Stop => {
            info!("Stopping");
            Some(Shutdown::Stop)
        }
        ControlCommand::Restart => {
            info!("Restarting");
            Some(Shutdown::Restart)
        }
        ControlCommand::DisableUpdates => {
            ctx.schedule.disable();
            info!("⏸ Scheduled updates disabled");
            None
        }
        ControlCommand::EnableUpdates => {
            ctx.schedule.enable();
            info!("▶️ Scheduled updates enabled ({})", ctx.schedule.cadence());
            None
        }
        ControlCommand::UpdateNow => {
            match ctx.orchestrator.force().await {
                ForceOutcome::Updated(_) => info!("Forced update done"),
                ForceOutcome::Fresh(_) => info!("Snapshot is still fresh, nothing fetched"),
                ForceOutcome::Failed { error, .. } => warn!("Forced update failed: {}", error),
            }
            None
        }
        ControlCommand::Status => {
            let uptime = ctx.started.elapsed().as_secs();
            let age = match ctx.orchestrator.store().age() {
                Some(age) => format!("{:.1}s old", age.as_secs_f64()),
                None => "empty".to_string(),
            };
            info!(
                "⏱ Uptime {:02}:{:02}:{:02} | cache {} | timer {} ({}) | update running: {}",
                uptime / 3600,
                (uptime % 3600) / 60,
                uptime % 60,
                age,
                if ctx.schedule.is_enabled() { "enabled" } else { "disabled" },
                ctx.schedule.cadence(),
                ctx.orchestrator.is_running()
            );
            None
        }
        ControlCommand::Help => {
            info!("{}", HELP);
            None
        }
        ControlCommand::Unknown(text) => {
            warn!("Unknown command {:?}. Type help for a list of commands.", text);
            None
        }
    }
}
