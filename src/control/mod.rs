// Control module: the interactive console and shutdown coordination.

pub mod command_handler;
pub mod listener;

pub use command_handler::{handle_command, ControlCommand, ControlContext};
pub use listener::listen_for_commands;

use tokio::sync::watch;

/// Why the process is going down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    Stop,
    Restart,
    Signal,
}

impl Shutdown {
    /// `stop` exits with 1; `restart` and signals exit with 0.
    pub fn exit_code(&self) -> i32 {
        match self {
            Shutdown::Stop => 1,
            Shutdown::Restart | Shutdown::Signal => 0,
        }
    }
}

/// Resolves once a shutdown has been requested.
pub async fn wait_for_shutdown(mut rx: watch::Receiver<Option<Shutdown>>) {
    let _ = rx.wait_for(|reason| reason.is_some()).await;
}
