pub mod completions;
pub mod config;
pub mod cycle;
pub mod history;
pub mod practice;

use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;

use linguapace_core::Event;
use tokio::sync::{mpsc, watch};

/// Print one event as a JSON line on stdout.
pub fn emit(event: &Event) {
    match serde_json::to_string(event) {
        Ok(json) => println!("{json}"),
        Err(e) => tracing::warn!(error = %e, "failed to serialize event"),
    }
}

/// Forward stdin lines to the driver from a dedicated thread.
///
/// The thread is detached and dies with the process; the channel closes on EOF.
pub fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Cancel signal shared by input handlers and the Ctrl-C listener.
pub fn cancel_channel() -> (Arc<watch::Sender<bool>>, watch::Receiver<bool>) {
    let (tx, rx) = watch::channel(false);
    (Arc::new(tx), rx)
}

/// Flip the cancel signal on Ctrl-C.
pub fn cancel_on_ctrl_c(cancel: Arc<watch::Sender<bool>>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::debug!("ctrl-c received");
            let _ = cancel.send(true);
        }
    });
}

pub fn tick_period(tick_ms: u64) -> Duration {
    Duration::from_millis(tick_ms.max(1))
}

pub fn runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
}
