/// Position refresh loop
///
/// A ticker thread that runs `EngineCore::refresh` once per interval (one
/// display frame by default) until the engine shuts down.
use std::sync::Weak;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, select, tick, Receiver};

use super::EngineCore;

pub(crate) struct RefreshLoop {
    shutdown: crossbeam_channel::Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl RefreshLoop {
    pub(crate) fn start(core: Weak<EngineCore>, interval: Duration) -> std::io::Result<Self> {
        let (shutdown, shutdown_rx) = bounded::<()>(1);

        let handle = thread::Builder::new()
            .name("soundpad-refresh".to_string())
            .spawn(move || run(core, interval, shutdown_rx))?;

        tracing::debug!("Refresh loop started ({:?} interval)", interval);
        Ok(Self {
            shutdown,
            handle: Some(handle),
        })
    }
}

fn run(core: Weak<EngineCore>, interval: Duration, shutdown: Receiver<()>) {
    let ticker = tick(interval);
    loop {
        select! {
            recv(ticker) -> _ => {
                let Some(core) = core.upgrade() else { break };
                core.refresh();
            }
            recv(shutdown) -> _ => break,
        }
    }
    tracing::debug!("Refresh loop stopped");
}

impl Drop for RefreshLoop {
    fn drop(&mut self) {
        let _ = self.shutdown.send(());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("Refresh loop thread panicked");
            }
        }
    }
}
