//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use shutdown_watch::{ShutdownContext, ShutdownOption, Signal, SignalSource, SignalStream};
use tokio::sync::mpsc;

/// Upper bound on how long any expected event may take.
pub const SETTLE: Duration = Duration::from_millis(250);

/// A signal source driven by the test instead of the OS.
#[derive(Clone)]
pub struct ManualSignals {
    tx: mpsc::UnboundedSender<Signal>,
    rx: Arc<Mutex<Option<mpsc::UnboundedReceiver<Signal>>>>,
    subscribed: Arc<Mutex<Vec<Signal>>>,
}

impl ManualSignals {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Arc::new(Mutex::new(Some(rx))),
            subscribed: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Deliver `signal` if it was subscribed to.
    pub fn raise(&self, signal: Signal) {
        if self.subscribed.lock().unwrap().contains(&signal) {
            let _ = self.tx.send(signal);
        }
    }

    pub fn subscribed(&self) -> Vec<Signal> {
        self.subscribed.lock().unwrap().clone()
    }

    /// Whether the subscription has been dropped.
    pub fn released(&self) -> bool {
        self.tx.is_closed()
    }
}

struct ManualStream(mpsc::UnboundedReceiver<Signal>);

impl SignalSource for ManualSignals {
    fn subscribe(&self, signals: &[Signal]) -> io::Result<Box<dyn SignalStream>> {
        let rx = self
            .rx
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "already subscribed"))?;
        *self.subscribed.lock().unwrap() = signals.to_vec();
        Ok(Box::new(ManualStream(rx)))
    }
}

#[async_trait]
impl SignalStream for ManualStream {
    async fn recv(&mut self) -> Option<Signal> {
        self.0.recv().await
    }
}

/// Exit function that records codes instead of exiting.
pub fn exit_recorder() -> (ShutdownOption, mpsc::UnboundedReceiver<i32>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let option = ShutdownOption::exit(move |code: i32| {
        let _ = tx.send(code);
    });
    (option, rx)
}

/// Logger that collects messages.
pub fn log_recorder() -> (ShutdownOption, Arc<Mutex<Vec<String>>>) {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let sink = lines.clone();
    let option = ShutdownOption::logger(move |msg: &str| sink.lock().unwrap().push(msg.to_string()));
    (option, lines)
}

/// Fail the test unless `ctx` completes within [`SETTLE`].
pub async fn wait_done(ctx: &ShutdownContext) {
    tokio::time::timeout(SETTLE, ctx.done())
        .await
        .expect("context should complete");
}

/// Fail the test if `ctx` completes within [`SETTLE`].
pub async fn assert_not_done(ctx: &ShutdownContext) {
    let waited = tokio::time::timeout(SETTLE, ctx.done()).await;
    assert!(waited.is_err(), "context completed unexpectedly");
}

/// Wait for one exit code.
pub async fn wait_exit(exits: &mut mpsc::UnboundedReceiver<i32>, within: Duration) -> i32 {
    tokio::time::timeout(within, exits.recv())
        .await
        .expect("exit should be invoked")
        .expect("exit recorder alive")
}

/// Fail the test if an exit arrives within [`SETTLE`].
pub async fn assert_no_exit(exits: &mut mpsc::UnboundedReceiver<i32>) {
    if let Ok(Some(code)) = tokio::time::timeout(SETTLE, exits.recv()).await {
        panic!("unexpected exit with code {}", code);
    }
}
