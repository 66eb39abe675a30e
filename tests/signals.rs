//! Built-in signal watcher, driven through a manual source and through the OS.

use std::time::{Duration, Instant};

use shutdown_watch::{watch, ShutdownOption, Signal, SignalNotice, WatchError};

mod common;
use common::{
    assert_no_exit, assert_not_done, exit_recorder, wait_done, wait_exit, ManualSignals, SETTLE,
};

#[tokio::test]
async fn test_default_signals_are_subscribed() {
    let source = ManualSignals::new();
    let (_ctx, release) = watch([
        ShutdownOption::WithoutLog,
        ShutdownOption::signal_source(source.clone()),
    ])
    .await
    .unwrap();

    assert_eq!(source.subscribed(), vec![Signal::Interrupt, Signal::Terminate]);
    release.release();
}

#[tokio::test]
async fn test_without_signals_skips_subscription() {
    let source = ManualSignals::new();
    let (ctx, _release) = watch([
        ShutdownOption::signal_source(source.clone()),
        ShutdownOption::WithoutSignals,
    ])
    .await
    .unwrap();

    assert!(source.subscribed().is_empty());
    assert_not_done(&ctx).await;
}

#[tokio::test]
async fn test_signal_completes_context() {
    let source = ManualSignals::new();
    let (ctx, _release) = watch([
        ShutdownOption::WithoutLog,
        ShutdownOption::signal_source(source.clone()),
        ShutdownOption::signals([Signal::User1]),
    ])
    .await
    .unwrap();

    source.raise(Signal::User1);
    wait_done(&ctx).await;

    let cause = ctx.cause().unwrap();
    assert_eq!(
        cause.downcast_ref::<SignalNotice>(),
        Some(&SignalNotice::Received(Signal::User1))
    );
}

#[tokio::test]
async fn test_subscription_released_on_cancel() {
    let source = ManualSignals::new();
    let (ctx, release) = watch([
        ShutdownOption::WithoutLog,
        ShutdownOption::signal_source(source.clone()),
    ])
    .await
    .unwrap();

    assert!(!source.released());
    release.release();
    wait_done(&ctx).await;

    tokio::time::timeout(SETTLE, async {
        while !source.released() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("subscription dropped after cancellation");
}

#[tokio::test]
async fn test_double_signal_forces_exit() {
    let source = ManualSignals::new();
    let (exit, mut exits) = exit_recorder();
    let grace = Duration::from_secs(30);
    let (ctx, _release) = watch([
        ShutdownOption::WithoutLog,
        ShutdownOption::signal_source(source.clone()),
        ShutdownOption::signals([Signal::User1]),
        exit,
        ShutdownOption::DoubleSignal,
        ShutdownOption::ForceExitCode(2),
        ShutdownOption::TimeoutExitCode(3),
        ShutdownOption::GracePeriod(grace),
    ])
    .await
    .unwrap();

    let started = Instant::now();
    source.raise(Signal::User1);
    wait_done(&ctx).await;
    source.raise(Signal::User1);

    assert_eq!(wait_exit(&mut exits, SETTLE).await, 2);
    assert!(started.elapsed() < grace);
    assert_no_exit(&mut exits).await;
}

#[tokio::test]
async fn test_double_signal_timeout() {
    let source = ManualSignals::new();
    let (exit, mut exits) = exit_recorder();
    let grace = SETTLE / 4;
    let (ctx, _release) = watch([
        ShutdownOption::WithoutLog,
        ShutdownOption::signal_source(source.clone()),
        ShutdownOption::signals([Signal::User1]),
        exit,
        ShutdownOption::DoubleSignal,
        ShutdownOption::ForceExitCode(3),
        ShutdownOption::GracePeriod(grace),
        ShutdownOption::TimeoutExitCode(2),
    ])
    .await
    .unwrap();

    let started = Instant::now();
    source.raise(Signal::User1);
    wait_done(&ctx).await;

    assert_eq!(wait_exit(&mut exits, SETTLE).await, 2);
    assert!(started.elapsed() >= grace);
    assert_no_exit(&mut exits).await;
}

#[tokio::test]
async fn test_second_signal_ignored_without_double_signal_mode() {
    let source = ManualSignals::new();
    let (exit, mut exits) = exit_recorder();
    let (ctx, _release) = watch([
        ShutdownOption::WithoutLog,
        ShutdownOption::signal_source(source.clone()),
        ShutdownOption::signals([Signal::User1]),
        exit,
    ])
    .await
    .unwrap();

    source.raise(Signal::User1);
    wait_done(&ctx).await;
    source.raise(Signal::User1);

    assert_no_exit(&mut exits).await;
}

#[tokio::test]
async fn test_registration_failure_is_reported() {
    let source = ManualSignals::new();
    let first = watch([ShutdownOption::signal_source(source.clone())]).await;
    assert!(first.is_ok());

    // The manual source only supports one subscription.
    let second = watch([ShutdownOption::signal_source(source)]).await;
    assert!(matches!(
        second,
        Err(WatchError::SignalRegistration { ref signals, .. })
            if signals == &[Signal::Interrupt, Signal::Terminate]
    ));
}

#[cfg(unix)]
mod os {
    use super::*;
    use std::io::{BufRead, BufReader};
    use std::os::unix::process::ExitStatusExt;
    use std::process::{Command, Stdio};

    /// Set when this binary is re-run as the child of
    /// `test_default_action_restored_after_release`.
    const CHILD_ENV: &str = "SHUTDOWN_WATCH_RELEASE_CHILD";

    fn kill(signal: &str, pid: u32) {
        let status = Command::new("kill")
            .arg(format!("-{}", signal))
            .arg(pid.to_string())
            .status()
            .expect("run kill");
        assert!(status.success());
    }

    fn raise(signal: &str) {
        kill(signal, std::process::id());
    }

    #[tokio::test]
    async fn test_os_signal_completes_context() {
        let (ctx, _release) = watch([
            ShutdownOption::WithoutLog,
            ShutdownOption::signals([Signal::User1]),
        ])
        .await
        .unwrap();

        raise("USR1");
        wait_done(&ctx).await;
        assert_eq!(ctx.cause().unwrap().to_string(), "signal SIGUSR1 received");
    }

    #[tokio::test]
    async fn test_os_double_signal_forces_exit() {
        let (exit, mut exits) = exit_recorder();
        let (ctx, _release) = watch([
            ShutdownOption::WithoutLog,
            ShutdownOption::signals([Signal::User2]),
            exit,
            ShutdownOption::DoubleSignal,
            ShutdownOption::ForceExitCode(2),
            ShutdownOption::GracePeriod(SETTLE * 4),
        ])
        .await
        .unwrap();

        raise("USR2");
        wait_done(&ctx).await;
        tokio::time::sleep(SETTLE / 10).await;
        raise("USR2");

        assert_eq!(wait_exit(&mut exits, SETTLE).await, 2);
    }

    #[tokio::test]
    async fn release_child() {
        if std::env::var_os(CHILD_ENV).is_none() {
            return;
        }

        let (ctx, _release) = watch([
            ShutdownOption::WithoutLog,
            ShutdownOption::signals([Signal::Terminate]),
        ])
        .await
        .unwrap();
        println!("ready");

        if tokio::time::timeout(Duration::from_secs(5), ctx.done())
            .await
            .is_err()
        {
            return;
        }
        // Let the signal watcher return and drop its subscription.
        tokio::time::sleep(SETTLE).await;
        println!("released");

        tokio::time::sleep(Duration::from_secs(5)).await;
    }

    #[test]
    fn test_default_action_restored_after_release() {
        let mut child = Command::new(std::env::current_exe().expect("test binary path"))
            .args(["os::release_child", "--exact", "--nocapture", "--test-threads=1"])
            .env(CHILD_ENV, "1")
            .stdout(Stdio::piped())
            .spawn()
            .expect("spawn child");
        let pid = child.id();

        let stdout = child.stdout.take().expect("child stdout");
        let mut lines = BufReader::new(stdout).lines().map_while(Result::ok);
        let mut wait_for = |marker: &str| lines.any(|line| line.contains(marker));

        assert!(wait_for("ready"), "child never subscribed");
        kill("TERM", pid);
        assert!(wait_for("released"), "first SIGTERM did not complete the context");
        kill("TERM", pid);

        let status = child.wait().expect("wait for child");
        assert_eq!(status.signal(), Some(signal_hook::consts::SIGTERM));
    }
}
