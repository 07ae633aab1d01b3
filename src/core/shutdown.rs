//! # OS shutdown signals.
//!
//! [`wait_for_shutdown_signal`] completes on the first termination signal and
//! reports which one it was.
//!
//! | Platform | Signals                        |
//! |----------|--------------------------------|
//! | Unix     | `SIGINT`, `SIGTERM`, `SIGQUIT` |
//! | other    | Ctrl-C                         |
//!
//! Under systemd / Kubernetes the relay is normally stopped with `SIGTERM`.

/// Waits for a termination signal and returns its name.
///
/// # Errors
/// Signal handler registration failed.
#[cfg(unix)]
pub(crate) async fn wait_for_shutdown_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    let name = tokio::select! {
        _ = sigint.recv() => "SIGINT",
        _ = sigterm.recv() => "SIGTERM",
        _ = sigquit.recv() => "SIGQUIT",
    };
    Ok(name)
}

/// Waits for Ctrl-C.
///
/// # Errors
/// Signal handler registration failed.
#[cfg(not(unix))]
pub(crate) async fn wait_for_shutdown_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("ctrl-c")
}
