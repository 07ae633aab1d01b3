//! # Per-channel reader tasks.
//!
//! Each output channel gets its own task that reads lines until EOF, runs them
//! through a [`Classifier`] and forwards the result into one shared bounded
//! queue. A reader never stops reading because the consumer is slow: ordinary
//! lines are dropped when the queue is full, and once the consumer is gone the
//! remaining output is read and discarded.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::{Stream, StreamExt, stream};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::debug;

use super::{Channel, Classifier, DiagnosticEvent};
use crate::engine::{OutputStream, Outputs};

/// Receiving side of the diagnostic queue plus its drop counter.
pub(crate) struct DiagnosticQueue {
    pub rx: mpsc::Receiver<DiagnosticEvent>,
    dropped: Arc<AtomicU64>,
}

impl DiagnosticQueue {
    /// Lines dropped so far because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Spawns one reader per channel into `tasks` and returns the shared queue.
///
/// The queue closes once both channels reached EOF.
pub(crate) fn spawn_readers(
    outputs: Outputs,
    capacity: usize,
    tasks: &mut JoinSet<()>,
) -> DiagnosticQueue {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let dropped = Arc::new(AtomicU64::new(0));

    let Outputs { stderr, stdout } = outputs;
    tasks.spawn(drain(Channel::Stderr, stderr, tx.clone(), Arc::clone(&dropped)));
    tasks.spawn(drain(Channel::Stdout, stdout, tx, Arc::clone(&dropped)));

    DiagnosticQueue { rx, dropped }
}

async fn drain(
    channel: Channel,
    output: OutputStream,
    tx: mpsc::Sender<DiagnosticEvent>,
    dropped: Arc<AtomicU64>,
) {
    let events = Classifier::new().classify_stream(channel, lines(output));
    futures::pin_mut!(events);

    while let Some(event) = events.next().await {
        if tx.is_closed() {
            continue;
        }
        if event.terminal.is_some() {
            // consumer is actively receiving until it sees a terminal event
            let _ = tx.send(event).await;
            continue;
        }
        if let Err(mpsc::error::TrySendError::Full(_)) = tx.try_send(event) {
            dropped.fetch_add(1, Ordering::Relaxed);
        }
    }
    debug!(channel = channel.as_str(), "pipeline output closed");
}

/// Longest line kept, in bytes. The rest of a longer line is discarded.
pub(crate) const MAX_LINE_BYTES: u64 = 16 * 1024;

/// Lines of `reader`, lossily decoded, without line terminators.
///
/// Lines longer than [`MAX_LINE_BYTES`] are truncated, so a writer that never
/// sends a newline cannot grow the buffer. Ends at EOF or on the first read
/// error.
pub(crate) fn lines<R>(reader: R) -> impl Stream<Item = String>
where
    R: AsyncRead + Unpin,
{
    stream::unfold(
        (BufReader::new(reader), Vec::new(), false),
        |(mut reader, mut buf, mut truncating)| async move {
            loop {
                buf.clear();
                match (&mut reader).take(MAX_LINE_BYTES).read_until(b'\n', &mut buf).await {
                    Ok(0) => return None,
                    Ok(n) => {
                        let complete = buf.last() == Some(&b'\n');
                        if truncating {
                            truncating = !complete;
                            continue;
                        }
                        truncating = !complete && n as u64 == MAX_LINE_BYTES;
                        if truncating {
                            debug!(limit = MAX_LINE_BYTES, "pipeline output line truncated");
                        }
                        let line = String::from_utf8_lossy(&buf)
                            .trim_end_matches(['\r', '\n'])
                            .to_string();
                        return Some((line, (reader, buf, truncating)));
                    }
                    Err(e) => {
                        debug!(error = %e, "pipeline output read failed");
                        return None;
                    }
                }
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::TerminalReason;
    use tokio::io::{AsyncWriteExt, duplex};

    #[tokio::test]
    async fn test_lines_strip_terminators_and_decode_lossily() {
        let (mut w, r) = duplex(64);
        w.write_all(b"one\r\ntwo\n\xffthree").await.unwrap();
        drop(w);
        let got: Vec<String> = lines(r).collect().await;
        assert_eq!(got, ["one", "two", "\u{fffd}three"]);
    }

    #[tokio::test]
    async fn test_overlong_line_is_truncated_and_reading_continues() {
        let (mut w, r) = duplex(64 * 1024);
        let writer = tokio::spawn(async move {
            let long = vec![b'x'; 3 * MAX_LINE_BYTES as usize + 7];
            w.write_all(&long).await.unwrap();
            w.write_all(b"\nERROR: after the long line\n").await.unwrap();
        });
        let got: Vec<String> = lines(r).collect().await;
        writer.await.unwrap();

        assert_eq!(got.len(), 2);
        assert_eq!(got[0].len(), MAX_LINE_BYTES as usize);
        assert_eq!(got[1], "ERROR: after the long line");
    }

    #[tokio::test]
    async fn test_both_channels_are_forwarded() {
        let (mut err_w, err_r) = duplex(256);
        let (mut out_w, out_r) = duplex(256);
        let mut tasks = JoinSet::new();
        let mut queue = spawn_readers(
            Outputs {
                stderr: Box::new(err_r),
                stdout: Box::new(out_r),
            },
            16,
            &mut tasks,
        );

        out_w.write_all(b"Setting pipeline to PLAYING ...\n").await.unwrap();
        err_w.write_all(b"Got EOS from element \"pipeline0\".\n").await.unwrap();
        drop(out_w);
        drop(err_w);

        let mut seen = Vec::new();
        while let Some(ev) = queue.rx.recv().await {
            seen.push((ev.channel, ev.terminal));
        }
        assert_eq!(seen.len(), 2);
        assert!(seen.contains(&(Channel::Stdout, None)));
        assert!(seen.contains(&(Channel::Stderr, Some(TerminalReason::EndOfStream))));
        while tasks.join_next().await.is_some() {}
    }

    #[tokio::test]
    async fn test_full_queue_drops_but_keeps_reading() {
        let (mut err_w, err_r) = duplex(64);
        let (out_w, out_r) = duplex(64);
        drop(out_w);
        let mut tasks = JoinSet::new();
        let mut queue = spawn_readers(
            Outputs {
                stderr: Box::new(err_r),
                stdout: Box::new(out_r),
            },
            1,
            &mut tasks,
        );

        // far more than the pipe buffer: the writer only finishes if the
        // reader keeps draining while nobody consumes the queue
        let writer = tokio::spawn(async move {
            for i in 0..200 {
                err_w.write_all(format!("line {i}\n").as_bytes()).await.unwrap();
            }
            err_w.write_all(b"EOS received\n").await.unwrap();
        });
        writer.await.unwrap();

        let mut received = Vec::new();
        while let Some(ev) = queue.rx.recv().await {
            received.push(ev);
        }
        assert!(queue.dropped() >= 150, "dropped {}", queue.dropped());
        assert_eq!(received.first().map(|e| e.line.as_str()), Some("line 0"));
        assert_eq!(
            received.last().and_then(|e| e.terminal.clone()),
            Some(TerminalReason::EndOfStream)
        );
        while tasks.join_next().await.is_some() {}
    }
}
