//! # Line classifier.
//!
//! Patterns are compiled once into a [`RegexSet`]; when several match, the
//! rule listed first wins:
//!
//! | # | Rule              | Severity | Terminal                 |
//! |---|-------------------|----------|--------------------------|
//! | 1 | end-of-stream     | Info     | `EndOfStream`            |
//! | 2 | source unreachable| Fatal    | `SourceUnreachable`      |
//! | 3 | element / decode / sink auth error | Fatal | `Error(line)` |
//! | 4 | warning           | Warning  | no                       |
//! | 5 | anything else     | Info     | no                       |
//!
//! A run of [`EMPTY_RUN_LIMIT`] consecutive blank lines means the channel is
//! producing nothing useful and ends the session with
//! `Error("empty output stream")`.

use std::sync::LazyLock;
use std::time::SystemTime;

use futures::{Stream, StreamExt};
use regex::RegexSet;

use super::{Channel, DiagnosticEvent, Severity, TerminalReason};

/// Consecutive blank lines tolerated on one channel.
pub(crate) const EMPTY_RUN_LIMIT: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
    EndOfStream,
    SourceUnreachable,
    Fatal,
    Warning,
}

const PATTERNS: &[(Rule, &str)] = &[
    (Rule::EndOfStream, r"Got EOS from element"),
    (Rule::EndOfStream, r"EOS received"),
    (
        Rule::SourceUnreachable,
        r"(?i)rtspsrc.*(could not open resource|could not connect to server|connection refused|unhandled error|could not read from resource)",
    ),
    (Rule::Fatal, r"^\s*ERROR:"),
    (
        Rule::Fatal,
        r"(?i)(failed to decode|decoding error|decode error|could not decode stream)",
    ),
    (
        Rule::Fatal,
        r"(AccessDenied|UnrecognizedClient|InvalidSignature|NotAuthorized|(?i:403 forbidden|http(?:/1\.[01])? 403|status(?: code)?:? 403))",
    ),
    (Rule::Warning, r"^\s*WARNING:"),
    (Rule::Warning, r"\b(WARN|ERROR)\s"),
];

static RULES: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new(PATTERNS.iter().map(|(_, p)| *p)).expect("valid diagnostic patterns")
});

/// Stateful classifier for one output channel.
#[derive(Debug, Default)]
pub struct Classifier {
    empty_run: u32,
}

impl Classifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifies one line read from `channel`.
    pub fn classify(&mut self, channel: Channel, line: &str) -> DiagnosticEvent {
        let (severity, terminal) = self.rate(line);
        DiagnosticEvent {
            at: SystemTime::now(),
            channel,
            severity,
            line: line.to_string(),
            terminal,
        }
    }

    /// Lazily classifies every line of `lines`.
    pub fn classify_stream<S>(mut self, channel: Channel, lines: S) -> impl Stream<Item = DiagnosticEvent>
    where
        S: Stream<Item = String>,
    {
        lines.map(move |line| self.classify(channel, &line))
    }

    fn rate(&mut self, line: &str) -> (Severity, Option<TerminalReason>) {
        if line.trim().is_empty() {
            self.empty_run += 1;
            if self.empty_run >= EMPTY_RUN_LIMIT {
                self.empty_run = 0;
                return (
                    Severity::Fatal,
                    Some(TerminalReason::Error("empty output stream".into())),
                );
            }
            return (Severity::Info, None);
        }
        self.empty_run = 0;

        let Some(first) = RULES.matches(line).iter().next() else {
            return (Severity::Info, None);
        };
        match PATTERNS[first].0 {
            Rule::EndOfStream => (Severity::Info, Some(TerminalReason::EndOfStream)),
            Rule::SourceUnreachable => (Severity::Fatal, Some(TerminalReason::SourceUnreachable)),
            Rule::Fatal => (Severity::Fatal, Some(TerminalReason::Error(line.trim().to_string()))),
            Rule::Warning => (Severity::Warning, None),
        }
    }
}
