//! Structured event stream.
//!
//! Discrete, typed events emitted during a scenario run. Events are
//! serialized as newline-delimited JSON (JSONL) and carry a monotonically
//! increasing sequence number for ordering.

use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::chain::Log;
use crate::governance::ReadinessCheck;
use crate::scenario::{Actor, Check};

// ---------------------------------------------------------------------------
// Event variants
// ---------------------------------------------------------------------------

/// A discrete event emitted during a run.
///
/// Tagged with `"type"` when serialized so consumers can dispatch on it.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    /// Bootstrap finished and the attack is about to start.
    ScenarioStarted {
        timestamp: DateTime<Utc>,
        /// Identifies every event of one run.
        run_id: Uuid,
        scenario: String,
        /// Readiness policy of the delay queue, if the scenario has one.
        #[serde(skip_serializing_if = "Option::is_none")]
        readiness: Option<ReadinessCheck>,
        actors: Vec<Actor>,
    },

    /// A chain log entry produced by the attack.
    ChainLog {
        timestamp: DateTime<Utc>,
        run_id: Uuid,
        log: Log,
    },

    /// The attacker's transactions completed or reverted.
    AttackFinished {
        timestamp: DateTime<Utc>,
        run_id: Uuid,
        success: bool,
        /// Root cause of a reverted attack.
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    /// The verifier compared final balances.
    VerdictReached {
        timestamp: DateTime<Utc>,
        run_id: Uuid,
        passed: bool,
        checks: Vec<Check>,
    },
}

// ---------------------------------------------------------------------------
// Envelope (adds sequence number via serde flatten)
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct EventEnvelope {
    sequence: u64,
    #[serde(flatten)]
    event: Event,
}

// ---------------------------------------------------------------------------
// Emitter
// ---------------------------------------------------------------------------

/// Thread-safe, buffered JSONL event writer.
///
/// Serialization or I/O failures are dropped; the event stream never fails
/// a run.
pub struct EventEmitter {
    writer: Mutex<BufWriter<Box<dyn Write + Send>>>,
    sequence: AtomicU64,
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("sequence", &self.sequence.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl EventEmitter {
    /// Creates an emitter that writes to the given writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(BufWriter::new(writer)),
            sequence: AtomicU64::new(0),
        }
    }

    /// Creates an emitter that writes to stderr, next to the logs.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    /// Creates an emitter that discards all events.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(Box::new(std::io::sink()))
    }

    /// Creates an emitter that writes to a file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be created.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self::new(Box::new(file)))
    }

    /// Emits an event as a single JSONL line.
    pub fn emit(&self, event: Event) {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        let envelope = EventEnvelope {
            sequence: seq,
            event,
        };

        if let Ok(mut w) = self.writer.lock() {
            if let Ok(line) = serde_json::to_string(&envelope) {
                let _ = writeln!(w, "{line}");
                let _ = w.flush();
            }
        }
    }

    /// Returns the number of events emitted so far.
    #[must_use]
    pub fn event_count(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex as StdMutex};

    use super::*;
    use crate::chain::{Address, LogEvent};

    #[derive(Clone)]
    struct TestWriter(Arc<StdMutex<Vec<u8>>>);

    impl TestWriter {
        fn new() -> Self {
            Self(Arc::new(StdMutex::new(Vec::new())))
        }

        fn contents(&self) -> String {
            let buf = self.0.lock().unwrap();
            String::from_utf8_lossy(&buf).into_owned()
        }
    }

    impl Write for TestWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn started() -> Event {
        Event::ScenarioStarted {
            timestamp: DateTime::parse_from_rfc3339("2026-03-01T09:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            run_id: Uuid::nil(),
            scenario: "climber".to_owned(),
            readiness: Some(ReadinessCheck::AfterUnit),
            actors: vec![Actor::new("player", Address::derive("player"))],
        }
    }

    #[test]
    fn emitter_writes_valid_jsonl() {
        let tw = TestWriter::new();
        let emitter = EventEmitter::new(Box::new(tw.clone()));
        emitter.emit(started());

        let parsed: serde_json::Value = serde_json::from_str(tw.contents().trim()).unwrap();
        assert_eq!(parsed["sequence"], 0);
        assert_eq!(parsed["type"], "ScenarioStarted");
        assert_eq!(parsed["scenario"], "climber");
        assert_eq!(parsed["readiness"], "after-unit");
        assert_eq!(parsed["actors"][0]["role"], "player");
        assert!(parsed.get("event").is_none(), "event should be flattened");
    }

    #[test]
    fn emitter_increments_sequence() {
        let tw = TestWriter::new();
        let emitter = EventEmitter::new(Box::new(tw.clone()));
        emitter.emit(started());
        emitter.emit(Event::AttackFinished {
            timestamp: Utc::now(),
            run_id: Uuid::nil(),
            success: false,
            error: Some("operation not ready".to_owned()),
        });

        assert_eq!(emitter.event_count(), 2);
        let lines: Vec<serde_json::Value> = tw
            .contents()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines[1]["sequence"], 1);
        assert_eq!(lines[1]["success"], false);
    }

    #[test]
    fn chain_log_keeps_large_amounts() {
        let tw = TestWriter::new();
        let emitter = EventEmitter::new(Box::new(tw.clone()));
        emitter.emit(Event::ChainLog {
            timestamp: Utc::now(),
            run_id: Uuid::nil(),
            log: Log {
                emitter: Address::derive("token"),
                event: LogEvent::Approval {
                    owner: Address::derive("pool"),
                    spender: Address::derive("executor"),
                    amount: u128::MAX,
                },
            },
        });

        let line = tw.contents();
        assert!(line.contains(&u128::MAX.to_string()), "{line}");
        assert!(line.contains(r#""event":"approval""#), "{line}");
    }

    #[test]
    fn absent_error_is_omitted() {
        let json = serde_json::to_string(&Event::AttackFinished {
            timestamp: Utc::now(),
            run_id: Uuid::nil(),
            success: true,
            error: None,
        })
        .unwrap();
        assert!(!json.contains("error"), "{json}");
    }

    #[test]
    fn noop_emitter_counts() {
        let emitter = EventEmitter::noop();
        emitter.emit(started());
        assert_eq!(emitter.event_count(), 1);
    }
}
