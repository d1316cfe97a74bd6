use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{Duration as ChronoDuration, Local};
use tracing::{info, warn};

use crate::config::Config;
use crate::notify::{summarize_changes, NotifySink, StdoutSink, TelegramSink, WebhookSink};
use crate::source::ScheduleSource;
use crate::timetable::{diff, fingerprint, Snapshot, SnapshotStore};

pub async fn fetch_snapshot(source: &dyn ScheduleSource, config: &Config) -> Result<Snapshot> {
    let today = Local::now().date_naive();
    let end = today + ChronoDuration::days(i64::from(config.source.days_ahead));
    let payload = source.fetch_window(today, end).await?;
    Ok(payload.to_snapshot_lossy())
}

pub fn build_sinks(config: &Config) -> Vec<Box<dyn NotifySink>> {
    let mut sinks: Vec<Box<dyn NotifySink>> = Vec::new();
    if config.notify.enable_stdout {
        sinks.push(Box::new(StdoutSink));
    }
    if !config.notify.telegram_bot_token.trim().is_empty() {
        sinks.push(Box::new(TelegramSink::new(
            config.notify.telegram_bot_token.clone(),
            config.notify.telegram_chat_id.clone(),
        )));
    }
    if !config.notify.webhook_url.trim().is_empty() {
        sinks.push(Box::new(WebhookSink::new(config.notify.webhook_url.clone())));
    }
    sinks
}

/// Poll the schedule provider and notify on every detected change. The
/// previous snapshot and its fingerprint are threaded through the loop
/// explicitly; a failed cycle leaves both untouched.
pub async fn run_watch_loop(
    source: Arc<dyn ScheduleSource>,
    store: &SnapshotStore,
    config: &Config,
    interval_secs: Option<u64>,
    iterations: u32,
) -> Result<()> {
    let mut previous = store.load()?.unwrap_or_default();
    let mut previous_fingerprint = fingerprint(&previous);
    if previous.is_empty() {
        info!("no persisted timetable, first fetch becomes the baseline");
    } else {
        info!(lessons = previous.len(), "loaded persisted timetable");
    }

    let sinks = build_sinks(config);
    let interval = Duration::from_secs(
        interval_secs
            .unwrap_or(config.watch.poll_interval_secs)
            .max(1),
    );

    let mut cycle: u32 = 0;
    loop {
        cycle += 1;
        let outcome = run_cycle(
            source.as_ref(),
            store,
            config,
            &sinks,
            &previous,
            &previous_fingerprint,
        )
        .await;
        match outcome {
            Ok(Some((snapshot, digest))) => {
                previous = snapshot;
                previous_fingerprint = digest;
            }
            Ok(None) => {}
            Err(err) => warn!(%err, "poll cycle failed, keeping previous snapshot"),
        }

        if iterations != 0 && cycle >= iterations {
            break;
        }
        tokio::time::sleep(interval).await;
    }
    Ok(())
}

/// One fetch → fingerprint → diff → notify → persist unit per polling
/// cycle. Returns the new baseline only after the whole cycle succeeded; a
/// failed fetch or sink leaves the previous snapshot and fingerprint in
/// force and nothing persisted.
pub async fn run_cycle(
    source: &dyn ScheduleSource,
    store: &SnapshotStore,
    config: &Config,
    sinks: &[Box<dyn NotifySink>],
    previous: &Snapshot,
    previous_fingerprint: &str,
) -> Result<Option<(Snapshot, String)>> {
    let current = fetch_snapshot(source, config).await?;
    let digest = fingerprint(&current);
    if digest == previous_fingerprint {
        info!(lessons = current.len(), "no change detected");
        return Ok(None);
    }

    let changes = diff(previous, &current);
    if changes.is_empty() {
        // The digest moved without any per-lesson difference, which happens
        // when duplicate ids collapse in the diff index. Advance quietly.
        info!(lessons = current.len(), "fingerprint moved without lesson changes");
        store.save(&current)?;
        return Ok(Some((current, digest)));
    }
    info!(count = changes.len(), "change detected");

    let message = format!("📅 {}", summarize_changes(&changes));
    for sink in sinks {
        sink.send(&message)
            .await
            .with_context(|| format!("failed sending notification via {}", sink.name()))?;
    }

    store.save(&current)?;
    Ok(Some((current, digest)))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use anyhow::anyhow;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use serde_json::json;

    use crate::timetable::{ElementTable, RawPayload, SourceVariant};

    use super::*;

    struct FixedSource {
        payload: RawPayload,
    }

    #[async_trait]
    impl ScheduleSource for FixedSource {
        fn variant(&self) -> SourceVariant {
            self.payload.variant
        }

        fn name(&self) -> &str {
            "fixed"
        }

        async fn fetch_window(&self, _start: NaiveDate, _end: NaiveDate) -> Result<RawPayload> {
            Ok(self.payload.clone())
        }
    }

    struct RecordingSink {
        sent: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl NotifySink for RecordingSink {
        fn name(&self) -> &str {
            "recording"
        }

        async fn send(&self, text: &str) -> Result<()> {
            self.sent.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    struct FailingSink;

    #[async_trait]
    impl NotifySink for FailingSink {
        fn name(&self) -> &str {
            "failing"
        }

        async fn send(&self, _text: &str) -> Result<()> {
            Err(anyhow!("sink unreachable"))
        }
    }

    fn payload_with(records: Vec<serde_json::Value>) -> RawPayload {
        RawPayload {
            variant: SourceVariant::SessionRpc,
            records,
            elements: ElementTable::default(),
        }
    }

    fn record(id: i64, room: &str) -> serde_json::Value {
        json!({
            "id": id,
            "date": 20240108,
            "startTime": 800,
            "endTime": 845,
            "su": [{"id": 1, "name": "Mathe"}],
            "te": [{"id": 2, "name": "MUE"}],
            "ro": [{"id": 3, "name": room}]
        })
    }

    #[test]
    fn failing_sink_keeps_baseline_and_skips_persist() {
        tokio_test::block_on(async {
            let dir = tempfile::tempdir().unwrap();
            let store = SnapshotStore::new(dir.path().join("last_timetable.json"));
            let source = FixedSource {
                payload: payload_with(vec![record(1, "R204")]),
            };
            let previous = Snapshot::default();
            let previous_fingerprint = fingerprint(&previous);
            let sinks: Vec<Box<dyn NotifySink>> = vec![Box::new(FailingSink)];

            let result = run_cycle(
                &source,
                &store,
                &Config::default(),
                &sinks,
                &previous,
                &previous_fingerprint,
            )
            .await;

            assert!(result.is_err());
            assert!(store.load().unwrap().is_none(), "nothing may be persisted");
        });
    }

    #[test]
    fn successful_cycle_notifies_persists_and_advances() {
        tokio_test::block_on(async {
            let dir = tempfile::tempdir().unwrap();
            let store = SnapshotStore::new(dir.path().join("last_timetable.json"));
            let source = FixedSource {
                payload: payload_with(vec![record(1, "R204")]),
            };
            let previous = Snapshot::default();
            let previous_fingerprint = fingerprint(&previous);
            let sent = Arc::new(Mutex::new(Vec::new()));
            let sinks: Vec<Box<dyn NotifySink>> =
                vec![Box::new(RecordingSink { sent: sent.clone() })];

            let outcome = run_cycle(
                &source,
                &store,
                &Config::default(),
                &sinks,
                &previous,
                &previous_fingerprint,
            )
            .await
            .unwrap();

            let (snapshot, digest) = outcome.expect("cycle must advance");
            assert_eq!(snapshot.len(), 1);
            assert_eq!(digest, fingerprint(&snapshot));
            assert_eq!(store.load().unwrap().unwrap(), snapshot);
            let messages = sent.lock().unwrap();
            assert_eq!(messages.len(), 1);
            assert!(messages[0].starts_with("📅"));
        });
    }

    #[test]
    fn unchanged_timetable_is_a_quiet_cycle() {
        tokio_test::block_on(async {
            let dir = tempfile::tempdir().unwrap();
            let store = SnapshotStore::new(dir.path().join("last_timetable.json"));
            let payload = payload_with(vec![record(1, "R204")]);
            let source = FixedSource {
                payload: payload.clone(),
            };
            let previous = payload.to_snapshot_lossy();
            let previous_fingerprint = fingerprint(&previous);
            let sent = Arc::new(Mutex::new(Vec::new()));
            let sinks: Vec<Box<dyn NotifySink>> =
                vec![Box::new(RecordingSink { sent: sent.clone() })];

            let outcome = run_cycle(
                &source,
                &store,
                &Config::default(),
                &sinks,
                &previous,
                &previous_fingerprint,
            )
            .await
            .unwrap();

            assert!(outcome.is_none());
            assert!(sent.lock().unwrap().is_empty());
            assert!(store.load().unwrap().is_none());
        });
    }

    #[test]
    fn fingerprint_drift_without_lesson_changes_advances_silently() {
        tokio_test::block_on(async {
            let dir = tempfile::tempdir().unwrap();
            let store = SnapshotStore::new(dir.path().join("last_timetable.json"));
            // The duplicate id collapses to the same lesson in the diff
            // index, so the digest moves while the change list stays empty.
            let source = FixedSource {
                payload: payload_with(vec![record(1, "B101"), record(1, "R204")]),
            };
            let previous = payload_with(vec![record(1, "R204")]).to_snapshot_lossy();
            let previous_fingerprint = fingerprint(&previous);
            let sent = Arc::new(Mutex::new(Vec::new()));
            let sinks: Vec<Box<dyn NotifySink>> =
                vec![Box::new(RecordingSink { sent: sent.clone() })];

            let outcome = run_cycle(
                &source,
                &store,
                &Config::default(),
                &sinks,
                &previous,
                &previous_fingerprint,
            )
            .await
            .unwrap();

            let (snapshot, _) = outcome.expect("baseline must advance");
            assert!(sent.lock().unwrap().is_empty(), "no notification expected");
            assert_eq!(store.load().unwrap().unwrap(), snapshot);
        });
    }
}
