//! Timed media discovery.
//!
//! Pages often attach their player late, so discovery probes the rendered
//! document at fixed checkpoints after it is ready and gives up after a
//! deadline. A page whose audio appears after the deadline is reported as
//! not found; the schedule is tunable for slow sites.

use std::time::Duration;

use async_trait::async_trait;

use crate::media::{MediaDiscoverer, dedupe_urls};

/// Receiver of discovery results, usually a
/// [`SessionOrchestrator`](crate::session::SessionOrchestrator).
#[async_trait]
pub trait Checkpoints: Send + Sync {
    async fn mark_searching(&self);

    async fn record_found(&self, primary: &str, all: &[String]);

    async fn record_not_found(&self);

    async fn record_extracted_text(&self, text: &str);
}

/// Probe times, measured from page-ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoverySchedule {
    pub first: Duration,
    pub second: Duration,
    pub give_up: Duration,
}

impl Default for DiscoverySchedule {
    fn default() -> Self {
        Self { first: Duration::from_secs(2), second: Duration::from_secs(5), give_up: Duration::from_secs(7) }
    }
}

impl DiscoverySchedule {
    fn probes(&self) -> [Duration; 2] {
        [self.first, self.second]
    }
}

/// Runs discovery for one page.
///
/// Marks the session as searching, probes at `first` and `second`, and
/// records the first non-empty result. Probe errors count as "nothing yet".
/// If nothing turned up, the session is told at `give_up`.
pub async fn run_discovery(session: &dyn Checkpoints, discoverer: &dyn MediaDiscoverer, schedule: &DiscoverySchedule) {
    session.mark_searching().await;

    let start = tokio::time::Instant::now();
    for probe in schedule.probes() {
        tokio::time::sleep_until(start + probe).await;

        match discoverer.discover().await {
            Ok(urls) => {
                let urls = dedupe_urls(urls.into_iter().filter(|u| !u.trim().is_empty()));
                if let Some(primary) = urls.first() {
                    tracing::info!(primary = %primary, count = urls.len(), "media discovered");
                    session.record_found(primary, &urls).await;
                    return;
                }
                tracing::debug!(after = ?probe, "no media yet");
            }
            Err(e) => tracing::warn!(error = %e, "media probe failed"),
        }
    }

    tokio::time::sleep_until(start + schedule.give_up).await;
    tracing::info!("no media found before deadline");
    session.record_not_found().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ReadcastError, Result};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<(Duration, String)>>,
        start: Mutex<Option<tokio::time::Instant>>,
    }

    impl Recorder {
        fn push(&self, event: String) {
            let start = *self.start.lock().unwrap().get_or_insert_with(tokio::time::Instant::now);
            self.events.lock().unwrap().push((start.elapsed(), event));
        }

        fn events(&self) -> Vec<(Duration, String)> {
            self.events.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Checkpoints for Recorder {
        async fn mark_searching(&self) {
            self.push("searching".to_string());
        }

        async fn record_found(&self, primary: &str, all: &[String]) {
            self.push(format!("found {} of {}", primary, all.len()));
        }

        async fn record_not_found(&self) {
            self.push("not found".to_string());
        }

        async fn record_extracted_text(&self, _text: &str) {}
    }

    /// Answers each probe from a list, counting calls.
    struct Probes {
        calls: AtomicUsize,
        answers: fn(usize) -> Result<Vec<String>>,
    }

    #[async_trait]
    impl MediaDiscoverer for Probes {
        async fn discover(&self) -> Result<Vec<String>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            (self.answers)(call)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_found_at_first_probe() {
        let recorder = Recorder::default();
        let probes = Probes {
            calls: AtomicUsize::new(0),
            answers: |_| Ok(vec!["https://a/x.mp3".to_string(), "https://a/y.m4a".to_string()]),
        };

        run_discovery(&recorder, &probes, &DiscoverySchedule::default()).await;

        assert_eq!(
            recorder.events(),
            vec![
                (Duration::ZERO, "searching".to_string()),
                (Duration::from_secs(2), "found https://a/x.mp3 of 2".to_string())
            ]
        );
        assert_eq!(probes.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_found_at_second_probe_after_error() {
        let recorder = Recorder::default();
        let probes = Probes {
            calls: AtomicUsize::new(0),
            answers: |call| match call {
                0 => Err(ReadcastError::HtmlParseError("script failed".to_string())),
                _ => Ok(vec!["https://a/x.mp3".to_string()]),
            },
        };

        run_discovery(&recorder, &probes, &DiscoverySchedule::default()).await;

        let events = recorder.events();
        assert_eq!(events.last().unwrap(), &(Duration::from_secs(5), "found https://a/x.mp3 of 1".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_at_deadline() {
        let recorder = Recorder::default();
        let probes = Probes { calls: AtomicUsize::new(0), answers: |_| Ok(vec![String::new()]) };

        run_discovery(&recorder, &probes, &DiscoverySchedule::default()).await;

        assert_eq!(recorder.events().last().unwrap(), &(Duration::from_secs(7), "not found".to_string()));
        assert_eq!(probes.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_schedule() {
        let recorder = Recorder::default();
        let probes = Probes { calls: AtomicUsize::new(0), answers: |_| Ok(Vec::new()) };
        let schedule = DiscoverySchedule {
            first: Duration::from_secs(1),
            second: Duration::from_secs(3),
            give_up: Duration::from_secs(20),
        };

        run_discovery(&recorder, &probes, &schedule).await;

        assert_eq!(recorder.events().last().unwrap().0, Duration::from_secs(20));
    }
}
