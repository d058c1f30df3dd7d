//! SRS write queue. Recording an answer must never wait on the Leitner-box
//! write, so those updates flow through a bounded channel into one dedicated
//! worker task. Failures are retried with backoff and terminally parked in
//! `srs_dead_letter`; they never reach the caller.

use chrono::Utc;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::{debug, error, info, warn};

use crate::engine::srs;
use crate::progress::ProgressStore;

const RETRY_BACKOFF_MS: u64 = 50;

#[derive(Debug)]
enum SrsJob {
    Review {
        learner_id: i64,
        question_id: i64,
        was_correct: bool,
    },
    Barrier(oneshot::Sender<()>),
    Shutdown,
}

pub struct SrsWriter {
    tx: mpsc::Sender<SrsJob>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl SrsWriter {
    pub fn spawn(store: ProgressStore, capacity: usize, max_retry: u32) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(run_worker(store, rx, max_retry.max(1)));
        info!(capacity, max_retry, "SRS writer started");
        Self {
            tx,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Non-blocking hand-off. A full queue drops the update with a warning;
    /// the box state catches up on the next answer.
    pub fn enqueue(&self, learner_id: i64, question_id: i64, was_correct: bool) {
        let job = SrsJob::Review {
            learner_id,
            question_id,
            was_correct,
        };
        if let Err(err) = self.tx.try_send(job) {
            warn!(learner_id, question_id, error = %err, "SRS update dropped");
        }
    }

    /// Waits until every job enqueued before the call has been processed.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(SrsJob::Barrier(ack_tx)).await.is_ok() {
            let _ = ack_rx.await;
        }
    }

    /// Drains the queue and joins the worker. Jobs already enqueued are still
    /// processed.
    pub async fn stop(&self) {
        let _ = self.tx.send(SrsJob::Shutdown).await;
        if let Some(handle) = self.handle.lock().await.take() {
            if let Err(err) = handle.await {
                error!(error = %err, "SRS worker join failed");
            }
        }
        info!("SRS writer stopped");
    }
}

async fn run_worker(store: ProgressStore, mut rx: mpsc::Receiver<SrsJob>, max_retry: u32) {
    while let Some(job) = rx.recv().await {
        match job {
            SrsJob::Review {
                learner_id,
                question_id,
                was_correct,
            } => {
                process_review(&store, learner_id, question_id, was_correct, max_retry).await;
            }
            SrsJob::Barrier(ack) => {
                let _ = ack.send(());
            }
            SrsJob::Shutdown => break,
        }
    }
    debug!("SRS worker loop ended");
}

async fn process_review(
    store: &ProgressStore,
    learner_id: i64,
    question_id: i64,
    was_correct: bool,
    max_retry: u32,
) {
    let mut last_error = String::new();

    for attempt in 1..=max_retry {
        match srs::record_review(store, learner_id, question_id, was_correct, Utc::now()).await {
            Ok(_) => return,
            Err(err) => {
                last_error = err.to_string();
                warn!(learner_id, question_id, attempt, error = %last_error, "SRS write failed");
                if attempt < max_retry {
                    tokio::time::sleep(Duration::from_millis(RETRY_BACKOFF_MS * u64::from(attempt)))
                        .await;
                }
            }
        }
    }

    let failed_at = Utc::now().timestamp_millis();
    if let Err(err) = store
        .record_dead_letter(learner_id, question_id, was_correct, &last_error, failed_at)
        .await
    {
        error!(learner_id, question_id, error = %err, "failed to record SRS dead letter");
    } else {
        error!(learner_id, question_id, "SRS update dead-lettered");
    }
}
