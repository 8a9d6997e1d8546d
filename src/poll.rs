//! Bounded polling of asynchronous video jobs
//!
//! A job moves `Submitted -> Polling -> {Completed, Failed}`. Polls are strictly
//! sequential, separated by a fixed delay, capped by both a poll count and a
//! wall-clock budget, and abandoned as soon as the cancellation token fires.

use crate::ai::VideoJobService;
use crate::models::JobHandle;
use crate::{Error, Result};
use std::time::Duration;
use tokio::time::Instant;
use tokio_retry::strategy::FixedInterval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Cap applied to wait budgets too large to add to an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay before each status poll.
    pub interval: Duration,
    pub max_polls: u32,
    pub max_wait: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_polls: 120,
            max_wait: Duration::from_secs(600),
        }
    }
}

#[derive(Debug)]
pub enum JobState {
    Submitted(JobHandle),
    Polling(JobHandle),
    Completed(JobHandle),
    Failed(Error),
}

impl JobState {
    /// Classify a handle just returned by the provider.
    fn observe(mut handle: JobHandle, submitted: bool) -> Self {
        if handle.done {
            match handle.error.take() {
                Some(message) => JobState::Failed(Error::AiProvider(format!(
                    "Video job {} failed: {}",
                    handle.id, message
                ))),
                None => JobState::Completed(handle),
            }
        } else if submitted {
            JobState::Submitted(handle)
        } else {
            JobState::Polling(handle)
        }
    }
}

/// Race `future` against cancellation and the overall deadline.
async fn guarded<T>(
    future: impl std::future::Future<Output = Result<T>>,
    cancel: &CancellationToken,
    deadline: Instant,
    on_timeout: impl FnOnce() -> Error,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        outcome = tokio::time::timeout_at(deadline, future) => {
            outcome.unwrap_or_else(|_| Err(on_timeout()))
        }
    }
}

/// Poll `handle` until the provider reports it done.
///
/// Returns the terminal handle on success. Fails with [`Error::PollTimeout`]
/// once `policy.max_polls` polls or `policy.max_wait` have been spent, with
/// [`Error::Cancelled`] when `cancel` fires, and with the provider error when a
/// poll fails or the job finishes with an error.
pub async fn wait_for_job(
    service: &dyn VideoJobService,
    handle: JobHandle,
    policy: &PollPolicy,
    cancel: &CancellationToken,
) -> Result<JobHandle> {
    let started = Instant::now();
    let deadline = started
        .checked_add(policy.max_wait)
        .or_else(|| started.checked_add(FAR_FUTURE))
        .unwrap_or(started);
    let mut delays = FixedInterval::new(policy.interval).take(policy.max_polls as usize);
    let mut polls: u32 = 0;
    let mut state = JobState::observe(handle, true);

    loop {
        state = match state {
            JobState::Completed(handle) => {
                info!("Video job {} completed after {} polls", handle.id, polls);
                return Ok(handle);
            }
            JobState::Failed(err) => {
                warn!("Video job failed after {} polls: {}", polls, err);
                return Err(err);
            }
            JobState::Submitted(handle) | JobState::Polling(handle) => {
                let timeout = || Error::PollTimeout {
                    polls,
                    elapsed: started.elapsed(),
                };

                let Some(delay) = delays.next() else {
                    warn!("Video job {} still running after {} polls", handle.id, polls);
                    return Err(timeout());
                };
                let wakes_past_deadline = Instant::now()
                    .checked_add(delay)
                    .map_or(true, |wake| wake > deadline);
                if wakes_past_deadline {
                    warn!(
                        "Video job {} would exceed the {:?} wait budget",
                        handle.id, policy.max_wait
                    );
                    return Err(timeout());
                }

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        info!("Video job {} cancelled while waiting", handle.id);
                        return Err(Error::Cancelled);
                    }
                    _ = tokio::time::sleep(delay) => {}
                }

                polls += 1;
                debug!("Polling video job {} (poll {}/{})", handle.id, polls, policy.max_polls);

                let refreshed = guarded(service.poll_video_job(&handle), cancel, deadline, || {
                    Error::PollTimeout {
                        polls,
                        elapsed: started.elapsed(),
                    }
                })
                .await?;

                JobState::observe(refreshed, false)
            }
        };
    }
}

/// Start a job, racing the start call against cancellation.
pub async fn start_job<F>(start: F, cancel: &CancellationToken) -> Result<JobHandle>
where
    F: std::future::Future<Output = Result<JobHandle>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        handle = start => handle,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::MockVideoJobClient;

    fn fast_policy(max_polls: u32) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(1),
            max_polls,
            max_wait: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn test_completes_after_pending_polls() {
        let client = MockVideoJobClient::new().with_pending_polls(3);
        let handle = JobHandle::pending("op-1");

        let done = wait_for_job(&client, handle, &fast_policy(10), &CancellationToken::new())
            .await
            .unwrap();

        assert!(done.done);
        assert_eq!(client.get_poll_count(), 4);
        assert_eq!(client.get_max_concurrent_polls(), 1);
    }

    #[tokio::test]
    async fn test_already_done_handle_skips_polling() {
        let client = MockVideoJobClient::new();
        let handle = JobHandle::completed("op-1", "https://files/clip");

        let done = wait_for_job(&client, handle, &fast_policy(10), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(done.result_uri.as_deref(), Some("https://files/clip"));
        assert_eq!(client.get_poll_count(), 0);
    }

    #[tokio::test]
    async fn test_never_done_hits_poll_cap() {
        let client = MockVideoJobClient::new().never_completes();
        let handle = JobHandle::pending("op-1");

        let err = wait_for_job(&client, handle, &fast_policy(3), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::PollTimeout { polls: 3, .. }));
        assert_eq!(client.get_poll_count(), 3);
    }

    #[tokio::test]
    async fn test_wait_budget_bounds_polling() {
        let client = MockVideoJobClient::new().never_completes();
        let policy = PollPolicy {
            interval: Duration::from_millis(20),
            max_polls: 1_000,
            max_wait: Duration::from_millis(50),
        };

        let err = wait_for_job(
            &client,
            JobHandle::pending("op-1"),
            &policy,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::PollTimeout { .. }));
        assert!(client.get_poll_count() <= 3);
    }

    #[tokio::test]
    async fn test_cancelled_token_stops_before_polling() {
        let client = MockVideoJobClient::new().never_completes();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = wait_for_job(&client, JobHandle::pending("op-1"), &fast_policy(10), &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Cancelled));
        assert_eq!(client.get_poll_count(), 0);
    }

    #[tokio::test]
    async fn test_cancel_during_wait() {
        let client = MockVideoJobClient::new().never_completes();
        let cancel = CancellationToken::new();
        let policy = PollPolicy {
            interval: Duration::from_secs(60),
            max_polls: 10,
            max_wait: Duration::from_secs(600),
        };

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let err = wait_for_job(&client, JobHandle::pending("op-1"), &policy, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[tokio::test]
    async fn test_job_error_is_provider_failure() {
        let client = MockVideoJobClient::new()
            .with_pending_polls(1)
            .with_job_error("blocked by safety filters");

        let err = wait_for_job(
            &client,
            JobHandle::pending("op-1"),
            &fast_policy(10),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::AiProvider(ref m) if m.contains("safety")));
        assert_eq!(client.get_poll_count(), 2);
    }

    #[tokio::test]
    async fn test_poll_error_propagates() {
        let client = MockVideoJobClient::new().with_poll_failure();

        let err = wait_for_job(
            &client,
            JobHandle::pending("op-1"),
            &fast_policy(10),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::AiProvider(_)));
        assert_eq!(client.get_poll_count(), 1);
    }

    #[tokio::test]
    async fn test_huge_wait_budget_falls_back_to_poll_cap() {
        let client = MockVideoJobClient::new().never_completes();
        let policy = PollPolicy {
            interval: Duration::from_millis(1),
            max_polls: 3,
            max_wait: Duration::from_secs(u64::MAX),
        };

        let err = wait_for_job(
            &client,
            JobHandle::pending("op-1"),
            &policy,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::PollTimeout { polls: 3, .. }));
        assert_eq!(client.get_poll_count(), 3);
    }

    #[tokio::test]
    async fn test_huge_interval_times_out_without_polling() {
        let client = MockVideoJobClient::new().never_completes();
        let policy = PollPolicy {
            interval: Duration::from_secs(u64::MAX),
            max_polls: 3,
            max_wait: Duration::from_secs(5),
        };

        let err = wait_for_job(
            &client,
            JobHandle::pending("op-1"),
            &policy,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::PollTimeout { polls: 0, .. }));
        assert_eq!(client.get_poll_count(), 0);
    }
}
