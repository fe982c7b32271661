//! Frontier for managing pending crawl requests and their retries
//!
//! This module handles:
//! - FIFO queueing with forefront insertion at the head
//! - Request dedup by normalized URL
//! - In-flight tracking so workers know when the crawl is finished
//! - The bounded retry policy
//! - An optional size bound with an explicit overflow policy

use crate::crawler::dedup::{DedupIndex, EntityId};
use crate::state::{Priority, Request};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

/// Result of an `enqueue` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnqueueReport {
    /// Requests that entered the queue
    pub added: usize,

    /// Requests whose URL was already enqueued earlier in the run
    pub duplicates: usize,

    /// Normal-priority requests rejected because the frontier was full
    pub dropped: usize,
}

/// What happened to a request after a failed attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureOutcome {
    /// Re-enqueued at the forefront for another attempt
    Retrying { attempt: u32 },

    /// The retry budget is spent (or the failure is permanent); the request is dropped
    Exhausted(Request),
}

struct FrontierState {
    queue: VecDeque<Request>,
    in_flight: usize,
    handled: u64,
}

/// Frontier manages the queue of requests waiting to be processed
///
/// The frontier coordinates:
/// - Exactly-once delivery of each attempt to one worker
/// - Forefront requests served before already-queued normal ones
/// - Termination once the queue is empty and nothing is in flight
///
/// Requests re-enqueued by the retry policy bypass dedup and the size bound;
/// they were admitted once already.
pub struct Frontier {
    state: Mutex<FrontierState>,

    /// URLs ever admitted to the queue
    seen: DedupIndex,

    /// Wakes workers blocked in `dequeue`
    notify: Notify,

    max_request_retries: u32,

    max_size: Option<usize>,
}

impl Frontier {
    /// Creates a new frontier
    ///
    /// # Arguments
    ///
    /// * `max_request_retries` - Retries granted to each request after its first attempt
    /// * `max_size` - Bound on queued requests, `None` for unbounded
    pub fn new(max_request_retries: u32, max_size: Option<usize>) -> Self {
        Self {
            state: Mutex::new(FrontierState {
                queue: VecDeque::new(),
                in_flight: 0,
                handled: 0,
            }),
            seen: DedupIndex::new(),
            notify: Notify::new(),
            max_request_retries,
            max_size,
        }
    }

    fn lock(&self) -> MutexGuard<'_, FrontierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a batch of requests
    ///
    /// With `forefront` the batch is placed ahead of everything already queued,
    /// keeping its own order. A later forefront batch goes ahead of an earlier one.
    ///
    /// When the frontier is full, normal-priority requests are dropped and
    /// reported; forefront requests are always admitted because they are the
    /// depth-first continuation of work already in progress.
    pub fn enqueue(&self, requests: Vec<Request>, forefront: bool) -> EnqueueReport {
        let mut report = EnqueueReport::default();
        let priority = if forefront {
            Priority::Forefront
        } else {
            Priority::Normal
        };

        let mut state = self.lock();
        let mut admitted = Vec::with_capacity(requests.len());

        for mut request in requests {
            let id = EntityId::Url(request.unique_key().to_string());
            if self.seen.contains(&id) {
                tracing::trace!("Already enqueued: {}", request.unique_key());
                report.duplicates += 1;
                continue;
            }

            let full = self
                .max_size
                .is_some_and(|max| state.queue.len() + admitted.len() >= max);
            if full && !forefront {
                tracing::warn!(
                    "Frontier full ({} queued), dropping {}",
                    state.queue.len(),
                    request.url()
                );
                report.dropped += 1;
                continue;
            }

            // The state lock serializes every insert, so contains-then-insert cannot race
            self.seen.insert(id);
            request.set_priority(priority);
            admitted.push(request);
        }

        report.added = admitted.len();
        if forefront {
            for request in admitted.into_iter().rev() {
                state.queue.push_front(request);
            }
        } else {
            state.queue.extend(admitted);
        }
        drop(state);

        if report.added > 0 {
            self.notify.notify_waiters();
        }
        report
    }

    /// Takes the next request to process
    ///
    /// Waits while the queue is empty but other requests are still in flight,
    /// since their handlers may enqueue more work.
    ///
    /// # Returns
    ///
    /// * `Some(Request)` - A request now owned by the caller; report its outcome
    ///   with `report_success` or `report_failure`
    /// * `None` - The queue is empty and nothing is in flight: the crawl is done
    pub async fn dequeue(&self) -> Option<Request> {
        loop {
            // Registered before the check so a wake-up between check and await is not lost
            let notified = self.notify.notified();
            {
                let mut state = self.lock();
                if let Some(request) = state.queue.pop_front() {
                    state.in_flight += 1;
                    return Some(request);
                }
                if state.in_flight == 0 {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Marks a dequeued request as handled
    pub fn report_success(&self, request: &Request) {
        let mut state = self.lock();
        state.in_flight = state.in_flight.saturating_sub(1);
        state.handled += 1;
        drop(state);

        tracing::trace!("Handled {}", request.url());
        self.notify.notify_waiters();
    }

    /// Applies the retry policy to a failed request
    ///
    /// The attempt counter is incremented; while it stays within
    /// `max_request_retries` the request goes back to the head of the queue.
    /// Non-retryable failures are exhausted immediately.
    pub fn report_failure(&self, mut request: Request, retryable: bool) -> FailureOutcome {
        request.record_failed_attempt();
        let attempt = request.attempt();

        let mut state = self.lock();
        let outcome = if retryable && attempt <= self.max_request_retries {
            request.set_priority(Priority::Forefront);
            state.queue.push_front(request);
            FailureOutcome::Retrying { attempt }
        } else {
            state.handled += 1;
            FailureOutcome::Exhausted(request)
        };
        // Requeue happens before the in-flight slot is released
        state.in_flight = state.in_flight.saturating_sub(1);
        drop(state);

        self.notify.notify_waiters();
        outcome
    }

    /// Returns the number of queued requests
    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    /// Returns whether no request is queued
    pub fn is_empty(&self) -> bool {
        self.lock().queue.is_empty()
    }

    /// Returns the number of requests currently owned by workers
    pub fn in_flight(&self) -> usize {
        self.lock().in_flight
    }

    /// Returns the number of requests that reached a final outcome
    pub fn handled(&self) -> u64 {
        self.lock().handled
    }
}
