//! Concurrent fan-out of façade calls over one [`Session`].
//!
//! All calls of a batch are multiplexed onto the caller's task and joined
//! before [`Batch::run`] returns; nothing is spawned and nothing outlives
//! the batch.

use std::{
    future::Future,
    pin::pin,
    time::{Duration, Instant},
};

use futures::future::join_all;
use tokio::time::sleep;

use crate::{KvsError, OpResult, Params, Result, Session};

/// Wall-clock limit for a single long-running call.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Deadline {
    /// Elapsed time after which the call is cancelled.
    pub limit: Duration,
    /// How often the call is checked against `limit`.
    pub poll_interval: Duration,
}

impl Deadline {
    pub fn new(limit: Duration) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Self {
            limit: Duration::from_secs(10),
            poll_interval: Duration::from_millis(250),
        }
    }
}

/// Terminal state of a call run under a [`Deadline`].
#[derive(Debug)]
pub enum Deadlined<T> {
    Finished(T),
    /// The call was dropped after running for `elapsed`.
    Cancelled(Duration),
}

/// Runs `call`, checking it every `poll_interval` and cancelling it once
/// `limit` has elapsed.
///
/// Cancellation drops the call's future, which aborts its request and
/// releases the connection before this function returns.
pub async fn with_deadline<F: Future>(call: F, deadline: Deadline) -> Deadlined<F::Output> {
    let started = Instant::now();
    let mut call = pin!(call);
    loop {
        tokio::select! {
            biased;
            output = &mut call => return Deadlined::Finished(output),
            _ = sleep(deadline.poll_interval) => {
                let elapsed = started.elapsed();
                if elapsed >= deadline.limit {
                    return Deadlined::Cancelled(elapsed);
                }
            }
        }
    }
}

/// Outcome of one input of a batch.
#[derive(Debug)]
pub enum BatchOutcome<T> {
    /// The call produced a result, successful or not.
    Completed(OpResult<T>),
    /// The call failed at the transport level after exhausting its retries.
    Failed { params: Params, error: KvsError },
    /// The call ran past its deadline and was cancelled.
    Cancelled { params: Params, elapsed: Duration },
}

impl<T> BatchOutcome<T> {
    /// Inputs of the call this outcome belongs to.
    pub fn params(&self) -> &Params {
        match self {
            Self::Completed(result) => result.params(),
            Self::Failed { params, .. } | Self::Cancelled { params, .. } => params,
        }
    }

    pub fn completed(&self) -> Option<&OpResult<T>> {
        match self {
            Self::Completed(result) => Some(result),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    fn is_session_failure(&self) -> bool {
        matches!(self, Self::Failed { error, .. } if error.is_session_failure())
    }
}

/// Builder for a concurrent batch over one session.
#[derive(Debug)]
pub struct Batch<'s> {
    session: &'s Session,
    deadline: Option<Deadline>,
}

impl Session {
    /// Starts a batch of concurrent calls on this session.
    pub fn batch(&self) -> Batch<'_> {
        Batch {
            session: self,
            deadline: None,
        }
    }
}

impl<'s> Batch<'s> {
    /// Bounds every call of the batch by `deadline`, independently: a
    /// cancelled call does not affect its siblings.
    pub fn with_deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Issues `op` once per input, concurrently, and waits for all of them.
    ///
    /// Returns one outcome per input, in input order; each outcome also
    /// carries its inputs as [`Params`]. A failed call never hides the
    /// others, except when the session itself became unusable (server
    /// disconnected or timed out): then the whole batch fails with that
    /// error, see [`KvsError::is_session_failure`].
    ///
    /// # Example
    ///
    /// ```no_run
    /// use kvs_client::{Int, KvsClient};
    ///
    /// # async fn run() -> kvs_client::Result<()> {
    /// let kvs = KvsClient::from_env()?;
    /// let mut session = kvs.open()?;
    /// let outcomes = session
    ///     .batch()
    ///     .run(vec!["a".to_owned(), "b".to_owned()], |s, key| s.get::<Int>(key))
    ///     .await?;
    /// for outcome in outcomes {
    ///     println!("{:?}", outcome.completed());
    /// }
    /// session.close().await;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn run<In, T, F, Fut>(
        self,
        inputs: impl IntoIterator<Item = In>,
        op: F,
    ) -> Result<Vec<BatchOutcome<T>>>
    where
        In: Clone + Into<Params>,
        F: Fn(&'s Session, In) -> Fut,
        Fut: Future<Output = Result<OpResult<T>>>,
    {
        let session = self.session;
        session.http()?;

        let deadline = self.deadline;
        let calls = inputs.into_iter().map(|input| {
            let params: Params = input.clone().into();
            let call = op(session, input);
            async move {
                match deadline {
                    Some(deadline) => match with_deadline(call, deadline).await {
                        Deadlined::Finished(output) => settle(params, output),
                        Deadlined::Cancelled(elapsed) => {
                            #[cfg(feature = "tracing")]
                            tracing::warn!(
                                params = %params,
                                ?elapsed,
                                "call cancelled after deadline"
                            );
                            BatchOutcome::Cancelled { params, elapsed }
                        }
                    },
                    None => settle(params, call.await),
                }
            }
        });

        let mut outcomes = join_all(calls).await;

        if let Some(index) = outcomes.iter().position(BatchOutcome::is_session_failure) {
            if let BatchOutcome::Failed { error, .. } = outcomes.swap_remove(index) {
                return Err(error);
            }
        }
        Ok(outcomes)
    }
}

fn settle<T>(params: Params, output: Result<OpResult<T>>) -> BatchOutcome<T> {
    match output {
        Ok(result) => BatchOutcome::Completed(result),
        Err(error) => {
            #[cfg(feature = "tracing")]
            tracing::error!(params = %params, "call failed: {error}");
            BatchOutcome::Failed { params, error }
        }
    }
}
