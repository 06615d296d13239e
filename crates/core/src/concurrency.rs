//! Scatter/gather task groups.
//!
//! Every engine phase launches a batch of futures and waits for all of them
//! before moving on. The futures are polled together on the calling task
//! (cooperative concurrency, no worker threads), which lets them borrow the
//! engine's state.

use std::future::Future;

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use tokio_util::sync::CancellationToken;

/// Outcome of a fail-fast join.
#[derive(Debug)]
pub struct Joined<T, E> {
    /// Outputs of the tasks that succeeded, in completion order.
    pub completed: Vec<T>,
    /// The first failure, if any.
    pub failure: Option<E>,
    /// Tasks that were cancelled before finishing.
    pub cancelled: usize,
}

impl<T, E> Joined<T, E> {
    /// Drops the outputs of successful tasks when something failed.
    pub fn into_result(self) -> Result<Vec<T>, E> {
        match self.failure {
            Some(err) => Err(err),
            None => Ok(self.completed),
        }
    }
}

/// A group of futures joined as one barrier.
pub struct TaskGroup<'a, T, E> {
    token: CancellationToken,
    tasks: FuturesUnordered<BoxFuture<'a, Option<Result<T, E>>>>,
}

impl<'a, T, E> Default for TaskGroup<'a, T, E>
where
    T: Send + 'a,
    E: Send + 'a,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T, E> TaskGroup<'a, T, E>
where
    T: Send + 'a,
    E: Send + 'a,
{
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            tasks: FuturesUnordered::new(),
        }
    }

    /// Adds a task to the group. Nothing runs until the group is joined.
    pub fn push<F>(&mut self, task: F)
    where
        F: Future<Output = Result<T, E>> + Send + 'a,
    {
        let token = self.token.clone();
        self.tasks.push(
            async move {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => None,
                    result = task => Some(result),
                }
            }
            .boxed(),
        );
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Waits for every task. The first failure cancels the tasks still
    /// running; the group still waits for them to settle before returning.
    pub async fn join(mut self) -> Joined<T, E> {
        let mut joined = Joined {
            completed: Vec::with_capacity(self.tasks.len()),
            failure: None,
            cancelled: 0,
        };

        while let Some(outcome) = self.tasks.next().await {
            match outcome {
                Some(Ok(value)) => joined.completed.push(value),
                // Once the token is cancelled no other task can finish, so
                // this is always the first failure.
                Some(Err(err)) => {
                    self.token.cancel();
                    joined.failure = Some(err);
                }
                None => joined.cancelled += 1,
            }
        }

        joined
    }

    /// Waits for every task without cancelling anything and returns every
    /// result, in completion order.
    pub async fn join_settled(mut self) -> Vec<Result<T, E>> {
        let mut results = Vec::with_capacity(self.tasks.len());
        while let Some(outcome) = self.tasks.next().await {
            if let Some(result) = outcome {
                results.push(result);
            }
        }
        results
    }
}
