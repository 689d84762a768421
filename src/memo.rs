//! Memoization of the idempotent diagnostic calls.
//!
//! Separate from retry and cancellation: a [`Memoized`] view simply answers
//! repeated `echo`/`hello`/`fibo` calls from memory. Only successful results
//! are kept, and nothing is ever evicted.

use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};

use crate::{OpResult, Result, Session};

/// Caching view over a session's diagnostic calls.
#[derive(Debug)]
pub struct Memoized<'s> {
    session: &'s Session,
    echo: Mutex<HashMap<String, OpResult<String>>>,
    hello: Mutex<Option<OpResult<String>>>,
    fibo: Mutex<HashMap<u32, OpResult<u64>>>,
}

impl Session {
    /// Wraps this session with an empty diagnostic-call cache.
    pub fn memoized(&self) -> Memoized<'_> {
        Memoized {
            session: self,
            echo: Mutex::default(),
            hello: Mutex::default(),
            fibo: Mutex::default(),
        }
    }
}

impl Memoized<'_> {
    pub async fn echo(&self, input: impl Into<String>) -> Result<OpResult<String>> {
        let input = input.into();
        if let Some(hit) = lock(&self.echo).get(&input) {
            return Ok(hit.clone());
        }
        let result = self.session.echo(input.clone()).await?;
        if result.is_ok() {
            lock(&self.echo).insert(input, result.clone());
        }
        Ok(result)
    }

    pub async fn hello(&self) -> Result<OpResult<String>> {
        if let Some(hit) = lock(&self.hello).as_ref() {
            return Ok(hit.clone());
        }
        let result = self.session.hello().await?;
        if result.is_ok() {
            *lock(&self.hello) = Some(result.clone());
        }
        Ok(result)
    }

    pub async fn fibo(&self, n: u32) -> Result<OpResult<u64>> {
        if let Some(hit) = lock(&self.fibo).get(&n) {
            return Ok(hit.clone());
        }
        let result = self.session.fibo(n).await?;
        if result.is_ok() {
            lock(&self.fibo).insert(n, result.clone());
        }
        Ok(result)
    }

    /// Number of cached results across all diagnostic calls.
    pub fn len(&self) -> usize {
        lock(&self.echo).len() + usize::from(lock(&self.hello).is_some()) + lock(&self.fibo).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// Cached values are plain data, so a poisoned lock still holds usable state.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
