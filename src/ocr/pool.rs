//! Fixed-size pool of recognition engines.
//!
//! Callers borrow an engine with [`EnginePool::acquire`] and give it back by
//! dropping the returned guard. When every engine is busy, callers wait in
//! FIFO order: each waiter parks on its own channel, and a released engine is
//! sent straight to the oldest waiter before it would go back to the idle set.

use anyhow::{anyhow, Context, Result};
use std::collections::VecDeque;
use std::ops::{Deref, DerefMut};
use std::sync::mpsc::{channel, SendError, Sender};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use tracing::{debug, info};

use super::engine::RecognitionEngine;

/// Default number of engine instances.
pub const DEFAULT_POOL_SIZE: usize = 4;

struct PoolState<E> {
    idle: Vec<E>,
    waiters: VecDeque<Sender<E>>,
}

pub struct EnginePool<E: RecognitionEngine> {
    state: Mutex<PoolState<E>>,
    size: usize,
}

impl<E: RecognitionEngine> EnginePool<E> {
    /// Creates `size` engines in parallel with `factory(instance_id)`.
    ///
    /// Fails if any engine cannot be created; engines that were created are
    /// shut down before returning.
    pub fn new<F>(size: usize, factory: F) -> Result<Self>
    where
        F: Fn(usize) -> Result<E> + Sync,
    {
        if size == 0 {
            return Err(anyhow!("Engine pool size must be at least 1"));
        }

        let factory = &factory;
        let results: Vec<Result<E>> = thread::scope(|s| {
            let handles: Vec<_> = (0..size)
                .map(|id| s.spawn(move || factory(id)))
                .collect();
            handles
                .into_iter()
                .enumerate()
                .map(|(id, handle)| {
                    handle
                        .join()
                        .unwrap_or_else(|_| Err(anyhow!("Engine {} panicked during startup", id)))
                })
                .collect()
        });

        let mut engines = Vec::with_capacity(size);
        let mut failure = None;
        for (id, result) in results.into_iter().enumerate() {
            match result {
                Ok(engine) => engines.push(engine),
                Err(e) if failure.is_none() => {
                    failure = Some(e.context(format!("Failed to start engine {}", id)))
                }
                Err(_) => {}
            }
        }

        if let Some(e) = failure {
            for engine in engines.iter_mut() {
                engine.shutdown();
            }
            return Err(e);
        }

        info!(size, "Engine pool ready");
        Ok(Self {
            state: Mutex::new(PoolState {
                idle: engines,
                waiters: VecDeque::new(),
            }),
            size,
        })
    }

    /// Creates a pool, runs `body` with it, and terminates the pool afterwards.
    ///
    /// The pool is torn down whether `body` returns normally or unwinds.
    pub fn scoped<F, B, T>(size: usize, factory: F, body: B) -> Result<T>
    where
        F: Fn(usize) -> Result<E> + Sync,
        B: FnOnce(&EnginePool<E>) -> T,
    {
        let pool = Self::new(size, factory).context("Failed to initialize engine pool")?;
        let output = body(&pool);
        pool.terminate();
        Ok(output)
    }

    fn lock(&self) -> MutexGuard<'_, PoolState<E>> {
        // The state is consistent between statements, so a poisoned lock is still usable.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Borrows an engine, blocking until one is free.
    pub fn acquire(&self) -> Result<PooledEngine<'_, E>> {
        let receiver = {
            let mut state = self.lock();
            if let Some(engine) = state.idle.pop() {
                return Ok(PooledEngine {
                    pool: self,
                    engine: Some(engine),
                });
            }
            let (sender, receiver) = channel();
            state.waiters.push_back(sender);
            receiver
        };

        let engine = receiver
            .recv()
            .map_err(|_| anyhow!("Engine pool closed while waiting for an engine"))?;
        Ok(PooledEngine {
            pool: self,
            engine: Some(engine),
        })
    }

    /// Hands `engine` to the oldest live waiter, or returns it to the idle set.
    fn release(&self, mut engine: E) {
        let mut state = self.lock();
        while let Some(waiter) = state.waiters.pop_front() {
            match waiter.send(engine) {
                Ok(()) => return,
                // The waiter gave up; try the next one.
                Err(SendError(returned)) => engine = returned,
            }
        }
        state.idle.push(engine);
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn idle_count(&self) -> usize {
        self.lock().idle.len()
    }

    pub fn waiting_count(&self) -> usize {
        self.lock().waiters.len()
    }

    /// Shuts down every engine. Consumes the pool, so it can only happen once.
    pub fn terminate(mut self) {
        self.shutdown_all();
    }

    fn shutdown_all(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        let count = state.idle.len();
        for mut engine in state.idle.drain(..) {
            engine.shutdown();
        }
        if count > 0 {
            debug!(count, "Engine pool terminated");
        }
    }
}

impl<E: RecognitionEngine> Drop for EnginePool<E> {
    fn drop(&mut self) {
        self.shutdown_all();
    }
}

/// An engine on loan from the pool. Returned to the pool on drop.
pub struct PooledEngine<'a, E: RecognitionEngine> {
    pool: &'a EnginePool<E>,
    engine: Option<E>,
}

impl<E: RecognitionEngine> Deref for PooledEngine<'_, E> {
    type Target = E;

    fn deref(&self) -> &E {
        self.engine.as_ref().expect("engine present until drop")
    }
}

impl<E: RecognitionEngine> DerefMut for PooledEngine<'_, E> {
    fn deref_mut(&mut self) -> &mut E {
        self.engine.as_mut().expect("engine present until drop")
    }
}

impl<E: RecognitionEngine> Drop for PooledEngine<'_, E> {
    fn drop(&mut self) {
        if let Some(engine) = self.engine.take() {
            self.pool.release(engine);
        }
    }
}
