//! In-memory connection pool
//!
//! [`MemoryPool`] answers every request through a responder closure instead
//! of a server. It records each request, counts acquisitions and can be
//! told to fail them, which makes the dispatch and relationship machinery
//! testable without a database.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;

use super::{Connection, ConnectionPool, QueryRequest, ResultHandler, ResultStream};
use crate::deferred::Deferred;
use crate::errors::{OgmError, Result};

type Responder = dyn Fn(&QueryRequest) -> Result<Vec<Value>> + Send + Sync;

struct PoolState {
    responder: Box<Responder>,
    acquires: AtomicUsize,
    requests: Mutex<Vec<QueryRequest>>,
    acquire_failure: Mutex<Option<OgmError>>,
    closed: AtomicBool,
}

/// A scripted pool; clones share state.
#[derive(Clone)]
pub struct MemoryPool {
    state: Arc<PoolState>,
}

impl MemoryPool {
    /// A pool whose connections answer each request with the messages the
    /// responder returns, or fail the send with its error.
    pub fn replying<F>(responder: F) -> Self
    where
        F: Fn(&QueryRequest) -> Result<Vec<Value>> + Send + Sync + 'static,
    {
        MemoryPool {
            state: Arc::new(PoolState {
                responder: Box::new(responder),
                acquires: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
                acquire_failure: Mutex::new(None),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Fail every later acquisition with `err`.
    pub fn fail_acquire(&self, err: OgmError) {
        *self
            .state
            .acquire_failure
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(err);
    }

    pub fn acquire_count(&self) -> usize {
        self.state.acquires.load(Ordering::SeqCst)
    }

    /// Requests sent so far, oldest first.
    pub fn requests(&self) -> Vec<QueryRequest> {
        self.state
            .requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::SeqCst)
    }
}

impl ConnectionPool for MemoryPool {
    fn acquire(&self) -> Deferred<Arc<dyn Connection>> {
        self.state.acquires.fetch_add(1, Ordering::SeqCst);

        if self.is_closed() {
            return Deferred::failed(OgmError::Connection("pool is closed".to_string()));
        }
        let failure = self
            .state
            .acquire_failure
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        match failure {
            Some(err) => Deferred::failed(err),
            None => Deferred::resolved(Arc::new(MemoryConnection {
                state: Arc::clone(&self.state),
            })),
        }
    }

    fn close(&self) -> Deferred<()> {
        self.state.closed.store(true, Ordering::SeqCst);
        Deferred::resolved(())
    }
}

struct MemoryConnection {
    state: Arc<PoolState>,
}

impl Connection for MemoryConnection {
    fn send(&self, request: QueryRequest) -> Deferred<Box<dyn ResultStream>> {
        let answer = (self.state.responder)(&request);
        let handler = request.handler.clone();
        self.state
            .requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);

        match answer {
            Ok(messages) => {
                let mut stream = BufferedStream::new(messages);
                if let Some(handler) = handler {
                    stream.add_handler(handler);
                }
                Deferred::resolved(Box::new(stream))
            }
            Err(err) => Deferred::failed(err),
        }
    }
}

/// A stream over messages that are already in memory.
pub struct BufferedStream {
    messages: VecDeque<Value>,
    handlers: Vec<ResultHandler>,
}

impl BufferedStream {
    pub fn new(messages: Vec<Value>) -> Self {
        BufferedStream {
            messages: messages.into(),
            handlers: Vec::new(),
        }
    }
}

impl ResultStream for BufferedStream {
    fn read(&mut self) -> Deferred<Option<Value>> {
        let message = self
            .messages
            .pop_front()
            .map(|m| self.handlers.iter().fold(m, |acc, handler| handler(acc)));
        Deferred::resolved(message)
    }

    fn add_handler(&mut self, handler: ResultHandler) {
        self.handlers.push(handler);
    }
}
