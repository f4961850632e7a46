//! Shared fakes for unit tests: scripted transport, recording notifier and
//! recording navigation sink.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::nav::NavigationSink;
use crate::net::messages::{Notice, Notifier};
use crate::net::transport::{Transport, TransportError};
use crate::net::types::{RawResponse, RequestDescriptor};
use crate::session::SessionStore;
use crate::storage::MemoryStore;

type Responder = Box<dyn Fn(&RequestDescriptor) -> Result<RawResponse, TransportError> + Send + Sync>;

/// Transport that records every request and answers from a script.
pub struct MockTransport {
    pub requests: Mutex<Vec<RequestDescriptor>>,
    queued: Mutex<VecDeque<Result<RawResponse, TransportError>>>,
    fallback: Responder,
    yield_before_reply: bool,
}

impl MockTransport {
    /// Always answer with `respond`.
    pub fn with(respond: impl Fn(&RequestDescriptor) -> Result<RawResponse, TransportError> + Send + Sync + 'static) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            queued: Mutex::new(VecDeque::new()),
            fallback: Box::new(respond),
            yield_before_reply: false,
        }
    }

    /// Always answer `status` with a JSON body.
    pub fn status(status: u16, body: serde_json::Value) -> Self {
        Self::with(move |_| Ok(RawResponse::json(status, &body)))
    }

    /// Answer queued results first, then 200 `null`.
    pub fn queue(results: Vec<Result<RawResponse, TransportError>>) -> Self {
        let mock = Self::status(200, serde_json::Value::Null);
        *mock.queued.lock().unwrap() = results.into();
        mock
    }

    /// Yield to the scheduler before replying so concurrent calls interleave.
    pub fn yielding(mut self) -> Self {
        self.yield_before_reply = true;
        self
    }

    pub fn recorded(&self) -> Vec<RequestDescriptor> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: RequestDescriptor) -> Result<RawResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.yield_before_reply {
            tokio::task::yield_now().await;
        }
        let queued = self.queued.lock().unwrap().pop_front();
        queued.unwrap_or_else(|| (self.fallback)(&request))
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn texts(&self) -> Vec<String> {
        self.notices.lock().unwrap().iter().map(|n| n.text.clone()).collect()
    }

    pub fn count(&self) -> usize {
        self.notices.lock().unwrap().len()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub requested: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn routes(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

impl NavigationSink for RecordingSink {
    fn request_navigation(&self, route: &str) {
        self.requested.lock().unwrap().push(route.to_owned());
    }
}

pub fn memory_session() -> (SessionStore, MemoryStore) {
    let mirror = MemoryStore::new();
    (SessionStore::new(Arc::new(mirror.clone())), mirror)
}
