//! Scripted in-memory transport for tests.
//!
//! Responses are queued per URL pattern (a substring of the request's display
//! URL) and handed out in order. A pattern registered with
//! [`respond_always`](ScriptedTransport::respond_always) answers every
//! matching request once its queue is empty. Unmatched requests get a 404.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::FetchError;
use crate::http::{ApiRequest, ApiResponse, Transport};

#[derive(Debug, Clone)]
enum Scripted {
    Response(ApiResponse),
    NetworkError(String),
}

struct Route {
    pattern: String,
    queue: VecDeque<Scripted>,
    always: Option<Scripted>,
}

#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one response for requests whose URL contains `pattern`.
    pub fn respond(&self, pattern: &str, status: u16, body: impl Into<String>) -> &Self {
        self.push(pattern, Scripted::Response(ApiResponse { status, body: body.into() }), false)
    }

    /// Answer every otherwise-unscripted matching request with this response.
    pub fn respond_always(&self, pattern: &str, status: u16, body: impl Into<String>) -> &Self {
        self.push(pattern, Scripted::Response(ApiResponse { status, body: body.into() }), true)
    }

    /// Queue one connection-level failure.
    pub fn fail(&self, pattern: &str, message: &str) -> &Self {
        self.push(pattern, Scripted::NetworkError(message.to_string()), false)
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn push(&self, pattern: &str, scripted: Scripted, always: bool) -> &Self {
        let mut routes = self.routes.lock().unwrap_or_else(|e| e.into_inner());
        let index = match routes.iter().position(|r| r.pattern == pattern) {
            Some(i) => i,
            None => {
                routes.push(Route {
                    pattern: pattern.to_string(),
                    queue: VecDeque::new(),
                    always: None,
                });
                routes.len() - 1
            }
        };
        if always {
            routes[index].always = Some(scripted);
        } else {
            routes[index].queue.push_back(scripted);
        }
        self
    }

    fn next_for(&self, url: &str) -> Option<Scripted> {
        let mut routes = self.routes.lock().unwrap_or_else(|e| e.into_inner());
        let mut fallback = None;
        for route in routes.iter_mut().filter(|r| url.contains(&r.pattern)) {
            if let Some(next) = route.queue.pop_front() {
                return Some(next);
            }
            if fallback.is_none() {
                fallback = route.always.clone();
            }
        }
        fallback
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, FetchError> {
        let url = request.display_url();
        if let Ok(mut log) = self.requests.lock() {
            log.push(request.clone());
        }
        match self.next_for(&url) {
            Some(Scripted::Response(resp)) => Ok(resp),
            Some(Scripted::NetworkError(message)) => Err(FetchError::Network { url, message }),
            None => Ok(ApiResponse {
                status: 404,
                body: format!("no scripted response for {url}"),
            }),
        }
    }
}
