//! Scripted in-memory transport
//!
//! Routes are matched by URL substring, responses are consumed in FIFO
//! order per route, and every dispatched request is logged so tests can
//! assert call counts ("exactly one render call") and payload shapes.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cms_gateway::{Request, Response, Result, Transport};
use serde_json::json;

struct Route {
    needle: String,
    responses: VecDeque<Response>,
}

#[derive(Default)]
struct MockState {
    routes: Vec<Route>,
    log: Vec<Request>,
    challenges: usize,
    login_counter: usize,
    fail_login: bool,
}

/// A transport whose responses are scripted up front.
///
/// Unscripted `auth/login` (and SSO) calls succeed with a fresh
/// generated sid, so most tests never script authentication at all.
#[derive(Default)]
pub struct MockTransport {
    state: Mutex<MockState>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue `response` for the next request whose URL contains `needle`.
    pub fn enqueue(&self, needle: impl Into<String>, response: Response) {
        let needle = needle.into();
        let mut state = self.state.lock().unwrap();
        match state.routes.iter().position(|route| route.needle == needle) {
            Some(index) => state.routes[index].responses.push_back(response),
            None => state.routes.push(Route {
                needle,
                responses: VecDeque::from([response]),
            }),
        }
    }

    /// Shorthand for queuing an OK response with `payload`.
    pub fn enqueue_ok(&self, needle: impl Into<String>, payload: serde_json::Value) {
        self.enqueue(needle, Response::ok(payload));
    }

    /// Respond `AUTHREQUIRED` to the next `n` non-login calls.
    pub fn challenge_next(&self, n: usize) {
        self.state.lock().unwrap().challenges = n;
    }

    /// Make every login attempt fail.
    pub fn fail_logins(&self) {
        self.state.lock().unwrap().fail_login = true;
    }

    /// All dispatched requests, in order.
    pub fn requests(&self) -> Vec<Request> {
        self.state.lock().unwrap().log.clone()
    }

    /// Number of dispatched requests whose URL contains `needle`.
    pub fn calls_to(&self, needle: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .log
            .iter()
            .filter(|request| request.url.contains(needle))
            .count()
    }

    /// The most recent request whose URL contains `needle`.
    pub fn last_request_to(&self, needle: &str) -> Option<Request> {
        self.state
            .lock()
            .unwrap()
            .log
            .iter()
            .rev()
            .find(|request| request.url.contains(needle))
            .cloned()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn dispatch(&self, request: &Request) -> Result<Response> {
        let mut state = self.state.lock().unwrap();
        state.log.push(request.clone());

        if request.url.contains("auth/") {
            if state.fail_login {
                return Ok(Response::error("login rejected"));
            }
            state.login_counter += 1;
            let sid = format!("sid-{}", state.login_counter);
            return Ok(Response::ok(json!({ "sid": sid })));
        }

        if state.challenges > 0 {
            state.challenges -= 1;
            return Ok(Response::auth_required());
        }

        for route in &mut state.routes {
            if request.url.contains(&route.needle) {
                if let Some(response) = route.responses.pop_front() {
                    return Ok(response);
                }
            }
        }
        Ok(Response::ok(serde_json::Value::Null))
    }
}
