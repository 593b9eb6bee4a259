//! Scripted in-memory transport for tests.

use std::{
    cell::RefCell,
    collections::{HashMap, VecDeque},
    time::Duration,
};

use actix_web::web::Bytes;
use futures::future::{FutureExt as _, LocalBoxFuture};

use crate::{
    client::{Client, RawResponse, RetryPolicy, Transport},
    error::{Error, Result},
};

pub const API: &str = "https://api.test/2.0";

/// Serves queued `(status, body)` responses per URL, in order, and records
/// every requested URL. A URL with nothing queued fails like a refused
/// connection.
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: RefCell<HashMap<String, VecDeque<(u16, String)>>>,
    calls: RefCell<Vec<String>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, status: u16, body: impl Into<String>) -> &Self {
        self.responses
            .borrow_mut()
            .entry(url.to_string())
            .or_default()
            .push_back((status, body.into()));
        self
    }

    pub fn json(&self, path: &str, body: serde_json::Value) -> &Self {
        self.respond(&format!("{}/{}", API, path), 200, body.to_string())
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl Transport for MockTransport {
    fn get<'a>(&'a self, url: &'a str) -> LocalBoxFuture<'a, Result<RawResponse>> {
        self.calls.borrow_mut().push(url.to_string());
        let next = self
            .responses
            .borrow_mut()
            .get_mut(url)
            .and_then(VecDeque::pop_front);
        let res = match next {
            Some((status, body)) => Ok(RawResponse {
                status,
                reason: String::new(),
                body: Bytes::from(body),
            }),
            None => Err(Error::Http {
                url: url.to_string(),
                status: None,
                reason: "connection refused".into(),
            }),
        };
        futures::future::ready(res).boxed_local()
    }
}

pub fn client(transport: &MockTransport) -> Client<&MockTransport> {
    Client::new(
        transport,
        API,
        RetryPolicy::new(3, Duration::ZERO),
    )
}
