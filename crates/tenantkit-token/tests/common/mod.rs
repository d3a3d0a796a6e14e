//! Shared fakes for the lifecycle tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use tenantkit_token::{TokenError, TokenSettings, Transport};

/// A transport that answers each path from a queue of canned responses and
/// records every call.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<Vec<(String, VecDeque<Value>)>>,
    calls: Mutex<Vec<(String, Option<Value>)>>,
    count: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue a response for any URL whose path is `path`. The last queued
    /// response for a path repeats once the queue drains.
    pub fn respond(&self, path: &str, response: Value) {
        let mut responses = self.responses.lock().unwrap();
        match responses.iter_mut().find(|(p, _)| p == path) {
            Some((_, queue)) => queue.push_back(response),
            None => responses.push((path.to_string(), VecDeque::from([response]))),
        }
    }

    pub fn calls(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(url, _)| url_path(url) == path)
            .count()
    }

    pub fn urls_to(&self, path: &str) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(url, _)| url_path(url) == path)
            .map(|(url, _)| url.clone())
            .collect()
    }

    fn answer(&self, url: &str, body: Option<&Value>) -> Result<Value, TokenError> {
        self.count.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().unwrap().push((url.to_string(), body.cloned()));
        let path = url_path(url);
        let mut responses = self.responses.lock().unwrap();
        let queue = responses
            .iter_mut()
            .find(|(p, _)| p == path)
            .map(|(_, q)| q)
            .unwrap_or_else(|| panic!("unexpected call to {path}"));
        let response = if queue.len() > 1 {
            queue.pop_front().unwrap()
        } else {
            queue.front().cloned().unwrap()
        };
        Ok(response)
    }
}

fn url_path(url: &str) -> &str {
    let without_query = url.split('?').next().unwrap();
    match without_query.find("://") {
        Some(i) => {
            let rest = &without_query[i + 3..];
            rest.find('/').map(|j| &rest[j..]).unwrap_or("/")
        }
        None => without_query,
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, url: &str) -> Result<Value, TokenError> {
        self.answer(url, None)
    }

    async fn post(&self, url: &str, body: &Value) -> Result<Value, TokenError> {
        self.answer(url, Some(body))
    }
}

pub fn settings() -> TokenSettings {
    TokenSettings {
        base_url: "https://platform.test".to_string(),
        ..TokenSettings::default()
    }
}
