//! Shared harness for shell integration tests
//!
//! `ScriptedFetcher` answers each path either from a fixed payload or from a
//! queue of oneshot channels, so a test decides exactly when (and in which
//! order) in-flight fetches resolve.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_shell::config::Config;
use bridge_shell::dirty_form::ConfirmPrompt;
use bridge_shell::fetch::{FetchError, FrameFetcher, FrameRequest};
use bridge_shell::frame::Frame;
use bridge_shell::overlay::{OnClose, OverlayRenderer};
use bridge_shell::shell::{Shell, ShellUpdate};
use serde_json::{Value, json};
use std::cell::Cell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

pub type Reply = oneshot::Sender<Result<Value, FetchError>>;

#[derive(Default)]
pub struct ScriptedFetcher {
    expected: Mutex<HashMap<String, VecDeque<oneshot::Receiver<Result<Value, FetchError>>>>>,
    fixed: Mutex<HashMap<String, Value>>,
    requests: Mutex<Vec<FrameRequest>>,
}

impl ScriptedFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Always answer `path` with `payload`
    pub fn serve(&self, path: &str, payload: Value) {
        self.fixed.lock().unwrap().insert(path.to_string(), payload);
    }

    /// The next fetch of `path` waits until the returned sender fires.
    /// Takes priority over `serve`.
    pub fn expect(&self, path: &str) -> Reply {
        let (sender, receiver) = oneshot::channel();
        self.expected
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back(receiver);
        sender
    }

    /// Requests seen so far, in the order the fetches started running
    pub fn requests(&self) -> Vec<FrameRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl FrameFetcher for ScriptedFetcher {
    async fn fetch(&self, request: FrameRequest) -> Result<Value, FetchError> {
        self.requests.lock().unwrap().push(request.clone());

        let waiting = self
            .expected
            .lock()
            .unwrap()
            .get_mut(&request.path)
            .and_then(|queue| queue.pop_front());
        if let Some(receiver) = waiting {
            return receiver
                .await
                .unwrap_or_else(|_| Err(FetchError::network("reply dropped")));
        }

        match self.fixed.lock().unwrap().get(&request.path) {
            Some(payload) => Ok(payload.clone()),
            None => Err(FetchError::network(format!("no route for {}", request.path))),
        }
    }
}

/// Confirmation prompt with a scripted answer that counts how often it ran
#[derive(Clone, Default)]
pub struct ScriptedPrompt {
    answer: Rc<Cell<bool>>,
    asked: Rc<Cell<u32>>,
}

impl ScriptedPrompt {
    pub fn answering(answer: bool) -> Self {
        let prompt = Self::default();
        prompt.answer.set(answer);
        prompt
    }

    pub fn set_answer(&self, answer: bool) {
        self.answer.set(answer);
    }

    pub fn times_asked(&self) -> u32 {
        self.asked.get()
    }
}

impl ConfirmPrompt for ScriptedPrompt {
    fn confirm(&self, _message: &str) -> bool {
        self.asked.set(self.asked.get() + 1);
        self.answer.get()
    }
}

pub fn shell(fetcher: &Arc<ScriptedFetcher>, prompt: &ScriptedPrompt) -> Shell {
    Shell::new(fetcher.clone(), Config::default(), prompt.clone())
}

pub fn view_renderer() -> OverlayRenderer {
    Box::new(|frame: &Frame| format!("<{}>", frame.title()))
}

/// Close listener that counts its invocations
pub fn counting_on_close(counter: &Rc<Cell<u32>>) -> Option<OnClose> {
    let counter = Rc::clone(counter);
    Some(Box::new(move || counter.set(counter.get() + 1)))
}

pub fn page(title: &str) -> Value {
    page_with_messages(title, &[])
}

pub fn page_with_messages(title: &str, messages: &[(&str, &str)]) -> Value {
    let messages: Vec<Value> = messages
        .iter()
        .map(|(level, text)| json!({ "level": level, "text": text }))
        .collect();
    json!({
        "action": "render",
        "view": "Page",
        "metadata": { "title": title },
        "props": { "title": title },
        "context": {},
        "messages": messages,
    })
}

pub fn overlay_page(title: &str) -> Value {
    let mut payload = page(title);
    payload["overlay"] = json!(true);
    payload
}

pub fn redirect(path: &str) -> Value {
    json!({ "action": "redirect", "path": path })
}

pub fn reload() -> Value {
    json!({ "action": "reload" })
}

pub fn close_overlay() -> Value {
    json!({ "action": "close-overlay" })
}

/// Apply the next completion, failing the test instead of hanging
pub async fn next_update(shell: &mut Shell) -> ShellUpdate {
    tokio::time::timeout(Duration::from_secs(5), shell.process_next())
        .await
        .expect("timed out waiting for a fetch to resolve")
        .expect("no fetch in flight")
}

pub async fn settle(shell: &mut Shell) -> Vec<ShellUpdate> {
    tokio::time::timeout(Duration::from_secs(5), shell.settle())
        .await
        .expect("timed out settling the shell")
}

pub fn history_paths(shell: &Shell) -> Vec<String> {
    shell
        .history()
        .map(|history| history.entries().iter().map(|entry| entry.path.clone()).collect())
        .unwrap_or_default()
}

pub fn message_texts(shell: &Shell) -> Vec<String> {
    shell.messages().iter().map(|message| message.text.clone()).collect()
}

pub fn current_path(shell: &Shell) -> Option<String> {
    shell.current_frame().map(|frame| frame.path.clone())
}

/// Load `path` (which must be served) into the primary view
pub async fn load(shell: &mut Shell, path: &str) {
    shell.navigate(path, bridge_shell::navigation::HistoryMode::Push);
    settle(shell).await;
    assert_eq!(current_path(shell).as_deref(), Some(path));
}
