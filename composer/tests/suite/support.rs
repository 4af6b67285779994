#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use crossterm::event::KeyCode;
use crossterm::event::KeyEvent;
use crossterm::event::KeyModifiers;
use ctxref_composer::ComposerConfig;
use ctxref_composer::InputResult;
use ctxref_composer::ReferenceComposer;
use ctxref_composer::ReferenceIndex;
use ctxref_composer::ReferencePopup;
use ctxref_composer::SearchCompletion;
use ctxref_composer::SearchResult;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::mpsc::unbounded_channel;

/// Index serving canned results, each after its own delay.
#[derive(Default)]
pub struct ScriptedIndex {
    responses: Mutex<HashMap<String, (Duration, Vec<SearchResult>)>>,
    pub recent: Mutex<Vec<SearchResult>>,
    pub used: Mutex<Vec<String>>,
}

impl ScriptedIndex {
    pub fn with(self, query: &str, delay: Duration, paths: &[&str]) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(query.to_string(), (delay, results(paths)));
        self
    }
}

pub fn results(paths: &[&str]) -> Vec<SearchResult> {
    paths
        .iter()
        .map(|path| SearchResult::new(*path, format!("/p/{path}")))
        .collect()
}

#[async_trait]
impl ReferenceIndex for ScriptedIndex {
    async fn search(&self, query: &str) -> anyhow::Result<Vec<SearchResult>> {
        let response = self.responses.lock().unwrap().get(query).cloned();
        let Some((delay, results)) = response else {
            anyhow::bail!("no scripted response for {query:?}");
        };
        tokio::time::sleep(delay).await;
        Ok(results)
    }

    async fn list_recent(&self) -> anyhow::Result<Vec<SearchResult>> {
        Ok(self.recent.lock().unwrap().clone())
    }

    fn is_ready(&self) -> bool {
        true
    }

    fn record_use(&self, result: &SearchResult) {
        self.used.lock().unwrap().push(result.relative_path.clone());
    }
}

pub struct Harness {
    pub composer: ReferenceComposer,
    pub completions: UnboundedReceiver<SearchCompletion>,
    pub index: Arc<ScriptedIndex>,
}

impl Harness {
    pub fn new(config: ComposerConfig, index: ScriptedIndex) -> Self {
        let (tx, completions) = unbounded_channel();
        let index = Arc::new(index);
        let composer = ReferenceComposer::new(config, Arc::clone(&index) as Arc<dyn ReferenceIndex>, tx);
        Self {
            composer,
            completions,
            index,
        }
    }

    pub fn type_str(&mut self, text: &str) {
        for ch in text.chars() {
            self.press_with(KeyCode::Char(ch), KeyModifiers::NONE);
        }
    }

    pub fn press(&mut self, code: KeyCode) -> InputResult {
        self.press_with(code, KeyModifiers::NONE)
    }

    pub fn press_with(&mut self, code: KeyCode, modifiers: KeyModifiers) -> InputResult {
        self.composer
            .handle_key_event(KeyEvent::new(code, modifiers))
    }

    /// Deliver completions until the popup has settled on its latest query.
    pub async fn settle(&mut self) {
        while self
            .composer
            .popup()
            .is_some_and(ReferencePopup::is_searching)
        {
            let completion = tokio::time::timeout(Duration::from_secs(10), self.completions.recv())
                .await
                .unwrap()
                .unwrap();
            self.composer.on_search_completion(completion);
        }
    }
}
