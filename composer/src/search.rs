//! Debounced, race-safe bridge from the popup query to the index.
//!
//! Every query change bumps the generation and spawns a search task. The task
//! waits out the debounce window and skips the index call entirely if a newer
//! query arrived meanwhile, so the last keystroke is always searched while
//! bursts are coalesced. Completions travel back over a channel to the event
//! loop that owns the coordinator, and [`SearchCoordinator::apply_completion`]
//! drops any completion that is not for the latest generation. Superseded
//! searches are never aborted, only ignored.

use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;

use crate::config::DEFAULT_DEBOUNCE_MS;
use crate::config::DEFAULT_MATCH_LIMIT;
use crate::config::DEFAULT_RECENT_LIMIT;
use crate::index::ReferenceIndex;
use crate::index::SearchResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchPolicy {
    pub debounce: Duration,
    /// Cap for the list shown for an empty query.
    pub recent_limit: usize,
    /// Cap for keyword matches.
    pub match_limit: usize,
}

impl Default for SearchPolicy {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            recent_limit: DEFAULT_RECENT_LIMIT,
            match_limit: DEFAULT_MATCH_LIMIT,
        }
    }
}

/// A finished search, delivered back to the owning event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCompletion {
    /// Identifies the coordinator (one per open popup) that issued the search.
    pub session: u64,
    pub generation: u64,
    pub query: String,
    pub results: Vec<SearchResult>,
}

pub struct SearchCoordinator {
    session: u64,
    index: Arc<dyn ReferenceIndex>,
    policy: SearchPolicy,
    completion_tx: UnboundedSender<SearchCompletion>,
    /// Shared with in-flight tasks so they can notice they were superseded.
    latest_generation: Arc<AtomicU64>,
    generation: u64,
    applied_generation: Option<u64>,
    query: Option<String>,
    results: Vec<SearchResult>,
}

impl SearchCoordinator {
    pub fn new(
        session: u64,
        index: Arc<dyn ReferenceIndex>,
        policy: SearchPolicy,
        completion_tx: UnboundedSender<SearchCompletion>,
    ) -> Self {
        Self {
            session,
            index,
            policy,
            completion_tx,
            latest_generation: Arc::new(AtomicU64::new(0)),
            generation: 0,
            applied_generation: None,
            query: None,
            results: Vec::new(),
        }
    }

    pub fn session(&self) -> u64 {
        self.session
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Results of the latest applied generation.
    pub fn results(&self) -> &[SearchResult] {
        &self.results
    }

    /// `true` while the latest query has not produced results yet.
    pub fn is_searching(&self) -> bool {
        self.query.is_some() && self.applied_generation != Some(self.generation)
    }

    pub fn is_index_ready(&self) -> bool {
        self.index.is_ready()
    }

    pub fn index(&self) -> &Arc<dyn ReferenceIndex> {
        &self.index
    }

    /// Start searching for `query`. Must be called from within a tokio
    /// runtime. Returns the generation issued for this query.
    pub fn on_query_changed(&mut self, query: &str) -> u64 {
        if self.query.as_deref() == Some(query) {
            return self.generation;
        }
        self.generation += 1;
        self.latest_generation
            .store(self.generation, Ordering::Release);
        self.query = Some(query.to_string());

        let task = SearchTask {
            session: self.session,
            generation: self.generation,
            query: query.to_string(),
            index: Arc::clone(&self.index),
            policy: self.policy,
            latest_generation: Arc::clone(&self.latest_generation),
            completion_tx: self.completion_tx.clone(),
        };
        tokio::spawn(task.run());
        self.generation
    }

    /// Apply a completion if it belongs to this coordinator's latest
    /// generation. Returns `true` when the result list was replaced.
    pub fn apply_completion(&mut self, completion: SearchCompletion) -> bool {
        if completion.session != self.session || completion.generation != self.generation {
            tracing::trace!(
                session = completion.session,
                generation = completion.generation,
                latest = self.generation,
                "discarding stale search completion for {:?}",
                completion.query
            );
            return false;
        }
        self.results = completion.results;
        self.applied_generation = Some(completion.generation);
        true
    }
}

struct SearchTask {
    session: u64,
    generation: u64,
    query: String,
    index: Arc<dyn ReferenceIndex>,
    policy: SearchPolicy,
    latest_generation: Arc<AtomicU64>,
    completion_tx: UnboundedSender<SearchCompletion>,
}

impl SearchTask {
    fn is_superseded(&self) -> bool {
        self.latest_generation.load(Ordering::Acquire) != self.generation
    }

    async fn run(self) {
        if !self.policy.debounce.is_zero() {
            tokio::time::sleep(self.policy.debounce).await;
        }
        if self.is_superseded() {
            tracing::trace!(generation = self.generation, "search coalesced into a newer query");
            return;
        }

        let (outcome, limit) = if self.query.is_empty() {
            (self.index.list_recent().await, self.policy.recent_limit)
        } else {
            (self.index.search(&self.query).await, self.policy.match_limit)
        };
        let mut results = match outcome {
            Ok(results) => results,
            Err(err) => {
                tracing::warn!("reference search for {:?} failed: {err:#}", self.query);
                Vec::new()
            }
        };
        results.truncate(limit);

        let _ = self.completion_tx.send(SearchCompletion {
            session: self.session,
            generation: self.generation,
            query: self.query,
            results,
        });
    }
}
