//! Workspace index backing the reference popup.
//!
//! [`FileIndex::open`] starts a parallel, `.gitignore`-aware walk of a
//! directory on a background thread and streams every entry into a `nucleo`
//! matcher. Searches may run while the walk is still going; they simply see
//! fewer entries until [`FileIndex::is_ready`] turns `true`.

use async_trait::async_trait;
use ctxref_composer::ReferenceIndex;
use ctxref_composer::SearchResult;
use ignore::WalkBuilder;
use ignore::overrides::OverrideBuilder;
use nucleo::Config;
use nucleo::Injector;
use nucleo::Matcher;
use nucleo::Nucleo;
use nucleo::Utf32String;
use nucleo::pattern::CaseMatching;
use nucleo::pattern::Normalization;
use std::collections::HashSet;
use std::collections::VecDeque;
use std::num::NonZero;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Condvar;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;
use std::time::SystemTime;

mod cli;

pub use cli::Cli;

const TICK_TIMEOUT_MS: u64 = 10;

#[derive(Debug, Clone)]
pub struct FileIndexOptions {
    /// Glob patterns (gitignore syntax) for entries to leave out.
    pub exclude: Vec<String>,
    pub respect_gitignore: bool,
    pub threads: NonZero<usize>,
    /// Maximum number of matches a single search returns.
    pub limit: NonZero<usize>,
    /// Length of the most-recently-used list, and of [`FileIndex::recent`].
    pub recent_capacity: NonZero<usize>,
    pub compute_indices: bool,
}

impl Default for FileIndexOptions {
    fn default() -> Self {
        Self {
            exclude: Vec::new(),
            respect_gitignore: true,
            #[expect(clippy::unwrap_used)]
            threads: NonZero::new(2).unwrap(),
            #[expect(clippy::unwrap_used)]
            limit: NonZero::new(50).unwrap(),
            #[expect(clippy::unwrap_used)]
            recent_capacity: NonZero::new(20).unwrap(),
            compute_indices: true,
        }
    }
}

#[derive(Debug)]
pub struct FileSearchResults {
    pub matches: Vec<SearchResult>,
    pub total_match_count: usize,
}

/// One walked entry, as stored in the matcher.
struct IndexedEntry {
    absolute_path: PathBuf,
    relative_path: String,
    is_directory: bool,
    modified: Option<SystemTime>,
}

impl IndexedEntry {
    fn to_result(&self, score: u32, indices: Option<Vec<u32>>) -> SearchResult {
        SearchResult {
            score,
            is_directory: self.is_directory,
            indices,
            ..SearchResult::new(self.relative_path.clone(), self.absolute_path.clone())
        }
    }
}

struct MatcherState {
    nucleo: Nucleo<IndexedEntry>,
    last_query: String,
    /// Rescores ranked items; the 0.5 snapshot exposes order but not scores.
    scorer: Matcher,
}

struct IndexInner {
    root: PathBuf,
    options: FileIndexOptions,
    matcher: Mutex<MatcherState>,
    recent: Mutex<VecDeque<SearchResult>>,
    walk_complete: AtomicBool,
    walk_complete_cv: (Mutex<bool>, Condvar),
    shutdown: AtomicBool,
    entry_count: AtomicUsize,
}

/// A searchable snapshot of a directory tree.
pub struct FileIndex {
    inner: Arc<IndexInner>,
}

impl FileIndex {
    /// Start indexing `root`. Returns as soon as the walk has been started.
    pub fn open(root: &Path, options: FileIndexOptions) -> anyhow::Result<FileIndex> {
        if !root.is_dir() {
            anyhow::bail!("{} is not a directory", root.display());
        }
        let override_matcher = build_override_matcher(root, &options.exclude)?;

        let nucleo = Nucleo::new(
            Config::DEFAULT.match_paths(),
            Arc::new(|| {}),
            Some(options.threads.get()),
            1,
        );
        let injector = nucleo.injector();

        let inner = Arc::new(IndexInner {
            root: root.to_path_buf(),
            options,
            matcher: Mutex::new(MatcherState {
                nucleo,
                last_query: String::new(),
                scorer: Matcher::new(Config::DEFAULT.match_paths()),
            }),
            recent: Mutex::new(VecDeque::new()),
            walk_complete: AtomicBool::new(false),
            walk_complete_cv: (Mutex::new(false), Condvar::new()),
            shutdown: AtomicBool::new(false),
            entry_count: AtomicUsize::new(0),
        });

        let walker_inner = inner.clone();
        thread::spawn(move || walker_worker(walker_inner, override_matcher, injector));

        Ok(FileIndex { inner })
    }

    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    /// `true` once the initial walk has finished.
    pub fn is_ready(&self) -> bool {
        self.inner.walk_complete.load(Ordering::Acquire)
    }

    /// Block until the walk finishes or `timeout` elapses. Returns whether the
    /// index is ready.
    pub fn wait_until_ready(&self, timeout: Duration) -> bool {
        let (mutex, cv) = &self.inner.walk_complete_cv;
        let guard = lock(mutex);
        let (complete, _) = cv
            .wait_timeout_while(guard, timeout, |complete| !*complete)
            .unwrap_or_else(PoisonError::into_inner);
        *complete
    }

    /// Number of entries indexed so far.
    pub fn entry_count(&self) -> usize {
        self.inner.entry_count.load(Ordering::Relaxed)
    }

    /// Blocking search; prefer [`ReferenceIndex::search`] from async code.
    pub fn search_blocking(&self, query: &str) -> FileSearchResults {
        self.inner.search(query)
    }

    /// Most recently used entries first, topped up with the most recently
    /// modified files.
    pub fn recent(&self) -> Vec<SearchResult> {
        self.inner.recent()
    }
}

impl Drop for FileIndex {
    fn drop(&mut self) {
        self.inner.shutdown.store(true, Ordering::Relaxed);
    }
}

#[async_trait]
impl ReferenceIndex for FileIndex {
    async fn search(&self, query: &str) -> anyhow::Result<Vec<SearchResult>> {
        let inner = Arc::clone(&self.inner);
        let query = query.to_string();
        let results = tokio::task::spawn_blocking(move || inner.search(&query)).await?;
        Ok(results.matches)
    }

    async fn list_recent(&self) -> anyhow::Result<Vec<SearchResult>> {
        let inner = Arc::clone(&self.inner);
        Ok(tokio::task::spawn_blocking(move || inner.recent()).await?)
    }

    fn is_ready(&self) -> bool {
        FileIndex::is_ready(self)
    }

    fn record_use(&self, result: &SearchResult) {
        let mut recent = lock(&self.inner.recent);
        recent.retain(|entry| entry.id != result.id);
        recent.push_front(SearchResult {
            score: 0,
            indices: None,
            ..result.clone()
        });
        recent.truncate(self.inner.options.recent_capacity.get());
    }
}

impl IndexInner {
    fn search(&self, query: &str) -> FileSearchResults {
        let limit = self.options.limit.get();
        let mut state = lock(&self.matcher);
        let MatcherState {
            nucleo,
            last_query,
            scorer,
        } = &mut *state;

        let append = query.starts_with(last_query.as_str());
        nucleo.pattern.reparse(
            0,
            query,
            CaseMatching::Smart,
            Normalization::Smart,
            append,
        );
        *last_query = query.to_string();
        while nucleo.tick(TICK_TIMEOUT_MS).running {}

        let snapshot = nucleo.snapshot();
        let pattern = snapshot.pattern().column_pattern(0);

        // Items arrive best first. Keep every entry tied with the last one
        // that fits so the final order does not depend on how nucleo orders
        // ties.
        let mut matches: Vec<SearchResult> = Vec::new();
        let mut boundary = None;
        for item in snapshot.matched_items(..) {
            let haystack = item.matcher_columns[0].slice(..);
            let Some(score) = pattern.score(haystack, scorer) else {
                continue;
            };
            if matches.len() >= limit && boundary != Some(score) {
                break;
            }
            if matches.len() + 1 == limit {
                boundary = Some(score);
            }
            let indices = self.options.compute_indices.then(|| {
                let mut idx_vec = Vec::<u32>::new();
                let _ = pattern.indices(haystack, scorer, &mut idx_vec);
                idx_vec.sort_unstable();
                idx_vec.dedup();
                idx_vec
            });
            matches.push(item.data.to_result(score, indices));
        }
        matches.sort_by(by_score_then_path);
        matches.truncate(limit);

        tracing::debug!(
            query,
            matched = snapshot.matched_item_count(),
            scanned = snapshot.item_count(),
            "file index search"
        );
        FileSearchResults {
            matches,
            total_match_count: snapshot.matched_item_count() as usize,
        }
    }

    fn recent(&self) -> Vec<SearchResult> {
        let capacity = self.options.recent_capacity.get();
        let mut out: Vec<SearchResult> = lock(&self.recent).iter().cloned().collect();
        if out.len() >= capacity {
            out.truncate(capacity);
            return out;
        }

        let mut state = lock(&self.matcher);
        while state.nucleo.tick(TICK_TIMEOUT_MS).running {}
        let snapshot = state.nucleo.snapshot();

        let seen: HashSet<String> = out.iter().map(|result| result.id.clone()).collect();
        let mut by_mtime: Vec<(SystemTime, SearchResult)> = (0..snapshot.item_count())
            .filter_map(|idx| snapshot.get_item(idx))
            .filter(|item| !item.data.is_directory)
            .filter_map(|item| {
                let modified = item.data.modified?;
                let result = item.data.to_result(0, None);
                (!seen.contains(&result.id)).then_some((modified, result))
            })
            .collect();
        by_mtime.sort_by(|(a_time, a), (b_time, b)| {
            b_time
                .cmp(a_time)
                .then_with(|| a.relative_path.cmp(&b.relative_path))
        });

        out.extend(
            by_mtime
                .into_iter()
                .map(|(_, result)| result)
                .take(capacity - out.len()),
        );
        out
    }
}

pub trait Reporter {
    fn report_match(&self, result: &SearchResult);
    fn warn_matches_truncated(&self, total_match_count: usize, shown_match_count: usize);
    fn warn_index_incomplete(&self, search_directory: &Path);
}

/// Index `cwd`, run one query against it, and report the results. An empty
/// or missing pattern lists recent entries instead.
pub async fn run_main<T: Reporter>(
    Cli {
        pattern,
        limit,
        cwd,
        compute_indices,
        json: _,
        references: _,
        exclude,
        threads,
        recent,
        no_gitignore,
        ready_timeout_ms,
    }: Cli,
    reporter: T,
) -> anyhow::Result<()> {
    let search_directory = match cwd {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    let index = FileIndex::open(
        &search_directory,
        FileIndexOptions {
            exclude,
            respect_gitignore: !no_gitignore,
            threads,
            limit,
            recent_capacity: recent,
            compute_indices,
        },
    )?;
    if !index.wait_until_ready(Duration::from_millis(ready_timeout_ms)) {
        reporter.warn_index_incomplete(index.root());
    }

    let pattern_text = pattern.unwrap_or_default();
    let (matches, total_match_count) = if pattern_text.is_empty() {
        let recent = ReferenceIndex::list_recent(&index).await?;
        let total = recent.len();
        (recent, total)
    } else {
        let inner = Arc::clone(&index.inner);
        let FileSearchResults {
            matches,
            total_match_count,
        } = tokio::task::spawn_blocking(move || inner.search(&pattern_text)).await?;
        (matches, total_match_count)
    };
    let match_count = matches.len();

    for result in &matches {
        reporter.report_match(result);
    }
    if total_match_count > match_count {
        reporter.warn_matches_truncated(total_match_count, match_count);
    }

    Ok(())
}

/// Best score first; equal scores in path order.
fn by_score_then_path(a: &SearchResult, b: &SearchResult) -> std::cmp::Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| a.relative_path.cmp(&b.relative_path))
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn build_override_matcher(
    search_directory: &Path,
    exclude: &[String],
) -> anyhow::Result<Option<ignore::overrides::Override>> {
    if exclude.is_empty() {
        return Ok(None);
    }
    let mut override_builder = OverrideBuilder::new(search_directory);
    for exclude in exclude {
        let exclude_pattern = format!("!{exclude}");
        override_builder.add(&exclude_pattern)?;
    }
    let matcher = override_builder.build()?;
    Ok(Some(matcher))
}

fn walker_worker(
    inner: Arc<IndexInner>,
    override_matcher: Option<ignore::overrides::Override>,
    injector: Injector<IndexedEntry>,
) {
    let mut walk_builder = WalkBuilder::new(&inner.root);
    walk_builder
        .threads(inner.options.threads.get())
        // Allow hidden entries.
        .hidden(false)
        // Follow symlinks to search their contents.
        .follow_links(true)
        // Don't require git to be present to apply git-related ignore rules.
        .require_git(false);
    if !inner.options.respect_gitignore {
        walk_builder
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .ignore(false)
            .parents(false);
    }
    if let Some(override_matcher) = override_matcher {
        walk_builder.overrides(override_matcher);
    }

    let walker = walk_builder.build_parallel();
    walker.run(|| {
        const CHECK_INTERVAL: usize = 1024;
        let mut n = 0;
        let inner = inner.clone();
        let injector = injector.clone();

        Box::new(move |entry| {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::trace!("skipping unreadable entry: {err}");
                    return ignore::WalkState::Continue;
                }
            };
            if entry.depth() == 0 {
                return ignore::WalkState::Continue;
            }
            let path = entry.path();
            let Some(relative_path) = path
                .strip_prefix(&inner.root)
                .ok()
                .and_then(Path::to_str)
            else {
                return ignore::WalkState::Continue;
            };
            let indexed = IndexedEntry {
                absolute_path: path.to_path_buf(),
                relative_path: relative_path.to_string(),
                is_directory: entry.file_type().is_some_and(|ft| ft.is_dir()),
                modified: entry.metadata().ok().and_then(|meta| meta.modified().ok()),
            };
            injector.push(indexed, |indexed, cols| {
                cols[0] = Utf32String::from(indexed.relative_path.as_str());
            });
            inner.entry_count.fetch_add(1, Ordering::Relaxed);

            n += 1;
            if n >= CHECK_INTERVAL {
                if inner.shutdown.load(Ordering::Relaxed) {
                    return ignore::WalkState::Quit;
                }
                n = 0;
            }
            ignore::WalkState::Continue
        })
    });

    tracing::info!(
        root = %inner.root.display(),
        entries = inner.entry_count.load(Ordering::Relaxed),
        "file index walk complete"
    );
    inner.walk_complete.store(true, Ordering::Release);
    let (mutex, cv) = &inner.walk_complete_cv;
    *lock(mutex) = true;
    cv.notify_all();
}
