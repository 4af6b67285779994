#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::KeyCode;
use crossterm::event::KeyEvent;
use crossterm::event::KeyModifiers;
use ctxref_composer::ComposerConfig;
use ctxref_composer::InputResult;
use ctxref_composer::PopupStatus;
use ctxref_composer::ReferenceComposer;
use ctxref_composer::ReferenceIndex;
use ctxref_composer::ReferencePopup;
use ctxref_composer::SearchCompletion;
use ctxref_file_index::FileIndex;
use ctxref_file_index::FileIndexOptions;
use ctxref_uri::ContextReference;
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::mpsc::unbounded_channel;

fn workspace() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("src/utils")).unwrap();
    fs::create_dir_all(root.join("docs")).unwrap();
    fs::write(root.join("src/read.ts"), "export {}").unwrap();
    fs::write(root.join("src/utils/write.ts"), "export {}").unwrap();
    fs::write(root.join("docs/guide.md"), "# guide").unwrap();
    fs::write(root.join("docs/diagram.png"), [0u8; 4]).unwrap();
    dir
}

struct Session {
    composer: ReferenceComposer,
    completions: UnboundedReceiver<SearchCompletion>,
}

impl Session {
    fn open(root: &Path) -> Self {
        let index = FileIndex::open(root, FileIndexOptions::default()).unwrap();
        assert!(index.wait_until_ready(Duration::from_secs(10)));
        let (tx, completions) = unbounded_channel();
        let composer = ReferenceComposer::new(
            ComposerConfig::default(),
            Arc::new(index) as Arc<dyn ReferenceIndex>,
            tx,
        );
        Self {
            composer,
            completions,
        }
    }

    fn type_str(&mut self, text: &str) {
        for ch in text.chars() {
            self.press(KeyCode::Char(ch));
        }
    }

    fn press(&mut self, code: KeyCode) -> InputResult {
        self.composer
            .handle_key_event(KeyEvent::new(code, KeyModifiers::NONE))
    }

    async fn settle(&mut self) {
        while self
            .composer
            .popup()
            .is_some_and(ReferencePopup::is_searching)
        {
            let completion = tokio::time::timeout(Duration::from_secs(10), self.completions.recv())
                .await
                .expect("search did not complete")
                .unwrap();
            self.composer.on_search_completion(completion);
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn typed_query_inserts_reference_to_indexed_file() {
    let dir = workspace();
    let mut session = Session::open(dir.path());

    session.type_str("check @read");
    session.settle().await;
    let popup = session.composer.popup().unwrap();
    assert_eq!(popup.status(), PopupStatus::Results);
    assert_eq!(popup.results()[0].relative_path, "src/read.ts");

    session.press(KeyCode::Enter);
    assert_eq!(
        session.composer.draft().text(),
        "check [@read.ts](claude-context://file/src/read.ts)"
    );
    assert!(!session.composer.is_popup_visible());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn folders_and_images_get_their_own_kinds() {
    let dir = workspace();
    let mut session = Session::open(dir.path());

    session.type_str("@utils");
    session.settle().await;
    let popup = session.composer.popup().unwrap();
    assert_eq!(popup.results()[0].relative_path, "src/utils");
    assert_eq!(popup.rows()[0].label, "utils/");
    session.press(KeyCode::Tab);

    session.type_str(" @diagram");
    session.settle().await;
    session.press(KeyCode::Enter);

    let InputResult::Submitted(submission) = session.press(KeyCode::Enter) else {
        panic!("expected the draft to be submitted");
    };
    assert_eq!(
        submission.references,
        vec![
            ContextReference::folder("src/utils"),
            ContextReference::Image {
                path: "docs/diagram.png".to_string(),
                mime: Some("image/png".to_string()),
            },
        ]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn bare_trigger_lists_recently_used_first() {
    let dir = workspace();
    let mut session = Session::open(dir.path());

    session.type_str("@guide");
    session.settle().await;
    session.press(KeyCode::Enter);

    session.type_str(" @");
    session.settle().await;
    let popup = session.composer.popup().unwrap();
    assert_eq!(popup.query(), Some(""));
    assert_eq!(popup.results()[0].relative_path, "docs/guide.md");
    assert!(
        popup
            .results()
            .iter()
            .all(|result| result.indices.is_none())
    );
}
