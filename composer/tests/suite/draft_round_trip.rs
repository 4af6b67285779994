use ctxref_composer::DraftBuffer;
use ctxref_uri::ContextReference;
use pretty_assertions::assert_eq;

#[test]
fn restored_draft_keeps_every_reference_kind() {
    let references = vec![
        ContextReference::File {
            path: "src/a b.rs".to_string(),
            line: Some(12),
            column: Some(3),
        },
        ContextReference::folder("src/utils"),
        ContextReference::Web {
            url: "https://www.example.com/docs?x=1".to_string(),
            title: None,
        },
        ContextReference::Symbol {
            name: "parse".to_string(),
            qualified_name: "crate::codec::parse".to_string(),
            file: Some("src/codec.rs".to_string()),
        },
        ContextReference::Image {
            path: "shots/[1].png".to_string(),
            mime: Some("image/png".to_string()),
        },
        ContextReference::Terminal,
        ContextReference::Problems,
        ContextReference::Git,
        ContextReference::Selection,
        ContextReference::Workspace,
    ];

    let mut draft = DraftBuffer::new();
    for reference in &references {
        draft.insert_reference(draft.cursor(), reference.clone());
        draft.insert_str(" ");
    }

    let mut restored = DraftBuffer::from_text(draft.text());
    assert_eq!(restored.annotations(), draft.annotations());

    let submission = restored.take();
    assert_eq!(submission.references, references);
}
