/// TODO mining across a note tree and the persisted list it produces
use anyhow::Result;
use note_rag::config::Config;
use note_rag::coordinator::NoteRag;
use note_rag::todo::{MANUAL_SOURCE, Priority, TodoStatus, TodoStore};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(root: &Path, name: &str, content: &str) -> Result<()> {
    let path = root.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

fn setup() -> Result<(TempDir, Config)> {
    let dir = TempDir::new()?;
    let data = dir.path().join("notes");
    fs::create_dir_all(&data)?;
    let config = Config::with_dirs(&data, dir.path().join("storage"));
    Ok((dir, config))
}

#[test]
fn test_header_todo_section_yields_one_item_per_bullet() -> Result<()> {
    let (_dir, config) = setup()?;
    write(
        &config.paths.data_dir,
        "weekly.md",
        "# 振り返り\n\n今週は順調だった。\n\n## TODO: 来週やること\n\n- 資料作成を進める\n- 会議室を予約する\n- 緊急: 請求書を送る\n",
    )?;

    let mut rag = NoteRag::open(config)?;
    let count = rag.extract_todos_from_documents()?;
    assert_eq!(count, 3);

    let items = rag.todo_store().items();
    for item in items {
        assert_eq!(item.source_file, "weekly.md");
        assert_eq!(item.source_section, "TODO: 来週やること (Level 2)");
        assert_eq!(item.status, TodoStatus::Pending);
        assert_eq!(item.related_chunk_ids.len(), 1);
    }
    let urgent = items
        .iter()
        .find(|t| t.content.contains("請求書"))
        .expect("urgent item extracted");
    assert_eq!(urgent.priority, Priority::High);
    Ok(())
}

#[test]
fn test_checkbox_states_and_due_dates() -> Result<()> {
    let (_dir, config) = setup()?;
    write(
        &config.paths.data_dir,
        "tasks.md",
        "# Tasks\n\n- [ ] 2030-12-31までに予算を提出\n- [x] 旅費精算を済ませる\n",
    )?;

    let mut rag = NoteRag::open(config)?;
    assert_eq!(rag.extract_todos_from_documents()?, 2);

    let store = rag.todo_store();
    let budget = store
        .items()
        .iter()
        .find(|t| t.content.contains("予算"))
        .expect("budget item extracted");
    assert_eq!(
        budget.due_date,
        chrono::NaiveDate::from_ymd_opt(2030, 12, 31)
    );

    let completed = store.todos(Some(TodoStatus::Completed));
    assert_eq!(completed.len(), 1);
    assert!(completed[0].content.contains("旅費精算"));
    Ok(())
}

#[test]
fn test_same_task_in_two_notations_is_one_item() -> Result<()> {
    let (_dir, config) = setup()?;
    write(
        &config.paths.data_dir,
        "dev.md",
        "# Dev\n\n- [ ] TODO: API実装\n\nTODO: API実装。\n",
    )?;

    let mut rag = NoteRag::open(config)?;
    assert_eq!(rag.extract_todos_from_documents()?, 1);
    Ok(())
}

#[test]
fn test_short_markers_are_noise() -> Result<()> {
    let (_dir, config) = setup()?;
    write(&config.paths.data_dir, "scratch.md", "# Scratch\n\nTODO: ab\n\nTODO: abcd\n")?;

    let mut rag = NoteRag::open(config)?;
    assert_eq!(rag.extract_todos_from_documents()?, 1);
    assert_eq!(rag.todo_store().items()[0].content, "abcd");
    Ok(())
}

#[test]
fn test_reextraction_preserves_history_and_manual_items() -> Result<()> {
    let (_dir, config) = setup()?;
    write(&config.paths.data_dir, "tasks.md", "# Tasks\n\nTODO: renew the passport\n")?;

    let mut rag = NoteRag::open(config.clone())?;
    rag.extract_todos_from_documents()?;
    let manual = rag
        .todo_store_mut()
        .add_todo("call the dentist", Priority::Medium, None, None);
    rag.todo_store().save()?;
    let original = rag.todo_store().items()[0].clone();
    drop(rag);

    // Reformatting the note must not make the task look newer
    write(&config.paths.data_dir, "tasks.md", "# Tasks\n\n- [ ] TODO: Renew the passport.\n")?;
    let mut rag = NoteRag::open(config.clone())?;
    rag.extract_todos_from_documents()?;

    let store = TodoStore::load(config.todo_path());
    assert_eq!(store.len(), 2);
    assert!(store.get(&manual.id).is_some());
    let extracted = store
        .items()
        .iter()
        .find(|t| t.source_file != MANUAL_SOURCE)
        .expect("extracted item kept");
    assert_eq!(extracted.created_at, original.created_at);
    assert!(extracted.updated_at >= original.updated_at);
    Ok(())
}

#[test]
fn test_todos_json_shape() -> Result<()> {
    let (_dir, config) = setup()?;
    write(&config.paths.data_dir, "tasks.md", "# 予定\n\nTODO: 明日までに報告書\n")?;

    let mut rag = NoteRag::open(config.clone())?;
    rag.extract_todos_from_documents()?;

    let raw = fs::read_to_string(config.todo_path())?;
    assert!(raw.contains("報告書"));
    let json: serde_json::Value = serde_json::from_str(&raw)?;
    let item = &json[0];
    for key in [
        "id",
        "content",
        "status",
        "priority",
        "created_at",
        "updated_at",
        "source_file",
        "source_section",
        "due_date",
        "tags",
        "related_chunk_ids",
    ] {
        assert!(item.get(key).is_some(), "missing {key}");
    }
    assert_eq!(item["status"], "pending");
    assert_eq!(item["source_section"], "予定 (Level 1)");
    Ok(())
}
