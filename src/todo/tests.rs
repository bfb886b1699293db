//! Tests for TODO extraction, dedup and the persistent store

use super::*;
use crate::types::{ChunkKind, ChunkMetadata};
use chrono::{Days, NaiveDate};
use std::fs;
use tempfile::TempDir;

fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap()
}

fn item(content: &str, created_at: NaiveDateTime) -> TodoItem {
    TodoItem::new(content, Priority::Medium, "notes.md", "Plans", created_at)
}

// ===== Normalization =====

#[test]
fn test_normalize_strips_markers() {
    assert_eq!(normalize_content("TODO: テスト実装"), "テスト実装");
    assert_eq!(normalize_content("- [ ] テスト実装"), "テスト実装");
    assert_eq!(normalize_content("* [x] TODO: 完了"), "完了");
    assert_eq!(normalize_content("FIXME: バグ修正！"), "バグ修正");
    assert_eq!(normalize_content("1. 手順を書く"), "手順を書く");
    assert_eq!(normalize_content("・買い物"), "買い物");
}

#[test]
fn test_normalize_whitespace_and_case() {
    assert_eq!(normalize_content("  Multiple   spaces  "), "multiple spaces");
    assert_eq!(normalize_content("全角\u{3000}スペース"), "全角 スペース");
    assert_eq!(normalize_content("Write Docs."), "write docs");
}

#[test]
fn test_normalize_keeps_numbers_and_dashes_in_text() {
    assert_eq!(normalize_content("1.5倍にする"), "1.5倍にする");
    assert_eq!(normalize_content("-5度で保存"), "-5度で保存");
}

#[test]
fn test_strip_list_marker() {
    assert_eq!(strip_list_marker("- [ ] 資料作成"), "資料作成");
    assert_eq!(strip_list_marker("* 買い物"), "買い物");
    assert_eq!(strip_list_marker("2) 二番目"), "二番目");
    assert_eq!(strip_list_marker("ただの文"), "ただの文");
}

// ===== Identity =====

#[test]
fn test_todo_id_is_stable_and_short() {
    let a = todo_id("notes.md", "Plans", "write docs");
    let b = todo_id("notes.md", "Plans", "write docs");
    assert_eq!(a, b);
    assert_eq!(a.len(), 8);
    assert!(a.chars().all(|c| c.is_ascii_hexdigit()));

    assert_ne!(a, todo_id("notes.md", "Other", "write docs"));
    assert_ne!(a, todo_id("notes.md", "Plans", "write docs!"));
}

#[test]
fn test_status_and_priority_parse() {
    assert_eq!("in_progress".parse::<TodoStatus>().unwrap(), TodoStatus::InProgress);
    assert_eq!("Done".parse::<TodoStatus>().unwrap(), TodoStatus::Completed);
    assert!("later".parse::<TodoStatus>().is_err());
    assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
    assert!("critical".parse::<Priority>().is_err());
    assert_eq!(TodoStatus::InProgress.to_string(), "in_progress");
}

// ===== Free-text extraction =====

#[test]
fn test_short_content_is_discarded() {
    let now = at(2024, 6, 10);
    assert!(extract_from_text_at("TODO: ab", "a.md", "S", now).is_empty());

    let items = extract_from_text_at("TODO: abcd", "a.md", "S", now);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].content, "abcd");
    assert_eq!(items[0].status, TodoStatus::Pending);
    assert_eq!(items[0].created_at, now);
    assert_eq!(items[0].updated_at, now);
}

#[test]
fn test_checked_checkbox_is_completed() {
    let items = extract_from_text_at("- [x] レポート提出", "a.md", "S", at(2024, 6, 10));
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].content, "レポート提出");
    assert_eq!(items[0].status, TodoStatus::Completed);
}

#[test]
fn test_overlapping_patterns_yield_one_item() {
    let items = extract_from_text_at("- [ ] TODO: write docs", "a.md", "S", at(2024, 6, 10));
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].content, "write docs");
}

#[test]
fn test_extraction_covers_all_patterns() {
    let text =
        "TODO: 設計書を書く\n- [ ] テストを追加\n1. 手順を整理する\n・買い物に行く\nただの文章です。";
    let items = extract_from_text_at(text, "a.md", "S", at(2024, 6, 10));
    let contents: Vec<&str> = items.iter().map(|t| t.content.as_str()).collect();
    assert_eq!(
        contents,
        vec!["設計書を書く", "テストを追加", "手順を整理する", "買い物に行く"]
    );
}

#[test]
fn test_extraction_infers_priority_and_due_date() {
    let items = extract_from_text_at(
        "TODO: 緊急 明日までにレポート\nNOTE: later tidy up notes",
        "a.md",
        "S",
        at(2024, 6, 10),
    );
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].priority, Priority::High);
    assert_eq!(items[0].due_date, NaiveDate::from_ymd_opt(2024, 6, 11));
    assert_eq!(items[1].priority, Priority::Low);
    assert_eq!(items[1].due_date, None);
}

#[test]
fn test_extraction_of_plain_text_is_empty() {
    assert!(extract_from_text_at("", "a.md", "S", at(2024, 6, 10)).is_empty());
    assert!(extract_from_text_at("No action items here.", "a.md", "S", at(2024, 6, 10)).is_empty());
}

// ===== Chunk extraction =====

fn todo_chunk(content: Option<&str>, priority: Option<Priority>) -> Chunk {
    Chunk {
        id: "notes.md:section_1:chunk_0".to_string(),
        text: "- [ ] レビュー依頼".to_string(),
        metadata: ChunkMetadata {
            doc_id: "notes.md".to_string(),
            section_id: 1,
            chunk_id: 0,
            header: "Plans".to_string(),
            level: 2,
            total_chunks: 1,
            kind: ChunkKind::Todo,
            has_todo: true,
            todo_type: Some("CHECKBOX".to_string()),
            todo_content: content.map(str::to_string),
            todo_priority: priority,
        },
    }
}

#[test]
fn test_extract_from_chunk() {
    let chunk = todo_chunk(Some("レビュー依頼"), Some(Priority::High));
    let item = extract_from_chunk(&chunk, "Plans (Level 2)", at(2024, 6, 10)).unwrap();
    assert_eq!(item.content, "レビュー依頼");
    assert_eq!(item.priority, Priority::High);
    assert_eq!(item.source_file, "notes.md");
    assert_eq!(item.source_section, "Plans (Level 2)");
    assert_eq!(item.related_chunk_ids, vec![chunk.id.clone()]);
}

#[test]
fn test_extract_from_chunk_requires_todo() {
    let mut chunk = todo_chunk(Some("レビュー依頼"), None);
    chunk.metadata.has_todo = false;
    assert!(extract_from_chunk(&chunk, "Plans", at(2024, 6, 10)).is_none());

    let short = todo_chunk(Some("ab"), None);
    assert!(extract_from_chunk(&short, "Plans", at(2024, 6, 10)).is_none());

    let missing = todo_chunk(None, None);
    assert!(extract_from_chunk(&missing, "Plans", at(2024, 6, 10)).is_none());
}

#[test]
fn test_extract_from_chunk_checked_box_is_completed() {
    let mut chunk = todo_chunk(Some("レビュー依頼"), None);
    assert_eq!(
        extract_from_chunk(&chunk, "Plans", at(2024, 6, 10)).unwrap().status,
        TodoStatus::Pending
    );

    chunk.text = "- [x] レビュー依頼".to_string();
    let item = extract_from_chunk(&chunk, "Plans", at(2024, 6, 10)).unwrap();
    assert_eq!(item.status, TodoStatus::Completed);
}

#[test]
fn test_checked_box_below_section_heading_is_completed() {
    use crate::chunker::TextChunker;
    use crate::types::Section;

    let now = at(2024, 6, 10);
    let chunker = TextChunker::default().with_todo_boundaries(false);
    let section = Section::new("TODO list", "- [x] 完了したタスク\n- [ ] 未完了のタスク", 2);
    let chunks = chunker.chunk_section("a.md", 0, &section);
    assert_eq!(chunks.len(), 1);

    let from_chunk = extract_from_chunk(&chunks[0], "TODO list (Level 2)", now).unwrap();
    assert_eq!(from_chunk.content, "完了したタスク");
    assert_eq!(from_chunk.status, TodoStatus::Completed);

    let from_text = extract_from_text_at(&section.content, "a.md", "TODO list (Level 2)", now);
    let merged = deduplicate(vec![from_chunk], from_text);
    assert_eq!(merged.len(), 2);
    let done = merged.iter().find(|t| t.content == "完了したタスク").unwrap();
    assert_eq!(done.status, TodoStatus::Completed);
    let open = merged.iter().find(|t| t.content == "未完了のタスク").unwrap();
    assert_eq!(open.status, TodoStatus::Pending);
}

#[test]
fn test_checked_box_wins_over_keyword_match() {
    let items = extract_from_text_at("- [x] TODO: write docs", "a.md", "S", at(2024, 6, 10));
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].status, TodoStatus::Completed);
    assert_eq!(items[0].checkbox, Some(true));
}

#[test]
fn test_extract_from_chunk_infers_missing_priority() {
    let chunk = todo_chunk(Some("urgent: fix login"), None);
    let item = extract_from_chunk(&chunk, "Plans", at(2024, 6, 10)).unwrap();
    assert_eq!(item.priority, Priority::High);
}

// ===== Dedup =====

#[test]
fn test_deduplicate_equivalent_phrasings() {
    let now = at(2024, 6, 10);
    let chunk_todos = vec![item("API実装", now)];
    let text_todos = vec![item("TODO: API実装", now), item("- [ ] API実装", now)];

    let merged = deduplicate(chunk_todos, text_todos);
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].content, "API実装");
}

#[test]
fn test_deduplicate_keeps_earliest_created_at() {
    let today = at(2024, 6, 10);
    let day7 = today.checked_sub_days(Days::new(7)).unwrap();
    let day3 = today.checked_sub_days(Days::new(3)).unwrap();

    let mut primary = item("資料作成", day3);
    primary.priority = Priority::High;
    primary.related_chunk_ids = vec!["notes.md:section_0:chunk_1".to_string()];
    let secondary = item("TODO: 資料作成", day7);

    let merged = deduplicate(vec![primary], vec![secondary]);
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].created_at, day7);
    assert_eq!(merged[0].priority, Priority::High);
    assert_eq!(merged[0].content, "資料作成");
    assert_eq!(merged[0].related_chunk_ids.len(), 1);
}

#[test]
fn test_deduplicate_keeps_distinct_items() {
    let now = at(2024, 6, 10);
    let merged = deduplicate(
        vec![item("write docs", now)],
        vec![item("write tests", now), item("Write Docs.", now)],
    );
    let contents: Vec<&str> = merged.iter().map(|t| t.content.as_str()).collect();
    assert_eq!(contents, vec!["write docs", "write tests"]);
}

#[test]
fn test_deduplicate_fills_missing_due_date() {
    let now = at(2024, 6, 10);
    let primary = item("提出する", now);
    let mut secondary = item("TODO: 提出する", now);
    secondary.due_date = NaiveDate::from_ymd_opt(2024, 7, 1);

    let merged = deduplicate(vec![primary], vec![secondary]);
    assert_eq!(merged[0].due_date, NaiveDate::from_ymd_opt(2024, 7, 1));
}

#[test]
fn test_deduplicate_completed_wins() {
    let now = at(2024, 6, 10);
    let primary = item("旅費精算", now);
    let mut secondary = item("- [x] 旅費精算", now);
    secondary.status = TodoStatus::Completed;
    secondary.checkbox = Some(true);

    let merged = deduplicate(vec![primary], vec![secondary]);
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].status, TodoStatus::Completed);
    assert_eq!(merged[0].checkbox, Some(true));
}

// ===== Store =====

fn store_in(dir: &TempDir) -> TodoStore {
    TodoStore::load(dir.path().join("todos.json"))
}

#[test]
fn test_store_missing_file_is_empty() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    assert!(store.is_empty());
}

#[test]
fn test_store_corrupt_file_is_empty() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("todos.json"), "{not json").unwrap();
    let store = store_in(&dir);
    assert!(store.is_empty());
}

#[test]
fn test_store_save_and_reload() {
    let dir = TempDir::new().unwrap();
    let mut store = store_in(&dir);
    let added = store.add_todo("牛乳を買う", Priority::Low, None, None);
    assert_eq!(added.source_file, MANUAL_SOURCE);
    assert_eq!(added.source_section, MANUAL_SOURCE);
    store.save().unwrap();

    let raw = fs::read_to_string(dir.path().join("todos.json")).unwrap();
    assert!(raw.contains("牛乳を買う"), "non-ASCII must be written unescaped");
    assert!(raw.contains("\"related_chunk_ids\": []"));

    let reloaded = store_in(&dir);
    assert_eq!(reloaded.len(), 1);
    assert_eq!(reloaded.get(&added.id), Some(&added));
}

#[test]
fn test_store_reads_items_without_optional_fields() {
    let dir = TempDir::new().unwrap();
    let json = r#"[{
        "id": "abcd1234",
        "content": "write docs",
        "status": "in_progress",
        "priority": "high",
        "created_at": "2024-06-01T09:00:00",
        "updated_at": "2024-06-02T09:00:00",
        "source_file": "notes.md",
        "source_section": "Plans"
    }]"#;
    fs::write(dir.path().join("todos.json"), json).unwrap();

    let store = store_in(&dir);
    let todo = store.get("abcd1234").unwrap();
    assert_eq!(todo.status, TodoStatus::InProgress);
    assert!(todo.tags.is_empty());
    assert!(todo.related_chunk_ids.is_empty());
    assert_eq!(todo.due_date, None);
}

#[test]
fn test_store_update_todo() {
    let dir = TempDir::new().unwrap();
    let mut store = store_in(&dir);
    let mut old = item("write docs", at(2024, 6, 1));
    old.id = "feedbeef".to_string();
    store.push_raw(old);

    let updated = store
        .update_todo(
            "feedbeef",
            TodoUpdate {
                status: Some(TodoStatus::Completed),
                tags: Some(vec!["docs".to_string()]),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(updated.status, TodoStatus::Completed);
    assert_eq!(updated.tags, vec!["docs"]);
    assert_eq!(updated.content, "write docs");
    assert!(updated.updated_at > at(2024, 6, 1));
    assert_eq!(updated.created_at, at(2024, 6, 1));

    let missing = store.update_todo("00000000", TodoUpdate::default());
    assert!(matches!(missing, Err(TodoError::NotFound(_))));
}

#[test]
fn test_store_delete_todo() {
    let dir = TempDir::new().unwrap();
    let mut store = store_in(&dir);
    let added = store.add_todo("write docs", Priority::Medium, None, None);

    assert!(store.delete_todo(&added.id));
    assert!(!store.delete_todo(&added.id));
    assert!(store.is_empty());
}

#[test]
fn test_store_filters_by_status() {
    let dir = TempDir::new().unwrap();
    let mut store = store_in(&dir);
    let mut done = item("finished task", at(2024, 6, 1));
    done.status = TodoStatus::Completed;
    store.push_raw(done);
    store.push_raw(item("open task", at(2024, 6, 1)));

    assert_eq!(store.todos(None).len(), 2);
    assert_eq!(store.todos(Some(TodoStatus::Completed)).len(), 1);
    assert_eq!(store.todos(Some(TodoStatus::Pending))[0].content, "open task");
    assert!(store.todos(Some(TodoStatus::InProgress)).is_empty());
}

#[test]
fn test_store_aggregate_by_date() {
    let dir = TempDir::new().unwrap();
    let mut store = store_in(&dir);
    store.push_raw(item("task one", at(2024, 6, 2)));
    store.push_raw(item("task two", at(2024, 6, 1)));
    store.push_raw(item("task three", at(2024, 6, 2)));

    let grouped = store.aggregate_by_date();
    let dates: Vec<NaiveDate> = grouped.keys().copied().collect();
    assert_eq!(
        dates,
        vec![
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 2).unwrap()
        ]
    );
    assert_eq!(grouped[&NaiveDate::from_ymd_opt(2024, 6, 2).unwrap()].len(), 2);
}

#[test]
fn test_store_overdue_and_stats() {
    let dir = TempDir::new().unwrap();
    let mut store = store_in(&dir);
    let today = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();

    let mut late = item("late task", at(2024, 6, 1));
    late.due_date = NaiveDate::from_ymd_opt(2024, 6, 5);
    let mut late_done = item("late but done", at(2024, 6, 1));
    late_done.due_date = NaiveDate::from_ymd_opt(2024, 6, 5);
    late_done.status = TodoStatus::Completed;
    let mut due_today = item("due today", at(2024, 6, 1));
    due_today.due_date = Some(today);
    store.push_raw(late);
    store.push_raw(late_done);
    store.push_raw(due_today);
    store.push_raw(item("no due date", at(2024, 6, 1)));

    let overdue = store.overdue_todos(today);
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0].content, "late task");

    let stats = store.stats(today);
    assert_eq!(
        stats,
        TodoStats {
            total: 4,
            pending: 3,
            in_progress: 0,
            completed: 1,
            overdue: 1,
        }
    );
}

#[test]
fn test_add_extracted_todos_guards_against_store() {
    let dir = TempDir::new().unwrap();
    let mut store = store_in(&dir);
    store.push_raw(item("API実装", at(2024, 6, 1)));

    let candidates = vec![
        item("- [ ] API実装", at(2024, 6, 5)),
        item("テスト追加", at(2024, 6, 5)),
        item("テスト追加。", at(2024, 6, 5)),
    ];
    assert_eq!(store.add_extracted_todos(candidates), 1);
    assert_eq!(store.len(), 2);

    // Same id again: nothing appended, only updated_at moves
    let again = item("API実装", at(2024, 6, 9));
    assert_eq!(store.add_extracted_todos(vec![again.clone()]), 0);
    let stored = store.get(&again.id).unwrap();
    assert_eq!(stored.created_at, at(2024, 6, 1));
    assert_eq!(stored.updated_at, at(2024, 6, 9));
}

#[test]
fn test_reextraction_preserves_created_at() {
    let dir = TempDir::new().unwrap();
    let mut store = store_in(&dir);
    let text = "TODO: 週次レポートを書く";

    let first_time = at(2024, 6, 1);
    let first = extract_from_text_at(text, "notes.md", "Plans", first_time);
    assert_eq!(store.add_extracted_todos(first.clone()), 1);
    store.save().unwrap();

    let mut store = store_in(&dir);
    let later = at(2024, 6, 8);
    let mut second = extract_from_text_at(text, "notes.md", "Plans", later);
    store.preserve_creation_dates(&mut second);

    assert_eq!(second[0].id, first[0].id);
    assert_eq!(second[0].created_at, first_time);
    assert!(second[0].updated_at >= first[0].updated_at);

    assert_eq!(store.add_extracted_todos(second), 0);
    let stored = store.get(&first[0].id).unwrap();
    assert_eq!(stored.created_at, first_time);
    assert_eq!(stored.updated_at, later);
}

#[test]
fn test_preserve_creation_dates_matches_reworded_items() {
    let dir = TempDir::new().unwrap();
    let mut store = store_in(&dir);
    let mut old = item("TODO: 資料作成", at(2024, 6, 1));
    old.status = TodoStatus::InProgress;
    store.push_raw(old);

    let mut fresh = vec![item("- [ ] 資料作成", at(2024, 6, 8))];
    store.preserve_creation_dates(&mut fresh);
    assert_eq!(fresh[0].created_at, at(2024, 6, 1));
    assert_eq!(fresh[0].status, TodoStatus::InProgress);
}

#[test]
fn test_unchecking_a_box_reopens_the_item() {
    let dir = TempDir::new().unwrap();
    let mut store = store_in(&dir);

    let items = extract_from_text_at("- [x] レポート提出", "a.md", "S", at(2024, 6, 1));
    store.replace_extracted(items);
    assert_eq!(store.todos(Some(TodoStatus::Completed)).len(), 1);
    store.save().unwrap();

    let mut store = store_in(&dir);
    let items = extract_from_text_at("- [ ] レポート提出", "a.md", "S", at(2024, 6, 8));
    store.replace_extracted(items);
    assert_eq!(store.len(), 1);
    assert_eq!(store.items()[0].status, TodoStatus::Pending);
    assert_eq!(store.items()[0].created_at, at(2024, 6, 1));
}

#[test]
fn test_unchecked_box_keeps_in_progress() {
    let dir = TempDir::new().unwrap();
    let mut store = store_in(&dir);
    store.replace_extracted(extract_from_text_at("- [ ] 資料作成", "a.md", "S", at(2024, 6, 1)));
    let id = store.items()[0].id.clone();
    store
        .update_todo(
            &id,
            TodoUpdate {
                status: Some(TodoStatus::InProgress),
                ..Default::default()
            },
        )
        .unwrap();

    store.replace_extracted(extract_from_text_at("- [ ] 資料作成", "a.md", "S", at(2024, 6, 8)));
    assert_eq!(store.get(&id).unwrap().status, TodoStatus::InProgress);
}

#[test]
fn test_replace_extracted_keeps_manual_items() {
    let dir = TempDir::new().unwrap();
    let mut store = store_in(&dir);
    let manual = store.add_todo("電話をかける", Priority::High, None, None);
    store.push_raw(item("stale extracted item", at(2024, 6, 1)));
    store.push_raw(item("still present", at(2024, 6, 1)));

    store.replace_extracted(vec![item("still present", at(2024, 6, 8))]);

    let contents: Vec<&str> = store.items().iter().map(|t| t.content.as_str()).collect();
    assert_eq!(contents, vec!["電話をかける", "still present"]);
    assert!(store.get(&manual.id).is_some());
    let kept = store.items().iter().find(|t| t.content == "still present").unwrap();
    assert_eq!(kept.created_at, at(2024, 6, 1));
}

#[test]
fn test_store_extract_from_text_preserves_dates() {
    let dir = TempDir::new().unwrap();
    let mut store = store_in(&dir);
    let mut old =
        TodoItem::new("write docs", Priority::Medium, "notes.md", "Plans", at(2024, 1, 1));
    old.tags = vec!["docs".to_string()];
    store.push_raw(old);

    let items = store.extract_from_text("TODO: write docs", "notes.md", "Plans");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].created_at, at(2024, 1, 1));
    assert_eq!(items[0].tags, vec!["docs"]);
}
