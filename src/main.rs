use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use note_rag::config::Config;
use note_rag::coordinator::{IndexReport, NoteRag};
use note_rag::todo::{self, Priority, TodoItem, TodoStatus, TodoUpdate};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Index Markdown notes incrementally and keep a TODO list mined from them
#[derive(Parser)]
#[command(
    name = "note-rag",
    version,
    long_version = concat!(
        env!("CARGO_PKG_VERSION"),
        " (",
        env!("GIT_COMMIT_HASH"),
        ", built ",
        env!("BUILD_TIMESTAMP"),
        ")"
    )
)]
struct Cli {
    /// Path to a TOML config file; defaults to the platform config directory
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild the index from every note
    Index,

    /// Reindex notes that changed since the last run
    ///
    /// Builds from scratch when the index is empty.
    Update,

    /// Search indexed chunks
    Query {
        text: String,

        /// Number of results
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Manage the TODO list
    Todos {
        #[command(subcommand)]
        action: TodoAction,
    },

    /// Show index and TODO statistics
    Info,
}

#[derive(Subcommand)]
enum TodoAction {
    /// Re-extract TODOs from all notes
    Extract,

    /// List TODOs
    List {
        /// Only items with this status (pending, in_progress, completed)
        #[arg(long)]
        status: Option<String>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Add a TODO by hand
    Add {
        content: String,

        #[arg(long, default_value = "medium")]
        priority: String,
    },

    /// Mark a TODO completed
    Done { id: String },

    /// Delete a TODO
    Delete { id: String },

    /// Unfinished TODOs past their due date
    Overdue,

    /// TODOs grouped by creation date
    ByDate,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let mut rag = NoteRag::open(config)?;

    match cli.command {
        Commands::Index => print_report(&rag.build_full_index()?),
        Commands::Update => print_report(&rag.sync_on_startup()?),
        Commands::Query { text, top_k } => {
            let results = rag.query(&text, top_k)?;
            if results.is_empty() {
                println!("No results");
            }
            for (rank, hit) in results.iter().enumerate() {
                println!("{}. [{:.3}] {} ({})", rank + 1, hit.score, hit.id, hit.metadata.header);
                for line in hit.text.lines().take(6) {
                    println!("    {}", line);
                }
            }
        }
        Commands::Todos { action } => run_todo_action(&mut rag, action)?,
        Commands::Info => {
            let info = rag.system_info()?;
            println!("Data directory:     {}", info.data_dir.display());
            println!("State directory:    {}", info.persist_dir.display());
            println!("Notes on disk:      {}", info.total_documents);
            println!("Tracked notes:      {}", info.tracked_documents);
            println!("Tracked chunks:     {}", info.tracked_chunks);
            println!("Indexed chunks:     {}", info.indexed_chunks);
            let stats = info.todo_stats;
            println!(
                "TODOs:              {} ({} pending, {} in progress, {} completed, {} overdue)",
                stats.total, stats.pending, stats.in_progress, stats.completed, stats.overdue
            );
        }
    }

    Ok(())
}

fn run_todo_action(rag: &mut NoteRag, action: TodoAction) -> Result<()> {
    match action {
        TodoAction::Extract => {
            let count = rag.extract_todos_from_documents()?;
            println!("Extracted {} TODOs", count);
        }
        TodoAction::List { status, json } => {
            let status = status.map(|s| s.parse::<TodoStatus>()).transpose()?;
            let items = rag.todo_store().todos(status);
            if json {
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else {
                for item in items {
                    print_todo(item);
                }
            }
        }
        TodoAction::Add { content, priority } => {
            let priority: Priority = priority.parse()?;
            let store = rag.todo_store_mut();
            let item = store.add_todo(&content, priority, None, None);
            store.save()?;
            println!("Added {}", item.id);
        }
        TodoAction::Done { id } => {
            let store = rag.todo_store_mut();
            store.update_todo(
                &id,
                TodoUpdate {
                    status: Some(TodoStatus::Completed),
                    ..Default::default()
                },
            )?;
            store.save()?;
            println!("Completed {}", id);
        }
        TodoAction::Delete { id } => {
            let store = rag.todo_store_mut();
            if !store.delete_todo(&id) {
                bail!("No TODO with id {}", id);
            }
            store.save()?;
            println!("Deleted {}", id);
        }
        TodoAction::Overdue => {
            for item in rag.todo_store().overdue_todos(todo::now().date()) {
                print_todo(item);
            }
        }
        TodoAction::ByDate => {
            for (date, items) in rag.todo_store().aggregate_by_date() {
                println!("{}", date);
                for item in items {
                    print!("  ");
                    print_todo(item);
                }
            }
        }
    }
    Ok(())
}

fn print_todo(item: &TodoItem) {
    let due = item
        .due_date
        .map(|d| format!(" due {}", d))
        .unwrap_or_default();
    println!(
        "{} [{}] ({}) {}{}  - {} / {}",
        item.id,
        item.status,
        item.priority,
        item.content,
        due,
        item.source_file,
        item.source_section
    );
}

fn print_report(report: &IndexReport) {
    println!(
        "{:?} pass: {} notes, {} chunks indexed, {} unchanged, {} removed in {}ms",
        report.mode,
        report.files_indexed,
        report.chunks_created,
        report.chunks_skipped,
        report.chunks_removed,
        report.duration_ms
    );
    for error in &report.errors {
        println!("  skipped {}", error);
    }
}
