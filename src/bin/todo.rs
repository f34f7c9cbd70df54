//! Minimal command-line shell over the todo storage.
//!
//! ```text
//! todo list [todo|inProgress|completed]
//! todo add <text...>
//! todo show <id>
//! todo advance <id>
//! todo set <id> <status>
//! todo delete <id>
//! ```
//!
//! The backend comes from `TODO_STORAGE` (default: embedded). If it cannot be
//! initialized, the other backend is tried once before giving up.

use anyhow::{bail, Context, Result};
use todo_store::storage::{TodoBackend, TodoStorageFactory, TodoStorageHandle};
use todo_store::{StorageConfig, Todo, TodoId, TodoStatus, TodoStorage};

async fn open_storage(factory: &TodoStorageFactory, config: &StorageConfig) -> Result<TodoStorageHandle> {
    let preferred = config.default_storage;
    match factory.initialize(preferred).await {
        Ok(storage) => Ok(storage),
        Err(e) => {
            let fallback = preferred.alternate();
            log::warn!("{preferred} storage unavailable ({e}), falling back to {fallback}");
            factory
                .initialize(fallback)
                .await
                .with_context(|| format!("neither {preferred} nor {fallback} storage could be initialized"))
        }
    }
}

fn print_todo(todo: &Todo) {
    match &todo.completed_time {
        Some(done) => println!(
            "{:>14}  {:<10}  {}  (created {}, completed {})",
            todo.id, todo.status, todo.text, todo.create_time, done
        ),
        None => println!(
            "{:>14}  {:<10}  {}  (created {})",
            todo.id, todo.status, todo.text, todo.create_time
        ),
    }
}

fn parse_id(arg: Option<&String>) -> Result<TodoId> {
    let raw = arg.context("missing todo id")?;
    raw.parse().with_context(|| format!("invalid todo id {raw:?}"))
}

fn parse_status(arg: Option<&String>) -> Result<TodoStatus> {
    let raw = arg.context("missing status")?;
    Ok(raw.parse()?)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = StorageConfig::from_env()?;
    let factory = TodoStorageFactory::new(config.clone());
    let storage = open_storage(&factory, &config).await?;
    let location = match &*storage {
        TodoBackend::Embedded(db) => db.path().display().to_string(),
        TodoBackend::Api(api) => api.base_url().to_string(),
    };
    log::info!("using {} storage at {location}", storage.storage_type());

    match args.first().map(String::as_str) {
        None | Some("list") => {
            let filter = args.get(1).map(|s| s.parse::<TodoStatus>()).transpose()?;
            for todo in storage.get_all_todos().await? {
                if filter.map_or(true, |f| f == todo.status) {
                    print_todo(&todo);
                }
            }
        }
        Some("add") => {
            let text = args[1..].join(" ");
            print_todo(&storage.add_todo(&text).await?);
        }
        Some("show") => {
            print_todo(&storage.get_todo_by_id(parse_id(args.get(1))?).await?);
        }
        Some("advance") => {
            let id = parse_id(args.get(1))?;
            let current = storage.get_todo_by_id(id).await?;
            print_todo(&storage.update_todo_status(id, current.status.next()).await?);
        }
        Some("set") => {
            let id = parse_id(args.get(1))?;
            let status = parse_status(args.get(2))?;
            print_todo(&storage.update_todo_status(id, status).await?);
        }
        Some("delete") => {
            let id = parse_id(args.get(1))?;
            storage.delete_todo(id).await?;
            println!("deleted {id}");
        }
        Some(other) => bail!("unknown command {other:?} (expected list, add, show, advance, set or delete)"),
    }

    Ok(())
}
