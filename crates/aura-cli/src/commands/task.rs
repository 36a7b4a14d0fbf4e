//! Task management commands for CLI.

use aura_core::{Task, TaskId, TaskStatus};
use clap::Subcommand;
use serde_json::json;

use super::{open_app, CmdResult, Output};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Add a task for today
    Add {
        /// Task title
        title: String,
    },
    /// List today's tasks, pending first
    List,
    /// Flip a task between pending and done
    Toggle {
        /// Task ID
        id: TaskId,
    },
    /// Delete a task (its sessions stay in history)
    Delete {
        /// Task ID
        id: TaskId,
    },
}

pub fn run(action: TaskAction, out: Output) -> CmdResult {
    let app = open_app()?;

    match action {
        TaskAction::Add { title } => {
            let task = app.create_task(&title)?;
            out.emit(&task, &format!("Task created: {} {}", task.id, task.title))?;
        }
        TaskAction::List => {
            let listing = app.list_today();
            let tasks = listing.items();
            let text = if tasks.is_empty() {
                "No tasks for today.".to_string()
            } else {
                tasks.iter().map(render).collect::<Vec<_>>().join("\n")
            };
            out.emit(tasks, &text)?;
        }
        TaskAction::Toggle { id } => {
            let status = app.toggle_task(id)?;
            let text = match status {
                Some(status) => format!("Task {id} is now {}", status_label(status)),
                None => format!("No task with id {id}"),
            };
            out.emit(&json!({ "id": id, "status": status }), &text)?;
        }
        TaskAction::Delete { id } => {
            app.delete_task(id)?;
            out.emit(&json!({ "id": id, "deleted": true }), &format!("Task deleted: {id}"))?;
        }
    }
    Ok(())
}

fn render(task: &Task) -> String {
    let mark = if task.is_done() { "x" } else { " " };
    format!("[{mark}] {:>4}  {}", task.id, task.title)
}

fn status_label(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Pending => "pending",
        TaskStatus::Done => "done",
    }
}
