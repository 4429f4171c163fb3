//! taskdeck CLI - file-backed task and epic tracking.

use clap::Parser;
use std::process;
use tracing_subscriber::EnvFilter;

use taskdeck::cli::{
    Cli, CommentCommands, Commands, EpicCommands, LinkCommands, QueueCommands, TaskCommands,
};
use taskdeck::manager::TaskManager;
use taskdeck::models::{EpicUpdate, TaskFilter, TaskUpdate};
use taskdeck::{export, github};

fn main() {
    // Diagnostics go to stderr so stdout stays parseable.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env("TD_LOG").unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run_command(cli) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn run_command(cli: Cli) -> Result<i32, taskdeck::Error> {
    let mut tm = TaskManager::new(cli.tasks_root, cli.epics_root)?;

    match cli.command {
        Commands::Queue { command } => run_queue(&mut tm, command),
        Commands::Task { command } => run_task(&mut tm, command),
        Commands::Epic { command } => run_epic(&mut tm, command),
        Commands::Verify => run_verify(&mut tm),
        Commands::Repair => {
            let links = tm.repair_links()?;
            let parents = tm.repair_epic_parents()?;
            println!("Repaired {} link record(s)", links);
            println!("Repaired {} epic record(s)", parents);
            Ok(0)
        }
        Commands::Export { output } => {
            let path = export::export_tasks(&mut tm, &output)?;
            println!("{}", path.display());
            Ok(0)
        }
        Commands::Github { repos, token } => {
            let tasks = github::fetch_github_tasks(&repos, token.as_deref())
                .map_err(|e| taskdeck::Error::Storage(e.to_string()))?;
            if tasks.is_empty() {
                println!("No tasks found");
            } else {
                print_task_table(&tasks);
            }
            Ok(0)
        }
    }
}

fn run_queue(tm: &mut TaskManager, command: QueueCommands) -> Result<i32, taskdeck::Error> {
    match command {
        QueueCommands::List => {
            let queues = tm.queue_list();
            if queues.is_empty() {
                println!("No queues found");
            } else {
                println!("{:<20} {:<30} {}", "Name", "Title", "Description");
                println!("{}", "-".repeat(80));
                for queue in queues {
                    println!(
                        "{:<20} {:<30} {}",
                        queue.name, queue.title, queue.description
                    );
                }
            }
        }
        QueueCommands::Add {
            name,
            title,
            description,
        } => {
            tm.queue_add(&name, &title, &description)?;
            println!("Created queue '{}'", name);
        }
        QueueCommands::Delete { name } => {
            tm.queue_delete(&name)?;
            println!("Deleted queue '{}'", name);
        }
    }
    Ok(0)
}

fn run_task(tm: &mut TaskManager, command: TaskCommands) -> Result<i32, taskdeck::Error> {
    match command {
        TaskCommands::List {
            status,
            queue,
            epic,
        } => {
            let filter = TaskFilter {
                status: status.as_deref().map(str::parse).transpose()?,
                queue,
                epic,
            };
            let tasks = tm.task_list(&filter)?;
            if tasks.is_empty() {
                println!("No tasks found");
            } else {
                print_task_table(&tasks);
            }
        }
        TaskCommands::Add {
            title,
            description,
            queue,
        } => {
            let task_id = tm.task_add(&title, &description, &queue)?;
            println!("{}", task_id);
        }
        TaskCommands::Show { id } => {
            let task = tm.task_show(&id)?;
            println!("ID: {}", task.id);
            println!("Title: {}", task.title);
            println!("Description: {}", task.description);
            println!("Status: {}", task.status);
            println!("Created: {}", format_timestamp(task.created_at));
            println!("Updated: {}", format_timestamp(task.updated_at));
            if !task.epics.is_empty() {
                println!("Epics: {}", task.epics.join(", "));
            }
            for (link_type, targets) in &task.links {
                println!("Links ({}): {}", link_type, targets.join(", "));
            }
            if task.comments.is_empty() {
                println!("\nNo comments");
            } else {
                println!("\nComments ({}):", task.comments.len());
                for comment in &task.comments {
                    println!(
                        "  [{}] {}: {}",
                        comment.id,
                        format_timestamp(comment.created_at),
                        comment.text
                    );
                }
            }
        }
        TaskCommands::Update { id, field, value } => {
            tm.task_update(&id, TaskUpdate::parse(&field, &value)?)?;
            println!("Updated task '{}'", id);
        }
        TaskCommands::Start { id } => {
            tm.task_start(&id)?;
            println!("Started task '{}'", id);
        }
        TaskCommands::Done { id } => {
            tm.task_done(&id)?;
            println!("Completed task '{}'", id);
        }
        TaskCommands::Delete { id } => {
            tm.task_delete(&id)?;
            println!("Deleted task '{}'", id);
        }
        TaskCommands::Comment { command } => return run_comment(tm, command),
        TaskCommands::Link { command } => return run_link(tm, command),
        TaskCommands::Epics { id } => {
            let epics = tm.task_parent_epics(&id);
            if epics.is_empty() {
                println!("No epics found");
            } else {
                for epic in epics {
                    println!("{:<12} {:<30} {}", epic.id, epic.title, epic.status);
                }
            }
        }
    }
    Ok(0)
}

fn run_comment(tm: &mut TaskManager, command: CommentCommands) -> Result<i32, taskdeck::Error> {
    match command {
        CommentCommands::Add { id, comment } => {
            let comment_id = tm.comment_add(&id, &comment)?;
            println!("Added comment {} to task '{}'", comment_id, id);
        }
        CommentCommands::Edit {
            id,
            comment_id,
            comment,
        } => {
            tm.comment_edit(&id, comment_id, &comment)?;
            println!("Edited comment {} on task '{}'", comment_id, id);
        }
        CommentCommands::Remove { id, comment_id } => {
            tm.comment_remove(&id, comment_id)?;
            println!("Removed comment {} from task '{}'", comment_id, id);
        }
        CommentCommands::List { id } => {
            let comments = tm.comment_list(&id)?;
            if comments.is_empty() {
                println!("No comments found");
            } else {
                println!("Comments for task {}:", id);
                for comment in comments {
                    println!(
                        "  [{}] {}: {}",
                        comment.id,
                        format_timestamp(comment.created_at),
                        comment.text
                    );
                }
            }
        }
    }
    Ok(0)
}

fn run_link(tm: &mut TaskManager, command: LinkCommands) -> Result<i32, taskdeck::Error> {
    match command {
        LinkCommands::Add {
            id,
            target,
            link_type,
        } => {
            tm.link_add(&id, &target, &link_type)?;
            println!("Linked '{}' and '{}' ({})", id, target, link_type);
        }
        LinkCommands::Remove {
            id,
            target,
            link_type,
        } => {
            tm.link_remove(&id, &target, &link_type)?;
            println!("Unlinked '{}' and '{}' ({})", id, target, link_type);
        }
        LinkCommands::List { id } => {
            let links = tm.link_list(&id)?;
            if links.is_empty() {
                println!("No links found");
            } else {
                for (link_type, targets) in links {
                    println!("{}: {}", link_type, targets.join(", "));
                }
            }
        }
    }
    Ok(0)
}

fn run_epic(tm: &mut TaskManager, command: EpicCommands) -> Result<i32, taskdeck::Error> {
    match command {
        EpicCommands::List => {
            let epics = tm.epic_list();
            if epics.is_empty() {
                println!("No epics found");
            } else {
                println!(
                    "{:<12} {:<30} {:<10} {:<8} {}",
                    "ID", "Title", "Status", "Tasks", "Epics"
                );
                println!("{}", "-".repeat(80));
                for epic in epics {
                    println!(
                        "{:<12} {:<30} {:<10} {:<8} {}",
                        epic.id,
                        epic.title,
                        epic.status.to_string(),
                        epic.child_tasks.len(),
                        epic.child_epics.len()
                    );
                }
            }
        }
        EpicCommands::Add { title, description } => {
            let epic_id = tm.epic_add(&title, &description)?;
            println!("{}", epic_id);
        }
        EpicCommands::Show { id } => {
            let epic = tm.epic_show(&id)?;
            println!("ID: {}", epic.id);
            println!("Title: {}", epic.title);
            println!("Description: {}", epic.description);
            println!("Status: {}", epic.status);
            println!("Created: {}", format_timestamp(epic.created_at));
            println!("Updated: {}", format_timestamp(epic.updated_at));
            if let Some(parent) = &epic.parent_epic {
                println!("Parent: {}", parent);
            }
            if !epic.child_tasks.is_empty() {
                println!("Tasks: {}", epic.child_tasks.join(", "));
            }
            if !epic.child_epics.is_empty() {
                println!("Epics: {}", epic.child_epics.join(", "));
            }
        }
        EpicCommands::Update { id, field, value } => {
            tm.epic_update(&id, EpicUpdate::parse(&field, &value)?)?;
            println!("Updated epic '{}'", id);
        }
        EpicCommands::Done { id } => {
            tm.epic_done(&id)?;
            println!("Closed epic '{}'", id);
        }
        EpicCommands::Delete { id } => {
            tm.epic_delete(&id)?;
            println!("Deleted epic '{}'", id);
        }
        EpicCommands::AddTask { id, task_id } => {
            tm.epic_add_task(&id, &task_id)?;
            println!("Added task '{}' to epic '{}'", task_id, id);
        }
        EpicCommands::RemoveTask { id, task_id } => {
            tm.epic_remove_task(&id, &task_id)?;
            println!("Removed task '{}' from epic '{}'", task_id, id);
        }
        EpicCommands::AddEpic { id, child_id } => {
            tm.epic_add_epic(&id, &child_id)?;
            println!("Added epic '{}' to epic '{}'", child_id, id);
        }
        EpicCommands::RemoveEpic { id, child_id } => {
            tm.epic_remove_epic(&id, &child_id)?;
            println!("Removed epic '{}' from epic '{}'", child_id, id);
        }
    }
    Ok(0)
}

fn run_verify(tm: &mut TaskManager) -> Result<i32, taskdeck::Error> {
    let report = tm.verify()?;

    if report.links_repaired > 0 {
        println!("Repaired {} link record(s)", report.links_repaired);
    }

    if report.in_progress.is_empty() {
        println!("No tasks in progress");
    } else if report.in_progress.len() == 1 {
        println!("Found 1 task in progress:");
    } else {
        println!("Found {} tasks in progress:", report.in_progress.len());
    }
    for task in &report.in_progress {
        println!("  {}: {}", task.id, task.title);
    }

    if report.invalid_epics.is_empty() {
        println!("All epics valid");
    } else {
        for epic_id in &report.invalid_epics {
            println!("Epic {} has invalid status (children incomplete)", epic_id);
        }
    }

    Ok(if report.passed() { 0 } else { 1 })
}

fn print_task_table(tasks: &[taskdeck::models::Task]) {
    println!(
        "{:<15} {:<30} {:<12} {:<15} {}",
        "ID", "Title", "Status", "Queue", "Created"
    );
    println!("{}", "-".repeat(90));
    for task in tasks {
        println!(
            "{:<15} {:<30} {:<12} {:<15} {}",
            task.id,
            task.title,
            task.status.to_string(),
            task.queue_name().unwrap_or(""),
            format_timestamp(task.created_at)
        );
    }
}

/// Render an epoch-second timestamp in local time for display.
fn format_timestamp(timestamp: f64) -> String {
    use chrono::{DateTime, Local};
    match DateTime::from_timestamp(timestamp as i64, 0) {
        Some(dt) => dt
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        None => "-".to_string(),
    }
}
