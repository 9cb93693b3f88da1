//! Bug commands: `bugboard bugs ...`.

use anyhow::Result;
use bugboard::api::{CreateBugRequest, UpdateBugRequest};
use bugboard::app::App;
use bugboard::models::{Bug, Priority};
use console::{StyledObject, style};

use super::super::BugsCommands;
use super::{confirm, open_project, print_success, require_login, store_error};

fn priority_badge(priority: Priority) -> StyledObject<&'static str> {
    let s = style(priority.label());
    match priority {
        Priority::Critical => s.red().bold(),
        Priority::High => s.red(),
        Priority::Medium => s.yellow(),
        Priority::Low => s.dim(),
    }
}

fn print_bug(bug: &Bug) {
    println!();
    println!("{}", style(&bug.title).bold());
    println!("  id:       {}", bug.id);
    println!("  status:   {}", bug.status.label());
    println!("  priority: {}", priority_badge(bug.priority));
    println!("  source:   {}", bug.source.label());
    if let Some(email) = &bug.reporter_email {
        println!("  reporter: {}", email);
    } else if let Some(reporter) = &bug.reporter {
        println!("  reporter: {} <{}>", reporter.name, reporter.email);
    }
    for shot in &bug.screenshots {
        println!("  image:    {}", shot);
    }
    println!("  updated:  {}", bug.updated_at.format("%Y-%m-%d %H:%M"));
    if let Some(desc) = &bug.description {
        println!();
        for line in desc.lines() {
            println!("  {}", line);
        }
    }
    println!();
}

async fn load_board(app: &App, slug: &str) -> Result<()> {
    let project = open_project(app, slug).await?;
    if !app.bugs.fetch_bugs_by_project(&project.id).await {
        return Err(store_error(app.bugs.snapshot().error));
    }
    Ok(())
}

pub async fn cmd_bugs(app: &App, command: BugsCommands) -> Result<()> {
    match command {
        BugsCommands::Board { slug, filter } => {
            app.auth.check_auth().await;
            load_board(app, &slug).await?;
            let board = app.bugs.board(filter.as_deref());
            println!();
            for column in &board.columns {
                println!(
                    "{} {}",
                    style(column.label).bold(),
                    style(format!("({})", column.bugs.len())).dim()
                );
                for bug in &column.bugs {
                    println!(
                        "  {:<10} {:<8} {}",
                        style(&bug.id).cyan(),
                        priority_badge(bug.priority),
                        bug.title
                    );
                }
                println!();
            }
            if board.total() == 0 && filter.is_some() {
                println!("No bugs match the filter.");
                println!();
            }
        }
        BugsCommands::Show { bug_id } => {
            app.auth.check_auth().await;
            match app.bugs.fetch_bug(&bug_id).await {
                Some(bug) => print_bug(&bug),
                None => return Err(store_error(app.bugs.snapshot().error)),
            }
        }
        BugsCommands::Create {
            slug,
            title,
            description,
            priority,
            status,
            source,
            reporter_email,
        } => {
            require_login(app).await?;
            let project = open_project(app, &slug).await?;
            if !app.projects.current_permissions().can_create_bugs {
                anyhow::bail!("You cannot report bugs in '{}'. Ask for access first.", slug);
            }
            let mut req = CreateBugRequest::new(project.id, title);
            req.description = description;
            req.priority = priority;
            req.status = status;
            req.source = source;
            req.reporter_email = reporter_email;
            match app.bugs.create_bug(req).await {
                Some(bug) => print_success(&format!("Reported {} ({})", bug.title, bug.id)),
                None => return Err(store_error(app.bugs.snapshot().error)),
            }
        }
        BugsCommands::Update {
            bug_id,
            title,
            description,
            priority,
            source,
        } => {
            require_login(app).await?;
            let req = UpdateBugRequest {
                title,
                description,
                priority,
                source,
                ..Default::default()
            };
            match app.bugs.update_bug(&bug_id, req).await {
                Some(bug) => print_success(&format!("Updated {}", bug.id)),
                None => return Err(store_error(app.bugs.snapshot().error)),
            }
        }
        BugsCommands::Move {
            slug,
            bug_id,
            status,
        } => {
            require_login(app).await?;
            load_board(app, &slug).await?;
            if !app.projects.current_permissions().can_drag_bugs {
                anyhow::bail!("Viewers cannot move bugs in '{}'.", slug);
            }
            if !app.bugs.update_bug_status(&bug_id, status).await {
                return Err(store_error(app.bugs.snapshot().error));
            }
            print_success(&format!("Moved {} to {}", bug_id, status.label()));
        }
        BugsCommands::Delete { bug_id, yes } => {
            require_login(app).await?;
            if !confirm(&format!("Delete bug {}?", bug_id), yes)? {
                println!("Aborted.");
                return Ok(());
            }
            if !app.bugs.delete_bug(&bug_id).await {
                return Err(store_error(app.bugs.snapshot().error));
            }
            print_success(&format!("Deleted {}", bug_id));
        }
    }
    Ok(())
}
