//! Project commands: `bugboard projects ...`.

use anyhow::Result;
use bugboard::api::UpdateProjectRequest;
use bugboard::app::App;
use bugboard::models::Project;
use console::style;

use super::super::ProjectsCommands;
use super::{confirm, open_project, print_success, require_login, store_error};

fn print_project_line(project: &Project) {
    let visibility = if project.is_public {
        style("public").green()
    } else {
        style("private").dim()
    };
    let counts = match (project.open_bug_count, project.bug_count) {
        (Some(open), Some(total)) => format!("{}/{} open", open, total),
        _ => String::new(),
    };
    println!(
        "  {:<24} {:<32} {:<8} {}",
        style(&project.slug).cyan(),
        project.name,
        visibility,
        style(counts).dim()
    );
}

pub async fn cmd_projects(app: &App, command: ProjectsCommands) -> Result<()> {
    match command {
        ProjectsCommands::List => {
            let user = require_login(app).await?;
            if !app.projects.fetch_my_projects().await {
                return Err(store_error(app.projects.snapshot().error));
            }
            let projects = app.projects.snapshot().projects;
            println!();
            if projects.is_empty() {
                println!("No projects yet. Create one with 'bugboard projects create <name>'.");
                println!();
                return Ok(());
            }
            let (owned, shared): (Vec<_>, Vec<_>) =
                projects.iter().partition(|p| p.owner_id == user.id);
            if !owned.is_empty() {
                println!("{}", style("Owned").bold());
                owned.into_iter().for_each(print_project_line);
                println!();
            }
            if !shared.is_empty() {
                println!("{}", style("Shared with you").bold());
                shared.into_iter().for_each(print_project_line);
                println!();
            }
        }
        ProjectsCommands::Public => {
            if !app.projects.fetch_public_projects().await {
                return Err(store_error(app.projects.snapshot().error));
            }
            let projects = app.projects.snapshot().public_projects;
            println!();
            if projects.is_empty() {
                println!("No public projects.");
            }
            projects.iter().for_each(print_project_line);
            println!();
        }
        ProjectsCommands::Show { slug } => {
            // Public projects are viewable without signing in.
            app.auth.check_auth().await;
            let project = open_project(app, &slug).await?;
            let role = app.projects.snapshot().current_role;
            println!();
            println!("{}", style(&project.name).bold());
            println!("  slug:       {}", project.slug);
            println!("  id:         {}", project.id);
            if let Some(desc) = &project.description {
                println!("  about:      {}", desc);
            }
            println!(
                "  visibility: {}",
                if project.is_public { "public" } else { "private" }
            );
            if let (Some(open), Some(total)) = (project.open_bug_count, project.bug_count) {
                println!("  bugs:       {} open of {}", open, total);
            }
            match role {
                Some(role) => println!("  your role:  {}", role),
                None => println!("  your role:  {}", style("none").dim()),
            }
            println!();
        }
        ProjectsCommands::Create {
            name,
            description,
            public,
        } => {
            require_login(app).await?;
            match app
                .projects
                .create_project(&name, description.as_deref(), public)
                .await
            {
                Some(project) => print_success(&format!(
                    "Created project {} ({})",
                    style(&project.name).bold(),
                    project.slug
                )),
                None => return Err(store_error(app.projects.snapshot().error)),
            }
        }
        ProjectsCommands::Update {
            slug,
            name,
            description,
            public,
        } => {
            require_login(app).await?;
            let project = open_project(app, &slug).await?;
            if !app.projects.current_permissions().can_edit_project {
                anyhow::bail!("Only the project owner can edit '{}'.", slug);
            }
            let req = UpdateProjectRequest {
                name,
                description,
                is_public: public,
            };
            match app.projects.update_project(&project.id, req).await {
                Some(updated) => print_success(&format!("Updated {}", updated.slug)),
                None => return Err(store_error(app.projects.snapshot().error)),
            }
        }
        ProjectsCommands::Delete { slug, yes } => {
            require_login(app).await?;
            let project = open_project(app, &slug).await?;
            if !app.projects.current_permissions().can_edit_project {
                anyhow::bail!("Only the project owner can delete '{}'.", slug);
            }
            if !confirm(
                &format!("Delete project '{}' and all its bugs?", project.name),
                yes,
            )? {
                println!("Aborted.");
                return Ok(());
            }
            if !app.projects.delete_project(&project.id).await {
                return Err(store_error(app.projects.snapshot().error));
            }
            print_success(&format!("Deleted {}", slug));
        }
    }
    Ok(())
}
