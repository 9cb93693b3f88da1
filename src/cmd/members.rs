//! Membership commands: `bugboard members ...` and `bugboard requests ...`.

use anyhow::Result;
use bugboard::app::App;
use bugboard::stores::AddMemberOutcome;
use console::style;

use super::super::{MembersCommands, RequestsCommands};
use super::{confirm, open_project, print_success, require_login, store_error};

async fn require_manager(app: &App, slug: &str) -> Result<String> {
    require_login(app).await?;
    let project = open_project(app, slug).await?;
    if !app.projects.current_permissions().can_manage_members {
        anyhow::bail!("Only owners and admins can manage members of '{}'.", slug);
    }
    if !app.members.fetch_project_members(&project.id).await {
        return Err(store_error(app.members.snapshot().error));
    }
    Ok(project.id)
}

pub async fn cmd_members(app: &App, command: MembersCommands) -> Result<()> {
    match command {
        MembersCommands::List { slug } => {
            require_login(app).await?;
            let project = open_project(app, &slug).await?;
            if !app.members.fetch_project_members(&project.id).await {
                return Err(store_error(app.members.snapshot().error));
            }
            println!();
            println!("{}", style(format!("Members of {}", project.name)).bold());
            for member in app.members.members_of(&project.id) {
                let who = member
                    .user
                    .as_ref()
                    .map(|u| format!("{} <{}>", u.name, u.email))
                    .unwrap_or_else(|| member.user_id.clone());
                println!(
                    "  {:<12} {:<8} {}",
                    style(&member.id).cyan(),
                    member.role,
                    who
                );
            }
            println!();
        }
        MembersCommands::Add { slug, email, role } => {
            let project_id = require_manager(app, &slug).await?;
            match app.members.add_member(&project_id, &email, role).await {
                Some(AddMemberOutcome::Member(member)) => {
                    print_success(&format!("{} added as {}", email, member.role))
                }
                Some(AddMemberOutcome::Invitation(invitation)) => print_success(&format!(
                    "No account for {} yet; invitation sent (expires {})",
                    invitation.email,
                    invitation.expires_at.format("%Y-%m-%d")
                )),
                Some(AddMemberOutcome::Processed(message)) => {
                    print_success(message.as_deref().unwrap_or("Request processed"))
                }
                None => return Err(store_error(app.members.snapshot().error)),
            }
        }
        MembersCommands::Role {
            slug,
            member_id,
            role,
        } => {
            require_manager(app, &slug).await?;
            match app.members.update_member_role(&member_id, role).await {
                Some(member) => print_success(&format!(
                    "{} is now {} ({})",
                    member.id,
                    member.role,
                    member.role.description()
                )),
                None => return Err(store_error(app.members.snapshot().error)),
            }
        }
        MembersCommands::Remove {
            slug,
            member_id,
            yes,
        } => {
            require_manager(app, &slug).await?;
            if !confirm(&format!("Remove member {} from {}?", member_id, slug), yes)? {
                println!("Aborted.");
                return Ok(());
            }
            if !app.members.remove_member(&member_id).await {
                return Err(store_error(app.members.snapshot().error));
            }
            print_success(&format!("Removed {}", member_id));
        }
    }
    Ok(())
}

pub async fn cmd_requests(app: &App, command: RequestsCommands) -> Result<()> {
    match command {
        RequestsCommands::List { slug } => {
            require_login(app).await?;
            let project = open_project(app, &slug).await?;
            if !app.projects.current_permissions().can_review_requests {
                anyhow::bail!("Only owners and admins can review requests for '{}'.", slug);
            }
            if !app.members.fetch_access_requests(&project.id).await {
                return Err(store_error(app.members.snapshot().error));
            }
            let pending = app.members.pending_requests(&project.id);
            println!();
            if pending.is_empty() {
                println!("No pending access requests.");
            }
            for request in pending {
                let who = request
                    .user
                    .as_ref()
                    .map(|u| format!("{} <{}>", u.name, u.email))
                    .unwrap_or_else(|| request.user_id.clone());
                println!("  {:<12} {}", style(&request.id).cyan(), who);
                if let Some(message) = &request.message {
                    println!("               {}", style(format!("\"{}\"", message)).dim());
                }
            }
            println!();
        }
        RequestsCommands::Submit { slug, message } => {
            require_login(app).await?;
            let project = open_project(app, &slug).await?;
            match app
                .members
                .request_access(&project.id, message.as_deref())
                .await
            {
                Some(_) => print_success(&format!("Access to {} requested", project.name)),
                None => return Err(store_error(app.members.snapshot().error)),
            }
        }
        RequestsCommands::Approve {
            slug,
            request_id,
            role,
        } => {
            require_login(app).await?;
            open_project(app, &slug).await?;
            if !app.projects.current_permissions().can_review_requests {
                anyhow::bail!("Only owners and admins can review requests for '{}'.", slug);
            }
            match app.members.approve_access_request(&request_id, role).await {
                Some(member) => print_success(&format!(
                    "Approved; {} joined as {}",
                    member.user_id, member.role
                )),
                None => return Err(store_error(app.members.snapshot().error)),
            }
        }
        RequestsCommands::Reject {
            slug,
            request_id,
            note,
        } => {
            require_login(app).await?;
            open_project(app, &slug).await?;
            if !app.projects.current_permissions().can_review_requests {
                anyhow::bail!("Only owners and admins can review requests for '{}'.", slug);
            }
            if !app
                .members
                .reject_access_request(&request_id, note.as_deref())
                .await
            {
                return Err(store_error(app.members.snapshot().error));
            }
            print_success(&format!("Rejected {}", request_id));
        }
    }
    Ok(())
}
