use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use bugboard::models::{MemberRole, Priority, Source, Status};

mod cmd;

#[derive(Parser)]
#[command(name = "bugboard")]
#[command(version, about = "Command-line client for the Bugboard bug tracker")]
pub struct Cli {
    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to bugboard.toml. Defaults to the per-user config directory.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// API base URL. Overrides bugboard.toml and BUGBOARD_API_URL.
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in and persist the session
    Login {
        #[arg(short, long)]
        email: String,
        /// Prompted for when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Create an account and sign in
    Signup {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        name: String,
        #[arg(long)]
        password: Option<String>,
    },
    /// End the session (always clears the local session)
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Update your display name or avatar
    Profile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        avatar_url: Option<String>,
    },
    /// List, inspect and manage projects
    Projects {
        #[command(subcommand)]
        command: ProjectsCommands,
    },
    /// Work with the bugs of a project
    Bugs {
        #[command(subcommand)]
        command: BugsCommands,
    },
    /// Manage project membership
    Members {
        #[command(subcommand)]
        command: MembersCommands,
    },
    /// Access requests for private projects
    Requests {
        #[command(subcommand)]
        command: RequestsCommands,
    },
    /// View or create bugboard.toml
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ProjectsCommands {
    /// Projects you own or belong to
    List,
    /// Public projects
    Public,
    /// Show one project and your role in it
    Show { slug: String },
    Create {
        name: String,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long)]
        public: bool,
    },
    Update {
        slug: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        /// true or false
        #[arg(long)]
        public: Option<bool>,
    },
    Delete {
        slug: String,
        /// Skip confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand, Clone)]
pub enum BugsCommands {
    /// Kanban board of a project
    Board {
        slug: String,
        /// Only bugs whose title or description contains this text
        #[arg(short, long)]
        filter: Option<String>,
    },
    Show { bug_id: String },
    Create {
        slug: String,
        title: String,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(short, long)]
        priority: Option<Priority>,
        #[arg(long)]
        status: Option<Status>,
        #[arg(long)]
        source: Option<Source>,
        #[arg(long)]
        reporter_email: Option<String>,
    },
    Update {
        bug_id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(short, long)]
        priority: Option<Priority>,
        #[arg(long)]
        source: Option<Source>,
    },
    /// Move a bug to another column (triage, in-progress, code-review, qa-testing, deployed)
    Move {
        slug: String,
        bug_id: String,
        status: Status,
    },
    Delete {
        bug_id: String,
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand, Clone)]
pub enum MembersCommands {
    List { slug: String },
    /// Add an existing user, or invite an email address
    Add {
        slug: String,
        email: String,
        #[arg(short, long)]
        role: Option<MemberRole>,
    },
    /// Change a member's role
    Role {
        slug: String,
        member_id: String,
        role: MemberRole,
    },
    Remove {
        slug: String,
        member_id: String,
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand, Clone)]
pub enum RequestsCommands {
    /// Pending requests for a project
    List { slug: String },
    /// Ask to join a project
    Submit {
        slug: String,
        #[arg(short, long)]
        message: Option<String>,
    },
    Approve {
        slug: String,
        request_id: String,
        #[arg(short, long)]
        role: Option<MemberRole>,
    },
    Reject {
        slug: String,
        request_id: String,
        #[arg(short, long)]
        note: Option<String>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Write a default bugboard.toml
    Init,
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            "bugboard=debug"
        } else {
            "bugboard=info"
        })
    });
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Commands::Config { command } = &cli.command {
        return cmd::cmd_config(&cli, command.clone());
    }

    let app = cmd::connect(&cli)?;

    match &cli.command {
        Commands::Login { email, password } => {
            cmd::cmd_login(&app, email, password.clone()).await?
        }
        Commands::Signup {
            email,
            name,
            password,
        } => cmd::cmd_signup(&app, email, name, password.clone()).await?,
        Commands::Logout => cmd::cmd_logout(&app).await?,
        Commands::Whoami => cmd::cmd_whoami(&app).await?,
        Commands::Profile { name, avatar_url } => {
            cmd::cmd_profile(&app, name.clone(), avatar_url.clone()).await?
        }
        Commands::Projects { command } => cmd::cmd_projects(&app, command.clone()).await?,
        Commands::Bugs { command } => cmd::cmd_bugs(&app, command.clone()).await?,
        Commands::Members { command } => cmd::cmd_members(&app, command.clone()).await?,
        Commands::Requests { command } => cmd::cmd_requests(&app, command.clone()).await?,
        Commands::Config { .. } => {}
    }

    Ok(())
}
