use std::path::PathBuf;

use clap::{Parser, Subcommand};
use quill_cli::commands::{auth, capability, permissions, request, CommandResult};
use quill_security::Action;

#[derive(Parser)]
#[command(name = "quill", version, about = "Quill CLI: session and authorization client")]
struct Cli {
    /// Configuration profile (overridden by QUILL_PROFILE)
    #[arg(long, global = true, default_value = "dev")]
    profile: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the credential pair
    Login {
        #[arg(long, short)]
        username: String,
        /// Password (prefer QUILL_PASSWORD over the flag)
        #[arg(long, env = "QUILL_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// End the session
    Logout,
    /// Show the logged-in actor
    Whoami,
    /// List the actor's permissions
    Permissions,
    /// GET a path through the refreshing pipeline
    Get {
        /// Path relative to the API base URL, e.g. /posts
        path: String,
    },
    /// Check whether the actor may view a document (JSON file)
    CanView { file: PathBuf },
    /// Check whether the actor may edit a document (JSON file)
    CanEdit { file: PathBuf },
}

#[tokio::main]
async fn main() {
    quill_core::init_tracing_with("warn");
    let cli = Cli::parse();
    let profile = cli.profile.as_str();

    let result: CommandResult = match cli.command {
        Commands::Login { username, password } => auth::login(profile, &username, &password).await,
        Commands::Logout => auth::logout(profile).await,
        Commands::Whoami => auth::whoami(profile).await,
        Commands::Permissions => permissions::run(profile).await,
        Commands::Get { path } => request::get(profile, &path).await,
        Commands::CanView { file } => capability::check(profile, Action::View, &file).await,
        Commands::CanEdit { file } => capability::check(profile, Action::Edit, &file).await,
    };

    if let Err(e) = result {
        eprintln!("{}", colored::Colorize::red(format!("Error: {e}").as_str()));
        std::process::exit(1);
    }
}
