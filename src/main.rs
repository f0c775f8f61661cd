use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mutuals::{
    ConnectOutcome, Database, EngineConfig, ProjectId, RecommendError, RecommendationEngine,
    SocialService, UserId,
};
use time::OffsetDateTime;
use tracing_subscriber::EnvFilter;

/// mutuals - friend recommendations from a shared social graph
#[derive(Parser)]
#[command(name = "mutuals")]
#[command(about = "Friend recommendations from connections and project tags")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Register a user
    AddUser(AddUserCommand),
    /// Add a project with optional tags
    AddProject(AddProjectCommand),
    /// Connect two users
    Connect(ConnectCommand),
    /// List a user's direct connections
    Connections(ConnectionsCommand),
    /// Recommend new friends for a user
    Recommend(RecommendCommand),
    /// Post a progress update to a project
    AddUpdate(AddUpdateCommand),
    /// Show the most recent project updates
    Updates(UpdatesCommand),
    /// Rank projects by update streaks and activity
    Leaderboard(LeaderboardCommand),
}

#[derive(Parser)]
struct AddUserCommand {
    /// The user's auth id
    #[arg(value_name = "AUTH_ID")]
    auth_id: String,

    /// Display name
    #[arg(value_name = "USERNAME")]
    username: String,
}

#[derive(Parser)]
struct AddProjectCommand {
    /// Owner's auth id
    #[arg(value_name = "OWNER")]
    owner: String,

    /// Project title
    #[arg(value_name = "TITLE")]
    title: String,

    /// Comma-separated tags to apply to the project
    #[arg(short, long, value_name = "TAGS")]
    tags: Option<String>,
}

#[derive(Parser)]
struct ConnectCommand {
    #[arg(value_name = "USER")]
    user: String,

    #[arg(value_name = "FRIEND")]
    friend: String,
}

#[derive(Parser)]
struct ConnectionsCommand {
    #[arg(value_name = "USER")]
    user: String,
}

#[derive(Parser)]
struct RecommendCommand {
    #[arg(value_name = "USER")]
    user: String,

    /// Maximum number of recommendations (overrides MUTUALS_TOP_N)
    #[arg(short, long)]
    limit: Option<usize>,

    /// Print recommendations as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Parser)]
struct AddUpdateCommand {
    /// Project id, as printed by add-project
    #[arg(value_name = "PROJECT")]
    project: i64,

    #[arg(value_name = "CONTENT")]
    content: String,
}

#[derive(Parser)]
struct UpdatesCommand {
    /// Maximum number of updates to show
    #[arg(short, long, default_value_t = 20)]
    limit: usize,
}

#[derive(Parser)]
struct LeaderboardCommand {
    /// Maximum number of projects to show
    #[arg(short, long)]
    limit: Option<usize>,

    /// Print the leaderboard as JSON
    #[arg(long)]
    json: bool,
}

fn main() {
    dotenvy::dotenv().ok();
    init_logging();

    let cli = Cli::parse();

    let result = open_database().and_then(|db| run(&cli.command, db));

    if let Err(e) = result {
        let exit_code = if is_user_error(&e) { 1 } else { 2 };
        eprintln!("Error: {e:#}");
        std::process::exit(exit_code);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Dispatches a command against an opened database.
///
/// Separated from `main` to allow testing with in-memory databases.
fn run(command: &Commands, db: Database) -> Result<()> {
    let service = SocialService::new(db);
    match command {
        Commands::AddUser(cmd) => execute_add_user(cmd, &service),
        Commands::AddProject(cmd) => execute_add_project(cmd, &service),
        Commands::Connect(cmd) => execute_connect(cmd, &service),
        Commands::Connections(cmd) => execute_connections(cmd, &service),
        Commands::Recommend(cmd) => execute_recommend(cmd, &service),
        Commands::AddUpdate(cmd) => execute_add_update(cmd, &service),
        Commands::Updates(cmd) => execute_updates(cmd, &service),
        Commands::Leaderboard(cmd) => execute_leaderboard(cmd, &service),
    }
}

/// Determines if an error is a user error (vs internal error).
///
/// User errors are bad input: blank values, unknown users, duplicates,
/// self-connections. Everything else is a store or I/O failure.
fn is_user_error(error: &anyhow::Error) -> bool {
    if let Some(e) = error.downcast_ref::<RecommendError>() {
        return e.is_user_error();
    }
    let msg = format!("{error:#}");
    msg.contains("cannot be empty")
        || msg.contains("Unknown user")
        || msg.contains("already exists")
        || msg.contains("Unknown project")
}

fn execute_add_user(cmd: &AddUserCommand, service: &SocialService) -> Result<()> {
    let user = service.create_user(&cmd.auth_id, &cmd.username)?;
    println!("User created: {} ({})", user.username(), user.id());
    Ok(())
}

fn execute_add_project(cmd: &AddProjectCommand, service: &SocialService) -> Result<()> {
    let parsed_tags = cmd.tags.as_deref().map(parse_tags);
    let tag_refs: Option<Vec<&str>> = parsed_tags
        .as_ref()
        .map(|tags| tags.iter().map(String::as_str).collect());

    let owner = UserId::new(cmd.owner.trim());
    let project = service
        .create_project(&owner, &cmd.title, tag_refs.as_deref())
        .context("Failed to create project")?;

    print!("Project created (id: {})", project.id);
    if !project.tags.is_empty() {
        print!(" with tags: {}", project.tag_names().join(", "));
    }
    println!();
    Ok(())
}

fn execute_connect(cmd: &ConnectCommand, service: &SocialService) -> Result<()> {
    let user = require_user(service, &cmd.user)?;
    let friend = require_user(service, &cmd.friend)?;

    let engine = RecommendationEngine::new(service.database());
    match engine.connect(&user, &friend)? {
        ConnectOutcome::Created => println!("Connected {user} -> {friend}"),
        ConnectOutcome::AlreadyConnected => println!("{user} is already connected to {friend}"),
    }
    Ok(())
}

fn execute_connections(cmd: &ConnectionsCommand, service: &SocialService) -> Result<()> {
    let user = require_user(service, &cmd.user)?;
    let connections = service.list_connections(&user)?;

    if connections.is_empty() {
        println!("{user} has no connections");
        return Ok(());
    }
    for id in connections {
        let name = service
            .get_user(&id)?
            .map(|u| u.username().to_string())
            .unwrap_or_default();
        println!("{id}\t{name}");
    }
    Ok(())
}

fn execute_recommend(cmd: &RecommendCommand, service: &SocialService) -> Result<()> {
    let user = require_user(service, &cmd.user)?;

    let mut config = EngineConfig::from_env();
    if let Some(limit) = cmd.limit {
        config.top_n = limit;
    }
    let engine = RecommendationEngine::with_config(service.database(), config);
    let recommendations = engine.generate_recommendations(&user)?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&recommendations)?);
        return Ok(());
    }

    if recommendations.is_empty() {
        println!("No recommendations for {user}");
        return Ok(());
    }
    for (rank, rec) in recommendations.iter().enumerate() {
        println!(
            "{:>2}. {} ({}) score {:.2}",
            rank + 1,
            rec.username,
            rec.user_id,
            rec.score
        );
    }
    Ok(())
}

fn execute_add_update(cmd: &AddUpdateCommand, service: &SocialService) -> Result<()> {
    let update = service.add_update(ProjectId::new(cmd.project), &cmd.content)?;
    println!(
        "Update posted (id: {}) to project {}",
        update.id, update.project_id
    );
    Ok(())
}

fn execute_updates(cmd: &UpdatesCommand, service: &SocialService) -> Result<()> {
    let feed = service.update_feed(cmd.limit)?;
    if feed.is_empty() {
        println!("No updates yet");
        return Ok(());
    }

    for item in feed {
        let date = item.update.created_at.date();
        print!("{date}  {} by {}", item.project_title, item.username);
        if !item.tags.is_empty() {
            print!(" [{}]", item.tags.join(", "));
        }
        println!();
        println!("    {}", item.update.content);
    }
    Ok(())
}

fn execute_leaderboard(cmd: &LeaderboardCommand, service: &SocialService) -> Result<()> {
    let mut board = service.leaderboard(OffsetDateTime::now_utc())?;
    if let Some(limit) = cmd.limit {
        board.truncate(limit);
    }

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&board)?);
        return Ok(());
    }

    if board.is_empty() {
        println!("No projects yet");
        return Ok(());
    }
    for (rank, entry) in board.iter().enumerate() {
        println!(
            "{:>2}. {} by {}: streak {}, {} tags, {} updates",
            rank + 1,
            entry.title,
            entry.username,
            entry.longest_streak,
            entry.tag_count,
            entry.update_count
        );
    }
    Ok(())
}

/// Resolves a CLI argument to an existing user id.
fn require_user(service: &SocialService, raw: &str) -> Result<UserId> {
    let id = UserId::new(raw.trim());
    if id.is_blank() {
        anyhow::bail!("User id cannot be empty");
    }
    if service.get_user(&id)?.is_none() {
        anyhow::bail!("Unknown user: {id}");
    }
    Ok(id)
}

/// Gets the database path.
///
/// `MUTUALS_DB` wins; otherwise `{data_dir}/mutuals/social.db`.
fn get_database_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("MUTUALS_DB")
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    let data_dir =
        dirs::data_dir().ok_or_else(|| anyhow::anyhow!("Failed to determine data directory"))?;
    Ok(data_dir.join("mutuals").join("social.db"))
}

/// Ensures the parent directory of the database file exists.
fn ensure_database_directory(db_path: &Path) -> Result<()> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create database directory: {}", parent.display())
        })?;
    }
    Ok(())
}

fn open_database() -> Result<Database> {
    let db_path = get_database_path()?;
    ensure_database_directory(&db_path)?;
    Database::open(&db_path).context("Failed to open database")
}

/// Parses comma-separated tags from a string.
///
/// Splits on commas, trims whitespace from each tag, and filters out empty strings.
fn parse_tags(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory() -> Database {
        Database::in_memory().unwrap()
    }

    #[test]
    fn parse_tags_with_whitespace_and_empty_elements() {
        assert_eq!(parse_tags(" rust ,, learning,"), vec!["rust", "learning"]);
    }

    #[test]
    fn parse_tags_only_whitespace() {
        assert!(parse_tags("  ,  ,  ").is_empty());
    }

    #[test]
    fn recommend_for_unknown_user_is_user_error() {
        let cmd = Commands::Recommend(RecommendCommand {
            user: "ghost".to_string(),
            limit: None,
            json: false,
        });

        let err = run(&cmd, memory()).unwrap_err();

        assert!(err.to_string().contains("Unknown user"));
        assert!(is_user_error(&err));
    }

    #[test]
    fn self_connection_is_user_error() {
        let service = SocialService::new(memory());
        service.create_user("a", "ada").unwrap();
        let cmd = ConnectCommand {
            user: "a".to_string(),
            friend: "a".to_string(),
        };

        let err = execute_connect(&cmd, &service).unwrap_err();

        assert!(is_user_error(&err));
    }

    #[test]
    fn connect_and_recommend_flow() {
        let service = SocialService::new(memory());
        for (id, name) in [("a", "ada"), ("b", "bob"), ("c", "cy")] {
            service.create_user(id, name).unwrap();
        }

        execute_connect(
            &ConnectCommand {
                user: "a".to_string(),
                friend: "b".to_string(),
            },
            &service,
        )
        .unwrap();

        let recs = RecommendationEngine::new(service.database())
            .generate_recommendations(&UserId::new("a"))
            .unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].username, "cy");
    }

    #[test]
    fn add_project_with_tags() {
        let service = SocialService::new(memory());
        service.create_user("a", "ada").unwrap();

        execute_add_project(
            &AddProjectCommand {
                owner: "a".to_string(),
                title: "parser".to_string(),
                tags: Some("rust, cli".to_string()),
            },
            &service,
        )
        .unwrap();

        let projects = service.list_projects(&UserId::new("a")).unwrap();
        assert_eq!(projects[0].tag_names(), vec!["rust", "cli"]);
    }

    #[test]
    fn add_update_to_unknown_project_is_user_error() {
        let cmd = Commands::AddUpdate(AddUpdateCommand {
            project: 99,
            content: "hello".to_string(),
        });

        let err = run(&cmd, memory()).unwrap_err();

        assert!(is_user_error(&err));
    }

    #[test]
    fn add_update_then_leaderboard_flow() {
        let service = SocialService::new(memory());
        service.create_user("a", "ada").unwrap();
        let project = service
            .create_project(&UserId::new("a"), "parser", None)
            .unwrap();

        execute_add_update(
            &AddUpdateCommand {
                project: project.id.get(),
                content: "lexer done".to_string(),
            },
            &service,
        )
        .unwrap();
        execute_updates(&UpdatesCommand { limit: 5 }, &service).unwrap();
        execute_leaderboard(
            &LeaderboardCommand {
                limit: Some(1),
                json: true,
            },
            &service,
        )
        .unwrap();

        let board = service.leaderboard(OffsetDateTime::now_utc()).unwrap();
        assert_eq!(board[0].update_count, 1);
        assert_eq!(board[0].longest_streak, 1);
    }
}
