use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use echomeet::config::AppConfig;
use echomeet::settings::{JsonFilePreferences, ThemeSettings};
use echomeet::upload::ImageUploader;
use echomeet::{SessionId, SessionTarget, UserId};
use echomeet_ureq_http_client::UreqHttpClient;
use log::info;
use meetcore::link::CallLink;
use meetcore::session_id;
use std::path::PathBuf;
use std::sync::Arc;

// Command-line companion for the session identity layer.
//
// Usage:
//   cargo run -- session-id u42 u7
//   cargo run -- resolve u7-u42 --me u42
//   cargo run -- invite-link u42 u7 --origin https://meet.example
//   cargo run -- parse-link "https://meet.example/call/u42-u7?targetUserId=u7"
//   cargo run -- upload avatar.jpg
//   cargo run -- theme toggle

#[derive(Parser, Debug)]
#[command(name = "echomeet", version, about = "Conversation identity and session tools")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the canonical session id of two users
    SessionId { a: String, b: String },
    /// Work out the counterpart of a session for the local user
    Resolve {
        session_id: String,
        #[arg(long)]
        me: String,
        /// Explicit counterpart, as carried by `targetUserId`
        #[arg(long)]
        target: Option<String>,
    },
    /// Print the call invite link for a conversation
    InviteLink {
        me: String,
        other: String,
        #[arg(long)]
        origin: Option<String>,
    },
    /// Print the session id and target of an invite link
    ParseLink { url: String },
    /// Upload a profile image and print its hosted URL
    Upload {
        file: PathBuf,
        #[arg(long)]
        folder: Option<String>,
    },
    /// Show or change the UI theme
    Theme {
        #[command(subcommand)]
        action: ThemeAction,
        #[arg(long, global = true)]
        store: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum ThemeAction {
    Show,
    Set { name: String },
    Toggle,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "{} [{:<5}] [{}] - {}",
                Local::now().format("%H:%M:%S"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env();

    match cli.command {
        Command::SessionId { a, b } => {
            println!("{}", session_id::encode(&a, &b)?);
        }
        Command::Resolve {
            session_id,
            me,
            target,
        } => {
            let me: UserId = me.parse()?;
            let target = target.map(|t| t.parse::<UserId>()).transpose()?;
            let resolved = SessionTarget::resolve(&me, target, Some(SessionId::parse(session_id)?))?;
            match resolved.counterpart().user() {
                Some(other) => println!("counterpart: {other}"),
                None => println!("counterpart: unknown"),
            }
            println!("return to: {}", resolved.counterpart().return_target());
        }
        Command::InviteLink { me, other, origin } => {
            let me: UserId = me.parse()?;
            let other: UserId = other.parse()?;
            let session_id = SessionId::for_pair(&me, &other)?;
            let link = CallLink::new(origin.unwrap_or(config.origin), session_id, Some(other));
            println!("{link}");
        }
        Command::ParseLink { url } => {
            let link = CallLink::parse(&url)?;
            println!("session: {}", link.session_id);
            match &link.target {
                Some(target) => println!("target: {target}"),
                None => println!("target: none"),
            }
        }
        Command::Upload { file, folder } => {
            let data = std::fs::read(&file)
                .with_context(|| format!("reading {}", file.display()))?;

            let rt = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("Failed to build tokio runtime")?;

            let uploader = ImageUploader::new(Arc::new(UreqHttpClient::new()), config.upload);
            let image = rt.block_on(uploader.upload_image(data, folder.as_deref()))?;
            info!("Upload finished ({} bytes)", image.bytes.unwrap_or_default());
            println!("{}", image.secure_url);
        }
        Command::Theme { action, store } => {
            let path = store.unwrap_or(config.preferences_path);
            let store = Arc::new(JsonFilePreferences::open(&path)?);
            let mut settings = ThemeSettings::load(store);
            match action {
                ThemeAction::Show => {}
                ThemeAction::Set { name } => settings.set_theme(&name)?,
                ThemeAction::Toggle => {
                    settings.toggle_dark_mode()?;
                }
            }
            println!("{}", settings.theme());
        }
    }
    Ok(())
}
