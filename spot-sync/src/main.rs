//! spot-sync - UrbanSpot command-line client
//!
//! Drives the sync layer from the terminal: browse POIs and profiles, log
//! in and out, and perform the score-affecting writes.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use spot_common::api::ApiKey;
use spot_common::config::{load_toml_config, ConfigOverrides, LoggingConfig, TomlConfig};
use spot_common::models::{Credentials, NewPoi, NewUser, PoiUpdate, TargetKind};
use spot_sync::api::{HttpSpotApi, ImageUpload};
use spot_sync::db::{init_state_db, SqliteCredentialStore};
use spot_sync::{SpotClient, SyncOptions};

/// Command-line arguments for spot-sync
#[derive(Parser, Debug)]
#[command(name = "spot-sync")]
#[command(about = "UrbanSpot sync client")]
#[command(version)]
struct Args {
    /// TOML config file
    #[arg(short, long, env = "SPOT_CONFIG")]
    config: Option<PathBuf>,

    /// Backend base URL
    #[arg(long, env = "SPOT_API_URL")]
    api_url: Option<String>,

    /// Shared API key sent with every request
    #[arg(long, env = "SPOT_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Records requested per list call (1-1000)
    #[arg(long, env = "SPOT_PAGE_SIZE")]
    page_size: Option<u32>,

    /// Ranking entries requested when no --limit is given
    #[arg(long, env = "SPOT_RANKING_LIMIT")]
    ranking_limit: Option<u32>,

    /// Per-request timeout in seconds
    #[arg(long, env = "SPOT_REQUEST_TIMEOUT_SECS")]
    request_timeout_secs: Option<u64>,

    /// Photo-list fetches in flight at once
    #[arg(long, env = "SPOT_FAN_OUT_LIMIT")]
    fan_out_limit: Option<usize>,

    /// Local state database
    #[arg(long, env = "SPOT_STATE_DB")]
    state_db: Option<PathBuf>,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, env = "SPOT_LOG_LEVEL")]
    log_level: Option<String>,

    /// Append logs to this file instead of stderr
    #[arg(long, env = "SPOT_LOG_FILE")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every POI
    Pois {
        /// Only POIs carrying these tags
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
        /// Only POIs created by this user
        #[arg(long)]
        author: Option<String>,
    },
    /// Show a POI with its photos
    Poi { poi_id: String },
    /// Show a user's profile, POIs and photos (defaults to the current user)
    Profile { user_id: Option<String> },
    /// Show the global ranking
    Ranking {
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Log in and remember the user
    Login {
        email: String,
        #[arg(long, env = "SPOT_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and log in
    Register {
        name: String,
        email: String,
        #[arg(long, env = "SPOT_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the current user
    Logout,
    /// Show the current user with refreshed scores
    Whoami,
    /// Create a POI
    CreatePoi {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: String,
        #[arg(long, allow_hyphen_values = true)]
        latitude: f64,
        #[arg(long, allow_hyphen_values = true)]
        longitude: f64,
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
        /// Initial image
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Update fields of a POI
    UpdatePoi {
        poi_id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, allow_hyphen_values = true)]
        latitude: Option<f64>,
        #[arg(long, allow_hyphen_values = true)]
        longitude: Option<f64>,
        #[arg(long, value_delimiter = ',')]
        tags: Option<Vec<String>>,
    },
    /// Delete a POI
    DeletePoi { poi_id: String },
    /// Attach a photo to a POI
    UploadPhoto {
        poi_id: String,
        #[arg(long)]
        image: Option<PathBuf>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete a photo
    DeletePhoto { photo_id: String },
    /// Rate a POI or photo (1-10)
    Rate {
        /// poi or photo
        target_type: TargetKind,
        target_id: String,
        #[arg(allow_hyphen_values = true)]
        score: i64,
    },
    /// Delete a rating
    DeleteRating { rating_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let file_config = load_toml_config(args.config.as_deref())
        .context("Failed to load configuration")?;
    let config = ConfigOverrides {
        api_url: args.api_url.clone(),
        api_key: args.api_key.clone(),
        page_size: args.page_size,
        ranking_limit: args.ranking_limit,
        request_timeout_secs: args.request_timeout_secs,
        fan_out_limit: args.fan_out_limit,
        state_db: args.state_db.clone(),
        log_level: args.log_level.clone(),
        log_file: args.log_file.clone(),
    }
    .apply(file_config);

    init_tracing(&config.logging)?;
    info!(
        "Starting spot-sync v{} against {}",
        env!("CARGO_PKG_VERSION"),
        config.api_url
    );

    config.validate()?;
    let client = build_client(&config).await?;

    // Navigation-bar style subscriber: log every current-user change
    let mut rx = client.session.subscribe();
    let watcher = tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            match rx.borrow_and_update().as_ref() {
                Some(user) => info!(
                    user_id = %user.id,
                    total_score = user.total_score,
                    "Current user updated"
                ),
                None => info!("No user logged in"),
            }
        }
    });

    let outcome = run(&client, &config, args.command).await;

    // Dropping the client closes the channel; the watcher drains the last change and exits
    drop(client);
    if let Err(e) = watcher.await {
        warn!(error = %e, "User watcher task failed");
    }
    outcome
}

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .context("Invalid log level")?;

    match &logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

async fn build_client(config: &TomlConfig) -> Result<SpotClient> {
    let Some(raw_key) = config.api_key.as_deref() else {
        bail!("No API key configured (set api_key in the config file, SPOT_API_KEY or --api-key)");
    };
    let api_key = ApiKey::new(raw_key)?;

    let api = HttpSpotApi::new(
        &config.api_url,
        api_key,
        Duration::from_secs(config.request_timeout_secs),
    )?;

    let db_path = config.state_db_path();
    let pool = init_state_db(&db_path)
        .await
        .with_context(|| format!("Failed to open state database {}", db_path.display()))?;
    let store = SqliteCredentialStore::new(pool);

    let client = SpotClient::new(Arc::new(api), Arc::new(store), SyncOptions::from(config)).await?;
    Ok(client)
}

async fn run(client: &SpotClient, config: &TomlConfig, command: Command) -> Result<()> {
    match command {
        Command::Pois { tags, author } => {
            let tags = (!tags.is_empty()).then_some(tags);
            let fetched = client.catalog.all_pois(tags.as_deref()).await;
            if !fetched.complete {
                warn!("POI list may be incomplete");
            }
            let pois: Vec<_> = match author {
                Some(author) => fetched
                    .items
                    .into_iter()
                    .filter(|p| p.author_id == author)
                    .collect(),
                None => fetched.items,
            };
            print_json(&pois)?;
        }
        Command::Poi { poi_id } => {
            let page = client.catalog.poi_page(&poi_id).await?;
            print_json(&page.poi)?;
            println!("{} photo(s)", page.photos.len());
            print_json(&page.photos)?;
        }
        Command::Profile { user_id } => {
            let Some(user_id) = user_id.or_else(|| client.session.user_id()) else {
                bail!("No user given and nobody is logged in");
            };
            let page = client.catalog.profile_page(&user_id).await;
            match &page.profile {
                Some(profile) => print_json(profile)?,
                None => println!("Profile unavailable"),
            }
            if !page.complete {
                warn!("Contribution lists may be incomplete");
            }
            println!("{} POI(s), {} photo(s)", page.pois.len(), page.photos.len());
            print_json(&page.pois)?;
            print_json(&page.photos)?;
        }
        Command::Ranking { limit } => {
            let ranking = client
                .catalog
                .ranking(limit.unwrap_or(config.ranking_limit))
                .await?;
            for entry in ranking {
                println!(
                    "{:>4}. {:<24} {:>6} pts",
                    entry.position, entry.profile.name, entry.profile.total_score
                );
            }
        }
        Command::Login { email, password } => {
            let user = client.session.login(&Credentials { email, password }).await?;
            println!("Logged in as {} ({} pts)", user.name, user.total_score);
        }
        Command::Register {
            name,
            email,
            password,
        } => {
            let user = client
                .session
                .register(&NewUser {
                    name,
                    email,
                    password,
                })
                .await?;
            println!("Registered {} ({})", user.name, user.id);
        }
        Command::Logout => {
            client.session.logout().await?;
            println!("Logged out");
        }
        Command::Whoami => match client.session.refresh().await.or_else(|| client.session.current_user()) {
            Some(user) => print_json(&user)?,
            None => println!("Not logged in"),
        },
        Command::CreatePoi {
            name,
            description,
            latitude,
            longitude,
            tags,
            image,
        } => {
            let image = load_image(image).await?;
            let poi = NewPoi {
                name,
                description,
                latitude,
                longitude,
                tags,
            };
            let created = client.actions.create_poi(&poi, image.as_ref()).await?;
            print_written(&created)?;
        }
        Command::UpdatePoi {
            poi_id,
            name,
            description,
            latitude,
            longitude,
            tags,
        } => {
            let update = PoiUpdate {
                name,
                description,
                tags,
                latitude,
                longitude,
            };
            let updated = client.actions.update_poi(&poi_id, &update).await?;
            print_written(&updated)?;
        }
        Command::DeletePoi { poi_id } => {
            client.actions.delete_poi(&poi_id).await?;
            println!("Deleted POI {}", poi_id);
        }
        Command::UploadPhoto {
            poi_id,
            image,
            description,
        } => {
            let image = load_image(image).await?;
            let photo = client
                .actions
                .upload_photo(&poi_id, image.as_ref(), description.as_deref())
                .await?;
            print_written(&photo)?;
        }
        Command::DeletePhoto { photo_id } => {
            client.actions.delete_photo(&photo_id).await?;
            println!("Deleted photo {}", photo_id);
        }
        Command::Rate {
            target_type,
            target_id,
            score,
        } => {
            let rating = client.actions.rate(target_type, &target_id, score).await?;
            print_written(&rating)?;
        }
        Command::DeleteRating { rating_id } => {
            client.actions.delete_rating(&rating_id).await?;
            println!("Deleted rating {}", rating_id);
        }
    }

    if let Some(user) = client.session.current_user() {
        info!(user_id = %user.id, total_score = user.total_score, "Session");
    }
    Ok(())
}

async fn load_image(path: Option<PathBuf>) -> Result<Option<ImageUpload>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let image = ImageUpload::from_path(&path)
        .await
        .with_context(|| format!("Failed to read image {}", path.display()))?;
    if !image.is_image() {
        warn!(
            file = %image.file_name,
            content_type = %image.content_type,
            "File does not look like an image"
        );
    }
    Ok(Some(image))
}

/// Print a record returned by a write, if the response could be read
fn print_written<T: Serialize>(record: &Option<T>) -> Result<()> {
    match record {
        Some(record) => print_json(record),
        None => {
            println!("Done (response could not be read)");
            Ok(())
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
