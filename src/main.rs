use anyhow::Context as _;
use clap::Parser as _;
use dotenvy::dotenv;
use poise::serenity_prelude as serenity;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod db;
mod modules;
mod services;

use modules::invite_tracking::InviteTracker;
use modules::staff_invites::{StaffDirectory, StaffRoster};
use modules::vip::VipCorrelator;
use services::backup::{BackupHandle, BackupOutbox, BackupTransport, HttpTransport, RetryPolicy};
use services::settings::Settings;

#[derive(clap::Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Publish commands. If no guild ID is provided, publish globally.
    #[arg(long, num_args = 0..)]
    publish: Option<Vec<u64>>,

    /// Clear all commands instead of publishing them.
    #[arg(long)]
    clear: bool,

    /// Rollback the specified number of migrations and run all migrations again.
    #[arg(long, num_args = 0..=1, default_missing_value = "1")]
    refresh_migrations: Option<u32>,

    /// Replace the local database with the latest cloud backup, then exit.
    #[arg(long)]
    restore_from_cloud: bool,
}

// Custom user data passed to all command functions
pub struct Data {
    pub db: DatabaseConnection,
    pub backup: BackupHandle,
    pub backup_transport: Option<Arc<dyn BackupTransport>>,
    pub invites: Arc<InviteTracker>,
    pub staff: Arc<StaffDirectory>,
    pub vip: VipCorrelator,
    pub module_definitions: Vec<modules::ModuleDefinition>,
    pub event_handlers: Vec<(&'static str, modules::EventHandler)>,
}

pub type Error = anyhow::Error;
pub type Context<'a> = poise::Context<'a, Data, Error>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting invite ledger...");

    let settings = Settings::from_env().context("Invalid configuration")?;

    // Establish database connection
    let db = db::establish_connection(&settings.database_url)
        .await
        .context("Failed to connect to database")?;

    // Run migrations
    use sea_orm_migration::MigratorTrait;
    if let Some(depth) = args.refresh_migrations {
        info!("Refreshing migrations (down {}, then up)...", depth);
        db::migrations::Migrator::down(&db, Some(depth))
            .await
            .context("Failed to rollback migration")?;
    }

    db::migrations::Migrator::up(&db, None)
        .await
        .context("Failed to run migrations")?;

    if args.refresh_migrations.is_some() {
        info!("Migrations refreshed successfully.");
        std::process::exit(0);
    }

    // Cloud backup
    let backup_transport: Option<Arc<dyn BackupTransport>> = match &settings.cloud_backup_url {
        Some(url) => Some(Arc::new(
            HttpTransport::new(url.clone(), settings.backup_timeout)
                .context("Failed to build cloud backup client")?,
        )),
        None => {
            warn!("CLOUD_BACKUP_URL is not set; cloud backup is disabled.");
            None
        }
    };

    if args.restore_from_cloud {
        let transport = backup_transport
            .as_ref()
            .context("--restore-from-cloud requires CLOUD_BACKUP_URL")?;
        services::backup::restore_from_cloud(&db, transport.as_ref())
            .await
            .context("Cloud restore failed")?;
        std::process::exit(0);
    }

    let backup = match &backup_transport {
        Some(transport) => {
            let (handle, _writer) =
                BackupOutbox::spawn(db.clone(), transport.clone(), RetryPolicy::default());
            handle
        }
        None => BackupHandle::disabled(),
    };
    BackupOutbox::start_periodic_runner(backup.clone(), settings.backup_interval);

    // Staff roster and directory
    let roster = StaffRoster::load(&settings.staff_config_path);
    let staff = Arc::new(StaffDirectory::new(db.clone(), roster, backup.clone()));

    let vip = VipCorrelator::new(
        db.clone(),
        staff.clone(),
        backup.clone(),
        settings.vip_role_id,
    );
    if settings.vip_role_id.is_none() {
        warn!("VIP_ROLE_ID is not set; role-based VIP conversions are disabled.");
    }

    let token = std::env::var("DISCORD_TOKEN").context("missing DISCORD_TOKEN")?;
    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::GUILD_MEMBERS
        | serenity::GatewayIntents::GUILD_INVITES;

    let commands = modules::commands();

    // Handle command registration if requested
    if let Some(publish_args) = args.publish {
        let http = Arc::new(serenity::Http::new(&token));
        let app = http
            .get_current_application_info()
            .await
            .context("Failed to fetch application info")?;
        http.set_application_id(app.id);

        info!("Fetched Application ID: {}", app.id);

        let empty_commands = vec![];
        let commands = if args.clear {
            &empty_commands
        } else {
            &commands
        };

        if publish_args.is_empty() {
            if args.clear {
                info!("Clearing commands globally...");
            } else {
                info!("Registering commands globally...");
            }

            if let Err(e) = poise::builtins::register_globally(&http, commands).await {
                error!("Failed to register commands globally: {}", e);
            } else {
                info!("Global command operation successful");
            }
        } else {
            for guild_id in publish_args {
                if args.clear {
                    info!("Clearing commands in guild {}...", guild_id);
                } else {
                    info!("Registering commands in guild {}...", guild_id);
                }

                if let Err(e) = poise::builtins::register_in_guild(
                    &http,
                    commands,
                    serenity::GuildId::new(guild_id),
                )
                .await
                {
                    error!("Failed to register commands in guild {}: {}", guild_id, e);
                } else {
                    info!("Guild command operation successful for guild {}", guild_id);
                }
            }
        }
        std::process::exit(0);
    }

    let framework_options = poise::FrameworkOptions {
        commands,
        event_handler: services::event_manager::handler,
        on_error: |error| {
            Box::pin(async move {
                if let Err(e) = poise::builtins::on_error(error).await {
                    error!("Error while handling error: {}", e);
                }
            })
        },
        ..Default::default()
    };

    let invite_sync_interval = settings.invite_sync_interval;
    let framework = poise::Framework::builder()
        .options(framework_options)
        .setup(move |ctx, _ready, _framework| {
            Box::pin(async move {
                let invites = Arc::new(InviteTracker::new(
                    db.clone(),
                    ctx.http.clone(),
                    backup.clone(),
                ));
                InviteTracker::start_sync_runner(
                    invites.clone(),
                    ctx.cache.clone(),
                    invite_sync_interval,
                );

                Ok(Data {
                    db,
                    backup,
                    backup_transport,
                    invites,
                    staff,
                    vip,
                    module_definitions: modules::definitions(),
                    event_handlers: modules::event_handlers(),
                })
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await
        .context("Failed to create client")?;

    info!("Bot is ready!");
    client.start_autosharded().await.context("Client error")?;

    Ok(())
}
