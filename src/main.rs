use anyhow::{Context, Result, anyhow};
use chrono::FixedOffset;
use clap::{Parser, Subcommand};
use goki::{App, Counters, StoreConfig, StoreLocation};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(name = "goki")]
#[command(about = "Operator tooling for goki user and activity stores")]
struct Cli {
    /// User store location (path, file:// or http(s):// object URL)
    #[arg(long, global = true)]
    users: Option<String>,

    /// Activity store location (path, file:// or http(s):// object URL)
    #[arg(long, global = true)]
    activities: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    AddUser {
        /// Defaults to a new random id
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        name: String,
        #[arg(long)]
        external_id: String,
    },
    Record {
        #[arg(long)]
        user: String,
        #[arg(long, default_value_t = 0)]
        small: i64,
        #[arg(long, default_value_t = 0)]
        medium: i64,
        #[arg(long, default_value_t = 0)]
        large: i64,
    },
    CountYear {
        #[arg(long)]
        user: String,
        #[arg(long)]
        year: i32,
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        offset_hours: i32,
    },
    CountMonth {
        #[arg(long)]
        user: String,
        #[arg(long)]
        year: i32,
        #[arg(long)]
        month: u32,
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        offset_hours: i32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if let Err(err) = fmt().with_env_filter(filter).try_init() {
        eprintln!("tracing init failed: {}", err);
    }

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let app = App::open(&config)
        .await
        .with_context(|| format!("Failed to open stores ({:?})", config))?;

    let outcome = run(&app, cli.command).await;
    let closed = app.shutdown().await.context("Failed to close stores");
    outcome?;
    closed
}

fn load_config(cli: &Cli) -> Result<StoreConfig> {
    let mut config = StoreConfig::from_env().context("Invalid GOKI_* environment")?;
    if let Some(users) = &cli.users {
        config.users = StoreLocation::parse(users)?;
    }
    if let Some(activities) = &cli.activities {
        config.activities = StoreLocation::parse(activities)?;
    }
    config.validate()?;
    Ok(config)
}

async fn run(app: &App, command: Command) -> Result<()> {
    match command {
        Command::AddUser {
            id,
            name,
            external_id,
        } => {
            let id = id.unwrap_or_else(App::new_user_id);
            let user = app.add_user(&id, &name, &external_id).await?;
            println!("Added user {} ({})", user.id(), user.name());
        }
        Command::Record {
            user,
            small,
            medium,
            large,
        } => {
            let activity = app.record_activity(&user, small, medium, large).await?;
            println!(
                "Recorded activity for {} at {}",
                activity.user_id(),
                activity.time_utc().to_rfc3339()
            );
        }
        Command::CountYear {
            user,
            year,
            offset_hours,
        } => {
            let tz = offset(offset_hours)?;
            print_counters(app.count_by_year_in(&user, year, &tz).await?);
        }
        Command::CountMonth {
            user,
            year,
            month,
            offset_hours,
        } => {
            let tz = offset(offset_hours)?;
            print_counters(app.count_by_month_in(&user, year, month, &tz).await?);
        }
    }
    Ok(())
}

fn offset(hours: i32) -> Result<FixedOffset> {
    hours
        .checked_mul(3600)
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| anyhow!("Offset of {} hours is out of range", hours))
}

fn print_counters(counters: Counters) {
    println!(
        "small={} medium={} large={} total={}",
        counters.small,
        counters.medium,
        counters.large,
        counters.total()
    );
}
