use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use stitchcraft::api::{self, middleware::SecurityConfig, AppState};
use stitchcraft::cache::SubscriptionCache;
use stitchcraft::client::StitchClient;
use stitchcraft::config::Config;
use stitchcraft::db;
use stitchcraft::engine::{self, DecreaseRule, ExportFormat};
use stitchcraft::models::Pattern;

#[derive(Parser)]
#[command(name = "stitch")]
#[command(about = "Design, count and export crochet patterns")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the Stitchcraft API server
    Serve {
        /// Port for HTTP API (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// SQLite database file (overrides config)
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Export a pattern JSON file as printable text
    Export {
        file: PathBuf,

        #[arg(short, long, value_enum, default_value_t = FormatArg::Text)]
        format: FormatArg,

        #[arg(long, value_enum)]
        decrease_rule: Option<RuleArg>,
    },
    /// Print the stitch total of every round in a pattern JSON file
    Count {
        file: PathBuf,

        #[arg(long, value_enum)]
        decrease_rule: Option<RuleArg>,
    },
    /// Export a pattern stored on a running server
    Fetch {
        id: Uuid,

        #[arg(short, long, value_enum, default_value_t = FormatArg::Text)]
        format: FormatArg,

        #[arg(long, value_enum)]
        decrease_rule: Option<RuleArg>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Text,
    Markdown,
}

impl From<FormatArg> for ExportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => ExportFormat::Text,
            FormatArg::Markdown => ExportFormat::Markdown,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum RuleArg {
    Subtract,
    CeilHalf,
}

impl From<RuleArg> for DecreaseRule {
    fn from(arg: RuleArg) -> Self {
        match arg {
            RuleArg::Subtract => DecreaseRule::Subtract,
            RuleArg::CeilHalf => DecreaseRule::CeilHalf,
        }
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "stitchcraft=debug,tower_http=debug".into()),
    );

    // Logs go to stderr so exported text on stdout can be piped
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn read_pattern(path: &Path) -> anyhow::Result<Pattern> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse pattern JSON in {}", path.display()))
}

fn count_report(pattern: &Pattern, rule: DecreaseRule) -> String {
    let mut out = String::new();
    for section in &pattern.sections {
        out.push_str(&section.name);
        out.push('\n');
        for summary in engine::section_summaries(section, rule) {
            if let Some(n) = summary.number {
                out.push_str(&format!("  Rnd {}: {} sts\n", n, summary.total));
            }
        }
    }
    out
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let db = match &config.database_path {
        Some(path) => db::Database::open(path.clone())?,
        None => db::Database::open_default()?,
    };
    db.migrate()?;

    let state = AppState::new(db)
        .with_cache(SubscriptionCache::new(config.subscription_ttl()))
        .with_decrease_rule(config.decrease_rule);

    let app = api::create_app(state, SecurityConfig::from_env());

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Stitchcraft server listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let mut config = Config::load();

    match cli.command {
        Some(Commands::Serve { port, db }) => {
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(db) = db {
                config.database_path = Some(db);
            }
            serve(config).await?;
        }
        Some(Commands::Export {
            file,
            format,
            decrease_rule,
        }) => {
            let pattern = read_pattern(&file)?;
            let rule = decrease_rule.map_or(config.decrease_rule, Into::into);
            print!("{}", engine::export_pattern(&pattern, format.into(), rule));
        }
        Some(Commands::Count {
            file,
            decrease_rule,
        }) => {
            let pattern = read_pattern(&file)?;
            let rule = decrease_rule.map_or(config.decrease_rule, Into::into);
            print!("{}", count_report(&pattern, rule));
        }
        Some(Commands::Fetch {
            id,
            format,
            decrease_rule,
        }) => {
            let client = StitchClient::from_env();
            let text = client
                .export_pattern(id, format.into(), decrease_rule.map(Into::into))
                .await?;
            print!("{}", text);
        }
        None => serve(config).await?,
    }

    Ok(())
}
