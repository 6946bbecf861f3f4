use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fieldmark_core::config::FieldmarkConfig;
use fieldmark_core::FieldKind;
use fieldmark_engine::cli;
use fieldmark_engine::config::ConfigLoader;
use fieldmark_engine::FileKeyValueStore;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "fieldmark",
    version,
    about = "Teach and re-extract job title and company name fields on captured pages"
)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Config file (default: ./fieldmark.yaml, then ~/.fieldmark/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Binding store file (overrides store.path from the config)
    #[arg(long, global = true)]
    store: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a locator for the element at a node path (e.g. 1/0/2)
    Locate { page: PathBuf, node: String },
    /// Resolve a locator against a page
    Resolve { page: PathBuf, locator: String },
    /// Bind the element at a node path to a field and save it
    Teach {
        page: PathBuf,
        node: String,
        /// job-title or company-name
        field: FieldKind,
        /// Selected text (default: the element's visible text)
        #[arg(long)]
        text: Option<String>,
    },
    /// Extract every saved field from a page
    Extract { page: PathBuf },
    /// Print saved bindings
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = load_config(args.config.as_deref()).await?;
    let store_path = args
        .store
        .clone()
        .unwrap_or_else(|| ConfigLoader::store_path(&config));
    debug!(store = %store_path.display(), "Using binding store");
    let kv = FileKeyValueStore::new(store_path);

    match args.command {
        Command::Locate { page, node } => {
            let dom = cli::load_page(&page).await?;
            print_json(&cli::locate(&dom, &node)?)?;
        }
        Command::Resolve { page, locator } => {
            let dom = cli::load_page(&page).await?;
            print_json(&cli::resolve(&dom, &locator)?)?;
        }
        Command::Teach {
            page,
            node,
            field,
            text,
        } => {
            let dom = cli::load_page(&page).await?;
            let binding = cli::teach(dom, kv, &config, &node, field, text)
                .await
                .with_context(|| format!("Failed to teach {} from {}", field.label(), node))?;
            print_json(&binding)?;
        }
        Command::Extract { page } => {
            let dom = cli::load_page(&page).await?;
            print_json(&cli::extract(dom, kv, &config).await?)?;
        }
        Command::Show => {
            print_json(&cli::show(&kv).await?)?;
        }
    }

    Ok(())
}

async fn load_config(path: Option<&std::path::Path>) -> Result<FieldmarkConfig> {
    ConfigLoader::load(path).await.with_context(|| match path {
        Some(path) => format!("Failed to load config from {}", path.display()),
        None => "Failed to load config".to_string(),
    })
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
