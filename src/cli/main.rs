use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wiki_search::search::{
    AllowAll, Context, HtmlRenderer, IndexManager, SearchConfig, SearchRunner,
};
use wiki_search::store::DirectoryStore;

#[derive(Parser)]
#[command(name = "wiki-search-cli")]
#[command(about = "Wiki full-text search and index maintenance", long_about = None)]
struct Cli {
    /// Directory holding one file per page
    #[arg(short, long, env = "WIKI_SEARCH_PAGES", default_value = "./data/pages")]
    pages: PathBuf,

    /// Optional TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the cache directory from the configuration
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild the whole index from the page directory
    Rebuild,

    /// Merge index segments
    Optimize,

    /// Queue a changed page and index it
    Update {
        #[arg(value_name = "PAGE")]
        page: String,
    },

    /// Show pages waiting in the update queue
    Queue,

    /// Run a query
    Search {
        #[arg(value_name = "QUERY")]
        query: String,

        #[arg(short, long, value_enum, default_value = "weight")]
        sort: SortArg,

        /// Show highlighted context below each hit
        #[arg(short = 'x', long)]
        context: bool,

        /// Print hits as JSON instead of HTML
        #[arg(short, long)]
        json: bool,

        /// Search page titles only
        #[arg(short, long)]
        titles: bool,

        /// Match case
        #[arg(short = 'C', long)]
        case_sensitive: bool,
    },

    /// Show index statistics
    Stats,
}

#[derive(Clone, Copy, ValueEnum)]
enum SortArg {
    Weight,
    Name,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wiki_search=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = SearchConfig::load(cli.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(cache_dir) = cli.cache_dir {
        config.cache_dir = cache_dir;
    }

    tracing::info!(
        pages = %cli.pages.display(),
        cache_dir = %config.cache_dir.display(),
        "Starting wiki-search v{}",
        env!("CARGO_PKG_VERSION")
    );

    let store = Arc::new(DirectoryStore::new(&cli.pages));
    let index = Arc::new(
        IndexManager::new(config.clone(), store.clone())
            .await
            .context("Failed to open index")?,
    );

    let outcome = run(cli.command, &config, store, &index).await;
    index.finish().await.context("Background indexing failed")?;
    outcome
}

async fn run(
    command: Commands,
    config: &SearchConfig,
    store: Arc<DirectoryStore>,
    index: &Arc<IndexManager>,
) -> anyhow::Result<()> {
    match command {
        Commands::Rebuild => {
            if index.rebuild_all().await? {
                println!("Index rebuilt");
            } else {
                anyhow::bail!("Index is locked by another writer");
            }
        }

        Commands::Optimize => {
            if index.optimize().await? {
                println!("Index optimized");
            } else {
                anyhow::bail!("Index is locked by another writer");
            }
        }

        Commands::Update { page } => {
            index.update_page(&page).await?;
            println!("Queued {}", page);
        }

        Commands::Queue => {
            for page in index.queue().pages()? {
                println!("{}", page);
            }
        }

        Commands::Search {
            query,
            sort,
            context,
            json,
            titles,
            case_sensitive,
        } => {
            let parser = wiki_search::search::QueryParser::new()
                .with_title_search(titles)
                .with_case_sensitive(case_sensitive);
            let runner = SearchRunner::new(store, config.clone())
                .with_index(Arc::clone(index))
                .with_parser(parser);

            let mut results = runner.search(&query, &AllowAll).await?;
            match sort {
                SortArg::Weight => results.sort_by_weight(),
                SortArg::Name => results.sort_by_name(),
            }

            if json {
                let hits: Vec<serde_json::Value> = results
                    .hits
                    .iter()
                    .map(|hit| {
                        let snippet = match hit.context(config.context_width, config.context_max_lines) {
                            Context::Lines(lines) => {
                                lines.iter().map(|line| line.text()).collect::<Vec<_>>()
                            }
                            Context::Leading(text) => vec![text],
                        };
                        json!({
                            "page": hit.name,
                            "attachment": hit.attachment,
                            "weight": hit.weight(),
                            "matches": hit.unique_matches().len(),
                            "context": snippet,
                        })
                    })
                    .collect();
                let body = json!({
                    "query": results.query.to_string(),
                    "hits": hits,
                    "page_count": results.page_count,
                    "elapsed_ms": results.elapsed.as_millis() as u64,
                });
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                let mut html = HtmlRenderer::new();
                results.stats(&mut html);
                if context {
                    results.page_list_with_context(
                        &mut html,
                        true,
                        config.context_width,
                        config.context_max_lines,
                    );
                } else {
                    results.page_list(&mut html, true, true);
                }
                println!("{}", html.into_string());
            }
        }

        Commands::Stats => {
            let stats = index.stats().await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    Ok(())
}
