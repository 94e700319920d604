use anyhow::Context;
use clap::{Parser, Subcommand};
use course_search::search::{
    ConstraintMap, ContentSearchRequest, CourseFilterGenerator, CourseSearchService,
    DiscoveryRequest, EngineRegistry, InMemoryEngine, PassthroughProcessor, SearchConfig,
    SearchUser, STATUS_FIELD,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "course-search")]
#[command(about = "Course catalog search CLI", long_about = None, version)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, env = "COURSE_SEARCH_CONFIG")]
    config: Option<PathBuf>,

    /// JSON array of course documents for the discovery index
    #[arg(long)]
    courses: Option<PathBuf>,

    /// JSON array of courseware documents for the content index
    #[arg(long)]
    content: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search courseware content
    Content {
        #[arg(value_name = "TERM")]
        term: String,

        #[arg(long)]
        course: Option<String>,

        #[arg(short, long)]
        user: Option<String>,

        #[arg(short, long, default_value = "10")]
        size: usize,

        #[arg(short, long, default_value = "0")]
        from: usize,
    },

    /// Search the course catalog
    Discover {
        #[arg(value_name = "TERM")]
        term: Option<String>,

        /// ongoing, upcoming, finished and/or invitation_only
        #[arg(long)]
        status: Option<String>,

        #[arg(long)]
        org: Option<String>,

        /// Extra field constraint as key=value
        #[arg(long = "field", value_parser = parse_key_value)]
        fields: Vec<(String, String)>,

        #[arg(short, long, default_value = "20")]
        size: usize,

        #[arg(short, long, default_value = "0")]
        from: usize,
    },
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))
}

fn load_engine(index_name: &str, path: &Path) -> anyhow::Result<Arc<InMemoryEngine>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read documents from {}", path.display()))?;
    let documents: Vec<serde_json::Value> = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid JSON document array in {}", path.display()))?;

    let engine = Arc::new(InMemoryEngine::new(index_name));
    let count = engine.index_documents(documents)?;
    tracing::info!(index = %index_name, count, "Loaded documents");
    Ok(engine)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "course_search=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = SearchConfig::load(cli.config.as_deref())?;

    let registry = Arc::new(EngineRegistry::new());
    if let Some(path) = &cli.courses {
        registry.register(load_engine(&config.course_info_index_name, path)?);
    }
    if let Some(path) = &cli.content {
        registry.register(load_engine(&config.content_index_name, path)?);
    }

    let service = CourseSearchService::new(
        config,
        Arc::new(CourseFilterGenerator::default()),
        registry,
        Arc::new(PassthroughProcessor),
    );

    let response = match cli.command {
        Commands::Content {
            term,
            course,
            user,
            size,
            from,
        } => {
            let mut request = ContentSearchRequest::new(term).with_size(size).with_from(from);
            if let Some(course) = course {
                request = request.with_course(course);
            }
            if let Some(user) = user {
                request = request.with_user(SearchUser::new(user));
            }
            service.perform_search(&request).await?
        }

        Commands::Discover {
            term,
            status,
            org,
            fields,
            size,
            from,
        } => {
            let mut overrides: ConstraintMap = fields.into_iter().collect();
            if let Some(org) = org {
                overrides.set("org", org);
            }
            if let Some(status) = status {
                overrides.set(STATUS_FIELD, status);
            }

            let mut request = DiscoveryRequest::new()
                .with_size(size)
                .with_from(from)
                .with_field_overrides(overrides);
            if let Some(term) = term {
                request = request.with_term(term);
            }
            service.course_discovery_search(&request).await?
        }
    };

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
