use anyhow::{anyhow, Context, Result};
use api_ingress::{ApiIngress, ApiIngressConfig};
use axum::Router;
use clap::{Parser, Subcommand};
use db::{ConnectOpts, DbHandle};
use mimalloc::MiMalloc;
use radar::api::rest::{openapi::RadarApiDoc, routes::register_routes};
use radar::domain::{repo::LocationRepository, service::Service};
use radar::infra::storage::{location_repository, migrations::run_migrations, InMemoryLocationRepository};
use radar::{RadarConfig, StoreKind};
use runtime::{AppConfig, CliArgs, DatabaseConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use utoipa::OpenApi;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const RADAR_MODULE: &str = "radar";
const INGRESS_MODULE: &str = "api_ingress";

/// Expand a sqlite DSN into an absolute-path DSN using a base directory.
/// - Keeps "sqlite::memory:" as-is.
/// - Normalizes backslashes into forward slashes (important on Windows).
fn absolutize_sqlite_dsn(dsn: &str, base_dir: &Path, create_dirs: bool) -> Result<String> {
    if dsn.eq_ignore_ascii_case("sqlite::memory:") || dsn.eq_ignore_ascii_case("sqlite://:memory:")
    {
        return Ok("sqlite::memory:".to_string());
    }
    let db_path = dsn
        .strip_prefix("sqlite://")
        .ok_or_else(|| anyhow!("DSN must start with sqlite:// (got: {})", dsn))?;

    let (path_str, query) = match db_path.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (db_path, None),
    };

    let mut p = PathBuf::from(path_str);
    if p.as_os_str().is_empty() {
        return Err(anyhow!("Empty SQLite path in DSN"));
    }
    if p.is_relative() {
        p = base_dir.join(p);
    }

    if create_dirs {
        if let Some(dir) = p.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
    }

    let mut out = String::from("sqlite://");
    out.push_str(&p.to_string_lossy().replace('\\', "/"));
    if let Some(q) = query {
        out.push('?');
        out.push_str(q);
    }
    Ok(out)
}

/// Radar Server - proximity radar over recently reported user locations
#[derive(Parser)]
#[command(name = "radar-server")]
#[command(about = "Radar Server - reports user locations and finds nearby users")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print current configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Keep locations in memory instead of the configured database
    #[arg(long)]
    mock: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Check configuration
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        port: cli.port,
        print_config: cli.print_config,
        verbose: cli.verbose,
        mock: cli.mock,
    };

    // Load configuration (normalized home_dir is applied inside)
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    let logging_config = config.logging.as_ref().cloned().unwrap_or_default();
    runtime::logging::init_logging_from_config(&logging_config, Path::new(&config.server.home_dir));
    tracing::info!("Radar Server starting");

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config, args).await,
        Commands::Check => check_config(config, args).await,
    }
}

/// Detect DB backend from URL scheme.
fn detect_from_dsn(cfg: &DatabaseConfig) -> Result<&'static str> {
    let raw = cfg.url.trim();
    if raw.is_empty() {
        return Err(anyhow!("Database URL not configured"));
    }
    if raw.eq_ignore_ascii_case("sqlite::memory:") {
        return Ok("sqlite");
    }

    let url = Url::parse(raw).map_err(|e| anyhow!("Invalid database DSN '{}': {}", raw, e))?;

    match url.scheme() {
        "sqlite" => Ok("sqlite"),
        "postgres" | "postgresql" => Ok("postgres"),
        other => Err(anyhow!("Unsupported database type: {}", other)),
    }
}

/// Typed module sections, validated.
fn module_configs(config: &AppConfig, args: &CliArgs) -> Result<(RadarConfig, ApiIngressConfig)> {
    let radar: RadarConfig = config.module_config(RADAR_MODULE)?;
    radar.validate()?;

    let mut ingress: ApiIngressConfig = config.module_config(INGRESS_MODULE)?;
    let explicit_bind = config
        .modules
        .get(INGRESS_MODULE)
        .and_then(|m| m.get("bind_addr"))
        .is_some();
    // server.host/port is the primary listen setting; --port always wins.
    if !explicit_bind || args.port.is_some() {
        ingress.bind_addr = format!("{}:{}", config.server.host, config.server.port);
    }
    if config.server.timeout_sec > 0 {
        ingress.request_timeout = Duration::from_secs(config.server.timeout_sec);
    }
    Ok((radar, ingress))
}

/// Whether locations go to the configured database or stay in memory.
fn uses_database(radar: &RadarConfig, config: &AppConfig, args: &CliArgs) -> Result<bool> {
    if args.mock {
        return Ok(false);
    }
    match radar.store {
        StoreKind::Memory => Ok(false),
        StoreKind::Auto => Ok(config.database.is_some()),
        StoreKind::Database => {
            if config.database.is_none() {
                anyhow::bail!("modules.radar.store is 'database' but no database is configured");
            }
            Ok(true)
        }
    }
}

async fn connect_database(db_config: &DatabaseConfig, base_dir: &Path) -> Result<DbHandle> {
    let backend = detect_from_dsn(db_config)?;

    let mut dsn = db_config.url.trim().to_owned();
    if backend == "sqlite" {
        dsn = absolutize_sqlite_dsn(&dsn, base_dir, true)?;
    }

    let connect_opts = ConnectOpts {
        max_conns: db_config.max_conns.or(Some(10)),
        acquire_timeout: Some(Duration::from_secs(5)),
        sqlite_busy_timeout: db_config
            .busy_timeout_ms
            .map(|ms| Duration::from_millis(u64::from(ms))),
        create_sqlite_dirs: true,
        ..Default::default()
    };

    tracing::info!(backend, "Connecting to database");
    let db = DbHandle::connect(&dsn, connect_opts)
        .await
        .with_context(|| format!("failed to connect to {backend} database"))?;
    tracing::info!("Connected DB backend: {:?}", db.engine());
    Ok(db)
}

/// Location store plus the database handle that owns it, if any.
async fn open_store(
    radar: &RadarConfig,
    config: &AppConfig,
    args: &CliArgs,
) -> Result<(Arc<dyn LocationRepository>, Option<DbHandle>)> {
    if !uses_database(radar, config, args)? {
        tracing::warn!("Using in-memory location store; data is lost on restart");
        return Ok((Arc::new(InMemoryLocationRepository::new()), None));
    }

    let Some(db_config) = config.database.as_ref() else {
        anyhow::bail!("Database configuration missing");
    };
    let base_dir = PathBuf::from(&config.server.home_dir);
    let db = connect_database(db_config, &base_dir).await?;
    run_migrations(&db).await?;
    let repo = location_repository(&db)?;
    Ok((repo, Some(db)))
}

async fn run_server(config: AppConfig, args: CliArgs) -> Result<()> {
    let (radar_cfg, ingress_cfg) = module_configs(&config, &args)?;
    let (repo, db) = open_store(&radar_cfg, &config, &args).await?;

    let service = Arc::new(Service::new(repo, radar_cfg.service_config()));
    tracing::info!(
        radius_m = radar_cfg.search_radius_meters,
        window_s = radar_cfg.freshness_window.as_secs(),
        "Radar service ready"
    );

    let ingress = ApiIngress::new(ingress_cfg).with_openapi(&RadarApiDoc::openapi())?;
    let router = ingress.build_router(register_routes(Router::new(), service));
    let listener = ingress.bind().await?;

    let cancel = runtime::shutdown::shutdown_token();
    let served = ApiIngress::serve(listener, router, cancel).await;

    if let Some(db) = db {
        db.close().await;
    }
    tracing::info!("Radar Server stopped");
    served
}

async fn check_config(config: AppConfig, args: CliArgs) -> Result<()> {
    tracing::info!("Checking configuration...");

    let (radar_cfg, ingress_cfg) = module_configs(&config, &args)?;
    ingress_cfg
        .bind_addr
        .parse::<std::net::SocketAddr>()
        .map_err(|e| anyhow!("Invalid bind address '{}': {}", ingress_cfg.bind_addr, e))?;

    if uses_database(&radar_cfg, &config, &args)? {
        if let Some(db_config) = config.database.as_ref() {
            let backend = detect_from_dsn(db_config)?;
            DbHandle::detect(db_config.url.trim())
                .with_context(|| format!("{backend} DSN rejected"))?;
        }
    }

    tracing::info!("Configuration is valid");
    println!("Configuration check passed");
    println!("{}", config.to_yaml()?);
    Ok(())
}
