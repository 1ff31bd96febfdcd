use crate::config::{LoggingConfig, Section};
use std::{
    io::Write,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use tracing::{Level, Metadata};
use tracing_subscriber::{filter::FilterFn, fmt};

use file_rotate::{
    compression::Compression,
    suffix::{AppendTimestamp, FileLimit},
    ContentLimit, FileRotate,
};

// -------- level helpers --------

fn parse_tracing_level(s: &str) -> Option<Level> {
    match s.to_ascii_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        "off" | "none" => None,
        _ => Some(Level::INFO),
    }
}

/// Returns true if target == crate_name or target starts with "crate_name::"
fn matches_crate_prefix(target: &str, crate_name: &str) -> bool {
    target == crate_name
        || (target.starts_with(crate_name) && target[crate_name.len()..].starts_with("::"))
}

/// Per-target level table: explicit crate sections first, "default" for the rest.
#[derive(Clone, Debug, Default)]
struct LevelTable {
    default: Option<Level>,
    by_prefix: Vec<(String, Option<Level>)>,
}

impl LevelTable {
    fn resolve(&self, target: &str) -> Option<Level> {
        self.by_prefix
            .iter()
            .find(|(prefix, _)| matches_crate_prefix(target, prefix))
            .map(|(_, lvl)| *lvl)
            .unwrap_or(self.default)
    }

    fn enabled(&self, meta: &Metadata<'_>) -> bool {
        match self.resolve(meta.target()) {
            Some(max) => meta.level() <= &max,
            None => false,
        }
    }

    fn is_silent(&self) -> bool {
        self.default.is_none() && self.by_prefix.iter().all(|(_, l)| l.is_none())
    }
}

type SectionFilter = FilterFn<Box<dyn Fn(&Metadata<'_>) -> bool + Send + Sync + 'static>>;

fn filter_from(table: LevelTable) -> SectionFilter {
    FilterFn::new(Box::new(move |meta: &Metadata<'_>| table.enabled(meta)))
}

// -------- rotating writer for files --------

#[derive(Clone)]
struct RotWriter(Arc<Mutex<FileRotate<AppendTimestamp>>>);

impl Write for RotWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self.0.lock() {
            Ok(mut f) => f.write(buf),
            Err(_) => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self.0.lock() {
            Ok(mut f) => f.flush(),
            Err(_) => Ok(()),
        }
    }
}

/// A writer that may have no destination (drops writes).
struct RoutedWriter(Option<RotWriter>);

impl Write for RoutedWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.0 {
            Some(w) => w.write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.0 {
            Some(w) => w.flush(),
            None => Ok(()),
        }
    }
}

/// Routes records to per-subsystem files by target prefix, falling back to
/// the "default" file. `by_prefix` is kept longest prefix first.
#[derive(Clone, Default)]
struct FileRouter {
    default: Option<RotWriter>,
    by_prefix: Vec<(String, RotWriter)>,
}

impl FileRouter {
    fn resolve_for(&self, target: &str) -> Option<RotWriter> {
        self.by_prefix
            .iter()
            .find(|(prefix, _)| matches_crate_prefix(target, prefix))
            .map(|(_, w)| w.clone())
            .or_else(|| self.default.clone())
    }

    fn is_empty(&self) -> bool {
        self.default.is_none() && self.by_prefix.is_empty()
    }
}

impl<'a> fmt::MakeWriter<'a> for FileRouter {
    type Writer = RoutedWriter;

    fn make_writer(&'a self) -> Self::Writer {
        RoutedWriter(self.default.clone())
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        RoutedWriter(self.resolve_for(meta.target()))
    }
}

// -------- path resolution helpers --------

/// Relative log paths are resolved against `base_dir` (server.home_dir).
fn resolve_log_path(file: &str, base_dir: &Path) -> PathBuf {
    let p = Path::new(file);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

fn rotation_limit(section: &Section) -> FileLimit {
    match (section.max_backups, section.max_age_days) {
        (Some(n), _) => FileLimit::MaxFiles(n.max(1)),
        (None, Some(days)) => FileLimit::Age(chrono::Duration::days(i64::from(days.max(1)))),
        (None, None) => FileLimit::Age(chrono::Duration::days(1)),
    }
}

fn create_rotating_writer(
    log_path: &Path,
    section: &Section,
) -> Result<RotWriter, Box<dyn std::error::Error + Send + Sync>> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let max_bytes = section.max_size_mb.unwrap_or(100) * 1024 * 1024;
    let rot = FileRotate::new(
        log_path,
        AppendTimestamp::default(rotation_limit(section)),
        ContentLimit::BytesSurpassed(max_bytes as usize),
        Compression::None,
        #[cfg(unix)]
        None,
    );

    Ok(RotWriter(Arc::new(Mutex::new(rot))))
}

fn file_writer_for(name: &str, section: &Section, base_dir: &Path) -> Option<RotWriter> {
    if section.file.trim().is_empty() {
        return None;
    }
    let log_path = resolve_log_path(&section.file, base_dir);
    match create_rotating_writer(&log_path, section) {
        Ok(w) => Some(w),
        Err(e) => {
            eprintln!(
                "Failed to init log file for '{}': {} ({})",
                name,
                log_path.to_string_lossy(),
                e
            );
            None
        }
    }
}

// -------- plan --------

/// Everything needed to install the subscriber, derived from the config.
struct LoggingPlan {
    console: LevelTable,
    file: LevelTable,
    files: FileRouter,
}

fn build_plan(cfg: &LoggingConfig, base_dir: &Path) -> LoggingPlan {
    let mut console = LevelTable::default();
    let mut file = LevelTable::default();
    let mut files = FileRouter::default();

    for (name, section) in cfg {
        let console_level = parse_tracing_level(&section.console_level);
        let writer = file_writer_for(name, section, base_dir);
        let file_level = if writer.is_some() {
            parse_tracing_level(&section.file_level)
        } else {
            None
        };

        if name == "default" {
            console.default = console_level;
            file.default = file_level;
            files.default = writer;
        } else {
            console.by_prefix.push((name.clone(), console_level));
            file.by_prefix.push((name.clone(), file_level));
            if let Some(w) = writer {
                files.by_prefix.push((name.clone(), w));
            }
        }
    }

    // Longest prefixes first so "radar::infra" wins over "radar".
    console.by_prefix.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    file.by_prefix.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    files.by_prefix.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

    LoggingPlan {
        console,
        file,
        files,
    }
}

// -------- public init --------

/// Initialize logging from a configuration.
/// - `cfg`: LoggingConfig containing the logging sections
/// - `base_dir`: base directory used to resolve relative log file paths (usually server.home_dir)
pub fn init_logging_from_config(cfg: &LoggingConfig, base_dir: &Path) {
    // Bridge `log` → `tracing` before installing the subscriber
    let _ = tracing_log::LogTracer::init();

    if cfg.is_empty() {
        init_default_logging();
        return;
    }

    install(build_plan(cfg, base_dir));
}

fn init_default_logging() {
    let _ = fmt()
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .try_init();
}

fn install(plan: LoggingPlan) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer, Registry};

    let ansi = atty::is(atty::Stream::Stdout);

    let console_layer = fmt::layer()
        .with_ansi(ansi)
        .with_target(true)
        .with_level(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_filter(filter_from(plan.console));

    if plan.files.is_empty() || plan.file.is_silent() {
        let _ = Registry::default().with(console_layer).try_init();
        return;
    }

    let file_layer = fmt::layer()
        .json()
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_writer(plan.files)
        .with_filter(filter_from(plan.file));

    let _ = Registry::default()
        .with(console_layer)
        .with(file_layer)
        .try_init();
}

// =================== tests ===================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_logging_config;
    use tempfile::tempdir;

    fn section(console: &str, file: &str, file_level: &str) -> Section {
        Section {
            console_level: console.into(),
            file: file.into(),
            file_level: file_level.into(),
            max_age_days: None,
            max_backups: Some(2),
            max_size_mb: Some(1),
        }
    }

    #[test]
    fn logging_level_parsing() {
        assert_eq!(parse_tracing_level("trace"), Some(Level::TRACE));
        assert_eq!(parse_tracing_level("DEBUG"), Some(Level::DEBUG));
        assert_eq!(parse_tracing_level("Info"), Some(Level::INFO));
        assert_eq!(parse_tracing_level("warn"), Some(Level::WARN));
        assert_eq!(parse_tracing_level("ERROR"), Some(Level::ERROR));
        assert_eq!(parse_tracing_level("off"), None);
        assert_eq!(parse_tracing_level("none"), None);
        assert_eq!(parse_tracing_level("loud"), Some(Level::INFO));
    }

    #[test]
    fn crate_prefix_matching() {
        assert!(matches_crate_prefix("radar", "radar"));
        assert!(matches_crate_prefix("radar::domain::service", "radar"));
        assert!(!matches_crate_prefix("radar_server", "radar"));
        assert!(!matches_crate_prefix("api_ingress", "radar"));
    }

    #[test]
    fn level_table_prefers_explicit_sections() {
        let table = LevelTable {
            default: Some(Level::INFO),
            by_prefix: vec![
                ("sqlx".to_string(), None),
                ("radar".to_string(), Some(Level::TRACE)),
            ],
        };
        assert_eq!(table.resolve("radar::infra"), Some(Level::TRACE));
        assert_eq!(table.resolve("sqlx::query"), None);
        assert_eq!(table.resolve("tower_http::trace"), Some(Level::INFO));
        assert!(!table.is_silent());
        assert!(LevelTable::default().is_silent());
    }

    #[test]
    fn plan_splits_default_and_crate_sections() {
        let tmp = tempdir().unwrap();
        let mut cfg = default_logging_config();
        cfg.insert("radar".into(), section("debug", "logs/radar_core.log", "trace"));
        cfg.insert("sqlx".into(), section("off", "", "debug"));

        let plan = build_plan(&cfg, tmp.path());
        assert_eq!(plan.console.default, Some(Level::INFO));
        assert_eq!(plan.console.resolve("radar::domain"), Some(Level::DEBUG));
        assert_eq!(plan.console.resolve("sqlx"), None);

        // sqlx has no file, so nothing goes to files for it
        assert_eq!(plan.file.resolve("sqlx"), None);
        assert_eq!(plan.file.resolve("radar"), Some(Level::TRACE));
        assert!(plan.files.by_prefix.iter().any(|(name, _)| name == "radar"));
        assert!(plan.files.default.is_some());
        assert!(tmp.path().join("logs").is_dir());
    }

    #[test]
    fn nested_section_file_wins_over_crate_file() {
        let tmp = tempdir().unwrap();
        let mut cfg = default_logging_config();
        cfg.insert("radar".into(), section("info", "logs/radar.log", "debug"));
        cfg.insert(
            "radar::infra".into(),
            section("info", "logs/radar_infra.log", "debug"),
        );

        let plan = build_plan(&cfg, tmp.path());
        let writer_of = |name: &str| {
            plan.files
                .by_prefix
                .iter()
                .find(|(prefix, _)| prefix == name)
                .map(|(_, w)| w.0.clone())
                .unwrap()
        };
        let infra = writer_of("radar::infra");
        let core = writer_of("radar");

        let picked = plan.files.resolve_for("radar::infra::storage").unwrap();
        assert!(Arc::ptr_eq(&picked.0, &infra));
        let picked = plan.files.resolve_for("radar::domain").unwrap();
        assert!(Arc::ptr_eq(&picked.0, &core));
    }

    #[test]
    fn file_paths_resolved_against_home_dir() {
        let tmp = tempdir().unwrap();
        let resolved = resolve_log_path("logs/test.log", tmp.path());
        assert!(resolved.starts_with(tmp.path()));
        assert!(resolved.ends_with("logs/test.log"));

        let abs = tmp.path().join("abs.log");
        assert_eq!(resolve_log_path(&abs.to_string_lossy(), Path::new("/other")), abs);
    }

    #[test]
    fn rotating_writer_creates_parent() {
        let tmp = tempdir().unwrap();
        let p = tmp.path().join("nested/dir/app.log");
        let res = create_rotating_writer(&p, &section("info", "x", "info"));
        assert!(res.is_ok(), "writer should be created");
        assert!(p.parent().unwrap().exists(), "parent dir must be created");
    }

    #[test]
    fn rotation_limit_prefers_backup_count() {
        let mut s = section("info", "x", "info");
        assert!(matches!(rotation_limit(&s), FileLimit::MaxFiles(2)));
        s.max_backups = None;
        s.max_age_days = Some(7);
        assert!(matches!(rotation_limit(&s), FileLimit::Age(_)));
    }
}
