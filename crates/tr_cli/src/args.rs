// Deterministic, offline CLI argument surface.
//
// Rules:
// - No networked paths (reject any scheme:// such as http/https/file)
// - Exactly one of: --manifest  XOR  --snapshot (optionally with --params)
// - Output: --out dir, --render [json|html]*
// - --validate-only loads and schema-checks inputs without reconciling
// - --timestamp pins the run timestamp so replays produce identical ids

use std::{env, fs};
use std::path::{Path, PathBuf};

use clap::Parser;

/// Parsed CLI arguments (raw).
#[derive(Debug, Parser, Clone)]
#[command(
    name = "trecon",
    disable_help_subcommand = true,
    about = "Offline, deterministic tally reconciliation"
)]
pub struct Args {
    /// Path to a manifest JSON naming the snapshot (and optional params).
    #[arg(long, conflicts_with_all = ["snapshot", "params"])]
    pub manifest: Option<PathBuf>,

    /// Snapshot JSON path (direct mode, no manifest).
    #[arg(long)]
    pub snapshot: Option<PathBuf>,

    /// Params JSON path (direct mode only; defaults apply when omitted).
    #[arg(long, requires = "snapshot")]
    pub params: Option<PathBuf>,

    /// Output directory (default: current directory).
    #[arg(long, default_value = ".")]
    pub out: PathBuf,

    /// Renderer(s) to emit. Choose up to 2 (json, html). Omit to skip rendering.
    #[arg(long, value_parser = ["json", "html"], num_args = 0..=2)]
    pub render: Vec<String>,

    /// Run timestamp, strict `YYYY-MM-DDTHH:MM:SSZ`. Defaults to the epoch
    /// so unpinned runs stay byte-reproducible.
    #[arg(long, default_value = "1970-01-01T00:00:00Z")]
    pub timestamp: String,

    /// Validate inputs only (schema + manifest + digest pins), do not reconcile.
    #[arg(long)]
    pub validate_only: bool,

    /// Suppress non-essential stderr logs.
    #[arg(long)]
    pub quiet: bool,
}

/// Errors surfaced by argument validation.
/// Messages are short and stable (handy for scripts and tests).
#[derive(Debug)]
pub enum CliError {
    Missing(&'static str),
    NonLocalPath(String),
    NotFound(String),
    BadTimestamp(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use CliError::*;
        match self {
            Missing(s) => write!(f, "missing required flag: {s}"),
            NonLocalPath(p) => write!(f, "path must be a local file (no scheme): {p}"),
            NotFound(p) => write!(f, "file not found: {p}"),
            BadTimestamp(s) => write!(f, "timestamp must be YYYY-MM-DDTHH:MM:SSZ: {s}"),
        }
    }
}
impl std::error::Error for CliError {}

/// Entry point used by main.rs.
pub fn parse_and_validate() -> Result<Args, CliError> {
    validate(Args::parse())
}

pub fn validate(mut args: Args) -> Result<Args, CliError> {
    for p in iter_all_paths(&args) {
        ensure_local_path(p)?;
    }

    match (&args.manifest, &args.snapshot) {
        (None, None) => return Err(CliError::Missing("--manifest or --snapshot")),
        (Some(m), _) => ensure_exists(m, "--manifest")?,
        (None, Some(s)) => {
            ensure_exists(s, "--snapshot")?;
            if let Some(p) = &args.params {
                ensure_exists(p, "--params")?;
            }
        }
    }

    if !tr_io::hasher::is_ts_utc_z(&args.timestamp) {
        return Err(CliError::BadTimestamp(args.timestamp.clone()));
    }

    args.manifest = args.manifest.take().map(|p| normalize_path(&p));
    args.snapshot = args.snapshot.take().map(|p| normalize_path(&p));
    args.params = args.params.take().map(|p| normalize_path(&p));
    args.out = normalize_path(&args.out);
    Ok(args)
}

fn iter_all_paths(args: &Args) -> impl Iterator<Item = &Path> {
    [
        args.manifest.as_deref(),
        args.snapshot.as_deref(),
        args.params.as_deref(),
        Some(args.out.as_path()),
    ]
    .into_iter()
    .flatten()
}

#[inline]
fn ensure_local_path(p: &Path) -> Result<(), CliError> {
    if let Some(s) = p.to_str() {
        if tr_io::looks_like_url_strict(s) {
            return Err(CliError::NonLocalPath(s.to_string()));
        }
    }
    Ok(())
}

fn ensure_exists(p: &Path, label: &'static str) -> Result<(), CliError> {
    let meta =
        fs::metadata(p).map_err(|_| CliError::NotFound(format!("{label} {}", p.display())))?;
    if !meta.is_file() {
        return Err(CliError::NotFound(format!("{label} {}", p.display())));
    }
    Ok(())
}

/// Best-effort normalization to an absolute path. When canonicalize fails
/// (output dir may not exist yet), fall back to CWD-relative absolute.
fn normalize_path(p: &Path) -> PathBuf {
    fs::canonicalize(p).unwrap_or_else(|_| {
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join(p)
        }
    })
}
