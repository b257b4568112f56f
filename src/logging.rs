use std::{
    env,
    fs::OpenOptions,
    path::{Path, PathBuf},
};

use env_logger::{Builder, Env, Target};

/// Environment variable naming a log file when `--log-file` is not given.
pub const LOG_FILE_ENV: &str = "FATHOM_LOG_FILE";

/// Resolve where log output goes, preferring an explicit path.
pub fn log_file(explicit: Option<&Path>) -> Option<PathBuf> {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| env::var_os(LOG_FILE_ENV).map(PathBuf::from))
}

/// Send `log` records to `path`, filtered by `RUST_LOG` (default `info`).
///
/// The terminal belongs to the UI while the app runs, so without a file
/// logging stays off.
pub fn init(path: Option<&Path>) -> std::io::Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Builder::from_env(Env::default().default_filter_or("info"))
        .target(Target::Pipe(Box::new(file)))
        .format_timestamp_millis()
        .try_init()
        .map_err(std::io::Error::other)?;
    log::info!("logging to {}", path.display());
    Ok(())
}
