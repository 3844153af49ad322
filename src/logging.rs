use simplelog::*;
use std::fs::{self, OpenOptions};
use std::io::{Error, ErrorKind};
use std::path::PathBuf;
use std::sync::OnceLock;

static LOGGER: OnceLock<Result<(), String>> = OnceLock::new();

/// `$HOME/.local/share/acidseq/logs`
pub fn log_dir() -> Result<PathBuf, Error> {
    let home = std::env::var("HOME")
        .map_err(|_| Error::new(ErrorKind::NotFound, "HOME environment variable not set"))?;

    Ok(PathBuf::from(home)
        .join(".local")
        .join("share")
        .join("acidseq")
        .join("logs"))
}

/// Debug and up goes to `app.log`; the terminal gets warnings, or everything
/// when `verbose` is set. Later calls return the first call's outcome.
pub fn init_logger(verbose: bool) -> Result<(), Error> {
    LOGGER
        .get_or_init(|| install(verbose).map_err(|e| e.to_string()))
        .clone()
        .map_err(|msg| Error::new(ErrorKind::Other, format!("Logger initialization failed: {}", msg)))
}

fn install(verbose: bool) -> Result<(), Error> {
    let log_dir = log_dir()?;
    fs::create_dir_all(&log_dir)?;

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("app.log"))?;

    let terminal_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };

    CombinedLogger::init(vec![
        WriteLogger::new(LevelFilter::Debug, Config::default(), log_file),
        TermLogger::new(
            terminal_level,
            Config::default(),
            TerminalMode::Stderr,
            ColorChoice::Auto,
        ),
    ])
    .map_err(|e| Error::new(ErrorKind::Other, e))
}
