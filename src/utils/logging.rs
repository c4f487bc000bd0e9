use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};
use std::env;
use std::fs;
use std::io;
use std::path::Path;

/// Initialize console logging. The level comes from `RUST_LOG` (default "info").
pub fn init_logging() {
    init_logging_with_file(None);
}

/// Initialize logging with an optional session log file next to the console output.
/// An existing file at `log_path` is replaced.
pub fn init_logging_with_file(log_path: Option<&Path>) {
    let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let enable_backtrace = env::var("RUST_BACKTRACE").unwrap_or_else(|_| "0".to_string()) == "1";

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let mut filter = EnvFilter::new(&log_level);
        if let Ok(directive) = "track_physics=debug".parse() {
            filter = filter.add_directive(directive);
        }
        filter
    });

    let log_file = log_path.and_then(|path| {
        if let Err(e) = fs::remove_file(path) {
            if e.kind() != io::ErrorKind::NotFound {
                eprintln!("Warning: Failed to remove existing {}: {}", path.display(), e);
            }
        }
        match fs::File::create(path) {
            Ok(file) => Some(file),
            Err(e) => {
                eprintln!("Warning: Failed to create {}: {}", path.display(), e);
                None
            }
        }
    });

    let file_layer = log_file.map(|file| {
        fmt::layer()
            .with_writer(file)
            .with_span_events(FmtSpan::CLOSE)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false) // No ANSI codes in file
    });

    let result = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_span_events(FmtSpan::CLOSE)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_ansi(true),
        )
        .with(file_layer)
        .try_init();

    // A subscriber may already be installed (tests, embedding applications)
    if let Err(e) = result {
        tracing::debug!("Logging already initialized: {}", e);
        return;
    }

    std::panic::set_hook(Box::new(move |panic_info| {
        tracing::error!("Panic occurred: {}", panic_info);

        if let Some(location) = panic_info.location() {
            tracing::error!(
                "Panic location: {}:{}:{}",
                location.file(),
                location.line(),
                location.column()
            );
        }

        if enable_backtrace {
            tracing::error!("Backtrace:\n{:?}", std::backtrace::Backtrace::capture());
        }
    }));

    tracing::info!("Logging initialized with level: {}", log_level);
    if let Some(path) = log_path {
        tracing::info!("File logging enabled: {}", path.display());
    }
    tracing::info!("Backtrace enabled: {}", enable_backtrace);
}
