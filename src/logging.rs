use flexi_logger::{opt_format, Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming};
use std::path::Path;

/// Log to rotating files under `directory` as well as stderr.
///
/// Keep the returned handle alive for as long as logging is needed.
pub fn setup_file_logging(
    directory: impl AsRef<Path>,
    level: &str,
) -> Result<LoggerHandle, flexi_logger::FlexiLoggerError> {
    Logger::try_with_env_or_str(level)?
        .log_to_file(FileSpec::default().directory(directory.as_ref()).basename("auto2048"))
        .duplicate_to_stderr(flexi_logger::Duplicate::Info)
        .format(opt_format)
        .rotate(
            Criterion::Size(10 * 1024 * 1024),
            Naming::Numbers,
            Cleanup::KeepLogFiles(7),
        )
        .start()
}

/// Colored stderr logging at `level` unless `RUST_LOG` says otherwise.
pub fn setup_console_logging(level: &str) -> Result<LoggerHandle, flexi_logger::FlexiLoggerError> {
    Logger::try_with_env_or_str(level)?
        .format(flexi_logger::colored_default_format)
        .start()
}
