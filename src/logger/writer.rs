//! File writer for the logger

use std::fs::{File, OpenOptions};
use std::sync::Mutex;

use crate::logger::config::FileConfig;
use crate::logger::error::LoggerError;

/// Open the configured log file, creating parent directories as needed.
///
/// The returned mutex implements `MakeWriter`, so it can be handed straight
/// to a `fmt` layer.
pub(crate) fn open_log_file(config: &FileConfig) -> Result<Mutex<File>, LoggerError> {
    if config.path.as_os_str().is_empty() {
        return Err(LoggerError::config("log file path is empty"));
    }

    if let Some(parent) = config.path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .append(config.append)
        .truncate(!config.append)
        .open(&config.path)?;

    Ok(Mutex::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::LogFormat;
    use std::io::Write;
    use tempfile::TempDir;

    fn file_config(path: std::path::PathBuf, append: bool) -> FileConfig {
        FileConfig {
            enabled: true,
            path,
            append,
            format: LogFormat::Json,
        }
    }

    #[test]
    fn test_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/logs/app.log");

        let writer = open_log_file(&file_config(path.clone(), true)).unwrap();
        writeln!(writer.lock().unwrap(), "hello").unwrap();

        assert_eq!(std::fs::read_to_string(path).unwrap(), "hello\n");
    }

    #[test]
    fn test_append_and_truncate() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        std::fs::write(&path, "old\n").unwrap();

        let writer = open_log_file(&file_config(path.clone(), true)).unwrap();
        writeln!(writer.lock().unwrap(), "new").unwrap();
        drop(writer);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "old\nnew\n");

        let writer = open_log_file(&file_config(path.clone(), false)).unwrap();
        writeln!(writer.lock().unwrap(), "fresh").unwrap();
        drop(writer);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "fresh\n");
    }

    #[test]
    fn test_empty_path_rejected() {
        let result = open_log_file(&file_config(std::path::PathBuf::new(), true));
        assert!(matches!(result, Err(LoggerError::Config { .. })));
    }
}
