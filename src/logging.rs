use chrono::{Local, NaiveDate};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;

/// Directory: ~/.local/share/snap-answer/logs/
pub fn log_dir() -> PathBuf {
    let mut p = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    p.push("snap-answer");
    p.push("logs");
    p
}

fn log_file_name(date: NaiveDate) -> String {
    format!("app-{}.log", date.format("%Y-%m-%d"))
}

/// Writes every record to stderr and to the day's log file.
struct Tee {
    file: File,
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let _ = io::stderr().write_all(buf);
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let _ = io::stderr().flush();
        self.file.flush()
    }
}

fn open_log_file() -> io::Result<(File, PathBuf)> {
    let dir = log_dir();
    fs::create_dir_all(&dir)?;
    let path = dir.join(log_file_name(Local::now().date_naive()));
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    Ok((file, path))
}

/// Initialise `env_logger` (default level `info`, `RUST_LOG` overrides).
/// Falls back to stderr only if the log file cannot be opened.
pub fn init() {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));

    match open_log_file() {
        Ok((file, path)) => {
            builder.target(env_logger::Target::Pipe(Box::new(Tee { file })));
            builder.init();
            log::info!("Logging to {}", path.display());
        }
        Err(e) => {
            builder.init();
            log::warn!("File logging disabled: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_daily_file_name() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(log_file_name(date), "app-2024-03-07.log");
    }

    #[test]
    fn test_tee_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        let file = File::create(&path).unwrap();
        let mut tee = Tee { file };

        tee.write_all(b"[INFO] hello\n").unwrap();
        tee.flush().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "[INFO] hello\n");
    }
}
