use chrono::DateTime;
use clap::{ArgAction, Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;
use wpress::{ArchiveError, ExtractOptions, WpressReader, DEFAULT_CHUNK_SIZE};

#[derive(Parser)]
#[command(name = "wpress", version, about = "Extract and inspect .wpress archives")]
struct Cli {
    /// Log more (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// Log errors only
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract every entry of an archive
    Extract {
        input: PathBuf,
        /// Destination directory (default: current directory)
        output_dir: Option<PathBuf>,
        /// Copy buffer size in bytes
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,
        /// Leave modification times at extraction time
        #[arg(long)]
        no_mtime: bool,
    },
    /// Print the number of entries
    Count {
        input: PathBuf,
    },
    /// List archive contents
    List {
        input: PathBuf,
        /// Emit a JSON array instead of a table
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match run(cli.command, &mut io::stdout().lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("wpress: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

fn run<W: Write>(command: Commands, out: &mut W) -> Result<(), ArchiveError> {
    match command {

        // ── Extract ──────────────────────────────────────────────────────────
        Commands::Extract { input, output_dir, chunk_size, no_mtime } => {
            let mut reader = open_archive(&input)?;
            let mut opts = ExtractOptions::new()
                .chunk_size(chunk_size)
                .preserve_mtime(!no_mtime);
            if let Some(dir) = output_dir {
                opts = opts.output_dir(dir);
            }
            let n = reader.extract(&opts)?;
            writeln!(out, "{n} file(s) extracted")?;
        }

        // ── Count ────────────────────────────────────────────────────────────
        Commands::Count { input } => {
            let mut reader = open_archive(&input)?;
            writeln!(out, "{}", reader.count_entries()?)?;
        }

        // ── List ─────────────────────────────────────────────────────────────
        Commands::List { input, json } => {
            let mut reader = open_archive(&input)?;
            let entries = reader.entries()?;
            if json {
                serde_json::to_writer_pretty(&mut *out, &entries).map_err(io::Error::from)?;
                writeln!(out)?;
            } else {
                writeln!(out, "{:>14}  {:<25}  Path", "Size", "Modified")?;
                for entry in &entries {
                    writeln!(out, "{:>14}  {:<25}  {}", entry.size, format_mtime(entry.mtime), entry.path())?;
                }
            }
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn open_archive(path: &Path) -> Result<WpressReader<std::fs::File>, ArchiveError> {
    let reader = WpressReader::open(path)?;
    info!(archive = %path.display(), bytes = reader.len(), "opened archive");
    Ok(reader)
}

fn format_mtime(mtime: Option<u64>) -> String {
    mtime
        .and_then(|secs| i64::try_from(secs).ok())
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| "-".into())
}

fn init_tracing(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (_, 0)    => "warn",
        (_, 1)    => "info",
        (_, 2)    => "debug",
        _         => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::{tempdir, NamedTempFile};
    use wpress::{ErrorKind, WpressWriter};

    fn archive_file() -> NamedTempFile {
        let mut w = WpressWriter::new(Vec::new());
        w.add_entry("a.txt", "", 0, b"hello").unwrap();
        w.add_entry("b.txt", "sub", 86_400, b"world").unwrap();
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), w.finish().unwrap()).unwrap();
        file
    }

    fn run_to_string(command: Commands) -> Result<String, ArchiveError> {
        let mut out = Vec::new();
        run(command, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn extract_reports_file_count() {
        let archive = archive_file();
        let dest = tempdir().unwrap();
        let report = run_to_string(Commands::Extract {
            input:      archive.path().to_path_buf(),
            output_dir: Some(dest.path().to_path_buf()),
            chunk_size: 512,
            no_mtime:   false,
        }).unwrap();
        assert_eq!(report, "2 file(s) extracted\n");
        assert_eq!(fs::read(dest.path().join("sub/b.txt")).unwrap(), b"world");
    }

    #[test]
    fn count_prints_bare_number() {
        let archive = archive_file();
        let report = run_to_string(Commands::Count { input: archive.path().to_path_buf() }).unwrap();
        assert_eq!(report, "2\n");
    }

    #[test]
    fn list_prints_rfc3339_mtime() {
        let archive = archive_file();
        let report = run_to_string(Commands::List { input: archive.path().to_path_buf(), json: false }).unwrap();
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[2].contains("1970-01-02T00:00:00+00:00"));
        assert!(lines[2].ends_with("sub/b.txt"));
    }

    #[test]
    fn missing_archive_maps_to_io_exit_code() {
        let dir = tempdir().unwrap();
        let err = run_to_string(Commands::Count { input: dir.path().join("absent.wpress") }).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(err.exit_code(), 74);
    }

    #[test]
    fn unknown_mtime_prints_dash() {
        assert_eq!(format_mtime(None), "-");
        assert_eq!(format_mtime(Some(0)), "1970-01-01T00:00:00+00:00");
    }
}
