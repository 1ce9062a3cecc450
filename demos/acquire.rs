//! Acquire one track from the command line
//!
//! Usage:
//!
//! ```bash
//! cargo run --example acquire -- "Imagine Dragons Believer"
//! cargo run --example acquire -- --link https://youtu.be/7wtfhZwyrcc
//! RUST_LOG=tunefetch=debug cargo run --example acquire -- --library ./music "Believer"
//! ```
//!
//! Settings are read from `tunefetch.json` when it exists; `--library` overrides the library
//! directory, which is created if missing.

use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use tunefetch::{AcquisitionPipeline, Config, DownloadProgress, ErrorKind, RunObserver, RunState};

struct Printer;

impl RunObserver for Printer {
    fn on_state(&mut self, state: RunState) {
        println!("→ {state:?}");
    }

    fn on_progress(&mut self, progress: &DownloadProgress) {
        println!(
            "⬇ {:>3}% {:.2} MB/s, {}s left",
            progress.percent(),
            progress.rate / 1_048_576.0,
            progress.eta
        );
    }

    fn on_overwrite(&mut self, path: &Path) {
        println!("! replacing {}", path.display());
    }

    fn on_song_list_changed(&mut self) {
        println!("✓ library updated");
    }

    fn on_error(&mut self, kind: ErrorKind, detail: &str) {
        eprintln!("✗ {}: {detail}", kind.title());
    }
}

/// Command line: free-text name words, `--link URL`, `--library DIR`
#[derive(Debug, Default, PartialEq)]
struct Args {
    name: String,
    link: Option<String>,
    library: Option<PathBuf>,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args, String> {
    let mut parsed = Args::default();
    let mut words = Vec::new();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--link" => parsed.link = Some(args.next().ok_or("--link needs a URL or video id")?),
            "--library" => {
                parsed.library = Some(PathBuf::from(
                    args.next().ok_or("--library needs a directory")?,
                ))
            }
            flag if flag.starts_with("--") => {
                return Err(format!("unknown option {flag}; expected --link or --library"));
            }
            _ => words.push(arg),
        }
    }
    parsed.name = words.join(" ");
    Ok(parsed)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tunefetch=info")),
        )
        .init();

    let Args {
        name,
        link,
        library,
    } = parse_args(std::env::args().skip(1))?;

    let settings = Path::new("tunefetch.json");
    let mut config = if settings.exists() {
        Config::load(settings).await?
    } else {
        Config::default()
    };
    if let Some(dir) = library {
        config.library.library_dir = dir;
    }
    tokio::fs::create_dir_all(config.library_dir()).await?;

    let pipeline = AcquisitionPipeline::new(config)?;
    let handle = pipeline.submit(Some(name.as_str()), link.as_deref())?;
    println!("Run {} for {:?}", handle.id(), handle.query());

    let result = handle.drive(&mut Printer).await;
    println!("{}", serde_json::to_string_pretty(&result)?);

    for track in pipeline.tracks().await? {
        println!("  {} ({} bytes)", track.title, track.size_bytes);
    }

    Ok(())
}
