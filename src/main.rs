//! CLI entry point for `mboxtext`.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use mboxtext::config::Config;
use mboxtext::extract;
use mboxtext::index::MailboxIndex;
use mboxtext::model::message::Message;
use mboxtext::parser::mime;
use mboxtext::store::reader::MboxStore;

#[derive(Parser)]
#[command(name = "mboxtext", version, about = "Read MBOX archives and extract plain text")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the number of messages in an MBOX file
    Count { path: PathBuf },
    /// List messages with their offset, size and subject
    List {
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Show the parsed headers and body of one message
    Show {
        path: PathBuf,
        /// 1-based message number
        number: usize,
        /// Print the raw bytes instead
        #[arg(long, conflicts_with = "json")]
        raw: bool,
        /// Print the parsed message as JSON
        #[arg(long)]
        json: bool,
    },
    /// Extract plain text from one message, a range, or the whole file
    Text {
        path: PathBuf,
        /// 1-based message number (all messages when omitted)
        number: Option<usize>,
        /// First message of a range
        #[arg(long, requires = "to", conflicts_with = "number")]
        from: Option<usize>,
        /// Last message of a range (inclusive)
        #[arg(long, requires = "from")]
        to: Option<usize>,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = mboxtext::config::load_config();

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::Count { path } => cmd_count(&path, &config),
        Commands::List { path, json } => cmd_list(&path, json, &config),
        Commands::Show {
            path,
            number,
            raw,
            json,
        } => cmd_show(&path, number, raw, json, &config),
        Commands::Text {
            path,
            number,
            from,
            to,
        } => cmd_text(&path, number, from.zip(to), &config),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = mboxtext::config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "mboxtext.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        // Fall back to stderr only
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mboxtext", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::stdout().write_all(&buf)?;
    Ok(())
}

/// Open the index for `path` and build its table of contents with a progress bar.
fn open_index(path: &Path, config: &Config) -> anyhow::Result<MailboxIndex> {
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }

    let index = MailboxIndex::new(path)?
        .with_read_buffer_size(config.performance.read_buffer_size);

    let file_size = std::fs::metadata(path)?.len();
    let pb = ProgressBar::new(file_size);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} Indexing [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
            )
            .expect("valid template")
            .progress_chars("#>-"),
    );

    index.build_with_progress(Some(&|current, total| {
        pb.set_length(total);
        pb.set_position(current);
    }))?;
    pb.finish_and_clear();

    Ok(index)
}

/// Print the number of messages.
fn cmd_count(path: &Path, config: &Config) -> anyhow::Result<()> {
    let start = Instant::now();
    let index = open_index(path, config)?;
    let count = index.len()?;
    tracing::info!(count, elapsed = ?start.elapsed(), "Indexed mailbox");
    println!("{count}");
    Ok(())
}

/// List every message with offset, size and subject.
fn cmd_list(path: &Path, json: bool, config: &Config) -> anyhow::Result<()> {
    use humansize::{format_size, BINARY};

    let index = open_index(path, config)?;
    let mut store = MboxStore::from_index(index, config);
    let rows = store.listing()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!();
    println!("  {} message(s)", rows.len());
    println!();
    if rows.is_empty() {
        return Ok(());
    }

    println!("  {:<6} {:>12} {:>10}  {:<50}", "#", "Offset", "Size", "Subject");
    println!("  {}", "-".repeat(82));
    for row in &rows {
        let subj_trunc: String = match &row.subject {
            Some(subject) => subject.chars().take(50).collect(),
            None => "[unreadable]".to_string(),
        };
        println!(
            "  {:<6} {:>12} {:>10}  {:<50}",
            row.number,
            row.offset,
            format_size(row.length, BINARY),
            subj_trunc
        );
    }
    println!();

    Ok(())
}

/// Show one message.
fn cmd_show(
    path: &Path,
    number: usize,
    raw: bool,
    json: bool,
    config: &Config,
) -> anyhow::Result<()> {
    let mut store = MboxStore::open_with_config(path, config)?;

    if raw {
        std::io::stdout().write_all(&store.raw(number)?)?;
        return Ok(());
    }

    let message = store.message(number)?;
    if json {
        println!("{}", serde_json::to_string_pretty(message)?);
        return Ok(());
    }

    for (name, value) in message.headers().iter() {
        for v in value.values() {
            println!("{name}: {v}");
        }
    }
    println!();

    match message {
        Message::Single(envelope) => println!("{}", envelope.body),
        Message::Multipart(multipart) => {
            for (i, part) in multipart.parts.iter().enumerate() {
                let section = multipart.split_part(i).unwrap_or_default();
                let content_type = section.header(mime::CONTENT_TYPE).unwrap_or("text/plain");
                println!(
                    "[Part {}: {}, {} bytes]",
                    i + 1,
                    content_type,
                    part.len()
                );
            }
        }
    }

    Ok(())
}

/// Print the plain text of one message, a range, or all messages.
fn cmd_text(
    path: &Path,
    number: Option<usize>,
    range: Option<(usize, usize)>,
    config: &Config,
) -> anyhow::Result<()> {
    if let Some(number) = number {
        let mut store = MboxStore::open_with_config(path, config)?;
        println!("{}", store.text(number)?);
        return Ok(());
    }

    let index = open_index(path, config)?;
    let (first, messages) = match range {
        Some((from, to)) => (from, index.range(from..=to)?),
        None => (1, index.iter()?),
    };

    for (offset, raw) in messages.enumerate() {
        if offset > 0 {
            println!("{}", "-".repeat(72));
        }
        let number = first + offset;
        match extract::extract_text_from_raw(raw?) {
            Ok(text) => println!("{text}"),
            Err(e) => {
                tracing::warn!(number, error = %e, "Could not extract message text");
                println!("[message {number}: {e}]");
            }
        }
    }

    Ok(())
}
