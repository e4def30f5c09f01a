use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use markdown_serializer_config::Config;
use markdown_serializer_engine::{
    FileProcessingResult, ProcessOptions, RewriteOptions, Trigger, convert_all, convert_at_cursor,
    convert_in_selection, failure_count, io, locate_inline_expressions, locate_queries,
    process_file, summarize_failures,
};
use relative_path::RelativePathBuf;
use std::{ops::Range, path::PathBuf};

mod serializer;
mod watch;

use serializer::CommandSerializer;

#[derive(Parser)]
#[command(name = "markdown-serializer")]
#[command(author, version, about = "Keeps serialized query results in Markdown notes up to date", long_about = None)]
struct Cli {
    /// Configuration file (default: ~/.config/markdown-serializer/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Notes folder, overriding `notes_path` from the configuration file
    #[arg(long, global = true)]
    notes: Option<PathBuf>,

    /// Log every directive decision
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one pass over the given notes, or over every eligible note
    Serialize {
        /// Notes to process (default: all notes under the notes folder)
        files: Vec<PathBuf>,

        /// Evaluate manual and once directives too
        #[arg(long)]
        manual: bool,
    },

    /// Replace fenced query blocks and inline expressions with directives
    Convert {
        file: PathBuf,

        /// Only convert the construct under this byte offset
        #[arg(long, conflicts_with = "selection")]
        cursor: Option<usize>,

        /// Only convert inside this byte range, e.g. `120..480`
        #[arg(long, value_parser = parse_range)]
        selection: Option<Range<usize>>,

        /// Print the converted note instead of writing it
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the directives found in a note
    List { file: PathBuf },

    /// Keep processing notes as they change
    Watch {
        /// How long a note must be quiet before it is processed, in milliseconds
        #[arg(long, default_value_t = 500)]
        debounce_ms: u64,
    },
}

fn parse_range(s: &str) -> Result<Range<usize>, String> {
    let (start, end) = s
        .split_once("..")
        .ok_or_else(|| format!("expected START..END, got {s:?}"))?;
    let start: usize = start.trim().parse().map_err(|e| format!("bad start: {e}"))?;
    let end: usize = end.trim().parse().map_err(|e| format!("bad end: {e}"))?;
    if start > end {
        return Err(format!("start {start} is after end {end}"));
    }
    Ok(start..end)
}

/// Loads the configuration file and applies command-line overrides.
///
/// Returns `None` when there is neither a configuration file nor `--notes`.
fn resolve_config(cli: &Cli) -> Result<Option<Config>> {
    let loaded = match &cli.config {
        Some(path) => Some(
            Config::load_from_path(path)?
                .with_context(|| format!("config file {} not found", path.display()))?,
        ),
        None => Config::load()?,
    };

    let config = match (loaded, &cli.notes) {
        (Some(mut config), Some(notes)) => {
            config.notes_path = notes.clone();
            Some(config)
        }
        (Some(config), None) => Some(config),
        (None, Some(notes)) => Some(Config::new(notes)),
        (None, None) => None,
    };

    Ok(config.map(|mut config| {
        config.debug |= cli.debug;
        config
    }))
}

fn require_config(config: Option<Config>) -> Result<Config> {
    let Some(config) = config else {
        bail!(
            "no notes folder given; pass --notes or create a config file at {}",
            Config::config_path().display()
        );
    };
    io::validate_notes_dir(&config.notes_path).with_context(|| {
        format!("notes path '{}' is invalid", config.notes_path.display())
    })?;
    Ok(config)
}

fn init_logging(debug: bool) {
    let level = if debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

pub(crate) fn process_options(config: &Config) -> ProcessOptions {
    ProcessOptions {
        timeout: config.serializer_timeout(),
        rewrite: RewriteOptions {
            always_add_trailing_blank_line: config.always_add_trailing_blank_line,
        },
        debug: config.debug,
    }
}

/// Notes selected for a pass, relative to the notes folder.
fn select_notes(config: &Config, files: &[PathBuf]) -> Result<Vec<RelativePathBuf>> {
    if files.is_empty() {
        let all = io::scan_markdown_files(&config.notes_path)?;
        return Ok(all.into_iter().filter(|p| config.should_process(p)).collect());
    }

    let root = std::fs::canonicalize(&config.notes_path)
        .with_context(|| format!("cannot resolve {}", config.notes_path.display()))?;
    files
        .iter()
        .map(|file| {
            let absolute = std::fs::canonicalize(file)
                .with_context(|| format!("cannot resolve {}", file.display()))?;
            io::relative_to(&root, &absolute).with_context(|| {
                format!("{} is outside the notes folder {}", file.display(), root.display())
            })
        })
        .collect()
}

pub(crate) fn report(results: &[FileProcessingResult], cap: usize) -> usize {
    let failures = failure_count(results);
    if failures > 0 {
        eprintln!("{failures} directive(s) failed:");
        for line in summarize_failures(results, cap) {
            eprintln!("  {line}");
        }
    }
    failures
}

async fn run_serialize(config: Config, files: Vec<PathBuf>, manual: bool) -> Result<()> {
    let serializer = CommandSerializer::from_config(&config)?;
    let options = process_options(&config);
    let trigger = if manual {
        Trigger::Manual
    } else {
        Trigger::Automatic
    };

    let notes = select_notes(&config, &files)?;
    let mut results = Vec::with_capacity(notes.len());
    for note in &notes {
        match process_file(&config.notes_path, note, &serializer, trigger, &options).await {
            Ok(result) => results.push(result),
            Err(err) => log::error!("{note}: {err}"),
        }
    }

    let changed = results.iter().filter(|r| r.changed).count();
    println!("{changed} of {} note(s) updated", notes.len());

    let failures = report(&results, config.max_errors_shown);
    if failures > 0 {
        bail!("{failures} directive(s) could not be serialized");
    }
    Ok(())
}

fn run_convert(
    file: PathBuf,
    cursor: Option<usize>,
    selection: Option<Range<usize>>,
    dry_run: bool,
) -> Result<()> {
    let text = std::fs::read_to_string(&file)
        .with_context(|| format!("cannot read {}", file.display()))?;

    let conversion = match (cursor, selection) {
        (Some(cursor), _) => convert_at_cursor(&text, cursor),
        (None, Some(range)) => {
            let selected = text
                .get(range.clone())
                .with_context(|| format!("selection {range:?} is not within the note"))?;
            let mut converted = convert_in_selection(selected);
            converted.text = format!("{}{}{}", &text[..range.start], converted.text, &text[range.end..]);
            converted
        }
        (None, None) => convert_all(&text),
    };

    for query in &conversion.skipped {
        eprintln!("skipped, cannot convert: {query}");
    }

    if dry_run {
        print!("{}", conversion.text);
    } else if conversion.converted > 0 {
        std::fs::write(&file, &conversion.text)
            .with_context(|| format!("cannot write {}", file.display()))?;
    }
    eprintln!("{} conversion(s) in {}", conversion.converted, file.display());
    Ok(())
}

fn line_of(text: &str, offset: usize) -> usize {
    text[..offset].matches('\n').count() + 1
}

fn run_list(file: PathBuf) -> Result<()> {
    let text = std::fs::read_to_string(&file)
        .with_context(|| format!("cannot read {}", file.display()))?;

    for query in locate_queries(&text) {
        let state = if query.serialized { "serialized" } else { "pending" };
        println!(
            "{}: {:?} {:?} query [{state}] {}",
            query.line + 1,
            query.family,
            query.mode,
            query.query
        );
    }
    for expr in locate_inline_expressions(&text) {
        let state = if expr.existing_result.is_some() { "serialized" } else { "pending" };
        let cell = if expr.is_table_cell { " (table cell)" } else { "" };
        println!(
            "{}: {:?} {:?} inline [{state}]{cell} {}",
            line_of(&text, expr.span.start),
            expr.kind,
            expr.mode,
            expr.expression
        );
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;
    init_logging(config.as_ref().map_or(cli.debug, |c| c.debug));

    match cli.command {
        Commands::Serialize { files, manual } => {
            run_serialize(require_config(config)?, files, manual).await
        }
        Commands::Convert {
            file,
            cursor,
            selection,
            dry_run,
        } => run_convert(file, cursor, selection, dry_run),
        Commands::List { file } => run_list(file),
        Commands::Watch { debounce_ms } => {
            let config = require_config(config)?;
            let serializer = CommandSerializer::from_config(&config)?;
            watch::run(&config, &serializer, std::time::Duration::from_millis(debounce_ms)).await
        }
    }
}
