//! CLI binary for doc2deck.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `DeckConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use doc2deck::{
    generate_deck, generate_deck_to_file, harvest_only, Audience, DeckConfig,
    DeckProgressCallback, DirectoryStore, Document, ProgressCallback, Tone,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: a bar while assets are harvested, then a spinner
/// while the oracle works, with one log line per slide.
struct CliProgressCallback {
    bar: ProgressBar,
    skipped: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Preparing");
        bar.set_message("Reading document…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            skipped: AtomicUsize::new(0),
        })
    }
}

impl DeckProgressCallback for CliProgressCallback {
    fn on_harvest_start(&self, total_assets: usize) {
        self.bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} assets  {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(TICKS),
        );
        self.bar.set_length(total_assets as u64);
        self.bar.set_prefix("Harvesting");
        self.bar.set_message("");
    }

    fn on_asset_retained(&self, image_id: &str, done: usize, _total: usize) {
        self.bar.set_position(done as u64);
        self.bar.set_message(image_id.to_string());
    }

    fn on_asset_skipped(&self, reason: &str, done: usize, _total: usize) {
        self.skipped.fetch_add(1, Ordering::SeqCst);
        self.bar.set_position(done as u64);
        self.bar.println(format!("  {} {}", dim("–"), dim(reason)));
    }

    fn on_structure_complete(&self, slide_count: usize) {
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Outline ready: {slide_count} slides"))
        ));
    }

    fn on_slide_assigned(&self, slide_index: usize, total: usize, image_id: Option<&str>) {
        self.bar.println(format!(
            "  {} Slide {:>3}/{:<3}  {}",
            green("✓"),
            slide_index + 1,
            total,
            image_id.map(str::to_string).unwrap_or_else(|| dim("no image")),
        ));
    }

    fn on_deck_complete(&self, slide_count: usize, images_placed: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} slides, {} images placed  {}",
            green("✔"),
            bold(&slide_count.to_string()),
            bold(&images_placed.to_string()),
            dim(&format!("({} assets skipped)", self.skipped.load(Ordering::SeqCst))),
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Deck JSON on stdout
  doc2deck report.json

  # Write to file, executive audience
  doc2deck report.json -o deck.json --audience executive --tone concise

  # Plain text input (no images)
  doc2deck notes.md -o deck.json

  # Inspect the image pool only (no API key needed)
  doc2deck --harvest-only report.json

INPUT:
  .json        manifest describing pages/flow containers and asset files
  .txt / .md   plain text; paragraphs split at blank lines

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  DOC2DECK_LLM_PROVIDER   Override provider (openai, anthropic, gemini, ollama)
  DOC2DECK_MODEL          Override model ID
  RUST_LOG                Log filter (e.g. doc2deck=debug)
"#;

/// Turn a document and its images into a slide deck.
#[derive(Parser, Debug)]
#[command(
    name = "doc2deck",
    version,
    about = "Turn a document and its embedded images into a slide deck",
    long_about = "Build a slide deck from a document: an LLM writes the outline, and the \
document's own figures are matched to slides by figure number and text similarity.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Manifest (.json) or plain-text (.txt, .md) document.
    input: PathBuf,

    /// Write deck JSON to this file instead of stdout.
    #[arg(short, long, env = "DOC2DECK_OUTPUT")]
    output: Option<PathBuf>,

    /// Who the deck is for.
    #[arg(long, env = "DOC2DECK_AUDIENCE", value_enum, default_value = "general")]
    audience: AudienceArg,

    /// Register of the generated text.
    #[arg(long, env = "DOC2DECK_TONE", value_enum, default_value = "formal")]
    tone: ToneArg,

    /// Extra instructions passed to the outline generator.
    #[arg(long, env = "DOC2DECK_INSTRUCTIONS", default_value = "")]
    instructions: String,

    /// Directory receiving harvested images.
    #[arg(long, env = "DOC2DECK_STORE", default_value = "extracted")]
    store: PathBuf,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long)]
    provider: Option<String>,

    /// LLM model ID.
    #[arg(long)]
    model: Option<String>,

    /// Assets probed in parallel.
    #[arg(short, long, env = "DOC2DECK_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Abort the whole run after this many seconds.
    #[arg(long, env = "DOC2DECK_TIMEOUT")]
    timeout: Option<u64>,

    /// Per-call LLM timeout in seconds.
    #[arg(long, env = "DOC2DECK_API_TIMEOUT", default_value_t = 90)]
    api_timeout: u64,

    /// Harvest images and print the pool; no outline, no deck.
    #[arg(long)]
    harvest_only: bool,

    /// Print the full run output (deck, assignments, images, stats) as JSON.
    #[arg(long)]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "DOC2DECK_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOC2DECK_VERBOSE")]
    verbose: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum AudienceArg {
    General,
    Executive,
    Technical,
}

impl From<AudienceArg> for Audience {
    fn from(v: AudienceArg) -> Self {
        match v {
            AudienceArg::General => Audience::General,
            AudienceArg::Executive => Audience::Executive,
            AudienceArg::Technical => Audience::Technical,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ToneArg {
    Formal,
    Friendly,
    Concise,
}

impl From<ToneArg> for Tone {
    fn from(v: ToneArg) -> Self {
        match v {
            ToneArg::Formal => Tone::Formal,
            ToneArg::Friendly => Tone::Friendly,
            ToneArg::Concise => Tone::Concise,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let document = Document::load(&cli.input)
        .with_context(|| format!("Failed to load {}", cli.input.display()))?;
    let store = Arc::new(
        DirectoryStore::open(&cli.store)
            .with_context(|| format!("Failed to open image store {}", cli.store.display()))?,
    );

    let show_progress = !cli.no_progress && !cli.json && !cli.harvest_only;
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn DeckProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Harvest-only mode ────────────────────────────────────────────────
    if cli.harvest_only {
        let report = harvest_only(&document, store, &config)
            .await
            .context("Harvest failed")?;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report.images).context("Failed to serialise images")?
            );
        } else {
            for img in &report.images {
                println!(
                    "{:<24} {:>5}x{:<5} {}",
                    img.id(),
                    img.width(),
                    img.height(),
                    img.context()
                );
            }
            for e in &report.skipped {
                eprintln!("{}", dim(&format!("skipped: {e}")));
            }
            eprintln!(
                "{} of {} assets kept",
                report.images.len(),
                report.assets_seen
            );
        }
        return Ok(());
    }

    // ── Generate ─────────────────────────────────────────────────────────
    let output = match cli.output {
        Some(ref path) => {
            let output = generate_deck_to_file(&document, store, path, &config)
                .await
                .context("Deck generation failed")?;
            eprintln!("   →  {}", bold(&path.display().to_string()));
            output
        }
        None => {
            let output = generate_deck(&document, store, &config)
                .await
                .context("Deck generation failed")?;
            if !cli.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&output.deck).context("Failed to serialise deck")?
                );
            }
            output
        }
    };

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("Failed to serialise output")?
        );
    } else {
        for w in &output.warnings {
            eprintln!("{}", dim(&format!("warning: {w}")));
        }
        if !show_progress {
            eprintln!(
                "{} slides, {} images placed in {}ms",
                output.stats.slides, output.stats.images_placed, output.stats.total_duration_ms
            );
        }
    }

    Ok(())
}

/// Map CLI args to `DeckConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<DeckConfig> {
    let mut builder = DeckConfig::builder()
        .audience(cli.audience.into())
        .tone(cli.tone.into())
        .instructions(cli.instructions.clone())
        .concurrency(cli.concurrency)
        .api_timeout_secs(cli.api_timeout);

    if let Some(secs) = cli.timeout {
        builder = builder.run_timeout_secs(secs);
    }
    if let Some(ref name) = cli.provider {
        builder = builder.provider_name(name.clone());
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
