//! CLI binary for edgequake-bgswap.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `StudioConfig` + `EditRequest` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_bgswap::config::DEFAULT_BASE_URL;
use edgequake_bgswap::{
    edit_to_file, Action, BackgroundSpec, EditRequest, Operation, ProgressCallback, StudioConfig,
    StudioProgressCallback, DEFAULT_MODEL, EXPORT_FILENAME, PRESET_BACKGROUNDS,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner showing the current loading
/// message, plus one log line per remote model call.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading image…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl StudioProgressCallback for CliProgressCallback {
    fn on_action_start(&self, action: Action) {
        self.bar.set_prefix(match action {
            Action::Upload => "Uploading",
            Action::Generate => "Generating",
        });
    }

    fn on_status(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    fn on_call_complete(&self, operation: Operation, duration_ms: u64, produced_image: bool) {
        let (mark, note) = if produced_image {
            (green("✓"), String::new())
        } else {
            (red("✗"), red("no image returned"))
        };
        self.bar.println(format!(
            "  {} {:<22} {}  {}",
            mark,
            operation.to_string(),
            dim(&format!("{:.1}s", duration_ms as f64 / 1000.0)),
            note,
        ));
    }

    fn on_action_complete(&self, action: Action, error: Option<&str>) {
        if let Some(e) = error {
            // Truncate very long error messages to keep output tidy.
            let msg = if e.chars().count() > 100 {
                format!("{}\u{2026}", e.chars().take(99).collect::<String>())
            } else {
                e.to_string()
            };
            self.bar.println(format!("  {} {} failed: {}", red("✗"), action, red(&msg)));
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Swap onto the first preset background
  bgswap portrait.jpg

  # Solid colour background, cartoon style
  bgswap portrait.jpg -b '#00ff00' --cartoon -o green.png

  # Your own background image (path or URL)
  bgswap portrait.jpg -b beach.jpg
  bgswap https://example.com/me.jpg -b https://example.com/city.jpg

  # A specific preset (see --list-presets)
  bgswap portrait.jpg -b preset:4

  # JSON summary on stdout
  bgswap --json portrait.jpg -o out.png

BACKGROUNDS (-b):
  preset:N        built-in preset N (1-based)
  color:#rrggbb   solid colour (also #rgb, or a bare #rrggbb)
  PATH | URL      custom background image

MODEL CALLS:
  remove background   always, once per input
  cartoonify          only with --cartoon
  composite           once, onto the chosen background

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY   Google Gemini API key (legacy: API_KEY)
  BGSWAP_MODEL     Override the image model
  RUST_LOG         Log filter (e.g. edgequake_bgswap=debug)
"#;

/// Replace the background of a photo using a generative image model.
#[derive(Parser, Debug)]
#[command(
    name = "bgswap",
    version,
    about = "Replace the background of a photo using a generative image model",
    long_about = "Remove the background from a photo, optionally redraw the subject as a cartoon, \
and composite it onto a preset image, your own image, or a solid colour. Every step is a \
call to a Gemini image model.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Photo to edit: local image path or HTTP/HTTPS URL.
    #[arg(required_unless_present = "list_presets")]
    input: Option<String>,

    /// Background: preset:N, color:#hex, #hex, or an image path/URL.
    #[arg(short, long, env = "BGSWAP_BACKGROUND", default_value = "preset:1")]
    background: String,

    /// Redraw the subject in a cartoon style before compositing.
    #[arg(long, env = "BGSWAP_CARTOON")]
    cartoon: bool,

    /// Where to write the final image (a directory gets edited-image.png).
    #[arg(short, long, env = "BGSWAP_OUTPUT", default_value = EXPORT_FILENAME)]
    output: PathBuf,

    /// Image model ID.
    #[arg(long, env = "BGSWAP_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Gemini API key.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// API base URL (override for proxies or local mocks).
    #[arg(long, env = "BGSWAP_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Per-call model timeout in seconds (default: none).
    #[arg(long, env = "BGSWAP_API_TIMEOUT")]
    api_timeout: Option<u64>,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "BGSWAP_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Print a JSON summary (EditOutput) on stdout.
    #[arg(long, env = "BGSWAP_JSON")]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "BGSWAP_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "BGSWAP_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "BGSWAP_QUIET")]
    quiet: bool,

    /// Print the built-in preset backgrounds and exit.
    #[arg(long)]
    list_presets: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs while the spinner is active;
    // the spinner provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Preset listing ───────────────────────────────────────────────────
    if cli.list_presets {
        for (i, url) in PRESET_BACKGROUNDS.iter().enumerate() {
            println!("preset:{}  {}", i + 1, url);
        }
        return Ok(());
    }

    let input = cli.input.clone().context("An input image is required")?;
    let background: BackgroundSpec = cli
        .background
        .parse()
        .with_context(|| format!("Invalid --background '{}'", cli.background))?;

    // ── Build config ─────────────────────────────────────────────────────
    let spinner = if show_progress {
        Some(CliProgressCallback::new())
    } else {
        None
    };
    let progress_cb = spinner
        .as_ref()
        .map(|cb| Arc::clone(cb) as ProgressCallback);

    let config = build_config(&cli, progress_cb)?;
    let request = EditRequest::new(input).background(background).cartoon(cli.cartoon);

    // ── Run edit ─────────────────────────────────────────────────────────
    let result = edit_to_file(&request, &cli.output, &config).await;
    if let Some(ref cb) = spinner {
        cb.finish();
    }
    let output = result.context("Edit failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if !cli.quiet {
        let written = output
            .output_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| cli.output.display().to_string());
        eprintln!(
            "{}  {} remote calls  {}ms  →  {}",
            green("✔"),
            output.stats.remote_calls,
            output.stats.total_duration_ms,
            bold(&written),
        );
        eprintln!(
            "   {} {}  {}",
            cyan("◆"),
            output.background.kind(),
            dim(&format!(
                "{} bytes, {}{}",
                output.size_bytes,
                output.media_type,
                if output.cartoon { ", cartoon" } else { "" }
            )),
        );
    }

    Ok(())
}

/// Map CLI args to `StudioConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<StudioConfig> {
    let mut builder = StudioConfig::builder()
        .model(cli.model.clone())
        .base_url(cli.base_url.clone())
        .download_timeout_secs(cli.download_timeout);

    if let Some(secs) = cli.api_timeout {
        builder = builder.api_timeout_secs(secs);
    }
    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
