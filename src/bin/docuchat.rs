//! CLI binary for docuchat.
//!
//! A thin shim over the library crate: loads a document (PDF path, PDF URL or
//! a JSON page map), maps CLI flags to `PipelineConfig` and prints the answer.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docuchat::{
    ChatAnswer, ChatTurn, DocumentContent, OverflowPolicy, PageContent, PageOrder, Pipeline,
    PipelineConfig, PipelineOutput,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::Path;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Ask about a local PDF
  docuchat ask report.pdf "What year was the plant opened?"

  # Ask about an uploaded PDF
  docuchat ask https://example.com/files/report.pdf "Summarize the findings"

  # Ask about already-extracted pages ({"1": "...", "2": {"sections": [...]}})
  docuchat ask pages.json "Who signed the contract?"

  # JSON response body, as a chat endpoint would return it
  docuchat --json ask report.pdf "What is the total cost?"

  # Continue a conversation
  docuchat ask report.pdf "And the year after?" --history turns.json

  # Show extracted page sizes (no API key needed)
  docuchat inspect report.pdf

INPUT FORMATS:
  *.json        Page map: page key → text, or {"sections": [{"title", "content"}]}
  *.pdf, URL    Text is extracted with pdfium, falling back to pdf-extract

ENVIRONMENT VARIABLES:
  OPENROUTER_API_KEY      Model credential for the default provider
                          (OPENAI_API_KEY, ANTHROPIC_API_KEY, ... for others)
  DOCUCHAT_API_KEY_ENV    Read the credential from a different variable
  EDGEQUAKE_PROVIDER      Override provider (openrouter, openai, anthropic, ...)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to libpdfium; otherwise the system copy is used
  RUST_LOG                Log filter; overrides --verbose / --quiet
"#;

/// Ask questions about PDF documents with an LLM.
#[derive(Parser, Debug)]
#[command(
    name = "docuchat",
    version,
    about = "Ask questions about PDF documents with an LLM",
    long_about = "Answer natural-language questions about a PDF document. The document text is \
trimmed to a character budget, the question is classified as analytical or factual, and a \
single model call produces the answer. Failures are reported as readable answers.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// LLM model ID (e.g. openai/gpt-4o-mini).
    #[arg(long, global = true, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openrouter, openai, anthropic, gemini, ollama.
    #[arg(long, global = true, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Environment variable holding the model credential
    /// [default: the provider's own, e.g. OPENROUTER_API_KEY].
    #[arg(long, global = true, env = "DOCUCHAT_API_KEY_ENV")]
    api_key_env: Option<String>,

    /// Character budget for the document context.
    #[arg(long, global = true, env = "DOCUCHAT_MAX_CONTEXT_CHARS", default_value_t = 8000,
          value_parser = clap::value_parser!(u64).range(1..))]
    max_context_chars: u64,

    /// What to do when a chunk does not fit: stop-all or skip-page.
    #[arg(long, global = true, env = "DOCUCHAT_OVERFLOW_POLICY", value_enum, default_value = "stop-all")]
    overflow_policy: OverflowArg,

    /// Page visiting order: numeric or as-given.
    #[arg(long, global = true, env = "DOCUCHAT_PAGE_ORDER", value_enum, default_value = "numeric")]
    page_order: PageOrderArg,

    /// LLM temperature (0.0–2.0).
    #[arg(long, global = true, env = "DOCUCHAT_TEMPERATURE", default_value_t = 0.2)]
    temperature: f32,

    /// Max LLM output tokens.
    #[arg(long, global = true, env = "DOCUCHAT_MAX_TOKENS")]
    max_tokens: Option<usize>,

    /// LLM call timeout in seconds.
    #[arg(long, global = true, env = "DOCUCHAT_API_TIMEOUT")]
    api_timeout: Option<u64>,

    /// HTTP download timeout in seconds.
    #[arg(long, global = true, env = "DOCUCHAT_DOWNLOAD_TIMEOUT", default_value_t = 30)]
    download_timeout: u64,

    /// Output JSON instead of plain text.
    #[arg(long, global = true, env = "DOCUCHAT_JSON")]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "DOCUCHAT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except the answer and errors.
    #[arg(short, long, global = true, env = "DOCUCHAT_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Answer a question about a document.
    Ask {
        /// PDF file path, HTTP/HTTPS URL, or a .json page map.
        input: String,

        /// The question to answer.
        question: String,

        /// JSON file with prior turns: [{"role": "user", "content": "..."}].
        #[arg(long)]
        history: Option<String>,
    },

    /// Print page count and per-page text size without calling the model.
    Inspect {
        /// PDF file path, HTTP/HTTPS URL, or a .json page map.
        input: String,
    },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum OverflowArg {
    StopAll,
    SkipPage,
}

impl From<OverflowArg> for OverflowPolicy {
    fn from(v: OverflowArg) -> Self {
        match v {
            OverflowArg::StopAll => OverflowPolicy::StopAll,
            OverflowArg::SkipPage => OverflowPolicy::SkipPage,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum PageOrderArg {
    Numeric,
    AsGiven,
}

impl From<PageOrderArg> for PageOrder {
    fn from(v: PageOrderArg) -> Self {
        match v {
            PageOrderArg::Numeric => PageOrder::Numeric,
            PageOrderArg::AsGiven => PageOrder::AsGiven,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner already tells the user something is happening, so library
    // INFO logs are suppressed while it is shown.
    let show_spinner = !cli.quiet && !cli.json && matches!(cli.command, Command::Ask { .. });
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_spinner {
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

    let config = build_config(&cli)?;
    debug!("Configuration: {:?}", config);

    match &cli.command {
        Command::Inspect { input } => {
            let document = load_document(input, &config).await?;
            print_inspection(input, &document, cli.json)?;
        }
        Command::Ask {
            input,
            question,
            history,
        } => {
            let history = match history {
                Some(path) => load_history(path).await?,
                None => Vec::new(),
            };
            let document = load_document(input, &config).await?;

            let spinner = show_spinner.then(new_spinner);
            let result = Pipeline::new(config)
                .run(document, question.as_str(), history)
                .await;
            if let Some(bar) = spinner {
                bar.finish_and_clear();
            }

            // An engine failure still produces an answer for the caller.
            let (reply, output) = match result {
                Ok(output) => (ChatAnswer::new(output.answer.clone()), Some(output)),
                Err(e) => (ChatAnswer::new(format!("AI error: {e}")), None),
            };

            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&reply).context("Failed to serialise answer")?
                );
            } else {
                println!("{}", reply.answer);
            }

            if let (Some(output), false) = (output, cli.quiet || cli.json) {
                print_summary(&output);
            }
        }
    }

    Ok(())
}

/// Map CLI args to `PipelineConfig`.
fn build_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut builder = PipelineConfig::builder()
        .max_context_chars(cli.max_context_chars as usize)
        .overflow_policy(cli.overflow_policy.into())
        .page_order(cli.page_order.into())
        .temperature(cli.temperature)
        .download_timeout_secs(cli.download_timeout)
        .api_key_from_env();

    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.as_str());
    }
    if let Some(ref var) = cli.api_key_env {
        builder = builder.api_key_env(var.as_str());
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model.as_str());
    }
    if let Some(n) = cli.max_tokens {
        builder = builder.max_tokens(n);
    }
    if let Some(secs) = cli.api_timeout {
        builder = builder.api_timeout_secs(secs);
    }

    builder.build().context("Invalid configuration")
}

fn is_json_input(input: &str) -> bool {
    Path::new(input)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Load a `.json` page map directly, or extract text from a PDF.
async fn load_document(input: &str, config: &PipelineConfig) -> Result<DocumentContent> {
    if is_json_input(input) {
        let raw = tokio::fs::read_to_string(input)
            .await
            .with_context(|| format!("Failed to read document from {input:?}"))?;
        return DocumentContent::from_json_str(&raw)
            .with_context(|| format!("Failed to parse document JSON in {input:?}"));
    }

    extract_pdf(input, config).await
}

#[cfg(feature = "pdf")]
async fn extract_pdf(input: &str, config: &PipelineConfig) -> Result<DocumentContent> {
    match docuchat::extract_document(input, config).await {
        Ok(extracted) => {
            debug!(
                "Extracted {} pages with {:?}",
                extracted.page_count, extracted.parser
            );
            Ok(extracted.content)
        }
        Err(e) => anyhow::bail!("PDF parsing failed: {e}"),
    }
}

#[cfg(not(feature = "pdf"))]
async fn extract_pdf(input: &str, _config: &PipelineConfig) -> Result<DocumentContent> {
    anyhow::bail!(
        "PDF parsing failed: '{input}' is not a .json page map and this build has no PDF support \
         (rebuild with --features pdf)"
    )
}

async fn load_history(path: &str) -> Result<Vec<ChatTurn>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read history from {path:?}"))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid history JSON in {path:?}"))
}

fn new_spinner() -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
    );
    bar.set_prefix("Thinking");
    bar.set_message("asking the model…");
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

/// Characters of readable text on one page; `None` for a malformed page.
fn page_chars(content: &PageContent) -> Option<usize> {
    match content {
        PageContent::Text(text) => Some(text.chars().count()),
        PageContent::Structured(page) => Some(
            page.sections
                .iter()
                .map(|s| s.content.chars().count())
                .sum(),
        ),
        PageContent::Malformed(_) => None,
    }
}

fn print_inspection(input: &str, document: &DocumentContent, json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(document).context("Failed to serialise document")?
        );
        return Ok(());
    }

    println!("Input:   {}", input);
    println!("Pages:   {}", document.len());
    let mut empty = 0usize;
    for (page, content) in document.ordered(PageOrder::Numeric) {
        match page_chars(content) {
            Some(0) => {
                empty += 1;
                println!("  Page {:>4}  {}", page, yellow("no text"));
            }
            Some(n) => println!("  Page {:>4}  {}", page, dim(&format!("{n:>6} chars"))),
            None => println!("  Page {:>4}  {}", page, yellow("malformed, ignored")),
        }
    }
    if empty > 0 && empty == document.len() {
        println!(
            "{}",
            yellow("No readable text found; the PDF is probably scanned and needs OCR.")
        );
    }
    Ok(())
}

fn print_summary(output: &PipelineOutput) {
    let stats = &output.stats;
    let mark = if output.is_model_answer() {
        green("✔")
    } else {
        yellow("⚠")
    };
    eprintln!(
        "{}  context {} chars in {} chunks{}  {}ms",
        mark,
        bold(&stats.context_chars.to_string()),
        stats.context_chunks,
        if stats.context_truncated {
            " (truncated)"
        } else {
            ""
        },
        stats.total_duration_ms,
    );
    if output.is_model_answer() {
        eprintln!(
            "   {} tokens in  /  {} tokens out",
            dim(&stats.prompt_tokens.to_string()),
            dim(&stats.completion_tokens.to_string()),
        );
    }
}
