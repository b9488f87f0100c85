//! Pageclean CLI - extract and clean web page content

mod server;

use clap::{Parser, Subcommand, ValueEnum};
use pageclean::export::page_file_name;
use pageclean::{
    write_export, ExplorationMode, ExtractReport, ExtractRequest, Extractor, ExtractorBuilder,
    Settings, SourceKind, DEFAULT_MAX_PAGES,
};
use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Output format for extract subcommand
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum OutputFormat {
    /// Markdown with YAML frontmatter
    #[default]
    Md,
    /// JSON report
    Json,
}

/// Pageclean - web page extraction with AI-powered cleanup
#[derive(Parser, Debug)]
#[command(name = "pageclean")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract and clean a page (and optionally its linked pages)
    Extract {
        /// URL to extract (https:// is assumed when no scheme is given)
        url: String,

        /// Exploration mode: single, linked or menu
        #[arg(long, short, default_value = "single")]
        mode: ExplorationMode,

        /// Maximum number of extra pages to explore (1-10)
        #[arg(long, default_value_t = DEFAULT_MAX_PAGES)]
        max_pages: usize,

        /// Page source: direct or browser
        #[arg(long, short, default_value = "direct")]
        source: SourceKind,

        /// Output format
        #[arg(long, short, default_value = "md")]
        output: OutputFormat,

        /// Also write each page to a text file in this directory
        #[arg(long)]
        save: Option<PathBuf>,

        /// Custom User-Agent for direct fetches
        #[arg(long)]
        user_agent: Option<String>,
    },
    /// Serve the browser UI
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1:8501")]
        addr: SocketAddr,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing();
    let settings = Settings::load();

    match cli.command {
        Some(Commands::Extract {
            url,
            mode,
            max_pages,
            source,
            output,
            save,
            user_agent,
        }) => {
            let mut builder = ExtractorBuilder::from_settings(&settings).source(source);
            if let Some(ua) = user_agent {
                builder = builder.user_agent(ua);
            }
            let request = ExtractRequest::new(url).mode(mode).max_pages(max_pages);
            run_extract(builder.build(), request, output, save.as_deref()).await;
        }
        Some(Commands::Serve { addr }) => {
            let direct = ExtractorBuilder::from_settings(&settings).build();
            let browser = ExtractorBuilder::from_settings(&settings)
                .source(SourceKind::Browser)
                .build();
            if let Err(e) = server::serve(addr, server::AppState::new(direct, browser)).await {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        None => {
            eprintln!("Usage: pageclean extract <URL>");
            eprintln!("   or: pageclean serve");
            eprintln!("   or: pageclean --help");
            std::process::exit(1);
        }
    }
}

/// Log to stderr, filtered by `RUST_LOG` (default `pageclean=info`)
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("pageclean=info,pageclean_cli=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn run_extract(
    extractor: Extractor,
    request: ExtractRequest,
    output: OutputFormat,
    save: Option<&Path>,
) {
    let result = extractor
        .run_with_progress(request, |progress| {
            tracing::debug!(
                phase = progress.phase.as_str(),
                percent = progress.percent_complete,
                "{}",
                progress.message.as_deref().unwrap_or_default()
            );
        })
        .await;

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if report.rate_limited {
        eprintln!("Warning: API rate limit reached. Please wait a few minutes and try again.");
    }

    if let Some(dir) = save {
        save_report(&report, dir);
    }

    match output {
        OutputFormat::Md => writeln_safe(&format_md_with_frontmatter(&report)),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&report).unwrap_or_else(|e| {
                eprintln!("Error serializing report: {}", e);
                std::process::exit(1);
            });
            writeln_safe(&json);
        }
    }
}

fn save_report(report: &ExtractReport, dir: &Path) {
    let now = chrono::Local::now();
    for page in &report.pages {
        let name = page_file_name(report, &page.label, &now);
        match write_export(dir, &name, &page.text()) {
            Ok(path) => eprintln!("Saved {}", path.display()),
            Err(e) => {
                eprintln!("Error writing {}: {}", dir.join(&name).display(), e);
                std::process::exit(1);
            }
        }
    }
}

/// Format a report as markdown with YAML frontmatter, one section per page
fn format_md_with_frontmatter(report: &ExtractReport) -> String {
    let mut output = String::new();

    output.push_str("---\n");
    output.push_str(&format!("url: {}\n", report.url));
    output.push_str(&format!("mode: {}\n", report.mode));
    output.push_str(&format!("pages: {}\n", report.pages.len()));
    if report.rate_limited {
        output.push_str("rate_limited: true\n");
    }
    for notice in &report.notices {
        output.push_str(&format!("notice: {}\n", notice));
    }
    output.push_str("---\n");

    // Single-page reports print the text alone
    if let [page] = report.pages.as_slice() {
        output.push_str(&page.text());
        return output;
    }

    for (index, page) in report.pages.iter().enumerate() {
        if index > 0 {
            output.push('\n');
        }
        output.push_str(&format!("\n## {}\n\n", page.label));
        output.push_str(&format!("<{}>\n\n", page.url));
        output.push_str(&page.text());
        output.push('\n');
    }

    output
}

/// Write to stdout, exit silently on broken pipe
fn writeln_safe(s: &str) {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = writeln!(handle, "{}", s) {
        if e.kind() == io::ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
        eprintln!("Error writing to stdout: {}", e);
        std::process::exit(1);
    }
}
