use clap::Parser;
use color_eyre::Result;
use std::io::{self, BufRead, Write};
use std::path::Path;
use tracing_subscriber::EnvFilter;

use askdata::cli::{self, Args};
use askdata::{
    CacheManager, CompletionClient, ConfigManager, QueryOutcome, Session, APP_NAME,
    DEFAULT_CHART_SIZE,
};

fn handle_early_exit_flags(args: &Args) -> Result<Option<()>> {
    if args.clear_history {
        match CacheManager::new(APP_NAME) {
            Ok(cache) => {
                if let Err(e) = cache.clear_all() {
                    eprintln!("Error clearing history: {}", e);
                    std::process::exit(1);
                }
                println!("History cleared successfully");
                return Ok(Some(()));
            }
            Err(_e) => {
                println!("No history to clear");
                return Ok(Some(()));
            }
        }
    }

    Ok(None)
}

fn init_tracing(debug: bool) {
    let default_filter = if debug { "askdata=debug" } else { "askdata=warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// The generic message shown when the model pipeline fails. Dataset load
/// errors are reported directly and never collapsed into this.
fn report_failure(err: &color_eyre::Report, debug: bool) {
    println!("Sorry, the model response resulted in an error. Try rephrasing your question.");
    if debug {
        eprintln!("Error: {:?}", err);
    }
}

fn answer_question(session: &Session, client: &CompletionClient, question: &str) -> Result<()> {
    let answer = session.ask(client, question)?;
    match answer.outcome {
        QueryOutcome::Scalar(text) => println!("{}", text),
        QueryOutcome::Table(df) => println!("{}", df),
    }
    Ok(())
}

fn answer_chart(
    session: &Session,
    client: &CompletionClient,
    request: &str,
    output: &Path,
) -> Result<()> {
    session.chart(client, request, output, DEFAULT_CHART_SIZE)?;
    println!("Chart written to {}", output.display());
    Ok(())
}

fn record_question(cache: &CacheManager, question: &str) {
    if let Err(e) = cache.append_question(question) {
        eprintln!("Warning: Could not save question history: {}", e);
    }
}

fn run_once(
    session: &Session,
    client: &CompletionClient,
    cache: &CacheManager,
    args: &Args,
    question: &str,
) -> bool {
    let result = if args.chart {
        answer_chart(session, client, question, &args.chart_output)
    } else {
        answer_question(session, client, question)
    };
    match result {
        Ok(()) => {
            record_question(cache, question);
            true
        }
        Err(e) => {
            report_failure(&e, args.debug);
            false
        }
    }
}

fn run_repl(
    session: &Session,
    client: &CompletionClient,
    cache: &CacheManager,
    args: &Args,
) -> Result<()> {
    println!("Columns: {}", session.columns_description());
    println!("Ask a question, :chart <request> for a chart, :quit to exit.");

    let stdin = io::stdin();
    loop {
        print!("ask> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == ":quit" || line == ":exit" {
            break;
        }

        let (question, chart) = match line.strip_prefix(":chart") {
            Some(rest) => (rest.trim(), true),
            None => (line, false),
        };
        if question.is_empty() {
            println!("Usage: :chart <request>");
            continue;
        }

        let result = if chart {
            answer_chart(session, client, question, &args.chart_output)
        } else {
            answer_question(session, client, question)
        };
        match result {
            Ok(()) => record_question(cache, question),
            Err(e) => report_failure(&e, args.debug),
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(()) = handle_early_exit_flags(&args)? {
        return Ok(());
    }

    color_eyre::install()?;
    init_tracing(args.debug);

    let config = ConfigManager::new(APP_NAME)?.load()?;
    let client = CompletionClient::from_config(&config.llm)?;

    let load_options = cli::load_options(&args, &config.file_loading)?;
    let session = Session::open(&args.path, &load_options)?;

    let cache = CacheManager::new(APP_NAME)?;
    match &args.question {
        Some(question) => {
            if !run_once(&session, &client, &cache, &args, question) {
                std::process::exit(1);
            }
        }
        None => run_repl(&session, &client, &cache, &args)?,
    }
    Ok(())
}
