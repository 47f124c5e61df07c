use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use docchat_chat::{build_session, read_uploads, ProcessingReport, Reply, Session, SkippedFile, Upload};
use docchat_core::config::{expand_path, Config, Settings};
use docchat_core::types::FileType;
use docchat_core::Error;

#[derive(Parser, Debug)]
#[command(name = "docchat", about = "Chat with your PDF, DOCX and TXT documents")]
struct Cli {
    /// Index path prefix (defaults to `data.index_path`)
    #[arg(long, global = true, env = "DOCCHAT_INDEX")]
    index: Option<String>,

    /// Number of chunks retrieved per question
    #[arg(long, global = true)]
    top_k: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract, chunk and embed files (or directories), replacing the saved index
    Ingest {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Ask one question against the saved index
    Ask { question: String },
    /// Suggest questions about the indexed documents
    Suggest,
    /// Summarize a single document without indexing it
    Summarize { file: PathBuf },
    /// Show index statistics
    Stats,
    /// Interactive chat; optionally ingest files first
    Chat { paths: Vec<PathBuf> },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {}", e);
        e
    })?;
    let mut settings = config.settings()?;
    if let Some(k) = cli.top_k {
        settings.retrieval.top_k = k.max(1);
    }
    let index = cli.index.as_deref().map(expand_path).unwrap_or_else(|| settings.index_path());

    match cli.command {
        Command::Ingest { paths } => {
            let mut session = build_session(&settings)?;
            ingest(&mut session, &paths, &index)?;
        }
        Command::Ask { question } => {
            let mut session = open_session(&settings, &index)?;
            print_reply(&session.ask(&question));
        }
        Command::Suggest => {
            let mut session = open_session(&settings, &index)?;
            print_questions(session.suggest_questions());
        }
        Command::Summarize { file } => {
            let session = build_session(&settings)?;
            let upload = Upload::from_path(&file).with_context(|| format!("failed to read {}", file.display()))?;
            println!("📄 Summary of {}\n", upload.name);
            println!("{}", session.summarize(&upload)?);
        }
        Command::Stats => stats(&settings, &index)?,
        Command::Chat { paths } => {
            let mut session = build_session(&settings)?;
            if paths.is_empty() {
                match session.load_index(&index) {
                    Ok(()) => println!("📚 Loaded {} chunks from {}", session.stats().total_chunks, index.display()),
                    Err(Error::NotFound(_)) => println!("💡 No saved index yet. Use /load <path> to add documents."),
                    Err(e) => return Err(e.into()),
                }
            } else {
                ingest(&mut session, &paths, &index)?;
            }
            repl(&mut session, &index)?;
        }
    }
    Ok(())
}

/// Load the saved index into a fresh session.
fn open_session(settings: &Settings, index: &Path) -> Result<Session> {
    let mut session = build_session(settings)?;
    session
        .load_index(index)
        .with_context(|| format!("no usable index at {}; run `docchat ingest <files>` first", index.display()))?;
    Ok(session)
}

fn ingest(session: &mut Session, paths: &[PathBuf], index: &Path) -> Result<()> {
    let files = collect_files(paths);
    println!("🔄 Processing {} file(s)...", files.len());
    let (uploads, unreadable) = read_uploads(&files);

    match session.process_documents(&uploads) {
        Ok(mut report) => {
            report.skipped.extend(unreadable);
            print_report(&report);
            session.save_index(index)?;
            println!("💾 Saved index to {}", index.display());
            Ok(())
        }
        Err(Error::NoContent) => {
            print_skipped(&unreadable);
            println!("⚠️  No content could be extracted from the uploaded files.");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Expand directories into the supported files below them. Explicit file
/// arguments are kept as given so unsupported ones show up in the report.
fn collect_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(path)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .map(|e| e.into_path())
                .filter(|p| {
                    p.file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| FileType::from_file_name(n).is_ok())
                })
                .collect();
            found.sort();
            files.extend(found);
        } else {
            files.push(path.clone());
        }
    }
    files
}

fn print_report(report: &ProcessingReport) {
    for file in &report.processed {
        println!("  ✅ {}: {} chunks, {} characters", file.file, file.chunks, file.characters);
    }
    print_skipped(&report.skipped);
    for warning in &report.warnings {
        println!("  ⚠️  {}", warning);
    }
    println!("✅ Processed {} document(s) into {} chunks", report.processed.len(), report.total_chunks);
}

fn print_skipped(skipped: &[SkippedFile]) {
    for file in skipped {
        println!("  ⏭️  {}: {}", file.file, file.reason);
    }
}

fn print_reply(reply: &Reply) {
    println!("\n🤖 {}\n", reply.turn.content);
    if !reply.previews.is_empty() {
        println!("📚 Sources:");
        for (i, source) in reply.previews.iter().enumerate() {
            println!("  {}. {}", i + 1, source.label);
            println!("     📝 {}", source.preview.replace('\n', " "));
        }
    }
}

fn print_questions(questions: &[String]) {
    if questions.is_empty() {
        println!("💡 No suggestions available.");
        return;
    }
    println!("💡 Suggested questions:");
    for (i, q) in questions.iter().enumerate() {
        println!("  {}. {}", i + 1, q);
    }
}

fn stats(settings: &Settings, index: &Path) -> Result<()> {
    let gateway = docchat_embed::get_default_gateway(settings)?;
    let model = gateway.model_id().to_string();
    let mut store = docchat_vector::VectorStore::new(gateway);
    store.restore(index).with_context(|| format!("no usable index at {}", index.display()))?;
    let stats = store.stats();
    println!("📊 Index {}", index.display());
    println!("  Total chunks: {}", stats.total_chunks);
    println!("  Index size:   {}", stats.index_size);
    println!("  Dimension:    {}", stats.dimension);
    println!("  Embeddings:   {}", model);
    Ok(())
}

const REPL_HELP: &str = "Commands: /load <paths...>  /suggest  /stats  /clear  /help  /quit";

fn repl(session: &mut Session, index: &Path) -> Result<()> {
    println!("💬 Ask about your documents. {}", REPL_HELP);
    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut words = line.split_whitespace();
        match words.next() {
            Some("/quit") | Some("/exit") => break,
            Some("/help") => println!("{}", REPL_HELP),
            Some("/clear") => {
                session.reset();
                println!("🗑️  Cleared documents and chat history.");
            }
            Some("/stats") => {
                let a = session.analytics();
                println!(
                    "📊 {} messages, {} questions, {} searchable chunks, {} characters processed",
                    a.total_messages, a.questions_asked, a.searchable_chunks, a.total_characters
                );
            }
            Some("/suggest") => {
                if !session.has_documents() {
                    println!("💡 Process some documents first.");
                } else {
                    print_questions(session.suggest_questions());
                }
            }
            Some("/load") => {
                let paths: Vec<PathBuf> = words.map(PathBuf::from).collect();
                if paths.is_empty() {
                    println!("Usage: /load <paths...>");
                } else if let Err(e) = ingest(session, &paths, index) {
                    eprintln!("❌ {:#}", e);
                }
            }
            _ => print_reply(&session.ask(line)),
        }
    }
    Ok(())
}
