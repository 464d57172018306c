use std::fs;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser as ClapParser;
use colored::Colorize;
use tracing::info;

mod cli;

use cli::Args;
use forumquery::corpus::{tokenize, ArchiveReader, MonthRange, ReaderOptions};
use forumquery::diagnostics::{Diagnostic, DiagnosticSink};
use forumquery::{
    BuildOptions, EngineError, InvertedIndex, QueryEngine, QueryParams, SqliteStore,
};

const STORE_FILE: &str = "index.db";
const SIDECAR_FILE: &str = "index.meta.json";
const ARCHIVE_SUBDIR: &str = "monthly_data";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let index = match args.mode {
        1 | 3 => Some(build_index(&args)?),
        2 => Some(open_index(&args.dir)?),
        _ => unreachable!("clap bounds the mode"),
    };

    if matches!(args.mode, 2 | 3) {
        let index = index.expect("index is present for query modes");
        query_loop(&index, &args)?;
    }

    Ok(())
}

fn store_path(dir: &Path) -> PathBuf {
    dir.join(STORE_FILE)
}

fn sidecar_path(dir: &Path) -> PathBuf {
    dir.join(SIDECAR_FILE)
}

/// Build a fresh index from the monthly archives in the working directory
/// and persist the sidecar next to the store.
fn build_index(args: &Args) -> Result<InvertedIndex<SqliteStore>, EngineError> {
    let (start, end) = match (&args.start, &args.end) {
        (Some(start), Some(end)) => (start.as_str(), end.as_str()),
        _ => {
            return Err(EngineError::Config(
                "start and end month must be specified when building the index".into(),
            ))
        }
    };
    let range = MonthRange::parse(start, end)?;
    fs::create_dir_all(&args.dir).map_err(|e| EngineError::io(&args.dir, e))?;

    let reader = ArchiveReader::discover(
        &args.dir.join(ARCHIVE_SUBDIR),
        range,
        ReaderOptions {
            lemmatize: args.lemma,
            store_fulltext: args.fulltext,
            cores: args.cores,
            report_progress: args.progress,
        },
    )?;

    let store = SqliteStore::create(&store_path(&args.dir))?;
    let index = InvertedIndex::build(
        store,
        reader,
        BuildOptions {
            frequency_threshold: args.minfreq,
        },
    )?;
    index.write_sidecar(&sidecar_path(&args.dir))?;
    if args.progress {
        eprintln!();
    }
    info!(dir = %args.dir.display(), "index built");
    Ok(index)
}

/// Reopen a previously built index for querying.
fn open_index(dir: &Path) -> Result<InvertedIndex<SqliteStore>, EngineError> {
    let store = SqliteStore::open(&store_path(dir))?;
    InvertedIndex::open(store, &sidecar_path(dir))
}

/// Read queries from stdin, one per line, and print ranked results.
fn query_loop(index: &InvertedIndex<SqliteStore>, args: &Args) -> Result<(), EngineError> {
    let engine = QueryEngine::new(index);
    let sink = ConsoleSink;
    let params = QueryParams {
        top_k: args.num,
        conjunctive: args.conjunctive,
        want_fulltext: args.fulltext,
    };

    for line in io::stdin().lock().lines() {
        let line = line.map_err(|e| EngineError::io("stdin", e))?;
        let tokens = tokenize(&line, args.lemma);
        let hits = engine.query(&tokens, params, &sink)?;
        for hit in &hits {
            println!(
                "{} ({:.3}): {}",
                hit.doc_id,
                hit.similarity,
                hit.document_name.cyan()
            );
            if let Some(text) = &hit.fulltext {
                println!("{}\n", text.trim());
            }
        }
        println!();
    }
    Ok(())
}

/// Renders query diagnostics on the terminal: idf records go to stdout
/// with the results, warnings go to stderr.
struct ConsoleSink;

impl DiagnosticSink for ConsoleSink {
    fn emit(&self, diagnostic: Diagnostic) {
        match diagnostic {
            Diagnostic::TermIdf { term, idf } => println!("idf({term}): {idf:.2}"),
            Diagnostic::UnknownTerm { term } => {
                eprintln!("{} \"{term}\" is not in the index", "warning:".yellow())
            }
            Diagnostic::EmptyQuery => eprintln!("{} empty query", "warning:".yellow()),
            Diagnostic::QueryCarriesNoInformation => eprintln!(
                "{} query carries no information (every term has zero idf)",
                "warning:".yellow()
            ),
            Diagnostic::EmptyResultSet => println!("no matching documents"),
        }
    }
}
