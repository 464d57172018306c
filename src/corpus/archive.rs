//! Streaming reader over monthly comment archives.
//!
//! Discovers line-delimited JSON archive files for the requested month
//! range, parses and tokenizes them chunk by chunk, and yields one
//! [`DocumentRecord`] per comment in file order. Files larger than RAM are
//! fine: at most one chunk of lines is resident at a time.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use rayon::prelude::*;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::corpus::period::{Month, MonthRange};
use crate::corpus::tokenization::tokenize;
use crate::errors::{EngineError, Result};
use crate::models::DocumentRecord;

/// Lines parsed and tokenized per refill; bounds producer memory.
const CHUNK_LINES: usize = 1024;

const PROGRESS_EVERY: u64 = 10_000;

#[derive(Debug, Clone, Copy)]
pub struct ReaderOptions {
    /// Stem tokens (the `--lemma` switch).
    pub lemmatize: bool,
    /// Carry the raw comment body into the index.
    pub store_fulltext: bool,
    /// Worker threads for parsing/tokenization (the `--cores` switch).
    pub cores: usize,
    /// Report streaming progress on stderr.
    pub report_progress: bool,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            lemmatize: false,
            store_fulltext: false,
            cores: 1,
            report_progress: false,
        }
    }
}

/// On-disk comment line. Only the id and body are consumed; the archive
/// carries many more fields.
#[derive(Deserialize)]
struct RawComment {
    id: String,
    body: String,
}

#[derive(Debug)]
pub struct ArchiveReader {
    /// Remaining files, reversed so the next one pops off the back.
    files: Vec<PathBuf>,
    current: Option<(PathBuf, BufReader<File>)>,
    queue: VecDeque<DocumentRecord>,
    pool: Option<rayon::ThreadPool>,
    options: ReaderOptions,
    streamed: u64,
}

impl ArchiveReader {
    /// Discover archive files for `range` under `dir`.
    ///
    /// A file participates when its extension is `json`/`jsonl` and its
    /// stem carries a `YYYY-MM` tag inside the range. Files stream in
    /// month order.
    pub fn discover(dir: &Path, range: MonthRange, options: ReaderOptions) -> Result<Self> {
        if !dir.is_dir() {
            return Err(EngineError::Config(format!(
                "archive directory does not exist: {}",
                dir.display()
            )));
        }

        let mut tagged: Vec<(Month, PathBuf)> = Vec::new();
        for entry in WalkBuilder::new(dir).standard_filters(false).build() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(error = %err, "skipping unreadable directory entry");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let path = entry.path();
            if !matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("json") | Some("jsonl")
            ) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if let Some(month) = Month::from_file_stem(stem) {
                if range.contains(month) {
                    tagged.push((month, path.to_path_buf()));
                }
            }
        }
        if tagged.is_empty() {
            warn!(
                dir = %dir.display(),
                "no archive files found for {} .. {}", range.first, range.last
            );
        }
        tagged.sort();
        tagged.reverse();
        let files = tagged.into_iter().map(|(_, path)| path).collect();

        let pool = if options.cores > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(options.cores)
                .build()
                .map_err(|e| EngineError::Config(format!("cannot start worker pool: {e}")))?;
            Some(pool)
        } else {
            None
        };

        Ok(Self {
            files,
            current: None,
            queue: VecDeque::new(),
            pool,
            options,
            streamed: 0,
        })
    }

    fn exhausted(&self) -> bool {
        self.current.is_none() && self.files.is_empty()
    }

    /// Read and tokenize the next chunk of lines into the queue.
    fn refill(&mut self) -> Result<()> {
        let mut lines: Vec<String> = Vec::with_capacity(CHUNK_LINES);
        while lines.len() < CHUNK_LINES {
            match &mut self.current {
                Some((path, reader)) => {
                    let mut line = String::new();
                    match reader.read_line(&mut line) {
                        Ok(0) => self.current = None,
                        Ok(_) => {
                            if !line.trim().is_empty() {
                                lines.push(line);
                            }
                        }
                        Err(err) => return Err(EngineError::io(path.clone(), err)),
                    }
                }
                None => match self.files.pop() {
                    Some(path) => {
                        debug!(file = %path.display(), "streaming archive");
                        if self.options.report_progress {
                            eprintln!("Reading {}", path.display());
                        }
                        let file =
                            File::open(&path).map_err(|err| EngineError::io(path.clone(), err))?;
                        self.current = Some((path, BufReader::new(file)));
                    }
                    None => break,
                },
            }
        }

        let lemmatize = self.options.lemmatize;
        let store_fulltext = self.options.store_fulltext;
        let parse = |line: &String| parse_comment(line, lemmatize, store_fulltext);
        let records: Vec<Option<DocumentRecord>> = match &self.pool {
            Some(pool) => pool.install(|| lines.par_iter().map(parse).collect()),
            None => lines.iter().map(parse).collect(),
        };
        for record in records.into_iter().flatten() {
            self.streamed += 1;
            if self.options.report_progress && self.streamed % PROGRESS_EVERY == 0 {
                eprint!("\rStreamed {} comments", self.streamed);
            }
            self.queue.push_back(record);
        }
        Ok(())
    }
}

impl Iterator for ArchiveReader {
    type Item = Result<DocumentRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.queue.is_empty() && !self.exhausted() {
            if let Err(err) = self.refill() {
                return Some(Err(err));
            }
        }
        self.queue.pop_front().map(Ok)
    }
}

fn parse_comment(line: &str, lemmatize: bool, store_fulltext: bool) -> Option<DocumentRecord> {
    match serde_json::from_str::<RawComment>(line) {
        Ok(comment) => {
            let tokens = tokenize(&comment.body, lemmatize);
            let fulltext = store_fulltext.then(|| comment.body);
            Some(DocumentRecord {
                name: comment.id,
                tokens,
                fulltext,
            })
        }
        Err(err) => {
            warn!(error = %err, "skipping malformed archive line");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_archive(dir: &Path, name: &str, lines: &[&str]) {
        let mut file = File::create(dir.join(name)).unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
    }

    #[test]
    fn streams_records_in_month_then_line_order() {
        let dir = tempfile::tempdir().unwrap();
        write_archive(
            dir.path(),
            "RC_2007-11.json",
            &[r#"{"id":"c3","body":"Third comment"}"#],
        );
        write_archive(
            dir.path(),
            "RC_2007-10.json",
            &[
                r#"{"id":"c1","body":"First comment, here."}"#,
                r#"{"id":"c2","body":"Second!"}"#,
            ],
        );

        let range = MonthRange::parse("2007/10", "2007/11").unwrap();
        let reader =
            ArchiveReader::discover(dir.path(), range, ReaderOptions::default()).unwrap();
        let records: Vec<DocumentRecord> = reader.map(|r| r.unwrap()).collect();

        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["c1", "c2", "c3"]);
        assert_eq!(records[0].tokens, vec!["first", "comment", "here"]);
        assert_eq!(records[0].fulltext, None);
    }

    #[test]
    fn out_of_range_and_untagged_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        write_archive(
            dir.path(),
            "RC_2007-10.json",
            &[r#"{"id":"keep","body":"kept"}"#],
        );
        write_archive(
            dir.path(),
            "RC_2009-01.json",
            &[r#"{"id":"skip","body":"skipped"}"#],
        );
        write_archive(dir.path(), "notes.json", &[r#"{"id":"x","body":"y"}"#]);

        let range = MonthRange::parse("2007/01", "2007/12").unwrap();
        let reader =
            ArchiveReader::discover(dir.path(), range, ReaderOptions::default()).unwrap();
        let names: Vec<String> = reader.map(|r| r.unwrap().name).collect();
        assert_eq!(names, vec!["keep"]);
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_archive(
            dir.path(),
            "RC_2007-10.jsonl",
            &[
                "not json at all",
                r#"{"id":"ok","body":"good line"}"#,
                r#"{"missing":"fields"}"#,
            ],
        );
        let range = MonthRange::parse("2007/10", "2007/10").unwrap();
        let reader =
            ArchiveReader::discover(dir.path(), range, ReaderOptions::default()).unwrap();
        let names: Vec<String> = reader.map(|r| r.unwrap().name).collect();
        assert_eq!(names, vec!["ok"]);
    }

    #[test]
    fn fulltext_is_carried_when_requested() {
        let dir = tempfile::tempdir().unwrap();
        write_archive(
            dir.path(),
            "RC_2007-10.json",
            &[r#"{"id":"c1","body":"Keep this body"}"#],
        );
        let range = MonthRange::parse("2007/10", "2007/10").unwrap();
        let options = ReaderOptions {
            store_fulltext: true,
            ..ReaderOptions::default()
        };
        let mut reader = ArchiveReader::discover(dir.path(), range, options).unwrap();
        let record = reader.next().unwrap().unwrap();
        assert_eq!(record.fulltext.as_deref(), Some("Keep this body"));
    }

    #[test]
    fn parallel_reader_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let lines: Vec<String> = (0..500)
            .map(|i| format!(r#"{{"id":"c{i}","body":"comment number {i}"}}"#))
            .collect();
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        write_archive(dir.path(), "RC_2007-10.json", &refs);

        let range = MonthRange::parse("2007/10", "2007/10").unwrap();
        let options = ReaderOptions {
            cores: 4,
            ..ReaderOptions::default()
        };
        let reader = ArchiveReader::discover(dir.path(), range, options).unwrap();
        let names: Vec<String> = reader.map(|r| r.unwrap().name).collect();
        let expected: Vec<String> = (0..500).map(|i| format!("c{i}")).collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn missing_directory_is_a_configuration_fault() {
        let range = MonthRange::parse("2007/10", "2007/10").unwrap();
        let err = ArchiveReader::discover(
            Path::new("/nonexistent/archives"),
            range,
            ReaderOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }
}
