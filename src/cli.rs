use clap::Parser as ClapParser;
use std::path::PathBuf;

#[derive(ClapParser, Debug)]
#[command(author, version, about = "Build and query a cosine/TF-IDF inverted index over monthly forum comment archives", long_about = None)]
pub struct Args {
    /// Execution mode: 1 build index, 2 query existing index, 3 build then query
    #[arg(value_name = "MODE", value_parser = clap::value_parser!(u8).range(1..=3))]
    pub mode: u8,

    /// First archive month to index as YYYY/MM (required for modes 1 and 3)
    #[arg(short = 's', long = "start")]
    pub start: Option<String>,

    /// Last archive month to index as YYYY/MM (required for modes 1 and 3)
    #[arg(short = 'e', long = "end")]
    pub end: Option<String>,

    /// Working directory holding the archives, the store and the sidecar
    #[arg(short = 'd', long = "dir", default_value = "./data")]
    pub dir: PathBuf,

    /// Minimum term frequency: terms at or below this total are pruned
    #[arg(short = 'm', long = "minfreq", default_value_t = 5)]
    pub minfreq: u32,

    /// Number of results to show for each query
    #[arg(short = 'n', long = "num", default_value_t = 10)]
    pub num: usize,

    /// Worker threads for archive parsing and tokenization
    #[arg(short = 'c', long = "cores", default_value_t = 1)]
    pub cores: usize,

    /// Store comment bodies and return them with query results
    #[arg(long = "fulltext")]
    pub fulltext: bool,

    /// Stem tokens during indexing and querying
    #[arg(long = "lemma")]
    pub lemma: bool,

    /// Report progress on stderr
    #[arg(short = 'p', long = "progress")]
    pub progress: bool,

    /// Return only documents containing every query term
    #[arg(long = "conjunctive")]
    pub conjunctive: bool,
}
