//! Corpus producer: turns monthly comment archives into the pre-tokenized
//! document stream consumed by the index builder.
//!
//! Downloading and decompressing the archives is an external concern; this
//! module starts from already-decompressed line-delimited JSON files in the
//! data directory.

mod archive;
mod period;
mod tokenization;

pub use archive::{ArchiveReader, ReaderOptions};
pub use period::{Month, MonthRange};
pub use tokenization::tokenize;
