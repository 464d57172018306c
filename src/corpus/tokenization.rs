//! Token normalization shared by the ingest and query paths.
//!
//! Both sides must apply identical rules, otherwise query terms stop
//! matching indexed terms.

use std::sync::OnceLock;

use rust_stemmers::{Algorithm, Stemmer};

/// Returns a reference to the shared English stemmer instance.
fn get_stemmer() -> &'static Stemmer {
    static STEMMER: OnceLock<Stemmer> = OnceLock::new();
    STEMMER.get_or_init(|| Stemmer::create(Algorithm::English))
}

/// Tokenizes text into lowercase words by splitting on whitespace and
/// non-alphanumeric characters, dropping punctuation-only fragments.
/// With `lemmatize` set, each token is additionally reduced to its stem.
pub fn tokenize(text: &str, lemmatize: bool) -> Vec<String> {
    let mut tokens = Vec::new();
    for word in text.split_whitespace() {
        for part in word.split(|c: char| !c.is_alphanumeric()) {
            if part.is_empty() {
                continue;
            }
            let lowered = part.to_lowercase();
            if lemmatize {
                tokens.push(get_stemmer().stem(&lowered).to_string());
            } else {
                tokens.push(lowered);
            }
        }
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_strips_punctuation() {
        assert_eq!(
            tokenize("Hello, World! It's 2007.", false),
            vec!["hello", "world", "it", "s", "2007"]
        );
    }

    #[test]
    fn punctuation_only_input_yields_nothing() {
        assert!(tokenize("... --- !!!", false).is_empty());
        assert!(tokenize("", false).is_empty());
    }

    #[test]
    fn lemmatize_reduces_to_stems() {
        let tokens = tokenize("running runs runner", true);
        assert_eq!(tokens[0], tokens[1]);
        // same rules on the query side resolve to the same term
        assert_eq!(tokenize("Running!", true), vec![tokens[0].clone()]);
    }

    #[test]
    fn unicode_words_survive() {
        assert_eq!(tokenize("caf\u{e9} na\u{ef}ve", false), vec!["caf\u{e9}", "na\u{ef}ve"]);
    }
}
