//! Property tests for the build-pipeline invariants.

use proptest::prelude::*;

use forumquery::{BuildOptions, DocumentRecord, InvertedIndex, MemoryStore, PostingStore};

const ALPHABET: [&str; 8] = ["ant", "bee", "cat", "dog", "eel", "fox", "gnu", "hen"];

fn corpus_strategy() -> impl Strategy<Value = Vec<Vec<String>>> {
    prop::collection::vec(
        prop::collection::vec(
            (0..ALPHABET.len()).prop_map(|i| ALPHABET[i].to_string()),
            1..20,
        ),
        1..25,
    )
}

fn build_index(corpus: &[Vec<String>], threshold: u32) -> InvertedIndex<MemoryStore> {
    let documents: Vec<forumquery::Result<DocumentRecord>> = corpus
        .iter()
        .enumerate()
        .map(|(i, tokens)| {
            Ok(DocumentRecord {
                name: format!("doc{i}"),
                tokens: tokens.clone(),
                fulltext: None,
            })
        })
        .collect();
    InvertedIndex::build(
        MemoryStore::new(),
        documents,
        BuildOptions {
            frequency_threshold: threshold,
        },
    )
    .unwrap()
}

proptest! {
    /// After build, every document's score vector has L2 norm 0 or 1.
    #[test]
    fn document_norms_are_unit_or_zero(corpus in corpus_strategy(), threshold in 0u32..6) {
        let index = build_index(&corpus, threshold);
        for doc_id in 0..index.num_documents() {
            let sum_sq: f64 = index
                .document_vector(doc_id)
                .unwrap()
                .iter()
                .map(|&(_, score)| score * score)
                .sum();
            prop_assert!(
                sum_sq.abs() < 1e-9 || (sum_sq - 1.0).abs() < 1e-9,
                "doc {} has sum of squares {}", doc_id, sum_sq
            );
        }
    }

    /// Pruning is inclusive, so surviving terms are strictly above the
    /// threshold.
    #[test]
    fn surviving_terms_strictly_exceed_threshold(corpus in corpus_strategy(), threshold in 0u32..6) {
        let index = build_index(&corpus, threshold);
        for term in ALPHABET {
            if let Some(term_id) = index.term_id(term) {
                let total = index.store().term_total_frequency(term_id).unwrap();
                prop_assert!(total > f64::from(threshold),
                    "term {} survived with total {}", term, total);
            }
        }
    }

    /// Matrix and dictionary stay bijective, and every document in the
    /// matrix keeps its document-table row.
    #[test]
    fn matrix_dictionary_and_table_are_consistent(corpus in corpus_strategy(), threshold in 0u32..6) {
        let index = build_index(&corpus, threshold);

        let dictionary_ids: std::collections::HashSet<_> = index
            .dictionary()
            .entries()
            .map(|(_, id)| id)
            .collect();

        let mut matrix_ids = std::collections::HashSet::new();
        for doc_id in 0..index.num_documents() {
            let vector = index.document_vector(doc_id).unwrap();
            if !vector.is_empty() {
                let name = index.document_name(doc_id).unwrap();
                prop_assert!(name.is_some_and(|n| !n.is_empty()));
            }
            for (term_id, _) in vector {
                matrix_ids.insert(term_id);
            }
        }
        prop_assert_eq!(&matrix_ids, &dictionary_ids);

        // postings lists agree with the document table after cascades
        for &term_id in &dictionary_ids {
            for doc_id in index.store().scan_by_term(term_id).unwrap() {
                prop_assert!(index.document_name(doc_id).unwrap().is_some());
            }
        }
    }

    /// Document ids are assigned contiguously from zero in arrival order;
    /// cascade deletes may only punch holes, never renumber.
    #[test]
    fn document_ids_are_arrival_ordered(corpus in corpus_strategy()) {
        let index = build_index(&corpus, 0);
        prop_assert_eq!(index.num_documents() as usize, corpus.len());
        for (i, _) in corpus.iter().enumerate() {
            let name = index.document_name(i as u32).unwrap();
            let expected = format!("doc{}", i);
            prop_assert_eq!(name.as_deref(), Some(expected.as_str()));
        }
    }
}
