//! Term and tag weighting functions shared by search and the similarity pipelines.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// `1 + ln(count)` per distinct term.
pub fn sublinear_tf<S: AsRef<str>>(words: &[S]) -> HashMap<String, f64> {
    let mut counts: HashMap<&str, u32> = HashMap::new();
    for w in words {
        *counts.entry(w.as_ref()).or_insert(0) += 1;
    }
    counts.into_iter().map(|(term, n)| (term.to_string(), 1.0 + (n as f64).ln())).collect()
}

/// Number of documents containing each term; repeats inside one document count once.
pub fn doc_frequency<D, S>(corpus: &[D]) -> HashMap<String, usize>
where
    D: AsRef<[S]>,
    S: AsRef<str>,
{
    let mut df: HashMap<String, usize> = HashMap::new();
    for doc in corpus {
        let unique: HashSet<&str> = doc.as_ref().iter().map(AsRef::as_ref).collect();
        for term in unique {
            *df.entry(term.to_string()).or_insert(0) += 1;
        }
    }
    df
}

/// BM25 idf: `ln((N - df + 0.5) / (df + 0.5) + 1)`.
pub fn bm25_idf<K: Clone + Eq + Hash>(total_docs: usize, doc_frequency: &HashMap<K, usize>) -> HashMap<K, f64> {
    let n = total_docs as f64;
    doc_frequency
        .iter()
        .map(|(term, &df)| {
            let df = df as f64;
            (term.clone(), ((n - df + 0.5) / (df + 0.5) + 1.0).ln())
        })
        .collect()
}

pub const DEFAULT_MIN_DF: usize = 2;

/// Keep only terms seen in at least `min_df` documents.
pub fn filter_rare_terms<K: Clone + Eq + Hash>(doc_frequency: &HashMap<K, usize>, min_df: usize) -> HashMap<K, usize> {
    doc_frequency.iter().filter(|(_, &df)| df >= min_df).map(|(k, &df)| (k.clone(), df)).collect()
}

/// Jaccard over tag sets where each tag weighs its idf. Tags missing from `tag_idf`
/// (or with idf 0) take no part in either sum.
pub fn idf_weighted_jaccard<S: AsRef<str>>(tags_a: &[S], tags_b: &[S], tag_idf: &HashMap<String, f64>) -> f64 {
    if tags_a.is_empty() || tags_b.is_empty() {
        return 0.0;
    }
    let a: HashSet<&str> = tags_a.iter().map(AsRef::as_ref).collect();
    let b: HashSet<&str> = tags_b.iter().map(AsRef::as_ref).collect();
    let idf = |t: &str| tag_idf.get(t).copied().unwrap_or(0.0);

    let shared: f64 = a.intersection(&b).map(|t| idf(*t)).sum();
    let total: f64 = a.union(&b).map(|t| idf(*t)).sum();
    if total == 0.0 {
        0.0
    } else {
        shared / total
    }
}
