pub mod analyzer;
pub mod cluster;
pub mod index;
pub mod persist;
pub mod pipeline;
pub mod scoring;
pub mod search;
pub mod similarity;
pub mod tokenizer;

pub use analyzer::{shared_analyzer, Analyzer, AnalyzerCell, LinderaAnalyzer, Morpheme};
pub use cluster::{CategoryRule, CategoryRules, TagAdjacency, TagCategoryMap};
pub use index::{build_index, BuiltIndex, InvertedIndex, Post, PostSummary, SearchRecord, TagIndex};
pub use search::{MatchType, MatchedIn, SearchEngine, SearchHit};
pub use similarity::{PostSimilarityMap, TagSimilarityMatrix};
pub use tokenizer::{Tokenize, Tokenizer};
