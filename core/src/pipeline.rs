//! The three offline batch steps. Each reads its inputs, rebuilds its artifacts from
//! scratch and writes them under the output directory.

use crate::cluster::{tag_categories, CategoryRules, TagCategoryMap};
use crate::index::{build_index, BuiltIndex};
use crate::persist::{load_posts, load_tag_index, save_json, save_meta, ArtifactPaths, IndexMeta, META_VERSION};
use crate::scoring::{doc_frequency, filter_rare_terms, DEFAULT_MIN_DF};
use crate::similarity::{post_similarity, tag_similarity};
use crate::tokenizer::Tokenize;
use anyhow::Result;
use time::format_description::well_known::Rfc3339;

pub fn index_meta(built: &BuiltIndex) -> IndexMeta {
    let corpus: Vec<Vec<&str>> = built.search_data.iter().map(|r| r.tokens.iter().map(String::as_str).collect()).collect();
    let shared_terms = filter_rare_terms(&doc_frequency(&corpus), DEFAULT_MIN_DF).len();
    IndexMeta {
        num_posts: built.search_data.len(),
        num_keys: built.inverted_index.len(),
        shared_terms,
        created_at: time::OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_else(|_| "".into()),
        version: META_VERSION,
    }
}

pub fn build_search_index<T: Tokenize + ?Sized>(paths: &ArtifactPaths, tokenizer: &T) -> Result<IndexMeta> {
    let posts = load_posts(paths)?;
    let built = build_index(&posts, tokenizer);
    let skipped = posts.len() - built.search_data.len();
    save_json(&paths.search_index(), &built.inverted_index)?;
    save_json(&paths.search_data(), &built.search_data)?;
    let meta = index_meta(&built);
    save_meta(paths, &meta)?;
    tracing::info!(num_posts = meta.num_posts, num_keys = meta.num_keys, skipped, "search index built");
    Ok(meta)
}

pub fn build_similarity(paths: &ArtifactPaths) -> Result<()> {
    let posts = load_posts(paths)?;
    let tags = load_tag_index(paths, &posts)?;
    let matrix = tag_similarity(&posts, &tags);
    save_json(&paths.tag_similarity(), &matrix)?;
    let related = post_similarity(&posts, &matrix);
    save_json(&paths.post_similarity(), &related)?;
    tracing::info!(tags = matrix.len(), posts = related.len(), "similarity built");
    Ok(())
}

pub fn build_tag_categories(paths: &ArtifactPaths, rules: &CategoryRules, seed: u32) -> Result<TagCategoryMap> {
    let posts = load_posts(paths)?;
    let tags = load_tag_index(paths, &posts)?;
    let categories = tag_categories(&tags.slug_sets(), rules, seed);
    save_json(&paths.tag_categories(), &categories)?;
    Ok(categories)
}
