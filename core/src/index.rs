use crate::tokenizer::Tokenize;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A built blog post as found in `posts.json`. Unknown fields (date, excerpt, ...) are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Post {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub content: String,
}

/// Per-post record kept next to the index so queries never re-tokenize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRecord {
    pub slug: String,
    pub title: String,
    pub tags: Vec<String>,
    pub tokens: IndexSet<String>,
}

/// token or normalized tag -> slugs of the posts carrying it
pub type InvertedIndex = IndexMap<String, Vec<String>>;

#[derive(Debug, Default)]
pub struct BuiltIndex {
    pub inverted_index: InvertedIndex,
    pub search_data: Vec<SearchRecord>,
}

/// Tag keys are exact-match: trimmed and lowercased.
pub fn normalize_tag(tag: &str) -> String { tag.trim().to_lowercase() }

#[derive(Default)]
struct PostingsBuilder {
    postings: InvertedIndex,
    members: HashMap<String, HashSet<String>>,
}

impl PostingsBuilder {
    fn add(&mut self, key: &str, slug: &str) {
        if self.members.entry(key.to_string()).or_default().insert(slug.to_string()) {
            self.postings.entry(key.to_string()).or_default().push(slug.to_string());
        }
    }
}

/// Build the inverted index and search records in one pass over `posts`.
///
/// Each post is tokenized once (title plus tags). Posts without a slug are skipped, and a
/// post whose tokenization fails is logged and skipped without aborting the batch.
pub fn build_index<T: Tokenize + ?Sized>(posts: &[Post], tokenizer: &T) -> BuiltIndex {
    let mut builder = PostingsBuilder::default();
    let mut search_data = Vec::with_capacity(posts.len());

    for post in posts {
        let slug = post.slug.trim();
        if slug.is_empty() {
            continue;
        }
        let text = format!("{} {}", post.title, post.tags.join(" "));
        let tokens: IndexSet<String> = match tokenizer.tokenize(&text) {
            Ok(tokens) => tokens.into_iter().collect(),
            Err(err) => {
                tracing::error!(slug = %slug, error = %err, "failed to index post, skipping");
                continue;
            }
        };
        for token in &tokens {
            builder.add(token, slug);
        }
        for tag in &post.tags {
            let key = normalize_tag(tag);
            if !key.is_empty() {
                builder.add(&key, slug);
            }
        }
        search_data.push(SearchRecord {
            slug: slug.to_string(),
            title: post.title.clone(),
            tags: post.tags.clone(),
            tokens,
        });
    }

    tracing::debug!(keys = builder.postings.len(), records = search_data.len(), "index built");
    BuiltIndex { inverted_index: builder.postings, search_data }
}

/// Summary entry under a tag in `tags.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostSummary {
    pub slug: String,
    #[serde(default)]
    pub title: String,
}

/// tag name -> posts carrying that tag, in `tags.json` order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagIndex(pub IndexMap<String, Vec<PostSummary>>);

impl TagIndex {
    pub fn from_posts(posts: &[Post]) -> Self {
        let mut map: IndexMap<String, Vec<PostSummary>> = IndexMap::new();
        for post in posts.iter().filter(|p| !p.slug.trim().is_empty()) {
            for tag in &post.tags {
                let entries = map.entry(tag.clone()).or_default();
                if !entries.iter().any(|e| e.slug == post.slug) {
                    entries.push(PostSummary { slug: post.slug.clone(), title: post.title.clone() });
                }
            }
        }
        Self(map)
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> { self.0.keys().map(String::as_str) }

    pub fn post_count(&self, tag: &str) -> usize { self.0.get(tag).map_or(0, Vec::len) }

    /// tag -> distinct slugs
    pub fn slug_sets(&self) -> IndexMap<String, HashSet<String>> {
        self.0
            .iter()
            .map(|(tag, posts)| (tag.clone(), posts.iter().map(|p| p.slug.clone()).collect()))
            .collect()
    }

    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}
