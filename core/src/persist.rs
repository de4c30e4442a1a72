use crate::index::{InvertedIndex, Post, SearchRecord, TagIndex};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

pub const META_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMeta {
    pub num_posts: usize,
    pub num_keys: usize,
    /// index tokens occurring in at least two posts
    pub shared_terms: usize,
    pub created_at: String,
    pub version: u32,
}

/// Where batch steps read their inputs and write their artifacts.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub input: PathBuf,
    pub output: PathBuf,
}

impl ArtifactPaths {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(input: P, output: Q) -> Self {
        Self { input: input.as_ref().to_path_buf(), output: output.as_ref().to_path_buf() }
    }
    pub fn posts(&self) -> PathBuf { self.input.join("posts.json") }
    pub fn tags(&self) -> PathBuf { self.input.join("tags.json") }
    pub fn search_index(&self) -> PathBuf { self.output.join("search-index.json") }
    pub fn search_data(&self) -> PathBuf { self.output.join("search-data.json") }
    pub fn meta(&self) -> PathBuf { self.output.join("index-meta.json") }
    pub fn tag_similarity(&self) -> PathBuf { self.output.join("tag-similarity.json") }
    pub fn post_similarity(&self) -> PathBuf { self.output.join("post-similarity.json") }
    pub fn tag_categories(&self) -> PathBuf { self.output.join("tag-categories.json") }
}

pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let f = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(f)).with_context(|| format!("failed to parse {}", path.display()))
}

pub fn save_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(dir) = path.parent() {
        create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    let mut f = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    f.write_all(json.as_bytes())?;
    tracing::info!(path = %path.display(), "artifact written");
    Ok(())
}

pub fn load_posts(paths: &ArtifactPaths) -> Result<Vec<Post>> { load_json(&paths.posts()) }

/// `tags.json` when present, otherwise derived from the posts.
pub fn load_tag_index(paths: &ArtifactPaths, posts: &[Post]) -> Result<TagIndex> {
    let path = paths.tags();
    if path.exists() {
        load_json(&path)
    } else {
        tracing::warn!(path = %path.display(), "tag index missing, deriving it from posts");
        Ok(TagIndex::from_posts(posts))
    }
}

/// Load what the search engine needs at run time.
pub fn load_search_artifacts(dir: &Path) -> Result<(InvertedIndex, Vec<SearchRecord>)> {
    let paths = ArtifactPaths::new(dir, dir);
    let index = load_json(&paths.search_index())?;
    let data = load_json(&paths.search_data())?;
    Ok((index, data))
}

pub fn save_meta(paths: &ArtifactPaths, meta: &IndexMeta) -> Result<()> { save_json(&paths.meta(), meta) }

pub fn load_meta(paths: &ArtifactPaths) -> Result<IndexMeta> { load_json(&paths.meta()) }
