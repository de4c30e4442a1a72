use crate::index::{Post, TagIndex};
use indexmap::{IndexMap, IndexSet};
use std::cmp::Ordering;
use std::collections::HashMap;

/// tag -> related tag -> relatedness in [0, 1], each inner map sorted by score descending
pub type TagSimilarityMatrix = IndexMap<String, IndexMap<String, f64>>;

/// candidate slug -> aggregate score, best first
pub type PostSimilarityMap = IndexMap<String, f64>;

pub const RELATED_POSTS: usize = 6;

pub fn round4(x: f64) -> f64 { (x * 10_000.0).round() / 10_000.0 }

/// Ordered pair counts of tags sharing a post. Owned per build call.
#[derive(Debug, Default)]
pub struct CoOccurrence {
    counts: HashMap<String, IndexMap<String, u32>>,
}

impl CoOccurrence {
    pub fn from_posts(posts: &[Post]) -> Self {
        let mut counts: HashMap<String, IndexMap<String, u32>> = HashMap::new();
        for post in posts.iter().filter(|p| !p.slug.trim().is_empty()) {
            let tags: IndexSet<&String> = post.tags.iter().collect();
            for a in &tags {
                for b in &tags {
                    if a == b {
                        continue;
                    }
                    *counts.entry((*a).clone()).or_default().entry((*b).clone()).or_insert(0) += 1;
                }
            }
        }
        Self { counts }
    }

    pub fn count(&self, a: &str, b: &str) -> u32 {
        self.counts.get(a).and_then(|m| m.get(b)).copied().unwrap_or(0)
    }

    /// Co-occurrence normalized by the geometric mean of both tags' post counts.
    pub fn relatedness(&self, tags: &TagIndex) -> TagSimilarityMatrix {
        let mut matrix = TagSimilarityMatrix::new();
        for tag in tags.tags() {
            let mut related: Vec<(String, f64)> = Vec::new();
            if let Some(others) = self.counts.get(tag) {
                let own = tags.post_count(tag) as f64;
                for (other, &n) in others {
                    let denom = (own * tags.post_count(other) as f64).sqrt();
                    if denom > 0.0 {
                        related.push((other.clone(), round4(n as f64 / denom)));
                    }
                }
            }
            related.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
            matrix.insert(tag.to_string(), related.into_iter().collect());
        }
        matrix
    }
}

/// Tag-to-tag relatedness for every tag in `tags`.
pub fn tag_similarity(posts: &[Post], tags: &TagIndex) -> TagSimilarityMatrix {
    CoOccurrence::from_posts(posts).relatedness(tags)
}

/// Up to [`RELATED_POSTS`] posts most related to `target` through their tags.
pub fn related_posts(target: &Post, posts: &[Post], matrix: &TagSimilarityMatrix) -> PostSimilarityMap {
    let mut scored: Vec<(&str, f64)> = Vec::new();
    for candidate in posts {
        if candidate.slug == target.slug || candidate.slug.trim().is_empty() {
            continue;
        }
        let mut score = 0.0;
        for a in &target.tags {
            let Some(row) = matrix.get(a) else { continue };
            for b in &candidate.tags {
                if let Some(r) = row.get(b) {
                    score += r;
                }
            }
        }
        if score > 0.0 {
            scored.push((candidate.slug.as_str(), score));
        }
    }
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    scored.truncate(RELATED_POSTS);
    scored.into_iter().map(|(slug, s)| (slug.to_string(), round4(s))).collect()
}

/// One `{ slug: related }` entry per post, in input order.
pub fn post_similarity(posts: &[Post], matrix: &TagSimilarityMatrix) -> Vec<IndexMap<String, PostSimilarityMap>> {
    posts
        .iter()
        .filter(|p| !p.slug.trim().is_empty())
        .map(|p| IndexMap::from([(p.slug.clone(), related_posts(p, posts, matrix))]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(slug: &str, tags: &[&str]) -> Post {
        Post { slug: slug.into(), title: slug.to_uppercase(), tags: tags.iter().map(|t| t.to_string()).collect(), content: String::new() }
    }

    fn corpus() -> Vec<Post> {
        vec![
            post("a", &["React", "TypeScript"]),
            post("b", &["React", "TypeScript", "Next.js"]),
            post("c", &["React"]),
            post("d", &["Docker"]),
            post("e", &["Docker", "AWS"]),
        ]
    }

    #[test]
    fn co_occurrence_counts_ordered_pairs() {
        let co = CoOccurrence::from_posts(&corpus());
        assert_eq!(co.count("React", "TypeScript"), 2);
        assert_eq!(co.count("TypeScript", "React"), 2);
        assert_eq!(co.count("React", "React"), 0);
        assert_eq!(co.count("React", "Docker"), 0);
    }

    #[test]
    fn relatedness_is_cosine_normalized_and_sorted() {
        let posts = corpus();
        let m = tag_similarity(&posts, &TagIndex::from_posts(&posts));
        // 2 / sqrt(3 * 2)
        assert_eq!(m["React"]["TypeScript"], 0.8165);
        // 1 / sqrt(3 * 1)
        assert_eq!(m["React"]["Next.js"], 0.5774);
        let order: Vec<&str> = m["React"].keys().map(String::as_str).collect();
        assert_eq!(order, vec!["TypeScript", "Next.js"]);
        assert_eq!(m["AWS"]["Docker"], round4(1.0 / 2f64.sqrt()));
        assert!(m.values().flat_map(|r| r.values()).all(|&s| s > 0.0 && s <= 1.0));
    }

    #[test]
    fn tags_without_partners_have_empty_rows() {
        let posts = vec![post("solo", &["Lonely"])];
        let m = tag_similarity(&posts, &TagIndex::from_posts(&posts));
        assert!(m["Lonely"].is_empty());
    }

    #[test]
    fn repeated_tags_count_once_per_post() {
        let posts = vec![post("a", &["React", "React", "TS"]), post("b", &["TS"])];
        let co = CoOccurrence::from_posts(&posts);
        assert_eq!(co.count("React", "TS"), 1);
        assert_eq!(co.count("React", "React"), 0);
        let m = tag_similarity(&posts, &TagIndex::from_posts(&posts));
        assert!(!m["React"].contains_key("React"));
        // 1 / sqrt(1 * 2)
        assert_eq!(m["React"]["TS"], 0.7071);
        assert!(m.values().flat_map(|r| r.values()).all(|&s| s > 0.0 && s <= 1.0));
    }

    #[test]
    fn blank_slugs_get_no_entry() {
        let posts = vec![post("a", &["rust"]), post("  ", &["rust", "cli"]), post("b", &["rust", "cli"])];
        let m = tag_similarity(&posts, &TagIndex::from_posts(&posts));
        let all = post_similarity(&posts, &m);
        let keys: Vec<&str> = all.iter().flat_map(|e| e.keys()).map(String::as_str).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert!(all[0]["a"].keys().all(|k| !k.trim().is_empty()));
        assert_eq!(CoOccurrence::from_posts(&posts).count("rust", "cli"), 1);
    }

    #[test]
    fn related_posts_excludes_self_and_unrelated() {
        let posts = corpus();
        let m = tag_similarity(&posts, &TagIndex::from_posts(&posts));
        let related = related_posts(&posts[0], &posts, &m);
        assert!(!related.contains_key("a"));
        assert!(!related.contains_key("d"));
        assert_eq!(related.keys().next().map(String::as_str), Some("b"));
        let scores: Vec<f64> = related.values().copied().collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn related_posts_keeps_top_six() {
        let mut posts = vec![post("target", &["rust"])];
        for i in 0..10 {
            posts.push(post(&format!("p{i}"), &["rust", "cli"]));
        }
        let m = tag_similarity(&posts, &TagIndex::from_posts(&posts));
        let related = related_posts(&posts[0], &posts, &m);
        assert_eq!(related.len(), RELATED_POSTS);
    }

    #[test]
    fn post_similarity_follows_input_order() {
        let posts = corpus();
        let m = tag_similarity(&posts, &TagIndex::from_posts(&posts));
        let all = post_similarity(&posts, &m);
        let keys: Vec<&str> = all.iter().flat_map(|e| e.keys()).map(String::as_str).collect();
        assert_eq!(keys, vec!["a", "b", "c", "d", "e"]);
        assert_eq!(all[3]["d"].keys().collect::<Vec<_>>(), vec!["e"]);
    }
}
