//! Tag communities: Jaccard adjacency, label propagation, category assignment.

use crate::index::normalize_tag;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// tag -> neighbour -> Jaccard weight in (0, 1]. Every tag has a row, possibly empty.
pub type TagAdjacency = BTreeMap<String, BTreeMap<String, f64>>;

/// tag -> category name
pub type TagCategoryMap = BTreeMap<String, String>;

pub const MAX_ITERATIONS: usize = 100;
pub const DEFAULT_SEED: u32 = 42;

pub fn jaccard_adjacency(tag_posts: &IndexMap<String, HashSet<String>>) -> TagAdjacency {
    let tags: Vec<&String> = tag_posts.keys().collect();
    let mut adjacency: TagAdjacency = tags.iter().map(|t| ((*t).clone(), BTreeMap::new())).collect();
    for (i, a) in tags.iter().enumerate() {
        for b in &tags[i + 1..] {
            let (pa, pb) = (&tag_posts[*a], &tag_posts[*b]);
            let shared = pa.intersection(pb).count();
            if shared == 0 {
                continue;
            }
            let score = shared as f64 / (pa.len() + pb.len() - shared) as f64;
            if let Some(row) = adjacency.get_mut(*a) {
                row.insert((*b).clone(), score);
            }
            if let Some(row) = adjacency.get_mut(*b) {
                row.insert((*a).clone(), score);
            }
        }
    }
    adjacency
}

/// 32-bit linear congruential generator (Numerical Recipes constants).
#[derive(Debug, Clone)]
pub struct Lcg {
    state: u32,
}

impl Lcg {
    pub fn new(seed: u32) -> Self { Self { state: seed } }

    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        self.state
    }

    /// Uniform in [0, 1).
    pub fn next_f64(&mut self) -> f64 { self.next_u32() as f64 / 4_294_967_296.0 }
}

/// Fisher-Yates shuffle driven by `rng`.
pub fn shuffle<T>(items: &mut [T], rng: &mut Lcg) {
    for i in (1..items.len()).rev() {
        let j = (rng.next_f64() * (i + 1) as f64) as usize;
        items.swap(i, j);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Propagation {
    /// Tag groups, largest first.
    pub clusters: Vec<Vec<String>>,
    pub iterations: usize,
    pub converged: bool,
}

/// Heaviest label among `votes`. Ties keep `current`, which damps oscillation between
/// equally weighted communities; among other labels the first one seen wins.
fn choose_label(current: usize, votes: &IndexMap<usize, f64>) -> usize {
    let mut best = current;
    let mut best_weight = votes.get(&current).copied().unwrap_or(0.0);
    for (&label, &weight) in votes {
        if weight > best_weight {
            best = label;
            best_weight = weight;
        }
    }
    best
}

/// Label propagation over `adjacency` with a reproducible visiting order.
pub fn label_propagation(adjacency: &TagAdjacency, seed: u32) -> Propagation {
    label_propagation_capped(adjacency, seed, MAX_ITERATIONS)
}

/// As [`label_propagation`], stopping after `max_iterations` passes. A run that hits the
/// cap keeps its last labelling.
pub fn label_propagation_capped(adjacency: &TagAdjacency, seed: u32, max_iterations: usize) -> Propagation {
    let tags: Vec<&str> = adjacency.keys().map(String::as_str).collect();
    let mut labels: HashMap<&str, usize> = tags.iter().enumerate().map(|(i, t)| (*t, i)).collect();
    let mut order = tags.clone();
    let mut rng = Lcg::new(seed);
    let mut iterations = 0;
    let mut converged = false;

    while iterations < max_iterations {
        iterations += 1;
        shuffle(&mut order, &mut rng);
        let mut changed = false;

        for tag in &order {
            let current = labels[tag];
            let mut votes: IndexMap<usize, f64> = IndexMap::new();
            for (neighbour, weight) in &adjacency[*tag] {
                *votes.entry(labels[neighbour.as_str()]).or_insert(0.0) += weight;
            }
            let best = choose_label(current, &votes);
            if best != current {
                labels.insert(*tag, best);
                changed = true;
            }
        }

        if !changed {
            converged = true;
            break;
        }
    }

    if !converged {
        tracing::warn!(iterations, "label propagation did not converge, using last labelling");
    }

    let mut groups: IndexMap<usize, Vec<String>> = IndexMap::new();
    for tag in &tags {
        groups.entry(labels[tag]).or_default().push(tag.to_string());
    }
    let mut clusters: Vec<Vec<String>> = groups.into_values().collect();
    clusters.sort_by(|a, b| b.len().cmp(&a.len()));
    Propagation { clusters, iterations, converged }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub name: String,
    pub seeds: Vec<String>,
}

/// Categories in priority order plus the bucket for clusters matching none of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRules {
    pub categories: Vec<CategoryRule>,
    pub default_category: String,
}

impl Default for CategoryRules {
    fn default() -> Self {
        let rule = |name: &str, seeds: &[&str]| CategoryRule {
            name: name.to_string(),
            seeds: seeds.iter().map(|s| s.to_string()).collect(),
        };
        Self {
            categories: vec![
                rule("programming", &["TypeScript", "JavaScript", "React", "Next.js", "Rust", "Go", "Python", "Node.js", "CSS", "HTML"]),
                rule("infrastructure", &["AWS", "Docker", "Kubernetes", "Linux", "Terraform", "GitHub Actions", "CI/CD", "Vercel"]),
                rule("life", &["読書", "旅行", "日記", "雑記", "健康", "キャリア", "振り返り"]),
            ],
            default_category: "other".to_string(),
        }
    }
}

/// How strongly `cluster` leans towards `rule`. A cluster holding one of the seeds
/// scores infinity.
pub fn category_affinity(cluster: &[String], rule: &CategoryRule, adjacency: &TagAdjacency, by_normalized: &HashMap<String, Vec<&str>>) -> f64 {
    let seeds: Vec<&str> = rule
        .seeds
        .iter()
        .filter_map(|s| by_normalized.get(&normalize_tag(s)))
        .flatten()
        .copied()
        .collect();
    if cluster.iter().any(|t| seeds.contains(&t.as_str())) {
        return f64::INFINITY;
    }
    if seeds.is_empty() || cluster.is_empty() {
        return 0.0;
    }
    let mut total = 0.0;
    for tag in cluster {
        if let Some(row) = adjacency.get(tag) {
            total += seeds.iter().filter_map(|s| row.get(*s)).sum::<f64>();
        }
    }
    total / (cluster.len() * seeds.len()) as f64
}

/// normalized tag -> every corpus spelling of it
fn spellings(adjacency: &TagAdjacency) -> HashMap<String, Vec<&str>> {
    let mut by_normalized: HashMap<String, Vec<&str>> = HashMap::new();
    for tag in adjacency.keys() {
        by_normalized.entry(normalize_tag(tag)).or_default().push(tag.as_str());
    }
    by_normalized
}

/// Assign every tag of every cluster a category.
pub fn classify_clusters(clusters: &[Vec<String>], adjacency: &TagAdjacency, rules: &CategoryRules) -> TagCategoryMap {
    let by_normalized = spellings(adjacency);
    let mut categories = TagCategoryMap::new();
    for cluster in clusters {
        let mut best = rules.default_category.as_str();
        let mut best_score = 0.0;
        for rule in &rules.categories {
            let score = category_affinity(cluster, rule, adjacency, &by_normalized);
            if score > best_score {
                best = rule.name.as_str();
                best_score = score;
            }
        }
        for tag in cluster {
            categories.insert(tag.clone(), best.to_string());
        }
    }
    categories
}

/// Cluster the tag graph and label every tag with a category.
pub fn tag_categories(tag_posts: &IndexMap<String, HashSet<String>>, rules: &CategoryRules, seed: u32) -> TagCategoryMap {
    let adjacency = jaccard_adjacency(tag_posts);
    let propagation = label_propagation(&adjacency, seed);
    tracing::info!(
        tags = adjacency.len(),
        clusters = propagation.clusters.len(),
        iterations = propagation.iterations,
        "tag graph clustered"
    );
    classify_clusters(&propagation.clusters, &adjacency, rules)
}
