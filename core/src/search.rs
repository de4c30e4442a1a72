use crate::index::{InvertedIndex, SearchRecord};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchType {
    Exact,
    Partial,
    ExactNoSpace,
    MultiTermMatch,
    PartialNoSpace,
    None,
}

impl MatchType {
    pub fn priority(self) -> u32 {
        match self {
            MatchType::Exact => 100,
            MatchType::Partial => 80,
            MatchType::ExactNoSpace => 60,
            MatchType::MultiTermMatch => 50,
            MatchType::PartialNoSpace => 40,
            MatchType::None => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchedIn {
    Title,
    Tag,
    Tokens,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub slug: String,
    pub title: String,
    pub tags: Vec<String>,
    pub match_type: MatchType,
    pub matched_in: MatchedIn,
}

impl SearchHit {
    pub fn score(&self) -> u32 { self.match_type.priority() }
}

/// Case-fold for comparisons. Japanese text passes through unchanged.
pub fn fold(text: &str) -> String { text.trim().to_lowercase() }

fn strip_whitespace(text: &str) -> String { text.chars().filter(|c| !c.is_whitespace()).collect() }

/// First applicable tier for `field` against an already folded query.
pub fn field_match(field: &str, folded_query: &str) -> MatchType {
    let field = fold(field);
    if field.is_empty() || folded_query.is_empty() {
        return MatchType::None;
    }
    if field == folded_query {
        return MatchType::Exact;
    }
    if field.contains(folded_query) {
        return MatchType::Partial;
    }
    let (field, query) = (strip_whitespace(&field), strip_whitespace(folded_query));
    if query.is_empty() {
        MatchType::None
    } else if field == query {
        MatchType::ExactNoSpace
    } else if field.contains(&query) {
        MatchType::PartialNoSpace
    } else {
        MatchType::None
    }
}

fn best_tag_match(tags: &[String], folded_query: &str) -> MatchType {
    tags.iter()
        .map(|t| field_match(t, folded_query))
        .max_by_key(|m| m.priority())
        .unwrap_or(MatchType::None)
}

/// AND search over a built index with a title-substring fallback.
pub struct SearchEngine {
    postings: HashMap<String, Vec<String>>,
    records: IndexMap<String, SearchRecord>,
}

impl SearchEngine {
    /// Index keys are folded so lookups ignore case; colliding keys merge their postings.
    pub fn new(index: &InvertedIndex, search_data: Vec<SearchRecord>) -> Self {
        let mut postings: HashMap<String, Vec<String>> = HashMap::new();
        let mut members: HashMap<String, HashSet<String>> = HashMap::new();
        for (key, slugs) in index {
            let folded = fold(key);
            let seen = members.entry(folded.clone()).or_default();
            let list = postings.entry(folded).or_default();
            for slug in slugs {
                if seen.insert(slug.clone()) {
                    list.push(slug.clone());
                }
            }
        }
        let records = search_data.into_iter().map(|r| (r.slug.clone(), r)).collect();
        Self { postings, records }
    }

    pub fn record(&self, slug: &str) -> Option<&SearchRecord> { self.records.get(slug) }

    pub fn len(&self) -> usize { self.records.len() }

    pub fn is_empty(&self) -> bool { self.records.is_empty() }

    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        let folded = fold(query);
        if folded.is_empty() {
            return Vec::new();
        }
        let terms: Vec<&str> = folded.split_whitespace().collect();
        let multi_term = terms.len() >= 2;

        let term_postings: Vec<&[String]> = terms
            .iter()
            .map(|t| self.postings.get(*t).map(Vec::as_slice).unwrap_or(&[]))
            .collect();
        let missing_term = term_postings.iter().any(|p| p.is_empty());

        // Discovery order follows the first term's postings.
        let mut candidates: Vec<&str> = term_postings[0].iter().map(String::as_str).collect();
        for other in &term_postings[1..] {
            let other: HashSet<&str> = other.iter().map(String::as_str).collect();
            candidates.retain(|slug| other.contains(slug));
        }

        let mut hits: Vec<SearchHit> = candidates
            .into_iter()
            .filter_map(|slug| self.records.get(slug))
            .map(|record| self.index_hit(record, &folded, multi_term))
            .collect();
        hits.sort_by(|a, b| b.score().cmp(&a.score()));

        if missing_term || hits.is_empty() {
            let seen: HashSet<String> = hits.iter().map(|h| h.slug.clone()).collect();
            let mut fallback: Vec<SearchHit> = self
                .records
                .values()
                .filter(|r| !seen.contains(&r.slug))
                .filter_map(|r| {
                    let m = field_match(&r.title, &folded);
                    (m != MatchType::None).then(|| hit(r, m, MatchedIn::Title))
                })
                .collect();
            fallback.sort_by(|a, b| b.score().cmp(&a.score()));
            hits.extend(fallback);
        }
        hits
    }

    fn index_hit(&self, record: &SearchRecord, folded: &str, multi_term: bool) -> SearchHit {
        let title = field_match(&record.title, folded);
        let tag = best_tag_match(&record.tags, folded);
        let (field, matched_in) =
            if tag.priority() > title.priority() { (tag, MatchedIn::Tag) } else { (title, MatchedIn::Title) };
        // an AND hit never scores below MULTI_TERM_MATCH
        let floor = if multi_term { MatchType::MultiTermMatch } else { MatchType::None };
        if field == MatchType::None || field.priority() < floor.priority() {
            hit(record, floor, MatchedIn::Tokens)
        } else {
            hit(record, field, matched_in)
        }
    }
}

fn hit(record: &SearchRecord, match_type: MatchType, matched_in: MatchedIn) -> SearchHit {
    SearchHit {
        slug: record.slug.clone(),
        title: record.title.clone(),
        tags: record.tags.clone(),
        match_type,
        matched_in,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_short_circuit_in_order() {
        assert_eq!(field_match("React", "react"), MatchType::Exact);
        assert_eq!(field_match("React Hooks 入門", "hooks"), MatchType::Partial);
        assert_eq!(field_match("Next.js", "next .js"), MatchType::ExactNoSpace);
        assert_eq!(field_match("GitHub Actions で CI", "actionsで"), MatchType::PartialNoSpace);
        assert_eq!(field_match("Rust", "go"), MatchType::None);
        assert_eq!(field_match("", "go"), MatchType::None);
    }

    #[test]
    fn priorities_are_strictly_ordered() {
        let order = [
            MatchType::Exact,
            MatchType::Partial,
            MatchType::ExactNoSpace,
            MatchType::MultiTermMatch,
            MatchType::PartialNoSpace,
            MatchType::None,
        ];
        assert!(order.windows(2).all(|w| w[0].priority() > w[1].priority()));
    }

    #[test]
    fn match_type_serializes_screaming() {
        assert_eq!(serde_json::to_string(&MatchType::MultiTermMatch).unwrap(), "\"MULTI_TERM_MATCH\"");
        assert_eq!(serde_json::to_string(&MatchedIn::Title).unwrap(), "\"title\"");
    }

    fn record(slug: &str, title: &str, tags: &[&str]) -> SearchRecord {
        SearchRecord {
            slug: slug.into(),
            title: title.into(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            tokens: Default::default(),
        }
    }

    #[test]
    fn title_fallback_only_for_unmatched_terms() {
        let mut index = InvertedIndex::new();
        index.insert("go".into(), vec!["b".into()]);
        let records = vec![record("a", "go", &[]), record("b", "Learning", &["Go"])];
        let engine = SearchEngine::new(&index, records);
        // single known term: no fallback
        let hits = engine.search("Go");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].slug, "b");
        assert_eq!(hits[0].matched_in, MatchedIn::Tag);

        // unknown second term empties the intersection and falls back to titles
        let mut index = InvertedIndex::new();
        index.insert("go".into(), vec!["b".into()]);
        let records = vec![record("a", "Go Tour", &[]), record("b", "Learning", &["Go"])];
        let engine = SearchEngine::new(&index, records);
        let hits = engine.search("go tour");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].slug, "a");
        assert_eq!(hits[0].match_type, MatchType::Exact);
        assert_eq!(hits[0].matched_in, MatchedIn::Title);
    }

    #[test]
    fn folded_keys_merge() {
        let mut index = InvertedIndex::new();
        index.insert("React".into(), vec!["a".into()]);
        index.insert("react".into(), vec!["a".into(), "b".into()]);
        let engine = SearchEngine::new(&index, vec![record("a", "x", &[]), record("b", "y", &[])]);
        let slugs: Vec<String> = engine.search("REACT").into_iter().map(|h| h.slug).collect();
        assert_eq!(slugs, vec!["a", "b"]);
    }

    #[test]
    fn whitespace_query_is_empty() {
        let engine = SearchEngine::new(&InvertedIndex::new(), vec![record("a", "x", &[])]);
        assert!(engine.search("").is_empty());
        assert!(engine.search(" \n\t ").is_empty());
    }
}
