use crate::analyzer::{Analyzer, Morpheme};
use anyhow::Result;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use std::sync::Arc;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref DIGITS_ONLY: Regex = Regex::new(r"^[0-9]+$").expect("valid regex");
    static ref KEEP_POS: HashSet<&'static str> = ["名詞", "動詞", "形容詞", "副詞"].into_iter().collect();
    static ref DROP_POS_DETAIL: HashSet<&'static str> = ["数", "接尾"].into_iter().collect();
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "これ","それ","あれ","どれ","この","その","あの","どの","ここ","そこ","あそこ","どこ",
            "こちら","そちら","あちら","どちら","こと","もの","ところ","とき","よう","ため","はず","わけ",
            "する","いる","なる","ある","できる","いう","思う","やる","くる","行く","くれる","もらう","みる",
            "ない","よい","いい","なし","ほど","さん","ちゃん","くん","たち","など","まで","また","もう",
            "まだ","すぐ","とても","かなり","ちょっと","少し","よく","そう","こう","どう",
            "今回","今日","自分","本当","感じ","場合","以下","以上","部分","方法論",
        ];
        words.iter().copied().collect()
    };
}

fn is_stopword(token: &str) -> bool { STOPWORDS.contains(token) }

fn keep(m: &Morpheme) -> Option<&str> {
    if !KEEP_POS.contains(m.pos.as_str()) || DROP_POS_DETAIL.contains(m.pos_detail.as_str()) {
        return None;
    }
    let word = m.base_or_surface();
    // Length counts characters so a single kanji is treated like a single ASCII letter.
    if word.chars().count() <= 1 || DIGITS_ONLY.is_match(word) || is_stopword(word) {
        return None;
    }
    Some(word)
}

/// Anything that turns raw text into index tokens.
pub trait Tokenize {
    fn tokenize(&self, text: &str) -> Result<Vec<String>>;
}

/// Content-word tokenizer over a morphological analyzer.
///
/// Keeps nouns, verbs, adjectives and adverbs in their base form, in input order, with
/// duplicates retained.
pub struct Tokenizer<A> {
    analyzer: Arc<A>,
}

impl<A: Analyzer> Tokenizer<A> {
    pub fn new(analyzer: Arc<A>) -> Self { Self { analyzer } }
}

impl<A: Analyzer> Tokenize for Tokenizer<A> {
    fn tokenize(&self, text: &str) -> Result<Vec<String>> {
        let normalized = text.nfkc().collect::<String>();
        if normalized.trim().is_empty() {
            return Ok(Vec::new());
        }
        let morphemes = self.analyzer.analyze(&normalized).map_err(|err| {
            tracing::error!(error = %err, "morphological analysis failed");
            err
        })?;
        Ok(morphemes.iter().filter_map(keep).map(str::to_string).collect())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    struct Fixed(Vec<Morpheme>);

    impl Analyzer for Fixed {
        fn analyze(&self, _text: &str) -> Result<Vec<Morpheme>> { Ok(self.0.clone()) }
    }

    struct Broken;

    impl Analyzer for Broken {
        fn analyze(&self, _text: &str) -> Result<Vec<Morpheme>> { Err(anyhow!("analyzer exploded")) }
    }

    fn m(surface: &str, pos: &str, detail: &str, base: Option<&str>) -> Morpheme {
        Morpheme { surface: surface.into(), pos: pos.into(), pos_detail: detail.into(), base_form: base.map(Into::into) }
    }

    #[test]
    fn filters_by_pos_and_uses_base_form() {
        let analyzer = Fixed(vec![
            m("Rust", "名詞", "固有名詞", None),
            m("で", "助詞", "格助詞", Some("で")),
            m("書い", "動詞", "自立", Some("書く")),
            m("た", "助動詞", "*", Some("た")),
            m("3", "名詞", "数", None),
            m("的", "名詞", "接尾", None),
            m("速く", "形容詞", "自立", Some("速い")),
        ]);
        let t = Tokenizer::new(Arc::new(analyzer));
        assert_eq!(t.tokenize("ignored").unwrap(), vec!["Rust", "書く", "速い"]);
    }

    #[test]
    fn drops_short_numeric_and_stop_words() {
        let analyzer = Fixed(vec![
            m("木", "名詞", "一般", None),
            m("2024", "名詞", "固有名詞", None),
            m("こと", "名詞", "非自立", None),
            m("する", "動詞", "自立", Some("する")),
            m("方法", "名詞", "一般", None),
            m("方法", "名詞", "一般", None),
        ]);
        let t = Tokenizer::new(Arc::new(analyzer));
        assert_eq!(t.tokenize("ignored").unwrap(), vec!["方法", "方法"]);
    }

    #[test]
    fn empty_text_yields_nothing() {
        let t = Tokenizer::new(Arc::new(Broken));
        assert!(t.tokenize("").unwrap().is_empty());
        assert!(t.tokenize(" \n\t").unwrap().is_empty());
    }

    #[test]
    fn analyzer_errors_propagate() {
        let t = Tokenizer::new(Arc::new(Broken));
        let err = t.tokenize("何か").unwrap_err();
        assert_eq!(err.to_string(), "analyzer exploded");
    }

    #[test]
    fn fullwidth_latin_is_folded_before_analysis() {
        let t = testing::word_tokenizer();
        assert_eq!(t.tokenize("ＴｙｐｅＳｃｒｉｐｔ　入門").unwrap(), vec!["TypeScript", "入門"]);
    }
}
