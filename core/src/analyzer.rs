use anyhow::Result;
use lazy_static::lazy_static;
use lindera::{
    dictionary::{load_dictionary_from_kind, DictionaryKind},
    mode::Mode,
    segmenter::Segmenter,
    tokenizer::Tokenizer as LinderaTokenizer,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// One unit of morphological analysis output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Morpheme {
    pub surface: String,
    /// Top-level part of speech, e.g. 名詞
    pub pos: String,
    /// First POS subcategory, e.g. 数 or 接尾
    pub pos_detail: String,
    /// Dictionary (base) form, when the dictionary knows one
    pub base_form: Option<String>,
}

impl Morpheme {
    pub fn base_or_surface(&self) -> &str {
        self.base_form.as_deref().unwrap_or(&self.surface)
    }
}

pub trait Analyzer: Send + Sync {
    fn analyze(&self, text: &str) -> Result<Vec<Morpheme>>;
}

/// IPADIC-backed analyzer. Loading the embedded dictionary is the expensive part.
pub struct LinderaAnalyzer {
    tokenizer: LinderaTokenizer,
}

impl LinderaAnalyzer {
    pub fn load() -> Result<Self> {
        let dictionary = load_dictionary_from_kind(DictionaryKind::IPADIC)?;
        let segmenter = Segmenter::new(Mode::Normal, dictionary, None);
        Ok(Self { tokenizer: LinderaTokenizer::new(segmenter) })
    }
}

// IPADIC detail columns: pos, pos_detail1..3, conjugation type, conjugation form, base form, reading, pronunciation
const IPADIC_BASE_FORM: usize = 6;

impl Analyzer for LinderaAnalyzer {
    fn analyze(&self, text: &str) -> Result<Vec<Morpheme>> {
        let mut tokens = self.tokenizer.tokenize(text)?;
        let mut out = Vec::with_capacity(tokens.len());
        for token in tokens.iter_mut() {
            let surface = token.text.to_string();
            let details = token.details();
            let field = |i: usize| details.get(i).copied().filter(|d| !d.is_empty() && *d != "*");
            out.push(Morpheme {
                pos: field(0).unwrap_or_default().to_string(),
                pos_detail: field(1).unwrap_or_default().to_string(),
                base_form: field(IPADIC_BASE_FORM).map(str::to_string),
                surface,
            });
        }
        Ok(out)
    }
}

/// Initialize-once holder for an expensive analyzer.
///
/// Callers racing on the first `get_or_init` serialize on the inner lock, so at most one
/// initialization runs and every caller observes the same `Arc`. A failed initialization
/// leaves the cell empty and a later call retries.
pub struct AnalyzerCell<A> {
    slot: Mutex<Option<Arc<A>>>,
}

impl<A> Default for AnalyzerCell<A> {
    fn default() -> Self { Self { slot: Mutex::new(None) } }
}

impl<A> AnalyzerCell<A> {
    pub fn new() -> Self { Self::default() }

    pub fn get_or_init<F>(&self, init: F) -> Result<Arc<A>>
    where
        F: FnOnce() -> Result<A>,
    {
        let mut slot = self.slot.lock();
        if let Some(existing) = slot.as_ref() {
            return Ok(Arc::clone(existing));
        }
        match init() {
            Ok(analyzer) => {
                let analyzer = Arc::new(analyzer);
                *slot = Some(Arc::clone(&analyzer));
                Ok(analyzer)
            }
            Err(err) => {
                tracing::error!(error = %err, "analyzer initialization failed");
                Err(err)
            }
        }
    }

    pub fn is_initialized(&self) -> bool { self.slot.lock().is_some() }

    /// Drop the memoized instance; the next `get_or_init` loads a fresh one.
    pub fn reset(&self) { self.slot.lock().take(); }
}

lazy_static! {
    static ref SHARED: AnalyzerCell<LinderaAnalyzer> = AnalyzerCell::new();
}

/// Process-wide IPADIC analyzer, loaded on first use.
pub fn shared_analyzer() -> Result<Arc<LinderaAnalyzer>> {
    SHARED.get_or_init(LinderaAnalyzer::load)
}
