//! Text normalization for lexical indexing and querying.
//!
//! Runs a tantivy analysis pipeline: script-aware word extraction (Latin and
//! Cyrillic letters, digits, internal `-`/`'`/`’` joins), lowercasing and a
//! Snowball stemmer, then drops terms of two characters or fewer. Identical
//! input always yields an identical term sequence.

use tantivy::tokenizer::{Language, LowerCaser, RegexTokenizer, Stemmer, TextAnalyzer, TokenStream};

use chatrag_core::error::{Error, Result};

pub const WORD_PATTERN: &str = r"[a-zA-Zа-яА-ЯёЁ0-9]+(?:[-'’][a-zA-Zа-яА-ЯёЁ0-9]+)*";

/// Terms shorter than this (in characters) are dropped after stemming.
pub const MIN_TERM_CHARS: usize = 3;

#[derive(Clone)]
pub struct Normalizer {
    analyzer: TextAnalyzer,
}

impl std::fmt::Debug for Normalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Normalizer").finish_non_exhaustive()
    }
}

impl Normalizer {
    pub fn new(language: Language) -> Result<Self> {
        let tokenizer = RegexTokenizer::new(WORD_PATTERN)
            .map_err(|e| Error::InvalidConfig(format!("word pattern: {e}")))?;
        let analyzer = TextAnalyzer::builder(tokenizer)
            .filter(LowerCaser)
            .filter(Stemmer::new(language))
            .build();
        Ok(Self { analyzer })
    }

    /// Build from a configured language name such as `russian`.
    pub fn for_language(name: &str) -> Result<Self> {
        Self::new(language_from_name(name)?)
    }

    pub fn russian() -> Result<Self> {
        Self::new(Language::Russian)
    }

    pub fn normalize(&self, text: &str) -> Vec<String> {
        // token_stream needs &mut; the clone is a boxed pipeline copy.
        let mut analyzer = self.analyzer.clone();
        let mut stream = analyzer.token_stream(text);
        let mut terms = Vec::new();
        while stream.advance() {
            let term = &stream.token().text;
            if term.chars().count() >= MIN_TERM_CHARS {
                terms.push(term.clone());
            }
        }
        terms
    }
}

pub fn language_from_name(name: &str) -> Result<Language> {
    let lang = match name.trim().to_lowercase().as_str() {
        "arabic" => Language::Arabic,
        "danish" => Language::Danish,
        "dutch" => Language::Dutch,
        "english" => Language::English,
        "finnish" => Language::Finnish,
        "french" => Language::French,
        "german" => Language::German,
        "greek" => Language::Greek,
        "hungarian" => Language::Hungarian,
        "italian" => Language::Italian,
        "norwegian" => Language::Norwegian,
        "portuguese" => Language::Portuguese,
        "romanian" => Language::Romanian,
        "russian" => Language::Russian,
        "spanish" => Language::Spanish,
        "swedish" => Language::Swedish,
        "tamil" => Language::Tamil,
        "turkish" => Language::Turkish,
        other => {
            return Err(Error::InvalidConfig(format!("unsupported stemmer language '{other}'")))
        }
    };
    Ok(lang)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ru() -> Normalizer {
        Normalizer::russian().unwrap()
    }

    #[test]
    fn lowercases_and_splits_mixed_scripts() {
        assert_eq!(
            ru().normalize("Привет, МИР! Hello WORLD"),
            vec!["привет", "мир", "hello", "world"]
        );
    }

    #[test]
    fn drops_short_terms() {
        assert_eq!(ru().normalize("a an to 42 и на 1234"), vec!["1234"]);
        assert!(ru().normalize("").is_empty());
        assert!(ru().normalize("?! ... --").is_empty());
    }

    #[test]
    fn keeps_internal_joins() {
        assert_eq!(ru().normalize("state-of-the-art don't"), vec!["state-of-the-art", "don't"]);
        assert_eq!(ru().normalize("trailing- -leading"), vec!["trailing", "leading"]);
    }

    #[test]
    fn stems_russian_inflections() {
        let n = ru();
        assert_eq!(n.normalize("мира"), n.normalize("мир"));
        assert_eq!(n.normalize("Мир"), vec!["мир"]);
    }

    #[test]
    fn normalization_is_deterministic() {
        let n = ru();
        let text = "Ёлка и ёжик: state-of-the-art 2024, привет друзьям!";
        assert_eq!(n.normalize(text), n.normalize(text));
        assert_eq!(n.normalize(text), n.clone().normalize(text));
    }

    #[test]
    fn language_names_resolve() {
        assert!(Normalizer::for_language("English").is_ok());
        assert!(Normalizer::for_language(" russian ").is_ok());
        assert!(Normalizer::for_language("klingon").is_err());
    }
}
