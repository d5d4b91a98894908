//! Feature extraction from Constraint Grammar morphosyntactic tags.
//!
//! Each token of the base segmentation carries a raw CG analysis string such
//! as
//!
//! ```text
//! "lähe" Lb V main indic impf ps3 sg ps af @FMV
//! ```
//!
//! The extractors below pull single features out of that string. They are
//! deliberately tolerant: a feature that is absent yields `None`, and only a
//! tag that fits neither the lexical nor the punctuation shape is treated as
//! a hard parse error.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

static LEMMA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\s*"([^"]+)"\s+L"#).unwrap());
static POS_LEXICAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\s*"([^"]+)"\s+L\S+\s+([A-Z]+)"#).unwrap());
static POS_PUNCT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\s*"(.)"\s+([A-Z])\s"#).unwrap());
static VERB_TYPE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s(mod|aux|inf|sup|ger|partic)\s").unwrap());
static VERB_MAIN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\smain\s").unwrap());
static VERB_TENSE_COMPOUND_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s(partic pres|partic past|cond past)\s").unwrap());
static VERB_TENSE_SIMPLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s(pres|impf)\s").unwrap());
static VERB_MOOD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s(indic|cond|imper|quot)\s").unwrap());

/// Role of a verb inside its chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VerbType {
    /// Finite main verb.
    Main,
    /// Modal verb.
    Mod,
    /// Auxiliary (`olema` in compound tenses).
    Aux,
    /// da-infinitive.
    Inf,
    /// Supine (ma-infinitive).
    Sup,
    /// Gerund.
    Ger,
    /// Participle.
    Partic,
}

impl VerbType {
    /// The tag token this type was read from.
    #[must_use]
    pub fn as_label(&self) -> &'static str {
        match self {
            VerbType::Main => "main",
            VerbType::Mod => "mod",
            VerbType::Aux => "aux",
            VerbType::Inf => "inf",
            VerbType::Sup => "sup",
            VerbType::Ger => "ger",
            VerbType::Partic => "partic",
        }
    }

    fn from_label(label: &str) -> Option<Self> {
        match label {
            "main" => Some(VerbType::Main),
            "mod" => Some(VerbType::Mod),
            "aux" => Some(VerbType::Aux),
            "inf" => Some(VerbType::Inf),
            "sup" => Some(VerbType::Sup),
            "ger" => Some(VerbType::Ger),
            "partic" => Some(VerbType::Partic),
            _ => None,
        }
    }
}

/// Morphological tense tokens attached to a single verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VerbTense {
    /// Present participle (`partic pres`).
    ParticPres,
    /// Past participle (`partic past`).
    ParticPast,
    /// Conditional past (`cond past`).
    CondPast,
    /// Simple present.
    Pres,
    /// Simple past (imperfect).
    Impf,
}

impl VerbTense {
    /// The tag token(s) this tense was read from.
    #[must_use]
    pub fn as_label(&self) -> &'static str {
        match self {
            VerbTense::ParticPres => "partic pres",
            VerbTense::ParticPast => "partic past",
            VerbTense::CondPast => "cond past",
            VerbTense::Pres => "pres",
            VerbTense::Impf => "impf",
        }
    }

    fn from_label(label: &str) -> Option<Self> {
        match label {
            "partic pres" => Some(VerbTense::ParticPres),
            "partic past" => Some(VerbTense::ParticPast),
            "cond past" => Some(VerbTense::CondPast),
            "pres" => Some(VerbTense::Pres),
            "impf" => Some(VerbTense::Impf),
            _ => None,
        }
    }
}

/// Grammatical mood of a verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VerbMood {
    /// Indicative.
    Indic,
    /// Conditional.
    Cond,
    /// Imperative.
    Imper,
    /// Quotative.
    Quot,
}

impl VerbMood {
    /// The tag token this mood was read from.
    #[must_use]
    pub fn as_label(&self) -> &'static str {
        match self {
            VerbMood::Indic => "indic",
            VerbMood::Cond => "cond",
            VerbMood::Imper => "imper",
            VerbMood::Quot => "quot",
        }
    }
}

/// Extracts the lemma, e.g. `lähe` from `"lähe" Lb V main …`.
#[must_use]
pub fn lemma(tag: &str) -> Option<&str> {
    LEMMA_RE.captures(tag).map(|c| c.get(1).map_or("", |m| m.as_str()))
}

/// Extracts the part-of-speech marker.
///
/// Lexical tokens carry an `L`-prefixed form ending before the POS letter
/// group; punctuation has a bare single-letter POS right after the quoted
/// surface form. A tag that fits neither shape is malformed.
pub fn pos(tag: &str) -> Result<&str> {
    if let Some(caps) = POS_LEXICAL_RE.captures(tag) {
        if let Some(m) = caps.get(2) {
            return Ok(&tag[m.range()]);
        }
    }
    if let Some(caps) = POS_PUNCT_RE.captures(tag) {
        if let Some(m) = caps.get(2) {
            return Ok(&tag[m.range()]);
        }
    }
    Err(Error::parse(format!("no part-of-speech in tag: {tag:?}")))
}

/// Extracts the verb chain role, if the token is a verb form.
///
/// The explicit role tokens (`mod`, `aux`, …) win over the bare `main`
/// marker.
#[must_use]
pub fn verb_type(tag: &str) -> Option<VerbType> {
    if let Some(caps) = VERB_TYPE_RE.captures(tag) {
        return VerbType::from_label(caps.get(1)?.as_str());
    }
    if VERB_MAIN_RE.is_match(tag) {
        return Some(VerbType::Main);
    }
    None
}

/// Extracts the morphological tense tokens of a verb form.
///
/// Compound markers (`partic pres`, `partic past`, `cond past`) are checked
/// before the simple ones so that `partic past` is not misread as bare
/// participle plus stray tokens.
#[must_use]
pub fn verb_tense(tag: &str) -> Option<VerbTense> {
    if let Some(caps) = VERB_TENSE_COMPOUND_RE.captures(tag) {
        return VerbTense::from_label(caps.get(1)?.as_str());
    }
    if let Some(caps) = VERB_TENSE_SIMPLE_RE.captures(tag) {
        return VerbTense::from_label(caps.get(1)?.as_str());
    }
    None
}

/// Extracts the grammatical mood of a verb form.
#[must_use]
pub fn verb_mood(tag: &str) -> Option<VerbMood> {
    let caps = VERB_MOOD_RE.captures(tag)?;
    match caps.get(1)?.as_str() {
        "indic" => Some(VerbMood::Indic),
        "cond" => Some(VerbMood::Cond),
        "imper" => Some(VerbMood::Imper),
        "quot" => Some(VerbMood::Quot),
        _ => None,
    }
}

/// Extracts the syntactic function, the **last** `@…` token of the tag
/// (e.g. `@FMV`, `@OBJ`).
#[must_use]
pub fn syntactic_function(tag: &str) -> Option<&str> {
    tag.split_whitespace().rev().find(|t| t.starts_with('@'))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FINITE_VERB: &str = r#""lähe" Lb V main indic impf ps3 sg ps af @FMV"#;
    const NOUN: &str = r#""mees" L0 S com sg nom @SUBJ"#;
    const COMMA: &str = r#""," Z Com CLB"#;
    const PARTICIPLE: &str = r#""lahku" Lnud V main partic past ps @IMV"#;

    #[test]
    fn test_lemma() {
        assert_eq!(lemma(FINITE_VERB), Some("lähe"));
        assert_eq!(lemma(NOUN), Some("mees"));
        assert_eq!(lemma(COMMA), None);
    }

    #[test]
    fn test_pos_lexical_and_punct() {
        assert_eq!(pos(FINITE_VERB).unwrap(), "V");
        assert_eq!(pos(NOUN).unwrap(), "S");
        assert_eq!(pos(COMMA).unwrap(), "Z");
        assert!(pos("garbage with no quotes").is_err());
    }

    #[test]
    fn test_verb_type() {
        assert_eq!(verb_type(FINITE_VERB), Some(VerbType::Main));
        assert_eq!(verb_type(PARTICIPLE), Some(VerbType::Partic));
        assert_eq!(
            verb_type(r#""saa" Lks V aux indic impf @FCV"#),
            Some(VerbType::Aux)
        );
        assert_eq!(verb_type(NOUN), None);
    }

    #[test]
    fn test_verb_tense_compound_wins() {
        assert_eq!(verb_tense(PARTICIPLE), Some(VerbTense::ParticPast));
        assert_eq!(verb_tense(FINITE_VERB), Some(VerbTense::Impf));
        assert_eq!(
            verb_tense(r#""ole" Lks V main cond past ps @FMV"#),
            Some(VerbTense::CondPast)
        );
        assert_eq!(verb_tense(NOUN), None);
    }

    #[test]
    fn test_verb_mood() {
        assert_eq!(verb_mood(FINITE_VERB), Some(VerbMood::Indic));
        assert_eq!(verb_mood(NOUN), None);
    }

    #[test]
    fn test_syntactic_function_takes_last() {
        assert_eq!(syntactic_function(FINITE_VERB), Some("@FMV"));
        assert_eq!(syntactic_function(COMMA), None);
        // two functions on one tag: the rightmost is authoritative
        let tagged = r#""ole" Lnud V main partic past @IMV @FMV"#;
        assert_eq!(syntactic_function(tagged), Some("@FMV"));
    }
}
