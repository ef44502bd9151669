//! Morphological feature vectors as printed by MeCab, e.g.
//! `名詞,一般,*,*,*,*,猫,ネコ,ネコ`.
//!
//! A feature vector (not the surface text) is the unit of knowledge: two
//! tokens with the same normalized feature string are the same word used the same way.

use std::fmt;
use csv::ReaderBuilder;
use serde::{Serialize,Deserialize};

#[derive(Debug, thiserror::Error)]
#[error("could not parse feature string {text:?}: {source}")]
pub struct FeatureParseError {
    pub text : String,
    #[source]
    pub source : csv::Error,
}

#[derive(Clone,Debug,Eq,PartialEq,Hash,Serialize,Deserialize)]
pub struct FeatureVector(pub Vec<String>);

impl FeatureVector {
    /// Index of the dictionary (base) form in an IPADIC style feature vector.
    pub const LEMMA_SLOT : usize = 6;
    /// What the tagger puts in a slot it has no value for. In the lemma slot it means the word is not in the dictionary.
    pub const PLACEHOLDER : &'static str = "*";

    /// Parse a comma separated feature string. Fields may be quoted if they contain commas.
    pub fn parse(text:&str) -> Result<Self,FeatureParseError> {
        let mut reader = ReaderBuilder::new().flexible(true).has_headers(false).from_reader(text.as_bytes());
        match reader.records().next() {
            Some(Ok(record)) => Ok(FeatureVector(record.iter().map(|s|s.to_string()).collect())),
            Some(Err(source)) => Err(FeatureParseError{text:text.to_string(),source}),
            None => Ok(FeatureVector(vec![])),
        }
    }

    pub fn lemma(&self) -> Option<&str> {
        self.0.get(Self::LEMMA_SLOT).map(|s|s.as_str())
    }

    /// True if the tagger did not find the word in its dictionary.
    pub fn is_unknown_word(&self) -> bool {
        self.lemma()==Some(Self::PLACEHOLDER)
    }

    /// Unknown words all share the same feature vector, which would make every unknown word the same word.
    /// Replace the placeholder lemma by the placeholder followed by the surface form so they stay distinct.
    /// Vectors too short to have a lemma slot are returned unchanged.
    pub fn normalized(&self,surface:&str) -> FeatureVector {
        let mut res = self.clone();
        if self.is_unknown_word() {
            res.0[Self::LEMMA_SLOT] = format!("{}{}",Self::PLACEHOLDER,surface);
        }
        res
    }
}

fn needs_quotes(field:&str) -> bool {
    field.contains(|c| c==',' || c=='"' || c=='\n' || c=='\r')
}

impl fmt::Display for FeatureVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i,field) in self.0.iter().enumerate() {
            if i>0 { f.write_str(",")?; }
            if needs_quotes(field) {
                write!(f,"\"{}\"",field.replace('"',"\"\""))?;
            } else {
                f.write_str(field)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_word_is_unchanged() {
        let features = FeatureVector::parse("名詞,一般,*,*,*,*,猫,ネコ,ネコ").unwrap();
        assert_eq!(features.lemma(),Some("猫"));
        assert!(!features.is_unknown_word());
        assert_eq!(features.normalized("猫").to_string(),"名詞,一般,*,*,*,*,猫,ネコ,ネコ");
    }

    #[test]
    fn unknown_words_get_their_surface_in_the_lemma() {
        let features = FeatureVector::parse("名詞,固有名詞,組織,*,*,*,*").unwrap();
        assert!(features.is_unknown_word());
        let a = features.normalized("スコモ");
        let b = features.normalized("ジャーゴン");
        assert_eq!(a.to_string(),"名詞,固有名詞,組織,*,*,*,*スコモ");
        assert_ne!(a,b);
        // normalizing does not change the input.
        assert_eq!(features.lemma(),Some("*"));
    }

    #[test]
    fn placeholders_outside_the_lemma_slot_do_not_matter() {
        let features = FeatureVector::parse("助詞,格助詞,一般,*,*,*,が,ガ,ガ").unwrap();
        assert_eq!(features.normalized("が"),features);
    }

    #[test]
    fn short_vectors_are_left_alone() {
        let features = FeatureVector::parse("記号,*,*").unwrap();
        assert_eq!(features.lemma(),None);
        assert_eq!(features.normalized("、").to_string(),"記号,*,*");
    }

    #[test]
    fn quoted_fields_survive() {
        let features = FeatureVector::parse("記号,読点,*,*,*,*,\"，,\",*,*").unwrap();
        assert_eq!(features.0.len(),9);
        assert_eq!(features.0[6],"，,");
        assert_eq!(features.to_string(),"記号,読点,*,*,*,*,\"，,\",*,*");
    }

    #[test]
    fn empty_string() {
        assert_eq!(FeatureVector::parse("").unwrap(),FeatureVector(vec![]));
    }
}
