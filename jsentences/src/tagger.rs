//! Code to split sentences into tokens, each with a morphological feature vector.
//!
//! The [Tagger] trait is what the rest of the crate uses. [crate::mecab::MecabProcess] is the
//! real implementation; [DictionaryTagger] is a simple in-process one, useful for testing
//! or when MeCab is not installed.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use csv::ReaderBuilder;
use crate::features::{FeatureParseError, FeatureVector};

/// A token as produced by the tagger.
#[derive(Clone,Debug,Eq,PartialEq)]
pub struct Token {
    pub surface : String,
    pub features : FeatureVector,
}

impl Token {
    /// The feature string used as the identity of this word in the database.
    pub fn normalized_feature(&self) -> String {
        self.features.normalized(&self.surface).to_string()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TaggerError {
    #[error("could not start tagger {program}: {source}")]
    Spawn { program : String, #[source] source : std::io::Error },
    #[error("tagger i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("tagger process died")]
    SubprocessDied,
    #[error("tagger did not answer within {0:?}")]
    Timeout(Duration),
    #[error("malformed tagger output line {0:?}")]
    Malformed(String),
    #[error(transparent)]
    Features(#[from] FeatureParseError),
    #[error("tagger is unusable after an earlier failure")]
    Broken,
    #[error("could not load lexicon: {0}")]
    Lexicon(#[from] csv::Error),
}

/// Something that can segment Japanese text.
pub trait Tagger {
    /// Segment text. Lines are separated by `\n`; the result has one token list per line.
    fn tag_lines(&self,text:&str) -> Result<Vec<Vec<Token>>,TaggerError>;

    /// Segment text, all lines run together.
    fn tag(&self,text:&str) -> Result<Vec<Token>,TaggerError> {
        Ok(self.tag_lines(text)?.into_iter().flatten().collect())
    }
}

impl <T:Tagger+?Sized> Tagger for Box<T> {
    fn tag_lines(&self, text: &str) -> Result<Vec<Vec<Token>>, TaggerError> { (**self).tag_lines(text) }
}

/// A greedy longest-match tagger over a fixed lexicon.
/// Text not matching anything in the lexicon is grouped into unknown words, up to the next
/// known word or whitespace.
pub struct DictionaryTagger {
    lexicon : HashMap<String,FeatureVector>,
    longest_entry : usize, // in chars
    unknown : FeatureVector,
}

impl DictionaryTagger {
    /// Features given to text not in the lexicon. The lemma slot is the placeholder, as MeCab does.
    pub const UNKNOWN_FEATURES : &'static str = "名詞,一般,*,*,*,*,*";

    pub fn new<I,S>(entries:I) -> Self where I:IntoIterator<Item=(S,FeatureVector)>, S:Into<String> {
        let mut lexicon = HashMap::new();
        let mut longest_entry = 0;
        for (surface,features) in entries {
            let surface = surface.into();
            if surface.is_empty() { continue; }
            longest_entry=longest_entry.max(surface.chars().count());
            lexicon.insert(surface,features);
        }
        DictionaryTagger{ lexicon, longest_entry, unknown: FeatureVector(Self::UNKNOWN_FEATURES.split(',').map(|s|s.to_string()).collect()) }
    }

    /// Build from (surface, comma separated features) pairs.
    pub fn from_strs<'a,I>(entries:I) -> Result<Self,TaggerError> where I:IntoIterator<Item=(&'a str,&'a str)> {
        let mut parsed = vec![];
        for (surface,features) in entries {
            parsed.push((surface,FeatureVector::parse(features)?));
        }
        Ok(Self::new(parsed))
    }

    /// Load a csv lexicon, one word per line: the surface form followed by the feature fields.
    pub fn load<P:AsRef<Path>>(path:P) -> Result<Self,TaggerError> {
        let mut entries = vec![];
        let mut reader = ReaderBuilder::new().flexible(true).has_headers(false).from_path(path)?;
        for result in reader.records() {
            let record = result?;
            let mut fields = record.iter();
            if let Some(surface) = fields.next() {
                entries.push((surface.to_string(),FeatureVector(fields.map(|s|s.to_string()).collect())));
            }
        }
        tracing::debug!(entries=entries.len(),"loaded lexicon");
        Ok(Self::new(entries))
    }

    pub fn len(&self) -> usize { self.lexicon.len() }
    pub fn is_empty(&self) -> bool { self.lexicon.is_empty() }

    /// find the longest lexicon entry that s starts with, returning the entry and the length consumed in bytes.
    fn find_word_starting(&self,s:&str) -> Option<(&str,&FeatureVector)> {
        let ends : Vec<usize> = s.char_indices().skip(1).map(|(pos,_)|pos).chain(std::iter::once(s.len())).take(self.longest_entry).collect();
        for &end in ends.iter().rev() {
            if let Some((surface,features)) = self.lexicon.get_key_value(&s[..end]) {
                return Some((surface.as_str(),features));
            }
        }
        None
    }

    /// Get the length of the next unknown token: up to whitespace or something in the lexicon.
    fn len_unknown_token(&self,s:&str) -> usize {
        for (pos,c) in s.char_indices().skip(1) {
            if c.is_whitespace() || self.find_word_starting(&s[pos..]).is_some() { return pos; }
        }
        s.len()
    }

    fn tag_line(&self,line:&str) -> Vec<Token> {
        let mut parts = vec![];
        let mut left = line.trim_start();
        while !left.is_empty() {
            let used = if let Some((surface,features)) = self.find_word_starting(left) {
                parts.push(Token{ surface: surface.to_string(), features: features.clone() });
                surface.len()
            } else {
                let len = self.len_unknown_token(left);
                parts.push(Token{ surface: left[..len].to_string(), features: self.unknown.clone() });
                len
            };
            left=left[used..].trim_start();
        }
        parts
    }
}

impl Tagger for DictionaryTagger {
    fn tag_lines(&self, text: &str) -> Result<Vec<Vec<Token>>, TaggerError> {
        Ok(text.split('\n').map(|line|self.tag_line(line)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_LEXICON : &[(&str,&str)] = &[
        ("私","名詞,代名詞,一般,*,*,*,私,ワタシ,ワタシ"),
        ("は","助詞,係助詞,*,*,*,*,は,ハ,ワ"),
        ("猫","名詞,一般,*,*,*,*,猫,ネコ,ネコ"),
        ("猫舌","名詞,一般,*,*,*,*,猫舌,ネコジタ,ネコジタ"),
        ("です","助動詞,*,*,*,特殊・デス,基本形,です,デス,デス"),
        ("が","助詞,格助詞,一般,*,*,*,が,ガ,ガ"),
        ("好き","名詞,形容動詞語幹,*,*,*,*,好き,スキ,スキ"),
    ];

    fn surfaces(tokens:&[Token]) -> Vec<&str> { tokens.iter().map(|t|t.surface.as_str()).collect() }

    #[test]
    fn longest_match_wins() {
        let tagger = DictionaryTagger::from_strs(TEST_LEXICON.iter().copied()).unwrap();
        assert_eq!(surfaces(&tagger.tag("猫舌です").unwrap()),vec!["猫舌","です"]);
        assert_eq!(surfaces(&tagger.tag("猫が好きです").unwrap()),vec!["猫","が","好き","です"]);
    }

    #[test]
    fn unknown_text_is_grouped_up_to_the_next_known_word() {
        let tagger = DictionaryTagger::from_strs(TEST_LEXICON.iter().copied()).unwrap();
        let tokens = tagger.tag("ポチは犬です").unwrap();
        assert_eq!(surfaces(&tokens),vec!["ポチ","は","犬","です"]);
        assert!(tokens[0].features.is_unknown_word());
        assert_eq!(tokens[0].normalized_feature(),"名詞,一般,*,*,*,*,*ポチ");
        assert_eq!(tokens[1].normalized_feature(),"助詞,係助詞,*,*,*,*,は,ハ,ワ");
    }

    #[test]
    fn whitespace_separates_and_is_dropped() {
        let tagger = DictionaryTagger::from_strs(TEST_LEXICON.iter().copied()).unwrap();
        assert_eq!(surfaces(&tagger.tag(" 私は  Tom です").unwrap()),vec!["私","は","Tom","です"]);
    }

    #[test]
    fn one_result_per_line() {
        let tagger = DictionaryTagger::from_strs(TEST_LEXICON.iter().copied()).unwrap();
        let lines = tagger.tag_lines("私は猫です\n\n猫が好き").unwrap();
        assert_eq!(lines.len(),3);
        assert_eq!(surfaces(&lines[0]),vec!["私","は","猫","です"]);
        assert!(lines[1].is_empty());
        assert_eq!(surfaces(&lines[2]),vec!["猫","が","好き"]);
    }

    #[test]
    fn load_csv_lexicon() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file,"猫,名詞,一般,*,*,*,*,猫,ネコ,ネコ").unwrap();
        writeln!(file,"、,記号,読点,*,*,*,*,\"、\",、,、").unwrap();
        writeln!(file,"です,助動詞,*,*,*,特殊・デス,基本形,です,デス,デス").unwrap();
        let tagger = DictionaryTagger::load(file.path()).unwrap();
        assert_eq!(tagger.len(),3);
        let tokens = tagger.tag("猫、です").unwrap();
        assert_eq!(surfaces(&tokens),vec!["猫","、","です"]);
        assert_eq!(tokens[2].features.lemma(),Some("です"));
    }
}
