use std::collections::BTreeSet;
use serde::{Serialize,Deserialize};
use crate::tagger::Token;

/// Identifier of a sentence in the corpus. Generally imposed by wherever the corpus came from.
#[derive(Copy, Clone,Eq, PartialEq,Ord,PartialOrd,Debug,Hash,Serialize,Deserialize)]
pub struct SentenceId(pub i64);

impl std::fmt::Display for SentenceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { self.0.fmt(f) }
}

/// A sentence from the corpus, with translations into languages the user understands.
#[derive(Clone,Debug,Eq,PartialEq,Serialize,Deserialize)]
pub struct Sentence {
    pub id : SentenceId,
    pub japanese : String,
    pub translations : Vec<String>,
}

/// A sentence the user has said they understand, and the level it created.
#[derive(Clone,Debug,Eq,PartialEq,Serialize,Deserialize)]
pub struct AddedSentence {
    pub level : i64,
    pub japanese : String,
}

/// A sentence all of whose words are known.
#[derive(Clone,Debug,Eq,PartialEq,Serialize,Deserialize)]
pub struct KnownSentence {
    /// The level at which the last of its words became known.
    pub level : i64,
    pub japanese : String,
    pub translations : Vec<String>,
}

/// A sentence with some unknown words.
#[derive(Clone,Debug,Eq,PartialEq,Serialize,Deserialize)]
pub struct CandidateSentence {
    /// How often the unknown words occur, unknown, elsewhere in the corpus. Higher means more useful to learn.
    pub frequency : i64,
    /// The number of unknown words.
    pub unknown_words : i64,
    pub japanese : String,
    pub translations : Vec<String>,
}

/// The result of marking a set of features as known.
#[derive(Copy,Clone,Debug,Eq,PartialEq,Serialize,Deserialize)]
pub struct LevelUpdate {
    pub level : i64,
    /// Number of word occurrences, in the whole corpus, that became known.
    pub rows : usize,
}

/// Bounds on the size of the partially known report.
#[derive(Copy,Clone,Debug,Eq,PartialEq)]
pub struct RecommendationLimits {
    /// At most this many sentences for any given (unknown words, frequency) pair. Stops a single word flooding the report.
    pub per_bucket : usize,
    pub total : usize,
}

impl Default for RecommendationLimits {
    fn default() -> Self { RecommendationLimits{ per_bucket: 5, total: 5000 } }
}

#[derive(Debug, thiserror::Error)]
#[error("sentence {sentence_id} is {expected:?} but the tagger produced {reconstructed:?}")]
pub struct ReconstructionMismatch {
    pub sentence_id : SentenceId,
    pub expected : String,
    pub reconstructed : String,
}

/// One token of a segmented sentence, ready for the database.
#[derive(Clone,Debug,Eq,PartialEq)]
pub struct Occurrence {
    pub surface : String,
    pub feature : String,
}

/// A sentence that has been divided up into tokens, checked to be a faithful division.
#[derive(Clone,Debug,Eq,PartialEq)]
pub struct SegmentedSentence {
    pub(crate) sentence_id : SentenceId,
    pub(crate) occurrences : Vec<Occurrence>,
}

fn without_whitespace<'a>(parts:impl Iterator<Item=&'a str>) -> String {
    parts.flat_map(|s|s.chars()).filter(|c|!c.is_whitespace()).collect()
}

impl SegmentedSentence {
    /// Check that the tokens, joined, are the sentence (whitespace aside). Otherwise something is badly wrong with the tagger or the stored text.
    pub fn new(sentence:&Sentence,tokens:Vec<Token>) -> Result<Self,ReconstructionMismatch> {
        let expected = without_whitespace(std::iter::once(sentence.japanese.as_str()));
        let reconstructed = without_whitespace(tokens.iter().map(|t|t.surface.as_str()));
        if expected!=reconstructed {
            return Err(ReconstructionMismatch{ sentence_id: sentence.id, expected, reconstructed });
        }
        let occurrences = tokens.iter().map(|t|Occurrence{ feature: t.normalized_feature(), surface: t.surface.clone() }).collect();
        Ok(SegmentedSentence{ sentence_id: sentence.id, occurrences })
    }

    pub fn sentence_id(&self) -> SentenceId { self.sentence_id }
    pub fn occurrences(&self) -> &[Occurrence] { &self.occurrences }
}

/// There needs to be a database containing the corpus and what the user knows.
/// Whatever the backend, it should implement the following commands.
pub trait StudyDatabaseBackend {
    /// Sentences with no word occurrences recorded yet, in ascending id order.
    fn sentences_to_segment(&self) -> anyhow::Result<Vec<Sentence>>;

    /// Record the occurrences of a batch of segmented sentences, all unknown, in a single transaction.
    /// Features are created as needed.
    fn store_segmented_batch(&mut self,batch:&[SegmentedSentence]) -> anyhow::Result<()>;

    /// Recompute, from scratch, how many unknown occurrences each feature has. Returns the number of features counted.
    fn rebuild_feature_frequency(&mut self) -> anyhow::Result<usize>;

    /// The sentences added so far, in level order.
    fn added_sentences(&self) -> anyhow::Result<Vec<AddedSentence>>;

    /// Mark every unknown occurrence of the given (normalized) features as known, at a new level, and log
    /// `japanese` as the sentence that created it. If nothing was unknown, nothing is changed and None is returned.
    fn mark_features_known(&mut self,features:&BTreeSet<String>,japanese:&str) -> anyhow::Result<Option<LevelUpdate>>;

    /// Sentences all of whose words are known, easiest (lowest level) first.
    fn sentences_you_should_know(&self) -> anyhow::Result<Vec<KnownSentence>>;

    /// Sentences with unknown words, fewest unknown words first, then most useful first.
    fn sentences_you_may_know(&self,limits:RecommendationLimits) -> anyhow::Result<Vec<CandidateSentence>>;

    /// Delete everything derived from the corpus (occurrences, features, counts, added sentences). The corpus itself stays.
    /// To recreate the database, call this, then [crate::segmentation::segment_all_sentences].
    fn clear_all_reinitialize(&mut self) -> anyhow::Result<()>;
}
