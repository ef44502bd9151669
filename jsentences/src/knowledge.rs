//! Tracking what the user knows.
//!
//! Each time the user says they understand a sentence, every feature in it becomes known,
//! everywhere in the corpus, at a new level. Levels count up from 0.

use std::collections::BTreeSet;
use serde::Serialize;
use crate::database_backend::StudyDatabaseBackend;
use crate::tagger::Tagger;

#[derive(Copy,Clone,Debug,Eq,PartialEq,Serialize)]
pub enum AddOutcome {
    /// The same text was added before. Nothing was done.
    AlreadyAdded,
    /// Every word in the sentence was already known, so no level was created.
    NothingNew,
    /// A new level was created.
    Added { level : i64, rows : usize },
}

/// The set of normalized features in some text.
pub fn features_in<T:Tagger+?Sized>(tagger:&T,text:&str) -> anyhow::Result<BTreeSet<String>> {
    Ok(tagger.tag(text)?.iter().map(|t|t.normalized_feature()).collect())
}

fn checked(sentence:&str) -> anyhow::Result<&str> {
    let sentence = sentence.trim();
    if sentence.is_empty() { anyhow::bail!("Empty sentence"); }
    Ok(sentence)
}

/// Whether exactly this text has been added before.
pub fn already_added<D:StudyDatabaseBackend+?Sized>(db:&D,sentence:&str) -> anyhow::Result<bool> {
    let sentence = sentence.trim();
    Ok(db.added_sentences()?.iter().any(|added|added.japanese==sentence))
}

/// Record that the user understands `sentence`, which need not be in the corpus.
pub fn add_understood_sentence<D:StudyDatabaseBackend+?Sized,T:Tagger+?Sized>(db:&mut D,tagger:&T,sentence:&str) -> anyhow::Result<AddOutcome> {
    let sentence = checked(sentence)?;
    if already_added(db,sentence)? {
        tracing::info!(sentence,"already added");
        return Ok(AddOutcome::AlreadyAdded);
    }
    let features = features_in(tagger,sentence)?;
    record(db,sentence,&features)
}

/// As [add_understood_sentence], with the features already worked out by [features_in].
/// Lets the caller tag without holding on to the database.
pub fn add_understood_features<D:StudyDatabaseBackend+?Sized>(db:&mut D,sentence:&str,features:&BTreeSet<String>) -> anyhow::Result<AddOutcome> {
    let sentence = checked(sentence)?;
    if already_added(db,sentence)? {
        tracing::info!(sentence,"already added");
        return Ok(AddOutcome::AlreadyAdded);
    }
    record(db,sentence,features)
}

fn record<D:StudyDatabaseBackend+?Sized>(db:&mut D,sentence:&str,features:&BTreeSet<String>) -> anyhow::Result<AddOutcome> {
    Ok(match db.mark_features_known(features,sentence)? {
        Some(update) => {
            tracing::info!(sentence,level=update.level,rows=update.rows,"added sentence");
            AddOutcome::Added{ level: update.level, rows: update.rows }
        }
        None => {
            tracing::info!(sentence,"nothing new learned");
            AddOutcome::NothingNew
        }
    })
}
