//! A Japanese sentence study database.
//!
//! Sentences from a corpus are segmented into words by a [tagger::Tagger]. The user adds sentences
//! they understand, which marks the words in them as known, and the database then suggests
//! which sentences to study next.

pub mod features;
pub mod tagger;
pub mod mecab;
pub mod database_backend;
pub mod sqlite_database_backend;
pub mod segmentation;
pub mod knowledge;
pub mod config;
