//! A backend implementing database_backend done via SQLite.

use std::collections::BTreeSet;
use std::path::Path;
use rusqlite::{params, Connection, OptionalExtension, Row};
use rusqlite::types::Type;
use crate::database_backend::{AddedSentence, CandidateSentence, KnownSentence, LevelUpdate, RecommendationLimits, SegmentedSentence, Sentence, SentenceId, StudyDatabaseBackend};

const SCHEMA : &str = include_str!("schema.sql");

pub struct SqliteDatabaseBackend {
    connection : Connection,
}

/// Translations are stored as a JSON array of strings.
fn translations(row:&Row,idx:usize) -> rusqlite::Result<Vec<String>> {
    let text : String = row.get(idx)?;
    serde_json::from_str(&text).map_err(|e|rusqlite::Error::FromSqlConversionFailure(idx,Type::Text,Box::new(e)))
}

impl StudyDatabaseBackend for SqliteDatabaseBackend {
    fn sentences_to_segment(&self) -> anyhow::Result<Vec<Sentence>> {
        let mut stmt = self.connection.prepare(
            "SELECT id, jpn, translations FROM sentences s
              WHERE NOT EXISTS (SELECT 1 FROM sentence_words sw WHERE sw.s_id = s.id)
              ORDER BY id")?;
        let res = stmt.query_map([],|row| Ok(Sentence{ id: SentenceId(row.get(0)?), japanese: row.get(1)?, translations: translations(row,2)? }))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(res)
    }

    fn store_segmented_batch(&mut self, batch: &[SegmentedSentence]) -> anyhow::Result<()> {
        let tx = self.connection.transaction()?;
        {
            let mut intern = tx.prepare_cached("INSERT OR IGNORE INTO features(feature) VALUES (?1)")?;
            let mut lookup = tx.prepare_cached("SELECT id FROM features WHERE feature = ?1")?;
            let mut insert = tx.prepare_cached("INSERT INTO sentence_words(s_id, idx, word, f_id) VALUES (?1, ?2, ?3, ?4)")?;
            for sentence in batch {
                for (idx,occurrence) in sentence.occurrences.iter().enumerate() {
                    intern.execute(params![occurrence.feature])?;
                    let f_id : i64 = lookup.query_row(params![occurrence.feature],|row|row.get(0))?;
                    insert.execute(params![sentence.sentence_id.0,idx as i64,occurrence.surface,f_id])?;
                }
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn rebuild_feature_frequency(&mut self) -> anyhow::Result<usize> {
        let tx = self.connection.transaction()?;
        tx.execute("DELETE FROM features_count",[])?;
        let counted = tx.execute(
            "INSERT INTO features_count(f_id, n)
             SELECT f_id, count(*) FROM sentence_words WHERE lvl IS NULL GROUP BY f_id",[])?;
        tx.commit()?;
        Ok(counted)
    }

    fn added_sentences(&self) -> anyhow::Result<Vec<AddedSentence>> {
        let mut stmt = self.connection.prepare("SELECT lvl, jpn FROM added_sentences ORDER BY lvl")?;
        let res = stmt.query_map([],|row| Ok(AddedSentence{ level: row.get(0)?, japanese: row.get(1)? }))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(res)
    }

    fn mark_features_known(&mut self, features: &BTreeSet<String>, japanese: &str) -> anyhow::Result<Option<LevelUpdate>> {
        let tx = self.connection.transaction()?;
        let level : i64 = tx.query_row("SELECT COALESCE(MAX(lvl), -1) + 1 FROM sentence_words",[],|row|row.get(0))?;
        let mut rows = 0;
        {
            let mut lookup = tx.prepare_cached("SELECT id FROM features WHERE feature = ?1")?;
            let mut update = tx.prepare_cached("UPDATE sentence_words SET lvl = ?1 WHERE f_id = ?2 AND lvl IS NULL")?;
            for feature in features {
                if let Some(f_id) = lookup.query_row(params![feature],|row|row.get::<_,i64>(0)).optional()? {
                    rows+=update.execute(params![level,f_id])?;
                }
            }
        }
        if rows==0 {
            tx.rollback()?;
            return Ok(None);
        }
        tx.execute("INSERT INTO added_sentences(lvl, jpn) VALUES (?1, ?2)",params![level,japanese])?;
        tx.commit()?;
        tracing::debug!(level,rows,"new level");
        Ok(Some(LevelUpdate{ level, rows }))
    }

    fn sentences_you_should_know(&self) -> anyhow::Result<Vec<KnownSentence>> {
        let mut stmt = self.connection.prepare(
            "SELECT t.l, s.jpn, s.translations
               FROM (SELECT s_id, MAX(lvl) AS l
                       FROM sentence_words
                      GROUP BY s_id
                     HAVING COUNT(CASE WHEN lvl IS NULL THEN 1 END) = 0) t
               JOIN sentences s ON t.s_id = s.id
              ORDER BY t.l, s.id")?;
        let res = stmt.query_map([],|row| Ok(KnownSentence{ level: row.get(0)?, japanese: row.get(1)?, translations: translations(row,2)? }))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(res)
    }

    fn sentences_you_may_know(&self, limits: RecommendationLimits) -> anyhow::Result<Vec<CandidateSentence>> {
        // Words that occur in very many sentences would fill the report, so only a few random sentences per (d, freq) are shown.
        let mut stmt = self.connection.prepare(
            "SELECT freq, d, jpn, translations
               FROM (SELECT t.freq, t.d, s.jpn, s.translations,
                            ROW_NUMBER() OVER (PARTITION BY t.d, t.freq ORDER BY RANDOM()) AS rn
                       FROM (SELECT sw.s_id,
                                    SUM(CASE WHEN sw.lvl IS NULL THEN COALESCE(fc.n, 0) ELSE 0 END) AS freq,
                                    COUNT(CASE WHEN sw.lvl IS NULL THEN 1 END) AS d
                               FROM sentence_words sw
                               LEFT JOIN features_count fc ON sw.f_id = fc.f_id
                              GROUP BY sw.s_id
                             HAVING COUNT(CASE WHEN sw.lvl IS NULL THEN 1 END) > 0) t
                       JOIN sentences s ON t.s_id = s.id)
              WHERE rn <= ?1
              ORDER BY d, freq DESC, rn
              LIMIT ?2")?;
        let res = stmt.query_map(params![limits.per_bucket as i64,limits.total as i64],|row| Ok(CandidateSentence{
                frequency: row.get(0)?,
                unknown_words: row.get(1)?,
                japanese: row.get(2)?,
                translations: translations(row,3)?,
            }))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(res)
    }

    fn clear_all_reinitialize(&mut self) -> anyhow::Result<()> {
        let tx = self.connection.transaction()?;
        tx.execute_batch(
            "DELETE FROM added_sentences;
             DELETE FROM features_count;
             DELETE FROM sentence_words;
             DELETE FROM features;")?;
        tx.commit()?;
        Ok(())
    }
}

impl SqliteDatabaseBackend {
    pub const STD_FILE_NAME : &'static str = "jsentences.sqlite";

    /// Open (creating if need be) a database file.
    pub fn open<P:AsRef<Path>>(path:P) -> anyhow::Result<Self> {
        Self::new(Connection::open(path)?)
    }

    /// A database that lives as long as the value does. Used for testing.
    pub fn open_in_memory() -> anyhow::Result<Self> {
        Self::new(Connection::open_in_memory()?)
    }

    /// Wrap a connection, creating any missing tables.
    pub fn new(connection:Connection) -> anyhow::Result<Self> {
        connection.execute_batch("PRAGMA foreign_keys = ON;")?;
        connection.execute_batch(SCHEMA)?;
        Ok(SqliteDatabaseBackend{connection})
    }

    /// Add a sentence to the corpus. If id is None, one is chosen.
    pub fn insert_sentence(&mut self,id:Option<SentenceId>,japanese:&str,translations:&[String]) -> anyhow::Result<SentenceId> {
        self.connection.execute(
            "INSERT INTO sentences(id, jpn, translations) VALUES (?1, ?2, ?3)",
            params![id.map(|id|id.0),japanese,serde_json::to_string(translations)?])?;
        Ok(SentenceId(self.connection.last_insert_rowid()))
    }

    /// Replace the stored text of a sentence. Only useful for repairing (or, in tests, damaging) the corpus.
    pub fn update_sentence_text(&mut self,id:SentenceId,japanese:&str) -> anyhow::Result<bool> {
        Ok(self.connection.execute("UPDATE sentences SET jpn = ?1 WHERE id = ?2",params![japanese,id.0])?>0)
    }

    /// The level of each word in a sentence, in order. Mainly used for debugging.
    pub fn sentence_words(&self,id:SentenceId) -> anyhow::Result<Vec<(String,Option<i64>)>> {
        let mut stmt = self.connection.prepare("SELECT word, lvl FROM sentence_words WHERE s_id = ?1 ORDER BY idx")?;
        let res = stmt.query_map(params![id.0],|row| Ok((row.get(0)?,row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(res)
    }

    /// Number of distinct features seen.
    pub fn feature_count(&self) -> anyhow::Result<usize> {
        let n : i64 = self.connection.query_row("SELECT COUNT(*) FROM features",[],|row|row.get(0))?;
        Ok(n as usize)
    }

    /// The stored unknown-occurrence count for a feature, if it has one.
    pub fn feature_frequency(&self,feature:&str) -> anyhow::Result<Option<i64>> {
        Ok(self.connection.query_row(
            "SELECT fc.n FROM features_count fc JOIN features f ON f.id = fc.f_id WHERE f.feature = ?1",
            params![feature],|row|row.get(0)).optional()?)
    }
}
