//! Segment the whole corpus into words. Run once after importing sentences, and again after importing more.

use serde::Serialize;
use crate::database_backend::{SegmentedSentence, StudyDatabaseBackend};
use crate::tagger::Tagger;

/// Commit this often, so a crash loses little work while transactions stay a manageable size.
pub const DEFAULT_BATCH_SIZE : usize = 1000;

#[derive(Copy,Clone,Debug,Default,Eq,PartialEq,Serialize)]
pub struct SegmentationReport {
    pub sentences : usize,
    pub occurrences : usize,
    /// Distinct features with unknown occurrences after the run.
    pub features_counted : usize,
}

/// Segment every sentence that has not been segmented before, in id order, then recount feature frequencies.
/// Blank sentences are left alone.
///
/// If a sentence cannot be segmented (the tagger fails, or the tokens do not reproduce the sentence),
/// the sentences before it are committed and the error returned. Nothing of the failing sentence is stored,
/// and a later run will start with it.
pub fn segment_all_sentences<D:StudyDatabaseBackend+?Sized,T:Tagger+?Sized>(db:&mut D,tagger:&T,batch_size:usize) -> anyhow::Result<SegmentationReport> {
    let batch_size = batch_size.max(1);
    // Blank sentences give no tokens, so would never be marked as segmented.
    let (sentences,blank) : (Vec<_>,Vec<_>) = db.sentences_to_segment()?.into_iter().partition(|s|!s.japanese.trim().is_empty());
    if !blank.is_empty() {
        tracing::warn!(blank=blank.len(),"skipping blank sentences");
    }
    tracing::info!(pending=sentences.len(),"segmenting sentences");
    let mut report = SegmentationReport::default();
    let mut batch : Vec<SegmentedSentence> = Vec::with_capacity(batch_size);
    for sentence in &sentences {
        let segmented = tagger.tag(&sentence.japanese).map_err(anyhow::Error::from)
            .and_then(|tokens|SegmentedSentence::new(sentence,tokens).map_err(anyhow::Error::from));
        let segmented = match segmented {
            Ok(segmented) => segmented,
            Err(e) => {
                tracing::error!(sentence=%sentence.id,text=%sentence.japanese,error=%e,"could not segment sentence");
                commit(db,&mut batch,&mut report)?;
                return Err(e);
            }
        };
        tracing::debug!(sentence=%sentence.id,text=%sentence.japanese,tokens=segmented.occurrences().len());
        batch.push(segmented);
        if batch.len()>=batch_size {
            commit(db,&mut batch,&mut report)?;
            tracing::info!(done=report.sentences,of=sentences.len(),"committed batch");
        }
    }
    commit(db,&mut batch,&mut report)?;
    report.features_counted = db.rebuild_feature_frequency()?;
    tracing::info!(sentences=report.sentences,occurrences=report.occurrences,features=report.features_counted,"segmentation finished");
    Ok(report)
}

fn commit<D:StudyDatabaseBackend+?Sized>(db:&mut D,batch:&mut Vec<SegmentedSentence>,report:&mut SegmentationReport) -> anyhow::Result<()> {
    if batch.is_empty() { return Ok(()); }
    db.store_segmented_batch(batch)?;
    report.sentences+=batch.len();
    report.occurrences+=batch.iter().map(|s|s.occurrences().len()).sum::<usize>();
    batch.clear();
    Ok(())
}
