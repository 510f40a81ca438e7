//! Cosine-similarity ranking over stored embeddings (spec §4.12, C12).

use crate::store::RecordStore;
use docvault_core::{Error, Record, RecordId, Result};
use rayon::prelude::*;
use std::cmp::Ordering;

/// One scored hit from [`RecordStore::rank_by_similarity`].
#[derive(Debug, Clone, PartialEq)]
pub struct RankedMatch {
    pub id: RecordId,
    pub score: f32,
}

impl RecordStore {
    /// Scores every record whose `embedding` is present and whose folder
    /// matches `folder_scope` (recursively) against `query`, returning the
    /// top `k` by cosine similarity. Ties break by most-recent `updated_at`
    /// then lexicographic id (spec §4.12).
    ///
    /// Fails `Corrupt` if `query`'s length disagrees with the dimensionality
    /// already established by a stored embedding — the store's fixed
    /// dimensionality is discovered, not configured.
    pub fn rank_by_similarity(
        &self,
        query: &[f32],
        folder_scope: Option<&str>,
        k: usize,
    ) -> Result<Vec<RankedMatch>> {
        let candidate_ids = {
            let index = self.index.read();
            match folder_scope {
                Some(folder) => index.list(folder, true),
                None => index.iter().map(|(id, _)| id.clone()).collect(),
            }
        };

        let records: Vec<Record> = candidate_ids
            .iter()
            .filter_map(|id| self.get(id).ok())
            .filter(|r| r.embedding.is_some())
            .collect();

        if let Some(dim) = records.first().and_then(|r| r.embedding.as_ref().map(Vec::len)) {
            if dim != query.len() {
                return Err(Error::Corrupt(format!(
                    "query dimensionality {} does not match stored embedding dimensionality {dim}",
                    query.len()
                )));
            }
        }

        let mut scored: Vec<(RankedMatch, chrono::DateTime<chrono::Utc>)> = records
            .par_iter()
            .filter_map(|r| {
                let embedding = r.embedding.as_ref()?;
                if embedding.len() != query.len() {
                    return None;
                }
                let score = cosine_similarity(query, embedding);
                Some((RankedMatch { id: r.id.clone(), score }, r.updated_at))
            })
            .collect();

        scored.sort_by(|(a, a_time), (b, b_time)| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b_time.cmp(a_time))
                .then_with(|| a.id.as_str().cmp(b.id.as_str()))
        });
        scored.truncate(k);

        Ok(scored.into_iter().map(|(m, _)| m).collect())
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
