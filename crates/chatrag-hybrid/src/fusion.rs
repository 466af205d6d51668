//! Reciprocal Rank Fusion.
//!
//! `score(id) = Σ 1 / (k_rrf + rank + 1)` over the lists containing `id`,
//! with `rank` the 0-based position. Raw producer scores are ignored.

use std::collections::{HashMap, HashSet};

use chatrag_core::types::{DomainId, SearchHit, SourceKind};

/// Damping constant from Cormack, Clarke and Buettcher (SIGIR 2009).
pub const RRF_K: usize = 60;

/// Fuse two ranked lists and keep the best `k`.
pub fn fuse(list_a: &[SearchHit], list_b: &[SearchHit], k: usize, k_rrf: usize) -> Vec<SearchHit> {
    fuse_lists(&[list_a, list_b], k, k_rrf)
}

/// Fuse any number of ranked lists.
///
/// An id repeated within one list contributes only at its first position;
/// later positions keep their original rank.
/// Output is ordered by fused score descending, ties by id ascending.
pub fn fuse_lists(lists: &[&[SearchHit]], k: usize, k_rrf: usize) -> Vec<SearchHit> {
    let mut scores: HashMap<DomainId, f64> = HashMap::new();
    for list in lists {
        let mut seen = HashSet::new();
        for (rank, hit) in list.iter().enumerate() {
            if seen.insert(hit.id) {
                *scores.entry(hit.id).or_insert(0.0) += 1.0 / (k_rrf as f64 + rank as f64 + 1.0);
            }
        }
    }

    let mut fused: Vec<(DomainId, f64)> = scores.into_iter().collect();
    fused.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    fused.truncate(k);
    fused.into_iter().map(|(id, s)| SearchHit::new(id, s as f32, SourceKind::Fused)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(ids: &[DomainId], source: SourceKind) -> Vec<SearchHit> {
        ids.iter()
            .enumerate()
            .map(|(i, &id)| SearchHit::new(id, 1.0 - i as f32 * 0.1, source))
            .collect()
    }

    fn ids(hits: &[SearchHit]) -> Vec<DomainId> {
        hits.iter().map(|h| h.id).collect()
    }

    #[test]
    fn shared_ids_rank_first() {
        let dense = list(&[1, 2, 3], SourceKind::Dense);
        let lexical = list(&[3, 1, 4], SourceKind::Lexical);
        let fused = fuse(&dense, &lexical, 10, RRF_K);
        let top: Vec<_> = ids(&fused).into_iter().take(2).collect();
        assert!(top.contains(&1) && top.contains(&3));
        assert_eq!(fused.len(), 4);
        assert!(fused.iter().all(|h| h.source == SourceKind::Fused));
    }

    #[test]
    fn presence_in_both_lists_dominates() {
        // A at rank 0 in both, B at rank 0 in one only
        let dense = list(&[10], SourceKind::Dense);
        let fused = fuse(&dense, &list(&[20], SourceKind::Lexical), 10, RRF_K);
        assert_eq!(ids(&fused), vec![10, 20]);

        let dense = list(&[10, 30], SourceKind::Dense);
        let fused = fuse(&dense, &list(&[10], SourceKind::Lexical), 10, RRF_K);
        assert_eq!(ids(&fused), vec![10, 30]);
        let both = 2.0 / 61.0;
        assert!((f64::from(fused[0].score) - both).abs() < 1e-6);
    }

    #[test]
    fn scores_follow_formula() {
        let fused = fuse(&list(&[5, 6], SourceKind::Dense), &[], 10, RRF_K);
        assert!((f64::from(fused[0].score) - 1.0 / 61.0).abs() < 1e-7);
        assert!((f64::from(fused[1].score) - 1.0 / 62.0).abs() < 1e-7);
    }

    #[test]
    fn empty_second_list_yields_first_ranking() {
        let dense = list(&[7, 3, 9, 1], SourceKind::Dense);
        let fused = fuse(&dense, &[], 3, RRF_K);
        assert_eq!(ids(&fused), vec![7, 3, 9]);
    }

    #[test]
    fn equal_scores_break_on_lower_id() {
        let dense = list(&[9], SourceKind::Dense);
        let fused = fuse(&dense, &list(&[4], SourceKind::Lexical), 10, RRF_K);
        assert_eq!(ids(&fused), vec![4, 9]);
    }

    #[test]
    fn duplicate_in_one_list_counts_once() {
        let dense = vec![
            SearchHit::new(1, 0.9, SourceKind::Dense),
            SearchHit::new(1, 0.8, SourceKind::Dense),
            SearchHit::new(2, 0.7, SourceKind::Dense),
        ];
        let fused = fuse(&dense, &[], 10, RRF_K);
        assert_eq!(ids(&fused), vec![1, 2]);
        assert!((f64::from(fused[1].score) - 1.0 / 63.0).abs() < 1e-7);
    }

    #[test]
    fn k_zero_and_empty_inputs() {
        assert!(fuse(&list(&[1], SourceKind::Dense), &[], 0, RRF_K).is_empty());
        assert!(fuse(&[], &[], 5, RRF_K).is_empty());
    }

    #[test]
    fn three_lists_accumulate() {
        let a = list(&[1, 2], SourceKind::Dense);
        let b = list(&[2, 1], SourceKind::Lexical);
        let c = list(&[2], SourceKind::Lexical);
        let fused = fuse_lists(&[&a, &b, &c], 10, RRF_K);
        assert_eq!(ids(&fused), vec![2, 1]);
    }

    #[test]
    fn huge_rrf_constant_does_not_overflow() {
        let a = list(&[3, 1], SourceKind::Dense);
        let b = list(&[1], SourceKind::Lexical);
        let fused = fuse(&a, &b, 10, usize::MAX);
        assert_eq!(fused.len(), 2);
        assert_eq!(fused[0].id, 1);
        assert!(fused.iter().all(|h| h.score > 0.0 && h.score.is_finite()));
    }
}
