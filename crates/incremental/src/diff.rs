//! Snapshot diffing.
//!
//! Computes the batch of events that turns one ordered snapshot into
//! another. Only single-step edits are pinpointed: one add, one remove, one
//! replace or one relocated element. Anything larger is reported as a
//! single `Reset`, which keeps the scan linear and the fallback
//! well-defined.

use alloc::vec;
use alloc::vec::Vec;
use liveseq_core::{Batch, ChangeEvent, Element};

/// Computes the events transforming `before` into `after`.
///
/// # Example
///
/// ```
/// use liveseq_core::ChangeEvent;
/// use liveseq_incremental::changes;
///
/// assert_eq!(changes(&[1, 2, 3], &[1, 2, 3, 4]), vec![ChangeEvent::add(4, 3)]);
/// assert_eq!(changes(&[1, 2, 3], &[1, 3]), vec![ChangeEvent::remove(2, 1)]);
/// assert_eq!(changes(&[1, 2], &[2, 1]), vec![ChangeEvent::moved(1, 1, 0)]);
/// assert_eq!(changes(&[1, 2, 3], &[3, 2, 1]), vec![ChangeEvent::Reset]);
/// ```
pub fn changes<T: Element>(before: &[T], after: &[T]) -> Batch<T> {
    let (old_len, new_len) = (before.len(), after.len());

    if old_len.abs_diff(new_len) > 1 {
        return vec![ChangeEvent::Reset];
    }

    if new_len == old_len + 1 {
        return match single_insertion(before, after) {
            Some(index) => vec![ChangeEvent::add(after[index].clone(), index)],
            None => vec![ChangeEvent::Reset],
        };
    }

    if old_len == new_len + 1 {
        return match single_insertion(after, before) {
            Some(index) => vec![ChangeEvent::remove(before[index].clone(), index)],
            None => vec![ChangeEvent::Reset],
        };
    }

    same_length_changes(before, after)
}

/// Like [`changes`], but trusts a single already-known raw event when it
/// provably explains the difference.
///
/// The hint is accepted only if it holds exactly one non-reset event and
/// applying that event to `before` yields `after`; otherwise the full diff
/// runs.
pub fn changes_with_hint<T: Element>(before: &[T], after: &[T], hint: &[ChangeEvent<T>]) -> Batch<T> {
    if let [event] = hint {
        if !event.is_reset() && explains(event, before, after) {
            return vec![event.clone()];
        }
    }
    changes(before, after)
}

fn explains<T: Element>(event: &ChangeEvent<T>, before: &[T], after: &[T]) -> bool {
    let mut patched: Vec<T> = before.to_vec();
    event.apply_to(&mut patched).is_ok()
        && patched.len() == after.len()
        && patched.iter().zip(after).all(|(a, b)| a.same(b))
}

/// Returns the index at which `longer` has one extra element compared to
/// `shorter`, if that single insertion explains the whole difference.
fn single_insertion<T: Element>(shorter: &[T], longer: &[T]) -> Option<usize> {
    debug_assert_eq!(shorter.len() + 1, longer.len());

    let index = shorter
        .iter()
        .zip(longer)
        .position(|(a, b)| !a.same(b))
        .unwrap_or(shorter.len());

    let tail_matches = shorter[index..]
        .iter()
        .zip(&longer[index + 1..])
        .all(|(a, b)| a.same(b));

    tail_matches.then_some(index)
}

fn same_length_changes<T: Element>(before: &[T], after: &[T]) -> Batch<T> {
    let first = match before.iter().zip(after).position(|(a, b)| !a.same(b)) {
        Some(i) => i,
        None => return Vec::new(),
    };
    let last = before
        .iter()
        .zip(after)
        .rposition(|(a, b)| !a.same(b))
        .unwrap_or(first);

    if first == last {
        return vec![ChangeEvent::replace(
            after[first].clone(),
            before[first].clone(),
            first,
        )];
    }

    let span_before = &before[first..=last];
    let span_after = &after[first..=last];
    let end = span_before.len() - 1;

    // The element at `first` travelled forward to `last`. An adjacent swap
    // satisfies both directions and is reported this way.
    if span_before[0].same(&span_after[end])
        && span_before[1..].iter().zip(&span_after[..end]).all(|(a, b)| a.same(b))
    {
        return vec![ChangeEvent::moved(before[first].clone(), last, first)];
    }

    // The element at `last` travelled back to `first`.
    if span_before[end].same(&span_after[0])
        && span_before[..end].iter().zip(&span_after[1..]).all(|(a, b)| a.same(b))
    {
        return vec![ChangeEvent::moved(before[last].clone(), first, last)];
    }

    vec![ChangeEvent::Reset]
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::sync::Arc;

    fn apply(before: &[i32], batch: &Batch<i32>) -> Vec<i32> {
        let mut v = before.to_vec();
        for event in batch {
            event.apply_to(&mut v).unwrap();
        }
        v
    }

    #[test]
    fn test_empty_to_empty_is_noop() {
        let empty: [i32; 0] = [];
        assert!(changes(&empty, &empty).is_empty());
    }

    #[test]
    fn test_identical_is_noop() {
        assert!(changes(&[1, 2, 3], &[1, 2, 3]).is_empty());
    }

    #[test]
    fn test_single_add_at_end() {
        let batch = changes(&[1, 2, 3], &[1, 2, 3, 4]);
        assert_eq!(batch, vec![ChangeEvent::add(4, 3)]);
    }

    #[test]
    fn test_single_add_in_middle_and_front() {
        assert_eq!(changes(&[1, 3], &[1, 2, 3]), vec![ChangeEvent::add(2, 1)]);
        assert_eq!(changes(&[2, 3], &[1, 2, 3]), vec![ChangeEvent::add(1, 0)]);
        assert_eq!(changes(&[], &[7]), vec![ChangeEvent::add(7, 0)]);
    }

    #[test]
    fn test_single_remove() {
        assert_eq!(changes(&[1, 2, 3], &[1, 3]), vec![ChangeEvent::remove(2, 1)]);
        assert_eq!(changes(&[1, 2, 3], &[1, 2]), vec![ChangeEvent::remove(3, 2)]);
        assert_eq!(changes(&[5], &[]), vec![ChangeEvent::remove(5, 0)]);
    }

    #[test]
    fn test_add_with_other_changes_is_reset() {
        assert_eq!(changes(&[1, 2, 3], &[9, 2, 3, 4]), vec![ChangeEvent::Reset]);
        assert_eq!(changes(&[1, 2, 3], &[2, 3]).len(), 1);
        assert_eq!(changes(&[1, 2, 3], &[3, 1]), vec![ChangeEvent::Reset]);
    }

    #[test]
    fn test_length_gap_is_reset() {
        assert_eq!(changes(&[1], &[1, 2, 3]), vec![ChangeEvent::Reset]);
        assert_eq!(changes(&[1, 2, 3], &[]), vec![ChangeEvent::Reset]);
    }

    #[test]
    fn test_single_replace() {
        assert_eq!(
            changes(&[1, 2, 3], &[1, 9, 3]),
            vec![ChangeEvent::replace(9, 2, 1)]
        );
    }

    #[test]
    fn test_adjacent_swap_is_move() {
        assert_eq!(changes(&[1, 2], &[2, 1]), vec![ChangeEvent::moved(1, 1, 0)]);
        assert_eq!(
            changes(&[0, 1, 2, 3], &[0, 2, 1, 3]),
            vec![ChangeEvent::moved(1, 2, 1)]
        );
    }

    #[test]
    fn test_distant_move() {
        let before = [1, 2, 3, 4, 5];
        let forward = [2, 3, 4, 1, 5];
        let batch = changes(&before, &forward);
        assert_eq!(batch, vec![ChangeEvent::moved(1, 3, 0)]);
        assert_eq!(apply(&before, &batch), forward.to_vec());

        let backward = [1, 5, 2, 3, 4];
        let batch = changes(&before, &backward);
        assert_eq!(batch, vec![ChangeEvent::moved(5, 1, 4)]);
        assert_eq!(apply(&before, &batch), backward.to_vec());
    }

    #[test]
    fn test_distant_swap_is_reset() {
        assert_eq!(changes(&[1, 2, 3], &[3, 2, 1]), vec![ChangeEvent::Reset]);
    }

    #[test]
    fn test_two_unrelated_replacements_is_reset() {
        assert_eq!(changes(&[1, 2, 3], &[1, 4, 5]), vec![ChangeEvent::Reset]);
    }

    #[test]
    fn test_identity_drives_membership() {
        let a = Arc::new(1);
        let twin = Arc::new(1);
        let batch = changes(&[a.clone()], &[twin.clone()]);
        assert_eq!(batch.len(), 1);
        match &batch[0] {
            ChangeEvent::Replace {
                new_item, old_item, index,
            } => {
                assert!(new_item.same(&twin));
                assert!(old_item.same(&a));
                assert_eq!(*index, 0);
            }
            other => panic!("expected replace, got {:?}", other),
        }
    }

    #[test]
    fn test_hint_trusted_when_consistent() {
        // Duplicate values make the scan report the last slot; the hint
        // names the slot that actually changed.
        let hint = vec![ChangeEvent::add(1, 0)];
        assert_eq!(changes_with_hint(&[1], &[1, 1], &hint), hint);
        assert_eq!(changes(&[1], &[1, 1]), vec![ChangeEvent::add(1, 1)]);
    }

    #[test]
    fn test_hint_ignored_when_inconsistent() {
        let hint = vec![ChangeEvent::add(5, 0)];
        assert_eq!(
            changes_with_hint(&[1, 2], &[1, 2, 3], &hint),
            vec![ChangeEvent::add(3, 2)]
        );

        let multi = vec![ChangeEvent::add(3, 2), ChangeEvent::add(4, 3)];
        assert_eq!(
            changes_with_hint(&[1, 2], &[1, 2, 3], &multi),
            vec![ChangeEvent::add(3, 2)]
        );
    }
}
