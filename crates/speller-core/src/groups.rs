//! Randomized flash groups.
//!
//! A fresh partition is drawn for every round. Symbols are shuffled, then dealt
//! to groups following a shuffled permutation of the group slots that is
//! redrawn each time it runs out. Group sizes therefore differ by at most one,
//! and which groups end up one short changes from round to round.

use rand::seq::SliceRandom;
use rand::Rng;

/// Ordered, disjoint symbol-index sets for one round.
pub type Groups = Vec<Vec<usize>>;

/// Partition `0..symbol_count` into `group_count` groups.
///
/// With more groups than symbols, each symbol gets its own group and the
/// remaining groups stay empty.
pub fn allocate<R: Rng + ?Sized>(rng: &mut R, symbol_count: usize, group_count: usize) -> Groups {
    let mut groups: Groups = vec![Vec::new(); group_count];
    if group_count == 0 {
        return groups;
    }

    let mut symbols: Vec<usize> = (0..symbol_count).collect();
    symbols.shuffle(rng);

    let mut slots: Vec<usize> = Vec::with_capacity(group_count);
    for symbol in symbols {
        if slots.is_empty() {
            slots.extend(0..group_count);
            slots.shuffle(rng);
        }
        if let Some(slot) = slots.pop() {
            groups[slot].push(symbol);
        }
    }
    groups
}
