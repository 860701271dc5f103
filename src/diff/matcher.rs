use ahash::AHashMap;
use std::collections::VecDeque;

/// An entity that can be aligned between two snapshots.
pub trait Identified {
    /// The stable key of the entity, if it has one.
    fn identity(&self) -> Option<&str>;

    /// A content fingerprint used to pair entities that carry no identity.
    fn fingerprint(&self) -> Option<String> {
        None
    }
}

/// One slot of an alignment. At least one side is always present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignedPair {
    pub previous: Option<usize>,
    pub current: Option<usize>,
    /// Set on paired entries whose rank among the surviving entries changed.
    pub moved: bool,
}

impl AlignedPair {
    pub fn is_added(&self) -> bool {
        self.previous.is_none()
    }

    pub fn is_removed(&self) -> bool {
        self.current.is_none()
    }
}

/// The result of aligning a previous and a current sequence. Every index of
/// both sequences occurs in exactly one pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Alignment {
    pub pairs: Vec<AlignedPair>,
}

impl Alignment {
    /// True when nothing was added, removed or moved.
    pub fn is_stable(&self) -> bool {
        self.pairs
            .iter()
            .all(|pair| !pair.moved && !pair.is_added() && !pair.is_removed())
    }
}

/// Aligns `previous` with `current`.
///
/// Entries are paired by identity first, duplicates being consumed in the
/// order they were seen. Entries without identity are then paired by
/// fingerprint, preferring the candidate whose index is closest (the lower
/// index wins a tie). Whatever is left is removed or added.
///
/// The pairs follow the current order; each removed entry is placed right
/// before the first paired entry that came after it in `previous`.
pub fn align<T: Identified>(previous: &[T], current: &[T]) -> Alignment {
    let mut matched_previous: Vec<Option<usize>> = vec![None; previous.len()];
    let mut matched_current: Vec<Option<usize>> = vec![None; current.len()];

    let mut by_identity: AHashMap<&str, VecDeque<usize>> = AHashMap::new();
    for (i, item) in previous.iter().enumerate() {
        if let Some(id) = item.identity() {
            by_identity.entry(id).or_default().push_back(i);
        }
    }
    for (j, item) in current.iter().enumerate() {
        let Some(id) = item.identity() else { continue };
        if let Some(i) = by_identity.get_mut(id).and_then(VecDeque::pop_front) {
            matched_previous[i] = Some(j);
            matched_current[j] = Some(i);
        }
    }

    let mut by_fingerprint: AHashMap<String, Vec<usize>> = AHashMap::new();
    for (i, item) in previous.iter().enumerate() {
        if matched_previous[i].is_some() || item.identity().is_some() {
            continue;
        }
        if let Some(fingerprint) = item.fingerprint() {
            by_fingerprint.entry(fingerprint).or_default().push(i);
        }
    }
    if !by_fingerprint.is_empty() {
        for (j, item) in current.iter().enumerate() {
            if matched_current[j].is_some() || item.identity().is_some() {
                continue;
            }
            let Some(candidates) = item
                .fingerprint()
                .and_then(|fingerprint| by_fingerprint.get_mut(&fingerprint))
            else {
                continue;
            };
            if let Some(slot) = nearest(candidates, j) {
                let i = candidates.remove(slot);
                matched_previous[i] = Some(j);
                matched_current[j] = Some(i);
            }
        }
    }

    let moved = moved_flags(&matched_current, previous.len());
    let removed: Vec<usize> = (0..previous.len())
        .filter(|&i| matched_previous[i].is_none())
        .collect();

    let mut pairs = Vec::with_capacity(previous.len().max(current.len()));
    let mut next_removed = 0;
    for (j, matched) in matched_current.iter().enumerate() {
        if let Some(i) = *matched {
            while next_removed < removed.len() && removed[next_removed] < i {
                pairs.push(removed_pair(removed[next_removed]));
                next_removed += 1;
            }
        }
        pairs.push(AlignedPair {
            previous: *matched,
            current: Some(j),
            moved: moved[j],
        });
    }
    pairs.extend(removed[next_removed..].iter().map(|&i| removed_pair(i)));

    Alignment { pairs }
}

fn removed_pair(previous: usize) -> AlignedPair {
    AlignedPair {
        previous: Some(previous),
        current: None,
        moved: false,
    }
}

/// Index into `candidates` (sorted ascending) of the entry closest to `target`.
fn nearest(candidates: &[usize], target: usize) -> Option<usize> {
    candidates
        .iter()
        .enumerate()
        .min_by_key(|(_, i)| i.abs_diff(target))
        .map(|(slot, _)| slot)
}

/// Flags, per current index, whether a paired entry changed rank among the
/// paired entries. Inserting or removing other entries does not move anything.
fn moved_flags(matched_current: &[Option<usize>], previous_len: usize) -> Vec<bool> {
    let mut previous_rank = vec![0; previous_len];
    let mut paired_previous: Vec<usize> = matched_current.iter().flatten().copied().collect();
    paired_previous.sort_unstable();
    for (rank, &i) in paired_previous.iter().enumerate() {
        previous_rank[i] = rank;
    }

    let mut flags = vec![false; matched_current.len()];
    let mut current_rank = 0;
    for (j, matched) in matched_current.iter().enumerate() {
        if let Some(i) = matched {
            flags[j] = previous_rank[*i] != current_rank;
            current_rank += 1;
        }
    }
    flags
}
