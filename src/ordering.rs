//! Order key allocation for task and column lists.
//!
//! Every list on the board is sorted by a real-valued `order` key. Inserting
//! at the head or tail steps away from the boundary key by [`GAP`]; inserting
//! between two neighbors takes the real-valued midpoint, which survives many
//! successive insertions into the same gap. When two adjacent keys converge
//! closer than [`MIN_KEY_GAP`] the whole column is renumbered with fresh
//! [`GAP`]-spaced keys, preserving relative order — without this fallback
//! repeated reordering in one spot eventually collapses two keys together.
//!
//! Keys are never negative and never required to be integers. Integer
//! midpoints are deliberately not used: an odd-width integer gap collapses to
//! one of its endpoints after a handful of insertions.

/// Spacing between keys for head/tail insertion and renumbering.
pub const GAP: f64 = 1000.0;

/// Minimum usable distance between adjacent keys. Anything tighter triggers
/// a renumber pass.
pub const MIN_KEY_GAP: f64 = 1e-6;

/// Where a task should land within a column's ordered list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPosition {
    Head,
    Tail,
    /// Between index `i - 1` and index `i`. `At(0)` is the head; an index at
    /// or past the end of the list is the tail.
    At(usize),
}

/// Outcome of a key allocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Allocation {
    /// A single fresh key; the rest of the list is untouched.
    Key(f64),
    /// Adjacent keys had converged. `keys` holds fresh GAP-spaced keys for the
    /// existing list (same order, same length) and `key` is the inserted
    /// task's key. The caller must apply both together.
    Renumbered { keys: Vec<f64>, key: f64 },
}

impl Allocation {
    /// The key assigned to the inserted task.
    pub fn key(&self) -> f64 {
        match self {
            Allocation::Key(k) => *k,
            Allocation::Renumbered { key, .. } => *key,
        }
    }
}

/// Compute a key that places a new task at `position` within a list whose
/// current keys are `keys` (sorted ascending, the moved task already removed).
pub fn allocate(keys: &[f64], position: InsertPosition) -> Allocation {
    debug_assert!(
        keys.windows(2).all(|w| w[0] <= w[1]),
        "allocate requires keys sorted ascending"
    );

    let index = match position {
        InsertPosition::Head => 0,
        InsertPosition::Tail => keys.len(),
        InsertPosition::At(i) => i.min(keys.len()),
    };

    if keys.is_empty() {
        return Allocation::Key(0.0);
    }

    if index == 0 {
        let first = keys[0];
        if first <= MIN_KEY_GAP {
            // No room left below the current head key.
            return renumber(keys.len(), 0);
        }
        return Allocation::Key((first - GAP).max(0.0));
    }

    if index == keys.len() {
        return Allocation::Key(keys[keys.len() - 1] + GAP);
    }

    let prev = keys[index - 1];
    let next = keys[index];
    if next - prev < MIN_KEY_GAP {
        return renumber(keys.len(), index);
    }
    Allocation::Key(prev + (next - prev) / 2.0)
}

/// Fresh GAP-spaced keys for a list of `len` tasks with an insertion at
/// `insert_at`. The combined list ends up keyed `GAP, 2*GAP, ...`.
fn renumber(len: usize, insert_at: usize) -> Allocation {
    let keys = (0..len)
        .map(|j| {
            let slot = if j < insert_at { j + 1 } else { j + 2 };
            slot as f64 * GAP
        })
        .collect();
    Allocation::Renumbered {
        keys,
        key: (insert_at + 1) as f64 * GAP,
    }
}
