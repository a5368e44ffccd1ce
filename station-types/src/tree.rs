//! Sibling-list helpers that keep sizes summing to the parent

use crate::naming::{FREESPACE_PREFIX, next_free_name};
use crate::region::{Extent, Freespace, Region};

/// Whether `siblings` exactly fill a parent of `parent_size_mb`
pub fn siblings_fit(siblings: &[Region], parent_size_mb: u64) -> bool {
    siblings.iter().map(Extent::size_mb).sum::<u64>() == parent_size_mb
}

/// Turn the region at `index` into free space, folding it into free
/// neighbours.
///
/// - both neighbours free: the lower one absorbs this region and the upper
///   neighbour, both of which are removed
/// - one neighbour free: that neighbour absorbs this region
/// - otherwise the region is replaced in place by a new `freespace<K>`
///
/// Returns the index of the resulting free region, or `None` when `index`
/// is out of range. Calling it again on the returned index changes nothing.
pub fn merge_adjacent_freespace(siblings: &mut Vec<Region>, index: usize) -> Option<usize> {
    let size = siblings.get(index)?.size_mb();
    let prev_free = index
        .checked_sub(1)
        .and_then(|i| siblings.get(i))
        .is_some_and(Region::is_freespace);
    let next_free = siblings.get(index + 1).is_some_and(Region::is_freespace);

    match (prev_free, next_free) {
        (true, true) => {
            let upper = siblings.remove(index + 1);
            siblings.remove(index);
            siblings[index - 1].grow(size + upper.size_mb());
            Some(index - 1)
        }
        (true, false) => {
            siblings.remove(index);
            siblings[index - 1].grow(size);
            Some(index - 1)
        }
        (false, true) => {
            siblings.remove(index);
            siblings[index].grow(size);
            Some(index)
        }
        (false, false) => {
            if !siblings[index].is_freespace() {
                let name = next_free_name(siblings.iter().map(Extent::name), FREESPACE_PREFIX);
                siblings[index] = Region::Freespace(Freespace::new(name, size));
            }
            Some(index)
        }
    }
}
