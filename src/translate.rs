//! Mapping line numbers between the two sides of an edit list.
//!
//! Outside changed regions every line of A has exactly one partner on B, and
//! all lines between two consecutive edits share the same offset. A lookup
//! walks the sorted edits until it finds the first one that starts after the
//! queried line and extrapolates from that edit's boundary.

use crate::edit::Edit;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    A,
    B,
}

impl Axis {
    /// `(this_begin, this_end, other_begin, other_end)` of `edit` seen from this axis.
    #[inline]
    const fn project(self, e: &Edit) -> (usize, usize, usize, usize) {
        match self {
            Self::A => (e.begin_a, e.end_a, e.begin_b, e.end_b),
            Self::B => (e.begin_b, e.end_b, e.begin_a, e.end_a),
        }
    }
}

/// Maps line `a` (0-based) of side A onto side B.
///
/// Returns `None` when `a` lies inside (or on the boundary of) an edit.
#[must_use]
pub fn map_a_to_b(edits: &[Edit], a: usize) -> Option<usize> {
    map(edits, a, Axis::A)
}

/// Maps line `b` (0-based) of side B onto side A.
#[must_use]
pub fn map_b_to_a(edits: &[Edit], b: usize) -> Option<usize> {
    map(edits, b, Axis::B)
}

fn map(edits: &[Edit], line: usize, axis: Axis) -> Option<usize> {
    let Some(last) = edits.last() else {
        return Some(line);
    };

    for (i, edit) in edits.iter().enumerate() {
        let (begin, end, other_begin, _) = axis.project(edit);
        if line < begin {
            if i == 0 {
                return Some(line);
            }
            return other_begin.checked_sub(begin - line);
        }
        if begin <= line && line <= end {
            return None;
        }
    }

    let (_, end, _, other_end) = axis.project(last);
    Some(other_end + (line - end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_edit_list_is_identity() {
        assert_eq!(map_a_to_b(&[], 0), Some(0));
        assert_eq!(map_a_to_b(&[], 41), Some(41));
        assert_eq!(map_b_to_a(&[], 7), Some(7));
    }

    #[test]
    fn lines_before_first_edit_are_unchanged() {
        let edits = [Edit::new(5, 7, 5, 9)];
        assert_eq!(map_a_to_b(&edits, 0), Some(0));
        assert_eq!(map_a_to_b(&edits, 4), Some(4));
        assert_eq!(map_b_to_a(&edits, 4), Some(4));
    }

    #[test]
    fn lines_inside_an_edit_have_no_partner() {
        let edits = [Edit::new(5, 7, 5, 9)];
        assert_eq!(map_a_to_b(&edits, 5), None);
        assert_eq!(map_a_to_b(&edits, 6), None);
        assert_eq!(map_a_to_b(&edits, 7), None);
        assert_eq!(map_b_to_a(&edits, 9), None);
    }

    #[test]
    fn lines_after_last_edit_extrapolate_from_its_end() {
        // Two lines replaced by four: everything after shifts by two.
        let edits = [Edit::new(5, 7, 5, 9)];
        assert_eq!(map_a_to_b(&edits, 8), Some(10));
        assert_eq!(map_a_to_b(&edits, 14), Some(16));
        assert_eq!(map_b_to_a(&edits, 16), Some(14));
    }

    #[test]
    fn lines_between_edits_use_the_following_edit() {
        let edits = [Edit::new(2, 3, 2, 2), Edit::new(10, 10, 9, 12)];
        assert_eq!(map_a_to_b(&edits, 5), Some(4));
        assert_eq!(map_b_to_a(&edits, 4), Some(5));
        assert_eq!(map_a_to_b(&edits, 11), Some(13));
    }

    #[test]
    fn zero_width_edit_blocks_its_own_point() {
        let edits = [Edit::empty(4, 6)];
        assert_eq!(map_a_to_b(&edits, 4), None);
        assert_eq!(map_a_to_b(&edits, 5), Some(7));
    }

    /// Builds a well-formed edit list: unchanged gaps are equal on both sides.
    fn edit_list() -> impl Strategy<Value = (Vec<Edit>, usize)> {
        prop::collection::vec((1usize..6, 0usize..4, 0usize..4), 0..8).prop_map(|parts| {
            let (mut a, mut b) = (0, 0);
            let mut edits = Vec::with_capacity(parts.len());
            for (gap, del, ins) in parts {
                a += gap;
                b += gap;
                edits.push(Edit::new(a, a + del, b, b + ins));
                a += del;
                b += ins;
            }
            (edits, a + 5)
        })
    }

    proptest! {
        #[test]
        fn mapping_outside_edits_is_invertible((edits, size_a) in edit_list()) {
            for a in 0..size_a {
                if edits.iter().any(|e| e.touches_a(a)) {
                    continue;
                }
                let b = map_a_to_b(&edits, a);
                prop_assert!(b.is_some());
                prop_assert_eq!(map_b_to_a(&edits, b.unwrap_or_default()), Some(a));
            }
        }
    }
}
