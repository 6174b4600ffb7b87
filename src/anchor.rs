//! Keeping commented lines visible through context collapsing.
//!
//! Hunks only include lines near an edit, so a comment on an unchanged line
//! far from any change would be hidden. For every such line we add a
//! zero-width edit at the line on both sides; it pulls the line into a hunk
//! without marking anything as changed.

use smallvec::SmallVec;
use tracing::trace;

use crate::comment::{Comment, CommentDetail};
use crate::edit::{Edit, sort_edits};
use crate::translate::{map_a_to_b, map_b_to_a};

/// Returns `edits` with anchor edits added for every commented line.
///
/// With no comments at all the input vector is handed back untouched.
#[must_use]
pub fn ensure_comments_visible(edits: Vec<Edit>, comments: &CommentDetail) -> Vec<Edit> {
    if comments.is_empty() {
        return edits;
    }

    // Most files carry only a handful of comment threads.
    let mut anchors: SmallVec<[Edit; 8]> = SmallVec::new();

    for a in commented_lines(&comments.comments_a) {
        if let Some(b) = map_a_to_b(&edits, a) {
            add_if_uncovered(&edits, &mut anchors, Edit::empty(a, b));
        }
    }
    for b in commented_lines(&comments.comments_b) {
        if let Some(a) = map_b_to_a(&edits, b) {
            add_if_uncovered(&edits, &mut anchors, Edit::empty(a, b));
        }
    }

    if anchors.is_empty() {
        return edits;
    }

    trace!(count = anchors.len(), "adding comment anchors");
    let mut edits = edits;
    edits.extend(anchors);
    sort_edits(&mut edits);
    edits
}

/// 0-based line indices of line comments, ascending, consecutive repeats dropped.
fn commented_lines(comments: &[Comment]) -> impl Iterator<Item = usize> + '_ {
    let mut lines: SmallVec<[u32; 16]> = comments.iter().map(|c| c.line).collect();
    lines.sort_unstable();
    lines.dedup();
    lines
        .into_iter()
        .filter(|&line| line > 0)
        .map(|line| line as usize - 1)
}

fn add_if_uncovered(edits: &[Edit], anchors: &mut SmallVec<[Edit; 8]>, anchor: Edit) {
    let covered = edits
        .iter()
        .chain(anchors.iter())
        .any(|e| e.touches_a(anchor.begin_a) || e.touches_b(anchor.begin_b));
    if !covered {
        anchors.push(anchor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comment::CommentSide;
    use crate::types::PatchSetId;
    use proptest::prelude::*;

    fn comment(side: CommentSide, line: u32) -> Comment {
        Comment {
            patch_set: PatchSetId(1),
            side,
            line,
            author: "reviewer".into(),
            message: "nit".into(),
            draft: false,
        }
    }

    fn detail(a: &[u32], b: &[u32]) -> CommentDetail {
        CommentDetail {
            comments_a: a.iter().map(|&l| comment(CommentSide::Parent, l)).collect(),
            comments_b: b.iter().map(|&l| comment(CommentSide::Revision, l)).collect(),
        }
    }

    #[test]
    fn no_comments_returns_input() {
        let edits = vec![Edit::new(4, 7, 4, 5)];
        let out = ensure_comments_visible(edits.clone(), &CommentDetail::default());
        assert_eq!(out, edits);
    }

    #[test]
    fn anchor_on_unmodified_region() {
        // Lines 5-7 (1-based) changed in a 20 line file, comment on line 15 of A.
        let edits = vec![Edit::new(4, 7, 4, 5)];
        let out = ensure_comments_visible(edits.clone(), &detail(&[15], &[]));

        let expected_b = map_a_to_b(&edits, 14).unwrap_or_default();
        assert_eq!(expected_b, 12);
        assert_eq!(out, vec![Edit::new(4, 7, 4, 5), Edit::empty(14, 12)]);
    }

    #[test]
    fn comment_inside_an_edit_needs_no_anchor() {
        let edits = vec![Edit::new(4, 7, 4, 5)];
        let out = ensure_comments_visible(edits.clone(), &detail(&[6], &[5]));
        assert_eq!(out, edits);
    }

    #[test]
    fn repeated_comments_add_one_anchor() {
        let out = ensure_comments_visible(vec![], &detail(&[3, 3, 3], &[]));
        assert_eq!(out, vec![Edit::empty(2, 2)]);
    }

    #[test]
    fn same_line_from_both_sides_adds_one_anchor() {
        let out = ensure_comments_visible(vec![], &detail(&[9], &[9]));
        assert_eq!(out, vec![Edit::empty(8, 8)]);
    }

    #[test]
    fn file_level_comments_are_ignored() {
        let edits = vec![Edit::new(1, 2, 1, 2)];
        let out = ensure_comments_visible(edits.clone(), &detail(&[0], &[0]));
        assert_eq!(out, edits);
    }

    #[test]
    fn anchors_from_b_are_sorted_into_place() {
        let edits = vec![Edit::new(10, 12, 10, 10)];
        let out = ensure_comments_visible(edits, &detail(&[], &[2, 20]));
        assert_eq!(
            out,
            vec![Edit::empty(1, 1), Edit::new(10, 12, 10, 10), Edit::empty(21, 19)]
        );
    }

    fn edit_list() -> impl Strategy<Value = (Vec<Edit>, usize, usize)> {
        prop::collection::vec((1usize..6, 0usize..4, 0usize..4), 0..6).prop_map(|parts| {
            let (mut a, mut b) = (0, 0);
            let mut edits = Vec::with_capacity(parts.len());
            for (gap, del, ins) in parts {
                a += gap;
                b += gap;
                edits.push(Edit::new(a, a + del, b, b + ins));
                a += del;
                b += ins;
            }
            (edits, a + 4, b + 4)
        })
    }

    proptest! {
        #[test]
        fn anchors_never_overlap_and_cover_comments(
            (edits, size_a, size_b) in edit_list(),
            picks_a in prop::collection::vec(any::<prop::sample::Index>(), 0..5),
            picks_b in prop::collection::vec(any::<prop::sample::Index>(), 0..5),
        ) {
            let lines_a: Vec<u32> = picks_a.iter().map(|i| i.index(size_a) as u32 + 1).collect();
            let lines_b: Vec<u32> = picks_b.iter().map(|i| i.index(size_b) as u32 + 1).collect();
            let out = ensure_comments_visible(edits, &detail(&lines_a, &lines_b));

            for pair in out.windows(2) {
                prop_assert!(pair[0].end_a <= pair[1].begin_a);
            }
            for line in lines_a {
                let a = line as usize - 1;
                prop_assert!(out.iter().any(|e| e.touches_a(a)));
            }
            for line in lines_b {
                let b = line as usize - 1;
                prop_assert!(out.iter().any(|e| e.touches_b(b)));
            }
        }
    }
}
