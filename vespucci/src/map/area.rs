//! Incremental maintenance of the aggregate preferred display area.

use crate::geometry::{EdgeRule, Rect};

/// Outcome of folding one layer's area change into the aggregate.
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) enum AreaUpdate {
    /// The aggregate provably did not change.
    Unchanged,
    /// The aggregate only grew; this is its new value.
    Grown(Rect),
    /// The aggregate may have shrunk and must be recomputed from all layers.
    Recompute,
}

/// Decides how the aggregate area changes when one layer's contribution goes from
/// `old` to `new`, without recomputing the union over all layers.
///
/// All rectangles must be in the display reference system. The two containment tests
/// deliberately use different edge rules: an added rectangle touching the aggregate
/// boundary is still redundant, while a removed rectangle touching it may have been
/// the one defining that edge.
pub(crate) fn change_area(
    aggregate: Option<Rect>,
    old: Option<Rect>,
    new: Option<Rect>,
) -> AreaUpdate {
    match (old, new) {
        (None, None) => AreaUpdate::Unchanged,

        // A new contribution can only grow the aggregate.
        (None, Some(added)) => match aggregate {
            Some(aggregate) if aggregate.contains_rect(&added, EdgeRule::AllowTouch) => {
                AreaUpdate::Unchanged
            }
            Some(aggregate) => AreaUpdate::Grown(aggregate.merge(added)),
            None => AreaUpdate::Grown(added),
        },

        // A removed contribution is irrelevant only if it could not have defined any
        // aggregate edge.
        (Some(removed), None) => match aggregate {
            None => AreaUpdate::Unchanged,
            Some(aggregate) if aggregate.contains_rect(&removed, EdgeRule::Strict) => {
                AreaUpdate::Unchanged
            }
            Some(_) => AreaUpdate::Recompute,
        },

        (Some(old), Some(new)) => {
            let Some(aggregate) = aggregate else {
                return AreaUpdate::Grown(new);
            };

            // If the old rectangle reached an aggregate edge and the new one retreats
            // from it, that edge may no longer be supported.
            let may_shrink = (old.x_min() <= aggregate.x_min() && new.x_min() > old.x_min())
                || (old.y_min() <= aggregate.y_min() && new.y_min() > old.y_min())
                || (old.x_max() >= aggregate.x_max() && new.x_max() < old.x_max())
                || (old.y_max() >= aggregate.y_max() && new.y_max() < old.y_max());

            if may_shrink {
                AreaUpdate::Recompute
            } else if aggregate.contains_rect(&new, EdgeRule::AllowTouch) {
                AreaUpdate::Unchanged
            } else {
                AreaUpdate::Grown(aggregate.merge(new))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aggregate() -> Rect {
        Rect::new(0.0, 0.0, 100.0, 100.0)
    }

    #[test]
    fn addition_inside_is_unchanged() {
        let added = Rect::new(10.0, 10.0, 20.0, 20.0);
        assert_eq!(
            change_area(Some(aggregate()), None, Some(added)),
            AreaUpdate::Unchanged
        );

        // Touching an edge is still redundant for additions.
        let touching = Rect::new(0.0, 10.0, 20.0, 20.0);
        assert_eq!(
            change_area(Some(aggregate()), None, Some(touching)),
            AreaUpdate::Unchanged
        );
    }

    #[test]
    fn addition_outside_grows() {
        let added = Rect::new(50.0, 50.0, 150.0, 150.0);
        assert_eq!(
            change_area(Some(aggregate()), None, Some(added)),
            AreaUpdate::Grown(Rect::new(0.0, 0.0, 150.0, 150.0))
        );
        assert_eq!(
            change_area(None, None, Some(added)),
            AreaUpdate::Grown(added)
        );
    }

    #[test]
    fn removal_strictly_inside_is_unchanged() {
        let removed = Rect::new(10.0, 10.0, 20.0, 20.0);
        assert_eq!(
            change_area(Some(aggregate()), Some(removed), None),
            AreaUpdate::Unchanged
        );
    }

    #[test]
    fn removal_touching_an_edge_recomputes() {
        let removed = Rect::new(0.0, 10.0, 20.0, 20.0);
        assert_eq!(
            change_area(Some(aggregate()), Some(removed), None),
            AreaUpdate::Recompute
        );
    }

    #[test]
    fn retreat_from_a_supported_edge_recomputes() {
        let old = Rect::new(0.0, 10.0, 20.0, 20.0);
        let new = Rect::new(5.0, 10.0, 20.0, 20.0);
        assert_eq!(
            change_area(Some(aggregate()), Some(old), Some(new)),
            AreaUpdate::Recompute
        );
    }

    #[test]
    fn interior_change_only_grows() {
        let old = Rect::new(10.0, 10.0, 20.0, 20.0);
        let grown = Rect::new(10.0, 10.0, 120.0, 20.0);
        assert_eq!(
            change_area(Some(aggregate()), Some(old), Some(grown)),
            AreaUpdate::Grown(Rect::new(0.0, 0.0, 120.0, 100.0))
        );

        let moved = Rect::new(15.0, 15.0, 25.0, 25.0);
        assert_eq!(
            change_area(Some(aggregate()), Some(old), Some(moved)),
            AreaUpdate::Unchanged
        );
    }
}
