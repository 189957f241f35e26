//! Traversal helpers over any [`QuadTreeTile`].

use super::{QuadTreeTile, QuadTreeTileKey};

/// Pre-order visit of `tile` and all its descendants.
pub fn visit<T, F>(tile: &T, visitor: &mut F)
where
    T: QuadTreeTile,
    F: FnMut(&T),
{
    visitor(tile);
    if let Some(children) = tile.children() {
        for child in children.iter() {
            visit(child, visitor);
        }
    }
}

/// Pre-order mutable visit. `visitor` returns false to skip a tile's
/// descendants.
pub fn visit_mut<T, F>(tile: &mut T, visitor: &mut F)
where
    T: QuadTreeTile,
    F: FnMut(&mut T) -> bool,
{
    if !visitor(tile) {
        return;
    }
    if let Some(children) = tile.children_mut() {
        for child in children.iter_mut() {
            visit_mut(child, visitor);
        }
    }
}

/// Visits the path from `tile` down towards `key`, coarsest first.
///
/// Stops at `key` itself or at the deepest existing tile on the path.
/// Nothing is visited if `tile` is not an ancestor of `key`.
pub fn visit_hierarchy_to_key<T, F>(tile: &T, key: QuadTreeTileKey, visitor: &mut F)
where
    T: QuadTreeTile,
    F: FnMut(&T),
{
    let mut current = tile;
    loop {
        if !current.key().is_ancestor_of(&key) {
            return;
        }
        visitor(current);
        if current.key() == key {
            return;
        }
        let next = current
            .children()
            .and_then(|children| children.iter().find(|c| c.key().is_ancestor_of(&key)));
        match next {
            Some(child) => current = child,
            None => return,
        }
    }
}

/// Finds the tile at exactly `key` below `tile`.
pub fn find_tile<T: QuadTreeTile>(tile: &T, key: QuadTreeTileKey) -> Option<&T> {
    if !tile.key().is_ancestor_of(&key) {
        return None;
    }
    if tile.key() == key {
        return Some(tile);
    }
    tile.children()?
        .iter()
        .find_map(|child| find_tile(child, key))
}

/// Mutable counterpart of [`find_tile`].
pub fn find_tile_mut<T: QuadTreeTile>(tile: &mut T, key: QuadTreeTileKey) -> Option<&mut T> {
    if !tile.key().is_ancestor_of(&key) {
        return None;
    }
    if tile.key() == key {
        return Some(tile);
    }
    tile.children_mut()?
        .iter_mut()
        .find_map(|child| find_tile_mut(child, key))
}

/// Post-order pruning pass.
///
/// A tile is prunable when `should_keep` rejects it and every one of its
/// children is prunable. `pruner` is called on each prunable tile, children
/// before parents. Subtrees rejected by `should_traverse` are not entered and
/// count as kept if they have children. Returns whether `tile` was pruned.
pub fn prune_tree<T, Tr, K, P>(
    tile: &mut T,
    should_traverse: &Tr,
    should_keep: &K,
    pruner: &mut P,
) -> bool
where
    T: QuadTreeTile,
    Tr: Fn(&T) -> bool,
    K: Fn(&T) -> bool,
    P: FnMut(&mut T),
{
    let mut children_pruned = true;
    if should_traverse(tile) {
        if let Some(children) = tile.children_mut() {
            for child in children.iter_mut() {
                // No short circuit: every child gets its own pass
                let pruned = prune_tree(child, should_traverse, should_keep, pruner);
                children_pruned &= pruned;
            }
        }
    } else if tile.has_children() {
        children_pruned = false;
    }

    let prunable = children_pruned && !should_keep(tile);
    if prunable {
        pruner(tile);
    }
    prunable
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Box2;
    use crate::quadtree::{QuadTree, Tile, TileFactory};
    use glam::Vec2;

    struct Keep(bool);

    impl Default for Keep {
        fn default() -> Self {
            Keep(true)
        }
    }

    type TestTile = Tile<Vec2, Keep>;

    fn create_tree() -> QuadTree<TestTile> {
        QuadTree::new(
            TileFactory::new(TestTile::with_default_payload),
            QuadTreeTileKey::new(0, 0, 0),
            Box2::unit(),
        )
    }

    fn child_mut(tile: &mut TestTile, i: usize) -> &mut TestTile {
        &mut tile.children_mut().unwrap()[i]
    }

    #[test]
    fn test_visit_hierarchy_to_key() {
        let mut tree = create_tree();
        let (factory, root) = tree.parts_mut();
        factory.subdivide(root);
        factory.subdivide(child_mut(root, 2));

        let mut visited = Vec::new();
        visit_hierarchy_to_key(tree.root(), QuadTreeTileKey::new(1, 0, 0), &mut |t: &TestTile| {
            visited.push(t.key)
        });

        assert_eq!(
            visited,
            vec![QuadTreeTileKey::new(0, 0, 0), QuadTreeTileKey::new(1, 0, 0)]
        );
    }

    #[test]
    fn test_visit_hierarchy_stops_at_deepest_existing_tile() {
        let mut tree = create_tree();
        let (factory, root) = tree.parts_mut();
        factory.subdivide(root);

        let mut visited = Vec::new();
        visit_hierarchy_to_key(tree.root(), QuadTreeTileKey::new(4, 3, 12), &mut |t: &TestTile| {
            visited.push(t.key)
        });
        assert_eq!(
            visited,
            vec![QuadTreeTileKey::new(0, 0, 0), QuadTreeTileKey::new(1, 0, 1)]
        );
    }

    #[test]
    fn test_find_tile() {
        let mut tree = create_tree();
        let (factory, root) = tree.parts_mut();
        factory.subdivide(root);
        factory.subdivide(child_mut(root, 1));

        let key = QuadTreeTileKey::new(2, 3, 1);
        assert_eq!(find_tile(tree.root(), key).map(|t| t.key), Some(key));
        assert!(find_tile(tree.root(), QuadTreeTileKey::new(2, 0, 0)).is_none());

        find_tile_mut(tree.root_mut(), key).unwrap().payload = Keep(false);
        assert!(!find_tile(tree.root(), key).unwrap().payload.0);
    }

    #[test]
    fn test_visit_mut_can_skip_subtrees() {
        let mut tree = create_tree();
        let (factory, root) = tree.parts_mut();
        factory.subdivide_recursively(root, &|t: &TestTile| t.key.level < 2);

        let mut count = 0;
        visit_mut(tree.root_mut(), &mut |t: &mut TestTile| {
            count += 1;
            t.key.level == 0
        });
        assert_eq!(count, 5);
    }

    #[test]
    fn test_prune_tree_keeps_everything_flagged() {
        let mut tree = create_tree();
        let (factory, root) = tree.parts_mut();
        factory.subdivide(root);
        factory.subdivide(child_mut(root, 0));
        factory.subdivide(child_mut(root, 2));

        let mut pruned = Vec::new();
        prune_tree(
            tree.root_mut(),
            &|_: &TestTile| true,
            &|t: &TestTile| t.payload.0,
            &mut |t: &mut TestTile| pruned.push(t.key),
        );
        assert!(pruned.is_empty());
    }

    #[test]
    fn test_prune_tree_post_order() {
        let mut tree = create_tree();
        let (factory, root) = tree.parts_mut();
        factory.subdivide(root);
        factory.subdivide(child_mut(root, 0));
        factory.subdivide(child_mut(root, 2));

        root.payload = Keep(false);
        child_mut(root, 0).payload = Keep(false);
        child_mut(child_mut(root, 0), 0).payload = Keep(false);
        let sw = child_mut(root, 2);
        sw.payload = Keep(false);
        for grandchild in sw.children_mut().unwrap().iter_mut() {
            grandchild.payload = Keep(false);
        }

        let mut pruned = Vec::new();
        let root_pruned = prune_tree(
            tree.root_mut(),
            &|_: &TestTile| true,
            &|t: &TestTile| t.payload.0,
            &mut |t: &mut TestTile| pruned.push(t.key),
        );

        assert!(!root_pruned);
        assert_eq!(
            pruned,
            vec![
                QuadTreeTileKey::new(2, 0, 0),
                QuadTreeTileKey::new(2, 0, 2),
                QuadTreeTileKey::new(2, 1, 2),
                QuadTreeTileKey::new(2, 0, 3),
                QuadTreeTileKey::new(2, 1, 3),
                QuadTreeTileKey::new(1, 0, 1),
            ]
        );
    }

    #[test]
    fn test_prune_tree_untraversed_subtree_is_kept() {
        let mut tree = create_tree();
        let (factory, root) = tree.parts_mut();
        factory.subdivide(root);
        root.payload = Keep(false);

        let mut pruned = 0;
        let root_pruned = prune_tree(
            tree.root_mut(),
            &|_: &TestTile| false,
            &|t: &TestTile| t.payload.0,
            &mut |_: &mut TestTile| pruned += 1,
        );
        assert!(!root_pruned);
        assert_eq!(pruned, 0);
    }
}
