/*
 * Keeps the tree and list selections mutually exclusive. The stores hold the
 * per-node flags; this tracker is the only code path that selects in one view
 * and therefore clears the other.
 *
 * Pointer handling: a pointer-down on an item that is already selected must
 * not collapse a multi-selection, because it may be the start of a drag. The
 * tracker remembers that case in `pending_unselect` and the following click
 * (pointer-up without a drag) performs the deferred replacement.
 */
use crate::core::config::ExplorerConfig;
use crate::core::list_store::ListStore;
use crate::core::models::{NodeHandle, NodeItem};
use crate::core::tree_store::TreeStore;

#[derive(Debug)]
pub struct SelectionTracker {
    allow_multiple: bool,
    pending_unselect: bool,
}

impl SelectionTracker {
    pub fn new(config: &ExplorerConfig) -> Self {
        SelectionTracker {
            allow_multiple: config.options.allow_multiple_selection,
            pending_unselect: false,
        }
    }

    pub fn select_tree_node(
        &mut self,
        tree: &mut TreeStore,
        list: &mut ListStore,
        handle: NodeHandle,
    ) -> bool {
        if !tree.select(handle) {
            return false;
        }
        list.unselect_all(false);
        true
    }

    pub fn select_list_item(
        &mut self,
        tree: &mut TreeStore,
        list: &mut ListStore,
        id: &str,
        additive: bool,
    ) -> bool {
        if !list.select(id, additive && self.allow_multiple) {
            return false;
        }
        tree.clear_selection();
        true
    }

    /*
     * Pointer pressed on a list item. An unselected item is selected right
     * away; an already-selected one is left alone and flagged so the click
     * handler can decide once it knows no drag happened.
     */
    pub fn pointer_down(
        &mut self,
        tree: &mut TreeStore,
        list: &mut ListStore,
        id: &str,
        modifier_held: bool,
    ) -> bool {
        if list.is_selected(id) {
            self.pending_unselect = true;
            return false;
        }
        self.pending_unselect = false;
        self.select_list_item(tree, list, id, modifier_held)
    }

    pub fn take_pending_unselect(&mut self) -> bool {
        std::mem::take(&mut self.pending_unselect)
    }

    pub fn has_pending_unselect(&self) -> bool {
        self.pending_unselect
    }

    // Pointer released without a drag. Returns whether the selection changed.
    pub fn click(
        &mut self,
        tree: &mut TreeStore,
        list: &mut ListStore,
        id: &str,
        modifier_held: bool,
    ) -> bool {
        if !self.take_pending_unselect() {
            return false;
        }
        self.select_list_item(tree, list, id, modifier_held)
    }

    pub fn clear(&mut self, tree: &mut TreeStore, list: &mut ListStore) -> bool {
        self.pending_unselect = false;
        let tree_changed = tree.clear_selection();
        let list_changed = list.unselect_all(false);
        tree_changed || list_changed
    }

    // The current selection from whichever view holds it.
    pub fn snapshot(&self, tree: &TreeStore, list: &ListStore) -> Vec<NodeItem> {
        match tree.selected_item() {
            Some(item) => vec![item],
            None => list.selected_items(),
        }
    }

    pub fn is_exclusive(tree: &TreeStore, list: &ListStore) -> bool {
        !(tree.selected().is_some() && list.has_selection())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::filter_engine::FilterEngine;
    use crate::core::models::ResourceDescriptor as D;
    use rand::Rng;

    fn fixture() -> (SelectionTracker, TreeStore, ListStore) {
        let config = ExplorerConfig::default();
        let filter = FilterEngine::new(&config);
        let mut tree = TreeStore::new(&config);
        let mut list = ListStore::new(&config);
        let root = tree.root();
        let ticket = tree.begin_load(root).unwrap();
        let entries = vec![
            D::folder("/a/", 0),
            D::folder("/b/", 0),
            D::file("/x.txt", 1, 0),
            D::file("/y.txt", 1, 0),
        ];
        tree.finish_load(ticket, entries.clone(), false, &filter);
        list.set_list(entries, &filter);
        (SelectionTracker::new(&config), tree, list)
    }

    #[test]
    fn test_selecting_in_one_view_clears_the_other() {
        let (mut tracker, mut tree, mut list) = fixture();
        let a = tree.find_by_id("/a/").unwrap();

        tracker.select_list_item(&mut tree, &mut list, "/x.txt", false);
        tracker.select_list_item(&mut tree, &mut list, "/y.txt", true);
        assert_eq!(tracker.snapshot(&tree, &list).len(), 2);

        tracker.select_tree_node(&mut tree, &mut list, a);
        assert!(!list.has_selection());
        let snapshot = tracker.snapshot(&tree, &list);
        assert!(matches!(snapshot[0], NodeItem::TreeNode { .. }));

        tracker.select_list_item(&mut tree, &mut list, "/x.txt", false);
        assert!(tree.selected().is_none());
    }

    #[test]
    fn test_random_select_sequences_stay_exclusive() {
        let (mut tracker, mut tree, mut list) = fixture();
        let handles = tree.children_of(tree.root()).to_vec();
        let ids = ["/a/", "/b/", "/x.txt", "/y.txt"];
        let mut rng = rand::rng();

        for _ in 0..200 {
            match rng.random_range(0..3) {
                0 => {
                    let h = handles[rng.random_range(0..handles.len())];
                    tracker.select_tree_node(&mut tree, &mut list, h);
                }
                1 => {
                    let id = ids[rng.random_range(0..ids.len())];
                    tracker.select_list_item(&mut tree, &mut list, id, rng.random_bool(0.5));
                }
                _ => {
                    let id = ids[rng.random_range(0..ids.len())];
                    tracker.pointer_down(&mut tree, &mut list, id, false);
                    tracker.click(&mut tree, &mut list, id, false);
                }
            }
            assert!(SelectionTracker::is_exclusive(&tree, &list));
        }
    }

    #[test]
    fn test_pointer_down_on_selected_defers_replacement() {
        // Arrange
        let (mut tracker, mut tree, mut list) = fixture();
        tracker.select_list_item(&mut tree, &mut list, "/x.txt", false);
        tracker.select_list_item(&mut tree, &mut list, "/y.txt", true);

        // Act
        let changed = tracker.pointer_down(&mut tree, &mut list, "/x.txt", false);

        // Assert
        assert!(!changed);
        assert!(tracker.has_pending_unselect());
        assert_eq!(list.selected().len(), 2);

        assert!(tracker.click(&mut tree, &mut list, "/x.txt", false));
        assert_eq!(list.selected().len(), 1);
        assert!(list.is_selected("/x.txt"));
        assert!(!tracker.has_pending_unselect());
    }

    #[test]
    fn test_pointer_down_on_unselected_selects_immediately() {
        let (mut tracker, mut tree, mut list) = fixture();
        assert!(tracker.pointer_down(&mut tree, &mut list, "/x.txt", false));
        assert!(!tracker.click(&mut tree, &mut list, "/x.txt", false));
        assert!(list.is_selected("/x.txt"));
    }

    #[test]
    fn test_drag_consumes_pending_flag() {
        let (mut tracker, mut tree, mut list) = fixture();
        tracker.select_list_item(&mut tree, &mut list, "/x.txt", false);
        tracker.pointer_down(&mut tree, &mut list, "/x.txt", false);

        assert!(tracker.take_pending_unselect());
        assert!(!tracker.click(&mut tree, &mut list, "/x.txt", false));
    }
}
