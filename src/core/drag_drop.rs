/*
 * Drop-target acceptance shared by the tree and the list. A drop onto a file
 * means a drop into the folder that contains it.
 */
use crate::core::models::{NodeItem, ResourceDescriptor};
use crate::core::path_model;

// The folder a drop onto `target` would move items into.
pub fn drop_folder(target: &ResourceDescriptor) -> String {
    if target.is_folder() {
        target.id.clone()
    } else {
        path_model::dirname(&target.id)
    }
}

/*
 * Whether `dragged` may be dropped onto `target`. Rejected when the target is
 * not writable, when any dragged item is the target itself, when the target
 * folder lies inside (or is) a dragged folder, or when the target folder is
 * where a dragged item already lives.
 */
pub fn is_drop_allowed(target: &ResourceDescriptor, dragged: &[NodeItem]) -> bool {
    if dragged.is_empty() || !target.attributes.writable {
        return false;
    }
    let folder = drop_folder(target);
    dragged.iter().all(|item| {
        let id = item.id();
        if id == target.id {
            return false;
        }
        if item.is_folder() && path_model::starts_with(&folder, id) {
            return false;
        }
        path_model::closest_containing_folder(id) != folder
    })
}

// An active drag: the dragged snapshot plus the current hover state.
#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    items: Vec<NodeItem>,
    hovered: Option<String>,
    restricted: bool,
}

impl DragSession {
    pub fn new(items: Vec<NodeItem>) -> Self {
        DragSession {
            items,
            hovered: None,
            restricted: false,
        }
    }

    pub fn items(&self) -> &[NodeItem] {
        &self.items
    }

    // Records the hovered target. Returns whether a drop there is allowed.
    pub fn hover(&mut self, target: &ResourceDescriptor) -> bool {
        let allowed = is_drop_allowed(target, &self.items);
        self.hovered = Some(target.id.clone());
        self.restricted = !allowed;
        allowed
    }

    pub fn hovered(&self) -> Option<&str> {
        self.hovered.as_deref()
    }

    pub fn is_restricted(&self) -> bool {
        self.restricted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ResourceDescriptor as D;

    fn dragged(descriptor: D) -> Vec<NodeItem> {
        vec![NodeItem::ListItem { descriptor }]
    }

    #[test]
    fn test_drop_onto_self_is_rejected() {
        let folder = D::folder("/a/b/", 0);
        assert!(!is_drop_allowed(&folder, &dragged(folder.clone())));
        let file = D::file("/a/f.txt", 1, 0);
        assert!(!is_drop_allowed(&file, &dragged(file.clone())));
    }

    #[test]
    fn test_drop_into_own_descendant_is_rejected() {
        let target = D::folder("/a/b/c/", 0);
        assert!(!is_drop_allowed(&target, &dragged(D::folder("/a/b/", 0))));
        // Literal prefix: /a/bc/ is not inside /a/b/.
        let sibling = D::folder("/a/bc/", 0);
        assert!(is_drop_allowed(&sibling, &dragged(D::folder("/a/b/", 0))));
    }

    #[test]
    fn test_same_folder_drop_is_rejected() {
        let containing = D::folder("/a/", 0);
        assert!(!is_drop_allowed(&containing, &dragged(D::folder("/a/b/", 0))));
        assert!(!is_drop_allowed(&containing, &dragged(D::file("/a/f.txt", 1, 0))));
    }

    #[test]
    fn test_drop_into_grandparent_is_allowed() {
        let grandparent = D::folder("/", 0);
        assert!(is_drop_allowed(&grandparent, &dragged(D::file("/a/b/f.txt", 1, 0))));
    }

    #[test]
    fn test_unwritable_target_is_rejected() {
        let mut target = D::folder("/x/", 0);
        target.attributes.writable = false;
        assert!(!is_drop_allowed(&target, &dragged(D::file("/a/f.txt", 1, 0))));
    }

    #[test]
    fn test_file_target_resolves_to_its_folder() {
        let target = D::file("/x/other.txt", 1, 0);
        assert_eq!(drop_folder(&target), "/x/");
        assert!(is_drop_allowed(&target, &dragged(D::file("/a/f.txt", 1, 0))));
        assert!(!is_drop_allowed(&target, &dragged(D::file("/x/f.txt", 1, 0))));
    }

    #[test]
    fn test_any_rejected_item_rejects_the_drop() {
        let target = D::folder("/x/", 0);
        let items = vec![
            NodeItem::ListItem {
                descriptor: D::file("/a/f.txt", 1, 0),
            },
            NodeItem::ListItem {
                descriptor: D::file("/x/g.txt", 1, 0),
            },
        ];
        assert!(!is_drop_allowed(&target, &items));
        assert!(!is_drop_allowed(&target, &[]));
    }

    #[test]
    fn test_session_tracks_restricted_hover() {
        let mut session = DragSession::new(dragged(D::file("/a/f.txt", 1, 0)));
        assert!(!session.hover(&D::folder("/a/", 0)));
        assert!(session.is_restricted());
        assert!(session.hover(&D::folder("/b/", 0)));
        assert!(!session.is_restricted());
        assert_eq!(session.hovered(), Some("/b/"));
    }
}
