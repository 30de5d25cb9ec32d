/*
 * The flat listing of the currently open directory. Besides the items
 * themselves it tracks the breadcrumb trail and the folder/file/byte totals
 * shown in the status line. A synthetic ".." item is kept at the top whenever
 * the open directory is not the configured root.
 */
use crate::core::config::ExplorerConfig;
use crate::core::filter_engine::FilterEngine;
use crate::core::models::{ComputedView, NodeItem, ResourceDescriptor};
use crate::core::path_model;
use crate::core::sort_engine::{self, SortSpec, SortableEntry};

#[derive(Debug, Clone, PartialEq)]
pub struct ListItem {
    pub id: String,
    pub descriptor: ResourceDescriptor,
    pub computed: ComputedView,
    pub is_selected: bool,
    pub drag_hovered: bool,
}

impl ListItem {
    fn new(descriptor: ResourceDescriptor, filter: &FilterEngine) -> Self {
        let mut computed = ComputedView::derive(&descriptor);
        filter.apply_all(&descriptor, &mut computed);
        ListItem {
            id: descriptor.id.clone(),
            descriptor,
            computed,
            is_selected: false,
            drag_hovered: false,
        }
    }

    pub fn visible(&self) -> bool {
        self.descriptor.is_placeholder() || self.computed.is_visible()
    }

    pub fn as_item(&self) -> NodeItem {
        NodeItem::ListItem {
            descriptor: self.descriptor.clone(),
        }
    }
}

impl SortableEntry for ListItem {
    fn descriptor(&self) -> &ResourceDescriptor {
        &self.descriptor
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breadcrumb {
    pub label: String,
    pub path: String,
}

// Ticket for an in-flight directory listing; only the newest one is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListTicket {
    pub generation: u64,
    pub path: String,
}

pub struct ListStore {
    root_path: String,
    root_label: String,
    current_path: String,
    items: Vec<ListItem>,
    breadcrumbs: Vec<Breadcrumb>,
    folders_count: usize,
    files_count: usize,
    total_size: u64,
    sort_spec: SortSpec,
    allow_multiple: bool,
    generation: u64,
}

impl ListStore {
    pub fn new(config: &ExplorerConfig) -> Self {
        let mut store = ListStore {
            root_path: config.root_path.clone(),
            root_label: config.root_label.clone(),
            current_path: config.root_path.clone(),
            items: Vec::new(),
            breadcrumbs: Vec::new(),
            folders_count: 0,
            files_count: 0,
            total_size: 0,
            sort_spec: SortSpec::from_config(&config.sort),
            allow_multiple: config.options.allow_multiple_selection,
            generation: 0,
        };
        store.rebuild_breadcrumbs();
        store
    }

    pub fn root_path(&self) -> &str {
        &self.root_path
    }

    pub fn current_path(&self) -> &str {
        &self.current_path
    }

    pub fn is_at_root(&self) -> bool {
        self.current_path == self.root_path
    }

    pub fn items(&self) -> &[ListItem] {
        &self.items
    }

    pub fn visible_items(&self) -> impl Iterator<Item = &ListItem> {
        self.items.iter().filter(|i| i.visible())
    }

    pub fn item_ids(&self) -> Vec<String> {
        self.items.iter().map(|i| i.id.clone()).collect()
    }

    pub fn get(&self, id: &str) -> Option<&ListItem> {
        self.items
            .iter()
            .find(|i| i.id == id && !i.descriptor.is_placeholder())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn breadcrumbs(&self) -> &[Breadcrumb] {
        &self.breadcrumbs
    }

    pub fn folders_count(&self) -> usize {
        self.folders_count
    }

    pub fn files_count(&self) -> usize {
        self.files_count
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn allow_multiple(&self) -> bool {
        self.allow_multiple
    }

    pub fn begin_load(&mut self, path: &str) -> ListTicket {
        self.generation += 1;
        log::trace!(
            "ListStore: Begin load of '{path}' (generation {})",
            self.generation
        );
        ListTicket {
            generation: self.generation,
            path: path.to_string(),
        }
    }

    /*
     * Applies a listing for `ticket.path`, making it the current directory.
     * Returns false, leaving the store untouched, when a newer load was
     * started after this one.
     */
    pub fn finish_load(
        &mut self,
        ticket: ListTicket,
        resources: Vec<ResourceDescriptor>,
        filter: &FilterEngine,
    ) -> bool {
        if ticket.generation != self.generation {
            log::warn!(
                "ListStore: Discarding stale listing for '{}' (generation {}, newest {})",
                ticket.path,
                ticket.generation,
                self.generation
            );
            return false;
        }
        self.current_path = ticket.path;
        self.rebuild_breadcrumbs();
        self.set_list(resources, filter);
        true
    }

    /*
     * Replaces every item with `resources`. The placeholder is prepended when
     * the current directory is not the root; entries the server reports for
     * the directory itself are ignored.
     */
    pub fn set_list(&mut self, resources: Vec<ResourceDescriptor>, filter: &FilterEngine) {
        let mut items = Vec::with_capacity(resources.len() + 1);
        if !self.is_at_root() {
            items.push(ListItem::new(
                ResourceDescriptor::parent_placeholder(&self.current_path),
                filter,
            ));
        }
        items.extend(
            resources
                .into_iter()
                .filter(|d| !d.is_placeholder() && d.id != self.current_path)
                .map(|d| ListItem::new(d, filter)),
        );
        self.items = sort_engine::sort(items, &self.sort_spec);
        self.recompute_totals();
        log::debug!(
            "ListStore: Listing of '{}' has {} folders and {} files",
            self.current_path,
            self.folders_count,
            self.files_count
        );
    }

    /*
     * Appends confirmed new resources to the existing items and re-sorts,
     * without rebuilding the rest of the list. A resource whose id is already
     * listed replaces that item instead.
     */
    pub fn add_new(&mut self, resources: Vec<ResourceDescriptor>, filter: &FilterEngine) {
        for descriptor in resources {
            if let Some(existing) = self
                .items
                .iter_mut()
                .find(|i| i.id == descriptor.id && !i.descriptor.is_placeholder())
            {
                let selected = existing.is_selected;
                *existing = ListItem::new(descriptor, filter);
                existing.is_selected = selected;
            } else {
                self.items.push(ListItem::new(descriptor, filter));
            }
        }
        self.resort();
    }

    // Swaps the item with `old_id` for `descriptor`, keeping its selection.
    pub fn replace_item(
        &mut self,
        old_id: &str,
        descriptor: ResourceDescriptor,
        filter: &FilterEngine,
    ) -> bool {
        let Some(index) = self
            .items
            .iter()
            .position(|i| i.id == old_id && !i.descriptor.is_placeholder())
        else {
            return false;
        };
        let selected = self.items[index].is_selected;
        self.items[index] = ListItem::new(descriptor, filter);
        self.items[index].is_selected = selected;
        self.resort();
        true
    }

    pub fn remove_item(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items
            .retain(|i| i.id != id || i.descriptor.is_placeholder());
        let removed = self.items.len() != before;
        if removed {
            self.recompute_totals();
        }
        removed
    }

    /*
     * Selects the item with `id`. Without `additive` (or when multiple
     * selection is disabled) every other selection is cleared first; with it,
     * clicking an already-selected item deselects it. The placeholder is
     * never selectable.
     */
    pub fn select(&mut self, id: &str, additive: bool) -> bool {
        let additive = additive && self.allow_multiple;
        let Some(index) = self
            .items
            .iter()
            .position(|i| i.id == id && !i.descriptor.is_placeholder())
        else {
            return false;
        };
        if additive {
            self.items[index].is_selected = !self.items[index].is_selected;
        } else {
            self.unselect_all(false);
            self.items[index].is_selected = true;
        }
        true
    }

    /*
     * Clears the selection. When `preserve_if_modifier_held` is set and
     * multiple selection is allowed, the selection is kept so the next click
     * can extend it. Returns whether anything was deselected.
     */
    pub fn unselect_all(&mut self, preserve_if_modifier_held: bool) -> bool {
        if preserve_if_modifier_held && self.allow_multiple {
            return false;
        }
        let mut changed = false;
        for item in self.items.iter_mut().filter(|i| i.is_selected) {
            item.is_selected = false;
            changed = true;
        }
        changed
    }

    pub fn selected(&self) -> Vec<&ListItem> {
        self.items.iter().filter(|i| i.is_selected).collect()
    }

    pub fn selected_items(&self) -> Vec<NodeItem> {
        self.items
            .iter()
            .filter(|i| i.is_selected)
            .map(ListItem::as_item)
            .collect()
    }

    pub fn has_selection(&self) -> bool {
        self.items.iter().any(|i| i.is_selected)
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.get(id).is_some_and(|i| i.is_selected)
    }

    // Marks only `id` as hovered during a drag; `None` clears every flag.
    pub fn set_drag_hover(&mut self, id: Option<&str>) {
        for item in &mut self.items {
            item.drag_hovered = Some(item.id.as_str()) == id;
        }
    }

    pub fn apply_type_filter(&mut self, filter: &FilterEngine) {
        for item in &mut self.items {
            filter.apply_type_filter(&item.descriptor, &mut item.computed);
        }
    }

    pub fn apply_search(&mut self, filter: &FilterEngine) {
        for item in &mut self.items {
            filter.apply_search(&item.descriptor, &mut item.computed);
        }
    }

    pub fn set_sort_spec(&mut self, spec: SortSpec) {
        self.sort_spec = spec;
        self.resort();
    }

    pub fn sort_spec(&self) -> SortSpec {
        self.sort_spec
    }

    pub fn resort(&mut self) {
        let items = std::mem::take(&mut self.items);
        self.items = sort_engine::sort(items, &self.sort_spec);
        self.recompute_totals();
    }

    fn recompute_totals(&mut self) {
        let (mut folders, mut files, mut size) = (0, 0, 0);
        for item in self.items.iter().filter(|i| !i.descriptor.is_placeholder()) {
            if item.descriptor.is_folder() {
                folders += 1;
            } else {
                files += 1;
                size += item.descriptor.attributes.size;
            }
        }
        self.folders_count = folders;
        self.files_count = files;
        self.total_size = size;
    }

    fn rebuild_breadcrumbs(&mut self) {
        self.breadcrumbs = path_model::prefixes(&self.current_path)
            .into_iter()
            .filter(|prefix| path_model::starts_with(prefix, &self.root_path))
            .map(|prefix| Breadcrumb {
                label: if prefix == self.root_path {
                    self.root_label.clone()
                } else {
                    path_model::basename(&prefix).to_string()
                },
                path: prefix,
            })
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ResourceDescriptor as D;

    fn store_at(path: &str, resources: Vec<D>) -> (ListStore, FilterEngine) {
        let config = ExplorerConfig::default();
        let mut store = ListStore::new(&config);
        let filter = FilterEngine::new(&config);
        let ticket = store.begin_load(path);
        assert!(store.finish_load(ticket, resources, &filter));
        (store, filter)
    }

    #[test]
    fn test_docs_listing_has_placeholder_folder_then_file() {
        // Arrange & Act
        let (store, _) = store_at(
            "/docs/",
            vec![D::file("/docs/a.txt", 10, 0), D::folder("/docs/sub/", 0)],
        );

        // Assert
        let ids = store.item_ids();
        assert_eq!(ids, vec!["/", "/docs/sub/", "/docs/a.txt"]);
        assert!(store.items()[0].descriptor.is_placeholder());
        assert_eq!(store.folders_count(), 1);
        assert_eq!(store.files_count(), 1);
        assert_eq!(store.total_size(), 10);
    }

    #[test]
    fn test_root_listing_has_no_placeholder() {
        let (store, _) = store_at("/", vec![D::file("/a.txt", 1, 0)]);
        assert_eq!(store.item_ids(), vec!["/a.txt"]);
    }

    #[test]
    fn test_breadcrumbs() {
        let (store, _) = store_at("/docs/sub/", vec![]);
        let crumbs = store
            .breadcrumbs()
            .iter()
            .map(|b| (b.label.as_str(), b.path.as_str()))
            .collect::<Vec<_>>();
        assert_eq!(
            crumbs,
            vec![("Files", "/"), ("docs", "/docs/"), ("sub", "/docs/sub/")]
        );
    }

    #[test]
    fn test_stale_listing_is_discarded() {
        let config = ExplorerConfig::default();
        let mut store = ListStore::new(&config);
        let filter = FilterEngine::new(&config);
        let slow = store.begin_load("/slow/");
        let fast = store.begin_load("/fast/");

        assert!(store.finish_load(fast, vec![D::file("/fast/f.txt", 1, 0)], &filter));
        assert!(!store.finish_load(slow, vec![D::file("/slow/s.txt", 1, 0)], &filter));

        assert_eq!(store.current_path(), "/fast/");
        assert!(store.contains("/fast/f.txt"));
    }

    #[test]
    fn test_add_new_appends_and_resorts() {
        let (mut store, filter) = store_at("/", vec![D::file("/b.txt", 1, 0)]);
        store.add_new(vec![D::file("/a.txt", 2, 0), D::folder("/z/", 0)], &filter);
        assert_eq!(store.item_ids(), vec!["/z/", "/a.txt", "/b.txt"]);
        assert_eq!(store.total_size(), 3);
    }

    #[test]
    fn test_replace_item_keeps_selection() {
        let (mut store, filter) = store_at("/", vec![D::file("/b.txt", 1, 0), D::file("/c.txt", 1, 0)]);
        store.select("/c.txt", false);

        assert!(store.replace_item("/c.txt", D::file("/a.txt", 1, 0), &filter));

        assert_eq!(store.item_ids(), vec!["/a.txt", "/b.txt"]);
        assert!(store.is_selected("/a.txt"));
    }

    #[test]
    fn test_remove_item_never_removes_placeholder() {
        let (mut store, _) = store_at("/d/", vec![D::file("/d/x.txt", 4, 0)]);
        assert!(!store.remove_item("/"));
        assert!(store.remove_item("/d/x.txt"));
        assert_eq!(store.item_ids(), vec!["/"]);
        assert_eq!(store.total_size(), 0);
    }

    #[test]
    fn test_selection_additive_and_replacing() {
        let (mut store, _) = store_at(
            "/d/",
            vec![D::file("/d/a", 1, 0), D::file("/d/b", 1, 0), D::file("/d/c", 1, 0)],
        );
        assert!(!store.select("/", false));

        store.select("/d/a", false);
        store.select("/d/b", true);
        assert_eq!(store.selected().len(), 2);

        store.select("/d/b", true);
        assert_eq!(store.selected().len(), 1);

        store.select("/d/c", false);
        let selected = store.selected_items();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id(), "/d/c");

        assert!(!store.unselect_all(true));
        assert!(store.unselect_all(false));
        assert!(!store.has_selection());
    }

    #[test]
    fn test_single_selection_mode_ignores_modifier() {
        let mut config = ExplorerConfig::default();
        config.options.allow_multiple_selection = false;
        let mut store = ListStore::new(&config);
        let filter = FilterEngine::new(&config);
        store.set_list(vec![D::file("/a", 1, 0), D::file("/b", 1, 0)], &filter);

        store.select("/a", false);
        store.select("/b", true);

        assert_eq!(store.selected().len(), 1);
        assert!(store.unselect_all(true));
    }

    #[test]
    fn test_drag_hover_is_exclusive() {
        let (mut store, _) = store_at("/", vec![D::folder("/a/", 0), D::folder("/b/", 0)]);
        store.set_drag_hover(Some("/a/"));
        store.set_drag_hover(Some("/b/"));
        let hovered = store
            .items()
            .iter()
            .filter(|i| i.drag_hovered)
            .map(|i| i.id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(hovered, vec!["/b/"]);
        store.set_drag_hover(None);
        assert!(store.items().iter().all(|i| !i.drag_hovered));
    }

    #[test]
    fn test_search_keeps_placeholder_visible() {
        let config = ExplorerConfig::default();
        let (mut store, _) = store_at("/d/", vec![D::file("/d/apple", 1, 0), D::file("/d/berry", 1, 0)]);
        let mut filter = FilterEngine::new(&config);
        filter.set_search_term("ap");

        store.apply_search(&filter);

        let visible = store.visible_items().map(|i| i.id.as_str()).collect::<Vec<_>>();
        assert_eq!(visible, vec!["/", "/d/apple"]);
    }
}
