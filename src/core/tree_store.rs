/*
 * The materialised part of the remote hierarchy. Nodes live in an arena keyed
 * by `NodeHandle`; a node owns the ordered list of its children's handles and
 * refers back to its parent by handle only, so dropping a subtree never has to
 * untangle references.
 *
 * Only folders that were visited or expanded are present, which keeps the
 * pre-order searches in `find_by_id` and `find_by_predicate` cheap enough that
 * no id index is maintained.
 *
 * Loads are two-phase: `begin_load` hands out a generation-numbered ticket and
 * `finish_load` applies the response only when that ticket is still the newest
 * one issued for the node. A slow response for a superseded load is dropped.
 */
use std::collections::{HashMap, HashSet};

use crate::core::config::ExplorerConfig;
use crate::core::filter_engine::FilterEngine;
use crate::core::models::{ComputedView, NodeHandle, NodeItem, ResourceDescriptor};
use crate::core::path_model;
use crate::core::sort_engine::{self, SortSpec, SortableEntry};

// Whether a folder's children have been fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Unloaded,
    Loading,
    Loaded,
}

// Expanding and Collapsing are the in-flight slide transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpansionState {
    Collapsed,
    Expanding,
    Expanded,
    Collapsing,
}

#[derive(Debug, Clone)]
pub struct TreeNode {
    pub handle: NodeHandle,
    pub id: String,
    pub descriptor: ResourceDescriptor,
    pub computed: ComputedView,
    pub children: Vec<NodeHandle>,
    pub parent: Option<NodeHandle>,
    pub load_state: LoadState,
    pub expansion: ExpansionState,
    pub is_selected: bool,
    pub level: usize,
    pub is_first: bool,
    pub is_last: bool,
    load_generation: u64,
}

impl TreeNode {
    pub fn visible(&self) -> bool {
        self.computed.is_visible()
    }

    pub fn is_loaded(&self) -> bool {
        self.load_state == LoadState::Loaded
    }

    pub fn is_expanded(&self) -> bool {
        self.expansion == ExpansionState::Expanded
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn as_item(&self) -> NodeItem {
        NodeItem::TreeNode {
            handle: self.handle,
            descriptor: self.descriptor.clone(),
        }
    }
}

// Proof that a load was started; only the newest ticket per node is honoured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    pub handle: NodeHandle,
    pub generation: u64,
}

struct ChildRef<'a> {
    handle: NodeHandle,
    descriptor: &'a ResourceDescriptor,
}

impl SortableEntry for ChildRef<'_> {
    fn descriptor(&self) -> &ResourceDescriptor {
        self.descriptor
    }
}

pub struct TreeStore {
    nodes: HashMap<NodeHandle, TreeNode>,
    root: NodeHandle,
    next_handle: u64,
    next_generation: u64,
    sort_spec: SortSpec,
    folders_only: bool,
    selected: Option<NodeHandle>,
}

impl TreeStore {
    pub fn new(config: &ExplorerConfig) -> Self {
        let root = NodeHandle(0);
        let mut descriptor = ResourceDescriptor::folder(&config.root_path, 0);
        descriptor.attributes.name = config.root_label.clone();
        let computed = ComputedView::derive(&descriptor);
        let root_node = TreeNode {
            handle: root,
            id: config.root_path.clone(),
            descriptor,
            computed,
            children: Vec::new(),
            parent: None,
            load_state: LoadState::Unloaded,
            expansion: ExpansionState::Collapsed,
            is_selected: false,
            level: 0,
            is_first: true,
            is_last: true,
            load_generation: 0,
        };
        let mut nodes = HashMap::new();
        nodes.insert(root, root_node);
        TreeStore {
            nodes,
            root,
            next_handle: 1,
            next_generation: 1,
            sort_spec: SortSpec::from_config(&config.sort),
            folders_only: config.filetree.folders_only,
            selected: None,
        }
    }

    pub fn root(&self) -> NodeHandle {
        self.root
    }

    pub fn get(&self, handle: NodeHandle) -> Option<&TreeNode> {
        self.nodes.get(&handle)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn folders_only(&self) -> bool {
        self.folders_only
    }

    pub fn sort_spec(&self) -> SortSpec {
        self.sort_spec
    }

    pub fn children_of(&self, handle: NodeHandle) -> &[NodeHandle] {
        self.nodes
            .get(&handle)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    // Ids of the children of `handle`, in display order.
    pub fn child_ids(&self, handle: NodeHandle) -> Vec<String> {
        self.children_of(handle)
            .iter()
            .filter_map(|h| self.nodes.get(h).map(|n| n.id.clone()))
            .collect()
    }

    /*
     * Marks the node as loading and returns the ticket its response must carry.
     * Concurrent loads of the same node are not merged: each call issues a new
     * ticket and only the last one will be applied.
     */
    pub fn begin_load(&mut self, handle: NodeHandle) -> Option<LoadTicket> {
        let generation = self.next_generation;
        let node = self.nodes.get_mut(&handle)?;
        self.next_generation += 1;
        node.load_generation = generation;
        node.load_state = LoadState::Loading;
        log::trace!("TreeStore: Begin load of '{}' (generation {generation})", node.id);
        Some(LoadTicket { handle, generation })
    }

    fn is_current(&self, ticket: &LoadTicket) -> bool {
        self.nodes
            .get(&ticket.handle)
            .is_some_and(|n| n.load_generation == ticket.generation)
    }

    /*
     * Applies a folder listing. With `refresh` the existing children are
     * replaced; otherwise the listing is merged into them, refreshing the
     * descriptor of children that already exist. Returns false when the ticket
     * is stale or the node no longer exists.
     */
    pub fn finish_load(
        &mut self,
        ticket: LoadTicket,
        resources: Vec<ResourceDescriptor>,
        refresh: bool,
        filter: &FilterEngine,
    ) -> bool {
        if !self.is_current(&ticket) {
            log::warn!(
                "TreeStore: Discarding stale listing for {:?} (generation {})",
                ticket.handle,
                ticket.generation
            );
            return false;
        }
        let handle = ticket.handle;
        if refresh {
            let old_children = self.children_of(handle).to_vec();
            for child in old_children {
                self.remove_node(child);
            }
        }
        let folders_only = self.folders_only;
        let accepted = resources
            .into_iter()
            .filter(|d| !d.is_placeholder())
            .filter(|d| !(folders_only && !d.is_folder()))
            .collect::<Vec<_>>();
        let count = accepted.len();
        for descriptor in accepted {
            self.insert_child(handle, descriptor, filter);
        }
        self.sort_children(handle);
        if let Some(node) = self.nodes.get_mut(&handle) {
            node.load_state = LoadState::Loaded;
            node.expansion = ExpansionState::Expanded;
            log::debug!("TreeStore: Loaded {count} children into '{}'", node.id);
        }
        true
    }

    // A failed load returns the node to unloaded so a retry is possible.
    pub fn fail_load(&mut self, ticket: LoadTicket) -> bool {
        if !self.is_current(&ticket) {
            return false;
        }
        if let Some(node) = self.nodes.get_mut(&ticket.handle) {
            node.load_state = LoadState::Unloaded;
        }
        true
    }

    fn insert_child(
        &mut self,
        parent: NodeHandle,
        descriptor: ResourceDescriptor,
        filter: &FilterEngine,
    ) -> Option<NodeHandle> {
        let parent_level = self.nodes.get(&parent)?.level;
        let existing = self
            .children_of(parent)
            .iter()
            .copied()
            .find(|h| self.nodes.get(h).is_some_and(|n| n.id == descriptor.id));
        if let Some(existing) = existing {
            self.relabel(existing, descriptor, filter);
            return Some(existing);
        }
        let handle = NodeHandle(self.next_handle);
        self.next_handle += 1;
        let mut computed = ComputedView::derive(&descriptor);
        filter.apply_type_filter(&descriptor, &mut computed);
        let node = TreeNode {
            handle,
            id: descriptor.id.clone(),
            descriptor,
            computed,
            children: Vec::new(),
            parent: Some(parent),
            load_state: LoadState::Unloaded,
            expansion: ExpansionState::Collapsed,
            is_selected: false,
            level: parent_level + 1,
            is_first: false,
            is_last: false,
            load_generation: 0,
        };
        self.nodes.insert(handle, node);
        if let Some(parent_node) = self.nodes.get_mut(&parent) {
            parent_node.children.push(handle);
        }
        Some(handle)
    }

    /*
     * Inserts one resource under `parent` and re-sorts the siblings. Files are
     * skipped when the tree shows folders only. A child with the same id is
     * updated in place instead of duplicated.
     */
    pub fn add_node(
        &mut self,
        parent: NodeHandle,
        descriptor: ResourceDescriptor,
        filter: &FilterEngine,
    ) -> Option<NodeHandle> {
        if self.folders_only && !descriptor.is_folder() {
            return None;
        }
        let handle = self.insert_child(parent, descriptor, filter)?;
        self.sort_children(parent);
        Some(handle)
    }

    pub fn add_nodes(
        &mut self,
        parent: NodeHandle,
        descriptors: Vec<ResourceDescriptor>,
        filter: &FilterEngine,
    ) -> Vec<NodeHandle> {
        let folders_only = self.folders_only;
        let handles = descriptors
            .into_iter()
            .filter(|d| !(folders_only && !d.is_folder()))
            .filter_map(|d| self.insert_child(parent, d, filter))
            .collect::<Vec<_>>();
        self.sort_children(parent);
        handles
    }

    /*
     * Detaches a node and drops its whole subtree. The root has no parent and
     * cannot be removed; that case is a silent no-op returning false.
     */
    pub fn remove_node(&mut self, handle: NodeHandle) -> bool {
        let Some(parent) = self.nodes.get(&handle).and_then(|n| n.parent) else {
            return false;
        };
        if let Some(parent_node) = self.nodes.get_mut(&parent) {
            parent_node.children.retain(|h| *h != handle);
        }
        let mut stack = vec![handle];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.remove(&current) {
                if self.selected == Some(current) {
                    self.selected = None;
                }
                stack.extend(node.children);
            }
        }
        self.update_positions(parent);
        true
    }

    pub fn find_by_id(&self, id: &str) -> Option<NodeHandle> {
        self.find_by_predicate(self.root, |n| n.id == id, true)
            .into_iter()
            .next()
    }

    /*
     * Pre-order depth-first search from `start`. With `first_only` the walk
     * stops at the first match.
     */
    pub fn find_by_predicate<P>(&self, start: NodeHandle, predicate: P, first_only: bool) -> Vec<NodeHandle>
    where
        P: Fn(&TreeNode) -> bool,
    {
        let mut found = Vec::new();
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get(&current) else {
                continue;
            };
            if predicate(node) {
                found.push(current);
                if first_only {
                    break;
                }
            }
            stack.extend(node.children.iter().rev().copied());
        }
        found
    }

    /*
     * Rewrites the id, descriptor id and containing path of `handle` and every
     * descendant by replacing a leading `old_prefix` with `new_prefix`. All
     * descendants share the old folder path as a literal prefix, so the same
     * pair is applied at every depth.
     */
    pub fn rebase_subtree(&mut self, handle: NodeHandle, old_prefix: &str, new_prefix: &str) {
        let mut stack = vec![handle];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get_mut(&current) else {
                continue;
            };
            node.id = path_model::rebase_prefix(&node.id, old_prefix, new_prefix);
            node.descriptor.id = path_model::rebase_prefix(&node.descriptor.id, old_prefix, new_prefix);
            node.descriptor.attributes.containing_path = path_model::rebase_prefix(
                &node.descriptor.attributes.containing_path,
                old_prefix,
                new_prefix,
            );
            stack.extend(node.children.iter().copied());
        }
    }

    // Replaces a node's descriptor wholesale and recomputes its derived view.
    pub fn relabel(&mut self, handle: NodeHandle, descriptor: ResourceDescriptor, filter: &FilterEngine) {
        if let Some(node) = self.nodes.get_mut(&handle) {
            let mut computed = ComputedView::derive(&descriptor);
            filter.apply_type_filter(&descriptor, &mut computed);
            node.id = descriptor.id.clone();
            node.descriptor = descriptor;
            node.computed = computed;
        }
    }

    pub fn sort_children(&mut self, handle: NodeHandle) {
        let Some(node) = self.nodes.get(&handle) else {
            return;
        };
        let refs = node
            .children
            .iter()
            .filter_map(|h| {
                self.nodes.get(h).map(|child| ChildRef {
                    handle: *h,
                    descriptor: &child.descriptor,
                })
            })
            .collect::<Vec<_>>();
        let ordered = sort_engine::sort(refs, &self.sort_spec)
            .into_iter()
            .map(|r| r.handle)
            .collect::<Vec<_>>();
        if let Some(node) = self.nodes.get_mut(&handle) {
            node.children = ordered;
        }
        self.update_positions(handle);
    }

    fn update_positions(&mut self, parent: NodeHandle) {
        let Some(parent_node) = self.nodes.get(&parent) else {
            return;
        };
        let level = parent_node.level + 1;
        let children = parent_node.children.clone();
        let last = children.len().saturating_sub(1);
        for (index, child) in children.iter().enumerate() {
            if let Some(node) = self.nodes.get_mut(child) {
                node.level = level;
                node.is_first = index == 0;
                node.is_last = index == last;
            }
        }
    }

    pub fn set_sort_spec(&mut self, spec: SortSpec) {
        self.sort_spec = spec;
        self.resort_all();
    }

    pub fn resort_all(&mut self) {
        let parents = self
            .nodes
            .values()
            .filter(|n| !n.children.is_empty())
            .map(|n| n.handle)
            .collect::<Vec<_>>();
        for parent in parents {
            self.sort_children(parent);
        }
    }

    pub fn apply_type_filter(&mut self, filter: &FilterEngine) {
        for node in self.nodes.values_mut() {
            if node.parent.is_some() {
                filter.apply_type_filter(&node.descriptor, &mut node.computed);
            }
        }
    }

    // Selects a single node. The root is never selectable.
    pub fn select(&mut self, handle: NodeHandle) -> bool {
        if !self.nodes.get(&handle).is_some_and(|n| !n.is_root()) {
            return false;
        }
        self.clear_selection();
        if let Some(node) = self.nodes.get_mut(&handle) {
            node.is_selected = true;
        }
        self.selected = Some(handle);
        true
    }

    pub fn clear_selection(&mut self) -> bool {
        let Some(previous) = self.selected.take() else {
            return false;
        };
        if let Some(node) = self.nodes.get_mut(&previous) {
            node.is_selected = false;
        }
        true
    }

    pub fn selected(&self) -> Option<NodeHandle> {
        self.selected
    }

    pub fn selected_item(&self) -> Option<NodeItem> {
        self.selected
            .and_then(|h| self.nodes.get(&h))
            .map(TreeNode::as_item)
    }

    // Starts the slide-down. Returns false when the node is not fully collapsed.
    pub fn expand(&mut self, handle: NodeHandle) -> bool {
        match self.nodes.get_mut(&handle) {
            Some(node) if node.expansion == ExpansionState::Collapsed => {
                node.expansion = ExpansionState::Expanding;
                true
            }
            _ => false,
        }
    }

    pub fn collapse(&mut self, handle: NodeHandle) -> bool {
        match self.nodes.get_mut(&handle) {
            Some(node) if node.expansion == ExpansionState::Expanded => {
                node.expansion = ExpansionState::Collapsing;
                true
            }
            _ => false,
        }
    }

    // Completes an in-flight slide.
    pub fn settle(&mut self, handle: NodeHandle) {
        if let Some(node) = self.nodes.get_mut(&handle) {
            node.expansion = match node.expansion {
                ExpansionState::Expanding => ExpansionState::Expanded,
                ExpansionState::Collapsing => ExpansionState::Collapsed,
                other => other,
            };
        }
    }

    pub fn is_sliding(&self, handle: NodeHandle) -> bool {
        self.nodes.get(&handle).is_some_and(|n| {
            matches!(
                n.expansion,
                ExpansionState::Expanding | ExpansionState::Collapsing
            )
        })
    }

    pub fn ids(&self) -> HashSet<String> {
        self.nodes.values().map(|n| n.id.clone()).collect()
    }
}
