use crate::app_logic::events::{ExplorerEvent, MessageSeverity};
use crate::core::{
    self, Action, BatchOutcome, ClipboardEngine, ClipboardMode, ClockOperations, ConnectorError,
    ConnectorOperations, ConnectorResponse, DragSession, ErrorObject, ExplorerConfig,
    FilterEngine, ListStore, ListTicket, LoadTicket, MutationRequest, NodeHandle, NodeItem,
    ResourceDescriptor, ResponseData, SearchDebouncer, SelectionTracker, SortField,
    StorageSummary, TreeStore, path_model,
};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

// A request rejected locally, before anything was sent to the server.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    EmptyName,
    InvalidName(String),
    DropNotAllowed,
    ClipboardEmpty,
    NotFound(String),
    ActionDisabled(Action),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::EmptyName => write!(f, "A name is required"),
            ValidationError::InvalidName(name) => write!(f, "'{name}' is not a valid name"),
            ValidationError::DropNotAllowed => write!(f, "Items cannot be placed there"),
            ValidationError::ClipboardEmpty => write!(f, "The clipboard is empty"),
            ValidationError::NotFound(id) => write!(f, "'{id}' is not loaded"),
            ValidationError::ActionDisabled(action) => write!(f, "{action:?} is disabled"),
        }
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq)]
pub enum ExplorerError {
    Transport(ConnectorError),
    Application(Vec<ErrorObject>),
    Validation(ValidationError),
}

impl From<ConnectorError> for ExplorerError {
    fn from(err: ConnectorError) -> Self {
        ExplorerError::Transport(err)
    }
}

impl From<ValidationError> for ExplorerError {
    fn from(err: ValidationError) -> Self {
        ExplorerError::Validation(err)
    }
}

impl std::fmt::Display for ExplorerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExplorerError::Transport(e) => write!(f, "Transport failure: {e}"),
            ExplorerError::Application(errors) => {
                let messages = errors
                    .iter()
                    .map(|e| e.message.as_str())
                    .collect::<Vec<_>>()
                    .join("; ");
                write!(f, "Server error: {messages}")
            }
            ExplorerError::Validation(e) => write!(f, "Rejected: {e}"),
        }
    }
}

impl std::error::Error for ExplorerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExplorerError::Transport(e) => Some(e),
            ExplorerError::Validation(e) => Some(e),
            ExplorerError::Application(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ExplorerError>;

#[derive(Debug, Clone, PartialEq)]
pub struct PreviewState {
    pub descriptor: ResourceDescriptor,
    pub content: String,
}

/*
 * The coordinator between the UI and the engine. Every command either rejects
 * locally, or issues connector requests and applies only the results the
 * server confirmed. Nothing is patched optimistically: a failed request leaves
 * both stores as they were.
 *
 * Outgoing notifications are queued and drained by the UI with
 * `try_dequeue_event`.
 */
pub struct ExplorerLogic {
    config: ExplorerConfig,
    connector: Arc<dyn ConnectorOperations>,
    clock: Arc<dyn ClockOperations>,
    pub(crate) tree: TreeStore,
    pub(crate) list: ListStore,
    selection: SelectionTracker,
    clipboard: ClipboardEngine,
    filter: FilterEngine,
    debouncer: SearchDebouncer,
    drag: Option<DragSession>,
    preview: Option<PreviewState>,
    events: VecDeque<ExplorerEvent>,
}

impl ExplorerLogic {
    pub fn new(
        config: ExplorerConfig,
        connector: Arc<dyn ConnectorOperations>,
        clock: Arc<dyn ClockOperations>,
    ) -> Self {
        ExplorerLogic {
            tree: TreeStore::new(&config),
            list: ListStore::new(&config),
            selection: SelectionTracker::new(&config),
            clipboard: ClipboardEngine::new(&config),
            filter: FilterEngine::new(&config),
            debouncer: SearchDebouncer::new(Duration::from_millis(config.search.typing_delay_ms)),
            drag: None,
            preview: None,
            events: VecDeque::new(),
            config,
            connector,
            clock,
        }
    }

    // Loads the root listing into the list and, when the tree is enabled, the tree.
    pub fn start(&mut self) -> Result<()> {
        let root_path = self.config.root_path.clone();
        if self.config.filetree.enabled {
            self.load_children(self.tree.root(), false)?;
        }
        self.load_list(&root_path)
    }

    // --- Read-only accessors ---

    pub fn config(&self) -> &ExplorerConfig {
        &self.config
    }

    pub fn tree(&self) -> &TreeStore {
        &self.tree
    }

    pub fn list(&self) -> &ListStore {
        &self.list
    }

    pub fn clipboard(&self) -> &ClipboardEngine {
        &self.clipboard
    }

    pub fn filter(&self) -> &FilterEngine {
        &self.filter
    }

    pub fn preview(&self) -> Option<&PreviewState> {
        self.preview.as_ref()
    }

    pub fn drag_session(&self) -> Option<&DragSession> {
        self.drag.as_ref()
    }

    pub fn selection(&self) -> Vec<NodeItem> {
        self.selection.snapshot(&self.tree, &self.list)
    }

    pub fn try_dequeue_event(&mut self) -> Option<ExplorerEvent> {
        self.events.pop_front()
    }

    pub fn drain_events(&mut self) -> Vec<ExplorerEvent> {
        self.events.drain(..).collect()
    }

    // --- Event and error plumbing ---

    fn emit(&mut self, event: ExplorerEvent) {
        self.events.push_back(event);
    }

    fn show_message(&mut self, severity: MessageSeverity, text: String) {
        self.emit(ExplorerEvent::ShowMessage { severity, text });
    }

    fn reject(&mut self, error: ValidationError) -> ExplorerError {
        log::warn!("ExplorerLogic: Rejected locally: {error}");
        self.show_message(MessageSeverity::Warning, error.to_string());
        ExplorerError::Validation(error)
    }

    fn require_action(&mut self, action: Action) -> Result<()> {
        if self.config.is_action_allowed(action) {
            Ok(())
        } else {
            Err(self.reject(ValidationError::ActionDisabled(action)))
        }
    }

    // The root folder itself cannot be renamed, moved or deleted.
    fn require_not_root(&mut self, id: &str, action: Action) -> Result<()> {
        if id == self.config.root_path {
            Err(self.reject(ValidationError::ActionDisabled(action)))
        } else {
            Ok(())
        }
    }

    /*
     * Turns a raw connector result into either a usable response or an error
     * that has already been reported. Transport failures produce one error
     * message; application errors produce one message each, plus a redirect
     * request when the server asked for one.
     */
    fn accept_response(
        &mut self,
        response: std::result::Result<ConnectorResponse, ConnectorError>,
    ) -> Result<ConnectorResponse> {
        let response = match response {
            Ok(r) => r,
            Err(e) => {
                log::error!("ExplorerLogic: Transport failure: {e}");
                self.show_message(MessageSeverity::Error, e.to_string());
                return Err(ExplorerError::Transport(e));
            }
        };
        if response.is_ok() {
            return Ok(response);
        }
        for error in &response.errors {
            log::warn!("ExplorerLogic: Server reported: {}", error.message);
            self.show_message(MessageSeverity::Error, error.message.clone());
            if let Some(url) = error.redirect() {
                self.emit(ExplorerEvent::Redirect {
                    url: url.to_string(),
                });
            }
        }
        Err(ExplorerError::Application(response.errors))
    }

    fn request(&mut self, request: &MutationRequest) -> Result<ConnectorResponse> {
        log::debug!("ExplorerLogic: Sending '{}' request", request.op_name());
        let response = self.connector.mutate(request);
        self.accept_response(response)
    }

    // A well-formed response that lacks the data the operation needs.
    fn malformed<T>(&mut self, message: String) -> Result<T> {
        let error = ConnectorError::Decode(message);
        log::error!("ExplorerLogic: {error}");
        self.show_message(MessageSeverity::Error, error.to_string());
        Err(ExplorerError::Transport(error))
    }

    // The single descriptor a mutation response must carry.
    fn expect_resource(&mut self, response: ConnectorResponse, op: &str) -> Result<ResourceDescriptor> {
        match response.into_descriptors().into_iter().next() {
            Some(d) => Ok(d),
            None => self.malformed(format!("'{op}' response carried no resource")),
        }
    }

    fn selection_fingerprint(&self) -> (Option<NodeHandle>, Vec<String>) {
        (
            self.tree.selected(),
            self.list.selected().iter().map(|i| i.id.clone()).collect(),
        )
    }

    fn emit_store_changes(&mut self, selection_before: (Option<NodeHandle>, Vec<String>)) {
        self.emit(ExplorerEvent::TreeChanged);
        self.emit(ExplorerEvent::ListChanged);
        if self.selection_fingerprint() != selection_before {
            self.emit(ExplorerEvent::SelectionChanged);
        }
    }

    // --- Navigation ---

    pub fn load_list(&mut self, path: &str) -> Result<()> {
        let ticket = self.begin_load_list(path);
        let response = self.connector.list(path);
        self.finish_load_list(ticket, response).map(|_| ())
    }

    pub fn begin_load_list(&mut self, path: &str) -> ListTicket {
        self.list.begin_load(path)
    }

    /*
     * Applies a listing obtained for `ticket`. Returns Ok(false) when a newer
     * listing was requested in the meantime and this one was dropped.
     */
    pub fn finish_load_list(
        &mut self,
        ticket: ListTicket,
        response: std::result::Result<ConnectorResponse, ConnectorError>,
    ) -> Result<bool> {
        let resources = self.accept_response(response)?.into_descriptors();
        let before = self.selection_fingerprint();
        if !self.list.finish_load(ticket, resources, &self.filter) {
            return Ok(false);
        }
        if let Some(session) = &self.drag {
            if let Some(hovered) = session.hovered() {
                let hovered = hovered.to_string();
                self.list.set_drag_hover(Some(&hovered));
            }
        }
        self.emit(ExplorerEvent::ListChanged);
        if self.selection_fingerprint() != before {
            self.emit(ExplorerEvent::SelectionChanged);
        }
        Ok(true)
    }

    pub fn load_children(&mut self, handle: NodeHandle, refresh: bool) -> Result<()> {
        let Some(ticket) = self.begin_load_children(handle) else {
            return Err(self.reject(ValidationError::NotFound(format!("{handle:?}"))));
        };
        let id = self
            .tree
            .get(handle)
            .map(|n| n.id.clone())
            .unwrap_or_default();
        let response = self.connector.list(&id);
        self.finish_load_children(ticket, response, refresh).map(|_| ())
    }

    // Marks the node as loading (the UI shows a spinner) and returns its ticket.
    pub fn begin_load_children(&mut self, handle: NodeHandle) -> Option<LoadTicket> {
        let ticket = self.tree.begin_load(handle)?;
        self.emit(ExplorerEvent::TreeChanged);
        Some(ticket)
    }

    pub fn finish_load_children(
        &mut self,
        ticket: LoadTicket,
        response: std::result::Result<ConnectorResponse, ConnectorError>,
        refresh: bool,
    ) -> Result<bool> {
        let resources = match self.accept_response(response) {
            Ok(r) => r.into_descriptors(),
            Err(e) => {
                if self.tree.fail_load(ticket) {
                    self.emit(ExplorerEvent::TreeChanged);
                }
                return Err(e);
            }
        };
        let before = self.selection_fingerprint();
        let applied = self
            .tree
            .finish_load(ticket, resources, refresh, &self.filter);
        if applied {
            self.emit(ExplorerEvent::TreeChanged);
            if self.selection_fingerprint() != before {
                self.emit(ExplorerEvent::SelectionChanged);
            }
        }
        Ok(applied)
    }

    /*
     * Expands or collapses a tree node. An unloaded node is loaded first, which
     * expands it. A node in the middle of a slide ignores the toggle.
     */
    pub fn toggle_node(&mut self, handle: NodeHandle) -> Result<()> {
        let Some(node) = self.tree.get(handle) else {
            return Err(self.reject(ValidationError::NotFound(format!("{handle:?}"))));
        };
        if self.tree.is_sliding(handle) {
            log::debug!("ExplorerLogic: Ignoring toggle of '{}' while sliding.", node.id);
            return Ok(());
        }
        if !node.is_loaded() {
            return self.load_children(handle, false);
        }
        let changed = if node.is_expanded() {
            self.tree.collapse(handle)
        } else {
            self.tree.expand(handle)
        };
        if changed {
            self.emit(ExplorerEvent::NodeSliding { handle });
            self.emit(ExplorerEvent::TreeChanged);
        }
        Ok(())
    }

    // Called by the UI once a slide animation has finished.
    pub fn settle_slide(&mut self, handle: NodeHandle) {
        self.tree.settle(handle);
        self.emit(ExplorerEvent::TreeChanged);
    }

    /*
     * Opens a list entry: folders (and the ".." entry) are navigated into, files
     * are previewed. Consumes any pending deferred deselection.
     */
    pub fn open_item(&mut self, id: &str) -> Result<()> {
        self.selection.take_pending_unselect();
        let Some(descriptor) = self.lookup_descriptor(id) else {
            return Err(self.reject(ValidationError::NotFound(id.to_string())));
        };
        if descriptor.is_folder() {
            self.load_list(&descriptor.id)
        } else {
            self.open_preview(&descriptor.id)
        }
    }

    fn lookup_descriptor(&self, id: &str) -> Option<ResourceDescriptor> {
        if let Some(item) = self.list.items().iter().find(|i| i.id == id) {
            return Some(item.descriptor.clone());
        }
        self.tree
            .find_by_id(id)
            .and_then(|h| self.tree.get(h))
            .map(|n| n.descriptor.clone())
    }

    fn lookup_item(&self, id: &str) -> Option<NodeItem> {
        if let Some(item) = self.list.get(id) {
            return Some(item.as_item());
        }
        self.tree
            .find_by_id(id)
            .and_then(|h| self.tree.get(h))
            .filter(|n| !n.is_root())
            .map(|n| n.as_item())
    }

    // --- Selection ---

    pub fn select_tree_node(&mut self, handle: NodeHandle) -> bool {
        let changed = self
            .selection
            .select_tree_node(&mut self.tree, &mut self.list, handle);
        if changed {
            self.emit(ExplorerEvent::SelectionChanged);
        }
        changed
    }

    pub fn select_list_item(&mut self, id: &str, additive: bool) -> bool {
        let changed = self
            .selection
            .select_list_item(&mut self.tree, &mut self.list, id, additive);
        if changed {
            self.emit(ExplorerEvent::SelectionChanged);
        }
        changed
    }

    pub fn pointer_down(&mut self, id: &str, modifier_held: bool) -> bool {
        let changed = self
            .selection
            .pointer_down(&mut self.tree, &mut self.list, id, modifier_held);
        if changed {
            self.emit(ExplorerEvent::SelectionChanged);
        }
        changed
    }

    pub fn click(&mut self, id: &str, modifier_held: bool) -> bool {
        let changed = self
            .selection
            .click(&mut self.tree, &mut self.list, id, modifier_held);
        if changed {
            self.emit(ExplorerEvent::SelectionChanged);
        }
        changed
    }

    pub fn clear_selection(&mut self) -> bool {
        let changed = self.selection.clear(&mut self.tree, &mut self.list);
        if changed {
            self.emit(ExplorerEvent::SelectionChanged);
        }
        changed
    }

    // --- Clipboard ---

    pub fn copy(&mut self) -> bool {
        let snapshot = self.selection();
        let captured = self.clipboard.copy(snapshot);
        if captured {
            self.emit(ExplorerEvent::ClipboardChanged);
        }
        captured
    }

    pub fn cut(&mut self) -> bool {
        let snapshot = self.selection();
        let captured = self.clipboard.cut(snapshot);
        if captured {
            self.emit(ExplorerEvent::ClipboardChanged);
        }
        captured
    }

    /*
     * Copies or moves every captured item into the current directory, one
     * request at a time. The clipboard is emptied once the whole batch has
     * settled, whatever the per-item results were.
     */
    pub fn paste(&mut self) -> Result<BatchOutcome> {
        let Some(plan) = self.clipboard.paste_plan() else {
            return Err(self.reject(ValidationError::ClipboardEmpty));
        };
        let target = self.list.current_path().to_string();
        log::debug!(
            "ExplorerLogic: Pasting {} item(s) into '{target}' ({:?})",
            plan.items.len(),
            plan.mode
        );
        let outcome = core::process_batch(
            self,
            &plan.items,
            |this, item| match plan.mode {
                ClipboardMode::Cut => this.move_one(item, &target),
                _ => this.copy_one(item, &target),
            },
            |this, outcome| {
                if this.clipboard.clear() {
                    this.emit(ExplorerEvent::ClipboardChanged);
                }
                this.report_batch(outcome);
            },
        );
        Ok(outcome)
    }

    pub fn clear_clipboard(&mut self) -> bool {
        let cleared = self.clipboard.clear();
        if cleared {
            self.emit(ExplorerEvent::ClipboardChanged);
        }
        cleared
    }

    fn report_batch(&mut self, outcome: &BatchOutcome) {
        if outcome.needs_summary() {
            self.emit(ExplorerEvent::BatchSummary {
                succeeded: outcome.succeeded,
                total: outcome.total,
            });
        }
    }

    // --- Sorting, filtering and search ---

    // Re-selecting the active field flips the order.
    pub fn sort_by(&mut self, field: SortField) {
        let spec = self.list.sort_spec().toggled(field);
        log::debug!("ExplorerLogic: Sorting by {:?} {:?}", spec.field, spec.order);
        self.tree.set_sort_spec(spec);
        self.list.set_sort_spec(spec);
        self.emit(ExplorerEvent::TreeChanged);
        self.emit(ExplorerEvent::ListChanged);
    }

    pub fn set_filter(&mut self, name: Option<&str>) {
        if !self.filter.set_filter(name) {
            return;
        }
        self.tree.apply_type_filter(&self.filter);
        self.list.apply_type_filter(&self.filter);
        self.emit(ExplorerEvent::TreeChanged);
        self.emit(ExplorerEvent::ListChanged);
    }

    // A keystroke in the search box; applied by `tick` once typing pauses.
    pub fn search_input(&mut self, term: &str) {
        if !self.config.search.enabled {
            return;
        }
        let now = self.clock.now();
        self.debouncer.input(term, now);
    }

    // Applies a debounced search term whose delay has elapsed.
    pub fn tick(&mut self) -> bool {
        let now = self.clock.now();
        match self.debouncer.poll(now) {
            Some(term) => {
                self.apply_search(&term);
                true
            }
            None => false,
        }
    }

    pub fn search(&mut self, term: &str) {
        self.debouncer.cancel();
        self.apply_search(term);
    }

    fn apply_search(&mut self, term: &str) {
        log::debug!("ExplorerLogic: Applying search term '{term}'");
        self.filter.set_search_term(term);
        self.list.apply_search(&self.filter);
        self.emit(ExplorerEvent::ListChanged);
    }

    // --- Drag and drop ---

    // Starts dragging the current selection. A pending deferred deselection is dropped.
    pub fn begin_drag(&mut self) -> bool {
        self.selection.take_pending_unselect();
        let items = self.selection();
        if items.is_empty() || !self.config.is_action_allowed(Action::Move) {
            return false;
        }
        log::debug!("ExplorerLogic: Dragging {} item(s)", items.len());
        self.drag = Some(DragSession::new(items));
        true
    }

    // Updates hover state. Returns whether dropping on `target_id` would be accepted.
    pub fn drag_over(&mut self, target_id: &str) -> bool {
        let Some(target) = self.lookup_descriptor(target_id) else {
            return false;
        };
        let Some(session) = self.drag.as_mut() else {
            return false;
        };
        let allowed = session.hover(&target);
        self.list.set_drag_hover(Some(target_id));
        self.emit(ExplorerEvent::ListChanged);
        allowed
    }

    pub fn end_drag(&mut self) {
        self.drag = None;
        self.list.set_drag_hover(None);
        self.emit(ExplorerEvent::ListChanged);
    }

    /*
     * Drops the dragged items on `target_id`. The drag always ends, whether
     * the drop is accepted, rejected, or fails on the server.
     */
    pub fn drop_on(&mut self, target_id: &str) -> Result<BatchOutcome> {
        let session = self.drag.take();
        self.end_drag();
        let Some(session) = session else {
            return Err(self.reject(ValidationError::DropNotAllowed));
        };
        let Some(target) = self.lookup_descriptor(target_id) else {
            return Err(self.reject(ValidationError::NotFound(target_id.to_string())));
        };
        if !core::is_drop_allowed(&target, session.items()) {
            return Err(self.reject(ValidationError::DropNotAllowed));
        }
        let folder = core::drop_folder(&target);
        Ok(self.move_items(session.items().to_vec(), &folder))
    }

    // --- Mutations ---

    pub fn move_items(&mut self, items: Vec<NodeItem>, target: &str) -> BatchOutcome {
        core::process_batch(
            self,
            &items,
            |this, item| this.move_one(item, target),
            |this, outcome| this.report_batch(outcome),
        )
    }

    pub fn copy_items(&mut self, items: Vec<NodeItem>, target: &str) -> BatchOutcome {
        core::process_batch(
            self,
            &items,
            |this, item| this.copy_one(item, target),
            |this, outcome| this.report_batch(outcome),
        )
    }

    pub fn delete_items(&mut self, items: Vec<NodeItem>) -> BatchOutcome {
        core::process_batch(
            self,
            &items,
            |this, item| this.delete_one(item),
            |this, outcome| this.report_batch(outcome),
        )
    }

    pub fn delete_selected(&mut self) -> BatchOutcome {
        let items = self.selection();
        self.delete_items(items)
    }

    fn move_one(&mut self, item: &NodeItem, target: &str) -> Result<()> {
        self.require_action(Action::Move)?;
        self.require_not_root(item.id(), Action::Move)?;
        let id = item.id().to_string();
        let into_itself = item.is_folder() && path_model::starts_with(target, &id);
        if id == target || into_itself || path_model::closest_containing_folder(&id) == target {
            return Err(self.reject(ValidationError::DropNotAllowed));
        }
        let response = self.request(&MutationRequest::Move {
            id: id.clone(),
            target: target.to_string(),
        })?;
        let moved = self.expect_resource(response, "move")?;
        self.apply_move(&id, moved);
        Ok(())
    }

    fn copy_one(&mut self, item: &NodeItem, target: &str) -> Result<()> {
        self.require_action(Action::Copy)?;
        let response = self.request(&MutationRequest::Copy {
            id: item.id().to_string(),
            target: target.to_string(),
        })?;
        let copied = self.expect_resource(response, "copy")?;
        let before = self.selection_fingerprint();
        self.add_resource(copied);
        self.emit_store_changes(before);
        Ok(())
    }

    fn delete_one(&mut self, item: &NodeItem) -> Result<()> {
        self.require_action(Action::Delete)?;
        self.require_not_root(item.id(), Action::Delete)?;
        let id = item.id().to_string();
        self.request(&MutationRequest::Delete { id: id.clone() })?;
        self.apply_delete(&id);
        Ok(())
    }

    pub fn rename(&mut self, id: &str, new_name: &str) -> Result<()> {
        self.require_action(Action::Rename)?;
        self.require_not_root(id, Action::Rename)?;
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(self.reject(ValidationError::EmptyName));
        }
        if new_name.contains(path_model::SEPARATOR) {
            return Err(self.reject(ValidationError::InvalidName(new_name.to_string())));
        }
        if let Some(descriptor) = self.lookup_descriptor(id) {
            if !descriptor.allows(Action::Rename) || descriptor.is_placeholder() {
                return Err(self.reject(ValidationError::ActionDisabled(Action::Rename)));
            }
        }
        let response = self.request(&MutationRequest::Rename {
            id: id.to_string(),
            new_name: new_name.to_string(),
        })?;
        let renamed = self.expect_resource(response, "rename")?;
        self.apply_rename(id, renamed);
        Ok(())
    }

    pub fn create_folder(&mut self, name: &str) -> Result<()> {
        self.require_action(Action::CreateFolder)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(self.reject(ValidationError::EmptyName));
        }
        if name.contains(path_model::SEPARATOR) {
            return Err(self.reject(ValidationError::InvalidName(name.to_string())));
        }
        let response = self.request(&MutationRequest::AddFolder {
            parent: self.list.current_path().to_string(),
            name: name.to_string(),
        })?;
        let created = self.expect_resource(response, "addfolder")?;
        let before = self.selection_fingerprint();
        self.add_resource(created);
        self.emit_store_changes(before);
        Ok(())
    }

    // Extracts an archive into the current directory. Returns how many entries appeared.
    pub fn extract(&mut self, archive_id: &str) -> Result<usize> {
        self.require_action(Action::Extract)?;
        let response = self.request(&MutationRequest::Extract {
            id: archive_id.to_string(),
            target: self.list.current_path().to_string(),
        })?;
        let extracted = response.into_descriptors();
        let count = extracted.len();
        let before = self.selection_fingerprint();
        for descriptor in extracted {
            self.add_resource(descriptor);
        }
        self.emit_store_changes(before);
        Ok(count)
    }

    // Applies the response an external upload transport received for `target`.
    pub fn upload_completed(&mut self, target: &str, response: ConnectorResponse) -> Result<usize> {
        let uploaded = self.accept_response(Ok(response))?.into_descriptors();
        log::debug!(
            "ExplorerLogic: Upload into '{target}' produced {} resource(s)",
            uploaded.len()
        );
        let count = uploaded.len();
        let before = self.selection_fingerprint();
        for descriptor in uploaded {
            self.add_resource(descriptor);
        }
        self.emit_store_changes(before);
        Ok(count)
    }

    pub fn summarize(&mut self) -> Result<StorageSummary> {
        let response = self.request(&MutationRequest::Summarize)?;
        let ResponseData::Summary(mut summary) = response.data else {
            return self.malformed("summarize response carried no summary".to_string());
        };
        if summary.size_limit.is_none() {
            summary.size_limit = self.config.options.file_root_size_limit;
        }
        let text = format!(
            "{} files, {} folders, {}",
            summary.files,
            summary.folders,
            core::models::format_size(summary.size)
        );
        self.show_message(MessageSeverity::Information, text);
        self.emit(ExplorerEvent::SummaryReady(summary));
        Ok(summary)
    }

    // --- Preview ---

    pub fn open_preview(&mut self, id: &str) -> Result<()> {
        let response = self.request(&MutationRequest::GetFile { id: id.to_string() })?;
        let ResponseData::Content {
            descriptor,
            content,
        } = response.data
        else {
            return self.malformed("getfile response carried no content".to_string());
        };
        let opened_id = descriptor.id.clone();
        self.preview = Some(PreviewState {
            descriptor,
            content,
        });
        self.emit(ExplorerEvent::PreviewOpened { id: opened_id });
        Ok(())
    }

    pub fn save_preview(&mut self, content: &str) -> Result<()> {
        self.require_action(Action::Edit)?;
        let Some(id) = self.preview.as_ref().map(|p| p.descriptor.id.clone()) else {
            return Err(self.reject(ValidationError::NotFound("preview".to_string())));
        };
        let response = self.request(&MutationRequest::EditFile {
            id: id.clone(),
            content: content.to_string(),
        })?;
        let updated = self.expect_resource(response, "editfile")?;
        self.list.replace_item(&id, updated.clone(), &self.filter);
        if let Some(handle) = self.tree.find_by_id(&id) {
            self.tree.relabel(handle, updated.clone(), &self.filter);
        }
        if let Some(preview) = self.preview.as_mut() {
            preview.descriptor = updated;
            preview.content = content.to_string();
        }
        self.emit(ExplorerEvent::PreviewUpdated { id });
        self.emit(ExplorerEvent::ListChanged);
        Ok(())
    }

    pub fn close_preview(&mut self) -> bool {
        if self.preview.take().is_none() {
            return false;
        }
        self.emit(ExplorerEvent::PreviewClosed);
        true
    }

    fn previewed_id(&self) -> Option<&str> {
        self.preview.as_ref().map(|p| p.descriptor.id.as_str())
    }

    // --- Result application ---

    /*
     * Places a newly confirmed resource: into the tree if its containing
     * folder is loaded there, into the list if that folder is open.
     */
    fn add_resource(&mut self, descriptor: ResourceDescriptor) {
        let destination = path_model::closest_containing_folder(&descriptor.id);
        if let Some(handle) = self.tree.find_by_id(&destination) {
            if self.tree.get(handle).is_some_and(|n| n.is_loaded()) {
                self.tree.add_node(handle, descriptor.clone(), &self.filter);
            }
        }
        if destination == self.list.current_path() {
            self.list.add_new(vec![descriptor], &self.filter);
        }
    }

    fn apply_rename(&mut self, old_id: &str, renamed: ResourceDescriptor) {
        let before = self.selection_fingerprint();
        let new_id = renamed.id.clone();
        log::debug!("ExplorerLogic: Applying rename '{old_id}' -> '{new_id}'");
        if path_model::is_folder(old_id) {
            if let Some(handle) = self.tree.find_by_id(old_id) {
                self.tree.rebase_subtree(handle, old_id, &new_id);
                self.tree.relabel(handle, renamed.clone(), &self.filter);
                if let Some(parent) = self.tree.get(handle).and_then(|n| n.parent) {
                    self.tree.sort_children(parent);
                }
            }
            let current = self.list.current_path().to_string();
            if path_model::starts_with(&current, old_id) {
                let rebased = path_model::rebase_prefix(&current, old_id, &new_id);
                self.reload_list(&rebased);
            } else if self.list.contains(old_id) {
                self.reload_list(&current);
            }
            let rebased_preview = self
                .preview
                .as_mut()
                .filter(|p| path_model::starts_with(&p.descriptor.id, old_id))
                .map(|p| {
                    let d = &mut p.descriptor;
                    d.id = path_model::rebase_prefix(&d.id, old_id, &new_id);
                    d.attributes.containing_path =
                        path_model::rebase_prefix(&d.attributes.containing_path, old_id, &new_id);
                    d.id.clone()
                });
            if let Some(id) = rebased_preview {
                self.emit(ExplorerEvent::PreviewUpdated { id });
            }
        } else {
            if let Some(handle) = self.tree.find_by_id(old_id) {
                let parent = self.tree.get(handle).and_then(|n| n.parent);
                self.tree.remove_node(handle);
                if let Some(parent) = parent {
                    self.tree.add_node(parent, renamed.clone(), &self.filter);
                }
            }
            self.list.replace_item(old_id, renamed.clone(), &self.filter);
            if self.previewed_id() == Some(old_id) {
                if let Some(preview) = self.preview.as_mut() {
                    preview.descriptor = renamed;
                }
                self.emit(ExplorerEvent::PreviewUpdated { id: new_id });
            }
        }
        self.emit_store_changes(before);
    }

    fn apply_move(&mut self, old_id: &str, moved: ResourceDescriptor) {
        let before = self.selection_fingerprint();
        let new_id = moved.id.clone();
        log::debug!("ExplorerLogic: Applying move '{old_id}' -> '{new_id}'");
        if let Some(handle) = self.tree.find_by_id(old_id) {
            self.tree.remove_node(handle);
        }
        self.list.remove_item(old_id);
        self.forget_clipboarded(old_id);
        self.add_resource(moved);
        let previewed_inside = self
            .previewed_id()
            .is_some_and(|p| p == old_id || (path_model::is_folder(old_id) && path_model::starts_with(p, old_id)));
        if previewed_inside {
            self.close_preview();
        }
        let current = self.list.current_path().to_string();
        if path_model::is_folder(old_id) && path_model::starts_with(&current, old_id) {
            let rebased = path_model::rebase_prefix(&current, old_id, &new_id);
            self.reload_list(&rebased);
        }
        self.emit_store_changes(before);
    }

    fn apply_delete(&mut self, id: &str) {
        let before = self.selection_fingerprint();
        log::debug!("ExplorerLogic: Applying delete of '{id}'");
        if let Some(handle) = self.tree.find_by_id(id) {
            self.tree.remove_node(handle);
        }
        self.list.remove_item(id);
        self.forget_clipboarded(id);
        let previewed_inside = self
            .previewed_id()
            .is_some_and(|p| p == id || (path_model::is_folder(id) && path_model::starts_with(p, id)));
        if previewed_inside {
            self.close_preview();
        }
        let current = self.list.current_path().to_string();
        if path_model::is_folder(id) && path_model::starts_with(&current, id) {
            self.reload_list(&path_model::closest_containing_folder(id));
        }
        self.emit_store_changes(before);
    }

    // Captured items that no longer exist under their captured id.
    fn forget_clipboarded(&mut self, id: &str) {
        if self.clipboard.forget(id) {
            self.emit(ExplorerEvent::ClipboardChanged);
        }
    }

    // A follow-up reload; its failure has already been reported to the user.
    fn reload_list(&mut self, path: &str) {
        if let Err(e) = self.load_list(path) {
            log::warn!("ExplorerLogic: Follow-up reload of '{path}' failed: {e}");
        }
    }
}
