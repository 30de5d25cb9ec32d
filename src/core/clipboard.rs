/*
 * Copy/cut/paste state. The clipboard holds a snapshot of the selection taken
 * at copy or cut time; later changes to the source items or to the selection
 * do not reach it. Executing a paste is the coordinator's job: it asks for the
 * pending items here, runs the batch, and calls `clear` once the batch settles.
 *
 * Disabled operations are silent no-ops so any UI affordance may call them
 * without checking first.
 */
use crate::core::config::ExplorerConfig;
use crate::core::models::{Action, NodeItem};
use crate::core::path_model;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClipboardMode {
    #[default]
    None,
    Copy,
    Cut,
}

// What a paste will do, captured before the batch starts.
#[derive(Debug, Clone, PartialEq)]
pub struct PastePlan {
    pub mode: ClipboardMode,
    pub items: Vec<NodeItem>,
}

#[derive(Debug)]
pub struct ClipboardEngine {
    mode: ClipboardMode,
    items: Vec<NodeItem>,
    enabled: bool,
    copy_allowed: bool,
    move_allowed: bool,
}

impl ClipboardEngine {
    pub fn new(config: &ExplorerConfig) -> Self {
        ClipboardEngine {
            mode: ClipboardMode::None,
            items: Vec::new(),
            enabled: config.clipboard.enabled,
            copy_allowed: config.is_action_allowed(Action::Copy),
            move_allowed: config.is_action_allowed(Action::Move),
        }
    }

    pub fn mode(&self) -> ClipboardMode {
        self.mode
    }

    pub fn items(&self) -> &[NodeItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.mode == ClipboardMode::None || self.items.is_empty()
    }

    pub fn can_copy(&self) -> bool {
        self.enabled && self.copy_allowed
    }

    pub fn can_cut(&self) -> bool {
        self.enabled && self.move_allowed
    }

    /*
     * Captures `selection` for copying. Returns false, leaving the clipboard
     * as it was, when copying is disabled or the selection is empty.
     */
    pub fn copy(&mut self, selection: Vec<NodeItem>) -> bool {
        self.capture(ClipboardMode::Copy, selection, self.can_copy())
    }

    pub fn cut(&mut self, selection: Vec<NodeItem>) -> bool {
        self.capture(ClipboardMode::Cut, selection, self.can_cut())
    }

    fn capture(&mut self, mode: ClipboardMode, selection: Vec<NodeItem>, allowed: bool) -> bool {
        if !allowed {
            log::debug!("ClipboardEngine: {mode:?} is disabled, ignoring.");
            return false;
        }
        let selection = selection
            .into_iter()
            .filter(|item| !item.descriptor().is_placeholder())
            .collect::<Vec<_>>();
        if selection.is_empty() {
            return false;
        }
        log::debug!(
            "ClipboardEngine: Captured {} item(s) in {mode:?} mode.",
            selection.len()
        );
        self.mode = mode;
        self.items = selection;
        true
    }

    /*
     * The pending paste, or `None` when there is nothing to paste or the
     * operation the mode needs has been disabled.
     */
    pub fn paste_plan(&self) -> Option<PastePlan> {
        let allowed = match self.mode {
            ClipboardMode::None => false,
            ClipboardMode::Copy => self.can_copy(),
            ClipboardMode::Cut => self.can_cut(),
        };
        if !allowed || self.items.is_empty() {
            return None;
        }
        Some(PastePlan {
            mode: self.mode,
            items: self.items.clone(),
        })
    }

    /*
     * Drops captured items that were deleted or moved away: `id` itself and,
     * when `id` is a folder, everything beneath it. The clipboard returns to
     * empty once nothing is left. Returns whether anything was dropped.
     */
    pub fn forget(&mut self, id: &str) -> bool {
        let before = self.items.len();
        let folder = path_model::is_folder(id);
        self.items.retain(|item| {
            let item_id = item.id();
            item_id != id && !(folder && path_model::starts_with(item_id, id))
        });
        if self.items.len() == before {
            return false;
        }
        log::debug!(
            "ClipboardEngine: Forgot {} item(s) under '{id}'.",
            before - self.items.len()
        );
        if self.items.is_empty() {
            self.mode = ClipboardMode::None;
        }
        true
    }

    // Returns false, and reports nothing, when already empty.
    pub fn clear(&mut self) -> bool {
        if self.mode == ClipboardMode::None && self.items.is_empty() {
            return false;
        }
        self.mode = ClipboardMode::None;
        self.items.clear();
        true
    }
}
