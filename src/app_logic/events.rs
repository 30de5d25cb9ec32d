use crate::core::{NodeHandle, StorageSummary};

// How prominently a message should be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSeverity {
    Information,
    Warning,
    Error,
}

/*
 * Notifications queued by `ExplorerLogic` for the UI layer. The UI drains them
 * after each command and re-reads whatever store snapshot an event names.
 */
#[derive(Debug, Clone, PartialEq)]
pub enum ExplorerEvent {
    TreeChanged,
    ListChanged,
    SelectionChanged,
    ClipboardChanged,
    NodeSliding {
        handle: NodeHandle,
    },
    ShowMessage {
        severity: MessageSeverity,
        text: String,
    },
    BatchSummary {
        succeeded: usize,
        total: usize,
    },
    // The server asked for a navigation away from the explorer.
    Redirect {
        url: String,
    },
    PreviewOpened {
        id: String,
    },
    PreviewUpdated {
        id: String,
    },
    PreviewClosed,
    SummaryReady(StorageSummary),
}
