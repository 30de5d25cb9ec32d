/*
 * The platform-agnostic explorer engine. Everything in here is synchronous and
 * free of rendering concerns: path algebra, sorting, filtering, the tree and
 * list stores, selection, clipboard and drag-drop rules, plus the connector
 * protocol through which the remote store is reached.
 *
 * Collaborators are abstracted behind `*Operations` traits
 * (`ConnectorOperations`, `ConfigManagerOperations`, `ClockOperations`) so the
 * application layer and its tests can swap implementations.
 */
pub mod batch;
pub mod clipboard;
pub mod clock;
pub mod config;
pub mod connector;
pub mod drag_drop;
pub mod filter_engine;
pub mod list_store;
pub mod memory_connector;
pub mod models;
pub mod path_model;
pub mod selection;
pub mod sort_engine;
pub mod tree_store;

// Re-export key structures and enums
pub use models::{
    Action, ComputedView, ErrorObject, NodeHandle, NodeItem, ResourceAttributes,
    ResourceDescriptor, ResourceKind,
};

pub use batch::{BatchOutcome, process_batch};
pub use clipboard::{ClipboardEngine, ClipboardMode, PastePlan};
pub use clock::{ClockOperations, CoreClock};
pub use config::{ConfigError, ConfigManagerOperations, CoreConfigManager, ExplorerConfig};
pub use connector::{
    ConnectorError, ConnectorOperations, ConnectorResponse, MutationRequest, ResponseData,
    StorageSummary,
};
pub use drag_drop::{DragSession, drop_folder, is_drop_allowed};
pub use filter_engine::{FilterEngine, SearchDebouncer, compute_visibility};
pub use list_store::{Breadcrumb, ListItem, ListStore, ListTicket};
pub use memory_connector::CoreMemoryConnector;
pub use selection::SelectionTracker;
pub use sort_engine::{FolderPosition, SortField, SortOrder, SortSpec};
pub use tree_store::{ExpansionState, LoadState, LoadTicket, TreeNode, TreeStore};
