/*
 * The application logic layer. `ExplorerLogic` is the command surface a UI
 * drives: it sequences connector requests, applies confirmed results to the
 * stores, and queues `ExplorerEvent`s for the UI to drain.
 * Unit tests for `ExplorerLogic` are in `explorer_tests.rs`.
 */
pub mod events;
pub mod explorer;


pub use events::{ExplorerEvent, MessageSeverity};
pub use explorer::{ExplorerError, ExplorerLogic, PreviewState, ValidationError};
