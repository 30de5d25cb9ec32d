// src/main.rs

use remote_explorer::app_logic::{ExplorerEvent, ExplorerLogic, ExplorerError};
use remote_explorer::core::{
    ConfigManagerOperations, ConnectorError, CoreClock, CoreConfigManager, CoreMemoryConnector,
    ExplorerConfig, ResourceDescriptor, SortField,
};
use std::sync::Arc;

const APP_NAME: &str = "RemoteExplorer";

/*
 * Headless walkthrough of the explorer against an in-memory server: loads the
 * configuration, browses, mutates, and logs every notification the UI would
 * have received.
 */
fn main() {
    remote_explorer::initialize_logging();
    log::info!("Application: Starting {APP_NAME}");

    let config_manager = CoreConfigManager::new();
    let config = match config_manager.load_config(APP_NAME) {
        Ok(config) => config,
        Err(e) => {
            log::warn!("Application: Using default configuration ({e})");
            ExplorerConfig::default()
        }
    };

    let connector = match seed_connector() {
        Ok(connector) => Arc::new(connector),
        Err(e) => {
            log::error!("Application: Could not seed the demo store: {e}");
            std::process::exit(1);
        }
    };

    let mut logic = ExplorerLogic::new(config, connector, Arc::new(CoreClock::new()));
    if let Err(e) = run_walkthrough(&mut logic) {
        log::error!("Application: Walkthrough stopped: {e}");
    }
    log_events(&mut logic);
    log::info!("Application: Exiting");
}

fn seed_connector() -> Result<CoreMemoryConnector, ConnectorError> {
    let connector = CoreMemoryConnector::new().with_size_limit(Some(10 * 1024 * 1024));
    let stamp = 1_700_000_000;
    connector.insert(ResourceDescriptor::folder("/docs/", stamp), None)?;
    connector.insert(ResourceDescriptor::folder("/docs/drafts/", stamp), None)?;
    connector.insert(ResourceDescriptor::folder("/images/", stamp), None)?;
    let files = [
        ("/docs/readme.txt", "Remote files live here."),
        ("/docs/drafts/plan.txt", "step 1, step 2"),
        ("/images/logo.png", "png-bytes"),
        ("/notes.txt", "remember the milk"),
    ];
    for (id, content) in files {
        let descriptor = ResourceDescriptor::file(id, content.len() as u64, stamp);
        connector.insert(descriptor, Some(content))?;
    }
    Ok(connector)
}

fn run_walkthrough(logic: &mut ExplorerLogic) -> Result<(), ExplorerError> {
    logic.start()?;
    log_events(logic);

    logic.open_item("/docs/")?;
    log::info!(
        "Application: In '{}' with {} folder(s) and {} file(s)",
        logic.list().current_path(),
        logic.list().folders_count(),
        logic.list().files_count()
    );

    logic.open_item("/docs/readme.txt")?;
    logic.save_preview("Remote files live here, and can be edited.")?;
    logic.close_preview();

    logic.select_list_item("/docs/readme.txt", false);
    logic.copy();
    logic.open_item("/")?;
    logic.paste()?;

    logic.rename("/docs/", "documents")?;
    logic.create_folder("archive")?;
    logic.sort_by(SortField::Size);
    logic.search("no");
    logic.search("");

    let summary = logic.summarize()?;
    log::info!(
        "Application: {} file(s), {} folder(s), {} byte(s) used",
        summary.files,
        summary.folders,
        summary.size
    );
    Ok(())
}

fn log_events(logic: &mut ExplorerLogic) {
    while let Some(event) = logic.try_dequeue_event() {
        match event {
            ExplorerEvent::ShowMessage { severity, text } => {
                log::info!("Application: [{severity:?}] {text}");
            }
            other => log::debug!("Application: Event {other:?}"),
        }
    }
}
