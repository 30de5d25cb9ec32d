/*
 * An in-process remote store. Resources live in a `BTreeMap` keyed by id, so a
 * folder's subtree is always a contiguous key range and rename, move, copy and
 * delete can rewrite it by prefix. File contents are kept separately for the
 * preview operations. The root folder is implicit and never stored.
 *
 * Extraction is answered with an application error because there is no
 * archive format behind this store.
 */
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use time::OffsetDateTime;

use crate::core::connector::{
    ConnectorError, ConnectorOperations, ConnectorResponse, MutationRequest, ResponseData,
    Result, StorageSummary,
};
use crate::core::models::{ErrorObject, ResourceDescriptor};
use crate::core::path_model;

#[derive(Default)]
struct MemoryState {
    resources: BTreeMap<String, ResourceDescriptor>,
    contents: BTreeMap<String, String>,
}

pub struct CoreMemoryConnector {
    root: String,
    size_limit: Option<u64>,
    state: Mutex<MemoryState>,
}

fn now_timestamp() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

fn refuse(message: &str) -> Result<ConnectorResponse> {
    log::debug!("CoreMemoryConnector: Refusing request: {message}");
    Ok(ConnectorResponse::error(ErrorObject::new(message)))
}

// Gives a descriptor a new id, keeping every attribute the id does not determine.
fn relocated(descriptor: &ResourceDescriptor, new_id: &str) -> ResourceDescriptor {
    let mut moved = descriptor.clone();
    moved.id = new_id.to_string();
    moved.attributes.name = path_model::basename(new_id).to_string();
    moved.attributes.containing_path = path_model::closest_containing_folder(new_id);
    moved
}

impl CoreMemoryConnector {
    pub fn new() -> Self {
        CoreMemoryConnector {
            root: "/".to_string(),
            size_limit: None,
            state: Mutex::new(MemoryState::default()),
        }
    }

    pub fn with_size_limit(mut self, limit: Option<u64>) -> Self {
        self.size_limit = limit;
        self
    }

    /*
     * Seeds the store from a JSON array of resource descriptors. Missing
     * intermediate folders are not created; callers list them explicitly.
     */
    pub fn from_json(text: &str) -> Result<Self> {
        let descriptors: Vec<ResourceDescriptor> = serde_json::from_str(text)?;
        let connector = Self::new();
        for descriptor in descriptors {
            connector.insert(descriptor, None)?;
        }
        Ok(connector)
    }

    pub fn insert(&self, descriptor: ResourceDescriptor, content: Option<&str>) -> Result<()> {
        let mut state = self.lock()?;
        if let Some(text) = content {
            state
                .contents
                .insert(descriptor.id.clone(), text.to_string());
        }
        state.resources.insert(descriptor.id.clone(), descriptor);
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock()
            .map(|state| state.resources.contains_key(id))
            .unwrap_or(false)
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| ConnectorError::Transport("store lock poisoned".to_string()))
    }

    fn folder_exists(&self, state: &MemoryState, id: &str) -> bool {
        id == self.root
            || state
                .resources
                .get(id)
                .is_some_and(|d| d.is_folder())
    }

    // Ids of `id` and, for a folder, everything beneath it.
    fn subtree_ids(state: &MemoryState, id: &str) -> Vec<String> {
        if path_model::is_file(id) {
            return state
                .resources
                .contains_key(id)
                .then(|| vec![id.to_string()])
                .unwrap_or_default();
        }
        state
            .resources
            .range(id.to_string()..)
            .take_while(|(key, _)| path_model::starts_with(key, id))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /*
     * Places `id` and its subtree under `new_id`. With `keep_source` the
     * originals stay (copy), otherwise they are removed (rename and move).
     */
    fn relocate_subtree(
        state: &mut MemoryState,
        id: &str,
        new_id: &str,
        keep_source: bool,
    ) -> Option<ResourceDescriptor> {
        let ids = Self::subtree_ids(state, id);
        let timestamp = now_timestamp();
        let mut top = None;
        for old in ids {
            let rebased = path_model::rebase_prefix(&old, id, new_id);
            let descriptor = if keep_source {
                state.resources.get(&old).cloned()
            } else {
                state.resources.remove(&old)
            };
            let Some(descriptor) = descriptor else {
                continue;
            };
            let mut moved = relocated(&descriptor, &rebased);
            if keep_source {
                moved.attributes.timestamp = timestamp;
            }
            let content = if keep_source {
                state.contents.get(&old).cloned()
            } else {
                state.contents.remove(&old)
            };
            if let Some(text) = content {
                state.contents.insert(rebased.clone(), text);
            }
            if old == id {
                top = Some(moved.clone());
            }
            state.resources.insert(rebased, moved);
        }
        top
    }

    fn add_folder(&self, parent: &str, name: &str) -> Result<ConnectorResponse> {
        let mut state = self.lock()?;
        if name.trim().is_empty() || name.contains(path_model::SEPARATOR) {
            return refuse("Invalid folder name");
        }
        if !self.folder_exists(&state, parent) {
            return refuse("Target folder does not exist");
        }
        let id = path_model::join(parent, name, true);
        if state.resources.contains_key(&id) {
            return refuse("A resource with this name already exists");
        }
        let descriptor = ResourceDescriptor::folder(&id, now_timestamp());
        state.resources.insert(id, descriptor.clone());
        Ok(ConnectorResponse::ok(ResponseData::Resource(descriptor)))
    }

    fn rename(&self, id: &str, new_name: &str) -> Result<ConnectorResponse> {
        let mut state = self.lock()?;
        if new_name.trim().is_empty() || new_name.contains(path_model::SEPARATOR) {
            return refuse("Invalid name");
        }
        if !state.resources.contains_key(id) {
            return refuse("Resource not found");
        }
        let containing = path_model::closest_containing_folder(id);
        let new_id = path_model::join(&containing, new_name, path_model::is_folder(id));
        if new_id == id {
            let unchanged = state.resources.get(id).cloned();
            return Ok(ConnectorResponse::ok(
                unchanged.map_or(ResponseData::None, ResponseData::Resource),
            ));
        }
        if state.resources.contains_key(&new_id) {
            return refuse("A resource with this name already exists");
        }
        match Self::relocate_subtree(&mut state, id, &new_id, false) {
            Some(top) => Ok(ConnectorResponse::ok(ResponseData::Resource(top))),
            None => refuse("Resource not found"),
        }
    }

    fn move_or_copy(&self, id: &str, target: &str, keep_source: bool) -> Result<ConnectorResponse> {
        let mut state = self.lock()?;
        if !state.resources.contains_key(id) {
            return refuse("Resource not found");
        }
        if !self.folder_exists(&state, target) {
            return refuse("Target folder does not exist");
        }
        if path_model::is_folder(id) && path_model::starts_with(target, id) {
            return refuse("Cannot place a folder inside itself");
        }
        let new_id = path_model::join(
            target,
            path_model::basename(id),
            path_model::is_folder(id),
        );
        if state.resources.contains_key(&new_id) {
            return refuse("A resource with this name already exists");
        }
        match Self::relocate_subtree(&mut state, id, &new_id, keep_source) {
            Some(top) => Ok(ConnectorResponse::ok(ResponseData::Resource(top))),
            None => refuse("Resource not found"),
        }
    }

    fn delete(&self, id: &str) -> Result<ConnectorResponse> {
        let mut state = self.lock()?;
        let Some(descriptor) = state.resources.get(id).cloned() else {
            return refuse("Resource not found");
        };
        for key in Self::subtree_ids(&state, id) {
            state.resources.remove(&key);
            state.contents.remove(&key);
        }
        Ok(ConnectorResponse::ok(ResponseData::Resource(descriptor)))
    }

    fn get_file(&self, id: &str) -> Result<ConnectorResponse> {
        let state = self.lock()?;
        match state.resources.get(id) {
            Some(descriptor) if !descriptor.is_folder() => {
                let content = state.contents.get(id).cloned().unwrap_or_default();
                Ok(ConnectorResponse::ok(ResponseData::Content {
                    descriptor: descriptor.clone(),
                    content,
                }))
            }
            _ => refuse("File not found"),
        }
    }

    fn edit_file(&self, id: &str, content: &str) -> Result<ConnectorResponse> {
        let mut state = self.lock()?;
        let updated = match state.resources.get_mut(id) {
            Some(descriptor) if !descriptor.is_folder() => {
                descriptor.attributes.size = content.len() as u64;
                descriptor.attributes.timestamp = now_timestamp();
                descriptor.clone()
            }
            _ => return refuse("File not found"),
        };
        state.contents.insert(id.to_string(), content.to_string());
        Ok(ConnectorResponse::ok(ResponseData::Resource(updated)))
    }

    fn summarize(&self) -> Result<ConnectorResponse> {
        let state = self.lock()?;
        let mut summary = StorageSummary {
            size_limit: self.size_limit,
            ..Default::default()
        };
        for descriptor in state.resources.values() {
            if descriptor.is_folder() {
                summary.folders += 1;
            } else {
                summary.files += 1;
                summary.size += descriptor.attributes.size;
            }
        }
        Ok(ConnectorResponse::ok(ResponseData::Summary(summary)))
    }

    fn upload(&self, target: &str, name: &str, size: u64) -> Result<ConnectorResponse> {
        let mut state = self.lock()?;
        if !self.folder_exists(&state, target) {
            return refuse("Target folder does not exist");
        }
        if let Some(limit) = self.size_limit {
            let used: u64 = state
                .resources
                .values()
                .filter(|d| !d.is_folder())
                .map(|d| d.attributes.size)
                .sum();
            if used + size > limit {
                return refuse("Storage limit exceeded");
            }
        }
        let id = path_model::join(target, name, false);
        let descriptor = ResourceDescriptor::file(&id, size, now_timestamp());
        state.resources.insert(id, descriptor.clone());
        Ok(ConnectorResponse::ok(ResponseData::Resource(descriptor)))
    }
}

impl Default for CoreMemoryConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectorOperations for CoreMemoryConnector {
    fn list(&self, path: &str) -> Result<ConnectorResponse> {
        let state = self.lock()?;
        if !self.folder_exists(&state, path) {
            return refuse("Folder not found");
        }
        let children = state
            .resources
            .values()
            .filter(|d| d.id != path && path_model::closest_containing_folder(&d.id) == path)
            .cloned()
            .collect::<Vec<_>>();
        log::trace!(
            "CoreMemoryConnector: Listed {} entries under '{path}'",
            children.len()
        );
        Ok(ConnectorResponse::ok(ResponseData::Resources(children)))
    }

    fn mutate(&self, request: &MutationRequest) -> Result<ConnectorResponse> {
        log::debug!("CoreMemoryConnector: Handling '{}' request", request.op_name());
        match request {
            MutationRequest::AddFolder { parent, name } => self.add_folder(parent, name),
            MutationRequest::Rename { id, new_name } => self.rename(id, new_name),
            MutationRequest::Move { id, target } => self.move_or_copy(id, target, false),
            MutationRequest::Copy { id, target } => self.move_or_copy(id, target, true),
            MutationRequest::Delete { id } => self.delete(id),
            MutationRequest::Extract { .. } => refuse("Archive extraction is not supported"),
            MutationRequest::GetFile { id } => self.get_file(id),
            MutationRequest::EditFile { id, content } => self.edit_file(id, content),
            MutationRequest::Summarize => self.summarize(),
            MutationRequest::Upload { target, name, size } => self.upload(target, name, *size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> CoreMemoryConnector {
        let connector = CoreMemoryConnector::new();
        connector
            .insert(ResourceDescriptor::folder("/docs/", 1), None)
            .unwrap();
        connector
            .insert(ResourceDescriptor::folder("/docs/sub/", 1), None)
            .unwrap();
        connector
            .insert(ResourceDescriptor::file("/docs/a.txt", 5, 1), Some("hello"))
            .unwrap();
        connector
            .insert(ResourceDescriptor::file("/docs/sub/b.txt", 3, 1), None)
            .unwrap();
        connector
            .insert(ResourceDescriptor::file("/docsx.txt", 1, 1), None)
            .unwrap();
        connector
    }

    fn listed_ids(connector: &CoreMemoryConnector, path: &str) -> Vec<String> {
        connector
            .list(path)
            .unwrap()
            .into_descriptors()
            .into_iter()
            .map(|d| d.id)
            .collect()
    }

    #[test]
    fn test_list_returns_direct_children_only() {
        let connector = seeded();
        assert_eq!(listed_ids(&connector, "/"), vec!["/docs/", "/docsx.txt"]);
        assert_eq!(listed_ids(&connector, "/docs/"), vec!["/docs/a.txt", "/docs/sub/"]);
    }

    #[test]
    fn test_list_unknown_folder_is_application_error() {
        let response = seeded().list("/nope/").unwrap();
        assert!(!response.is_ok());
    }

    #[test]
    fn test_rename_folder_rewrites_subtree() {
        // Arrange
        let connector = seeded();

        // Act
        let response = connector
            .mutate(&MutationRequest::Rename {
                id: "/docs/".to_string(),
                new_name: "papers".to_string(),
            })
            .unwrap();

        // Assert
        let top = response.into_descriptors();
        assert_eq!(top[0].id, "/papers/");
        assert_eq!(top[0].name(), "papers");
        assert!(connector.contains("/papers/sub/b.txt"));
        assert!(!connector.contains("/docs/sub/b.txt"));
        assert!(connector.contains("/docsx.txt"));
    }

    #[test]
    fn test_move_into_own_subtree_is_refused() {
        let connector = seeded();
        let response = connector
            .mutate(&MutationRequest::Move {
                id: "/docs/".to_string(),
                target: "/docs/sub/".to_string(),
            })
            .unwrap();
        assert!(!response.is_ok());
        assert!(connector.contains("/docs/sub/"));
    }

    #[test]
    fn test_copy_keeps_source_and_content() {
        let connector = seeded();
        let response = connector
            .mutate(&MutationRequest::Copy {
                id: "/docs/a.txt".to_string(),
                target: "/docs/sub/".to_string(),
            })
            .unwrap();
        assert!(response.is_ok());
        assert!(connector.contains("/docs/a.txt"));
        let fetched = connector
            .mutate(&MutationRequest::GetFile {
                id: "/docs/sub/a.txt".to_string(),
            })
            .unwrap();
        match fetched.data {
            ResponseData::Content { content, .. } => assert_eq!(content, "hello"),
            other => panic!("Expected content, got {other:?}"),
        }
    }

    #[test]
    fn test_delete_removes_subtree() {
        let connector = seeded();
        connector
            .mutate(&MutationRequest::Delete {
                id: "/docs/".to_string(),
            })
            .unwrap();
        assert_eq!(listed_ids(&connector, "/"), vec!["/docsx.txt"]);
    }

    #[test]
    fn test_edit_file_updates_size() {
        let connector = seeded();
        let response = connector
            .mutate(&MutationRequest::EditFile {
                id: "/docs/a.txt".to_string(),
                content: "longer text".to_string(),
            })
            .unwrap();
        assert_eq!(response.into_descriptors()[0].attributes.size, 11);
    }

    #[test]
    fn test_extract_is_refused() {
        let response = seeded()
            .mutate(&MutationRequest::Extract {
                id: "/docs/a.zip".to_string(),
                target: "/docs/".to_string(),
            })
            .unwrap();
        assert_eq!(response.errors.len(), 1);
    }

    #[test]
    fn test_summarize_and_upload_limit() {
        let connector = seeded().with_size_limit(Some(20));
        match connector.mutate(&MutationRequest::Summarize).unwrap().data {
            ResponseData::Summary(summary) => {
                assert_eq!(summary.files, 3);
                assert_eq!(summary.folders, 2);
                assert_eq!(summary.size, 9);
                assert_eq!(summary.size_limit, Some(20));
            }
            other => panic!("Expected summary, got {other:?}"),
        }
        let too_big = connector
            .mutate(&MutationRequest::Upload {
                target: "/".to_string(),
                name: "big.bin".to_string(),
                size: 100,
            })
            .unwrap();
        assert!(!too_big.is_ok());
    }

    #[test]
    fn test_from_json_seed() {
        let json = r#"[
            { "id": "/a/", "type": "folder", "attributes": { "name": "a" } },
            { "id": "/a/x.txt", "type": "file", "attributes": { "name": "x.txt", "size": 2 } }
        ]"#;
        let connector = CoreMemoryConnector::from_json(json).unwrap();
        assert_eq!(listed_ids(&connector, "/a/"), vec!["/a/x.txt"]);
    }
}
