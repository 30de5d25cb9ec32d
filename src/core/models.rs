/*
 * Shared data types for the explorer core. `ResourceDescriptor` is the server's
 * view of a file or folder and is only ever replaced wholesale, never patched.
 * `ComputedView` holds the values derived from a descriptor (labels, extension,
 * filter flags). `NodeItem` is the tagged union used wherever the selection,
 * clipboard or drag code has to carry "a thing from either view".
 */
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use time::OffsetDateTime;

use crate::core::path_model;

// What a resource is. The parent placeholder only ever exists in the list view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    File,
    Folder,
    #[serde(rename = "parent")]
    ParentPlaceholder,
}

/*
 * Actions a user can trigger on resources. Used both for the session-wide
 * allow-list in the configuration and for per-resource capabilities reported
 * by the server.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Select,
    Upload,
    Download,
    Rename,
    Copy,
    Move,
    Delete,
    Extract,
    CreateFolder,
    Edit,
}

impl Action {
    pub fn all() -> Vec<Action> {
        vec![
            Action::Select,
            Action::Upload,
            Action::Download,
            Action::Rename,
            Action::Copy,
            Action::Move,
            Action::Delete,
            Action::Extract,
            Action::CreateFolder,
            Action::Edit,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResourceAttributes {
    pub name: String,
    // Folder that contains this resource, using the same trailing-slash convention as ids.
    pub containing_path: String,
    pub size: u64,
    pub readable: bool,
    pub writable: bool,
    pub width: Option<u32>,
    pub height: Option<u32>,
    // Seconds since the Unix epoch.
    pub timestamp: i64,
    pub capabilities: Option<Vec<Action>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    pub attributes: ResourceAttributes,
}

impl ResourceDescriptor {
    /*
     * Builds a descriptor for a file at `id`. Name and containing path are
     * derived from the id so callers only need to supply what the server adds.
     */
    pub fn file(id: &str, size: u64, timestamp: i64) -> Self {
        ResourceDescriptor {
            id: id.to_string(),
            kind: ResourceKind::File,
            attributes: ResourceAttributes {
                name: path_model::basename(id).to_string(),
                containing_path: path_model::closest_containing_folder(id),
                size,
                readable: true,
                writable: true,
                timestamp,
                ..Default::default()
            },
        }
    }

    pub fn folder(id: &str, timestamp: i64) -> Self {
        ResourceDescriptor {
            id: id.to_string(),
            kind: ResourceKind::Folder,
            attributes: ResourceAttributes {
                name: path_model::basename(id).to_string(),
                containing_path: path_model::closest_containing_folder(id),
                readable: true,
                writable: true,
                timestamp,
                ..Default::default()
            },
        }
    }

    /*
     * The synthetic ".." entry shown at the top of a non-root listing. Its id is
     * the directory one level above `current_path`, so opening it navigates up.
     */
    pub fn parent_placeholder(current_path: &str) -> Self {
        let parent = path_model::parent_dirname(current_path);
        ResourceDescriptor {
            id: parent.clone(),
            kind: ResourceKind::ParentPlaceholder,
            attributes: ResourceAttributes {
                name: "..".to_string(),
                containing_path: path_model::parent_dirname(&parent),
                readable: true,
                writable: true,
                ..Default::default()
            },
        }
    }

    pub fn is_folder(&self) -> bool {
        self.kind != ResourceKind::File
    }

    pub fn is_placeholder(&self) -> bool {
        self.kind == ResourceKind::ParentPlaceholder
    }

    pub fn name(&self) -> &str {
        &self.attributes.name
    }

    // Resources without a capability list allow everything.
    pub fn allows(&self, action: Action) -> bool {
        match &self.attributes.capabilities {
            Some(caps) => caps.contains(&action),
            None => true,
        }
    }
}

/*
 * Values derived from a descriptor. Recomputed whenever the descriptor is
 * replaced; the two filter flags are owned by the FilterEngine and stored
 * separately so that changing one never forces a recompute of the other.
 */
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ComputedView {
    pub is_folder: bool,
    pub extension: Option<String>,
    pub dimensions_label: Option<String>,
    pub size_label: String,
    pub modified_label: String,
    pub hidden_by_type_filter: bool,
    pub hidden_by_search: bool,
}

impl ComputedView {
    pub fn derive(descriptor: &ResourceDescriptor) -> Self {
        let attrs = &descriptor.attributes;
        let is_folder = descriptor.is_folder();
        let dimensions_label = match (attrs.width, attrs.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some(format!("{w}x{h}")),
            _ => None,
        };
        ComputedView {
            is_folder,
            extension: if is_folder {
                None
            } else {
                path_model::extension(&attrs.name)
            },
            dimensions_label,
            size_label: if is_folder {
                String::new()
            } else {
                format_size(attrs.size)
            },
            modified_label: format_timestamp(attrs.timestamp),
            hidden_by_type_filter: false,
            hidden_by_search: false,
        }
    }

    pub fn is_visible(&self) -> bool {
        !self.hidden_by_type_filter && !self.hidden_by_search
    }
}

/*
 * Human readable size using 1024-based units. Bytes are shown without a
 * decimal, larger units with one.
 */
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

// UTC `YYYY-MM-DD HH:MM`; empty for a zero or out-of-range timestamp.
pub fn format_timestamp(timestamp: i64) -> String {
    if timestamp == 0 {
        return String::new();
    }
    match OffsetDateTime::from_unix_timestamp(timestamp) {
        Ok(dt) => format!(
            "{:04}-{:02}-{:02} {:02}:{:02}",
            dt.year(),
            u8::from(dt.month()),
            dt.day(),
            dt.hour(),
            dt.minute()
        ),
        Err(e) => {
            log::warn!("Models: Timestamp {timestamp} out of range: {e}");
            String::new()
        }
    }
}

// A non-owning reference to a tree node. Handles are never reused within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHandle(pub u64);

/*
 * A resource captured from one of the two views. The variant records which
 * view it came from, which matters when the selection is restored or when a
 * drag started in the tree rather than the list.
 */
#[derive(Debug, Clone, PartialEq)]
pub enum NodeItem {
    TreeNode {
        handle: NodeHandle,
        descriptor: ResourceDescriptor,
    },
    ListItem {
        descriptor: ResourceDescriptor,
    },
}

impl NodeItem {
    pub fn descriptor(&self) -> &ResourceDescriptor {
        match self {
            NodeItem::TreeNode { descriptor, .. } => descriptor,
            NodeItem::ListItem { descriptor } => descriptor,
        }
    }

    pub fn id(&self) -> &str {
        &self.descriptor().id
    }

    pub fn is_folder(&self) -> bool {
        self.descriptor().is_folder()
    }
}

// An error reported by the server inside an otherwise well-formed response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorObject {
    pub message: String,
    pub arguments: BTreeMap<String, String>,
}

impl ErrorObject {
    pub fn new(message: &str) -> Self {
        ErrorObject {
            message: message.to_string(),
            arguments: BTreeMap::new(),
        }
    }

    pub fn redirect(&self) -> Option<&str> {
        self.arguments.get("redirect").map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_descriptor_derives_name_and_containing_path() {
        let d = ResourceDescriptor::file("/docs/notes/a.txt", 10, 0);
        assert_eq!(d.name(), "a.txt");
        assert_eq!(d.attributes.containing_path, "/docs/notes/");
        assert!(!d.is_folder());
    }

    #[test]
    fn test_folder_descriptor_derives_name_and_containing_path() {
        let d = ResourceDescriptor::folder("/docs/notes/", 0);
        assert_eq!(d.name(), "notes");
        assert_eq!(d.attributes.containing_path, "/docs/");
        assert!(d.is_folder());
    }

    #[test]
    fn test_parent_placeholder_points_one_level_up() {
        let d = ResourceDescriptor::parent_placeholder("/docs/sub/");
        assert_eq!(d.id, "/docs/");
        assert!(d.is_placeholder());
        assert!(d.is_folder());
    }

    #[test]
    fn test_computed_view_for_image_file() {
        let mut d = ResourceDescriptor::file("/img/Photo.JPG", 2048, 1_700_000_000);
        d.attributes.width = Some(640);
        d.attributes.height = Some(480);

        let c = ComputedView::derive(&d);

        assert!(!c.is_folder);
        assert_eq!(c.extension.as_deref(), Some("jpg"));
        assert_eq!(c.dimensions_label.as_deref(), Some("640x480"));
        assert_eq!(c.size_label, "2.0 KB");
        assert_eq!(c.modified_label, "2023-11-14 22:13");
        assert!(c.is_visible());
    }

    #[test]
    fn test_format_size_units() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn test_capabilities_default_to_allow() {
        let mut d = ResourceDescriptor::file("/a.txt", 1, 0);
        assert!(d.allows(Action::Delete));
        d.attributes.capabilities = Some(vec![Action::Rename]);
        assert!(d.allows(Action::Rename));
        assert!(!d.allows(Action::Delete));
    }

    #[test]
    fn test_descriptor_json_shape() {
        let json = r#"{"id":"/docs/sub/","type":"folder","attributes":{"name":"sub","containingPath":"/docs/","writable":true}}"#;
        let d: ResourceDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(d.kind, ResourceKind::Folder);
        assert_eq!(d.attributes.containing_path, "/docs/");
        assert!(d.attributes.writable);
        assert!(!d.attributes.readable);
    }

    #[test]
    fn test_error_object_redirect_argument() {
        let mut e = ErrorObject::new("Session expired");
        assert!(e.redirect().is_none());
        e.arguments
            .insert("redirect".to_string(), "/login".to_string());
        assert_eq!(e.redirect(), Some("/login"));
    }
}
