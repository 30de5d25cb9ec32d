/*
 * The request/response protocol spoken with the remote store. The explorer
 * only ever talks to the store through `ConnectorOperations`, so the network
 * transport stays outside this crate; `CoreMemoryConnector` is the in-process
 * implementation used by the demo binary and the scenario tests.
 *
 * Two failure layers exist. A `ConnectorError` means the request never
 * produced a well-formed response (transport failure). A response with a
 * non-empty `errors` list is an application error: the server understood the
 * request and refused it.
 */
use serde::{Deserialize, Serialize};

use crate::core::models::{ErrorObject, ResourceDescriptor};

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectorError {
    Transport(String),
    Timeout,
    Decode(String),
}

impl std::fmt::Display for ConnectorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectorError::Transport(msg) => write!(f, "Request failed: {msg}"),
            ConnectorError::Timeout => write!(f, "Request timed out"),
            ConnectorError::Decode(msg) => write!(f, "Malformed response: {msg}"),
        }
    }
}

impl std::error::Error for ConnectorError {}

impl From<serde_json::Error> for ConnectorError {
    fn from(err: serde_json::Error) -> Self {
        ConnectorError::Decode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ConnectorError>;

// One variant per mutating (or non-listing) server operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum MutationRequest {
    AddFolder { parent: String, name: String },
    Rename { id: String, new_name: String },
    Move { id: String, target: String },
    Copy { id: String, target: String },
    Delete { id: String },
    Extract { id: String, target: String },
    GetFile { id: String },
    EditFile { id: String, content: String },
    Summarize,
    Upload { target: String, name: String, size: u64 },
}

impl MutationRequest {
    pub fn op_name(&self) -> &'static str {
        match self {
            MutationRequest::AddFolder { .. } => "addfolder",
            MutationRequest::Rename { .. } => "rename",
            MutationRequest::Move { .. } => "move",
            MutationRequest::Copy { .. } => "copy",
            MutationRequest::Delete { .. } => "delete",
            MutationRequest::Extract { .. } => "extract",
            MutationRequest::GetFile { .. } => "getfile",
            MutationRequest::EditFile { .. } => "editfile",
            MutationRequest::Summarize => "summarize",
            MutationRequest::Upload { .. } => "upload",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StorageSummary {
    pub files: u64,
    pub folders: u64,
    pub size: u64,
    pub size_limit: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum ResponseData {
    #[default]
    None,
    Resource(ResourceDescriptor),
    Resources(Vec<ResourceDescriptor>),
    Content {
        descriptor: ResourceDescriptor,
        content: String,
    },
    Summary(StorageSummary),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorResponse {
    pub data: ResponseData,
    pub errors: Vec<ErrorObject>,
}

impl ConnectorResponse {
    pub fn ok(data: ResponseData) -> Self {
        ConnectorResponse {
            data,
            errors: Vec::new(),
        }
    }

    pub fn error(error: ErrorObject) -> Self {
        ConnectorResponse {
            data: ResponseData::None,
            errors: vec![error],
        }
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    // All descriptors carried by the response, whatever its shape.
    pub fn into_descriptors(self) -> Vec<ResourceDescriptor> {
        match self.data {
            ResponseData::Resource(d) => vec![d],
            ResponseData::Resources(ds) => ds,
            ResponseData::Content { descriptor, .. } => vec![descriptor],
            ResponseData::None | ResponseData::Summary(_) => Vec::new(),
        }
    }
}

pub trait ConnectorOperations: Send + Sync {
    fn list(&self, path: &str) -> Result<ConnectorResponse>;
    fn mutate(&self, request: &MutationRequest) -> Result<ConnectorResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_decodes_from_json() {
        let json = r#"{
            "data": { "kind": "resources", "value": [
                { "id": "/docs/a.txt", "type": "file", "attributes": { "name": "a.txt", "size": 3 } }
            ] },
            "errors": []
        }"#;

        let response = ConnectorResponse::from_json(json).unwrap();

        assert!(response.is_ok());
        let descriptors = response.into_descriptors();
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].attributes.size, 3);
    }

    #[test]
    fn test_response_with_errors_only() {
        let json = r#"{ "errors": [ { "message": "Denied", "arguments": { "redirect": "/login" } } ] }"#;

        let response = ConnectorResponse::from_json(json).unwrap();

        assert!(!response.is_ok());
        assert_eq!(response.data, ResponseData::None);
        assert_eq!(response.errors[0].redirect(), Some("/login"));
    }

    #[test]
    fn test_malformed_json_is_decode_error() {
        let result = ConnectorResponse::from_json("[1, 2");
        assert!(matches!(result, Err(ConnectorError::Decode(_))));
    }

    #[test]
    fn test_request_op_names() {
        let request = MutationRequest::Move {
            id: "/a.txt".to_string(),
            target: "/b/".to_string(),
        };
        assert_eq!(request.op_name(), "move");
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains(r#""op":"move""#));
        assert_eq!(MutationRequest::Summarize.op_name(), "summarize");
    }
}
