use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Backend timestamps arrive either as RFC 3339 or as naive ISO strings in UTC.
mod timestamp {
    use super::*;

    fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }

    pub fn required<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
    }

    pub fn optional<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(parse))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub id: String,
    #[serde(default, alias = "userId", alias = "owner_id")]
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: CaseStatus,
    #[serde(alias = "createdAt", deserialize_with = "timestamp::required")]
    pub created_at: DateTime<Utc>,
    #[serde(alias = "updatedAt", deserialize_with = "timestamp::required")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseStatus {
    #[default]
    Active,
    Archived,
    Completed,
}

impl CaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Archived => "archived",
            Self::Completed => "completed",
        }
    }
}

impl std::fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for CaseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "archived" => Ok(Self::Archived),
            "completed" => Ok(Self::Completed),
            other => Err(format!("unknown case status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NewCase {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CaseUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<CaseStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawDocument")]
pub struct Document {
    pub id: String,
    pub case_id: String,
    pub filename: String,
    /// Name the file was uploaded under, when the backend stored it renamed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_filename: Option<String>,
    pub file_size: u64,
    pub file_type: String,
    pub status: DocumentStatus,
    pub error_message: Option<String>,
    pub raw_text: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Document {
    /// The name the client uploaded this document as.
    pub fn uploaded_name(&self) -> &str {
        self.original_filename.as_deref().unwrap_or(&self.filename)
    }
}

/// Every spelling the backend has used for document fields, each kept as its
/// own field so a payload carrying two of them still parses.
#[derive(Deserialize)]
struct RawDocument {
    id: String,
    case_id: Option<String>,
    #[serde(rename = "caseId")]
    case_id_camel: Option<String>,
    filename: Option<String>,
    original_filename: Option<String>,
    name: Option<String>,
    file_size: Option<u64>,
    #[serde(rename = "fileSize")]
    file_size_camel: Option<u64>,
    size: Option<u64>,
    file_type: Option<String>,
    #[serde(rename = "fileType")]
    file_type_camel: Option<String>,
    file_extension: Option<String>,
    extension: Option<String>,
    processing_status: Option<DocumentStatus>,
    status: Option<DocumentStatus>,
    error_message: Option<String>,
    #[serde(rename = "errorMessage")]
    error_message_camel: Option<String>,
    raw_text: Option<String>,
    #[serde(rename = "rawText")]
    raw_text_camel: Option<String>,
    extracted_text: Option<String>,
    #[serde(default, deserialize_with = "timestamp::optional")]
    created_at: Option<DateTime<Utc>>,
    #[serde(default, rename = "createdAt", deserialize_with = "timestamp::optional")]
    created_at_camel: Option<DateTime<Utc>>,
}

impl From<RawDocument> for Document {
    fn from(raw: RawDocument) -> Self {
        let filename = raw
            .filename
            .or_else(|| raw.original_filename.clone())
            .or(raw.name)
            .unwrap_or_default();
        Self {
            id: raw.id,
            case_id: raw.case_id.or(raw.case_id_camel).unwrap_or_default(),
            filename,
            original_filename: raw.original_filename,
            file_size: raw
                .file_size
                .or(raw.file_size_camel)
                .or(raw.size)
                .unwrap_or_default(),
            file_type: raw
                .file_type
                .or(raw.file_type_camel)
                .or(raw.file_extension)
                .or(raw.extension)
                .unwrap_or_default(),
            status: raw.processing_status.or(raw.status).unwrap_or_default(),
            error_message: raw.error_message.or(raw.error_message_camel),
            raw_text: raw.raw_text.or(raw.raw_text_camel).or(raw.extracted_text),
            created_at: raw.created_at.or(raw.created_at_camel),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    #[default]
    #[serde(alias = "processing")]
    Pending,
    Completed,
    Failed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// File kinds the backend accepts for upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Pdf,
    Doc,
    Docx,
    Txt,
    Unknown,
}

impl FileType {
    pub const ALLOWED_EXTENSIONS: [&'static str; 4] = [".pdf", ".doc", ".docx", ".txt"];

    pub fn from_extension(ext: &str) -> Self {
        match ext.trim_start_matches('.').to_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "doc" => Self::Doc,
            "docx" => Self::Docx,
            "txt" => Self::Txt,
            _ => Self::Unknown,
        }
    }

    pub fn from_filename(name: &str) -> Self {
        match name.rsplit_once('.') {
            Some((_, ext)) => Self::from_extension(ext),
            None => Self::Unknown,
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default = "new_message_id")]
    pub id: String,
    pub role: MessageRole,
    #[serde(alias = "message")]
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<Citation>,
    #[serde(default = "Utc::now", alias = "createdAt", deserialize_with = "timestamp::required")]
    pub created_at: DateTime<Utc>,
}

fn new_message_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: new_message_id(),
            role: MessageRole::User,
            content: content.into(),
            citations: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>, citations: Vec<Citation>) -> Self {
        Self {
            id: new_message_id(),
            role: MessageRole::Assistant,
            content: content.into(),
            citations,
            created_at: Utc::now(),
        }
    }
}

/// A pointer from an assistant answer back to a document chunk.
///
/// The backend has shipped two naming conventions for these fields, and some
/// payloads carry both; input accepts either and the snake_case form is
/// written on output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCitation")]
pub struct Citation {
    pub chunk_id: String,
    pub document_id: String,
    pub document_name: String,
    pub page_number: Option<u32>,
    pub chunk_number: Option<u32>,
    pub relevance_score: f64,
    pub content_preview: String,
    pub full_content: String,
}

#[derive(Deserialize)]
struct RawCitation {
    chunk_id: Option<String>,
    #[serde(rename = "chunkId")]
    chunk_id_camel: Option<String>,
    document_id: Option<String>,
    #[serde(rename = "documentId")]
    document_id_camel: Option<String>,
    document_name: Option<String>,
    #[serde(rename = "documentName")]
    document_name_camel: Option<String>,
    filename: Option<String>,
    page_number: Option<u32>,
    #[serde(rename = "pageNumber")]
    page_number_camel: Option<u32>,
    page: Option<u32>,
    chunk_number: Option<u32>,
    #[serde(rename = "chunkNumber")]
    chunk_number_camel: Option<u32>,
    chunk_index: Option<u32>,
    relevance_score: Option<f64>,
    #[serde(rename = "relevanceScore")]
    relevance_score_camel: Option<f64>,
    score: Option<f64>,
    content_preview: Option<String>,
    #[serde(rename = "contentPreview")]
    content_preview_camel: Option<String>,
    preview: Option<String>,
    full_content: Option<String>,
    #[serde(rename = "fullContent")]
    full_content_camel: Option<String>,
    content: Option<String>,
}

impl TryFrom<RawCitation> for Citation {
    type Error = String;

    fn try_from(raw: RawCitation) -> Result<Self, Self::Error> {
        let chunk_id = raw
            .chunk_id
            .or(raw.chunk_id_camel)
            .ok_or_else(|| "citation is missing chunk_id".to_string())?;
        Ok(Self {
            chunk_id,
            document_id: raw.document_id.or(raw.document_id_camel).unwrap_or_default(),
            document_name: raw
                .document_name
                .or(raw.document_name_camel)
                .or(raw.filename)
                .unwrap_or_default(),
            page_number: raw.page_number.or(raw.page_number_camel).or(raw.page),
            chunk_number: raw
                .chunk_number
                .or(raw.chunk_number_camel)
                .or(raw.chunk_index),
            relevance_score: raw
                .relevance_score
                .or(raw.relevance_score_camel)
                .or(raw.score)
                .unwrap_or_default(),
            content_preview: raw
                .content_preview
                .or(raw.content_preview_camel)
                .or(raw.preview)
                .unwrap_or_default(),
            full_content: raw
                .full_content
                .or(raw.full_content_camel)
                .or(raw.content)
                .unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default, alias = "fullName", alias = "name")]
    pub full_name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub super_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    #[serde(alias = "accessToken", alias = "token")]
    pub access_token: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingStatus {
    #[serde(default)]
    pub case_id: Option<String>,
    #[serde(default, alias = "total")]
    pub total_documents: u32,
    #[serde(default, alias = "completed_documents")]
    pub completed: u32,
    #[serde(default, alias = "pending_documents")]
    pub pending: u32,
    #[serde(default, alias = "failed_documents")]
    pub failed: u32,
    #[serde(default)]
    pub documents: Vec<DocumentProgress>,
}

impl ProcessingStatus {
    pub fn is_settled(&self) -> bool {
        self.pending == 0
            && self
                .documents
                .iter()
                .all(|d| d.status != DocumentStatus::Pending)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentProgress {
    #[serde(alias = "document_id")]
    pub id: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub status: DocumentStatus,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: String,
    #[serde(default)]
    pub document_id: String,
    #[serde(default, alias = "chunk_index")]
    pub chunk_number: u32,
    #[serde(default)]
    pub page_number: Option<u32>,
    pub content: String,
    #[serde(default)]
    pub token_count: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadFailure {
    #[serde(alias = "file")]
    pub filename: String,
    #[serde(default, alias = "message")]
    pub error: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UploadResponse {
    #[serde(default, alias = "uploaded")]
    pub documents: Vec<Document>,
    #[serde(default, alias = "errors")]
    pub failed: Vec<UploadFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub case_id: String,
    pub query: String,
    pub user_id: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub stream: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatReply {
    #[serde(alias = "answer", alias = "content", alias = "message")]
    pub response: String,
    #[serde(default)]
    pub citations: Vec<Citation>,
    #[serde(default)]
    pub message_id: Option<String>,
}

impl From<ChatReply> for ChatMessage {
    fn from(reply: ChatReply) -> Self {
        let mut message = ChatMessage::assistant(reply.response, reply.citations);
        if let Some(id) = reply.message_id {
            message.id = id;
        }
        message
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchRequest {
    pub case_id: String,
    pub query: String,
    pub limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub services: serde_json::Value,
}

/// Pull a list out of a response that is either a bare array or an object
/// wrapping the array under one of `keys`.
pub(crate) fn extract_list<T>(value: serde_json::Value, keys: &[&str]) -> serde_json::Result<Vec<T>>
where
    T: serde::de::DeserializeOwned,
{
    match value {
        serde_json::Value::Array(_) => serde_json::from_value(value),
        serde_json::Value::Object(mut map) => {
            for key in keys {
                if let Some(inner) = map.remove(*key) {
                    return serde_json::from_value(inner);
                }
            }
            Ok(Vec::new())
        }
        _ => Ok(Vec::new()),
    }
}

/// Same as [`extract_list`] for single objects wrapped under a key.
pub(crate) fn extract_item<T>(mut value: serde_json::Value, key: &str) -> serde_json::Result<T>
where
    T: serde::de::DeserializeOwned,
{
    let wrapped = value
        .as_object()
        .map(|map| map.contains_key(key) && !map.contains_key("id"))
        .unwrap_or(false);

    if wrapped {
        return serde_json::from_value(value[key].take());
    }
    serde_json::from_value(value)
}
