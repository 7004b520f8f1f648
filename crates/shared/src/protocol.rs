use serde::{Deserialize, Serialize};

use crate::{
    domain::{Section, Text, Workspace, WorkspaceItem, DEFAULT_SPAN},
    error::ProtocolError,
};

/// Reserved topic carrying the retained workspace snapshot.
pub const WORKSPACE_TOPIC: &str = "workspace";
/// Wildcard filter matching every topic on the broker.
pub const ALL_TOPICS_FILTER: &str = "#";

#[derive(Debug, Deserialize)]
struct SnapshotDoc {
    items: Vec<ItemRecord>,
}

/// One item as it appears on the wire. Only `id` is required at this
/// layer; which of the remaining fields must be present depends on the
/// resolved type.
#[derive(Debug, Deserialize)]
struct ItemRecord {
    id: String,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    topic: Option<String>,
    #[serde(default)]
    span: Option<u32>,
    #[serde(default)]
    suffix: Option<String>,
    #[serde(default, rename = "bgColor")]
    bg_color: Option<String>,
}

impl ItemRecord {
    fn into_item(self, index: usize) -> Result<WorkspaceItem, ProtocolError> {
        let missing = |field: &'static str| ProtocolError::MissingField { index, field };
        match self.kind.as_deref() {
            Some("text") => Ok(WorkspaceItem::Text(Text {
                id: self.id,
                title: self.title.ok_or_else(|| missing("title"))?,
                topic: self.topic.ok_or_else(|| missing("topic"))?,
                span: self.span.unwrap_or(DEFAULT_SPAN),
                suffix: self.suffix.unwrap_or_default(),
                bg_color: self.bg_color,
            })),
            // Missing or unrecognized type degrades to a section.
            _ => Ok(WorkspaceItem::Section(Section {
                id: self.id,
                title: self.title.ok_or_else(|| missing("title"))?,
            })),
        }
    }
}

#[derive(Serialize)]
struct SnapshotOut<'a> {
    items: Vec<OutRecord<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum OutRecord<'a> {
    Section(SectionRecord<'a>),
    Text(TextRecord<'a>),
}

#[derive(Serialize)]
struct SectionRecord<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
    title: &'a str,
}

#[derive(Serialize)]
struct TextRecord<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
    title: &'a str,
    topic: &'a str,
    span: u32,
    suffix: &'a str,
    // Emitted as an explicit null when unset.
    #[serde(rename = "bgColor")]
    bg_color: Option<&'a str>,
}

/// Parses a `{ "items": [...] }` snapshot document. Rejects the whole
/// payload on the first malformed record.
pub fn decode_snapshot(payload: &str) -> Result<Workspace, ProtocolError> {
    let doc: SnapshotDoc = serde_json::from_str(payload)?;
    let mut items = Vec::with_capacity(doc.items.len());
    for (index, record) in doc.items.into_iter().enumerate() {
        items.push(record.into_item(index)?);
    }
    Ok(Workspace { items })
}

/// Serializes the full snapshot for publication.
pub fn encode_snapshot(workspace: &Workspace) -> Result<String, ProtocolError> {
    let items = workspace
        .items
        .iter()
        .map(|item| match item {
            WorkspaceItem::Section(section) => OutRecord::Section(SectionRecord {
                id: &section.id,
                kind: "section",
                title: &section.title,
            }),
            WorkspaceItem::Text(text) => OutRecord::Text(TextRecord {
                id: &text.id,
                kind: "text",
                title: &text.title,
                topic: &text.topic,
                span: text.span,
                suffix: &text.suffix,
                bg_color: text.bg_color.as_deref(),
            }),
        })
        .collect();
    Ok(serde_json::to_string(&SnapshotOut { items })?)
}
