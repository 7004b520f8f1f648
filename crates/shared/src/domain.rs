use serde::{Deserialize, Serialize};

/// Default layout width of a text tile, in grid columns.
pub const DEFAULT_SPAN: u32 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Offline,
    Connecting,
    Connected,
}

/// A heading separating groups of tiles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub id: String,
    pub title: String,
}

/// A value tile that renders the latest payload seen on `topic`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Text {
    pub id: String,
    pub title: String,
    pub topic: String,
    pub span: u32,
    pub suffix: String,
    pub bg_color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceItem {
    Section(Section),
    Text(Text),
}

impl WorkspaceItem {
    /// Caller-assigned identifier. Uniqueness is not enforced anywhere
    /// in the model; lookups resolve duplicates first-match-wins.
    pub fn id(&self) -> &str {
        match self {
            WorkspaceItem::Section(section) => &section.id,
            WorkspaceItem::Text(text) => &text.id,
        }
    }
}

/// The ordered tile collection. Order is the display and navigation
/// order. A workspace is always replaced wholesale, never mutated in
/// place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Workspace {
    pub items: Vec<WorkspaceItem>,
}

impl Workspace {
    /// Index of the first item whose id matches.
    pub fn find_item(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.id() == id)
    }

    pub fn get_item(&self, id: &str) -> Option<&WorkspaceItem> {
        self.find_item(id).map(|index| &self.items[index])
    }
}
