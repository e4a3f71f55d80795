//! Chunk requests and their GraphQL rendering.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use tagsweep_remote::RemoteRequest;

use crate::error::BulkError;

/// How related ids are applied to each record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BulkMode {
    /// Add to the existing relation.
    Add,
    /// Remove from the existing relation.
    Remove,
    /// Replace the relation.
    Set,
}

impl BulkMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BulkMode::Add => "ADD",
            BulkMode::Remove => "REMOVE",
            BulkMode::Set => "SET",
        }
    }
}

impl fmt::Display for BulkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BulkMode {
    type Err = BulkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "add" => Ok(BulkMode::Add),
            "remove" => Ok(BulkMode::Remove),
            "set" => Ok(BulkMode::Set),
            other => Err(BulkError::Parse(format!("unknown mode '{}'", other))),
        }
    }
}

/// Record type targeted by a bulk update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Scene,
    Image,
    Gallery,
    Performer,
}

impl EntityKind {
    fn type_name(&self) -> &'static str {
        match self {
            EntityKind::Scene => "Scene",
            EntityKind::Image => "Image",
            EntityKind::Gallery => "Gallery",
            EntityKind::Performer => "Performer",
        }
    }

    /// GraphQL operation name, e.g. `BulkSceneUpdate`.
    pub fn operation_name(&self) -> String {
        format!("Bulk{}Update", self.type_name())
    }

    /// Mutation field, e.g. `bulkSceneUpdate`.
    pub fn mutation_field(&self) -> String {
        format!("bulk{}Update", self.type_name())
    }

    /// Input type, e.g. `BulkSceneUpdateInput`.
    pub fn input_type(&self) -> String {
        format!("Bulk{}UpdateInput", self.type_name())
    }

    /// Whether records of this kind carry `field`.
    pub fn supports(&self, field: RelationField) -> bool {
        match self {
            EntityKind::Scene | EntityKind::Image => true,
            EntityKind::Gallery => field != RelationField::Galleries,
            EntityKind::Performer => field == RelationField::Tags,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Scene => "scene",
            EntityKind::Image => "image",
            EntityKind::Gallery => "gallery",
            EntityKind::Performer => "performer",
        };
        f.write_str(name)
    }
}

impl FromStr for EntityKind {
    type Err = BulkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "scene" | "scenes" => Ok(EntityKind::Scene),
            "image" | "images" => Ok(EntityKind::Image),
            "gallery" | "galleries" => Ok(EntityKind::Gallery),
            "performer" | "performers" => Ok(EntityKind::Performer),
            other => Err(BulkError::Parse(format!("unknown entity kind '{}'", other))),
        }
    }
}

/// Many-to-many relation edited in bulk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationField {
    Tags,
    Performers,
    Galleries,
}

impl RelationField {
    /// Key of the relation in the update input.
    pub fn input_key(&self) -> &'static str {
        match self {
            RelationField::Tags => "tag_ids",
            RelationField::Performers => "performer_ids",
            RelationField::Galleries => "gallery_ids",
        }
    }
}

impl fmt::Display for RelationField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RelationField::Tags => "tags",
            RelationField::Performers => "performers",
            RelationField::Galleries => "galleries",
        };
        f.write_str(name)
    }
}

impl FromStr for RelationField {
    type Err = BulkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tag" | "tags" => Ok(RelationField::Tags),
            "performer" | "performers" => Ok(RelationField::Performers),
            "gallery" | "galleries" => Ok(RelationField::Galleries),
            other => Err(BulkError::Parse(format!("unknown relation '{}'", other))),
        }
    }
}

/// One chunk of a bulk edit, sent as a single mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkRequest {
    pub kind: EntityKind,
    pub field: RelationField,
    pub mode: BulkMode,
    pub ids: Vec<String>,
    pub related_ids: Vec<String>,
}

impl ChunkRequest {
    /// Render as `{ input: { ids, <field>: { ids, mode } } }`.
    pub fn to_remote_request(&self) -> RemoteRequest {
        let operation = self.kind.operation_name();
        let query = format!(
            "mutation {}($input: {}!) {{ {}(input: $input) {{ id }} }}",
            operation,
            self.kind.input_type(),
            self.kind.mutation_field()
        );

        let mut input = Map::new();
        input.insert("ids".to_string(), json!(self.ids));
        input.insert(
            self.field.input_key().to_string(),
            json!({ "ids": self.related_ids, "mode": self.mode }),
        );

        RemoteRequest::new(operation, query, json!({ "input": Value::Object(input) }))
    }
}
