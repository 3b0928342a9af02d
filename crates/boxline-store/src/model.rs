//! Typed record shapes exchanged with the store.
//!
//! These mirror the structured payloads an archival description database
//! accepts: resources at the root, archival objects (components) beneath
//! them, and instances hanging off either.

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Internal record id (resources and archival objects share the space).
pub type RecordId = i64;

/// Repository (partition) id.
pub type RepoId = i64;

// ============================================================================
// Instances
// ============================================================================

/// A physical location a container has been shelved at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerLocation {
    pub location_ref: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinate: Option<String>,
}

/// A storage unit (usually a box) attached to a record via an instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub container_type: String,
    pub indicator: String,
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(default)]
    pub locations: Vec<ContainerLocation>,
}

impl Container {
    pub fn is_box(&self, indicator: &str) -> bool {
        self.container_type == "box" && self.indicator == indicator
    }
}

/// Tagged instance record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Instance {
    Container {
        instance_type: String,
        container: Container,
    },
    DigitalObject {
        digital_object_ref: String,
    },
}

impl Instance {
    pub fn container(&self) -> Option<&Container> {
        match self {
            Instance::Container { container, .. } => Some(container),
            Instance::DigitalObject { .. } => None,
        }
    }

    pub fn container_mut(&mut self) -> Option<&mut Container> {
        match self {
            Instance::Container { container, .. } => Some(container),
            Instance::DigitalObject { .. } => None,
        }
    }
}

// ============================================================================
// Resources
// ============================================================================

/// Top-level archival description record (a collection).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: RecordId,
    pub repo_id: RepoId,
    /// Multi-part identifier as serialized by the store; unused parts are null.
    pub identifier: Vec<Option<String>>,
    pub title: String,
    #[serde(default)]
    pub instances: Vec<Instance>,
    #[serde(default)]
    pub lock_version: u32,
}

/// Scan row for resources: just enough to build an identifier index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSummary {
    pub id: RecordId,
    pub repo_id: RepoId,
    pub identifier: Vec<Option<String>>,
}

impl ResourceSummary {
    /// Identifier parts concatenated, nulls skipped.
    pub fn joined_identifier(&self) -> String {
        self.identifier.iter().flatten().map(String::as_str).collect()
    }
}

// ============================================================================
// Archival objects
// ============================================================================

/// A node in a resource's hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivalObject {
    pub id: RecordId,
    pub repo_id: RepoId,
    pub resource_id: RecordId,
    #[serde(default)]
    pub parent_id: Option<RecordId>,
    #[serde(default)]
    pub component_id: Option<String>,
    pub level: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub instances: Vec<Instance>,
    #[serde(default)]
    pub lock_version: u32,
}

impl ArchivalObject {
    pub fn is_top_level(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Scan row for top-level components: id plus the label used for series lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentSummary {
    pub id: RecordId,
    pub component_id: Option<String>,
}

/// Payload for creating an archival object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewArchivalObject {
    pub resource_id: RecordId,
    #[serde(default)]
    pub parent_id: Option<RecordId>,
    #[serde(default)]
    pub component_id: Option<String>,
    pub level: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub instances: Vec<Instance>,
}

// ============================================================================
// Validation
// ============================================================================

pub(crate) fn validate_instances(instances: &[Instance]) -> Result<(), StoreError> {
    for instance in instances {
        match instance {
            Instance::Container {
                instance_type,
                container,
            } => {
                if instance_type.is_empty() {
                    return Err(StoreError::Validation(
                        "instance_type must not be empty".to_string(),
                    ));
                }
                if container.container_type.is_empty() || container.indicator.is_empty() {
                    return Err(StoreError::Validation(
                        "container requires a type and an indicator".to_string(),
                    ));
                }
            }
            Instance::DigitalObject { digital_object_ref } => {
                if digital_object_ref.is_empty() {
                    return Err(StoreError::Validation(
                        "digital object instance requires a ref".to_string(),
                    ));
                }
            }
        }
    }
    Ok(())
}

pub(crate) fn validate_component_fields(
    level: &str,
    title: Option<&str>,
    component_id: Option<&str>,
    instances: &[Instance],
) -> Result<(), StoreError> {
    if level.is_empty() {
        return Err(StoreError::Validation(
            "archival object requires a level".to_string(),
        ));
    }
    let has_title = title.map_or(false, |t| !t.is_empty());
    let has_component_id = component_id.map_or(false, |c| !c.is_empty());
    if !has_title && !has_component_id {
        return Err(StoreError::Validation(
            "archival object requires a title or a component id".to_string(),
        ));
    }
    validate_instances(instances)
}

impl NewArchivalObject {
    pub fn validate(&self) -> Result<(), StoreError> {
        validate_component_fields(
            &self.level,
            self.title.as_deref(),
            self.component_id.as_deref(),
            &self.instances,
        )
    }
}

impl ArchivalObject {
    pub fn validate(&self) -> Result<(), StoreError> {
        validate_component_fields(
            &self.level,
            self.title.as_deref(),
            self.component_id.as_deref(),
            &self.instances,
        )
    }
}

impl Resource {
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.title.is_empty() {
            return Err(StoreError::Validation(
                "resource requires a title".to_string(),
            ));
        }
        validate_instances(&self.instances)
    }
}
