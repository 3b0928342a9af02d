//! Payload shapes for new containers and series.

use boxline_store::{Container, Instance, NewArchivalObject, RecordId};

pub const INSTANCE_TYPE: &str = "mixed_materials";
pub const CONTAINER_TYPE: &str = "box";
pub const SERIES_LEVEL: &str = "series";

/// A box container instance with no locations.
pub fn build_container(box_indicator: &str, barcode: &str) -> Instance {
    Instance::Container {
        instance_type: INSTANCE_TYPE.to_string(),
        container: Container {
            container_type: CONTAINER_TYPE.to_string(),
            indicator: box_indicator.to_string(),
            barcode: Some(barcode.to_string()),
            locations: Vec::new(),
        },
    }
}

/// Component label a new series is created with.
pub fn series_label(series: &str) -> String {
    format!("Series {series}.")
}

/// Top-level series node with no instances.
pub fn build_series_stub(series: &str, resource_id: RecordId) -> NewArchivalObject {
    NewArchivalObject {
        resource_id,
        parent_id: None,
        component_id: Some(series_label(series)),
        level: SERIES_LEVEL.to_string(),
        title: Some(format!("ContainerImport {series}")),
        instances: Vec::new(),
    }
}

/// Top-level series node already holding one box.
pub fn build_series_with_container(
    series: &str,
    box_indicator: &str,
    barcode: &str,
    resource_id: RecordId,
) -> NewArchivalObject {
    let mut series_node = build_series_stub(series, resource_id);
    series_node
        .instances
        .push(build_container(box_indicator, barcode));
    series_node
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_shape() {
        let Instance::Container {
            instance_type,
            container,
        } = build_container("12", "007")
        else {
            panic!("expected a container instance");
        };
        assert_eq!(instance_type, "mixed_materials");
        assert_eq!(container.container_type, "box");
        assert_eq!(container.indicator, "12");
        assert_eq!(container.barcode.as_deref(), Some("007"));
        assert!(container.locations.is_empty());
    }

    #[test]
    fn series_stub_shape() {
        let stub = build_series_stub("4", 17);
        assert_eq!(stub.component_id.as_deref(), Some("Series 4."));
        assert_eq!(stub.level, "series");
        assert_eq!(stub.title.as_deref(), Some("ContainerImport 4"));
        assert_eq!(stub.resource_id, 17);
        assert_eq!(stub.parent_id, None);
        assert!(stub.instances.is_empty());
        assert!(stub.validate().is_ok());
    }

    #[test]
    fn series_with_container_holds_one_box() {
        let node = build_series_with_container("4", "12", "007", 17);
        assert_eq!(node.instances, vec![build_container("12", "007")]);
        assert_eq!(node.component_id.as_deref(), Some("Series 4."));
    }
}
