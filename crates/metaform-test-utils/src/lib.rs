//! Testing utilities for Metaform workspace
//!
//! Shared fixtures: the default registry, small in-memory projects and
//! document builders.

#![allow(missing_docs)]

use metaform_component::{MetadataComponent, PackageDirectory, ProjectConfig, VirtualTreeContainer};
use metaform_document::{JsonMap, Value};
use metaform_registry::{MetadataType, Registry};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

pub const ACCOUNT_XML: &str = "objects/Account/Account.object-meta.xml";

/// Install a test subscriber honouring `RUST_LOG`; repeated calls are no-ops
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn registry() -> Registry {
    Registry::with_defaults().unwrap()
}

pub fn type_named(name: &str) -> Arc<MetadataType> {
    registry().get_type_by_name(name).unwrap()
}

pub fn object(value: Value) -> JsonMap {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

/// `<CustomLabels>` document with one entry per `(full name, value)`
pub fn labels_xml(labels: &[(&str, &str)]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<CustomLabels xmlns=\"http://soap.sforce.com/2006/04/metadata\">\n",
    );
    for (name, value) in labels {
        xml.push_str(&format!(
            "    <labels>\n        <fullName>{name}</fullName>\n        <value>{value}</value>\n    </labels>\n"
        ));
    }
    xml.push_str("</CustomLabels>\n");
    xml
}

/// Decomposed field file for `name`
pub fn field_xml(name: &str, field_type: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<CustomField xmlns=\"http://soap.sforce.com/2006/04/metadata\">\n    <fullName>{name}</fullName>\n    <type>{field_type}</type>\n</CustomField>\n"
    )
}

/// Project rooted at `root` with the given package paths, first one default
pub fn project(root: &str, packages: &[&str]) -> ProjectConfig {
    ProjectConfig::new(
        root,
        packages
            .iter()
            .enumerate()
            .map(|(i, path)| PackageDirectory {
                path: PathBuf::from(path),
                default: i == 0,
            })
            .collect(),
    )
}

/// Account object with decomposed fields, read through an in-memory tree
pub struct AccountFixture {
    pub tree: Arc<VirtualTreeContainer>,
    pub parent: Arc<MetadataComponent>,
    pub fields: Vec<MetadataComponent>,
}

impl AccountFixture {
    /// Fields are created in the order given
    pub fn new(field_names: &[&str]) -> Self {
        let registry = registry();
        let mut tree = VirtualTreeContainer::new().with_file(
            ACCOUNT_XML,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<CustomObject xmlns=\"http://soap.sforce.com/2006/04/metadata\">\n    <label>Account</label>\n</CustomObject>\n",
        );
        for name in field_names {
            tree.insert(Self::field_path(name), field_xml(name, "Text"));
        }
        let tree = Arc::new(tree);

        let parent = Arc::new(MetadataComponent::resolved(
            "Account",
            registry.get_type_by_name("CustomObject").unwrap(),
            ACCOUNT_XML,
            tree.clone(),
        ));
        let field_type = registry.get_type_by_name("CustomField").unwrap();
        let fields = field_names
            .iter()
            .map(|name| {
                MetadataComponent::resolved(
                    format!("Account.{name}"),
                    field_type.clone(),
                    Self::field_path(name),
                    tree.clone(),
                )
                .with_parent(parent.clone())
            })
            .collect();

        Self { tree, parent, fields }
    }

    pub fn field_path(name: &str) -> String {
        format!("objects/Account/fields/{name}.field-meta.xml")
    }
}
