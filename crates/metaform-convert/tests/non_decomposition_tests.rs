use metaform_component::{ProjectLocator, VirtualTreeContainer};
use metaform_convert::prelude::*;
use metaform_convert::LabelsFinalizer;
use metaform_document::json;
use metaform_test_utils::{init_tracing, labels_xml, project, type_named};
use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const DEFAULT_PACKAGE: &str = "proj/force-app";

fn label(name: &str) -> MetadataComponent {
    let parent = Arc::new(MetadataComponent::synthetic(
        "CustomLabels",
        type_named("CustomLabels"),
        "labels/CustomLabels.labels-meta.xml",
    ));
    MetadataComponent::synthetic(name, type_named("CustomLabel"), "labels/CustomLabels.labels-meta.xml")
        .with_parent(parent)
}

fn context_over(tree: VirtualTreeContainer) -> (ConvertContext, Arc<VirtualTreeContainer>) {
    let tree = Arc::new(tree);
    let locator = ProjectLocator::new(project("proj", &["force-app", "extra"]), tree.clone());
    (ConvertContext::new().with_locator(Arc::new(locator)), tree)
}

fn full_names(info: &WriteInfo) -> Vec<String> {
    let doc = info.document_tree().unwrap();
    metaform_document::ensure_array(doc["CustomLabels"].get("labels"))
        .iter()
        .map(|label| label["fullName"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_new_label_without_existing_files() {
    init_tracing();
    let (mut context, _) = context_over(VirtualTreeContainer::new());
    context
        .non_decomposition
        .insert_child(&label("Foo"), json!({ "fullName": "Foo", "value": "Bar" }));

    let plan = context.finalize_all(Some(Path::new(DEFAULT_PACKAGE))).await.unwrap();
    assert_eq!(plan.len(), 1);
    assert_eq!(plan[0].outputs(), vec![Path::new("labels/CustomLabels.labels-meta.xml")]);
    assert_eq!(
        plan[0].component.xml_path(),
        Path::new("proj/force-app/labels/CustomLabels.labels-meta.xml")
    );
    assert_eq!(full_names(&plan[0].write_infos[0]), vec!["Foo"]);
}

#[tokio::test]
async fn test_children_return_to_owning_file() {
    let (mut context, tree) = context_over(
        VirtualTreeContainer::new()
            .with_file(
                "proj/extra/labels/Extra.labels-meta.xml",
                labels_xml(&[("Foo", "Old"), ("Baz", "Keep")]),
            )
            .with_file("proj/extra/labels/Clean.labels-meta.xml", labels_xml(&[("Zed", "Untouched")]))
            .with_file(
                "proj/force-app/labels/CustomLabels.labels-meta.xml",
                labels_xml(&[("Bar", "Default")]),
            ),
    );
    context
        .non_decomposition
        .insert_child(&label("Foo"), json!({ "fullName": "Foo", "value": "New" }));
    context
        .non_decomposition
        .insert_child(&label("Qux"), json!({ "fullName": "Qux", "value": "Fresh" }));

    let plan = context.finalize_all(Some(Path::new(DEFAULT_PACKAGE))).await.unwrap();

    let outputs: Vec<PathBuf> = plan.iter().flat_map(|e| e.outputs()).map(Path::to_path_buf).collect();
    assert_eq!(
        outputs,
        vec![
            PathBuf::from("proj/extra/labels/Extra.labels-meta.xml"),
            PathBuf::from("labels/CustomLabels.labels-meta.xml"),
        ]
    );

    let extra = plan[0].write_infos[0].document_tree().unwrap();
    assert_eq!(full_names(&plan[0].write_infos[0]), vec!["Foo", "Baz"]);
    assert_eq!(extra["CustomLabels"]["labels"][0]["value"], "New");
    assert_eq!(full_names(&plan[1].write_infos[0]), vec!["Bar", "Qux"]);

    for path in [
        "proj/extra/labels/Extra.labels-meta.xml",
        "proj/extra/labels/Clean.labels-meta.xml",
        "proj/force-app/labels/CustomLabels.labels-meta.xml",
    ] {
        assert_eq!(tree.read_count(Path::new(path)), 1, "{path}");
    }
}

#[tokio::test]
async fn test_first_declaring_file_wins() {
    let (mut context, _) = context_over(
        VirtualTreeContainer::new()
            .with_file("proj/extra/labels/A.labels-meta.xml", labels_xml(&[("Dup", "A")]))
            .with_file("proj/extra/labels/B.labels-meta.xml", labels_xml(&[("Dup", "B")])),
    );
    context
        .non_decomposition
        .insert_child(&label("Dup"), json!({ "fullName": "Dup", "value": "Updated" }));

    let plan = context.finalize_all(Some(Path::new(DEFAULT_PACKAGE))).await.unwrap();
    assert_eq!(plan.len(), 1);
    assert_eq!(plan[0].outputs(), vec![Path::new("proj/extra/labels/A.labels-meta.xml")]);
}

#[tokio::test]
async fn test_rewritten_file_keeps_children_declared_elsewhere() {
    let (mut context, _) = context_over(
        VirtualTreeContainer::new()
            .with_file("proj/extra/labels/A.labels-meta.xml", labels_xml(&[("Dup", "A")]))
            .with_file(
                "proj/extra/labels/B.labels-meta.xml",
                labels_xml(&[("Dup", "B"), ("Other", "Old")]),
            ),
    );
    context
        .non_decomposition
        .insert_child(&label("Other"), json!({ "fullName": "Other", "value": "New" }));

    let plan = context.finalize_all(Some(Path::new(DEFAULT_PACKAGE))).await.unwrap();
    assert_eq!(plan.len(), 1);
    assert_eq!(plan[0].outputs(), vec![Path::new("proj/extra/labels/B.labels-meta.xml")]);
    assert_eq!(full_names(&plan[0].write_infos[0]), vec!["Dup", "Other"]);

    let doc = plan[0].write_infos[0].document_tree().unwrap();
    assert_eq!(doc["CustomLabels"]["labels"][0]["value"], "B");
    assert_eq!(doc["CustomLabels"]["labels"][1]["value"], "New");
}

#[tokio::test]
async fn test_unnormalized_output_directory_still_scans() {
    for output in ["./proj/force-app", "proj/force-app/", "proj/extra/../force-app"] {
        let (mut context, tree) = context_over(VirtualTreeContainer::new().with_file(
            "proj/force-app/labels/CustomLabels.labels-meta.xml",
            labels_xml(&[("Bar", "Default"), ("Foo", "Old")]),
        ));
        context
            .non_decomposition
            .insert_child(&label("Foo"), json!({ "fullName": "Foo", "value": "New" }));

        let plan = context.finalize_all(Some(Path::new(output))).await.unwrap();
        assert_eq!(plan.len(), 1, "{output}");
        assert_eq!(plan[0].outputs(), vec![Path::new("labels/CustomLabels.labels-meta.xml")]);
        assert!(plan[0].component.is_resolved(), "{output}");
        assert_eq!(full_names(&plan[0].write_infos[0]), vec!["Bar", "Foo"]);
        assert_eq!(
            tree.read_count(Path::new("proj/force-app/labels/CustomLabels.labels-meta.xml")),
            1,
            "{output}"
        );
    }
}

#[tokio::test]
async fn test_labels_finalizer_sorts_into_one_file() {
    let mut finalizer = LabelsFinalizer::new();
    for name in ["Welcome", "Alpha", "Middle"] {
        finalizer.insert_label(&label(name), json!({ "fullName": name, "value": name }));
    }

    let plan = finalizer.finalize(Some(Path::new(DEFAULT_PACKAGE))).await.unwrap();
    assert_eq!(plan.len(), 1);
    assert_eq!(plan[0].outputs(), vec![Path::new("labels/CustomLabels.labels-meta.xml")]);
    assert_eq!(full_names(&plan[0].write_infos[0]), vec!["Alpha", "Middle", "Welcome"]);
}

#[tokio::test]
async fn test_reset_allows_reuse() {
    let (mut context, _) = context_over(VirtualTreeContainer::new());
    context
        .non_decomposition
        .insert_child(&label("Foo"), json!({ "fullName": "Foo" }));
    context.reset();

    assert_eq!(context.pending(), 0);
    assert!(context.finalize_all(Some(Path::new(DEFAULT_PACKAGE))).await.unwrap().is_empty());
}
