use metaform_convert::prelude::*;
use metaform_document::ContentHash;
use metaform_test_utils::{init_tracing, AccountFixture, ACCOUNT_XML};
use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};

fn context_for(fixture: &AccountFixture) -> ConvertContext {
    let mut context = ConvertContext::new();
    context.recomposition.set_parent(fixture.parent.clone());
    for field in &fixture.fields {
        context.recomposition.add_child(field.clone()).unwrap();
    }
    context
}

#[tokio::test]
async fn test_account_fields_recompose_sorted() {
    init_tracing();
    let fixture = AccountFixture::new(&["Name", "Age__c"]);

    let plan = context_for(&fixture).finalize_all(None).await.unwrap();
    assert_eq!(plan.len(), 1);
    assert_eq!(plan[0].component.full_name(), "Account");

    let info = &plan[0].write_infos[0];
    assert_eq!(info.output, PathBuf::from("objects/Account.object"));

    let fields: Vec<_> = info.document_tree().unwrap()["CustomObject"]["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["fullName"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(fields, vec!["Age__c", "Name"]);
}

#[tokio::test]
async fn test_recomposed_xml_layout() {
    let fixture = AccountFixture::new(&["Name", "Age__c"]);
    let plan = context_for(&fixture).finalize_all(None).await.unwrap();

    let expected = r#"<?xml version="1.0" encoding="UTF-8"?>
<CustomObject xmlns="http://soap.sforce.com/2006/04/metadata">
    <label>Account</label>
    <fields>
        <fullName>Age__c</fullName>
        <type>Text</type>
    </fields>
    <fields>
        <fullName>Name</fullName>
        <type>Text</type>
    </fields>
</CustomObject>
"#;
    assert_eq!(plan[0].write_infos[0].render().unwrap(), expected);
}

#[tokio::test]
async fn test_each_file_parsed_once() {
    let names: Vec<String> = (0..50).map(|i| format!("Field{i:02}__c")).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let fixture = AccountFixture::new(&refs);

    context_for(&fixture).finalize_all(None).await.unwrap();

    assert_eq!(fixture.tree.read_count(Path::new(ACCOUNT_XML)), 1);
    for name in &refs {
        assert_eq!(fixture.tree.read_count(Path::new(&AccountFixture::field_path(name))), 1);
    }
    assert_eq!(fixture.tree.total_reads(), 51);
}

#[tokio::test]
async fn test_identical_input_identical_bytes() {
    let first = AccountFixture::new(&["Zip__c", "Name", "Age__c"]);
    let second = AccountFixture::new(&["Age__c", "Zip__c", "Name"]);

    let hash = |plan: Vec<WriterFormat>| -> ContentHash { plan[0].write_infos[0].content_hash().unwrap() };
    let a = hash(context_for(&first).finalize_all(None).await.unwrap());
    let b = hash(context_for(&first).finalize_all(None).await.unwrap());
    let c = hash(context_for(&second).finalize_all(None).await.unwrap());

    assert_eq!(a, b);
    assert_eq!(a, c);
}

#[tokio::test]
async fn test_cache_is_fresh_per_finalize() {
    let fixture = AccountFixture::new(&["Name"]);
    let context = context_for(&fixture);

    context.finalize_all(None).await.unwrap();
    context.finalize_all(None).await.unwrap();

    assert_eq!(fixture.tree.read_count(Path::new(ACCOUNT_XML)), 2);
}

#[tokio::test]
async fn test_missing_child_file_aborts() {
    let fixture = AccountFixture::new(&["Name"]);
    let mut context = context_for(&fixture);
    let ghost = MetadataComponent::resolved(
        "Account.Ghost__c",
        metaform_test_utils::type_named("CustomField"),
        AccountFixture::field_path("Ghost__c"),
        fixture.tree.clone(),
    )
    .with_parent(fixture.parent.clone());
    context.recomposition.add_child(ghost).unwrap();

    let err = context.finalize_all(None).await.unwrap_err();
    assert!(matches!(
        err,
        ConvertError::CacheLoad { ref full_name, ref type_name, .. }
            if full_name == "Account.Ghost__c" && type_name == "CustomField"
    ));
}

#[tokio::test]
async fn test_recompose_from_filesystem() {
    let dir = tempfile::tempdir().unwrap();
    let object_dir = dir.path().join("objects/Case");
    std::fs::create_dir_all(object_dir.join("fields")).unwrap();
    std::fs::write(
        object_dir.join("Case.object-meta.xml"),
        "<CustomObject><label>Case</label></CustomObject>",
    )
    .unwrap();
    std::fs::write(
        object_dir.join("fields/Reason.field-meta.xml"),
        metaform_test_utils::field_xml("Reason", "Picklist"),
    )
    .unwrap();

    let tree = std::sync::Arc::new(metaform_component::FsTreeContainer::new());
    let case = std::sync::Arc::new(MetadataComponent::resolved(
        "Case",
        metaform_test_utils::type_named("CustomObject"),
        object_dir.join("Case.object-meta.xml"),
        tree.clone(),
    ));
    let reason = MetadataComponent::resolved(
        "Case.Reason",
        metaform_test_utils::type_named("CustomField"),
        object_dir.join("fields/Reason.field-meta.xml"),
        tree,
    )
    .with_parent(case.clone());

    let mut context = ConvertContext::new();
    context.recomposition.set_parent(case);
    context.recomposition.add_child(reason).unwrap();

    let plan = context.finalize_all(Some(dir.path())).await.unwrap();
    let doc = plan[0].write_infos[0].document_tree().unwrap();
    assert_eq!(doc["CustomObject"]["fields"][0]["type"], "Picklist");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_finalize_on_spawned_task_with_bounded_reads() {
    let names: Vec<String> = (0..20).map(|i| format!("Field{i:02}__c")).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let fixture = AccountFixture::new(&refs);

    let mut context = ConvertContext::with_config(
        metaform_convert::ConvertConfig::default().with_max_concurrent_reads(2),
    );
    context.recomposition.set_parent(fixture.parent.clone());
    for field in &fixture.fields {
        context.recomposition.add_child(field.clone()).unwrap();
    }

    let plan = tokio::spawn(async move { context.finalize_all(None).await })
        .await
        .unwrap()
        .unwrap();

    let fields = plan[0].write_infos[0].document_tree().unwrap()["CustomObject"]["fields"]
        .as_array()
        .unwrap()
        .len();
    assert_eq!(fields, 20);
    assert_eq!(fixture.tree.total_reads(), 21);
}
