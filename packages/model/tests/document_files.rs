//! Loading documents from their JSON form and serializing them back out

use std::collections::BTreeSet;

use dadm_model::{Document, ElementKind, ModelError};

const DOCUMENT: &str = r#"{
  "id": "Definitions_1",
  "process": {
    "kind": "process",
    "id": "Process_1",
    "children": [
      { "kind": { "generic": "startEvent" }, "id": "Start_1" },
      {
        "kind": "serviceTask",
        "id": "Task_1",
        "name": "Ask assistant",
        "documentation": [{ "text": "Calls the assistant" }],
        "implementation": { "type": "external", "topic": "openai-call" },
        "extensionElements": {
          "properties": {
            "values": [{ "name": "service.name", "value": "assistant" }]
          }
        }
      },
      { "kind": { "generic": "endEvent" }, "id": "End_1" }
    ]
  }
}"#;

#[test]
fn test_load_document_file() {
    let doc = Document::from_json(DOCUMENT).unwrap();

    assert_eq!(doc.id, "Definitions_1");
    assert_eq!(doc.revision(), 0);
    assert_eq!(doc.elements().len(), 4);

    let task = doc.find_by_id("Task_1").unwrap();
    assert_eq!(task.kind, ElementKind::ServiceTask);
    assert_eq!(task.documentation_text(), Some("Calls the assistant"));
    assert_eq!(task.implementation.topic, "openai-call");
    assert_eq!(task.extension_property("service.name"), Some("assistant"));

    // every element gets its own stable key
    let keys: BTreeSet<_> = doc.elements().iter().map(|e| e.key.clone()).collect();
    assert_eq!(keys.len(), 4);
    assert!(doc.element(&task.key).is_some());
}

#[test]
fn test_loaded_document_serializes() {
    let doc = Document::from_json(DOCUMENT).unwrap();
    let xml = doc.serialize().unwrap();

    assert!(xml.starts_with("<?xml"));
    assert!(xml.contains(r#"<bpmn:startEvent id="Start_1" />"#));
    assert!(xml.contains(r#"camunda:topic="openai-call""#));
    assert!(xml.contains(r#"<camunda:property name="service.name" value="assistant" />"#));
}

#[test]
fn test_saved_document_loads_again() {
    let doc = Document::from_json(DOCUMENT).unwrap();
    let reloaded = Document::from_json(&doc.to_json().unwrap()).unwrap();

    assert_eq!(reloaded.root(), doc.root());
}

#[test]
fn test_duplicate_ids_rejected() {
    let source = DOCUMENT.replace(r#""id": "End_1""#, r#""id": "Start_1""#);
    assert_eq!(
        Document::from_json(&source).unwrap_err(),
        ModelError::DuplicateId("Start_1".to_string())
    );
}

#[test]
fn test_root_must_be_process() {
    let source = r#"{ "id": "D", "process": { "kind": "serviceTask", "id": "Task_1" } }"#;
    assert!(matches!(
        Document::from_json(source),
        Err(ModelError::NotAContainer(_))
    ));
}

#[test]
fn test_malformed_json() {
    assert!(matches!(
        Document::from_json("{ \"id\": "),
        Err(ModelError::Json(_))
    ));
}
