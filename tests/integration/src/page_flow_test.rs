//! Full page editing flows: render tracking, reconciliation, fork/merge
//! saves, and the template codec

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;

use cms_content::{ContentClient, SaveOptions};
use cms_gateway::{ClientConfig, Credentials, CredentialsAuthenticator, Response};
use cms_page::{BlockDescriptor, Dom, EditableDescriptor, PageStore, RenderedPage};
use cms_test_utils::{MockTransport, tag_value};

fn store_with(transport: &Arc<MockTransport>) -> PageStore {
    let authenticator = Arc::new(CredentialsAuthenticator::new(Credentials {
        login: "editor".to_string(),
        password: "secret".to_string(),
    }));
    PageStore::new(ContentClient::new(
        ClientConfig::default(),
        transport.clone(),
        authenticator,
    ))
}

fn page_payload_with_link_tag() -> serde_json::Value {
    json!({
        "page": {
            "id": 1,
            "name": "Home",
            "fileName": "home.html",
            "folderId": 42,
            "templateId": 7,
            "tags": {
                "tagA": tag_value("tagA", "magiclink", &[("url", ""), ("anchor", "")]),
            }
        }
    })
}

/// One tracked block `b1 -> tagA` inside editable `e1`.
fn tracked_render() -> RenderedPage {
    RenderedPage {
        content: String::new(),
        blocks: vec![BlockDescriptor {
            element: "b1".to_string(),
            tagname: "tagA".to_string(),
            construct: Some("magiclink".to_string()),
        }],
        editables: vec![EditableDescriptor {
            element: "e1".to_string(),
            tagname: "content".to_string(),
            partname: "text".to_string(),
        }],
    }
}

fn document_with_anchor(href: &str) -> Dom {
    let mut dom = Dom::new("div");
    let editable = dom.create_element("div");
    dom.set_element_id(editable, "e1");
    dom.set_attr(editable, "contenteditable", "true");
    let anchor = dom.create_element("a");
    dom.set_element_id(anchor, "b1");
    dom.set_attr(anchor, "href", href);
    dom.append_child(dom.root(), editable);
    dom.append_child(editable, anchor);
    dom
}

#[tokio::test]
async fn reconciliation_scenario_single_update() {
    let transport = MockTransport::new();
    transport.enqueue_ok("page/load/1", page_payload_with_link_tag());
    let store = store_with(&transport);

    let page = store.page(1u64).unwrap();
    page.read().await.unwrap();
    page.track_render(&tracked_render());

    let mut dom = document_with_anchor("http://example.com");
    let report = page.reconcile(&mut dom).await.unwrap();

    // zero creates, one tag-part update, zero deletions
    assert_eq!(report.created.len(), 0);
    assert_eq!(report.updated, vec!["tagA".to_string()]);
    assert_eq!(report.deleted.len(), 0);
    assert_eq!(
        page.object().shadow_snapshot()["tags"]["tagA"]["properties"]["url"],
        json!("http://example.com")
    );
}

#[tokio::test]
async fn decode_scenario_single_batched_render() {
    let transport = MockTransport::new();
    transport.enqueue_ok("page/load/1", page_payload_with_link_tag());
    transport.enqueue_ok(
        "page/render/1",
        json!({"tags": {"x": "<em>X</em>", "y": "<em>Y</em>"}}),
    );
    let store = store_with(&transport);
    let page = store.page(1u64).unwrap();

    let decoded = page
        .decode("before <node x> middle <node y> after")
        .await
        .unwrap();

    assert_eq!(decoded, "before <em>X</em> middle <em>Y</em> after");
    assert_eq!(transport.calls_to("page/render"), 1);
}

#[tokio::test]
async fn full_edit_reconcile_save_cycle() {
    let transport = MockTransport::new();
    transport.enqueue_ok("page/load/1", page_payload_with_link_tag());
    transport.enqueue_ok("page/save/1", json!({"page": {"timestamp": 12}}));
    let store = store_with(&transport);

    let page = store.page(1u64).unwrap();
    page.read().await.unwrap();
    page.track_render(&tracked_render());
    page.set_prop("name", json!("Landing")).unwrap();

    let mut dom = document_with_anchor("http://example.com/docs#intro");
    page.save(&mut dom, SaveOptions::default()).await.unwrap();

    // the save body carried the property diff and the reconciled parts
    let body = transport
        .last_request_to("page/save/1")
        .unwrap()
        .body
        .unwrap();
    assert_eq!(body["page"]["name"], json!("Landing"));
    assert_eq!(
        body["page"]["tags"]["tagA"]["properties"]["url"],
        json!("http://example.com/docs")
    );
    assert_eq!(
        body["page"]["tags"]["tagA"]["properties"]["anchor"],
        json!("intro")
    );

    // everything folded: data authoritative, shadow drained
    let data = page.object().data_snapshot();
    assert_eq!(data.get("name"), Some(&json!("Landing")));
    assert_eq!(data.get("timestamp"), Some(&json!(12)));
    assert!(page.object().shadow_snapshot().is_empty());
}

#[tokio::test]
async fn failed_save_keeps_everything_for_retry() {
    let transport = MockTransport::new();
    transport.enqueue_ok("page/load/1", page_payload_with_link_tag());
    transport.enqueue("page/save/1", Response::error("edit lock lost"));
    transport.enqueue_ok("page/save/1", json!({"page": {}}));
    let store = store_with(&transport);

    let page = store.page(1u64).unwrap();
    page.read().await.unwrap();
    page.track_render(&tracked_render());
    page.set_prop("name", json!("Landing")).unwrap();

    let mut dom = document_with_anchor("http://example.com");
    assert!(page.save(&mut dom, SaveOptions::default()).await.is_err());

    // the diff survived the failure
    let shadow = page.object().shadow_snapshot();
    assert_eq!(shadow.get("name"), Some(&json!("Landing")));

    // and the retry persists it
    page.save(&mut dom, SaveOptions::default()).await.unwrap();
    assert!(page.object().shadow_snapshot().is_empty());
    assert_eq!(transport.calls_to("page/save/1"), 2);
}

#[tokio::test]
async fn new_link_becomes_tag_and_survives_roundtrip() {
    let transport = MockTransport::new();
    transport.enqueue_ok("page/load/1", page_payload_with_link_tag());
    transport.enqueue_ok(
        "page/newtag/1",
        json!({"tag": tag_value("link1", "magiclink", &[("url", ""), ("anchor", "")])}),
    );
    // the backend echoes the saved page, tags included
    transport.enqueue_ok(
        "page/save/1",
        json!({"page": {"tags": {
            "tagA": tag_value("tagA", "magiclink", &[("url", "http://example.com"), ("anchor", "")]),
            "link1": tag_value("link1", "magiclink", &[("url", "http://fresh.example.com"), ("anchor", "")]),
        }}}),
    );
    let store = store_with(&transport);

    let page = store.page(1u64).unwrap();
    page.read().await.unwrap();
    page.track_render(&tracked_render());

    let mut dom = document_with_anchor("http://example.com");
    let editable = dom.find_by_element_id("e1").unwrap();
    let fresh = dom.create_element("a");
    dom.set_attr(fresh, "href", "http://fresh.example.com");
    dom.append_child(editable, fresh);

    page.save(&mut dom, SaveOptions::default()).await.unwrap();

    // exactly one create call, and the new tag's parts went out with
    // the same save
    assert_eq!(transport.calls_to("page/newtag/1"), 1);
    let body = transport
        .last_request_to("page/save/1")
        .unwrap()
        .body
        .unwrap();
    assert_eq!(
        body["page"]["tags"]["link1"]["properties"]["url"],
        json!("http://fresh.example.com")
    );

    // running reconciliation again on the unchanged document is a no-op
    let report = page.reconcile(&mut dom).await.unwrap();
    assert!(report.is_noop());
    assert_eq!(transport.calls_to("page/newtag/1"), 1);
}
