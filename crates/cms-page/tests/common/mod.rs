//! Shared setup for cms-page tests

use std::sync::Arc;

use serde_json::{Value, json};

use cms_content::ContentClient;
use cms_content::paths::JsonMap;
use cms_gateway::{ClientConfig, Credentials, CredentialsAuthenticator};
use cms_page::{Dom, NodeId, Page, PageStore, RenderedPage};
use cms_test_utils::{MockTransport, tag_value};

pub fn client_with(transport: &Arc<MockTransport>) -> ContentClient {
    let authenticator = Arc::new(CredentialsAuthenticator::new(Credentials {
        login: "editor".to_string(),
        password: "secret".to_string(),
    }));
    ContentClient::new(ClientConfig::default(), transport.clone(), authenticator)
}

/// Page 1 with one magic-link tag `tagA` declaring the usual link parts.
pub fn page_data() -> JsonMap {
    json!({
        "id": 1,
        "name": "Home",
        "fileName": "home.html",
        "folderId": 42,
        "templateId": 7,
        "tags": {
            "tagA": tag_value(
                "tagA",
                "magiclink",
                &[("url", ""), ("anchor", ""), ("title", ""), ("target", "")],
            )
        }
    })
    .as_object()
    .unwrap()
    .clone()
}

/// A store and a tracked page: block `b1 -> tagA`, editable `e1`.
pub fn tracked_page(transport: &Arc<MockTransport>) -> (PageStore, Page) {
    let store = PageStore::new(client_with(transport));
    let page = store.page_from_data(page_data()).unwrap();
    page.track_render(&RenderedPage {
        content: String::new(),
        blocks: vec![block_descriptor("b1", "tagA")],
        editables: vec![editable_descriptor("e1", "content", "text")],
    });
    (store, page)
}

pub fn block_descriptor(element: &str, tagname: &str) -> cms_page::BlockDescriptor {
    cms_page::BlockDescriptor {
        element: element.to_string(),
        tagname: tagname.to_string(),
        construct: Some("magiclink".to_string()),
    }
}

pub fn editable_descriptor(element: &str, tagname: &str, partname: &str) -> cms_page::EditableDescriptor {
    cms_page::EditableDescriptor {
        element: element.to_string(),
        tagname: tagname.to_string(),
        partname: partname.to_string(),
    }
}

/// `<div><div id="e1" contenteditable="true"><a id="b1" href="…">…</a></div></div>`
pub fn editable_dom_with_anchor(href: &str) -> (Dom, NodeId, NodeId) {
    let mut dom = Dom::new("div");
    let editable = dom.create_element("div");
    dom.set_element_id(editable, "e1");
    dom.set_attr(editable, "contenteditable", "true");
    let anchor = dom.create_element("a");
    dom.set_element_id(anchor, "b1");
    dom.set_attr(anchor, "href", href);
    let label = dom.create_text("a link");
    dom.append_child(dom.root(), editable);
    dom.append_child(editable, anchor);
    dom.append_child(anchor, label);
    (dom, editable, anchor)
}

/// A scripted response for `page/newtag` creating `name`.
pub fn newtag_payload(name: &str) -> Value {
    json!({
        "tag": tag_value(
            name,
            "magiclink",
            &[("url", ""), ("anchor", ""), ("title", ""), ("target", "")],
        )
    })
}
