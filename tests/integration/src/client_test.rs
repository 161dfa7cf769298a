//! End-to-end client scenarios over the scripted transport

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;

use cms_content::{ContentClient, LookupRequest, ObjectKind};
use cms_gateway::{ClientConfig, Credentials, CredentialsAuthenticator};
use cms_test_utils::{MockTransport, folder_payload, page_payload};

fn client_with(transport: &Arc<MockTransport>) -> ContentClient {
    let authenticator = Arc::new(CredentialsAuthenticator::new(Credentials {
        login: "editor".to_string(),
        password: "secret".to_string(),
    }));
    ContentClient::new(ClientConfig::default(), transport.clone(), authenticator)
}

#[tokio::test]
async fn session_expiry_mid_fetch_is_transparent() {
    let transport = MockTransport::new();
    transport.enqueue_ok("page/load/1", page_payload(1, "Home"));
    let client = client_with(&transport);

    // first load succeeds after login
    let page = client.page(1u64).unwrap();
    page.read().await.unwrap();
    assert_eq!(transport.calls_to("auth/login"), 1);

    // the session expires; the next fetch is challenged, re-authenticates
    // once, and completes without the caller noticing
    transport.challenge_next(1);
    transport.enqueue_ok("folder/load/42", folder_payload(42, "Projects"));
    let folder = client.folder(42u64).unwrap();
    folder.read().await.unwrap();

    assert_eq!(folder.prop("name").unwrap(), json!("Projects"));
    assert_eq!(transport.calls_to("auth/login"), 2);
    assert_eq!(transport.calls_to("folder/load/42"), 2);
}

#[tokio::test]
async fn chained_lookup_resolves_parent_first_and_caches_identity() {
    let transport = MockTransport::new();
    transport.enqueue_ok("page/load/1", page_payload(1, "Home"));
    transport.enqueue_ok("folder/load/42", folder_payload(42, "Projects"));
    let client = client_with(&transport);

    let page = client.page(1u64).unwrap();
    let folder = client
        .resolve(LookupRequest::new(ObjectKind::Folder).with_parent(&page))
        .unwrap();
    folder.read().await.unwrap();

    // the folder discovered its id (42) from the page's folderId and
    // registered itself: an independent lookup hits the same instance
    let direct = client.folder(42u64).unwrap();
    assert!(Arc::ptr_eq(&folder, &direct));

    let load_urls: Vec<String> = transport
        .requests()
        .iter()
        .map(|request| request.url.clone())
        .filter(|url| url.contains("/load/"))
        .collect();
    assert_eq!(load_urls, vec!["rest/page/load/1", "rest/folder/load/42"]);
}

#[tokio::test]
async fn parked_lookups_share_a_single_login() {
    let transport = MockTransport::new();
    for id in 1..=4u64 {
        transport.enqueue_ok(format!("page/load/{id}"), page_payload(id, "Page"));
    }
    let client = client_with(&transport);

    let mut tasks = Vec::new();
    for id in 1..=4u64 {
        let client = client.clone();
        tasks.push(tokio::spawn(async move {
            let page = client.page(id).unwrap();
            page.read().await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(transport.calls_to("auth/login"), 1);
}

#[tokio::test]
async fn failed_login_rejects_all_parked_work() {
    let transport = MockTransport::new();
    transport.fail_logins();
    let client = client_with(&transport);

    let page = client.page(1u64).unwrap();
    let result = page.read().await;
    assert!(matches!(
        result,
        Err(cms_content::Error::Gateway(
            cms_gateway::Error::AuthenticationFailed(_)
        ))
    ));
}

#[tokio::test]
async fn edit_save_cycle_keeps_cache_canonical() {
    let transport = MockTransport::new();
    transport.enqueue_ok("page/load/1", page_payload(1, "Home"));
    transport.enqueue_ok("page/save/1", json!({"page": {"timestamp": 5}}));
    let client = client_with(&transport);

    let editing_handle = client.page(1u64).unwrap();
    editing_handle.read().await.unwrap();
    editing_handle.set_prop("name", json!("Landing")).unwrap();
    editing_handle.save(Default::default()).await.unwrap();

    // a second consumer sees the saved state through the same instance
    let viewing_handle = client.page(1u64).unwrap();
    assert!(Arc::ptr_eq(&editing_handle, &viewing_handle));
    assert_eq!(viewing_handle.prop("name").unwrap(), json!("Landing"));
    assert_eq!(viewing_handle.prop("timestamp").unwrap(), json!(5));
}
