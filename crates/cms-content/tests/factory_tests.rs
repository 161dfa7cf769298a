//! Tests for the chainback factory and identity cache

use std::sync::Arc;

use rstest::rstest;
use serde_json::json;

use cms_content::{ContentClient, Error, LookupRequest, ObjectKind};
use cms_gateway::{ClientConfig, Credentials, CredentialsAuthenticator};
use cms_test_utils::MockTransport;

fn client() -> ContentClient {
    let authenticator = Arc::new(CredentialsAuthenticator::new(Credentials {
        login: "editor".to_string(),
        password: "secret".to_string(),
    }));
    ContentClient::new(ClientConfig::default(), MockTransport::new(), authenticator)
}

#[test]
fn test_two_lookups_return_the_same_instance() {
    let client = client();
    let first = client.page(15u64).unwrap();
    let second = client.page(15u64).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(client.cache().len(), 1);
}

#[test]
fn test_channel_is_part_of_identity() {
    let client = client();
    let master = client
        .resolve(LookupRequest::new(ObjectKind::Page).with_id(15u64))
        .unwrap();
    let variant = client
        .resolve(
            LookupRequest::new(ObjectKind::Page)
                .with_id(15u64)
                .with_channel(3),
        )
        .unwrap();
    assert!(!Arc::ptr_eq(&master, &variant));
    assert_eq!(client.cache().len(), 2);
}

#[test]
fn test_kind_is_part_of_identity() {
    let client = client();
    let page = client.page(15u64).unwrap();
    let folder = client.folder(15u64).unwrap();
    assert!(!Arc::ptr_eq(&page, &folder));
}

#[test]
fn test_constructor_data_yields_fetched_object() {
    let client = client();
    let data = json!({"id": 8, "name": "Prefab"})
        .as_object()
        .unwrap()
        .clone();
    let page = client
        .resolve(LookupRequest::new(ObjectKind::Page).with_data(data))
        .unwrap();

    assert!(page.is_fetched());
    assert_eq!(page.prop("name").unwrap(), json!("Prefab"));

    // the same identity resolves to the prefabricated instance
    let again = client.page(8u64).unwrap();
    assert!(Arc::ptr_eq(&page, &again));
}

#[test]
fn test_constructor_data_never_overwrites_cached_instance() {
    let client = client();
    let first = client
        .resolve(
            LookupRequest::new(ObjectKind::Page).with_data(
                json!({"id": 8, "name": "Original"})
                    .as_object()
                    .unwrap()
                    .clone(),
            ),
        )
        .unwrap();
    let second = client
        .resolve(
            LookupRequest::new(ObjectKind::Page).with_data(
                json!({"id": 8, "name": "Replacement"})
                    .as_object()
                    .unwrap()
                    .clone(),
            ),
        )
        .unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(second.prop("name").unwrap(), json!("Original"));
}

#[test]
fn test_constructor_data_without_id_is_invalid() {
    let client = client();
    let data = json!({"name": "No id"}).as_object().unwrap().clone();
    let result = client.resolve(LookupRequest::new(ObjectKind::Page).with_data(data));
    assert!(matches!(result, Err(Error::InvalidData(_))));
}

#[test]
fn test_empty_request_is_unknown_argument() {
    let client = client();
    let result = client.resolve(LookupRequest::new(ObjectKind::Page));
    assert!(matches!(result, Err(Error::UnknownArgument(_))));
}

#[test]
fn test_default_channel_comes_from_config() {
    let authenticator = Arc::new(CredentialsAuthenticator::new(Credentials {
        login: "editor".to_string(),
        password: "secret".to_string(),
    }));
    let config = ClientConfig {
        default_channel: 4,
        ..ClientConfig::default()
    };
    let client = ContentClient::new(config, MockTransport::new(), authenticator);

    let implicit = client.page(15u64).unwrap();
    let explicit = client
        .resolve(
            LookupRequest::new(ObjectKind::Page)
                .with_id(15u64)
                .with_channel(4),
        )
        .unwrap();
    assert!(Arc::ptr_eq(&implicit, &explicit));
}

#[rstest]
#[case::page(ObjectKind::Page)]
#[case::folder(ObjectKind::Folder)]
#[case::file(ObjectKind::File)]
#[case::node(ObjectKind::Node)]
#[case::template(ObjectKind::Template)]
fn test_kind_helpers_resolve_canonically(#[case] kind: ObjectKind) {
    let client = client();
    let via_helper = match kind {
        ObjectKind::Page => client.page(5u64),
        ObjectKind::Folder => client.folder(5u64),
        ObjectKind::File => client.file(5u64),
        ObjectKind::Node => client.node(5u64),
        ObjectKind::Template => client.template(5u64),
        _ => unreachable!(),
    }
    .unwrap();
    let generic = client
        .resolve(LookupRequest::new(kind).with_id(5u64))
        .unwrap();
    assert!(Arc::ptr_eq(&via_helper, &generic));
}

#[tokio::test]
async fn test_resolve_all_returns_canonical_instances() {
    let client = client();
    let ids = (1u64..=120).map(Into::into).collect();
    let pages = client.resolve_all(ObjectKind::Page, ids).await.unwrap();

    assert_eq!(pages.len(), 120);
    assert_eq!(client.cache().len(), 120);
    let direct = client.page(57u64).unwrap();
    assert!(Arc::ptr_eq(&pages[56], &direct));
}
