//! Scripted transport and payload fixtures for CMS client tests

pub mod fixtures;
pub mod transport;

pub use fixtures::{folder_payload, page_payload, tag_value};
pub use transport::MockTransport;
