//! Primary-key generation for uuid-mode models.

use std::sync::OnceLock;

use ormsql_core::IdMode;
use uuid::Uuid;

/// Generate an id for `mode`, or `None` when the server assigns it.
pub fn generate_id(mode: IdMode) -> Option<String> {
    match mode {
        IdMode::V1 => Some(Uuid::now_v1(node_id()).to_string()),
        IdMode::V4 => Some(Uuid::new_v4().to_string()),
        IdMode::None => None,
    }
}

/// Random node id for v1 uuids. The multicast bit marks it as not a MAC
/// address.
fn node_id() -> &'static [u8; 6] {
    static NODE: OnceLock<[u8; 6]> = OnceLock::new();
    NODE.get_or_init(|| {
        let random = Uuid::new_v4();
        let bytes = random.as_bytes();
        let mut node = [0u8; 6];
        node.copy_from_slice(&bytes[..6]);
        node[0] |= 0x01;
        node
    })
}
