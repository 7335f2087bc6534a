//! Integration tests for the full send/receive cycle against an in-memory
//! blind store, with a recording transport that captures everything the
//! client hands to the wire.

use std::sync::{Arc, Mutex};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use vdrop_core::{ObjectId, RelayError};
use vdrop_relay::{RelayClient, RelayTransport, StoreTransport};
use vdrop_storage::BlindStore;

const BASE_URL: &str = "https://drop.test";
const MAX_PAYLOAD: u64 = 64 * 1024 * 1024;

/// Wraps a transport and records a rendering of every value that crosses
/// the client/transport boundary, the way a proxy log would see it.
#[derive(Clone)]
struct RecordingTransport<T> {
    inner: T,
    log: Arc<Mutex<Vec<String>>>,
}

impl<T> RecordingTransport<T> {
    fn new(inner: T) -> Self {
        Self {
            inner,
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn entries(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

impl<T: RelayTransport> RelayTransport for RecordingTransport<T> {
    async fn put(
        &self,
        id: &ObjectId,
        ciphertext: &[u8],
        content_type: &str,
    ) -> vdrop_core::RelayResult<()> {
        self.log.lock().unwrap().push(format!(
            "PUT /files/upload fileKey={id} contentType={content_type} body={}",
            URL_SAFE_NO_PAD.encode(ciphertext)
        ));
        self.inner.put(id, ciphertext, content_type).await
    }

    async fn get(&self, id: &ObjectId) -> vdrop_core::RelayResult<(Vec<u8>, String)> {
        self.log
            .lock()
            .unwrap()
            .push(format!("GET /files/download/{id}"));
        self.inner.get(id).await
    }
}

fn memory_store() -> BlindStore {
    let op = opendal::Operator::new(opendal::services::Memory::default())
        .expect("memory operator")
        .finish();
    BlindStore::new(op)
}

fn patterned_buffer(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

#[tokio::test]
async fn end_to_end_10mb_png() {
    let store = memory_store();
    store.ensure_ready().await.unwrap();
    let client = RelayClient::new(StoreTransport::new(store), BASE_URL, MAX_PAYLOAD);

    let original = patterned_buffer(10 * 1024 * 1024);
    let id = ObjectId::parse("abc-123").unwrap();

    let sealed = client
        .send_with_id(id.clone(), &original, "image/png")
        .await
        .expect("send should succeed");
    assert_eq!(sealed.id, id);
    assert!(sealed.link.starts_with("https://drop.test/download/abc-123#"));

    let received = client.receive(&sealed.link).await.expect("receive should succeed");
    assert_eq!(received.bytes, original, "plaintext must round-trip byte for byte");
    assert_eq!(received.content_type, "image/png");
}

#[tokio::test]
async fn fragment_never_crosses_the_transport() {
    let transport = RecordingTransport::new(StoreTransport::new(memory_store()));
    let client = RelayClient::new(transport.clone(), BASE_URL, MAX_PAYLOAD);

    let sealed = client
        .send(&patterned_buffer(32 * 1024), "application/pdf")
        .await
        .unwrap();
    let received = client.receive(&sealed.link).await.unwrap();
    assert_eq!(received.content_type, "application/pdf");

    let (_, fragment) = sealed.link.split_once('#').unwrap();
    let (key_b64, nonce_b64) = fragment.split_once('.').unwrap();

    let entries = transport.entries();
    assert_eq!(entries.len(), 2, "one put and one get");
    for entry in &entries {
        assert!(
            !entry.contains(fragment),
            "fragment leaked into transport: {entry}"
        );
        assert!(
            !entry.contains(key_b64),
            "encoded key leaked into transport: {entry}"
        );
        assert!(
            !entry.contains(nonce_b64),
            "encoded nonce leaked into transport: {entry}"
        );
    }

    // The identifier is the only part of the link the transport sees
    assert!(entries[1].ends_with(&format!("/files/download/{}", sealed.id)));
}

#[tokio::test]
async fn ciphertext_on_the_wire_is_not_plaintext() {
    let transport = RecordingTransport::new(StoreTransport::new(memory_store()));
    let client = RelayClient::new(transport.clone(), BASE_URL, MAX_PAYLOAD);

    let secret = b"extremely confidential payload contents";
    client.send(secret, "text/plain").await.unwrap();

    let body_b64 = URL_SAFE_NO_PAD.encode(secret);
    for entry in transport.entries() {
        assert!(!entry.contains(&body_b64), "plaintext leaked: {entry}");
    }
}

#[tokio::test]
async fn oversized_payload_never_reaches_the_transport() {
    let transport = RecordingTransport::new(StoreTransport::new(memory_store()));
    let client = RelayClient::new(transport.clone(), BASE_URL, 1024);

    let result = client.send(&[0u8; 4096], "application/zip").await;
    assert!(matches!(result, Err(RelayError::PayloadTooLarge { .. })));

    assert!(
        transport.entries().is_empty(),
        "an oversized payload must be rejected before any transport call"
    );
}

#[tokio::test]
async fn tampered_ciphertext_fails_generically() {
    let store = memory_store();
    let client = RelayClient::new(StoreTransport::new(store.clone()), BASE_URL, MAX_PAYLOAD);

    let sealed = client
        .send(&patterned_buffer(8192), "video/mp4")
        .await
        .unwrap();

    // Corrupt one byte of the stored ciphertext behind the relay's back
    let path = format!("objects/{}", sealed.id);
    let mut stored = store.operator().read(&path).await.unwrap().to_vec();
    stored[4000] ^= 0x80;
    store.operator().write(&path, stored).await.unwrap();

    let result = client.receive(&sealed.link).await;
    match result {
        Err(RelayError::Authentication) => {}
        other => panic!("expected Authentication, got {other:?}"),
    }
}

#[tokio::test]
async fn nonces_differ_across_transfers() {
    let client = RelayClient::new(StoreTransport::new(memory_store()), BASE_URL, MAX_PAYLOAD);

    let a = client.send(b"one", "text/plain").await.unwrap();
    let b = client.send(b"two", "text/plain").await.unwrap();

    let nonce_of = |link: &str| {
        let (_, fragment) = link.split_once('#').unwrap();
        let (_, nonce) = fragment.split_once('.').unwrap();
        nonce.to_string()
    };
    assert_ne!(nonce_of(&a.link), nonce_of(&b.link));
}
