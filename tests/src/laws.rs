//! # Universal Backend Laws
//!
//! Every storage backend and every composition must satisfy these.
//! Helpers take `&dyn Node` so the same assertions run against a memory
//! store, a file-backed store, an executor-injected store, a remote
//! client talking to a live gateway, or any combinator over them.
//!
//! Each law uses its own authority so laws can run in any order against
//! one shared node.

use shared_types::{
    ListItemKind, ListOptions, Node, NodeError, SortBy, SortOrder, Uri, Value, WriteRequest,
};

fn uri(s: &str) -> Uri {
    Uri::parse(s).unwrap()
}

fn json(v: serde_json::Value) -> Value {
    Value::from_json(v)
}

async fn write(node: &dyn Node, target: &str, value: serde_json::Value) {
    let receipt = node
        .receive(WriteRequest::new(uri(target), json(value)))
        .await
        .unwrap_or_else(|e| panic!("write {} failed: {}", target, e));
    assert!(receipt.accepted(), "write {} not accepted", target);
}

/// `receive` accepted ⇒ `read` returns the same data; overwrites move ts
/// forward.
pub async fn law_write_read(node: &dyn Node) {
    let target = uri("law-wr://alice/profile");
    write(node, "law-wr://alice/profile", serde_json::json!({"name": "Alice"})).await;
    let first = node.read(&target).await.unwrap();
    assert_eq!(first.data, json(serde_json::json!({"name": "Alice"})));

    write(node, "law-wr://alice/profile", serde_json::json!({"name": "Alice", "v": 2})).await;
    let second = node.read(&target).await.unwrap();
    assert_eq!(second.data, json(serde_json::json!({"name": "Alice", "v": 2})));
    assert!(second.ts > first.ts, "ts must be monotonic per uri");
}

/// Binary values round-trip byte-for-byte.
pub async fn law_binary_round_trip(node: &dyn Node) {
    let target = uri("law-bin://files/blob");
    let payload = vec![0u8, 1, 2, 3, 254, 255];
    let receipt = node
        .receive(WriteRequest::new(target.clone(), Value::Bytes(payload.clone())))
        .await
        .unwrap();
    assert!(receipt.accepted());
    let record = node.read(&target).await.unwrap();
    assert_eq!(record.data.as_bytes(), Some(payload.as_slice()));
}

/// `delete` ok ⇒ `read` is `not-found`; deleting again is `not-found`.
pub async fn law_delete(node: &dyn Node) {
    let target = uri("law-del://alice/tmp");
    write(node, "law-del://alice/tmp", serde_json::json!(1)).await;
    node.delete(&target).await.unwrap();
    assert!(matches!(node.read(&target).await, Err(NodeError::NotFound(_))));
    assert!(matches!(node.delete(&target).await, Err(NodeError::NotFound(_))));
}

/// `list` returns exactly the stored children, collapsed and tagged.
pub async fn law_list(node: &dyn Node) {
    write(node, "law-list://alice/profile", serde_json::json!(1)).await;
    write(node, "law-list://alice/posts/1", serde_json::json!(2)).await;
    write(node, "law-list://alice/posts/2", serde_json::json!(3)).await;
    write(node, "law-list://alice-other/x", serde_json::json!(4)).await;

    let page = node
        .list(&uri("law-list://alice"), ListOptions::default())
        .await
        .unwrap();
    assert_eq!(page.page.total, 2);
    assert_eq!(page.items[0].uri.as_str(), "law-list://alice/posts");
    assert_eq!(page.items[0].kind, ListItemKind::Directory);
    assert_eq!(page.items[1].uri.as_str(), "law-list://alice/profile");
    assert_eq!(page.items[1].kind, ListItemKind::Leaf);

    // Substring pattern filters on the full child URI.
    let filtered = node
        .list(
            &uri("law-list://alice"),
            ListOptions {
                pattern: Some("posts".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(filtered.page.total, 1);
    assert_eq!(filtered.items[0].uri.as_str(), "law-list://alice/posts");
}

/// Pagination is stable while nothing is inserted.
pub async fn law_pagination(node: &dyn Node) {
    for index in 0..25 {
        write(
            node,
            &format!("law-page://alice/item-{:02}", index),
            serde_json::json!(index),
        )
        .await;
    }
    let opts = |page| ListOptions {
        page,
        limit: 10,
        ..Default::default()
    };
    let first = node.list(&uri("law-page://alice"), opts(1)).await.unwrap();
    let second = node.list(&uri("law-page://alice"), opts(2)).await.unwrap();
    let third = node.list(&uri("law-page://alice"), opts(3)).await.unwrap();

    assert_eq!(first.page.total, 25);
    assert_eq!(first.items.len(), 10);
    assert_eq!(second.items.len(), 10);
    assert_eq!(third.items.len(), 5);
    assert_eq!(first.items[0].uri.as_str(), "law-page://alice/item-00");
    assert_eq!(second.items[0].uri.as_str(), "law-page://alice/item-10");
    assert_eq!(third.items[4].uri.as_str(), "law-page://alice/item-24");

    // Re-reading a page yields the same items.
    let again = node.list(&uri("law-page://alice"), opts(2)).await.unwrap();
    assert_eq!(again.items, second.items);
}

/// ts sort orders by write time, ties broken by URI ascending.
pub async fn law_ts_sort(node: &dyn Node) {
    write(node, "law-ts://alice/first", serde_json::json!(1)).await;
    write(node, "law-ts://alice/second", serde_json::json!(2)).await;
    write(node, "law-ts://alice/third", serde_json::json!(3)).await;

    let page = node
        .list(
            &uri("law-ts://alice"),
            ListOptions {
                sort_by: SortBy::Ts,
                sort_order: SortOrder::Desc,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let uris: Vec<_> = page.items.iter().map(|item| item.uri.as_str()).collect();
    assert_eq!(
        uris,
        vec!["law-ts://alice/third", "law-ts://alice/second", "law-ts://alice/first"]
    );
}

/// Writing an envelope leaves the envelope and every output readable.
pub async fn law_envelope(node: &dyn Node) {
    let envelope = json(serde_json::json!({
        "outputs": [
            ["law-env://users/alice", {"n": "A"}],
            ["law-env://users/bob", {"n": "B"}]
        ]
    }));
    let receipt = node
        .receive(WriteRequest::new(uri("law-env://batch/1"), envelope.clone()))
        .await
        .unwrap();
    assert!(receipt.accepted());
    assert_eq!(receipt.children.len(), 2);
    assert_eq!(receipt.resolved_uri.program_key().as_str(), "hash://sha256");

    assert_eq!(node.read(&receipt.resolved_uri).await.unwrap().data, envelope);
    assert_eq!(
        node.read(&uri("law-env://users/alice")).await.unwrap().data,
        json(serde_json::json!({"n": "A"}))
    );
    assert_eq!(
        node.read(&uri("law-env://users/bob")).await.unwrap().data,
        json(serde_json::json!({"n": "B"}))
    );
}

/// `read_multi` respects the cap and reports per-URI outcomes.
pub async fn law_read_multi(node: &dyn Node) {
    write(node, "law-multi://alice/a", serde_json::json!(1)).await;
    write(node, "law-multi://alice/b", serde_json::json!(2)).await;

    let result = node
        .read_multi(&[
            uri("law-multi://alice/a"),
            uri("law-multi://alice/b"),
            uri("law-multi://alice/missing"),
        ])
        .await
        .unwrap();
    assert_eq!(result.summary.total, 3);
    assert_eq!(result.summary.succeeded, 2);
    assert_eq!(result.summary.failed, 1);
    assert!(result.results[2].result.is_err());

    let too_many: Vec<Uri> = (0..51)
        .map(|index| uri(&format!("law-multi://alice/{}", index)))
        .collect();
    assert!(matches!(
        node.read_multi(&too_many).await,
        Err(NodeError::BatchTooLarge(_))
    ));
}

/// The whole suite for a plain (unvalidated) backend.
pub async fn assert_backend_laws(node: &dyn Node) {
    law_write_read(node).await;
    law_binary_round_trip(node).await;
    law_delete(node).await;
    law_list(node).await;
    law_pagination(node).await;
    law_ts_sort(node).await;
    law_envelope(node).await;
    law_read_multi(node).await;
}

/// Laws of validated stores: immutability and content addressing.
///
/// The node must wrap a registry containing the open programs
/// (`mutable://open`, `once://open`, `hash://sha256`, `link://open`).
pub async fn assert_validated_laws(node: &dyn Node) {
    // Immutable: first write accepted, second rejected, record unchanged.
    let once = uri("once://open/law");
    node.receive(WriteRequest::new(once.clone(), json(serde_json::json!({"v": 1}))))
        .await
        .unwrap();
    assert!(matches!(
        node.receive(WriteRequest::new(once.clone(), json(serde_json::json!({"v": 2}))))
            .await,
        Err(NodeError::ImmutableExists(_))
    ));
    assert_eq!(
        node.read(&once).await.unwrap().data,
        json(serde_json::json!({"v": 1}))
    );

    // Content hash: accepted iff the value hashes to the address.
    let value = json(serde_json::json!({"x": 1}));
    let good = shared_types::canonical::content_uri(&value);
    let bad = uri(&format!("hash://sha256:{}", "00".repeat(32)));
    assert!(matches!(
        node.receive(WriteRequest::new(bad, value.clone())).await,
        Err(NodeError::HashMismatch(_))
    ));
    node.receive(WriteRequest::new(good.clone(), value.clone()))
        .await
        .unwrap();
    node.receive(WriteRequest::new(good.clone(), value.clone()))
        .await
        .unwrap();

    // Unregistered programs are `no-schema`, never silently accepted.
    assert!(matches!(
        node.receive(WriteRequest::new(
            uri("unregistered://app/x"),
            json(serde_json::json!(1))
        ))
        .await,
        Err(NodeError::NoSchema(_))
    ));
}
