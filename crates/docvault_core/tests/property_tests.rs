//! Property-based tests for version assignment and content storage.

use docvault_core::{
    ContentStore, DocumentVersion, InMemoryContentStore, InMemoryMetadataStore,
    VersioningOrchestrator,
};
use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
}

/// Uploads drawn from a small pool of names, so repeats and interleavings are common.
fn upload_sequence() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-d]\\.(pdf|txt)", 0..40)
}

fn upload_all(names: &[String]) -> (Vec<DocumentVersion>, Vec<DocumentVersion>) {
    runtime().block_on(async {
        let versioning = VersioningOrchestrator::new(
            Arc::new(InMemoryMetadataStore::new()),
            Arc::new(InMemoryContentStore::new()),
        );
        let mut uploaded = Vec::with_capacity(names.len());
        for name in names {
            uploaded.push(versioning.upload(name, name.as_bytes(), 1).await.unwrap());
        }
        let listing = versioning.list_latest().await.unwrap();
        (uploaded, listing)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn each_name_is_numbered_one_to_n(names in upload_sequence()) {
        let (uploaded, _) = upload_all(&names);

        let mut seen: HashMap<&str, i32> = HashMap::new();
        for (name, record) in names.iter().zip(&uploaded) {
            let count = seen.entry(name.as_str()).or_insert(0);
            *count += 1;
            prop_assert_eq!(&record.original_name, name);
            prop_assert_eq!(record.version, *count);
        }
    }

    #[test]
    fn listing_has_one_latest_entry_per_name(names in upload_sequence()) {
        let (uploaded, listing) = upload_all(&names);

        let mut expected: HashMap<&str, &DocumentVersion> = HashMap::new();
        for record in &uploaded {
            expected.insert(record.original_name.as_str(), record);
        }
        prop_assert_eq!(listing.len(), expected.len());
        for entry in &listing {
            prop_assert_eq!(Some(&entry), expected.get(entry.original_name.as_str()));
        }
    }

    #[test]
    fn memory_content_round_trips(content in prop::collection::vec(any::<u8>(), 0..4096)) {
        let store = InMemoryContentStore::new();
        let read = runtime().block_on(async {
            let location = store.put("blob.bin", &content).await.unwrap();
            store.get(&location).await.unwrap()
        });
        prop_assert_eq!(read, content);
    }
}
