//! Property-based tests for credential scoping and SBOM rewriting.
//!
//! Credential scoping must always pick the longest store key that is a
//! segment prefix of the reference, and a rewrite applied twice must give
//! the same document as a rewrite applied once.

use component_sbom::handlers::parse_purl;
use component_sbom::registry::write_scoped_auth;
use component_sbom::{AuthStore, Component, Digest, Image, ResolvedImage, SbomHandler};
use proptest::prelude::*;
use serde_json::{json, Value};

fn segment() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,7}"
}

fn repository() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(segment(), 1..5)
}

fn credential(marker: usize) -> Value {
    json!({ "auth": format!("token-{marker}") })
}

fn spdx_document(hex: &str) -> Value {
    json!({
        "spdxVersion": "SPDX-2.3",
        "SPDXID": "SPDXRef-DOCUMENT",
        "name": "build",
        "packages": [
            {
                "SPDXID": "SPDXRef-image",
                "checksums": [{"algorithm": "SHA256", "checksumValue": hex}],
                "externalRefs": []
            },
            {
                "SPDXID": "SPDXRef-other",
                "checksums": [{"algorithm": "SHA256", "checksumValue": "00"}]
            }
        ]
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn scope_picks_longest_segment_prefix(
        segments in repository(),
        keyed in prop::collection::vec(any::<bool>(), 5),
    ) {
        let registry = "quay.io";
        let prefixes: Vec<String> = (0..=segments.len())
            .map(|n| {
                std::iter::once(registry.to_string())
                    .chain(segments[..n].iter().cloned())
                    .collect::<Vec<_>>()
                    .join("/")
            })
            .collect();

        let entries: Vec<(String, Value)> = prefixes
            .iter()
            .enumerate()
            .filter(|(i, _)| keyed[*i])
            .map(|(i, prefix)| (prefix.clone(), credential(i)))
            .collect();
        let expected = prefixes
            .iter()
            .enumerate()
            .rev()
            .find(|(i, _)| keyed[*i])
            .map(|(i, prefix)| (prefix.clone(), credential(i)));

        let store = AuthStore::from_entries(entries);
        let reference = format!("{}@sha256:abc123", prefixes[segments.len()]);
        let mut sink = Vec::new();
        let found = write_scoped_auth(&store, &reference, &mut sink).expect("write succeeds");
        let written: Value = serde_json::from_slice(&sink).expect("valid JSON");
        let auths = written["auths"].as_object().expect("auths object");

        match expected {
            Some((prefix, credential)) => {
                let scoped = store.scope_for(&reference);
                prop_assert!(found);
                prop_assert_eq!(scoped.matched(), Some(prefix.as_str()));
                prop_assert_eq!(auths.len(), 1);
                prop_assert_eq!(&auths[registry], &credential);
            }
            None => {
                prop_assert!(!found);
                prop_assert!(auths.is_empty());
            }
        }
    }

    #[test]
    fn sibling_keys_never_match(segments in repository(), suffix in segment()) {
        let reference = format!("quay.io/{}", segments.join("/"));
        let sibling = format!("{reference}{suffix}");
        let store = AuthStore::from_entries([(sibling, credential(0))]);

        let reference = format!("{reference}@sha256:00");
        let found = store.scope_for(&reference).is_found();
        prop_assert!(!found);
    }

    #[test]
    fn rewrite_is_idempotent(
        hex in "[0-9a-f]{8,64}",
        segments in repository(),
        tags in prop::collection::vec("[a-z0-9][a-z0-9.-]{0,12}", 0..4),
    ) {
        let digest = Digest::parse(&format!("sha256:{hex}")).expect("valid digest");
        let image = ResolvedImage::Image(Image::new(digest.clone()));
        let component = Component::new(
            format!("registry.example.com/{}", segments.join("/")),
            image.clone(),
            tags.clone(),
        );
        let reference = format!("{}@{digest}", component.repository);

        let mut document = spdx_document(&hex);
        let handler = SbomHandler::for_document(&document, &reference).expect("SPDX 2.3");
        handler.update_document(&component, &image, &mut document).expect("first rewrite");
        let once = document.clone();
        handler.update_document(&component, &image, &mut document).expect("second rewrite");

        prop_assert_eq!(&document, &once);
        prop_assert_eq!(document["name"].as_str(), Some(reference.as_str()));

        let refs = document["packages"][0]["externalRefs"].as_array().expect("refs").clone();
        prop_assert_eq!(refs.len(), tags.len());
        for (r, tag) in refs.iter().zip(&tags) {
            let purl = parse_purl(r["referenceLocator"].as_str().expect("locator"))
                .expect("valid purl");
            prop_assert_eq!(purl.version.as_deref(), Some(digest.as_str()));
            prop_assert_eq!(purl.tag.as_deref(), Some(tag.as_str()));
            prop_assert_eq!(purl.name.as_str(), component.name());
        }
        prop_assert!(document["packages"][1].get("externalRefs").is_none());
    }
}
