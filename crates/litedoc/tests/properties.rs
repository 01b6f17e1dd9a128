use std::sync::Arc;

use litedoc::{Document, DocumentConfig, Native};
use proptest::prelude::*;
use serde_json::{json, Value};

fn json_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        (-1.0e6f64..1.0e6).prop_map(|f| json!(f)),
        "[a-z]{0,8}".prop_map(Value::String),
    ];
    leaf.prop_recursive(4, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::vec(("[a-z]{1,4}", inner), 0..6)
                .prop_map(|pairs| Value::Object(pairs.into_iter().collect())),
        ]
    })
}

fn encoded(json: &Value) -> Vec<u8> {
    Document::from_json(json).unwrap().encode().unwrap()
}

proptest! {
    #[test]
    fn json_survives_encoding(json in json_value()) {
        let doc = Document::from_bytes(encoded(&json)).unwrap();
        prop_assert_eq!(doc.to_json().unwrap(), json);
    }

    #[test]
    fn untouched_documents_encode_to_their_source(json in json_value()) {
        let bytes = encoded(&json);
        let mut doc = Document::from_bytes(bytes.clone()).unwrap();
        prop_assert_eq!(&doc.encode().unwrap(), &bytes);
        doc.materialize_all().unwrap();
        prop_assert!(!doc.is_dirty());
        prop_assert_eq!(&doc.encode().unwrap(), &bytes);
    }

    #[test]
    fn canonical_sources_reencode_identically_without_reuse(json in json_value()) {
        let bytes = encoded(&json);
        let config = DocumentConfig { reuse_encoded: false, ..DocumentConfig::default() };
        let mut doc = Document::from_bytes_with(bytes.clone(), config).unwrap();
        prop_assert_eq!(&doc.encode().unwrap(), &bytes);
        doc.materialize_all().unwrap();
        let (again, report) = doc.encode_with_report().unwrap();
        prop_assert_eq!(&again, &bytes);
        prop_assert_eq!(report.verbatim_ranges, 0);
    }

    #[test]
    fn single_element_writes_match_fresh_encoding(
        items in prop::collection::vec(json_value(), 1..8),
        replacement in json_value(),
        pick in any::<prop::sample::Index>(),
    ) {
        let original = Value::Array(items);
        let mut doc = Document::from_bytes(encoded(&original)).unwrap();
        let len = original.as_array().map_or(0, Vec::len);
        let index = pick.index(len);
        doc.root_array().unwrap().set_json(index, &replacement).unwrap();

        let mut expected = original;
        expected[index] = replacement;
        prop_assert_eq!(doc.encode().unwrap(), encoded(&expected));
    }

    #[test]
    fn repeated_reads_share_one_allocation(
        strings in prop::collection::vec("[a-z]{0,12}", 1..10),
    ) {
        let json = Value::Array(strings.iter().cloned().map(Value::String).collect());
        let mut doc = Document::from_bytes(encoded(&json)).unwrap();
        let mut array = doc.root_array().unwrap();
        for (i, expected) in strings.iter().enumerate() {
            let (Native::String(a), Native::String(b)) =
                (array.get_object(i).unwrap(), array.get_object(i).unwrap())
            else {
                panic!("expected strings");
            };
            prop_assert!(Arc::ptr_eq(&a, &b));
            prop_assert_eq!(&*a, expected.as_str());
        }
    }
}
