use std::sync::Arc;

use chrono::{TimeZone, Utc};
use litedoc::{
    Document, DocumentConfig, EncodeError, Error, MemoryBlobStore, Native, Number, Owner,
    SlotState,
};
use serde_json::{json, Value};

fn encoded(json: Value) -> Vec<u8> {
    Document::from_json(&json).unwrap().encode().unwrap()
}

fn open(json: Value) -> Document {
    Document::from_bytes(encoded(json)).unwrap()
}

// [1, "two", true]
const THREE: [u8; 7] = [0x83, 0x01, 0x63, b't', b'w', b'o', 0xf5];

#[test]
fn typed_getters_on_three_element_array() {
    let mut doc = Document::from_bytes(THREE.to_vec()).unwrap();
    let mut array = doc.root_array().unwrap();
    assert_eq!(array.count().unwrap(), 3);
    assert_eq!(array.get_int(0).unwrap(), 1);
    assert_eq!(array.get_string(1).unwrap().as_deref(), Some("two"));
    assert!(array.get_boolean(2).unwrap());
    assert_eq!(array.get_number(1).unwrap(), None);
    assert_eq!(array.get_number(0).unwrap(), Some(Number::Int(1)));
}

#[test]
fn out_of_range_index_fails() {
    let mut doc = Document::from_bytes(THREE.to_vec()).unwrap();
    let mut array = doc.root_array().unwrap();
    assert!(matches!(
        array.get_object(5),
        Err(Error::OutOfRange { index: 5, count: 3 })
    ));
    assert!(matches!(array.get_int(3), Err(Error::OutOfRange { .. })));
    assert!(matches!(array.set(3, 1), Err(Error::OutOfRange { .. })));
    assert!(matches!(array.remove(3), Err(Error::OutOfRange { .. })));
    assert!(matches!(array.insert(4, 1), Err(Error::OutOfRange { .. })));
}

#[test]
fn mutation_only_changes_the_mutated_element() {
    let mut doc = Document::from_bytes(THREE.to_vec()).unwrap();
    let mut array = doc.root_array().unwrap();
    array.get_int(0).unwrap();
    array.set(1, 3.5).unwrap();
    assert_eq!(array.slot_state(0).unwrap(), SlotState::Clean);
    assert_eq!(array.slot_state(1).unwrap(), SlotState::Dirty);
    assert_eq!(array.slot_state(2).unwrap(), SlotState::Unloaded);
    assert!(matches!(
        array.slot_state(3),
        Err(Error::OutOfRange { index: 3, count: 3 })
    ));

    let (bytes, report) = doc.encode_with_report().unwrap();
    assert_eq!(bytes, [0x83, 0x01, 0xfa, 0x40, 0x60, 0x00, 0x00, 0xf5]);
    assert_eq!(report.verbatim_ranges, 2);
    assert_eq!(report.verbatim_bytes, 2);
    // The array header and the new float.
    assert_eq!(report.encoded_values, 2);
}

#[test]
fn reads_are_identity_stable() {
    let mut doc = open(json!(["hello", [1, 2], {"a": 1}]));
    let mut array = doc.root_array().unwrap();

    let (Native::String(a), Native::String(b)) =
        (array.get_object(0).unwrap(), array.get_object(0).unwrap())
    else {
        panic!("expected strings");
    };
    assert!(Arc::ptr_eq(&a, &b));

    let first = array.get_array(1).unwrap().unwrap().id();
    let second = array.get_array(1).unwrap().unwrap().id();
    assert_eq!(first, second);

    let first = array.get_dictionary(2).unwrap().unwrap().id();
    let second = array.get_dictionary(2).unwrap().unwrap().id();
    assert_eq!(first, second);
}

#[test]
fn second_read_is_a_cache_hit() {
    let mut doc = open(json!(["x", "y"]));
    doc.root_array().unwrap().get_string(0).unwrap();
    let before = doc.stats();
    doc.root_array().unwrap().get_string(0).unwrap();
    let after = doc.stats();
    assert_eq!(after.materialized, before.materialized);
    assert_eq!(after.nodes_created, before.nodes_created);
    assert!(after.cache_hits > before.cache_hits);
    assert!(!doc.is_dirty());
}

#[test]
fn absent_keys_are_not_errors() {
    let mut doc = open(json!({"f": 2.7, "b": true, "s": "x", "n": null}));
    let mut dict = doc.root_dictionary().unwrap();
    assert_eq!(dict.get_object("missing").unwrap(), None);
    assert_eq!(dict.get_string("missing").unwrap(), None);
    assert_eq!(dict.get_int("missing").unwrap(), 0);
    assert!(!dict.get_boolean("missing").unwrap());
    assert_eq!(dict.slot_state("missing").unwrap(), None);
    assert!(!dict.contains("missing").unwrap());

    assert_eq!(dict.get_int("f").unwrap(), 2);
    assert_eq!(dict.get_long("b").unwrap(), 1);
    assert_eq!(dict.get_number("b").unwrap(), None);
    assert_eq!(dict.get_double("s").unwrap(), 0.0);
    assert!(dict.get_boolean("s").unwrap());
    assert!(!dict.get_boolean("n").unwrap());
    assert_eq!(dict.get_object("n").unwrap(), Some(Native::Null));
}

#[test]
fn sibling_nodes_stay_isolated() {
    let source = encoded(json!({"a": [1, 2], "b": [3, 4]}));
    let mut doc = Document::from_bytes(source).unwrap();
    let (a, b) = {
        let mut root = doc.root_dictionary().unwrap();
        let a = root.get_array("a").unwrap().unwrap().id();
        let b = root.get_array("b").unwrap().unwrap().id();
        (a, b)
    };
    doc.array(b).unwrap().get_int(0).unwrap();
    doc.array(a).unwrap().set(0, 9).unwrap();

    let b_handle = doc.array(b).unwrap();
    assert!(!b_handle.is_dirty().unwrap());
    assert_eq!(b_handle.slot_state(0).unwrap(), SlotState::Clean);
    assert_eq!(b_handle.slot_state(1).unwrap(), SlotState::Unloaded);
    assert!(doc.array(a).unwrap().is_dirty().unwrap());
    assert!(doc.root_dictionary().unwrap().is_dirty().unwrap());

    let (bytes, report) = doc.encode_with_report().unwrap();
    assert_eq!(bytes, encoded(json!({"a": [9, 2], "b": [3, 4]})));
    // "b" is copied as a whole, a[1] on its own.
    assert_eq!(report.verbatim_ranges, 2);
}

#[test]
fn cloned_documents_diverge_independently() {
    let mut doc = open(json!([1, [2, 3]]));
    doc.materialize_all().unwrap();
    let mut fork = doc.clone();
    assert!(Arc::ptr_eq(doc.source(), fork.source()));

    fork.root_array()
        .unwrap()
        .get_array(1)
        .unwrap()
        .unwrap()
        .append("x")
        .unwrap();

    assert!(!doc.is_dirty());
    assert!(fork.is_dirty());
    assert_eq!(doc.to_json().unwrap(), json!([1, [2, 3]]));
    assert_eq!(fork.to_json().unwrap(), json!([1, [2, 3, "x"]]));
    assert_eq!(doc.encode().unwrap(), doc.source().to_vec());
}

#[test]
fn deep_mutation_touches_every_ancestor() {
    let mut doc = open(json!({"x": {"y": {"z": 1}}, "w": [true]}));
    let y = {
        let mut root = doc.root_dictionary().unwrap();
        let mut x = root.get_dictionary("x").unwrap().unwrap();
        x.get_dictionary("y").unwrap().unwrap().id()
    };
    assert!(!doc.is_dirty());
    doc.dictionary(y).unwrap().set("z", 2).unwrap();
    assert!(doc.is_dirty());

    let root = doc.root_dictionary().unwrap().id();
    let x = doc.root_dictionary().unwrap().get_dictionary("x").unwrap().unwrap().id();
    assert!(doc.dictionary(x).unwrap().is_dirty().unwrap());
    assert_eq!(doc.owner(y).unwrap(), Owner::Node(x));
    assert_eq!(doc.owner(x).unwrap(), Owner::Node(root));
    assert_eq!(doc.owner(root).unwrap(), Owner::Root);

    let (bytes, report) = doc.encode_with_report().unwrap();
    assert_eq!(bytes, encoded(json!({"x": {"y": {"z": 2}}, "w": [true]})));
    assert_eq!(report.verbatim_ranges, 1);
}

#[test]
fn structural_array_edits() {
    let mut doc = open(json!([1, 2, 3]));
    let mut array = doc.root_array().unwrap();
    array.insert(0, "a").unwrap();
    array.append(true).unwrap();
    array.remove(2).unwrap();
    assert_eq!(array.count().unwrap(), 4);
    assert!(matches!(
        array.insert(5, 0),
        Err(Error::OutOfRange { index: 5, count: 4 })
    ));
    assert_eq!(array.to_list().unwrap(), vec![json!("a"), json!(1), json!(3), json!(true)]);
    assert_eq!(doc.encode().unwrap(), encoded(json!(["a", 1, 3, true])));
}

#[test]
fn structural_dictionary_edits_keep_order() {
    let mut doc = open(json!({"a": 1, "b": 2}));
    let mut dict = doc.root_dictionary().unwrap();
    dict.set("c", 3).unwrap();
    assert!(dict.remove("a").unwrap());
    assert!(!dict.remove("a").unwrap());
    assert_eq!(dict.keys().unwrap(), vec!["b".to_string(), "c".to_string()]);
    assert_eq!(dict.slot_state("c").unwrap(), Some(SlotState::Dirty));
    assert_eq!(dict.slot_state("b").unwrap(), Some(SlotState::Unloaded));
    assert_eq!(doc.encode().unwrap(), encoded(json!({"b": 2, "c": 3})));
}

#[test]
fn replaced_collections_go_stale() {
    let mut doc = open(json!([[1, [2]], 3]));
    let inner = doc.root_array().unwrap().get_array(0).unwrap().unwrap().id();
    let nested = doc.array(inner).unwrap().get_array(1).unwrap().unwrap().id();
    let live = doc.node_count();

    doc.root_array().unwrap().set(0, 5).unwrap();
    assert!(matches!(doc.array(inner), Err(Error::StaleNode)));
    assert!(matches!(doc.array(nested), Err(Error::StaleNode)));
    assert_eq!(doc.node_count(), live - 2);
    assert_eq!(doc.stats().nodes_released, 2);
    assert_eq!(doc.to_json().unwrap(), json!([5, 3]));
}

#[test]
fn handles_check_the_collection_kind() {
    let mut doc = open(json!({"a": [1]}));
    assert!(matches!(doc.root_array(), Err(Error::NotAnArray)));
    let a = doc.root_dictionary().unwrap().get_array("a").unwrap().unwrap().id();
    assert!(matches!(doc.dictionary(a), Err(Error::NotADictionary)));
    assert!(doc.root_dictionary().unwrap().get_dictionary("a").unwrap().is_none());
}

#[test]
fn attach_rules() {
    let mut doc = Document::new();
    let root = doc.new_array().unwrap().id();
    let d = doc.create_dict();
    assert_eq!(doc.owner(d).unwrap(), Owner::Detached);
    doc.array(root).unwrap().append(Native::Dictionary(d)).unwrap();
    assert_eq!(doc.owner(d).unwrap(), Owner::Node(root));

    // Already owned by slot 0.
    assert!(matches!(
        doc.array(root).unwrap().append(Native::Dictionary(d)),
        Err(Error::AlreadyAttached)
    ));
    // Re-storing a collection in its own slot is fine.
    doc.array(root).unwrap().set(0, Native::Dictionary(d)).unwrap();

    let x = doc.create_array();
    let y = doc.create_array();
    doc.array(x).unwrap().append(Native::Array(y)).unwrap();
    assert!(matches!(
        doc.array(y).unwrap().append(Native::Array(x)),
        Err(Error::Cycle)
    ));
    assert!(matches!(
        doc.array(x).unwrap().append(Native::Array(x)),
        Err(Error::Cycle)
    ));
}

#[test]
fn copies_share_untouched_bytes() {
    let mut doc = open(json!([{"k": [1, 2, 3]}]));
    let original = doc.root_array().unwrap().get_dictionary(0).unwrap().unwrap().id();
    let copy = doc.copy_node(original).unwrap();
    assert_eq!(doc.owner(copy).unwrap(), Owner::Detached);
    doc.root_array().unwrap().append(Native::Dictionary(copy)).unwrap();

    let (bytes, report) = doc.encode_with_report().unwrap();
    assert_eq!(bytes, encoded(json!([{"k": [1, 2, 3]}, {"k": [1, 2, 3]}])));
    assert_eq!(report.verbatim_ranges, 2);

    // Editing the copy leaves the original alone.
    doc.dictionary(copy).unwrap().set("k", 0).unwrap();
    assert_eq!(doc.to_json().unwrap(), json!([{"k": [1, 2, 3]}, {"k": 0}]));
}

#[test]
fn depth_limit_applies_to_loading_and_attaching() {
    let config = DocumentConfig {
        max_depth: 2,
        ..DocumentConfig::default()
    };
    assert!(matches!(
        Document::from_bytes_with(encoded(json!([[[1]]])), config.clone()),
        Err(Error::Decode(_))
    ));

    let mut doc = Document::with_config(config);
    let root = doc.new_array().unwrap().id();
    let a = doc.create_array();
    let b = doc.create_array();
    doc.array(a).unwrap().append(Native::Array(b)).unwrap();
    assert!(matches!(
        doc.array(root).unwrap().append(Native::Array(a)),
        Err(Error::TooDeep { max_depth: 2 })
    ));
    assert!(matches!(
        doc.array(root).unwrap().append_json(&json!([[1]])),
        Err(Error::TooDeep { .. })
    ));
}

#[test]
fn copied_subtrees_count_levels_that_were_never_decoded() {
    let config = DocumentConfig {
        max_depth: 3,
        ..DocumentConfig::default()
    };
    let source = encoded(json!([[[1]], []]));
    let mut doc = Document::from_bytes_with(source.clone(), config.clone()).unwrap();
    let first = doc.root_array().unwrap().get_array(0).unwrap().unwrap().id();
    let second = doc.root_array().unwrap().get_array(1).unwrap().unwrap().id();

    // Only the outer level of the copy is decoded; its [1] is still bytes.
    let copy = doc.copy_node(first).unwrap();
    assert!(matches!(
        doc.array(second).unwrap().append(Native::Array(copy)),
        Err(Error::TooDeep { max_depth: 3 })
    ));
    assert!(!doc.is_dirty());
    assert_eq!(doc.encode().unwrap(), source);

    // One level shallower fits, and the result loads back under the same limit.
    let inner = doc.array(first).unwrap().get_array(0).unwrap().unwrap().id();
    let copy = doc.copy_node(inner).unwrap();
    doc.array(second).unwrap().append(Native::Array(copy)).unwrap();
    let bytes = doc.encode().unwrap();
    let reopened = Document::from_bytes_with(bytes, config).unwrap();
    assert_eq!(reopened.to_json().unwrap(), json!([[[1]], [[1]]]));
}

#[test]
fn dates_round_trip_through_strings() {
    let date = Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).unwrap();
    let mut doc = Document::new();
    let mut dict = doc.new_dict().unwrap();
    dict.set_date("when", &date).unwrap();
    dict.set("bad", "not a date").unwrap();
    assert_eq!(dict.get_string("when").unwrap().as_deref(), Some("2020-01-02T03:04:05.000Z"));
    assert_eq!(dict.get_date("when").unwrap(), Some(date));
    assert_eq!(dict.get_date("bad").unwrap(), None);
    assert_eq!(dict.get_date("missing").unwrap(), None);
}

#[test]
fn blobs_resolve_through_the_store() {
    let store = Arc::new(MemoryBlobStore::new());
    let reference = store.put(Some("text/plain"), b"hello").unwrap();

    let mut doc = Document::new();
    let mut array = doc.new_array().unwrap();
    array.append(reference.clone()).unwrap();
    array.append("plain").unwrap();
    let bytes = doc.encode().unwrap();

    let mut doc = Document::from_bytes(bytes).unwrap().with_blob_store(store);
    let blob = doc.root_array().unwrap().get_blob(0).unwrap().unwrap();
    assert_eq!(blob.reference(), &reference);
    assert_eq!(blob.content_type(), Some("text/plain"));
    assert_eq!(&*doc.blob_content(&blob).unwrap(), b"hello");
    assert!(doc.root_array().unwrap().get_blob(1).unwrap().is_none());

    let again = doc.root_array().unwrap().get_blob(0).unwrap().unwrap();
    assert!(blob.ptr_eq(&again));

    assert_eq!(
        doc.to_json().unwrap()[0],
        json!({"@type": "blob", "digest": reference.digest, "length": 5, "content_type": "text/plain"})
    );
}

#[test]
fn unknown_blobs_report_resolution_failure() {
    let store = Arc::new(MemoryBlobStore::new());
    let mut doc = Document::from_json(&json!([{"@type": "blob", "digest": "sha1-none", "length": 1}]))
        .unwrap()
        .with_blob_store(store);
    let blob = doc.root_array().unwrap().get_blob(0).unwrap().unwrap();
    assert!(matches!(
        doc.blob_content(&blob),
        Err(Error::BlobResolution(litedoc::BlobStoreError::NotFound { .. }))
    ));
}

#[test]
fn failed_encode_leaves_document_untouched() {
    let mut doc = open(json!([1, 2]));
    let source = Arc::clone(doc.source());
    doc.root_array().unwrap().set(1, f64::NAN).unwrap();

    assert!(matches!(doc.encode(), Err(EncodeError::NonFiniteFloat(_))));
    let mut out = litedoc::Encoder::new();
    out.write_raw(b"prefix");
    assert!(doc.encode_to(&mut out).is_err());
    assert_eq!(out.as_slice(), b"prefix");

    assert!(matches!(doc.save(), Err(Error::Encode(_))));
    assert!(Arc::ptr_eq(doc.source(), &source));
    assert!(doc.is_dirty());

    doc.root_array().unwrap().set(1, 2.5).unwrap();
    doc.save().unwrap();
    assert_eq!(doc.to_json().unwrap(), json!([1, 2.5]));
}

#[test]
fn save_swaps_in_the_new_buffer() {
    let mut doc = open(json!({"n": [1]}));
    let n = doc.root_dictionary().unwrap().get_array("n").unwrap().unwrap().id();
    doc.array(n).unwrap().append(2).unwrap();
    doc.save().unwrap();

    assert!(!doc.is_dirty());
    assert_eq!(doc.root_state(), SlotState::Unloaded);
    assert_eq!(doc.node_count(), 0);
    assert!(matches!(doc.array(n), Err(Error::StaleNode)));
    assert_eq!(doc.source().to_vec(), encoded(json!({"n": [1, 2]})));
    assert_eq!(doc.encode().unwrap(), doc.source().to_vec());
}

#[test]
fn set_json_builds_nested_values() {
    let mut doc = open(json!({"a": 1}));
    let mut dict = doc.root_dictionary().unwrap();
    dict.set_json("list", &json!([1, {"b": [true]}])).unwrap();
    let mut list = dict.get_array("list").unwrap().unwrap();
    assert_eq!(list.count().unwrap(), 2);
    assert_eq!(
        list.get_dictionary(1).unwrap().unwrap().to_json().unwrap(),
        json!({"b": [true]})
    );
    assert_eq!(doc.encode().unwrap(), encoded(json!({"a": 1, "list": [1, {"b": [true]}]})));
}

#[test]
fn values_iterates_in_order() {
    let mut doc = open(json!([null, 1, "s"]));
    let values = doc.root_array().unwrap().values().unwrap();
    assert_eq!(values, vec![Native::Null, Native::Int(1), Native::from("s")]);
}

#[test]
fn sub_collections_encode_on_their_own() {
    let mut doc = open(json!({"inner": [1, "x"]}));
    let inner = doc.root_dictionary().unwrap().get_array("inner").unwrap().unwrap().id();
    let mut out = litedoc::Encoder::new();
    doc.array(inner).unwrap().encode_to(&mut out).unwrap();
    assert_eq!(out.finish(), encoded(json!([1, "x"])));
}
