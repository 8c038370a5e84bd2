//! Reading typed values and navigating factories over parsed documents.

extern crate objconf;
extern crate serde;
extern crate tempfile;

#[macro_use]
extern crate serde_derive;

use std::collections::BTreeMap;
use std::fs;
use std::rc::Rc;

use objconf::{Error, Factory};

#[test]
fn creates_from_string() {
    let root = Factory::from_str("item: \"im a string!\"\n").unwrap();

    assert_eq!(root.get::<String>("item").unwrap(), "im a string!");
    assert_eq!(root.class_type(), "");
    assert!(root.unused_values().is_empty());
}

#[test]
fn creates_from_file() {
    let directory = tempfile::tempdir().unwrap();
    let path = directory.path().join("config.yaml");
    fs::write(&path, "item: \"im a string!\"\n").unwrap();

    let root = Factory::from_file(&path).unwrap();

    assert_eq!(root.get::<String>("item").unwrap(), "im a string!");
}

#[test]
fn parses_strings() {
    let root = Factory::from_str(
        "item: im_a_string\nitem 2: im a string\nitem3: \"im a string \"\n",
    )
    .unwrap();

    assert_eq!(root.get::<String>("item").unwrap(), "im_a_string");
    assert_eq!(root.get::<String>("item 2").unwrap(), "im a string");
    assert_eq!(root.get::<String>("item3").unwrap(), "im a string ");
}

#[test]
fn fails_for_missing_required_value() {
    let root = Factory::from_str("item: im_a_string\n").unwrap();

    match root.get::<String>("itemNotThere") {
        Err(Error::MissingKey { ref name, ref path }) => {
            assert_eq!(name, "itemNotThere");
            assert_eq!(path, "root");
        }
        other => panic!("expected MissingKey, got {:?}", other),
    }
}

#[test]
fn optional_values_default_to_none() {
    let root = Factory::from_str("item: im_a_string\nitem2: 22\n").unwrap();

    assert_eq!(
        root.get_opt::<String>("item").unwrap(),
        Some("im_a_string".to_string())
    );
    assert_eq!(root.get_opt::<String>("missing").unwrap(), None);
    assert_eq!(root.get_opt::<i64>("missing").unwrap(), None);
    assert_eq!(root.get_or::<i64>("missing", 7).unwrap(), 7);
    assert_eq!(root.get_or::<i64>("item2", 7).unwrap(), 22);
}

#[test]
fn parses_ints() {
    let root =
        Factory::from_str("item: 22\nitem 2: 1\nitem3: \"3 \"\nitem4: \"not an int \"\n").unwrap();

    assert_eq!(root.get::<i64>("item").unwrap(), 22);
    assert_eq!(root.get::<i64>("item 2").unwrap(), 1);
    assert_eq!(root.get::<i64>("item3").unwrap(), 3);
    assert!(matches!(
        root.get::<i64>("item4"),
        Err(Error::BadConversion { .. })
    ));
}

#[test]
fn parses_doubles() {
    let root =
        Factory::from_str("item: 22.3\nitem 2: 1\nitem3: \"3.3 \"\nitem4: \"not a double \"\n")
            .unwrap();

    assert_eq!(root.get::<f64>("item").unwrap(), 22.3);
    assert_eq!(root.get::<f64>("item 2").unwrap(), 1.0);
    assert_eq!(root.get::<f64>("item3").unwrap(), 3.3);
    assert!(matches!(
        root.get::<f64>("item4"),
        Err(Error::BadConversion { .. })
    ));
}

#[test]
fn parses_bools() {
    let root = Factory::from_str(
        "item: true\nitem 2: False\nitem3: false\nitem4: \"truafeae \"\nitem5: True\n",
    )
    .unwrap();

    assert_eq!(root.get::<bool>("item").unwrap(), true);
    assert_eq!(root.get::<bool>("item 2").unwrap(), false);
    assert_eq!(root.get::<bool>("item3").unwrap(), false);
    assert!(matches!(
        root.get::<bool>("item4"),
        Err(Error::BadConversion { .. })
    ));
    assert_eq!(root.get::<bool>("item5").unwrap(), true);
}

#[test]
fn reads_structs_through_serde() {
    #[derive(Debug, PartialEq, Deserialize)]
    struct Limits {
        low: i64,
        high: i64,
        label: Option<String>,
    }

    let root = Factory::from_str("limits:\n  low: 1\n  high: 10\n  label: speed\n").unwrap();

    assert_eq!(
        root.get::<Limits>("limits").unwrap(),
        Limits {
            low: 1,
            high: 10,
            label: Some("speed".to_string()),
        }
    );
}

#[test]
fn reads_enums_from_scalars() {
    #[derive(Debug, PartialEq, Deserialize)]
    enum Mode {
        #[serde(rename = "append")]
        Append,
        #[serde(rename = "truncate")]
        Truncate,
    }

    let root = Factory::from_str("mode: truncate\n").unwrap();

    assert_eq!(root.get::<Mode>("mode").unwrap(), Mode::Truncate);
}

#[test]
fn parses_sub_factories() {
    let root = Factory::from_str("item: 22\nitem 2:\n  child1: 12\n  child2: im a string\n").unwrap();

    let child = root.child("item 2").unwrap();
    assert_eq!(child.get::<i64>("child1").unwrap(), 12);
    assert_eq!(child.get::<String>("child2").unwrap(), "im a string");
    assert_eq!(child.class_type(), "");
    assert_eq!(child.node_path(), "root/item 2");
}

#[test]
fn parses_sub_factories_with_tags() {
    let root = Factory::from_str(
        "item: 22\nitem 2: !demo::info::green\n  child1: 12\n  child2: im a string\n",
    )
    .unwrap();

    let child = root.child("item 2").unwrap();
    assert_eq!(child.get::<i64>("child1").unwrap(), 12);
    assert_eq!(child.class_type(), "demo::info::green");
}

#[test]
fn fails_for_missing_children() {
    let root = Factory::from_str("item: 22\n").unwrap();

    assert!(matches!(root.child("item 3"), Err(Error::MissingKey { .. })));
}

#[test]
fn creates_each_child_factory_once() {
    let root = Factory::from_str("item 2:\n  child1: 12\n").unwrap();

    let first = root.child("item 2").unwrap();
    let second = root.child("item 2").unwrap();

    assert!(Rc::ptr_eq(&first, &second));
}

#[test]
fn reports_unused_children() {
    let document = "
item1: 22
item2: !demo::info::green
  child1: [12]
  child2: im a string
item3:
  child1: im a string
  child2: im a string
item4: 24
item5:
  child1:
    childchild1: 1
    childchild2: 1
  child2: im a string
item6:
  - child1: 1
    child2: 2
  - child1: 3
    child2: 4
item7:
  childchild1: 1
  childchild2: 2
";
    let root = Factory::from_str(document).unwrap();

    root.get::<i64>("item1").unwrap();
    root.child("item2")
        .unwrap()
        .child("child1")
        .unwrap()
        .get::<String>("")
        .unwrap();
    root.child("item5")
        .unwrap()
        .child("child1")
        .unwrap()
        .get::<i64>("childchild1")
        .unwrap();
    root.children("item6").unwrap()[0].get::<i64>("child2").unwrap();
    root.child("item7")
        .unwrap()
        .child("")
        .unwrap()
        .get::<i64>("childchild1")
        .unwrap();

    let unused = root.unused_values();
    assert_eq!(
        unused,
        vec![
            "root/item3",
            "root/item4",
            "root/item2/child2",
            "root/item5/child2",
            "root/item5/child1/childchild2",
            "root/item6/0/child1",
            "root/item6/1/child1",
            "root/item6/1/child2",
        ]
    );
}

#[test]
fn reads_lists_of_strings() {
    let root =
        Factory::from_str("item1: 22\nitem2:\n  - string 1\n  - string 2\n  - string 3\n").unwrap();

    assert_eq!(
        root.get::<Vec<String>>("item2").unwrap(),
        vec!["string 1", "string 2", "string 3"]
    );
    assert_eq!(root.get_opt::<Vec<String>>("missing").unwrap(), None);
    assert_eq!(root.get_or("missing", Vec::<String>::new()).unwrap(), Vec::<String>::new());
}

#[test]
fn reads_lists_of_numbers() {
    let root =
        Factory::from_str("item2:\n  - 1\n  - 2\n  - 3\nitem3: [4.4, 5, 6.6]\n").unwrap();

    assert_eq!(root.get::<Vec<i64>>("item2").unwrap(), vec![1, 2, 3]);
    assert_eq!(root.get::<Vec<f64>>("item3").unwrap(), vec![4.4, 5.0, 6.6]);
}

#[test]
fn reads_maps_of_strings() {
    let root =
        Factory::from_str("item2:\n  string1: 1\n  string2: 2\n  string3: 3\n").unwrap();

    let map = root.get::<BTreeMap<String, String>>("item2").unwrap();
    let mut expected = BTreeMap::new();
    expected.insert("string1".to_string(), "1".to_string());
    expected.insert("string2".to_string(), "2".to_string());
    expected.insert("string3".to_string(), "3".to_string());
    assert_eq!(map, expected);

    assert_eq!(root.get_opt::<BTreeMap<String, String>>("missing").unwrap(), None);
}

#[test]
fn reads_lists_of_factories() {
    let root = Factory::from_str(
        "item2:\n  - child1: 1\n    child2: 2\n  - !demo::info::green\n    child1: 3\n    child2: 4\n",
    )
    .unwrap();

    let list = root.children("item2").unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0].get::<i64>("child1").unwrap(), 1);
    assert_eq!(list[0].get::<i64>("child2").unwrap(), 2);
    assert_eq!(list[0].class_type(), "");
    assert_eq!(list[1].get::<i64>("child1").unwrap(), 3);
    assert_eq!(list[1].get::<i64>("child2").unwrap(), 4);
    assert_eq!(list[1].class_type(), "demo::info::green");
    assert_eq!(list[1].node_path(), "root/item2/1");
}

#[test]
fn fails_for_non_sequences() {
    let root = Factory::from_str("item: 22\n").unwrap();

    assert!(matches!(
        root.children("item"),
        Err(Error::NotASequence { .. })
    ));
    assert!(matches!(root.children("missing"), Err(Error::MissingKey { .. })));
}

#[test]
fn lists_mapping_keys() {
    let root = Factory::from_str("item1: 22\nitem2:\n  child1: 1\n  child2: 2\n").unwrap();

    assert_eq!(root.keys(), vec!["item1", "item2"]);
    assert_eq!(root.child("item2").unwrap().keys(), vec!["child1", "child2"]);
    assert!(root.child("item1").unwrap().keys().is_empty());
}

#[test]
fn joins_sequences_requested_as_strings() {
    let root = Factory::from_str("item2:\n  - 1.1\n  - 2\n  - 3.3\nitem3: [4.4, 5, 6.6]\n").unwrap();

    assert_eq!(root.get::<String>("item2").unwrap(), "1.1 2 3.3 ");
    assert_eq!(root.get::<String>("item3").unwrap(), "4.4 5 6.6 ");
}

#[test]
fn checks_contains_for_mappings() {
    let root = Factory::from_str("item:\n  item1: blue\n  item2:\nlist1:\n  - 22\n").unwrap();

    let child = root.child("item").unwrap();
    assert!(child.contains("item1"));
    assert!(!child.contains("item2")); // explicit null is not contained
    assert!(!child.contains("item3"));
    assert!(!root.children("list1").unwrap()[0].contains("item1"));
}

#[test]
fn supports_aliases_for_scalars() {
    let root = Factory::from_str("item1: &anchor1 22\nitem2: *anchor1\n").unwrap();

    assert_eq!(root.get::<i64>("item1").unwrap(), 22);
    assert_eq!(root.get::<i64>("item2").unwrap(), 22);
}

#[test]
fn supports_aliases_for_maps() {
    let root =
        Factory::from_str("item1: &anchor1\n  item10: 3\n  item11: 55\nitem2: *anchor1\n").unwrap();

    let factory = root.child("item2").unwrap();
    assert_eq!(factory.get::<i64>("item10").unwrap(), 3);
    assert_eq!(factory.get::<i64>("item11").unwrap(), 55);
}

#[test]
fn wraps_scalar_values_in_factories() {
    let root = Factory::from_str("item: !classType123 22.3\n").unwrap();

    let factory = root.child("item").unwrap();
    assert_eq!(factory.get::<String>("").unwrap(), "22.3");
    assert_eq!(factory.get::<f64>("").unwrap(), 22.3);
    assert_eq!(factory.class_type(), "classType123");
}

#[test]
fn scalar_factories_have_no_children() {
    let root = Factory::from_str("item: !classType123 22.3\n").unwrap();

    let factory = root.child("item").unwrap();
    assert_eq!(factory.get_opt::<String>("subItem1").unwrap(), None);
    assert_eq!(factory.get_opt::<i64>("subItem1").unwrap(), None);
    assert!(matches!(
        factory.get::<String>("subItem1"),
        Err(Error::MissingKey { .. })
    ));
}

#[test]
fn empty_name_returns_the_factory_itself() {
    let root = Factory::from_str(
        "item: !classType123\n  subItem1: 1.0\n  subItem2: 2.0\n",
    )
    .unwrap();

    let factory = root.child("item").unwrap();
    let same = factory.child("").unwrap();

    assert!(Rc::ptr_eq(&factory, &same));
    assert_eq!(same.get::<f64>("subItem1").unwrap(), 1.0);
    assert_eq!(same.get::<f64>("subItem2").unwrap(), 2.0);
    assert_eq!(same.class_type(), "classType123");
}

#[test]
fn empty_name_returns_the_elements_of_a_sequence_factory() {
    let root = Factory::from_str(
        "item: !classType123\n  - subItem1: 1.0\n  - !blueClassType\n    subItem2: 2.0\n",
    )
    .unwrap();

    let factory = root.child("item").unwrap();
    let list = factory.children("").unwrap();

    assert_eq!(list.len(), 2);
    assert_eq!(list[0].get::<f64>("subItem1").unwrap(), 1.0);
    assert_eq!(list[0].class_type(), "");
    assert_eq!(list[1].get::<f64>("subItem2").unwrap(), 2.0);
    assert_eq!(list[1].class_type(), "blueClassType");
}

#[test]
fn compares_factories_structurally() {
    let root = Factory::from_str(
        "item1:\n  subItem1: 1.0\nitem2:\n  subItem1: 1.0\nitem3: &anchor1\n  subItem1: 2.0\nitem4: *anchor1\n",
    )
    .unwrap();

    let factory1 = root.child("item1").unwrap();
    let factory2 = root.child("item2").unwrap();
    let factory3 = root.child("item3").unwrap();
    let factory4 = root.child("item4").unwrap();

    // structural comparison: equal content compares equal, aliases included
    assert!(factory1.same(&factory1));
    assert!(factory1.same(&factory2));
    assert!(!factory1.same(&factory3));
    assert!(factory3.same(&factory4));
    assert!(*factory3 == *factory4);
    assert!(*factory1 != *factory4);
}

#[test]
fn serializes_the_document_back_to_yaml() {
    let document = "item1: 22\nitem2:\n  item3: 3\n  item4: 5\n";
    let root = Factory::from_str(document).unwrap();

    let rendered = root.to_yaml().unwrap();
    let reparsed = Factory::from_str(&rendered).unwrap();

    assert_eq!(reparsed.get::<i64>("item1").unwrap(), 22);
    assert_eq!(reparsed.child("item2").unwrap().get::<i64>("item4").unwrap(), 5);
    assert!(rendered.contains("item1: 22"));
}
