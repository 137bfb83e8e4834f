use xmlbind::{Document, Element, Node, NodeRef, ParseOptions, Parent, collect, parse_xml};

fn parse(text: &str) -> Document {
    parse_xml(text, &ParseOptions::default()).unwrap()
}

fn element(node: NodeRef) -> Element {
    Element::try_from(node).unwrap()
}

#[test]
fn repeated_lookups_return_the_same_proxy() {
    let doc = parse("<root><a/><b/></root>");
    let root = doc.root().unwrap();
    let first = root.child(0).unwrap();
    let second = root.child(0).unwrap();
    assert!(first.is_same_node(&second));
    assert_eq!(first, second);

    let via_sibling = root.child(1).unwrap().prev_sibling().unwrap();
    assert!(via_sibling.is_same_node(&first));
    let Some(Parent::Element(parent)) = first.parent() else {
        panic!("a has an element parent");
    };
    assert!(parent.is_same_node(&root));
    assert_eq!(root.parent(), Some(Parent::Document(doc.clone())));
}

#[test]
fn attributes_keep_their_identity() {
    let doc = parse("<root a='1' b='2'/>");
    let root = doc.root().unwrap();
    let a = root.attr("a").unwrap();
    assert!(root.attrs()[0].is_same_node(&a));
    let b = a.next_sibling().unwrap();
    assert_eq!(b.as_attribute().unwrap().name(), "b");
    assert!(a.node().unwrap().is_same_node(&root));
}

#[test]
fn moving_within_a_document_keeps_the_proxy() {
    let doc = parse("<root><a><leaf/></a><b/></root>");
    let root = doc.root().unwrap();
    let a = element(root.child(0).unwrap());
    let leaf = a.child(0).unwrap();
    let b = element(root.child(1).unwrap());

    b.add_child(&a).unwrap();
    assert!(b.child(0).unwrap().is_same_node(&a));
    assert!(a.child(0).unwrap().is_same_node(&leaf));
    assert_eq!(root.to_string(), "<root><b><a><leaf/></a></b></root>");

    a.remove();
    assert!(a.parent().is_none());
    root.add_child(&a).unwrap();
    assert!(root.child(1).unwrap().is_same_node(&a));
    assert_eq!(a.path(), "/root/a");
}

#[test]
fn inserting_into_another_document_copies() {
    let src = parse("<src><item id='1'>text</item></src>");
    let dst = parse("<dst/>");
    let item = element(src.root().unwrap().child(0).unwrap());
    let target = dst.root().unwrap();

    target.add_child(&item).unwrap();
    let copy = element(target.child(0).unwrap());
    assert!(!copy.is_same_node(&item));
    assert_eq!(copy.to_string(), item.to_string());
    assert_eq!(copy.doc(), dst);
    assert_eq!(item.doc(), src);

    // the original stays at its place
    let Some(Parent::Element(parent)) = item.parent() else {
        panic!("item is still linked");
    };
    assert_eq!(parent.name(), "src");
    assert_eq!(src.root().unwrap().to_string(), "<src><item id=\"1\">text</item></src>");

    // the copy is independent
    copy.set_attr("id", "2").unwrap();
    assert_eq!(item.attr("id").unwrap().value(), "1");
}

#[test]
fn a_finalized_proxy_is_replaced_by_a_fresh_one() {
    let doc = parse("<root><a/></root>");
    let root = doc.root().unwrap();
    drop(root.child(0).unwrap());
    collect();
    let before = doc.live_proxies();
    let a = root.child(0).unwrap();
    assert_eq!(doc.live_proxies(), before + 1);
    assert_eq!(element(a).name(), "a");
}

#[test]
fn clones_are_detached_copies() {
    let doc = parse("<root><a x='1'><b/></a></root>");
    let a = element(doc.root().unwrap().child(0).unwrap());
    let copy = a.clone_node();
    assert!(!copy.is_same_node(&a));
    assert!(copy.parent().is_none());
    assert_eq!(copy.doc(), doc);
    assert_eq!(copy.to_string(), "<a x=\"1\"><b/></a>");
}
