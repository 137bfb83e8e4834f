use xmlbind::{Document, Element, Node, ParseOptions, XmlError, parse_xml};

fn parse(text: &str) -> Document {
    parse_xml(text, &ParseOptions::default()).unwrap()
}

fn first_child(elem: &Element) -> Element {
    Element::try_from(elem.child(0).unwrap()).unwrap()
}

#[test]
fn bound_namespace_is_the_declaration() {
    let doc = parse(r#"<root xmlns:p="urn:p"><p:a/></root>"#);
    let root = doc.root().unwrap();
    let decl = root.namespaces(true).remove(0);
    let a = first_child(&root);
    let ns = a.namespace().unwrap();
    assert!(ns.is_same(&decl));
    assert!(a.namespace().unwrap().is_same(&ns));
    assert_eq!(ns.prefix().as_deref(), Some("p"));
    assert_eq!(ns.href(), "urn:p");
    assert!(a.namespaces(true).is_empty());
    assert_eq!(a.namespaces(false), vec![decl]);
}

#[test]
fn removed_elements_take_their_declarations_along() {
    let doc = parse(r#"<root xmlns:p="urn:p"><p:a p:x="1"/></root>"#);
    let root = doc.root().unwrap();
    let a = first_child(&root);
    a.remove();
    let ns = a.namespace().unwrap();
    assert_eq!(ns.href(), "urn:p");
    assert_eq!(a.namespaces(true), vec![ns.clone()]);
    assert!(a.attr("p:x").unwrap().namespace().unwrap().is_same(&ns));
    assert_eq!(a.to_string(), r#"<p:a xmlns:p="urn:p" p:x="1"/>"#);
    // the declaration stays on the root
    assert_eq!(root.namespaces(true).len(), 1);
}

#[test]
fn set_namespace_reuses_declarations_in_scope() {
    let doc = parse(r#"<root xmlns:p="urn:p"><a/></root>"#);
    let root = doc.root().unwrap();
    let a = first_child(&root);
    let ns = a.set_namespace(Some("p"), "urn:p").unwrap();
    assert!(ns.is_same(&root.namespaces(true)[0]));
    assert!(a.namespaces(true).is_empty());
    assert_eq!(root.to_string(), r#"<root xmlns:p="urn:p"><p:a/></root>"#);

    // another URI for the same prefix needs a new declaration
    let other = a.set_namespace(Some("p"), "urn:other").unwrap();
    assert!(!other.is_same(&ns));
    assert_eq!(a.namespaces(true), vec![other]);
    assert_eq!(
        root.to_string(),
        r#"<root xmlns:p="urn:p"><p:a xmlns:p="urn:other"/></root>"#
    );
}

#[test]
fn shadowed_declarations_are_not_reused() {
    let doc = parse(r#"<root xmlns="urn:a"><mid xmlns="urn:b"><leaf/></mid></root>"#);
    let root = doc.root().unwrap();
    let mid = first_child(&root);
    let leaf = first_child(&mid);
    assert_eq!(leaf.namespace().unwrap().href(), "urn:b");
    let ns = leaf.set_namespace(None, "urn:a").unwrap();
    assert_eq!(leaf.namespaces(true), vec![ns.clone()]);
    assert!(!ns.is_same(&root.namespaces(true)[0]));
    let scope = leaf.namespaces(false);
    assert_eq!(scope.len(), 1);
    assert_eq!(scope[0].href(), "urn:a");
}

#[test]
fn define_namespace_is_idempotent() {
    let doc = Document::new();
    let root = doc.node("root", None).unwrap();
    let first = root.define_namespace(Some("p"), "urn:p").unwrap();
    let again = root.define_namespace(Some("p"), "urn:p").unwrap();
    assert!(first.is_same(&again));
    assert_eq!(root.namespaces(true).len(), 1);
    match root.define_namespace(Some("p"), "urn:q") {
        Err(XmlError::NamespaceConflict { prefix, href }) => {
            assert_eq!(prefix, "p");
            assert_eq!(href, "urn:p");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn set_namespace_decl_requires_scope() {
    let doc = parse(r#"<root><a xmlns:p="urn:p"/><b/></root>"#);
    let root = doc.root().unwrap();
    let a = first_child(&root);
    let b = Element::try_from(root.child(1).unwrap()).unwrap();
    let decl = a.namespaces(true).remove(0);
    assert!(matches!(
        b.set_namespace_decl(&decl),
        Err(XmlError::InvalidArgument(_))
    ));
    assert!(b.namespace().is_none());
    a.set_namespace_decl(&decl).unwrap();
    assert!(a.namespace().unwrap().is_same(&decl));

    let other = Document::new();
    let elem = other.node("x", None).unwrap();
    assert!(elem.set_namespace_decl(&decl).is_err());
}

#[test]
fn copies_reuse_declarations_of_the_target() {
    let src = parse(r#"<src xmlns:p="urn:p"><p:item/></src>"#);
    let dst = parse(r#"<dst xmlns:p="urn:p"/>"#);
    let item = first_child(&src.root().unwrap());
    let target = dst.root().unwrap();
    target.add_child(&item).unwrap();
    let copy = first_child(&target);
    assert!(copy.namespace().unwrap().is_same(&target.namespaces(true)[0]));
    assert_eq!(target.to_string(), r#"<dst xmlns:p="urn:p"><p:item/></dst>"#);

    let bare = parse("<bare/>");
    bare.root().unwrap().add_child(&item).unwrap();
    assert_eq!(
        bare.root().unwrap().to_string(),
        r#"<bare><p:item xmlns:p="urn:p"/></bare>"#
    );
}

#[test]
fn prefixed_attributes_follow_the_scope() {
    let doc = parse(r#"<root xmlns:p="urn:p"/>"#);
    let root = doc.root().unwrap();
    root.set_attr("p:x", "1").unwrap();
    root.set_attr("q:y", "2").unwrap();
    let x = root.attr("p:x").unwrap();
    assert_eq!(x.name(), "x");
    assert_eq!(x.namespace().unwrap().href(), "urn:p");
    let y = root.attr("q:y").unwrap();
    assert!(y.namespace().is_none());
    assert_eq!(y.name(), "q:y");
    assert_eq!(root.to_string(), r#"<root xmlns:p="urn:p" p:x="1" q:y="2"/>"#);
}

#[test]
fn the_xml_prefix_is_always_bound() {
    let doc = parse(r#"<root xml:lang="en"/>"#);
    let root = doc.root().unwrap();
    let lang = root.attr("xml:lang").unwrap();
    assert_eq!(
        lang.namespace().unwrap().href(),
        "http://www.w3.org/XML/1998/namespace"
    );
    assert!(root.namespaces(false).is_empty());
}

#[test]
fn remove_namespace_keeps_the_declarations() {
    let doc = parse(r#"<root xmlns:p="urn:p"><a xmlns:q="urn:q"/></root>"#);
    let root = doc.root().unwrap();
    let a = first_child(&root);
    a.set_namespace(Some("p"), "urn:p").unwrap();
    let declared = a.namespaces(true);
    assert!(a.remove_namespace().namespace().is_none());
    assert_eq!(a.namespaces(true), declared);
    assert_eq!(
        root.to_string(),
        r#"<root xmlns:p="urn:p"><a xmlns:q="urn:q"/></root>"#
    );

    // a binding declared on the element itself
    let q = a.set_namespace(Some("q"), "urn:q").unwrap();
    assert!(a.namespaces(true)[0].is_same(&q));
    a.remove_namespace();
    assert!(a.namespace().is_none());
    assert_eq!(a.namespaces(true), vec![q]);
    assert_eq!(a.name(), "a");
}

#[test]
fn moved_elements_drop_repeated_declarations() {
    let doc = parse(r#"<root xmlns:p="urn:p"><a><p:b/></a></root>"#);
    let root = doc.root().unwrap();
    let a = first_child(&root);
    let b = first_child(&a);
    b.remove();
    assert_eq!(b.to_string(), r#"<p:b xmlns:p="urn:p"/>"#);
    root.add_child(&b).unwrap();
    assert_eq!(root.to_string(), r#"<root xmlns:p="urn:p"><a/><p:b/></root>"#);
    assert!(b.namespace().unwrap().is_same(&root.namespaces(true)[0]));
    assert!(b.namespaces(true).is_empty());
}

#[test]
fn moved_elements_keep_declarations_still_referenced() {
    let doc = parse(r#"<root xmlns:p="urn:p"><a><p:b/></a></root>"#);
    let root = doc.root().unwrap();
    let a = first_child(&root);
    let b = first_child(&a);
    b.remove();
    let held = b.namespace().unwrap();
    a.add_next_sibling(&b).unwrap();
    assert!(b.namespace().unwrap().is_same(&held));
    assert_eq!(held.href(), "urn:p");
    assert_eq!(
        root.to_string(),
        r#"<root xmlns:p="urn:p"><a/><p:b xmlns:p="urn:p"/></root>"#
    );
}
