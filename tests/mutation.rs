use xmlbind::{
    CharacterData, Document, Element, Node, ParseOptions, Parent, Text, XmlError, node_count,
    parse_xml,
};

fn parse(text: &str) -> Document {
    parse_xml(text, &ParseOptions::default()).unwrap()
}

fn names(elem: &Element) -> Vec<String> {
    elem.child_nodes()
        .iter()
        .filter_map(|n| n.as_element().map(Element::name))
        .collect()
}

#[test]
fn removed_child_leaves_the_sequence() {
    let doc = Document::new();
    let root = doc.node("root", None).unwrap();
    let child1 = root.node("child1", None).unwrap();
    root.node("child2", None).unwrap();
    child1.remove();
    root.add_child(&Element::new(&doc, "child3").unwrap()).unwrap();
    assert_eq!(names(&root), ["child2", "child3"]);
    assert_eq!(
        doc.to_string(),
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<root>\n  <child2/>\n  <child3/>\n</root>\n"
    );
}

#[test]
fn siblings_are_inserted_next_to_the_node() {
    let doc = parse("<root><b/></root>");
    let root = doc.root().unwrap();
    let b = root.child(0).unwrap();
    let c = b.add_next_sibling(&Element::new(&doc, "c").unwrap()).unwrap();
    let a = b.add_prev_sibling(&Element::new(&doc, "a").unwrap()).unwrap();
    assert_eq!(names(&root), ["a", "b", "c"]);
    assert!(root.child(0).unwrap().is_same_node(&a));
    assert!(root.child(2).unwrap().is_same_node(&c));
    assert!(c.prev_element().unwrap().next_element().unwrap().is_same_node(&c));
}

#[test]
fn moving_a_sibling_relinks_it() {
    let doc = parse("<root><a/><b/><c/></root>");
    let root = doc.root().unwrap();
    let a = root.child(0).unwrap();
    let c = root.child(2).unwrap();
    c.add_prev_sibling(&a).unwrap();
    assert_eq!(names(&root), ["b", "a", "c"]);
    assert!(root.child(1).unwrap().is_same_node(&a));
}

#[test]
fn sibling_operations_need_a_parent() {
    let doc = Document::new();
    let lone = Element::new(&doc, "lone").unwrap();
    let other = Element::new(&doc, "other").unwrap();
    assert!(matches!(lone.add_next_sibling(&other), Err(XmlError::NoParent)));
    assert!(matches!(lone.add_prev_sibling(&other), Err(XmlError::NoParent)));
    assert!(matches!(lone.replace(&other), Err(XmlError::NoParent)));
    assert!(matches!(lone.replace_text("x"), Err(XmlError::NoParent)));
    assert!(other.parent().is_none());
}

#[test]
fn a_node_cannot_contain_itself() {
    let doc = parse("<root><a><b/></a></root>");
    let root = doc.root().unwrap();
    let a = Element::try_from(root.child(0).unwrap()).unwrap();
    let b = Element::try_from(a.child(0).unwrap()).unwrap();
    assert!(matches!(b.add_child(&a), Err(XmlError::HierarchyRequest(_))));
    assert!(matches!(a.add_child(&a), Err(XmlError::HierarchyRequest(_))));
    assert!(matches!(b.add_next_sibling(&b), Err(XmlError::HierarchyRequest(_))));
    assert_eq!(root.to_string(), "<root><a><b/></a></root>");
}

#[test]
fn replace_detaches_the_old_node() {
    let doc = parse("<root><old><kept/></old><next/></root>");
    let root = doc.root().unwrap();
    let old = root.child(0).unwrap();
    let new = Element::with_text(&doc, "new", "hi").unwrap();
    old.replace(&new).unwrap();
    assert_eq!(root.to_string(), "<root><new>hi</new><next/></root>");
    assert!(old.parent().is_none());
    assert_eq!(old.to_string(), "<old><kept/></old>");
    let Some(Parent::Element(parent)) = new.parent() else {
        panic!("new is linked");
    };
    assert!(parent.is_same_node(&root));

    let next = root.child(1).unwrap();
    next.replace_text("tail").unwrap();
    assert_eq!(root.to_string(), "<root><new>hi</new>tail</root>");
    assert!(next.parent().is_none());
}

#[test]
fn replaced_nodes_without_values_are_released() {
    let doc = parse("<root><old><a/><b/></old></root>");
    let root = doc.root().unwrap();
    let count = node_count();
    root.child(0).unwrap().replace_text("x").unwrap();
    // the value of old was dropped with the temporary
    xmlbind::collect();
    assert_eq!(node_count(), count - 3 + 1);
}

#[test]
fn merged_text_keeps_its_own_value() {
    let doc = parse("<root>one</root>");
    let root = doc.root().unwrap();
    let text = doc.create_text_node("two");
    root.add_child(&text).unwrap();
    assert_eq!(root.child_nodes().len(), 1);
    assert_eq!(root.text(), "onetwo");
    assert_eq!(text.text(), "two");
    assert!(text.parent().is_none());

    let first = Text::try_from(root.child(0).unwrap()).unwrap();
    first.add_prev_sibling(&Text::new(&doc, "zero")).unwrap();
    assert_eq!(root.text(), "zeroonetwo");
    assert_eq!(root.child_nodes().len(), 1);
}

#[test]
fn cdata_is_never_merged() {
    let doc = parse("<root>a</root>");
    let root = doc.root().unwrap();
    root.add_cdata("b");
    root.add_child(&doc.create_cdata_section("c")).unwrap();
    assert_eq!(root.child_nodes().len(), 3);
    assert_eq!(root.to_string(), "<root>a<![CDATA[b]]><![CDATA[c]]></root>");
}

#[test]
fn set_text_leaves_stale_values_readable() {
    let doc = parse("<root><a>inner</a></root>");
    let root = doc.root().unwrap();
    let a = Element::try_from(root.child(0).unwrap()).unwrap();
    root.set_text("fresh");
    assert_eq!(root.to_string(), "<root>fresh</root>");
    assert_eq!(a.text(), "inner");
    assert!(a.parent().is_none());
    root.add_child(&a).unwrap();
    assert_eq!(root.to_string(), "<root>fresh<a>inner</a></root>");
}

#[test]
fn set_root_requires_an_empty_document() {
    let doc = Document::new();
    let root = Element::new(&doc, "root").unwrap();
    let set = doc.set_root(&root).unwrap();
    assert!(set.is_same_node(&root));
    assert!(matches!(doc.node("again", None), Err(XmlError::RootExists)));

    let other = Document::new();
    let copy = other.set_root(&root).unwrap();
    assert!(!copy.is_same_node(&root));
    assert_eq!(copy.doc(), other);
}

#[test]
fn documents_without_root() {
    let doc = Document::new();
    assert!(doc.root().is_none());
    assert!(matches!(doc.child(0), Err(XmlError::NoRoot)));
    assert!(matches!(doc.child_nodes(), Err(XmlError::NoRoot)));
}

#[test]
fn attributes_are_updated_in_place() {
    let doc = parse("<root a='1'/>");
    let root = doc.root().unwrap();
    let a = root.attr("a").unwrap();
    root.set_attr("a", "2").unwrap();
    assert_eq!(a.value(), "2");
    root.set_attrs(&[("b", "3"), ("c", "4")]).unwrap();
    let names = root.attrs().iter().map(|a| a.name()).collect::<Vec<_>>();
    assert_eq!(names, ["a", "b", "c"]);
    a.set_value("x<y");
    assert_eq!(root.to_string(), "<root a=\"x&lt;y\" b=\"3\" c=\"4\"/>");
    assert!(matches!(root.set_attr("", "v"), Err(XmlError::InvalidArgument(_))));
}

#[test]
fn invalid_names_are_rejected() {
    let doc = Document::new();
    assert!(matches!(Element::new(&doc, ""), Err(XmlError::InvalidArgument(_))));
    assert!(Element::new(&doc, "1abc").is_err());
    let elem = Element::new(&doc, "ok").unwrap();
    assert!(elem.set_name("no space").is_err());
    assert_eq!(elem.name(), "ok");
}

#[test]
fn comments_and_pis_are_children_too() {
    let doc = parse("<root/>");
    let root = doc.root().unwrap();
    root.add_child(&doc.create_comment("note")).unwrap();
    let pi = doc.create_processing_instruction("app", Some("go")).unwrap();
    root.add_child(&pi).unwrap();
    assert_eq!(root.to_string(), "<root><!--note--><?app go?></root>");
    assert_eq!(pi.name(), "app");
    assert_eq!(pi.path(), "/root/processing-instruction('app')");
}

#[test]
fn the_root_element_takes_no_element_or_text_siblings() {
    let doc = Document::new();
    let root = doc.node("root", None).unwrap();
    let second = Element::new(&doc, "second").unwrap();
    assert!(matches!(
        root.add_next_sibling(&second),
        Err(XmlError::HierarchyRequest(_))
    ));
    assert!(matches!(
        root.add_prev_sibling(&Text::new(&doc, "text")),
        Err(XmlError::HierarchyRequest(_))
    ));
    assert!(second.parent().is_none());

    root.add_prev_sibling(&doc.create_comment("note")).unwrap();
    let pi = doc.create_processing_instruction("app", None).unwrap();
    root.add_next_sibling(&pi).unwrap();
    assert!(matches!(
        pi.replace(&second),
        Err(XmlError::HierarchyRequest(_))
    ));
    assert_eq!(
        doc.to_string(),
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!--note-->\n<root/>\n<?app?>\n"
    );
}

#[test]
fn the_root_element_is_replaced_by_an_element_only() {
    let doc = parse("<root/>");
    let root = doc.root().unwrap();
    assert!(matches!(
        root.replace_text("text"),
        Err(XmlError::HierarchyRequest(_))
    ));
    assert!(matches!(
        root.replace(&Text::new(&doc, "text")),
        Err(XmlError::HierarchyRequest(_))
    ));
    let other = Element::new(&doc, "other").unwrap();
    root.replace(&other).unwrap();
    assert!(root.parent().is_none());
    assert!(doc.root().unwrap().is_same_node(&other));
}
