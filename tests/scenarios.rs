//! End-to-end dissection scenarios exercising registry, builder, tree, and
//! formatting together.

use dissect_core::builder;
use dissect_core::buffer::{Endianness, TvbBuf};
use dissect_core::field_type::{DisplayBase, FieldType};
use dissect_core::format::{construct_dfilter_string, fill_label};
use dissect_core::registry::{FieldRegistration, HfiTemplate, Registry};
use dissect_core::tree::{NodeId, Tree};
use dissect_core::value::Value;

#[test]
fn scenario_1_masked_flags_and_version() {
    let mut reg = Registry::new();
    let proto = reg.register_protocol("Foo", "FOO", "foo").unwrap();
    let mut regs = vec![
        FieldRegistration::new(
            HfiTemplate::new("Flags", "foo.flags", FieldType::Uint8)
                .with_display(DisplayBase::Hex)
                .with_bitmask(0x0F),
        ),
        FieldRegistration::new(
            HfiTemplate::new("Version", "foo.ver", FieldType::Uint8)
                .with_display(DisplayBase::Hex)
                .with_bitmask(0xF0),
        ),
    ];
    reg.register_field_array(proto, &mut regs);
    let sealed = reg.seal();
    let (flags, ver) = (regs[0].out_hfindex, regs[1].out_hfindex);

    let tvb = TvbBuf::new(vec![0x5A], 1);
    let mut tree = Tree::new();
    let flags_node = builder::add_uint(&sealed, &mut tree, &tvb, NodeId::ROOT, flags, 0, Endianness::Big).unwrap();
    let ver_node = builder::add_uint(&sealed, &mut tree, &tvb, NodeId::ROOT, ver, 0, Endianness::Big).unwrap();

    assert_eq!(tree.field_info(flags_node).unwrap().value, Value::Uint(0x0A));
    assert_eq!(tree.field_info(ver_node).unwrap().value, Value::Uint(0x05));

    let ver_hfi = sealed.get_nth(ver).unwrap();
    let ver_label = fill_label(ver_hfi, &tree.field_info(ver_node).unwrap().value);
    assert!(ver_label.starts_with("0101 .... = "));
}

#[test]
fn scenario_2_uint16_decimal_label_and_dfilter() {
    let mut reg = Registry::new();
    let proto = reg.register_protocol("Foo", "FOO", "foo").unwrap();
    let mut regs = vec![FieldRegistration::new(
        HfiTemplate::new("Id", "foo.id", FieldType::Uint16).with_display(DisplayBase::Dec),
    )];
    reg.register_field_array(proto, &mut regs);
    let sealed = reg.seal();
    let id = regs[0].out_hfindex;

    let tvb = TvbBuf::new(vec![0x01, 0x2C], 1);
    let mut tree = Tree::new();
    let node = builder::add_uint(&sealed, &mut tree, &tvb, NodeId::ROOT, id, 0, Endianness::Big).unwrap();

    let hfi = sealed.get_nth(id).unwrap();
    let fi = tree.field_info(node).unwrap();
    assert_eq!(fi.value, Value::Uint(300));
    assert_eq!(fill_label(hfi, &fi.value), "Id: 300");
    assert_eq!(construct_dfilter_string(hfi, fi), "foo.id == 300");
}

#[test]
fn scenario_3_ipv4_label_and_dfilter() {
    let mut reg = Registry::new();
    let proto = reg.register_protocol("Foo", "FOO", "foo").unwrap();
    let mut regs = vec![FieldRegistration::new(HfiTemplate::new(
        "Addr",
        "foo.addr",
        FieldType::IPv4,
    ))];
    reg.register_field_array(proto, &mut regs);
    let sealed = reg.seal();
    let addr_handle = regs[0].out_hfindex;

    let tvb = TvbBuf::new(vec![0xC0, 0xA8, 0x00, 0x01], 1);
    let mut tree = Tree::new();
    let node = builder::add_ipv4(&sealed, &mut tree, &tvb, NodeId::ROOT, addr_handle).unwrap();

    let hfi = sealed.get_nth(addr_handle).unwrap();
    let fi = tree.field_info(node).unwrap();
    assert_eq!(fill_label(hfi, &fi.value), "Addr: 192.168.0.1 (192.168.0.1)");
    assert_eq!(construct_dfilter_string(hfi, fi), "foo.addr == 192.168.0.1");
}

#[test]
fn scenario_4_stringz_resolves_to_first_nul() {
    let mut reg = Registry::new();
    let proto = reg.register_protocol("Foo", "FOO", "foo").unwrap();
    let mut regs = vec![FieldRegistration::new(HfiTemplate::new(
        "Text",
        "foo.text",
        FieldType::StringZ,
    ))];
    reg.register_field_array(proto, &mut regs);
    let sealed = reg.seal();
    let text_handle = regs[0].out_hfindex;

    let tvb = TvbBuf::new(b"hi\0rest".to_vec(), 1);
    let mut tree = Tree::new();
    let node = builder::add_stringz(&sealed, &mut tree, &tvb, NodeId::ROOT, text_handle, 0, -1).unwrap();

    let hfi = sealed.get_nth(text_handle).unwrap();
    let fi = tree.field_info(node).unwrap();
    assert_eq!(fi.length, 3);
    assert_eq!(fi.value, Value::String("hi".to_string()));
    assert_eq!(fill_label(hfi, &fi.value), "Text: hi");
}

#[test]
fn scenario_5_uint64_little_endian_stores_reversed_bytes() {
    let mut reg = Registry::new();
    let proto = reg.register_protocol("Foo", "FOO", "foo").unwrap();
    let mut regs = vec![FieldRegistration::new(
        HfiTemplate::new("U64", "foo.u64", FieldType::Uint64).with_display(DisplayBase::Hex),
    )];
    reg.register_field_array(proto, &mut regs);
    let sealed = reg.seal();
    let u64_handle = regs[0].out_hfindex;

    let tvb = TvbBuf::new(vec![1, 2, 3, 4, 5, 6, 7, 8], 1);
    let mut tree = Tree::new();
    let node = builder::add_uint64(&sealed, &mut tree, &tvb, NodeId::ROOT, u64_handle, 0, Endianness::Little).unwrap();

    let hfi = sealed.get_nth(u64_handle).unwrap();
    let fi = tree.field_info(node).unwrap();
    assert_eq!(fi.value, Value::Uint(0x0807060504030201));
    assert_eq!(fill_label(hfi, &fi.value), "U64: 0807060504030201");
}

#[test]
fn scenario_6_interesting_field_index_tracks_primed_handle_in_order() {
    let mut reg = Registry::new();
    let proto = reg.register_protocol("Foo", "FOO", "foo").unwrap();
    let mut regs = vec![FieldRegistration::new(
        HfiTemplate::new("Id", "foo.id", FieldType::Uint8).with_display(DisplayBase::Dec),
    )];
    reg.register_field_array(proto, &mut regs);
    let sealed = reg.seal();
    let id = regs[0].out_hfindex;

    let tvb = TvbBuf::new(vec![1, 2, 3], 1);
    let mut tree = Tree::new();
    tree.prime(id);
    for i in 0..3usize {
        builder::add_uint(&sealed, &mut tree, &tvb, NodeId::ROOT, id, i, Endianness::Big).unwrap();
    }

    let hits = tree.interesting(id).unwrap();
    let values: Vec<_> = hits.iter().map(|fi| fi.value.clone()).collect();
    assert_eq!(values, vec![Value::Uint(1), Value::Uint(2), Value::Uint(3)]);
    assert!(tree.interesting(id + 1000).is_none());
}
