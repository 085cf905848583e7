//! Component G — label and filter-string formatting.
//!
//! Grounded in `epan/proto.c`'s `proto_item_fill_label` and
//! `proto_construct_match_selected_string` (`examples/original_source/
//! epan/proto.c`): the same two jobs, split the same way — one function
//! renders a human string for display, the other renders a filter
//! expression for "apply as filter".

use crate::registry::{Hfi, SealedRegistry};
use crate::tree::FieldInfo;
use crate::value::Value;

/// Maximum length of a rendered label (`ITEM_LABEL_LENGTH` in proto.c).
pub const ITEM_LABEL_LENGTH: usize = 240;

/// Truncate `text` to [`ITEM_LABEL_LENGTH`] bytes, on a char boundary.
pub fn truncate_label(mut text: String) -> String {
    if text.len() <= ITEM_LABEL_LENGTH {
        return text;
    }
    let mut cut = ITEM_LABEL_LENGTH;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    text.truncate(cut);
    text
}

fn lookup_value_map(hfi: &Hfi, key: i64) -> Option<&str> {
    hfi.value_map
        .as_ref()?
        .iter()
        .find(|(v, _)| *v == key)
        .map(|(_, label)| label.as_str())
}

fn render_integer_value(hfi: &Hfi, value: i64) -> String {
    if let Some(label) = lookup_value_map(hfi, value) {
        return format!("{} ({})", label, value);
    }
    use crate::field_type::DisplayBase;
    match hfi.display {
        DisplayBase::Dec | DisplayBase::None => format!("{value}"),
        DisplayBase::Hex => format!("0x{:x}", value),
        DisplayBase::Oct => format!("0{:o}", value),
    }
}

fn format_integer(hfi: &Hfi, value: i64) -> String {
    format!("{}: {}", hfi.name, render_integer_value(hfi, value))
}

/// `FT_Uint64`/`FT_Int64` Hex display renders as bare zero-padded hex
/// digits spanning the full 8 bytes, with no `0x` prefix — distinct from
/// the narrower integer types, and never combined with a bitmask diagram
/// (64-bit fields carry no bitmask handling).
fn format_wide_integer(hfi: &Hfi, value: i64) -> String {
    use crate::field_type::DisplayBase;
    if let Some(label) = lookup_value_map(hfi, value) {
        return format!("{}: {} ({})", hfi.name, label, value);
    }
    let rendered = match hfi.display {
        DisplayBase::Hex => format!("{:016x}", value),
        DisplayBase::Dec | DisplayBase::None => format!("{value}"),
        DisplayBase::Oct => format!("0{:o}", value),
    };
    format!("{}: {}", hfi.name, rendered)
}

/// Render the nibble-grouped bit diagram wireshark shows for masked
/// fields: one character per bit of the field's declared width, `.` where
/// the mask excludes the bit, `0`/`1` where it's included, nibbles
/// separated by a space, e.g. `"0101 .... = Version: 5"`.
fn format_bitmask_diagram(hfi: &Hfi, shifted_value: i64) -> Option<String> {
    let bits = hfi.field_type.bit_width()?;
    if hfi.bitmask == 0 {
        return None;
    }
    let masked_raw = (shifted_value as u64) << hfi.bitshift;
    let mut diagram = String::new();
    for i in (0..bits).rev() {
        let included = (hfi.bitmask >> i) & 1 == 1;
        diagram.push(if included {
            if (masked_raw >> i) & 1 == 1 {
                '1'
            } else {
                '0'
            }
        } else {
            '.'
        });
        if i % 4 == 0 && i != 0 {
            diagram.push(' ');
        }
    }
    Some(format!(
        "{} = {}: {}",
        diagram,
        hfi.name,
        render_integer_value(hfi, shifted_value)
    ))
}

fn format_bool(hfi: &Hfi, value: bool) -> String {
    let word = match (&hfi.true_false, value) {
        (Some((t, _)), true) => t.clone(),
        (Some((_, f)), false) => f.clone(),
        (None, true) => "True".to_string(),
        (None, false) => "False".to_string(),
    };
    format!("{}: {}", hfi.name, word)
}

/// `proto_item_fill_label`: render a field's human-readable label, bounded
/// to [`ITEM_LABEL_LENGTH`]. Every address-family type renders a
/// parenthesized second field alongside its primary value, matching
/// proto.c's `"%s: %s (%s)"` address formats: IPv4 resolves a hostname
/// through `resolve_ipv4` when given one (`"Name: host (1.2.3.4)"`) and
/// falls back to the literal otherwise; IPv6/Ether/IpxNet have no resolver
/// here, so both fields are the same literal.
pub fn fill_label_resolved(
    hfi: &Hfi,
    value: &Value,
    resolve_ipv4: Option<&dyn Fn(&std::net::Ipv4Addr) -> Option<String>>,
) -> String {
    use crate::field_type::FieldType;

    let label = match (hfi.field_type, value) {
        (FieldType::None, _) => hfi.name.clone(),
        (FieldType::Protocol, _) => hfi.name.clone(),
        (FieldType::Bool, Value::Bool(b)) => format_bool(hfi, *b),
        (FieldType::Uint64, Value::Uint(v)) => format_wide_integer(hfi, *v as i64),
        (FieldType::Int64, Value::Int(v)) => format_wide_integer(hfi, *v),
        (_, Value::Uint(v)) => {
            format_bitmask_diagram(hfi, *v as i64).unwrap_or_else(|| format_integer(hfi, *v as i64))
        }
        (_, Value::Int(v)) => format_bitmask_diagram(hfi, *v).unwrap_or_else(|| format_integer(hfi, *v)),
        (_, Value::Float(f)) => format!("{}: {}", hfi.name, f),
        (_, Value::Double(d)) => format!("{}: {}", hfi.name, d),
        (_, Value::IPv4(addr)) => {
            let resolved = resolve_ipv4.and_then(|f| f(addr)).unwrap_or_else(|| addr.to_string());
            format!("{}: {} ({})", hfi.name, resolved, addr)
        }
        (_, Value::IPv6(addr)) => format!("{}: {} ({})", hfi.name, addr, addr),
        (_, Value::Ether(mac)) => {
            let mac_str = format!(
                "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
                mac[0], mac[1], mac[2], mac[3], mac[4], mac[5]
            );
            format!("{}: {} ({})", hfi.name, mac_str, mac_str)
        }
        (_, Value::IpxNet(n)) => format!("{}: 0x{:08X} (0x{:08X})", hfi.name, n, n),
        (_, Value::String(s)) => format!("{}: {}", hfi.name, s),
        (_, Value::Bytes(b)) => format!("{}: {}", hfi.name, hex_dump(b)),
        (_, Value::AbsTime(t)) => format!("{}: {:?}", hfi.name, t),
        (_, Value::RelTime(d)) => format!("{}: {:?}", hfi.name, d),
        (_, Value::Protocol { .. }) => hfi.name.clone(),
        (_, Value::None) => hfi.name.clone(),
    };
    truncate_label(label)
}

pub fn fill_label(hfi: &Hfi, value: &Value) -> String {
    fill_label_resolved(hfi, value, None)
}

fn hex_dump(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(":")
}

/// `proto_construct_match_selected_string`: the dfilter expression to match
/// a field by its current value. Fields with no meaningful textual value
/// (`None`/`Protocol`) fall back to a raw-bytes match restricted to their
/// buffer identity.
pub fn construct_dfilter_string(hfi: &Hfi, fi: &FieldInfo) -> String {
    match &fi.value {
        Value::None | Value::Protocol { .. } => {
            format!("{} @ tvb#{} [{}:{}]", hfi.abbrev, fi.ds_tvb, fi.start, fi.length)
        }
        Value::Bool(b) => format!("{} == {}", hfi.abbrev, b),
        Value::Uint(v) => format!("{} == {}", hfi.abbrev, v),
        Value::Int(v) => format!("{} == {}", hfi.abbrev, v),
        Value::Float(f) => format!("{} == {}", hfi.abbrev, f),
        Value::Double(d) => format!("{} == {}", hfi.abbrev, d),
        Value::IPv4(addr) => format!("{} == {}", hfi.abbrev, addr),
        Value::IPv6(addr) => format!("{} == {}", hfi.abbrev, addr),
        Value::IpxNet(n) => format!("{} == 0x{:08x}", hfi.abbrev, n),
        Value::Ether(mac) => format!(
            "{} == {:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            hfi.abbrev, mac[0], mac[1], mac[2], mac[3], mac[4], mac[5]
        ),
        Value::String(s) => format!("{} == \"{}\"", hfi.abbrev, s),
        Value::Bytes(b) => format!("{} == {}", hfi.abbrev, hex_dump(b)),
        Value::AbsTime(_) | Value::RelTime(_) => {
            format!("{} @ tvb#{} [{}:{}]", hfi.abbrev, fi.ds_tvb, fi.start, fi.length)
        }
    }
}

/// Convenience wrapper resolving `fi.hfi` through `registry` before
/// rendering. Panics if the handle is unknown — dissectors only ever hold
/// handles the registrar itself produced.
pub fn fill_label_for(registry: &SealedRegistry, fi: &FieldInfo) -> String {
    let hfi = registry
        .get_nth(fi.hfi)
        .expect("fill_label_for: unknown field handle");
    fill_label(hfi, &fi.value)
}

pub fn dfilter_string_for(registry: &SealedRegistry, fi: &FieldInfo) -> String {
    let hfi = registry
        .get_nth(fi.hfi)
        .expect("dfilter_string_for: unknown field handle");
    construct_dfilter_string(hfi, fi)
}
