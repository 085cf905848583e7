//! Tab-delimited protocol/field dumps, for `-G protocols`/`-G fields`
//! parity with `epan/proto.c`'s `proto_registrar_dump_protocols`/
//! `proto_registrar_dump_fields` (`examples/original_source/epan/proto.c`).

use crate::registry::SealedRegistry;
use std::fmt::Write as _;

/// One line per registered protocol: `name\tshort_name\tfilter_name\tid`.
pub fn dump_protocols(registry: &SealedRegistry) -> String {
    let mut out = String::new();
    for p in registry.protocols() {
        let _ = writeln!(
            out,
            "{}\t{}\t{}\t{}",
            p.long_name, p.short_name, p.filter_name, p.proto_id
        );
    }
    out
}

/// One line per protocol (`P\t{name}\t{abbrev}`) and one line per field
/// that is a same-abbreviation chain head (`F\t{name}\t{abbrev}\t{type}\t
/// {parentAbbrev}\t{blurb}`), skipping the empty-name/abbrev sentinel and
/// any non-head link in a chain (`proto_registrar_dump_fields` only emits
/// chain heads).
pub fn dump_fields(registry: &SealedRegistry) -> String {
    let mut out = String::new();
    for hfi in registry.all_hfis() {
        if hfi.name.is_empty() || hfi.abbrev.is_empty() {
            continue;
        }
        if hfi.is_protocol() {
            let _ = writeln!(out, "P\t{}\t{}", hfi.name, hfi.abbrev);
            continue;
        }
        if hfi.same_name_prev != -1 {
            continue;
        }
        let parent_abbrev = registry.abbrev_of(hfi.parent).unwrap_or("");
        let blurb = hfi.blurb.as_deref().unwrap_or("");
        let _ = writeln!(
            out,
            "F\t{}\t{}\t{:?}\t{}\t{}",
            hfi.name, hfi.abbrev, hfi.field_type, parent_abbrev, blurb
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field_type::{DisplayBase, FieldType};
    use crate::registry::{FieldRegistration, HfiTemplate, Registry};

    #[test]
    fn dump_protocols_lists_registered_protocols() {
        let mut reg = Registry::new();
        reg.register_protocol("Foo", "FOO", "foo").unwrap();
        let sealed = reg.seal();
        assert_eq!(dump_protocols(&sealed), "Foo\tFOO\tfoo\t1\n");
    }

    #[test]
    fn dump_fields_skips_non_head_chain_links_and_the_sentinel() {
        let mut reg = Registry::new();
        let proto = reg.register_protocol("Foo", "FOO", "foo").unwrap();
        let mut regs = vec![
            FieldRegistration::new(
                HfiTemplate::new("Lo", "foo.x", FieldType::Uint8)
                    .with_display(DisplayBase::Hex)
                    .with_bitmask(0x0F),
            ),
            FieldRegistration::new(
                HfiTemplate::new("Hi", "foo.x", FieldType::Uint8)
                    .with_display(DisplayBase::Hex)
                    .with_bitmask(0xF0),
            ),
        ];
        reg.register_field_array(proto, &mut regs);
        let sealed = reg.seal();
        let lines: Vec<&str> = dump_fields(&sealed).lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "P\tFoo\tfoo");
        assert!(lines[1].starts_with("F\tHi\tfoo.x\t"));
        assert!(lines[1].contains("foo"));
        assert!(!lines[1].contains("Lo"));
    }
}
