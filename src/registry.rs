//! Component D — the process-wide field registrar.
//!
//! Grounded in `epan/proto.c`'s `proto_register_protocol`/
//! `proto_register_field_array`/`proto_registrar_get_nth` family
//! (`examples/original_source/epan/proto.c`) and, for the Rust shape of a
//! "register then seal" global, in the teacher's hot-reloadable
//! `arc_swap::ArcSwap` usage (`tls/reloader.rs`) and its `AHashMap`-backed
//! lookup tables (`security/rate_limit/manager.rs`).
//!
//! The registrar is a type-state pair: [`Registry`] is open for
//! registration, [`SealedRegistry`] is the read-only view produced by
//! [`Registry::seal`]. Nothing in `SealedRegistry`'s public API can mutate
//! the catalog: it is written once at startup and read-only thereafter,
//! so no locking is required once sealed.

use crate::field_type::{DisplayBase, FieldType};
use ahash::AHashMap;
use arc_swap::ArcSwapOption;
use std::sync::Arc;

/// A single (value, label) pair in a flat `value_map`.
pub type ValueMap = Vec<(i64, String)>;

/// One field or protocol descriptor as held by the registrar.
///
/// `parent`, `id`, `same_name_prev`, `same_name_next` use `i32` with a `-1`
/// sentinel rather than `Option<usize>`, matching proto.c's raw-handle
/// chain walks directly.
#[derive(Debug, Clone)]
pub struct Hfi {
    pub name: String,
    pub abbrev: String,
    pub field_type: FieldType,
    pub display: DisplayBase,
    pub value_map: Option<ValueMap>,
    pub true_false: Option<(String, String)>,
    pub bitmask: u64,
    pub bitshift: u32,
    pub blurb: Option<String>,
    pub parent: i32,
    pub id: i32,
    pub same_name_prev: i32,
    pub same_name_next: i32,
}

impl Hfi {
    pub fn is_protocol(&self) -> bool {
        self.parent == -1
    }

    pub fn is_filterable(&self) -> bool {
        !self.name.is_empty() && !self.abbrev.is_empty()
    }
}

/// A protocol record. All three names are unique across the registry.
#[derive(Debug, Clone)]
pub struct Protocol {
    pub long_name: String,
    pub short_name: String,
    pub filter_name: String,
    pub proto_id: i32,
    pub fields: Vec<i32>,
    pub enabled: bool,
    pub can_disable: bool,
}

/// The caller-facing template for one field, before the registrar assigns
/// it a handle.
#[derive(Debug, Clone)]
pub struct HfiTemplate {
    pub name: String,
    pub abbrev: String,
    pub field_type: FieldType,
    pub display: DisplayBase,
    pub value_map: Option<ValueMap>,
    pub true_false: Option<(String, String)>,
    pub bitmask: u64,
    pub blurb: Option<String>,
}

impl HfiTemplate {
    pub fn new(name: &str, abbrev: &str, field_type: FieldType) -> Self {
        HfiTemplate {
            name: name.to_string(),
            abbrev: abbrev.to_string(),
            field_type,
            display: DisplayBase::None,
            value_map: None,
            true_false: None,
            bitmask: 0,
            blurb: None,
        }
    }

    pub fn with_display(mut self, display: DisplayBase) -> Self {
        self.display = display;
        self
    }

    pub fn with_bitmask(mut self, bitmask: u64) -> Self {
        self.bitmask = bitmask;
        self
    }

    pub fn with_value_map(mut self, map: ValueMap) -> Self {
        self.value_map = Some(map);
        self
    }

    pub fn with_true_false(mut self, t: &str, f: &str) -> Self {
        self.true_false = Some((t.to_string(), f.to_string()));
        self
    }

    pub fn with_blurb(mut self, blurb: &str) -> Self {
        self.blurb = Some(blurb.to_string());
        self
    }
}

/// One field registration: a template plus the out-slot its assigned handle
/// is written back into. The out-slot must start at the sentinel `-1`,
/// which doubles as the double-registration guard.
#[derive(Debug, Clone)]
pub struct FieldRegistration {
    pub hfi: HfiTemplate,
    pub out_hfindex: i32,
}

impl FieldRegistration {
    pub fn new(hfi: HfiTemplate) -> Self {
        FieldRegistration {
            hfi,
            out_hfindex: -1,
        }
    }
}

/// Sentinel handle returned once at `init()`: an empty-name, empty-abbrev,
/// `FieldType::None` HFI used internally by text-only tree nodes.
pub const TEXT_ONLY_HFINDEX: i32 = 0;

/// The open (registration-phase) registrar.
pub struct Registry {
    hfis: Vec<Hfi>,
    protocols: Vec<Protocol>,
    abbrev_index: AHashMap<String, i32>,
    next_subtree_type: i32,
}

impl Registry {
    /// Fresh registrar with only the sentinel text-only HFI registered,
    /// the very first step `init` takes.
    pub fn new() -> Self {
        let mut reg = Registry {
            hfis: Vec::new(),
            protocols: Vec::new(),
            abbrev_index: AHashMap::new(),
            next_subtree_type: 0,
        };
        let sentinel = Hfi {
            name: String::new(),
            abbrev: String::new(),
            field_type: FieldType::None,
            display: DisplayBase::None,
            value_map: None,
            true_false: None,
            bitmask: 0,
            bitshift: 0,
            blurb: None,
            parent: -1,
            id: TEXT_ONLY_HFINDEX,
            same_name_prev: -1,
            same_name_next: -1,
        };
        reg.hfis.push(sentinel);
        debug_assert_eq!(reg.hfis[TEXT_ONLY_HFINDEX as usize].id, TEXT_ONLY_HFINDEX);
        reg
    }

    /// Register a new protocol. Fails if any of the three names collide
    /// with an already-registered protocol.
    pub fn register_protocol(
        &mut self,
        long_name: &str,
        short_name: &str,
        filter_name: &str,
    ) -> Result<i32, String> {
        for p in &self.protocols {
            if p.long_name == long_name {
                return Err(format!("protocol long_name {long_name:?} already registered"));
            }
            if p.short_name == short_name {
                return Err(format!("protocol short_name {short_name:?} already registered"));
            }
            if p.filter_name == filter_name {
                return Err(format!(
                    "protocol filter_name {filter_name:?} already registered"
                ));
            }
        }

        let id = self.hfis.len() as i32;
        self.insert_hfi(Hfi {
            name: long_name.to_string(),
            abbrev: filter_name.to_string(),
            field_type: FieldType::Protocol,
            display: DisplayBase::None,
            value_map: None,
            true_false: None,
            bitmask: 0,
            bitshift: 0,
            blurb: None,
            parent: -1,
            id,
            same_name_prev: -1,
            same_name_next: -1,
        });

        self.protocols.push(Protocol {
            long_name: long_name.to_string(),
            short_name: short_name.to_string(),
            filter_name: filter_name.to_string(),
            proto_id: id,
            fields: Vec::new(),
            enabled: true,
            can_disable: true,
        });

        Ok(id)
    }

    /// Register a block of fields under `parent` (a protocol handle).
    /// Each registration's `out_hfindex` is written in place on success.
    ///
    /// # Panics
    /// Asserts — these are all programming errors, not runtime conditions —
    /// if any registration's `out_hfindex` is not the sentinel `-1`/`0`, if
    /// the type/display/value_map/bitmask combination is disallowed, or if
    /// `parent` does not name a registered protocol.
    pub fn register_field_array(&mut self, parent: i32, regs: &mut [FieldRegistration]) {
        assert!(
            self.protocols.iter().any(|p| p.proto_id == parent),
            "register_field_array: parent {parent} is not a registered protocol"
        );

        for reg in regs.iter_mut() {
            assert!(
                reg.out_hfindex == -1 || reg.out_hfindex == 0,
                "register_field_array: field {:?} already registered (out_hfindex = {})",
                reg.hfi.abbrev,
                reg.out_hfindex
            );
            self.validate_template(&reg.hfi);

            let bitshift = bitshift_of(reg.hfi.bitmask);
            let id = self.hfis.len() as i32;
            self.insert_hfi(Hfi {
                name: reg.hfi.name.clone(),
                abbrev: reg.hfi.abbrev.clone(),
                field_type: reg.hfi.field_type,
                display: reg.hfi.display,
                value_map: reg.hfi.value_map.clone(),
                true_false: reg.hfi.true_false.clone(),
                bitmask: reg.hfi.bitmask,
                bitshift,
                blurb: reg.hfi.blurb.clone(),
                parent,
                id,
                same_name_prev: -1,
                same_name_next: -1,
            });

            if let Some(p) = self.protocols.iter_mut().find(|p| p.proto_id == parent) {
                p.fields.push(id);
            }
            reg.out_hfindex = id;
        }
    }

    fn validate_template(&self, t: &HfiTemplate) {
        assert!(!t.name.is_empty(), "field name must be non-empty");
        assert!(!t.abbrev.is_empty(), "field abbrev must be non-empty");
        assert!(
            t.bitmask == 0 || t.field_type.allows_bitmask(),
            "bitmask set on non-integer/bool field {:?}",
            t.abbrev
        );
        assert!(
            t.value_map.is_none() && t.true_false.is_none() || t.field_type.allows_value_map(),
            "value_map/true_false set on field {:?} of type {:?} which does not allow it",
            t.abbrev,
            t.field_type
        );
        assert!(
            !t.field_type.requires_display_base() || t.display != DisplayBase::None,
            "integer field {:?} requires a display base",
            t.abbrev
        );
        assert!(
            t.field_type != FieldType::FrameNum || (t.bitmask == 0 && t.value_map.is_none()),
            "FrameNum field {:?} may not carry a bitmask or value_map",
            t.abbrev
        );
    }

    /// Insert `hfi` and splice it into its abbreviation's same-name chain.
    /// Only fields with a non-empty name *and* abbrev are indexed.
    fn insert_hfi(&mut self, mut hfi: Hfi) {
        if hfi.is_filterable() {
            if let Some(&old_head) = self.abbrev_index.get(&hfi.abbrev) {
                hfi.same_name_next = old_head;
                self.hfis[old_head as usize].same_name_prev = hfi.id;
            }
            self.abbrev_index.insert(hfi.abbrev.clone(), hfi.id);
        }
        self.hfis.push(hfi);
    }

    /// Assign `n` consecutive subtree-type indices. Must be called before
    /// [`Registry::seal`].
    pub fn register_subtree_types(&mut self, n: usize) -> Vec<i32> {
        let start = self.next_subtree_type;
        self.next_subtree_type += n as i32;
        (start..self.next_subtree_type).collect()
    }

    pub fn get_nth(&self, handle: i32) -> Option<&Hfi> {
        self.hfis.get(handle.max(0) as usize).filter(|h| h.id == handle)
    }

    pub fn get_by_name(&self, abbrev: &str) -> Option<&Hfi> {
        self.abbrev_index
            .get(abbrev)
            .and_then(|&id| self.get_nth(id))
    }

    pub fn protocols(&self) -> &[Protocol] {
        &self.protocols
    }

    pub fn fields_of(&self, proto_id: i32) -> impl Iterator<Item = &Hfi> {
        let field_ids: &[i32] = self
            .protocols
            .iter()
            .find(|p| p.proto_id == proto_id)
            .map(|p| p.fields.as_slice())
            .unwrap_or(&[]);
        field_ids.iter().filter_map(move |&id| self.get_nth(id))
    }

    pub fn is_enabled(&self, proto_id: i32) -> bool {
        self.protocols
            .iter()
            .find(|p| p.proto_id == proto_id)
            .is_some_and(|p| p.enabled)
    }

    pub fn can_disable(&self, proto_id: i32) -> bool {
        self.protocols
            .iter()
            .find(|p| p.proto_id == proto_id)
            .is_some_and(|p| p.can_disable)
    }

    pub fn set_decoding(&mut self, proto_id: i32, enabled: bool) {
        if let Some(p) = self.protocols.iter_mut().find(|p| p.proto_id == proto_id) {
            assert!(p.can_disable || enabled, "protocol {proto_id} cannot be disabled");
            p.enabled = enabled;
        }
    }

    pub fn set_cant_disable(&mut self, proto_id: i32) {
        if let Some(p) = self.protocols.iter_mut().find(|p| p.proto_id == proto_id) {
            p.can_disable = false;
        }
    }

    /// Consume the open registrar and produce the read-only, sharable
    /// view, sizing the subtree-expansion table from the final subtree
    /// count.
    pub fn seal(self) -> SealedRegistry {
        tracing::debug!(
            protocols = self.protocols.len(),
            fields = self.hfis.len(),
            subtree_types = self.next_subtree_type,
            "registrar sealed"
        );
        SealedRegistry {
            hfis: self.hfis,
            protocols: self.protocols,
            abbrev_index: self.abbrev_index,
            subtree_expansion: vec![false; self.next_subtree_type.max(0) as usize],
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

fn bitshift_of(bitmask: u64) -> u32 {
    if bitmask == 0 {
        0
    } else {
        bitmask.trailing_zeros()
    }
}

/// The read-only registrar produced by [`Registry::seal`]. Safe to share
/// across threads (`Sync`) since nothing can mutate it.
#[derive(Debug)]
pub struct SealedRegistry {
    hfis: Vec<Hfi>,
    protocols: Vec<Protocol>,
    abbrev_index: AHashMap<String, i32>,
    subtree_expansion: Vec<bool>,
}

impl SealedRegistry {
    pub fn get_nth(&self, handle: i32) -> Option<&Hfi> {
        self.hfis.get(handle.max(0) as usize).filter(|h| h.id == handle)
    }

    pub fn get_by_name(&self, abbrev: &str) -> Option<&Hfi> {
        self.abbrev_index
            .get(abbrev)
            .and_then(|&id| self.get_nth(id))
    }

    pub fn name_of(&self, handle: i32) -> Option<&str> {
        self.get_nth(handle).map(|h| h.name.as_str())
    }

    pub fn abbrev_of(&self, handle: i32) -> Option<&str> {
        self.get_nth(handle).map(|h| h.abbrev.as_str())
    }

    pub fn protocols(&self) -> &[Protocol] {
        &self.protocols
    }

    pub fn fields_of(&self, proto_id: i32) -> impl Iterator<Item = &Hfi> {
        let field_ids: &[i32] = self
            .protocols
            .iter()
            .find(|p| p.proto_id == proto_id)
            .map(|p| p.fields.as_slice())
            .unwrap_or(&[]);
        field_ids.iter().filter_map(move |&id| self.get_nth(id))
    }

    pub fn all_hfis(&self) -> &[Hfi] {
        &self.hfis
    }

    pub fn subtree_expansion(&self) -> &[bool] {
        &self.subtree_expansion
    }

    pub fn is_enabled(&self, proto_id: i32) -> bool {
        self.protocols
            .iter()
            .find(|p| p.proto_id == proto_id)
            .is_some_and(|p| p.enabled)
    }
}

/// The process-wide registrar handle. Populated exactly once by
/// [`init`]; reads are lock-free after that (an `ArcSwapOption` rather than
/// a `Mutex`, the same "seal once, read forever" shape the teacher uses for
/// its hot-reloadable TLS config in `tls/reloader.rs`, here used for a
/// one-shot transition instead of continual reloads).
static GLOBAL: ArcSwapOption<SealedRegistry> = ArcSwapOption::const_empty();

/// Register all protocols/fields via `register_all`, assign subtree types
/// via `register_subtree_types`/the handoff phase, then seal and publish
/// the global registrar. `plugin_dir`/plugin loading is not part of
/// this core; callers that
/// need plugin support load them before calling `register_all`.
///
/// # Panics
/// If called more than once per process — re-initializing a sealed,
/// process-wide registrar is a programming error, not a runtime condition.
pub fn init(register_all: impl FnOnce(&mut Registry)) -> Arc<SealedRegistry> {
    let mut registry = Registry::new();
    register_all(&mut registry);
    let sealed = Arc::new(registry.seal());
    let prev = GLOBAL.swap(Some(sealed.clone()));
    assert!(prev.is_none(), "dissection registrar already initialized");
    sealed
}

/// Fetch the process-wide registrar.
///
/// # Panics
/// If [`init`] has not run yet.
pub fn global() -> Arc<SealedRegistry> {
    GLOBAL
        .load_full()
        .expect("dissection registrar accessed before init()")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_flag_fields() -> (Registry, i32, i32, i32) {
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
        (reg, proto, regs[0].out_hfindex, regs[1].out_hfindex)
    }

    #[test]
    fn handle_stability_holds_for_every_registered_handle() {
        let (reg, proto, flags, ver) = two_flag_fields();
        for h in [0, proto, flags, ver] {
            assert_eq!(reg.get_nth(h).unwrap().id, h);
        }
    }

    #[test]
    fn bitshift_is_trailing_zeros_of_bitmask() {
        let (reg, _, flags, ver) = two_flag_fields();
        assert_eq!(reg.get_nth(flags).unwrap().bitshift, 0);
        assert_eq!(reg.get_nth(ver).unwrap().bitshift, 4);
    }

    #[test]
    fn same_abbrev_chain_head_and_reverse_order() {
        let mut reg = Registry::new();
        let proto = reg.register_protocol("Bar", "BAR", "bar").unwrap();
        let mut regs = vec![
            FieldRegistration::new(
                HfiTemplate::new("Lo", "bar.x", FieldType::Uint8)
                    .with_display(DisplayBase::Hex)
                    .with_bitmask(0x0F),
            ),
            FieldRegistration::new(
                HfiTemplate::new("Mid", "bar.x", FieldType::Uint8)
                    .with_display(DisplayBase::Hex)
                    .with_bitmask(0x30),
            ),
            FieldRegistration::new(
                HfiTemplate::new("Hi", "bar.x", FieldType::Uint8)
                    .with_display(DisplayBase::Hex)
                    .with_bitmask(0xC0),
            ),
        ];
        reg.register_field_array(proto, &mut regs);

        let head = reg.get_by_name("bar.x").unwrap();
        assert_eq!(head.same_name_prev, -1);
        assert_eq!(head.name, "Hi");

        let mut chain = vec![head.id];
        let mut cur = head.same_name_next;
        while cur != -1 {
            chain.push(cur);
            cur = reg.get_nth(cur).unwrap().same_name_next;
        }
        let names: Vec<&str> = chain.iter().map(|&id| reg.get_nth(id).unwrap().name.as_str()).collect();
        assert_eq!(names, vec!["Hi", "Mid", "Lo"]);
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn double_registration_of_same_out_slot_panics() {
        let mut reg = Registry::new();
        let proto = reg.register_protocol("Baz", "BAZ", "baz").unwrap();
        let mut regs = vec![FieldRegistration::new(HfiTemplate::new(
            "X",
            "baz.x",
            FieldType::Uint8,
        ).with_display(DisplayBase::Hex))];
        reg.register_field_array(proto, &mut regs);
        // Re-registering the same already-assigned slot must panic.
        reg.register_field_array(proto, &mut regs);
    }

    #[test]
    fn protocol_name_collision_is_rejected() {
        let mut reg = Registry::new();
        reg.register_protocol("Foo", "FOO", "foo").unwrap();
        assert!(reg.register_protocol("Foo", "FOO2", "foo2").is_err());
        assert!(reg.register_protocol("Foo2", "FOO", "foo3").is_err());
        assert!(reg.register_protocol("Foo3", "FOO3", "foo").is_err());
    }

    #[test]
    fn text_only_sentinel_is_handle_zero_and_unfilterable() {
        let reg = Registry::new();
        let sentinel = reg.get_nth(TEXT_ONLY_HFINDEX).unwrap();
        assert_eq!(sentinel.name, "");
        assert_eq!(sentinel.abbrev, "");
        assert_eq!(sentinel.field_type, FieldType::None);
        assert!(!sentinel.is_filterable());
    }
}
