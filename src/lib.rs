#![forbid(unsafe_code)]

pub mod buffer;
pub mod builder;
pub mod config;
pub mod dump;
pub mod error;
pub mod field_type;
pub mod format;
pub mod logging;
pub mod registry;
pub mod tree;
pub mod value;

pub use buffer::{Endianness, Tvb, TvbBuf};
pub use error::{DissectError, Result};
pub use field_type::{DisplayBase, FieldType};
pub use registry::{
    FieldRegistration, Hfi, HfiTemplate, Protocol, Registry, SealedRegistry, TEXT_ONLY_HFINDEX,
};
pub use tree::{FieldInfo, NodeId, Tree};
pub use value::{TimeValue, Value};

use std::sync::Arc;

/// Two-phase process-wide startup: protocols/fields are registered first,
/// then handoffs run with the now-fully-populated (but still open)
/// registrar visible, mirroring `epan`'s `register_all_protocols` /
/// `register_all_protocol_handoffs` split (`examples/original_source/
/// epan/proto.c`). Handoffs are where a dissector would normally bind to a
/// subdissector table; this core has no subdissector-table concept, so the
/// second callback exists purely for registration-order parity with that
/// split.
///
/// # Panics
/// If called more than once per process (see [`registry::init`]).
pub fn init(
    register_all_protocols: impl FnOnce(&mut Registry),
    register_all_protocol_handoffs: impl FnOnce(&Registry),
) -> Arc<SealedRegistry> {
    registry::init(|reg| {
        register_all_protocols(reg);
        register_all_protocol_handoffs(reg);
    })
}

pub use registry::global;
