//! Demo CLI: registers a small set of example protocols, then optionally
//! dumps the registry and dissects a hex-encoded buffer — a thin analogue
//! of `tshark -G protocols`/`-G fields`.

use clap::Parser;
use dissect_core::field_type::{DisplayBase, FieldType};
use dissect_core::registry::{FieldRegistration, HfiTemplate, Registry};
use dissect_core::{builder, buffer, config, dump, format, logging, tree, Tvb};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "dissect-core-dump", about = "Inspect the demo protocol registry")]
struct Args {
    /// Path to a TOML config file (log_level, dump_protocols, dump_fields).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Hex bytes to dissect with the demo "toy" protocol, e.g. 5aff00.
    #[arg(long)]
    hex: Option<String>,
}

fn register_demo_protocols(registry: &mut Registry) {
    let proto = registry
        .register_protocol("Toy Protocol", "TOY", "toy")
        .expect("demo protocol registration cannot collide");

    let mut fields = vec![
        FieldRegistration::new(
            HfiTemplate::new("Flags", "toy.flags", FieldType::Uint8)
                .with_display(DisplayBase::Hex)
                .with_bitmask(0x0F),
        ),
        FieldRegistration::new(
            HfiTemplate::new("Version", "toy.version", FieldType::Uint8)
                .with_display(DisplayBase::Hex)
                .with_bitmask(0xF0),
        ),
        FieldRegistration::new(HfiTemplate::new("Payload", "toy.payload", FieldType::Bytes)),
    ];
    registry.register_field_array(proto, &mut fields);
}

fn parse_hex(s: &str) -> Vec<u8> {
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).expect("--hex must be an even-length hex string"))
        .collect()
}

fn main() {
    let args = Args::parse();

    let cfg = args
        .config
        .as_deref()
        .map(|p| config::DemoConfig::from_file(p).expect("failed to read --config"))
        .unwrap_or_default();
    logging::init(&cfg.log_level);

    let registry = dissect_core::init(register_demo_protocols, |_| {});

    if cfg.dump_protocols {
        print!("{}", dump::dump_protocols(&registry));
    }
    if cfg.dump_fields {
        print!("{}", dump::dump_fields(&registry));
    }

    if let Some(hex) = args.hex.as_deref() {
        let bytes = parse_hex(hex);
        let tvb = buffer::TvbBuf::new(bytes, 1);
        let mut t = tree::Tree::new();

        let flags = registry.get_by_name("toy.flags").unwrap().id;
        let version = registry.get_by_name("toy.version").unwrap().id;
        let payload = registry.get_by_name("toy.payload").unwrap().id;

        let flags_node =
            builder::add_uint(&registry, &mut t, &tvb, tree::NodeId::ROOT, flags, 0, buffer::Endianness::Big)
                .expect("dissection of demo buffer failed");
        let version_node =
            builder::add_uint(&registry, &mut t, &tvb, tree::NodeId::ROOT, version, 0, buffer::Endianness::Big)
                .expect("dissection of demo buffer failed");
        if tvb.length() > 1 {
            builder::add_bytes(&registry, &mut t, &tvb, tree::NodeId::ROOT, payload, 1, -1)
                .expect("dissection of demo buffer failed");
        }

        for node in [flags_node, version_node] {
            let fi = t.field_info(node).unwrap();
            println!("{}", format::fill_label_for(&registry, fi));
        }
    }
}
