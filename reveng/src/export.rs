//! Pure serialization of a finalized [`Netlist`] into the two export
//! formats consumed by downstream tooling (§4.9, §6.3).

use crate::netlist::Netlist;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::fmt::Write as _;

const GENERATED_BY: &str = "jtag boundary-scan reverse engineering";

/// Builds the JSON document of §6.3, verbatim field names and all.
pub fn to_json(netlist: &Netlist) -> Value {
    let nets: Vec<Value> = netlist
        .nets
        .iter()
        .map(|net| {
            let pins: Vec<Value> = net
                .pins
                .iter()
                .map(|p| {
                    json!({
                        "chain_index": p.chain_index,
                        "device_name": p.device_name.as_str(),
                        "pin_name": p.pin_name.as_str(),
                    })
                })
                .collect();
            json!({ "id": net.id, "pins": pins })
        })
        .collect();

    json!({
        "version": "1.0",
        "net_count": netlist.net_count(),
        "multi_pin_nets": netlist.multi_pin_net_count(),
        "nets": nets,
        "generated_by": GENERATED_BY,
    })
}

fn component_ref(chain_index: usize, device_name: &str) -> String {
    format!("{device_name}_{chain_index}")
}

/// Builds the KiCad S-expression netlist of §6.3. Component refs are
/// deduplicated across nets; only nets with two or more pins appear
/// (already guaranteed by [`Netlist::finalize`], kept here defensively).
pub fn to_kicad(netlist: &Netlist) -> String {
    let mut components = BTreeSet::new();
    for net in &netlist.nets {
        for pin in &net.pins {
            components.insert(component_ref(pin.chain_index, pin.device_name.as_str()));
        }
    }

    let mut out = String::new();
    writeln!(out, "(export (version D)").unwrap();
    writeln!(out, "  (design)").unwrap();
    writeln!(out, "  (components").unwrap();
    for comp in &components {
        writeln!(out, "    (comp (ref {comp}))").unwrap();
    }
    writeln!(out, "  )").unwrap();
    writeln!(out, "  (nets").unwrap();
    for net in netlist.nets.iter().filter(|n| n.pins.len() >= 2) {
        writeln!(
            out,
            "    (net (code {}) (name Net-{})",
            net.id, net.id
        )
        .unwrap();
        for pin in &net.pins {
            let comp = component_ref(pin.chain_index, pin.device_name.as_str());
            writeln!(
                out,
                "      (node (ref {}) (pin {}))",
                comp, pin.pin_name
            )
            .unwrap();
        }
        writeln!(out, "    )").unwrap();
    }
    writeln!(out, "  )").unwrap();
    writeln!(out, ")").unwrap();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlist::NetBuilder;
    use bsr::PinRef;

    fn star_net() -> Netlist {
        let mut builder = NetBuilder::new();
        builder.connect(
            &PinRef::new(0, "DEV", "PA5"),
            &PinRef::new(1, "DEV", "PA5"),
        );
        builder.connect(
            &PinRef::new(0, "DEV", "PA5"),
            &PinRef::new(2, "DEV", "PA5"),
        );
        builder.finalize()
    }

    #[test]
    fn json_schema_matches_the_contract() {
        let value = to_json(&star_net());
        assert_eq!(value["version"], "1.0");
        assert_eq!(value["net_count"], 1);
        assert_eq!(value["multi_pin_nets"], 1);
        assert_eq!(value["generated_by"], GENERATED_BY);
        assert_eq!(value["nets"][0]["id"], 0);
        assert_eq!(value["nets"][0]["pins"].as_array().unwrap().len(), 3);
        assert_eq!(value["nets"][0]["pins"][0]["chain_index"], 0);
    }

    #[test]
    fn kicad_output_lists_deduplicated_components_and_nodes() {
        let text = to_kicad(&star_net());
        assert_eq!(text.matches("(comp (ref DEV_0))").count(), 1);
        assert_eq!(text.matches("(comp (ref DEV_1))").count(), 1);
        assert_eq!(text.matches("(comp (ref DEV_2))").count(), 1);
        assert!(text.contains("(net (code 0) (name Net-0)"));
        assert_eq!(text.matches("(node (ref DEV_0) (pin PA5))").count(), 1);
    }

    #[test]
    fn empty_netlist_still_serializes() {
        let netlist = Netlist::default();
        let value = to_json(&netlist);
        assert_eq!(value["net_count"], 0);
        let text = to_kicad(&netlist);
        assert!(text.contains("(components"));
        assert!(text.contains("(nets"));
    }
}
