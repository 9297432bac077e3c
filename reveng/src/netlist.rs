//! Finalized connectivity result of a reverse-engineering run (§3, §4.8).

use crate::disjoint_set::DisjointSet;
use bsr::PinRef;
use std::collections::HashMap;

/// One published net: two or more pins observed to toggle together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Net {
    pub id: usize,
    pub pins: Vec<PinRef>,
}

/// The finalized result of a reverse-engineering run (§4.8
/// "Finalization"). Only classes with two or more members are published.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Netlist {
    pub nets: Vec<Net>,
}

impl Netlist {
    pub fn net_count(&self) -> usize {
        self.nets.len()
    }

    pub fn multi_pin_net_count(&self) -> usize {
        self.nets.iter().filter(|n| n.pins.len() >= 2).count()
    }
}

/// Accumulates toggle-detection edges into a union-find, then compacts
/// them into a [`Netlist`] (§3 "Netlist").
#[derive(Default)]
pub struct NetBuilder {
    set: DisjointSet,
    index: HashMap<PinRef, usize>,
    pins: Vec<PinRef>,
}

impl NetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn id_of(&mut self, pin: &PinRef) -> usize {
        if let Some(&id) = self.index.get(pin) {
            return id;
        }
        let id = self.set.make_set();
        self.index.insert(pin.clone(), id);
        self.pins.push(pin.clone());
        id
    }

    /// Records that `a` and `b` were observed toggling together.
    pub fn connect(&mut self, a: &PinRef, b: &PinRef) {
        let ia = self.id_of(a);
        let ib = self.id_of(b);
        self.set.union(ia, ib);
    }

    /// Compacts the union-find into nets, sorted by pin within each net
    /// and then by their first (lowest) pin, and numbers them 0..N-1
    /// (§4.8 "Finalization").
    pub fn finalize(mut self) -> Netlist {
        let mut classes: HashMap<usize, Vec<PinRef>> = HashMap::new();
        for pin in &self.pins {
            let root = self.set.find(self.index[pin]);
            classes.entry(root).or_default().push(pin.clone());
        }
        let mut groups: Vec<Vec<PinRef>> = classes
            .into_values()
            .filter(|members| members.len() >= 2)
            .collect();
        for members in &mut groups {
            members.sort();
        }
        groups.sort_by(|a, b| a[0].cmp(&b[0]));
        let nets = groups
            .into_iter()
            .enumerate()
            .map(|(id, pins)| Net { id, pins })
            .collect();
        Netlist { nets }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pin(chain_index: usize, name: &str) -> PinRef {
        PinRef::new(chain_index, "DEV", name)
    }

    #[test]
    fn singletons_are_not_published() {
        let mut builder = NetBuilder::new();
        builder.id_of(&pin(0, "PA0"));
        let netlist = builder.finalize();
        assert_eq!(netlist.net_count(), 0);
    }

    #[test]
    fn connected_pins_form_one_sorted_net() {
        let mut builder = NetBuilder::new();
        builder.connect(&pin(2, "PA5"), &pin(0, "PA5"));
        builder.connect(&pin(2, "PA5"), &pin(1, "PA5"));
        let netlist = builder.finalize();
        assert_eq!(netlist.net_count(), 1);
        let net = &netlist.nets[0];
        assert_eq!(net.id, 0);
        assert_eq!(
            net.pins,
            vec![pin(0, "PA5"), pin(1, "PA5"), pin(2, "PA5")]
        );
    }

    #[test]
    fn disjoint_nets_are_numbered_and_no_pin_repeats() {
        let mut builder = NetBuilder::new();
        builder.connect(&pin(0, "A"), &pin(1, "A"));
        builder.connect(&pin(0, "B"), &pin(1, "B"));
        let netlist = builder.finalize();
        assert_eq!(netlist.net_count(), 2);
        let mut seen = std::collections::HashSet::new();
        for net in &netlist.nets {
            for p in &net.pins {
                assert!(seen.insert(p.clone()), "pin {p:?} appeared twice");
            }
        }
    }
}
