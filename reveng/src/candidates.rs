//! Driver-pin candidate selection for the reverse-engineering loop
//! (§4.8 "Candidate selection").

use crate::config::CompiledConfig;
use bsdl::attrs::CellFunction;
use bsr::PinRef;
use chain::Device;

const JTAG_SUBSTRINGS: [&str; 6] = ["TCK", "TMS", "TDI", "TDO", "TRST", "JTAG"];
const POWER_SUBSTRINGS: [&str; 6] = ["VCC", "VDD", "VSS", "GND", "VBAT", "VREF"];

fn contains_any(name: &str, needles: &[&str]) -> bool {
    let upper = name.to_ascii_uppercase();
    needles.iter().any(|n| upper.contains(n))
}

/// Every output-capable pin eligible to be driven, in a stable (chain,
/// cell-number) order. Filtering per §4.8: `OnlyDevices`, `OnlyPinPattern`,
/// then the JTAG/power exclusions.
pub fn candidate_drivers(devices: &[Device], config: &CompiledConfig) -> Vec<PinRef> {
    let mut out = Vec::new();
    for (chain_index, device) in devices.iter().enumerate() {
        let Some(info) = device.info.as_ref() else {
            continue;
        };
        if !config.only_devices.is_empty()
            && !config.only_devices.iter().any(|d| d == &info.info.name)
        {
            continue;
        }
        for (_cell, pin_name) in bsr::layout::pins_with_function(info, CellFunction::is_output) {
            if let Some(re) = &config.only_pin_pattern {
                if !re.is_match(pin_name) {
                    continue;
                }
            }
            if config.skip_known_jtag_pins && contains_any(pin_name, &JTAG_SUBSTRINGS) {
                continue;
            }
            if config.skip_power_pins && contains_any(pin_name, &POWER_SUBSTRINGS) {
                continue;
            }
            out.push(PinRef::new(chain_index, info.info.name.clone(), pin_name));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jtag_and_power_names_are_recognized() {
        assert!(contains_any("nTRST", &JTAG_SUBSTRINGS));
        assert!(contains_any("TCK_IN", &JTAG_SUBSTRINGS));
        assert!(contains_any("VDDIO", &POWER_SUBSTRINGS));
        assert!(!contains_any("PA5", &JTAG_SUBSTRINGS));
        assert!(!contains_any("PA5", &POWER_SUBSTRINGS));
    }
}
