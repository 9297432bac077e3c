//! The reverse-engineering loop: toggle detection over candidate driver
//! pins, accumulated into a [`Netlist`] (§4.8).

use crate::candidates::candidate_drivers;
use crate::config::CompiledConfig;
use crate::error::{Error, Result};
use crate::netlist::{NetBuilder, Netlist};
use crate::progress::{CancelToken, Progress};
use bsr::{Controller, OtherDevicesPolicy, PinRef};
use std::collections::HashSet;
use tap::Adapter;

/// Drives `driver` through one 0->1->0 (or 1->0->1, when `start` is
/// `true`) sequence and returns every other pin observed toggling in
/// lockstep, in either polarity (§4.8 step 5).
fn run_one_sequence<A: Adapter>(
    controller: &mut Controller<'_, A>,
    driver: &PinRef,
    start: bool,
) -> Result<HashSet<PinRef>> {
    controller.set_all_pins_hiz()?;
    controller.drive_pin(driver.clone(), start)?;
    let baseline = controller.capture_all()?;
    controller.drive_pin(driver.clone(), !start)?;
    let high = controller.capture_all()?;
    controller.drive_pin(driver.clone(), start)?;
    let low2 = controller.capture_all()?;

    let mut out = HashSet::new();
    for (pin, &b) in &baseline {
        if pin == driver {
            continue;
        }
        let (Some(&h), Some(&l2)) = (high.get(pin), low2.get(pin)) else {
            continue;
        };
        if (!b && h && !l2) || (b && !h && l2) {
            out.insert(pin.clone());
        }
    }
    Ok(out)
}

fn intersect_repeats(acc: Option<HashSet<PinRef>>, next: HashSet<PinRef>) -> HashSet<PinRef> {
    match acc {
        None => next,
        Some(acc) => acc.intersection(&next).cloned().collect(),
    }
}

/// Runs the falling-first sequence (and, when configured, the
/// rising-first sequence too) `RepeatsPerPin` times each, intersecting
/// results within and across sequences (§4.8, §6.4 `RequireSymmetricToggle`).
fn detect_togglers<A: Adapter>(
    controller: &mut Controller<'_, A>,
    driver: &PinRef,
    config: &CompiledConfig,
) -> Result<Vec<PinRef>> {
    let mut falling = None;
    for _ in 0..config.repeats_per_pin {
        let found = run_one_sequence(controller, driver, false)?;
        falling = Some(intersect_repeats(falling, found));
    }
    let mut result = falling.unwrap_or_default();

    if config.require_symmetric_toggle {
        let mut rising = None;
        for _ in 0..config.repeats_per_pin {
            let found = run_one_sequence(controller, driver, true)?;
            rising = Some(intersect_repeats(rising, found));
        }
        let rising = rising.unwrap_or_default();
        result = result.intersection(&rising).cloned().collect();
    }

    let mut togglers: Vec<PinRef> = result.into_iter().collect();
    togglers.sort();
    Ok(togglers)
}

/// Scans every candidate driver pin for connected listeners and returns
/// the finalized board-level [`Netlist`] (§4.8). `progress` receives one
/// `Init`, one `Scanning` per candidate, and one final `Finalizing`
/// message; `cancel` is polled before each candidate.
pub fn discover_netlist<A: Adapter>(
    chain: &mut chain::Chain<A>,
    config: &CompiledConfig,
    cancel: &CancelToken,
    mut progress: impl FnMut(Progress),
) -> Result<Netlist> {
    clilog::info!(REVENG_I_INIT, "starting reverse-engineering run");
    progress(Progress::Init);

    let candidates = candidate_drivers(chain.devices(), config);
    let total = candidates.len();

    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }
    // the controller always rebuilds other devices from their HiZ
    // baseline between drivers, regardless of the caller-facing
    // OtherDevicesPolicy semantics exposed by `DrivePin` itself (§9).
    let mut controller = Controller::new(chain, OtherDevicesPolicy::ForceHiZOthers)?;
    controller.enter_extest()?;

    let mut builder = NetBuilder::new();
    let mut nets_found = 0usize;

    for (index, driver) in candidates.iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        progress(Progress::Scanning {
            driver: driver.clone(),
            index,
            total,
            nets_found,
        });

        let togglers = match detect_togglers(&mut controller, driver, config) {
            Ok(t) => t,
            Err(Error::Bsr(bsr::Error::UnsupportedPin { .. })) => {
                clilog::warn!(
                    REVENG_W_UNSUPPORTED_PIN,
                    "skipping driver {:?}: no output boundary cell",
                    driver
                );
                continue;
            }
            Err(e) => return Err(e),
        };
        if !togglers.is_empty() {
            nets_found += 1;
        }
        for toggler in &togglers {
            builder.connect(driver, toggler);
        }
    }

    clilog::info!(REVENG_I_FINALIZING, "finalizing {} candidate(s)", total);
    progress(Progress::Finalizing { total });
    Ok(builder.finalize())
}
