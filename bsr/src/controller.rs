//! The boundary-scan runtime controller: EXTEST programming, pin drive,
//! HiZ, and input capture (§4.7).

use crate::error::{Error, Result};
use crate::layout::{self, DrLayout};
use crate::pin::{PinMode, PinRef, PinState};
use bsdl::attrs::CellFunction;
use chain::Chain;
use compact_str::CompactString;
use std::collections::HashMap;
use tap::{Adapter, State};

/// Resolves which devices' last-programmed segments are preserved when
/// only one device is targeted by [`Controller::drive_pin`] -- the
/// source's two call sites disagree on this; this spec exposes the
/// choice explicitly (§9 "Open questions").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtherDevicesPolicy {
    /// Other devices keep the vector last shifted for them.
    PreserveOthers,
    /// Other devices are rebuilt from their HiZ baseline every call.
    ForceHiZOthers,
}

impl Default for OtherDevicesPolicy {
    fn default() -> Self {
        OtherDevicesPolicy::PreserveOthers
    }
}

enum Domain {
    Ir,
    Dr,
}

/// Drives a chain-wide boundary-scan register through EXTEST, HiZ, pin
/// drive and capture operations. Not safe for concurrent use; one
/// controller owns one [`Chain`] (§5).
pub struct Controller<'a, A: Adapter> {
    chain: &'a mut Chain<A>,
    layout: DrLayout,
    policy: OtherDevicesPolicy,
    extest_entered: bool,
    current_dr: Option<Vec<bool>>,
    pin_states: HashMap<PinRef, PinState>,
}

impl<'a, A: Adapter> Controller<'a, A> {
    pub fn new(chain: &'a mut Chain<A>, policy: OtherDevicesPolicy) -> Result<Self> {
        for device in chain.devices() {
            if device.info.is_none() {
                return Err(Error::MissingBsdl {
                    position: device.position,
                });
            }
        }
        let layout = DrLayout::build(chain.devices());
        Ok(Controller {
            chain,
            layout,
            policy,
            extest_entered: false,
            current_dr: None,
            pin_states: HashMap::new(),
        })
    }

    pub fn layout(&self) -> &DrLayout {
        &self.layout
    }

    /// The chain-wide DR vector shifted by the last [`Controller::set_all_pins_hiz`]
    /// or [`Controller::drive_pin`] call, if any.
    pub fn current_dr(&self) -> Option<&[bool]> {
        self.current_dr.as_deref()
    }

    fn shift_through(&mut self, domain: Domain, bits: &[bool]) -> Result<Vec<bool>> {
        if bits.is_empty() {
            return Ok(Vec::new());
        }
        let target_shift = match domain {
            Domain::Ir => State::ShiftIr,
            Domain::Dr => State::ShiftDr,
        };
        self.chain.transport_mut().goto_state(target_shift)?;
        let tms: Vec<bool> = (0..bits.len()).map(|i| i + 1 == bits.len()).collect();
        let tdo = match domain {
            Domain::Ir => self.chain.transport_mut().shift_ir(&tms, bits)?,
            Domain::Dr => self.chain.transport_mut().shift_dr(&tms, bits)?,
        };
        self.chain.transport_mut().goto_state(State::RunTestIdle)?;
        Ok(tdo)
    }

    /// Programs every device's IR with its EXTEST opcode, device at the
    /// TDI end shifted in last (§4.7).
    pub fn enter_extest(&mut self) -> Result<()> {
        let devices = self.chain.devices();
        let mut vector = Vec::new();
        for device_index in (0..devices.len()).rev() {
            let info = devices[device_index].info.as_ref().expect("checked in new()");
            let instr = info
                .instruction("EXTEST")
                .ok_or_else(|| Error::MissingInstruction {
                    device: info.info.name.clone(),
                    instruction: "EXTEST",
                })?;
            vector.extend(instr.primary_opcode().bytes().map(|b| b == b'1'));
        }
        self.shift_through(Domain::Ir, &vector)?;
        self.extest_entered = true;
        self.current_dr = None;
        Ok(())
    }

    fn require_extest(&self) -> Result<()> {
        if !self.extest_entered {
            return Err(Error::ExtestNotEntered);
        }
        Ok(())
    }

    /// Shifts a global HiZ vector: every device's safe baseline with
    /// every controllable output disabled (§4.7).
    pub fn set_all_pins_hiz(&mut self) -> Result<()> {
        self.require_extest()?;
        let devices = self.chain.devices();
        let mut vector = Vec::with_capacity(self.layout.total_bits);
        for device_index in (0..devices.len()).rev() {
            let info = devices[device_index].info.as_ref().expect("checked in new()");
            vector.extend(layout::hiz_vector(info));
        }
        self.shift_through(Domain::Dr, &vector)?;
        self.current_dr = Some(vector);
        for state in self.pin_states.values_mut() {
            state.mode = PinMode::HiZ;
            state.driven_val = None;
        }
        Ok(())
    }

    /// Drives `pin` to `value`: the target device's safe baseline with
    /// that pin's output (and control, if any) cell overridden; other
    /// devices follow [`OtherDevicesPolicy`] (§4.7, §9).
    pub fn drive_pin(&mut self, pin: PinRef, value: bool) -> Result<()> {
        self.require_extest()?;
        let devices = self.chain.devices();
        let target = devices
            .get(pin.chain_index)
            .ok_or_else(|| Error::UnsupportedPin {
                pin: pin.pin_name.clone(),
            })?;
        let target_info = target.info.as_ref().expect("checked in new()");
        let target_cell = layout::find_output_cell(target_info, &pin.pin_name)
            .ok_or_else(|| Error::UnsupportedPin {
                pin: pin.pin_name.clone(),
            })?;
        if target_cell.number >= target_info.info.boundary_length {
            return Err(Error::CorruptBsdl(format!(
                "cell {} out of range for device {}",
                target_cell.number, target_info.info.name
            )));
        }
        let target_cell_number = target_cell.number;
        let target_segment = layout::drive_vector(target_info, target_cell_number, value);
        let target_device_name = target_info.info.name.clone();
        let target_output_pins: Vec<(usize, CompactString)> =
            layout::pins_with_function(target_info, CellFunction::is_output)
                .map(|(cell, resolved)| (cell.number, CompactString::from(resolved)))
                .collect();

        let mut vector = Vec::with_capacity(self.layout.total_bits);
        for device_index in (0..devices.len()).rev() {
            if device_index == pin.chain_index {
                vector.extend(target_segment.iter().copied());
                continue;
            }
            let info = devices[device_index].info.as_ref().expect("checked in new()");
            let segment = match (&self.policy, &self.current_dr) {
                (OtherDevicesPolicy::PreserveOthers, Some(dr)) => {
                    self.layout.device_segment(device_index, dr).to_vec()
                }
                _ => layout::hiz_vector(info),
            };
            vector.extend(segment);
        }

        self.shift_through(Domain::Dr, &vector)?;
        self.current_dr = Some(vector);

        // Bookkeeping per §4.7: the target pin becomes Output, every
        // other output-capable pin on the same device reverts to HiZ,
        // pins on other devices are untouched.
        for (cell_number, resolved) in target_output_pins {
            let pr = PinRef::new(pin.chain_index, target_device_name.clone(), resolved);
            if cell_number == target_cell_number {
                self.pin_states.insert(
                    pr.clone(),
                    PinState {
                        pin: pr,
                        mode: PinMode::Output,
                        driven_val: Some(value),
                        last_read: None,
                    },
                );
            } else {
                self.pin_states
                    .entry(pr.clone())
                    .or_insert_with(|| PinState::hiz(pr))
                    .mode = PinMode::HiZ;
            }
        }
        Ok(())
    }

    /// Re-shifts the cached DR unchanged and decodes every INPUT cell
    /// with a real port into a [`PinRef`] -> captured-bit map (§4.7).
    pub fn capture_all(&mut self) -> Result<HashMap<PinRef, bool>> {
        self.require_extest()?;
        let dr = self.current_dr.clone().ok_or(Error::NoCurrentDr)?;
        let tdo = self.shift_through(Domain::Dr, &dr)?;

        let devices = self.chain.devices();
        let mut out = HashMap::new();
        for (bit_index, cell_ref) in self.layout.entries.iter().enumerate() {
            let info = devices[cell_ref.device_index]
                .info
                .as_ref()
                .expect("checked in new()");
            let cell = &info.boundary_cells[cell_ref.cell_number];
            if cell.function != CellFunction::Input {
                continue;
            }
            let Some(port) = &cell.port else { continue };
            let pin_name = CompactString::from(info.resolve_pin(port));
            let pin_ref = PinRef::new(cell_ref.device_index, info.info.name.clone(), pin_name);
            let value = tdo[bit_index];
            self.pin_states
                .entry(pin_ref.clone())
                .or_insert_with(|| PinState::hiz(pin_ref.clone()))
                .last_read = Some(value);
            out.insert(pin_ref, value);
        }
        Ok(out)
    }

    pub fn pin_state(&self, pin: &PinRef) -> Option<&PinState> {
        self.pin_states.get(pin)
    }
}
