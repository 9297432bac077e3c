//! Maintains a locally-tracked TAP state via the FSM and dispatches IR/DR
//! shift primitives to the [`Adapter`] (§4.4).

use crate::adapter::Adapter;
use crate::bits;
use crate::error::{Error, Result};
use crate::fsm::{self, Fsm, State};

pub struct Transport<A: Adapter> {
    adapter: A,
    fsm: Fsm,
}

impl<A: Adapter> Transport<A> {
    pub fn new(adapter: A) -> Self {
        Transport {
            adapter,
            fsm: Fsm::new(),
        }
    }

    pub fn state(&self) -> State {
        self.fsm.state()
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn adapter_mut(&mut self) -> &mut A {
        &mut self.adapter
    }

    fn tolerate_not_implemented(r: Result<()>) -> Result<()> {
        match r {
            Err(Error::NotImplemented) => Ok(()),
            other => other,
        }
    }

    /// Hard-resets via the adapter if supported, then clocks the 5-bit
    /// `TMS=1` soft-reset sequence and resets the FSM.
    pub fn reset(&mut self) -> Result<()> {
        Self::tolerate_not_implemented(self.adapter.reset_tap(true))?;
        let first_next = fsm::next_state(self.fsm.state(), true);
        let tms = bits::pack(&[true; 5]);
        let tdi = bits::pack(&[false; 5]);
        if first_next.is_ir_branch() {
            self.adapter.shift_ir(&tms, &tdi, 5)?;
        } else {
            self.adapter.shift_dr(&tms, &tdi, 5)?;
        }
        self.fsm.reset();
        Ok(())
    }

    /// Drives the shortest TMS path to `target` through the IR or DR
    /// shift endpoint, chosen by the first state the path passes through.
    pub fn goto_state(&mut self, target: State) -> Result<()> {
        let tms_bits = fsm::shortest_path(self.fsm.state(), target);
        if tms_bits.is_empty() {
            return Ok(());
        }
        let first_next = fsm::next_state(self.fsm.state(), tms_bits[0]);
        let tms = bits::pack(&tms_bits);
        let tdi = bits::pack(&vec![false; tms_bits.len()]);
        if first_next.is_ir_branch() {
            self.adapter.shift_ir(&tms, &tdi, tms_bits.len())?;
        } else {
            self.adapter.shift_dr(&tms, &tdi, tms_bits.len())?;
        }
        for &tms_bit in &tms_bits {
            self.fsm.step(tms_bit);
        }
        Ok(())
    }

    /// Advances the FSM by each TMS bit while shifting `tdi_bits` into
    /// the IR, returning the captured TDO bits.
    pub fn shift_ir(&mut self, tms_bits: &[bool], tdi_bits: &[bool]) -> Result<Vec<bool>> {
        assert_eq!(tms_bits.len(), tdi_bits.len());
        let tms = bits::pack(tms_bits);
        let tdi = bits::pack(tdi_bits);
        let tdo = self.adapter.shift_ir(&tms, &tdi, tdi_bits.len())?;
        for &tms_bit in tms_bits {
            self.fsm.step(tms_bit);
        }
        Ok(bits::unpack(&tdo, tdi_bits.len()))
    }

    /// As [`Self::shift_ir`], via the DR path.
    pub fn shift_dr(&mut self, tms_bits: &[bool], tdi_bits: &[bool]) -> Result<Vec<bool>> {
        assert_eq!(tms_bits.len(), tdi_bits.len());
        let tms = bits::pack(tms_bits);
        let tdi = bits::pack(tdi_bits);
        let tdo = self.adapter.shift_dr(&tms, &tdi, tdi_bits.len())?;
        for &tms_bit in tms_bits {
            self.fsm.step(tms_bit);
        }
        Ok(bits::unpack(&tdo, tdi_bits.len()))
    }

    pub fn set_speed(&mut self, hz: u32) -> Result<()> {
        match self.adapter.set_speed(hz) {
            Err(Error::NotImplemented) => {
                clilog::debug!(TAP_D_SPEED_UNSUPPORTED, "adapter does not support SetSpeed({})", hz);
                Ok(())
            }
            other => other,
        }
    }
}
