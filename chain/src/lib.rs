//! JTAG chain discovery: IDCODE scan and per-position device metadata
//! (§4.6).

pub mod error;

pub use error::{Error, Result};

use bsdl::ExtractedDevice;
use compact_str::CompactString;
use devicerepo::Repository;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::OnceLock;
use tap::{Adapter, State, Transport};

/// One device's position and metadata on a discovered chain. Position 0
/// is closest to TDI. `info`/`bsdl_path` are `None` when the scanned
/// IDCODE had no match in the [`Repository`] (§4.6 step 4); the device
/// still occupies its chain position.
pub struct Device {
    pub position: usize,
    pub idcode: u32,
    pub bsdl_path: Option<PathBuf>,
    pub name: CompactString,
    pub info: Option<ExtractedDevice>,
    by_port_upper: OnceLock<HashMap<CompactString, usize>>,
}

impl Device {
    /// Boundary cells indexed by `BoundaryCell::number`; `None` when this
    /// device has no matching BSDL.
    pub fn boundary_cells(&self) -> Option<&[bsdl::attrs::BoundaryCell]> {
        self.info.as_ref().map(|i| i.boundary_cells.as_slice())
    }

    /// Looks up the boundary cell whose resolved package pin matches
    /// `pin` case-insensitively, built and cached on first use.
    pub fn cell_by_pin(&self, pin: &str) -> Option<&bsdl::attrs::BoundaryCell> {
        let info = self.info.as_ref()?;
        let index = self.by_port_upper.get_or_init(|| {
            let mut map = HashMap::new();
            for cell in &info.boundary_cells {
                let Some(port) = &cell.port else { continue };
                let resolved = info.resolve_pin(port).to_ascii_uppercase();
                map.entry(CompactString::from(resolved)).or_insert(cell.number);
            }
            map
        });
        index
            .get(&CompactString::from(pin.to_ascii_uppercase()))
            .map(|&n| &info.boundary_cells[n])
    }
}

/// A discovered TAP chain and the transport it was discovered on, ready
/// for the BSR controller to drive (§4.6, §4.7).
pub struct Chain<A: Adapter> {
    transport: Transport<A>,
    devices: Vec<Device>,
}

impl<A: Adapter> Chain<A> {
    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn device(&self, position: usize) -> Option<&Device> {
        self.devices.get(position)
    }

    pub fn transport(&self) -> &Transport<A> {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut Transport<A> {
        &mut self.transport
    }

    /// Scans `expected_count` 32-bit IDCODEs off the chain's power-on
    /// default DR and wires each one to a [`Repository`] entry (§4.6).
    pub fn discover(adapter: A, repo: &Repository, expected_count: usize) -> Result<Self> {
        if expected_count == 0 {
            return Err(Error::ZeroExpectedCount);
        }
        let mut transport = Transport::new(adapter);
        transport.reset()?;
        transport.goto_state(State::ShiftDr)?;

        let total_bits = expected_count * 32;
        let tdi = vec![false; total_bits];
        let tms: Vec<bool> = (0..total_bits).map(|i| i + 1 == total_bits).collect();
        let tdo = transport.shift_dr(&tms, &tdi)?;
        transport.goto_state(State::RunTestIdle)?;

        // tdo's first 32-bit chunk came out of the device nearest TDO
        // (the highest chain position); the last chunk is position 0.
        let mut devices = Vec::with_capacity(expected_count);
        for chunk_index in 0..expected_count {
            let position = expected_count - 1 - chunk_index;
            let slice = &tdo[chunk_index * 32..(chunk_index + 1) * 32];
            let idcode = slice
                .iter()
                .enumerate()
                .fold(0u32, |acc, (i, &b)| if b { acc | (1 << i) } else { acc });
            if !slice[0] {
                clilog::warn!(
                    CHAIN_W_IDCODE_LSB,
                    "device at position {} has IDCODE 0x{:08x} with LSB=0 (IEEE 1149.1 requires 1)",
                    position,
                    idcode
                );
            }
            let (bsdl_path, info, name) = match repo.lookup(idcode) {
                Ok(device) => (
                    repo.path_of(idcode).map(|p| p.to_path_buf()),
                    Some(device.clone()),
                    device.info.name.clone(),
                ),
                Err(devicerepo::Error::UnknownIdCode { .. }) => {
                    clilog::warn!(
                        CHAIN_W_UNKNOWN_IDCODE,
                        "no BSDL registered for IDCODE 0x{:08x} at position {}",
                        idcode,
                        position
                    );
                    (None, None, CompactString::default())
                }
                Err(other) => return Err(other.into()),
            };
            devices.push(Device {
                position,
                idcode,
                bsdl_path,
                name,
                info,
                by_port_upper: OnceLock::new(),
            });
        }
        devices.sort_by_key(|d| d.position);
        Ok(Chain { transport, devices })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devicerepo::Repository;

    const STM32_LIKE: &str = r#"
entity STM32F303_F334_LQFP64 is
    attribute INSTRUCTION_LENGTH of STM32F303_F334_LQFP64 : entity is 5;
    attribute INSTRUCTION_OPCODE of STM32F303_F334_LQFP64 : entity is
        "BYPASS (11111)," & "EXTEST (00000)," & "IDCODE (00110)";
    attribute IDCODE_REGISTER of STM32F303_F334_LQFP64 : entity is
        "0000" & "0110" & "0100" & "0011" & "1000" & "0000" & "0100" & "0001";
    attribute BOUNDARY_LENGTH of STM32F303_F334_LQFP64 : entity is 1;
    attribute BOUNDARY_REGISTER of STM32F303_F334_LQFP64 : entity is
        "0 (BC_1, PA5, OBSERVE_ONLY, X)";
end STM32F303_F334_LQFP64;
"#;

    #[test]
    fn s1_discover_single_device() {
        let mut repo = Repository::new();
        repo.register(bsdl::parse_str(STM32_LIKE).unwrap(), None).unwrap();
        let mut sim = sim::Simulator::new();
        sim.add_device(0x0643_8041, bsdl::parse_str(STM32_LIKE).unwrap());

        let chain = Chain::discover(sim, &repo, 1).unwrap();
        let dev = chain.device(0).unwrap();
        assert_eq!(dev.idcode, 0x0643_8041);
        assert_eq!(dev.name, "STM32F303_F334_LQFP64");
        assert_eq!(dev.info.as_ref().unwrap().info.instruction_length, 5);
    }

    #[test]
    fn unknown_idcode_does_not_fail_discovery() {
        let repo = Repository::new();
        let mut sim = sim::Simulator::new();
        sim.add_device(0x0643_8041, bsdl::parse_str(STM32_LIKE).unwrap());

        let chain = Chain::discover(sim, &repo, 1).unwrap();
        let dev = chain.device(0).unwrap();
        assert!(dev.info.is_none());
        assert_eq!(dev.name, "");
    }

    #[test]
    fn zero_expected_count_is_rejected() {
        let repo = Repository::new();
        let sim = sim::Simulator::new();
        assert!(matches!(
            Chain::discover(sim, &repo, 0),
            Err(Error::ZeroExpectedCount)
        ));
    }
}
