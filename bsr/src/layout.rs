//! Chain-global DR layout and per-device segment construction (§4.7).

use bsdl::attrs::{BoundaryCell, CellFunction, ExtractedDevice};
use chain::Device;

/// One bit position of the chain-wide boundary-scan DR: which device and
/// which of that device's cell numbers it holds.
#[derive(Debug, Clone, Copy)]
pub struct CellRef {
    pub device_index: usize,
    pub cell_number: usize,
}

/// The chain-wide DR layout, built once per chain (§3 "DRLayout").
/// Entries run from the device at the TDO end (highest chain index) down
/// to the TDI end (index 0); bit 0 of a shifted DR vector is shifted in
/// first and surfaces at the TDO end (§3 invariant, P6).
pub struct DrLayout {
    pub entries: Vec<CellRef>,
    pub total_bits: usize,
    device_offsets: Vec<usize>,
}

impl DrLayout {
    pub fn build(devices: &[Device]) -> Self {
        let mut entries = Vec::new();
        let mut device_offsets = vec![0; devices.len()];
        for device_index in (0..devices.len()).rev() {
            device_offsets[device_index] = entries.len();
            let len = devices[device_index]
                .info
                .as_ref()
                .map(|i| i.info.boundary_length)
                .unwrap_or(0);
            entries.extend((0..len).map(|cell_number| CellRef {
                device_index,
                cell_number,
            }));
        }
        let total_bits = entries.len();
        DrLayout {
            entries,
            total_bits,
            device_offsets,
        }
    }

    /// Byte/bit offset of `device_index`'s segment start within the
    /// chain-wide DR vector.
    pub fn device_offset(&self, device_index: usize) -> usize {
        self.device_offsets[device_index]
    }

    pub fn device_segment<'a>(&self, device_index: usize, dr: &'a [bool]) -> &'a [bool] {
        let start = self.device_offset(device_index);
        let len = self
            .entries
            .iter()
            .skip(start)
            .take_while(|c| c.device_index == device_index)
            .count();
        &dr[start..start + len]
    }
}

fn enable_bit(cells: &[BoundaryCell], cell: &BoundaryCell) -> bool {
    let effective_disable = cell.disable.or_else(|| {
        cell.control
            .and_then(|ctrl| cells.get(ctrl))
            .and_then(|c| c.disable)
    });
    match effective_disable {
        Some(0) => true,
        Some(1) => false,
        _ => true,
    }
}

/// The per-device baseline vector: each cell set to its `Safe` value
/// ('0'/'1'), or `false` when the safe value is don't-care (§4.7).
pub fn safe_baseline(info: &ExtractedDevice) -> Vec<bool> {
    info.boundary_cells
        .iter()
        .map(|c| c.safe.as_bool().unwrap_or(false))
        .collect()
}

/// Safe baseline with every controllable output's control cell forced to
/// its disable value (§4.7 `SetAllPinsHiZ`).
pub fn hiz_vector(info: &ExtractedDevice) -> Vec<bool> {
    let mut v = safe_baseline(info);
    for cell in &info.boundary_cells {
        if cell.function.is_output() {
            if let Some(ctrl) = cell.control {
                v[ctrl] = !enable_bit(&info.boundary_cells, cell);
            }
        }
    }
    v
}

/// Safe baseline with one output cell driven to `value` and its control
/// cell (if any) enabled (§4.7 `DrivePin`). `cell_number` must reference
/// an output-function cell.
pub fn drive_vector(info: &ExtractedDevice, cell_number: usize, value: bool) -> Vec<bool> {
    let mut v = safe_baseline(info);
    v[cell_number] = value;
    let cell = &info.boundary_cells[cell_number];
    if let Some(ctrl) = cell.control {
        v[ctrl] = enable_bit(&info.boundary_cells, cell);
    }
    v
}

/// Resolves `pin` (a package pin name, case-insensitive) to the device's
/// output-function boundary cell that drives it.
pub fn find_output_cell<'a>(info: &'a ExtractedDevice, pin: &str) -> Option<&'a BoundaryCell> {
    info.boundary_cells.iter().find(|c| {
        c.function.is_output()
            && c.port
                .as_ref()
                .map(|p| info.resolve_pin(p).eq_ignore_ascii_case(pin))
                .unwrap_or(false)
    })
}

/// All boundary cells of `info` that both drive a package pin and carry
/// the given cell function, paired with their resolved pin names.
pub fn pins_with_function<'a>(
    info: &'a ExtractedDevice,
    matches: impl Fn(CellFunction) -> bool,
) -> impl Iterator<Item = (&'a BoundaryCell, &'a str)> {
    info.boundary_cells.iter().filter_map(move |c| {
        if !matches(c.function) {
            return None;
        }
        let port = c.port.as_ref()?;
        Some((c, info.resolve_pin(port)))
    })
}
