//! Derives [`DeviceInfo`], [`Instruction`]s, [`BoundaryCell`]s, the
//! [`PinMap`] and [`TapConfig`] from a parsed [`Entity`] (§4.2).

use crate::ast::{AttributeSpec, ConstantAttribute, Decl, Entity};
use crate::error::{Error, Result};
use compact_str::CompactString;
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq, Copy)]
pub enum SafeValue {
    Zero,
    One,
    DontCare,
}

impl SafeValue {
    fn parse(s: &str) -> Option<SafeValue> {
        match s.trim() {
            "0" => Some(SafeValue::Zero),
            "1" => Some(SafeValue::One),
            "X" | "x" => Some(SafeValue::DontCare),
            _ => None,
        }
    }

    pub fn as_bool(self) -> Option<bool> {
        match self {
            SafeValue::Zero => Some(false),
            SafeValue::One => Some(true),
            SafeValue::DontCare => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellFunction {
    Input,
    Output2,
    Output3,
    Control,
    Bidir,
    ObserveOnly,
    Internal,
}

impl CellFunction {
    fn parse(s: &str) -> Option<CellFunction> {
        let s = s.trim();
        Some(match () {
            _ if s.eq_ignore_ascii_case("INPUT") => CellFunction::Input,
            _ if s.eq_ignore_ascii_case("OUTPUT2") => CellFunction::Output2,
            _ if s.eq_ignore_ascii_case("OUTPUT3") => CellFunction::Output3,
            _ if s.eq_ignore_ascii_case("CONTROL") => CellFunction::Control,
            _ if s.eq_ignore_ascii_case("BIDIR") => CellFunction::Bidir,
            _ if s.eq_ignore_ascii_case("OBSERVE_ONLY") => CellFunction::ObserveOnly,
            _ if s.eq_ignore_ascii_case("INTERNAL") => CellFunction::Internal,
            _ => return None,
        })
    }

    pub fn is_output(self) -> bool {
        matches!(self, CellFunction::Output2 | CellFunction::Output3)
    }

    pub fn is_control(self) -> bool {
        matches!(self, CellFunction::Control)
    }

    pub fn is_input(self) -> bool {
        matches!(self, CellFunction::Input)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryCell {
    pub number: usize,
    pub cell_type: CompactString,
    /// `None` represents the `*` port placeholder.
    pub port: Option<CompactString>,
    pub function: CellFunction,
    pub safe: SafeValue,
    pub control: Option<usize>,
    pub disable: Option<u8>,
    pub result: Option<CompactString>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub name: CompactString,
    /// Alternates in declaration order; only `opcodes[0]` is ever selected
    /// automatically by the runtime (see DESIGN.md).
    pub opcodes: Vec<CompactString>,
}

impl Instruction {
    pub fn primary_opcode(&self) -> &str {
        &self.opcodes[0]
    }
}

pub type PinMap = HashMap<CompactString, CompactString>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEdge {
    Rising,
    Falling,
    Both,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TapConfig {
    pub scan_in: Option<CompactString>,
    pub scan_out: Option<CompactString>,
    pub scan_mode: Option<CompactString>,
    pub scan_reset: Option<CompactString>,
    pub scan_clock_port: Option<CompactString>,
    pub max_frequency: Option<f64>,
    pub clock_edge: Option<ClockEdge>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceInfo {
    pub name: CompactString,
    pub instruction_length: usize,
    pub boundary_length: usize,
    /// The raw 32-character `{0,1,X}` IDCODE_REGISTER pattern text.
    pub idcode_pattern: CompactString,
    pub user_code: Option<CompactString>,
    pub instruction_capture: Option<CompactString>,
    /// Opaque vendor constant attributes not otherwise interpreted.
    pub extra_constants: Vec<(CompactString, ConstantAttribute)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedDevice {
    pub info: DeviceInfo,
    pub instructions: Vec<Instruction>,
    pub boundary_cells: Vec<BoundaryCell>,
    pub pin_map: PinMap,
    pub tap_config: TapConfig,
}

impl ExtractedDevice {
    pub fn instruction(&self, name: &str) -> Option<&Instruction> {
        self.instructions
            .iter()
            .find(|i| i.name.eq_ignore_ascii_case(name))
    }

    /// Resolves a boundary cell's package pin name: the pin map entry for
    /// the cell's port, falling back to the port name itself.
    pub fn resolve_pin<'a>(&'a self, port: &'a str) -> &'a str {
        self.pin_map
            .iter()
            .find(|(sig, _)| sig.eq_ignore_ascii_case(port))
            .map(|(_, pin)| pin.as_str())
            .unwrap_or(port)
    }
}

fn find_attr<'a>(entity: &'a Entity, name: &str) -> Option<&'a AttributeSpec> {
    entity.decls.iter().find_map(|d| match d {
        Decl::Attribute(a) if a.name.eq_ignore_ascii_case(name) => Some(a),
        _ => None,
    })
}

fn constants_of_type<'a>(
    entity: &'a Entity,
    typ: &str,
) -> Vec<(&'a CompactString, &'a ConstantAttribute)> {
    entity
        .decls
        .iter()
        .filter_map(|d| match d {
            Decl::Constant(c) if c.typ.eq_ignore_ascii_case(typ) => Some((&c.name, c)),
            _ => None,
        })
        .collect()
}

fn attr_int(entity: &Entity, name: &'static str) -> Result<usize> {
    let attr = find_attr(entity, name).ok_or(Error::MissingAttribute(name))?;
    let text = attr.value.concat_text();
    text.trim()
        .parse::<usize>()
        .map_err(|_| Error::CorruptBsdl(format!("{} is not a positive integer: {}", name, text)))
        .and_then(|v| {
            if v == 0 {
                Err(Error::CorruptBsdl(format!("{} must be > 0", name)))
            } else {
                Ok(v)
            }
        })
}

fn extract_idcode(entity: &Entity) -> Result<CompactString> {
    let attr = find_attr(entity, "IDCODE_REGISTER").ok_or(Error::MissingAttribute("IDCODE_REGISTER"))?;
    let text = attr.value.concat_text();
    if text.is_empty() {
        return Err(Error::MissingAttribute("IDCODE_REGISTER"));
    }
    if text.len() != 32 || !text.chars().all(|c| matches!(c, '0' | '1' | 'X' | 'x')) {
        return Err(Error::CorruptBsdl(format!(
            "IDCODE_REGISTER must be 32 characters of 0/1/X, got `{}`",
            text
        )));
    }
    Ok(CompactString::from(text.to_ascii_uppercase()))
}

fn instruction_opcode_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?P<name>[A-Za-z_][A-Za-z0-9_]*)\s*\(\s*(?P<bins>[01,\s]+)\)").unwrap()
    })
}

fn extract_instructions(entity: &Entity, instruction_length: usize) -> Result<Vec<Instruction>> {
    let attr =
        find_attr(entity, "INSTRUCTION_OPCODE").ok_or(Error::MissingAttribute("INSTRUCTION_OPCODE"))?;
    let text = attr.value.concat_text();
    let mut instructions = Vec::new();
    for cap in instruction_opcode_regex().captures_iter(&text) {
        let name = CompactString::from(&cap["name"]);
        let mut opcodes = Vec::new();
        for bin in cap["bins"].split(',') {
            let bin = bin.trim();
            if bin.is_empty() {
                continue;
            }
            if bin.len() != instruction_length || !bin.bytes().all(|b| b == b'0' || b == b'1') {
                clilog::warn!(
                    BSDL_W_OPCODE_LEN,
                    "dropping alternate opcode `{}` for instruction `{}`: expected {} bits",
                    bin,
                    name,
                    instruction_length
                );
                continue;
            }
            opcodes.push(CompactString::from(bin));
        }
        if opcodes.is_empty() {
            return Err(Error::CorruptBsdl(format!(
                "instruction `{}` has no opcode of the required {}-bit width",
                name, instruction_length
            )));
        }
        instructions.push(Instruction { name, opcodes });
    }
    if instructions.is_empty() {
        return Err(Error::MissingAttribute("INSTRUCTION_OPCODE"));
    }
    Ok(instructions)
}

fn boundary_cell_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?x)
            (?P<num>\d+)\s*\(\s*
            (?P<typ>[^,()]+)\s*,\s*
            (?P<port>[^,()]+)\s*,\s*
            (?P<func>[^,()]+)
            (?:\s*,\s*(?P<safe>[^,()]+))?
            (?:\s*,\s*(?P<control>[^,()]+))?
            (?:\s*,\s*(?P<disable>[^,()]+))?
            (?:\s*,\s*(?P<result>[^,()]+))?
            \s*\)
            ",
        )
        .unwrap()
    })
}

fn parse_numeric_field(s: Option<&str>) -> Option<usize> {
    let s = s?.trim();
    if s.is_empty() || s == "*" || s.eq_ignore_ascii_case("x") {
        return None;
    }
    s.parse().ok()
}

fn extract_boundary_cells(entity: &Entity, boundary_length: usize) -> Result<Vec<BoundaryCell>> {
    let attr =
        find_attr(entity, "BOUNDARY_REGISTER").ok_or(Error::MissingAttribute("BOUNDARY_REGISTER"))?;
    let text = attr.value.concat_text();
    let mut cells = Vec::new();
    for cap in boundary_cell_regex().captures_iter(&text) {
        let number: usize = cap["num"]
            .parse()
            .map_err(|_| Error::CorruptBsdl(format!("invalid boundary cell number `{}`", &cap["num"])))?;
        let cell_type = CompactString::from(cap["typ"].trim());
        let port_raw = cap["port"].trim();
        let port = if port_raw == "*" {
            None
        } else {
            Some(CompactString::from(port_raw))
        };
        let function = CellFunction::parse(&cap["func"]).ok_or_else(|| {
            Error::CorruptBsdl(format!("unknown boundary cell function `{}`", &cap["func"]))
        })?;
        let safe = cap
            .name("safe")
            .and_then(|m| SafeValue::parse(m.as_str()))
            .unwrap_or(SafeValue::DontCare);
        let control = parse_numeric_field(cap.name("control").map(|m| m.as_str()));
        let disable = parse_numeric_field(cap.name("disable").map(|m| m.as_str())).map(|v| v as u8);
        if let Some(d) = disable {
            if d > 1 {
                return Err(Error::CorruptBsdl(format!(
                    "boundary cell {} has invalid Disable value {}",
                    number, d
                )));
            }
        }
        let result = cap
            .name("result")
            .map(|m| m.as_str().trim())
            .filter(|s| !s.is_empty() && *s != "*")
            .map(CompactString::from);
        cells.push(BoundaryCell {
            number,
            cell_type,
            port,
            function,
            safe,
            control,
            disable,
            result,
        });
    }
    cells.sort_by_key(|c| c.number);
    if cells.len() != boundary_length {
        return Err(Error::CorruptBsdl(format!(
            "BOUNDARY_REGISTER declares {} cells, BOUNDARY_LENGTH says {}",
            cells.len(),
            boundary_length
        )));
    }
    for (i, cell) in cells.iter().enumerate() {
        if cell.number != i {
            return Err(Error::CorruptBsdl(format!(
                "boundary cell numbers are not a contiguous 0..{} range (missing {})",
                boundary_length, i
            )));
        }
        if cell.number >= boundary_length {
            return Err(Error::CorruptBsdl(format!(
                "boundary cell number {} out of range [0, {})",
                cell.number, boundary_length
            )));
        }
    }
    for cell in &cells {
        if cell.function.is_output() {
            if let Some(ctrl) = cell.control {
                match cells.get(ctrl) {
                    Some(c) if c.function.is_control() => {}
                    Some(_) => {
                        return Err(Error::CorruptBsdl(format!(
                            "boundary cell {}'s Control field {} does not reference a CONTROL cell",
                            cell.number, ctrl
                        )))
                    }
                    None => {
                        return Err(Error::CorruptBsdl(format!(
                            "boundary cell {}'s Control field {} is out of range",
                            cell.number, ctrl
                        )))
                    }
                }
            }
        }
    }
    Ok(cells)
}

fn extract_pin_map(entity: &Entity) -> PinMap {
    let mut map = PinMap::new();
    for (_, constant) in constants_of_type(entity, "PIN_MAP_STRING") {
        let text = constant.value.concat_text();
        for entry in text.split(',') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            if let Some((sig, pin)) = entry.split_once(':') {
                map.insert(
                    CompactString::from(sig.trim()),
                    CompactString::from(pin.trim()),
                );
            }
        }
    }
    map
}

fn tap_scan_port(entity: &Entity, name: &str) -> Option<CompactString> {
    find_attr(entity, name).map(|a| a.target.clone())
}

fn extract_tap_config(entity: &Entity) -> TapConfig {
    let mut cfg = TapConfig {
        scan_in: tap_scan_port(entity, "TAP_SCAN_IN"),
        scan_out: tap_scan_port(entity, "TAP_SCAN_OUT"),
        scan_mode: tap_scan_port(entity, "TAP_SCAN_MODE"),
        scan_reset: tap_scan_port(entity, "TAP_SCAN_RESET"),
        scan_clock_port: tap_scan_port(entity, "TAP_SCAN_CLOCK"),
        max_frequency: None,
        clock_edge: None,
    };
    if let Some(attr) = find_attr(entity, "TAP_SCAN_CLOCK") {
        if let Some(items) = attr.value.as_tuple() {
            if let Some(freq_expr) = items.first() {
                cfg.max_frequency = freq_expr.0.iter().find_map(|t| match t {
                    crate::ast::Term::Real(r) => Some(*r),
                    crate::ast::Term::Integer(i) => Some(*i as f64),
                    _ => None,
                });
            }
            if let Some(edge_expr) = items.get(1) {
                let text = edge_expr.concat_text();
                cfg.clock_edge = match text.to_ascii_uppercase().as_str() {
                    "RISING" | "R" => Some(ClockEdge::Rising),
                    "FALLING" | "F" => Some(ClockEdge::Falling),
                    "BOTH" => Some(ClockEdge::Both),
                    _ => None,
                };
            }
        }
    }
    cfg
}

fn extra_constants(entity: &Entity) -> Vec<(CompactString, ConstantAttribute)> {
    entity
        .decls
        .iter()
        .filter_map(|d| match d {
            Decl::Constant(c)
                if !c.typ.eq_ignore_ascii_case("PIN_MAP_STRING") =>
            {
                Some((c.name.clone(), c.clone()))
            }
            _ => None,
        })
        .collect()
}

fn attr_text(entity: &Entity, name: &str) -> Option<CompactString> {
    find_attr(entity, name).map(|a| CompactString::from(a.value.concat_text()))
}

pub fn extract(entity: &Entity) -> Result<ExtractedDevice> {
    let instruction_length = attr_int(entity, "INSTRUCTION_LENGTH")?;
    let boundary_length = attr_int(entity, "BOUNDARY_LENGTH")?;
    let idcode_pattern = extract_idcode(entity)?;
    let instructions = extract_instructions(entity, instruction_length)?;
    if !instructions.iter().any(|i| i.name.eq_ignore_ascii_case("BYPASS")) {
        return Err(Error::MissingAttribute("INSTRUCTION_OPCODE(BYPASS)"));
    }
    let boundary_cells = extract_boundary_cells(entity, boundary_length)?;
    let pin_map = extract_pin_map(entity);
    let tap_config = extract_tap_config(entity);
    let info = DeviceInfo {
        name: entity.name.clone(),
        instruction_length,
        boundary_length,
        idcode_pattern,
        user_code: attr_text(entity, "USERCODE_REGISTER"),
        instruction_capture: attr_text(entity, "INSTRUCTION_CAPTURE"),
        extra_constants: extra_constants(entity),
    };
    Ok(ExtractedDevice {
        info,
        instructions,
        boundary_cells,
        pin_map,
        tap_config,
    })
}
