//! Exact shifted-DR-vector assertions for a single device: drive/control
//! bit placement (S4) and capture decoding of a `*`-port input cell (S5).

use bsr::{Controller, OtherDevicesPolicy, PinRef};
use chain::Chain;
use devicerepo::Repository;

const DRIVE_DEVICE: &str = r#"
entity DRIVE_DEVICE is
    attribute INSTRUCTION_LENGTH of DRIVE_DEVICE : entity is 3;
    attribute INSTRUCTION_OPCODE of DRIVE_DEVICE : entity is
        "BYPASS (111)," & "EXTEST (000)";
    attribute IDCODE_REGISTER of DRIVE_DEVICE : entity is
        "00000110010000111000000001000001";
    attribute BOUNDARY_LENGTH of DRIVE_DEVICE : entity is 2;
    attribute BOUNDARY_REGISTER of DRIVE_DEVICE : entity is
        "1 (BC_1, *, CONTROL, 1)," &
        "0 (BC_1, PA0, OUTPUT3, X, 1, 1, Z)";
end DRIVE_DEVICE;
"#;

const CAPTURE_DEVICE: &str = r#"
entity CAPTURE_DEVICE is
    attribute INSTRUCTION_LENGTH of CAPTURE_DEVICE : entity is 3;
    attribute INSTRUCTION_OPCODE of CAPTURE_DEVICE : entity is
        "BYPASS (111)," & "EXTEST (000)";
    attribute IDCODE_REGISTER of CAPTURE_DEVICE : entity is
        "00000110010000111000000001000010";
    attribute BOUNDARY_LENGTH of CAPTURE_DEVICE : entity is 2;
    attribute BOUNDARY_REGISTER of CAPTURE_DEVICE : entity is
        "1 (BC_1, *, CONTROL, 1)," &
        "0 (BC_1, PB0, INPUT, X)";
end CAPTURE_DEVICE;
"#;

fn single_device_chain(src: &str, idcode: u32) -> Chain<sim::Simulator> {
    let mut repo = Repository::new();
    repo.register(bsdl::parse_str(src).unwrap(), None).unwrap();
    let mut simulator = sim::Simulator::new();
    simulator.add_device(idcode, bsdl::parse_str(src).unwrap());
    Chain::discover(simulator, &repo, 1).unwrap()
}

#[test]
fn s4_drive_sets_bit0_output_bit1_control() {
    let mut chain = single_device_chain(DRIVE_DEVICE, 0x0643_8041);
    let mut ctrl = Controller::new(&mut chain, OtherDevicesPolicy::PreserveOthers).unwrap();
    ctrl.enter_extest().unwrap();
    ctrl.drive_pin(PinRef::new(0, "DRIVE_DEVICE", "PA0"), true)
        .unwrap();

    // cell 0 (output, bit 0) carries the driven value; cell 1 (control,
    // bit 1) is cleared to the disable-1 enabling value (§4.7, S4).
    let dr = ctrl.current_dr().unwrap();
    assert_eq!(dr, &[true, false]);
}

#[test]
fn s5_capture_decodes_only_named_input_cells() {
    // cell 1's CONTROL function has port "*"; capture_all must not
    // synthesize a PinRef for it, only for PB0 on cell 0.
    let mut chain = single_device_chain(CAPTURE_DEVICE, 0x0643_8042);
    let mut ctrl = Controller::new(&mut chain, OtherDevicesPolicy::PreserveOthers).unwrap();
    ctrl.enter_extest().unwrap();
    ctrl.set_all_pins_hiz().unwrap();
    let captured = ctrl.capture_all().unwrap();

    let pb0 = PinRef::new(0, "CAPTURE_DEVICE", "PB0");
    assert_eq!(captured.len(), 1);
    assert_eq!(captured.get(&pb0), Some(&false));
}
