//! Discovery across a chain of more than one device: position mapping,
//! unknown-IDCODE tolerance, and cross-device lookup by pin (§4.6).

use chain::Chain;
use devicerepo::Repository;

const DEVICE_A: &str = r#"
entity DEVICE_A is
    attribute INSTRUCTION_LENGTH of DEVICE_A : entity is 3;
    attribute INSTRUCTION_OPCODE of DEVICE_A : entity is
        "BYPASS (111)," & "EXTEST (000)";
    attribute IDCODE_REGISTER of DEVICE_A : entity is
        "00000110010000111000000001000001";
    attribute BOUNDARY_LENGTH of DEVICE_A : entity is 1;
    attribute BOUNDARY_REGISTER of DEVICE_A : entity is
        "0 (BC_1, PIN1, OBSERVE_ONLY, X)";
end DEVICE_A;
"#;

const DEVICE_B: &str = r#"
entity DEVICE_B is
    attribute INSTRUCTION_LENGTH of DEVICE_B : entity is 3;
    attribute INSTRUCTION_OPCODE of DEVICE_B : entity is
        "BYPASS (111)," & "EXTEST (000)";
    attribute IDCODE_REGISTER of DEVICE_B : entity is
        "00000110010000111000000001000010";
    attribute BOUNDARY_LENGTH of DEVICE_B : entity is 2;
    attribute BOUNDARY_REGISTER of DEVICE_B : entity is
        "1 (BC_1, PIN2, OBSERVE_ONLY, X)," &
        "0 (BC_1, PIN1, OBSERVE_ONLY, X)";
end DEVICE_B;
"#;

#[test]
fn three_device_chain_maps_positions_tdi_to_tdo() {
    let mut repo = Repository::new();
    repo.register(bsdl::parse_str(DEVICE_A).unwrap(), None).unwrap();
    repo.register(bsdl::parse_str(DEVICE_B).unwrap(), None).unwrap();

    let mut simulator = sim::Simulator::new();
    // added in TDI-to-TDO order: A (position 0), unknown (position 1),
    // B (position 2).
    simulator.add_device(0x0643_8041, bsdl::parse_str(DEVICE_A).unwrap());
    simulator.add_device(0xDEAD_BEEF, bsdl::parse_str(DEVICE_A).unwrap());
    simulator.add_device(0x0643_8042, bsdl::parse_str(DEVICE_B).unwrap());

    let chain = Chain::discover(simulator, &repo, 3).unwrap();
    assert_eq!(chain.devices().len(), 3);

    let first = chain.device(0).unwrap();
    assert_eq!(first.idcode, 0x0643_8041);
    assert_eq!(first.name, "DEVICE_A");

    let middle = chain.device(1).unwrap();
    assert_eq!(middle.idcode, 0xDEAD_BEEF);
    assert!(middle.info.is_none());
    assert_eq!(middle.name, "");

    let last = chain.device(2).unwrap();
    assert_eq!(last.idcode, 0x0643_8042);
    assert_eq!(last.name, "DEVICE_B");
    assert!(last.cell_by_pin("pin2").is_some());
    assert!(last.cell_by_pin("PIN2").is_some());
    assert!(last.cell_by_pin("PIN3").is_none());
}
