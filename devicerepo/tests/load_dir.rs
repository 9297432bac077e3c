//! Loading BSDL files off disk: recursive walk, extension filtering, and
//! sorted visit order (§4.5).

use devicerepo::Repository;
use std::fs;

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
    attribute BOUNDARY_LENGTH of DEVICE_B : entity is 1;
    attribute BOUNDARY_REGISTER of DEVICE_B : entity is
        "0 (BC_1, PIN1, OBSERVE_ONLY, X)";
end DEVICE_B;
"#;

fn temp_dir(name: &str) -> std::path::PathBuf {
    let mut dir = std::env::temp_dir();
    dir.push(format!("devicerepo-test-{name}-{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    dir
}

#[test]
fn load_dir_recurses_and_filters_by_extension() {
    let root = temp_dir("load-dir");
    let nested = root.join("nested");
    fs::create_dir_all(&nested).unwrap();
    fs::write(root.join("a.bsdl"), DEVICE_A).unwrap();
    fs::write(nested.join("b.bsd"), DEVICE_B).unwrap();
    fs::write(root.join("notes.txt"), "not a BSDL file").unwrap();

    let mut repo = Repository::new();
    let loaded = repo.load_dir(&root).unwrap();
    assert_eq!(loaded, 2);
    assert_eq!(repo.len(), 2);
    assert_eq!(repo.lookup(0x0643_8041).unwrap().info.name, "DEVICE_A");
    assert_eq!(repo.lookup(0x0643_8042).unwrap().info.name, "DEVICE_B");

    fs::remove_dir_all(&root).unwrap();
}

#[test]
fn load_file_remembers_its_source_path() {
    let root = temp_dir("load-file");
    fs::create_dir_all(&root).unwrap();
    let path = root.join("a.bsdl");
    fs::write(&path, DEVICE_A).unwrap();

    let mut repo = Repository::new();
    repo.load_file(&path).unwrap();
    assert_eq!(repo.path_of(0x0643_8041), Some(path.as_path()));

    fs::remove_dir_all(&root).unwrap();
}

#[test]
fn load_dir_aborts_on_first_parse_error() {
    let root = temp_dir("load-dir-bad");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("a.bsdl"), DEVICE_A).unwrap();
    fs::write(root.join("broken.bsdl"), "entity BROKEN is end;").unwrap();

    let mut repo = Repository::new();
    assert!(repo.load_dir(&root).is_err());

    fs::remove_dir_all(&root).unwrap();
}
