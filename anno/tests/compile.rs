//! End-to-end tests: load Go-like sources into the driver, compile every
//! annotation block, and check the emitted dump and diagnostics.

use codespan_reporting::term::termcolor::NoColor;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use anno::{Driver, Status};

/// A writer that can be handed to the driver while the test keeps a handle
/// on the bytes written through it.
#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SharedBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

struct Harness {
    driver: Driver,
    emitted: SharedBuffer,
    diagnostics: SharedBuffer,
}

fn harness() -> Harness {
    let emitted = SharedBuffer::default();
    let diagnostics = SharedBuffer::default();

    let mut driver = Driver::new();
    driver.set_emit_writer(NoColor::new(emitted.clone()));
    driver.set_diagnostic_writer(NoColor::new(diagnostics.clone()));
    driver.set_emit_width(80);

    Harness {
        driver,
        emitted,
        diagnostics,
    }
}

fn compile(name: &str, source: &str) -> (Status, String, String) {
    let mut harness = harness();
    let file_id = (harness.driver).load_source_string(name.to_owned(), source.to_owned());
    let status = harness.driver.compile_file(file_id);
    (
        status,
        harness.emitted.contents(),
        harness.diagnostics.contents(),
    )
}

const ANIMALS: &str = r#"package zoo

/*
@enum Animal --json="string"
Dog --string="doggy"
Cat --string="kitty" --description="Likes sleeping"
Horse
*/

type Animal struct{}
"#;

#[test]
fn enum_end_to_end() {
    let (status, emitted, diagnostics) = compile("zoo.go", ANIMALS);

    assert!(matches!(status, Status::Ok), "diagnostics: {diagnostics}");
    assert_eq!(diagnostics, "");
    assert!(emitted.contains("package zoo"), "emitted: {emitted}");
    assert!(emitted.contains("enum Animal : uint8"), "emitted: {emitted}");
    assert!(emitted.contains("Dog = 1 \"doggy\""), "emitted: {emitted}");
    assert!(emitted.contains("Horse = 3 \"Horse\""), "emitted: {emitted}");
    assert!(emitted.contains("\"strconv\""), "emitted: {emitted}");
    assert!(emitted.contains("\"log\""), "emitted: {emitted}");
}

#[test]
fn struct_and_union_end_to_end() {
    let source = r#"
/*
@struct Config --drop_json
// Where to write output.
Path string `json:"path"` --read --write
Verbose bool --read=IsVerbose
*Base

@union Value
Number
*Text
*/
"#;
    let (status, emitted, diagnostics) = compile("config.go", source);

    assert!(matches!(status, Status::Ok), "diagnostics: {diagnostics}");
    assert!(emitted.contains("struct Config [ctor NewConfig]"));
    assert!(emitted.contains("Path: string `json:\"path\"` (read Path, write SetPath)"));
    assert!(emitted.contains("Verbose: bool (read IsVerbose)"));
    assert!(emitted.contains("embed *Base"));
    assert!(emitted.contains("union Value {"));
    assert!(emitted.contains("// Where to write output."));
    // drop_json on the only struct, so no JSON import either
    assert!(!emitted.contains("encoding/json"));
}

#[test]
fn defaults_span_blocks() {
    let source = r#"
/* @enum-defaults --drop_json --bitflags */

/*
@enum Perm
Read
Write
Exec
*/
"#;
    let (status, emitted, diagnostics) = compile("perm.go", source);

    assert!(matches!(status, Status::Ok), "diagnostics: {diagnostics}");
    assert!(emitted.contains("bitflags"), "emitted: {emitted}");
    assert!(!emitted.contains("json("), "emitted: {emitted}");
    assert!(emitted.contains("Exec = 4"), "emitted: {emitted}");
}

#[test]
fn errors_fail_the_file() {
    let source = "/* @enum Animal\n*/";
    let (status, emitted, diagnostics) = compile("bad.go", source);

    assert!(matches!(status, Status::Error));
    assert_eq!(emitted, "");
    assert!(
        diagnostics.contains("at least one variant"),
        "diagnostics: {diagnostics}"
    );
    assert!(
        diagnostics.contains("@enum Animal"),
        "diagnostics: {diagnostics}"
    );
}

#[test]
fn recovery_keeps_later_descriptors() {
    let source = r#"
/*
@enum Broken --bitflag_separator=
@enum Fine
A
B
*/
"#;
    let (status, emitted, diagnostics) = compile("mixed.go", source);

    // The broken descriptor is dropped with a diagnostic, the surviving one
    // is still emitted, and the file as a whole is marked as failed.
    assert!(matches!(status, Status::Error));
    assert!(emitted.contains("enum Fine"), "emitted: {emitted}");
    assert!(!emitted.contains("Broken"), "emitted: {emitted}");
    assert!(!diagnostics.is_empty());
}

#[test]
fn allow_errors_downgrades_the_status() {
    let source = "/*\n@enum Broken --bitflag_separator=\n@enum Fine\nA\n*/";
    let mut harness = harness();
    harness.driver.set_allow_errors(true);
    let file_id = (harness.driver).load_source_string("mixed.go".to_owned(), source.to_owned());

    assert!(matches!(harness.driver.compile_file(file_id), Status::Ok));
    assert!(harness.emitted.contents().contains("enum Fine"));
}

#[test]
fn quiet_suppresses_the_dump() {
    let mut harness = harness();
    harness.driver.set_quiet(true);
    let file_id = (harness.driver).load_source_string("zoo.go".to_owned(), ANIMALS.to_owned());

    let status = harness.driver.compile_file(file_id);

    assert!(matches!(status, Status::Ok));
    assert_eq!(harness.emitted.contents(), "");
}

#[test]
fn compilation_is_deterministic() {
    let (_, first, _) = compile("zoo.go", ANIMALS);
    let (_, second, _) = compile("zoo.go", ANIMALS);
    assert_eq!(first, second);
}

#[test]
fn files_are_independent() {
    let mut harness = harness();
    let bad = (harness.driver).load_source_string("bad.go".to_owned(), "/* @enum X\n*/".to_owned());
    let good = (harness.driver).load_source_string("zoo.go".to_owned(), ANIMALS.to_owned());

    assert!(matches!(harness.driver.compile_file(bad), Status::Error));
    assert!(matches!(harness.driver.compile_file(good), Status::Ok));
}
