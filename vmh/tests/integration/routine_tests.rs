use std::fs;

use crate::common::{
    VistaFixture, assert_contains, assert_not_contains, assert_path_exists, init_test_logging,
};

const XUSRB: &str = "XUSRB ;SFISC/RWF - Request Broker ;\n \
;;8.0;KERNEL;\n\
INHIB1() ;Is Logon to this system Inhibited?\n \
Q $$INHIB1^XUSRB2()\n\
INHIB2() ;Has this system hit the max users?\n \
Q $$INHIB2^XUSRB2()\n";

const XUS1: &str = "XUS1 ;SF-ISC/STAFF - SIGNON ;\n \
;;8.0;KERNEL;\n\
LOG ;Log the user in\n \
S XUENV=$G(XUENV)\n \
Q\n\
LOGOUT ;\n \
Q\n";

fn seed_both(fixture: &VistaFixture) {
    fixture.write_routine("XUSRB", XUSRB);
    fixture.write_routine("XUS1", XUS1);
}

#[test]
fn test_patch_routines_inserts_guards() {
    init_test_logging();
    crate::test_log!("TEST START: test_patch_routines_inserts_guards");

    let fixture = VistaFixture::new();
    seed_both(&fixture);
    let xusrb_obj = fixture.write_object(&fixture.object_dirs[0], "XUSRB");
    let xus1_obj = fixture.write_object(&fixture.object_dirs[2], "XUS1");

    let out = fixture.run(&["patch-routines"]);

    assert!(out.success(), "patch-routines failed: {}", out.stderr);
    assert_contains(&out.stdout, "=== Patching XUSRB.m ===");
    assert_contains(&out.stdout, "  Fixed INHIB1 at line 3");
    assert_contains(&out.stdout, "  Fixed INHIB2 at line 5");
    assert_contains(&out.stdout, "  Patched 2 locations");
    assert_contains(&out.stdout, "=== Patching XUS1.m ===");
    assert_contains(&out.stdout, "  Fixed LOG at line 3");
    assert_contains(&out.stdout, "  Patched 1 locations");
    assert_contains(&out.stdout, &format!("  Removed {}", xusrb_obj.display()));
    assert_contains(&out.stdout, &format!("  Removed {}", xus1_obj.display()));
    assert_contains(&out.stdout, "=== All patches complete ===");
    assert!(!xusrb_obj.exists());
    assert!(!xus1_obj.exists());

    let xusrb = fs::read_to_string(fixture.routines_dir.join("XUSRB.m")).unwrap();
    let lines: Vec<&str> = xusrb.lines().collect();
    assert_eq!(lines[3], " S:'$D(XQVOL) XQVOL=\"ROU\"");
    assert_eq!(lines[6], " S:'$D(XUVOL) XUVOL=\"\"");

    let xus1 = fs::read_to_string(fixture.routines_dir.join("XUS1.m")).unwrap();
    let lines: Vec<&str> = xus1.lines().collect();
    assert_eq!(lines[2], "LOG ;Log the user in");
    assert!(lines[3].starts_with(" S:'$D(XUENV) XUENV=\"\""));
    assert_eq!(
        xus1.matches("S:'$D(XUENV)").count(),
        1,
        "LOGOUT must not be treated as LOG"
    );

    crate::test_log!("TEST PASS: test_patch_routines_inserts_guards");
}

#[test]
fn test_patch_routines_is_idempotent() {
    init_test_logging();
    crate::test_log!("TEST START: test_patch_routines_is_idempotent");

    let fixture = VistaFixture::new();
    seed_both(&fixture);
    assert!(fixture.run(&["patch-routines"]).success());
    let xusrb = fs::read_to_string(fixture.routines_dir.join("XUSRB.m")).unwrap();

    let obj = fixture.write_object(&fixture.object_dirs[0], "XUSRB");
    let out = fixture.run(&["patch-routines"]);

    assert!(out.success());
    assert_contains(&out.stdout, "  Already patched or not found");
    assert_contains(&out.stdout, "  Found label at 3: INHIB1() ;Is Logon");
    assert_contains(&out.stdout, "  Found label at 3: LOG ;Log the user in");
    assert_not_contains(&out.stdout, "Fixed");
    assert_eq!(
        fs::read_to_string(fixture.routines_dir.join("XUSRB.m")).unwrap(),
        xusrb
    );
    assert_path_exists(&obj);

    crate::test_log!("TEST PASS: test_patch_routines_is_idempotent");
}

#[test]
fn test_patch_routines_missing_routine_exits_nonzero() {
    init_test_logging();
    crate::test_log!("TEST START: test_patch_routines_missing_routine_exits_nonzero");

    let fixture = VistaFixture::new();
    fixture.write_routine("XUSRB", XUSRB);

    let out = fixture.run(&["patch-routines"]);

    assert_eq!(out.code, Some(1));
    assert_contains(&out.stdout, "  Patched 2 locations");
    assert_contains(&out.stdout, "ERROR: XUS1.m not found!");
    assert_contains(&out.stderr, "VMH-E100");

    crate::test_log!("TEST PASS: test_patch_routines_missing_routine_exits_nonzero");
}

#[test]
fn test_patch_routines_handles_8bit_source_and_continues() {
    init_test_logging();
    crate::test_log!("TEST START: test_patch_routines_handles_8bit_source_and_continues");

    let fixture = VistaFixture::new();
    let (head, tail) = XUSRB.as_bytes().split_at(6);
    let xusrb = [head, &b"\xff\xfe"[..], tail].concat();
    let xusrb_path = fixture.write_routine("XUSRB", &xusrb);
    fixture.write_routine("XUS1", XUS1);

    let out = fixture.run(&["patch-routines"]);

    assert!(out.success(), "patch-routines failed: {}", out.stderr);
    assert_contains(&out.stdout, "  Fixed INHIB1 at line 3");
    assert_contains(&out.stdout, "  Fixed LOG at line 3");
    assert_not_contains(&out.stdout, "ERROR:");

    let patched = fs::read(&xusrb_path).unwrap();
    assert!(patched.starts_with(b"XUSRB \xff\xfe;SFISC/RWF"));
    let xus1 = fs::read_to_string(fixture.routines_dir.join("XUS1.m")).unwrap();
    assert_contains(&xus1, "S:'$D(XUENV) XUENV=\"\"");

    crate::test_log!("TEST PASS: test_patch_routines_handles_8bit_source_and_continues");
}

#[test]
fn test_patch_routines_finds_nested_lowercase_source() {
    init_test_logging();
    crate::test_log!("TEST START: test_patch_routines_finds_nested_lowercase_source");

    let fixture = VistaFixture::new();
    let nested = fixture.write("vehu/r/kernel/xus1.m", XUS1);

    let out = fixture.run(&["patch-routines", "--routine", "xus1"]);

    assert!(out.success(), "patch-routines failed: {}", out.stderr);
    assert_contains(&out.stdout, &format!("Found: {}", nested.display()));
    assert_not_contains(&out.stdout, "XUSRB");
    assert_contains(&fs::read_to_string(&nested).unwrap(), "S:'$D(XUCI) XUCI=\"\"");

    crate::test_log!("TEST PASS: test_patch_routines_finds_nested_lowercase_source");
}

#[test]
fn test_patch_routines_unknown_routine_is_error() {
    init_test_logging();
    crate::test_log!("TEST START: test_patch_routines_unknown_routine_is_error");

    let fixture = VistaFixture::new();
    let out = fixture.run(&["patch-routines", "--routine", "ZZTEST"]);

    assert_eq!(out.code, Some(1));
    assert_contains(&out.stderr, "No built-in patch for routine ZZTEST");

    crate::test_log!("TEST PASS: test_patch_routines_unknown_routine_is_error");
}

#[test]
fn test_patch_routines_dry_run_json() {
    init_test_logging();
    crate::test_log!("TEST START: test_patch_routines_dry_run_json");

    let fixture = VistaFixture::new();
    seed_both(&fixture);

    let out = fixture.run(&["--json", "patch-routines", "--dry-run"]);

    assert!(out.success());
    let json: serde_json::Value = serde_json::from_str(&out.stdout).expect("report JSON");
    let reports = json.as_array().expect("array of reports");
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0]["routine"], "XUSRB");
    assert_eq!(reports[0]["status"], "patched");
    assert_eq!(reports[0]["insertions"].as_array().unwrap().len(), 2);
    assert_eq!(reports[1]["dry_run"], true);
    assert_eq!(
        fs::read_to_string(fixture.routines_dir.join("XUS1.m")).unwrap(),
        XUS1
    );

    crate::test_log!("TEST PASS: test_patch_routines_dry_run_json");
}
