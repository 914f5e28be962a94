//! The goodload/badload/goodstore/badstore scenario against compiled fixtures.

use linmem::harness::{self, Outcome, BOUNDS_SCENARIO};
use linmem::{Trap, Value, OUT_OF_RANGE, PAGE_SIZE};
use linmem_tests::{instantiate, ARRAY, ARRAY_IN_RANGE};

#[test]
fn test_conforming_module_output() {
    let mut instance = instantiate(ARRAY).unwrap();
    let report = harness::run(&mut instance, BOUNDS_SCENARIO).unwrap();
    assert!(report.passed(), "{report}");
    assert_eq!(report.to_string(), "0\nPASSED\nPASSED\nPASSED\nPASSED\n");
}

#[test]
fn test_broken_module_reports_failures() {
    let mut instance = instantiate(ARRAY_IN_RANGE).unwrap();
    let report = harness::run(&mut instance, BOUNDS_SCENARIO).unwrap();
    assert!(!report.passed());
    // badload(0) and badstore(0) both return instead of trapping.
    assert_eq!(report.failures(), 2);
    let failed: Vec<_> = report
        .steps
        .iter()
        .filter(|s| !s.passed())
        .map(|s| s.step.export)
        .collect();
    assert_eq!(failed, vec!["badload", "badstore"]);
}

#[test]
fn test_last_byte_is_writable_and_readable() {
    let mut instance = instantiate(ARRAY).unwrap();
    let last = PAGE_SIZE as i32 - 1;
    instance.call("goodstore", &[Value::I32(last)]).unwrap();
    let out = instance.call("goodload", &[Value::I32(last)]).unwrap();
    assert_eq!(out, vec![Value::I32(255)]);
}

#[test]
fn test_trap_details() {
    let mut instance = instantiate(ARRAY).unwrap();
    let err = instance.call("badload", &[Value::I32(0)]).unwrap_err();
    assert!(err.to_string().contains(OUT_OF_RANGE));
    assert_eq!(
        err.downcast_ref::<Trap>(),
        Some(&Trap::OutOfRangeAccess {
            addr: 65536,
            width: 1,
            memory_size: PAGE_SIZE,
        })
    );
}

#[test]
fn test_failed_store_leaves_memory_untouched() {
    let mut instance = instantiate(ARRAY).unwrap();
    let before = instance.memory().unwrap().clone();
    assert!(instance.call("goodstore", &[Value::I32(65536)]).is_err());
    assert!(instance.call("badstore", &[Value::I32(0)]).is_err());
    assert_eq!(instance.memory().unwrap(), &before);
}

#[test]
fn test_negative_address_is_out_of_range() {
    // -1 is the unsigned address 0xFFFF_FFFF.
    let mut instance = instantiate(ARRAY).unwrap();
    let err = instance.call("goodload", &[Value::I32(-1)]).unwrap_err();
    assert!(err.to_string().contains(OUT_OF_RANGE));
}

#[test]
fn test_instance_survives_traps() {
    let mut instance = instantiate(ARRAY).unwrap();
    let report = harness::run(&mut instance, BOUNDS_SCENARIO).unwrap();
    assert!(report
        .steps
        .iter()
        .any(|s| matches!(s.outcome, Outcome::Passed)));
    // goodstore(0) stored 255 during the scenario.
    let out = instance.call("goodload", &[Value::I32(0)]).unwrap();
    assert_eq!(out, vec![Value::I32(255)]);
}
