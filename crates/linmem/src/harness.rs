//! Bounds-checking conformance scenario.
//!
//! Drives a module exporting `goodload`, `badload`, `goodstore` and
//! `badstore` (each taking one i32 address) through a fixed sequence of
//! calls against a one-page memory. Steps that must trap pass only when the
//! error message contains [`OUT_OF_RANGE`]; the message text is the
//! contract, not the error type.

use std::fmt;

use anyhow::Result;
use linmem_runtime::OUT_OF_RANGE;
use tracing::warn;

use crate::instance::Instance;
use crate::value::Value;

/// What a step expects of its call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    /// The call returns normally. `echo` prints the returned value.
    Returns { echo: bool },
    /// The call traps with an "out of range" message.
    TrapsOutOfRange,
}

/// One call in a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub export: &'static str,
    pub arg: i32,
    pub expect: Expect,
}

const fn step(export: &'static str, arg: i32, expect: Expect) -> Step {
    Step {
        export,
        arg,
        expect,
    }
}

/// The standard one-page scenario: the first and last byte are reachable,
/// the byte just past the end and any access displaced by a 64 KiB static
/// offset are not.
pub const BOUNDS_SCENARIO: &[Step] = &[
    step("goodload", 0, Expect::Returns { echo: true }),
    step("badload", 0, Expect::TrapsOutOfRange),
    step("badstore", 0, Expect::TrapsOutOfRange),
    step("goodload", 65535, Expect::Returns { echo: false }),
    step("goodload", 65536, Expect::TrapsOutOfRange),
    step("goodstore", 0, Expect::Returns { echo: false }),
    step("goodstore", 65535, Expect::Returns { echo: false }),
    step("goodstore", 65536, Expect::TrapsOutOfRange),
];

/// Result of a single step.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Returned as expected, with the values it produced.
    Returned(Vec<Value>),
    /// Trapped with an "out of range" message, as expected.
    Passed,
    /// Anything else; the string explains what happened instead.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    pub step: Step,
    pub outcome: Outcome,
}

impl StepReport {
    pub fn passed(&self) -> bool {
        !matches!(self.outcome, Outcome::Failed(_))
    }

    /// The line printed for this step, if any.
    ///
    /// Echoing steps print their values, trap steps print `PASSED`, quiet
    /// successful steps print nothing, and failures always print.
    pub fn line(&self) -> Option<String> {
        match (&self.outcome, self.step.expect) {
            (Outcome::Returned(values), Expect::Returns { echo: true }) => Some(
                values
                    .iter()
                    .map(Value::to_string)
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
            (Outcome::Returned(_), _) => None,
            (Outcome::Passed, _) => Some("PASSED".to_string()),
            (Outcome::Failed(reason), _) => Some(format!(
                "FAILED: {}({}): {reason}",
                self.step.export, self.step.arg
            )),
        }
    }
}

/// Results of a whole scenario.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Report {
    pub steps: Vec<StepReport>,
}

impl Report {
    pub fn passed(&self) -> bool {
        self.steps.iter().all(StepReport::passed)
    }

    pub fn failures(&self) -> usize {
        self.steps.iter().filter(|s| !s.passed()).count()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.steps.iter().filter_map(StepReport::line) {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

/// Run `steps` against `instance`.
///
/// A missing export is an error for the whole run; call failures are
/// recorded per step and never abort the scenario.
pub fn run(instance: &mut Instance, steps: &[Step]) -> Result<Report> {
    for step in steps {
        instance.func(step.export)?;
    }

    let mut report = Report::default();
    for &step in steps {
        let result = instance.call(step.export, &[Value::I32(step.arg)]);
        let outcome = match (step.expect, result) {
            (Expect::Returns { .. }, Ok(values)) => Outcome::Returned(values),
            (Expect::Returns { .. }, Err(err)) => Outcome::Failed(err.to_string()),
            (Expect::TrapsOutOfRange, Ok(values)) => {
                Outcome::Failed(format!("returned {values:?} instead of trapping"))
            }
            (Expect::TrapsOutOfRange, Err(err)) => {
                let message = err.to_string();
                if message.contains(OUT_OF_RANGE) {
                    Outcome::Passed
                } else {
                    Outcome::Failed(message)
                }
            }
        };
        if let Outcome::Failed(reason) = &outcome {
            warn!(export = step.export, arg = step.arg, %reason, "conformance step failed");
        }
        report.steps.push(StepReport { step, outcome });
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::{Imports, InstanceOptions};

    fn instance(wat: &str) -> Instance {
        let wasm = wat::parse_str(wat).unwrap();
        Instance::instantiate(&wasm, Imports::new(), &InstanceOptions::default()).unwrap()
    }

    const CONFORMING: &str = r#"
        (module
            (memory 1 1)
            (func (export "goodload") (param i32) (result i32)
                local.get 0 i32.load8_u)
            (func (export "badload") (param i32) (result i32)
                local.get 0 i32.load8_u offset=65536)
            (func (export "goodstore") (param i32)
                local.get 0 i32.const 1 i32.store8)
            (func (export "badstore") (param i32)
                local.get 0 i32.const 1 i32.store8 offset=65536))
    "#;

    #[test]
    fn conforming_module_passes() {
        let mut inst = instance(CONFORMING);
        let report = run(&mut inst, BOUNDS_SCENARIO).unwrap();
        assert!(report.passed(), "{report}");
        assert_eq!(
            report.to_string(),
            "0\nPASSED\nPASSED\nPASSED\nPASSED\n"
        );
    }

    #[test]
    fn in_range_bad_access_fails() {
        // "badload" reads in range, so it returns instead of trapping.
        let wat = CONFORMING.replace("i32.load8_u offset=65536", "i32.load8_u offset=1");
        let mut inst = instance(&wat);
        let report = run(&mut inst, BOUNDS_SCENARIO).unwrap();
        assert!(!report.passed());
        assert_eq!(report.failures(), 1);
        let failed = report.steps.iter().find(|s| !s.passed()).unwrap();
        assert_eq!(failed.step.export, "badload");
        assert!(failed.line().unwrap().starts_with("FAILED: badload(0)"));
    }

    #[test]
    fn wrong_trap_kind_fails() {
        let wat = CONFORMING.replace(
            "local.get 0 i32.const 1 i32.store8 offset=65536",
            "unreachable",
        );
        let mut inst = instance(&wat);
        let report = run(&mut inst, BOUNDS_SCENARIO).unwrap();
        assert_eq!(report.failures(), 1);
    }

    #[test]
    fn missing_export_is_an_error() {
        let mut inst = instance(r#"(module (memory 1))"#);
        assert!(run(&mut inst, BOUNDS_SCENARIO).is_err());
    }
}
