use crate::error::Error;
use crate::job::{OptValue, Options};

fn sample() -> Options {
    let mut options = Options::new();
    options.add_opt("min-length", "Minimal block length", 100i64);
    options.add_opt("min-identity", "Minimal block identity", 0.9);
    options.add_opt("exact", "Require exact match", false);
    options.add_opt("method", "Construction method", "nj");
    options
}

#[test]
fn values_are_typed() {
    let mut options = sample();
    assert_eq!(options.opt_int("min-length").unwrap(), 100);
    assert!(options.opt_bool("min-length").is_err());
    options.set_opt_value("min-length", 250i64).unwrap();
    assert_eq!(options.opt_int("min-length").unwrap(), 250);

    let mismatch = options.set_opt_value("min-length", "tall");
    assert!(matches!(mismatch, Err(Error::OptionValidation { .. })));

    let unknown = options.set_opt_value("max-length", 1i64);
    assert!(matches!(unknown, Err(Error::UnknownOption(_))));
}

#[test]
fn int_reads_as_decimal() {
    let options = sample();
    assert_eq!(options.opt_decimal("min-length").unwrap(), 100.0);
    assert_eq!(options.opt_decimal("min-identity").unwrap(), 0.9);
}

#[test]
fn rules_validate_new_values() {
    let mut options = sample();
    options.add_opt_rule("min-length >= 1").unwrap();
    assert!(options.set_opt_value("min-length", 1i64).is_ok());
    let rejected = options.set_opt_value("min-length", 0i64);
    match rejected {
        Err(Error::OptionValidation { option, message }) => {
            assert_eq!(option, "min-length");
            assert!(message.contains("min-length >= 1"));
        }
        other => panic!("expected a validation error, got {other:?}"),
    }

    options.add_opt_rule("min-identity < 1").unwrap();
    assert!(options.set_opt_value("min-identity", 2.0).is_err());

    assert!(options.add_opt_rule("missing >= 1").is_err());
    assert!(options.add_opt_rule("min-length is big").is_err());
}

#[test]
fn custom_checks_see_the_candidate_value() {
    let mut options = sample();
    options.add_opt_check("method", |value| {
        match value.as_str() {
            Some("nj") | Some("upgma") => Ok(()),
            _ => Err("unknown tree construction method".to_string()),
        }
    });
    assert!(options.set_opt_value("method", "upgma").is_ok());
    assert!(options.set_opt_value("method", "guesswork").is_err());
}

#[test]
fn prefix_applies_to_reported_names() {
    let mut options = sample();
    options.set_prefix("tree-");
    assert_eq!(options.opt_prefixed("method"), "tree-method");
}

#[test]
fn binding_copies_shared_options_only() {
    let mut parent = Options::new();
    parent.add_opt("min-length", "Minimal block length", 500i64);
    parent.add_opt("parent-only", "Not shared", true);
    let mut child = sample();
    child.bind_from(&parent, "min-length").unwrap();
    child.bind_from(&parent, "parent-only").unwrap();
    assert_eq!(child.opt_int("min-length").unwrap(), 500);
    assert!(!child.has_opt("parent-only"));
}

#[test]
fn display_renders_all_types() {
    assert_eq!(OptValue::Bool(true).to_string(), "true");
    assert_eq!(OptValue::Int(-3).to_string(), "-3");
    assert_eq!(OptValue::Decimal(0.5).to_string(), "0.5");
    assert_eq!(OptValue::Str("x".into()).to_string(), "x");
    assert_eq!(
        OptValue::List(vec!["a".into(), "b".into()]).to_string(),
        "a,b"
    );
}
