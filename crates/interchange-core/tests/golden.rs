mod common;

use interchange_core::{Interpreter, InterchangeError, ParseError, ValidationError};

#[test]
fn test_accepted_samples() {
    let interpreter = Interpreter::in_memory();
    let samples = common::samples("accepted");
    assert!(!samples.is_empty());

    for (name, source) in samples {
        let expr = interpreter
            .check(&source)
            .unwrap_or_else(|e| panic!("{} should be accepted: {}", name, e));
        // The canonical rendering is itself an accepted program.
        assert!(interpreter.test_output(&expr.to_string()), "{}", name);
    }
}

#[test]
fn test_rejected_samples() {
    let interpreter = Interpreter::in_memory();
    let samples = common::samples("rejected");
    assert!(!samples.is_empty());

    for (name, source) in samples {
        assert!(!interpreter.test_output(&source), "{} should be rejected", name);

        let err = interpreter.check(&source).unwrap_err();
        let matched = match name.as_str() {
            n if n.starts_with("syntax_") => {
                matches!(err, InterchangeError::Parse(ParseError::Syntax { .. }))
            }
            n if n.starts_with("malformed_lambda_") => {
                matches!(err, InterchangeError::Parse(ParseError::MalformedLambda { .. }))
            }
            n if n.starts_with("malformed_if_") => {
                matches!(err, InterchangeError::Parse(ParseError::MalformedIf { .. }))
            }
            "nesting_too_deep" => {
                matches!(err, InterchangeError::Parse(ParseError::NestingTooDeep { .. }))
            }
            "duplicate_param" => matches!(
                err,
                InterchangeError::Validation(ValidationError::DuplicateParam { .. })
            ),
            "reserved_name" => matches!(
                err,
                InterchangeError::Validation(ValidationError::ReservedName { .. })
            ),
            other => panic!("No expectation for sample {}", other),
        };
        assert!(matched, "{} rejected with unexpected error: {:?}", name, err);
    }
}

#[tokio::test]
async fn test_samples_round_trip_through_store() {
    let interpreter = Interpreter::in_memory();

    let mut hashes = Vec::new();
    for (name, source) in common::samples("accepted") {
        let hash = interpreter
            .create_interchange_entry_parse(&source, &[])
            .await
            .unwrap_or_else(|e| panic!("{} failed to store: {}", name, e));
        let entry = interpreter.get_interchange_entry(&hash).await.unwrap();
        assert_eq!(entry.operator, source, "{}", name);
        hashes.push(hash);
    }

    for (name, source) in common::samples("rejected") {
        assert!(
            interpreter
                .create_interchange_entry_parse(&source, &[])
                .await
                .is_err(),
            "{}",
            name
        );
    }

    hashes.sort();
    assert_eq!(interpreter.list_interchange_entries().await.unwrap(), hashes);
}
