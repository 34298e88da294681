//! One-shot questions and confirmations answered through a pipe.

mod common;

use quill_app::AppError;
use quill_core::{ColorDepth, Size};
use quill_input::PipeInput;
use quill_output::{MemoryWriter, Vt100Output};
use quill_prompt::ask::ABORTED;
use quill_prompt::{Confirm, Question, Value, ValueType};

fn answer(question: &Question, keys: &str) -> (Result<Value, AppError>, String) {
    let input = PipeInput::new();
    let writer = MemoryWriter::new();
    let output =
        Vt100Output::new(writer.clone(), || Size::new(24, 80)).with_default_color_depth(ColorDepth::Depth8Bit);
    input.send_text(keys);
    let result = question.ask_with(Box::new(input), Box::new(output));
    (result, writer.contents())
}

fn confirm(confirm: &Confirm, keys: &str) -> Result<bool, AppError> {
    let input = PipeInput::new();
    input.send_text(keys);
    let output = Vt100Output::new(MemoryWriter::new(), || Size::new(24, 80));
    confirm.ask_with(Box::new(input), Box::new(output))
}

mod question {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_text_answer() {
        let (value, screen) = answer(&Question::new("Name"), "Ada\r");
        assert_eq!(value.expect("answered"), Value::Text("Ada".into()));
        assert!(common::was_shown(&screen, 80, "Name:> Ada"));
    }

    #[test]
    fn test_empty_answer_uses_default() {
        let (value, screen) = answer(&Question::new("Port").with_default("8080"), "\r");
        assert_eq!(value.expect("answered"), Value::Text("8080".into()));
        assert!(common::was_shown(&screen, 80, "Port [8080]:>"));
    }

    #[test]
    fn test_empty_answer_without_default_asks_again() {
        let (value, _) = answer(&Question::new("Name"), "\rBob\r");
        assert_eq!(value.expect("answered"), Value::Text("Bob".into()));
    }

    #[test]
    fn test_bad_conversion_is_reported_and_retried() {
        let question = Question::new("Count").with_type(ValueType::Integer);
        let (value, screen) = answer(&question, "many\r12\r");
        assert_eq!(value.expect("answered"), Value::Integer(12));
        assert!(screen.contains("Error: 'many' is not a valid integer."));
    }

    #[test]
    fn test_hidden_input_does_not_echo_rejected_value() {
        let question = Question::new("PIN").with_hide(true).with_type(ValueType::Integer);
        let (value, screen) = answer(&question, "12x4\r1234\r");
        assert_eq!(value.expect("answered"), Value::Integer(1234));
        assert!(screen.contains("ERROR: the value you entered was invalid"));
        assert!(!screen.contains("12x4"));
    }

    #[test]
    fn test_confirmation_must_match() {
        let question = Question::new("Password").with_hide(true).with_confirmation(true);
        let (value, screen) = answer(&question, "abc\rabd\rabc\rabc\r");
        assert_eq!(value.expect("answered"), Value::Text("abc".into()));
        assert!(screen.contains("ERROR: The two entered values do not match"));
        assert!(screen.contains("Repeat for confirmation: "));
    }

    #[test]
    fn test_validator_rejects_converted_value() {
        let question = Question::new("Percent")
            .with_type(ValueType::Integer)
            .with_validator(|v| match v.as_integer() {
                Some(n) if n <= 100 => Ok(()),
                _ => Err("at most 100".to_string()),
            });
        let (value, screen) = answer(&question, "150\r50\r");
        assert_eq!(value.expect("answered"), Value::Integer(50));
        assert!(screen.contains("Error: at most 100"));
    }

    #[test]
    fn test_ctrl_c_aborts() {
        let (value, _) = answer(&Question::new("Name"), "\x03");
        match value {
            Err(AppError::Abort(message)) => assert_eq!(message, ABORTED),
            other => panic!("expected abort, got {other:?}"),
        }
    }
}

mod yes_no {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_y_and_n_answer_immediately() {
        assert!(confirm(&Confirm::new("Continue?"), "y").expect("answered"));
        assert!(!confirm(&Confirm::new("Continue?"), "N").expect("answered"));
    }

    #[test]
    fn test_other_keys_are_ignored() {
        assert!(!confirm(&Confirm::new("Delete?"), "xq\rn").expect("answered"));
    }

    #[test]
    fn test_enter_uses_default() {
        assert!(confirm(&Confirm::new("Save?").with_default(true), "\r").expect("answered"));
    }

    #[test]
    fn test_ctrl_c_interrupts() {
        assert!(matches!(
            confirm(&Confirm::new("Go?"), "\x03"),
            Err(AppError::KeyboardInterrupt)
        ));
    }
}
