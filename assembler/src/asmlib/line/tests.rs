use super::*;
use crate::ast::{BinaryOperator, UnaryOperator};
use crate::types::Location;

fn parse_asm(text: &str) -> (bool, ParsedLine) {
    let mut parser = LineParser::new(text, 1, Grammar::Assembly);
    let has_instruction = parser.parse_line().expect("test input should be valid");
    (has_instruction, parser.into_parsed_line())
}

fn asm_error(text: &str) -> SyntaxError {
    let mut parser = LineParser::new(text, 1, Grammar::Assembly);
    parser.parse_line().expect_err("test input should be invalid")
}

#[test]
fn test_comment_only_line() {
    let (has_instruction, line) = parse_asm("   ;comment only\n");
    assert!(!has_instruction);
    assert_eq!(line.opcode, "");
    assert_eq!(line.operand, None);
    assert_eq!(line.postfix_comment, "comment only");
    assert_eq!(line.raw_text, "   ;comment only");
}

#[test]
fn test_blank_line() {
    let (has_instruction, line) = parse_asm("\n");
    assert!(!has_instruction);
    assert_eq!(line, ParsedLine {
        line_number: 1,
        ..ParsedLine::default()
    });
}

#[test]
fn test_simple_instruction() {
    let (has_instruction, line) = parse_asm("ca x + 1 ; load");
    assert!(has_instruction);
    assert_eq!(line.label, None);
    assert_eq!(line.opcode, "ca");
    assert_eq!(
        line.operand,
        Some(Expression::binary(
            BinaryOperator::Plus,
            Expression::identifier("x"),
            Expression::digits("1")
        ))
    );
    assert_eq!(line.postfix_comment, "load");
}

#[test]
fn test_opcode_without_operand() {
    let (has_instruction, line) = parse_asm("si");
    assert!(has_instruction);
    assert_eq!(line.opcode, "si");
    assert_eq!(line.operand, None);
}

#[test]
fn test_label() {
    let (has_instruction, line) = parse_asm("loop: ad 0o10 @@ 0o1234");
    assert!(has_instruction);
    assert_eq!(line.label.as_deref(), Some("loop"));
    assert_eq!(line.opcode, "ad");
    assert_eq!(
        line.operand,
        Some(Expression::unary(
            UnaryOperator::OctalPrefix,
            Expression::digits("10")
        ))
    );
    assert_eq!(line.auto_comment, "0o1234");
}

#[test]
fn test_label_alone() {
    let (has_instruction, line) = parse_asm("12r:");
    assert!(!has_instruction);
    assert_eq!(line.label.as_deref(), Some("12r"));
}

#[test]
fn test_directive() {
    let (has_instruction, line) = parse_asm(".org 0o40");
    assert!(has_instruction);
    assert!(line.is_directive);
    assert_eq!(line.opcode, "org");
    assert_eq!(line.to_string(), ".org 0o40");
}

#[test]
fn test_exec_takes_rest_of_line() {
    let (has_instruction, line) = parse_asm("start: .exec print(\"a;b\", x+1)\n");
    assert!(has_instruction);
    assert_eq!(line.label.as_deref(), Some("start"));
    assert_eq!(line.opcode, "exec");
    assert_eq!(
        line.operand,
        Some(Expression::string("print(\"a;b\", x+1)"))
    );
    assert_eq!(line.to_string(), "start: .exec print(\"a;b\", x+1)");
}

#[test]
fn test_prefix_address() {
    let (has_instruction, line) = parse_asm("@0040:000012 start: ca 0o12 ; first");
    assert!(has_instruction);
    assert_eq!(
        line.prefix_address,
        Some(PrefixAddress {
            address: "0040".to_string(),
            offset: None,
            contents: "000012".to_string(),
        })
    );
    assert_eq!(line.label.as_deref(), Some("start"));
    assert_eq!(line.to_string(), "@0040:000012 start: ca 0o12 ; first");
}

#[test]
fn test_prefix_address_with_offset() {
    let (_, line) = parse_asm("@0040.3:000012");
    assert_eq!(
        line.prefix_address.map(|p| p.to_string()).as_deref(),
        Some("@0040.3:000012")
    );
}

#[test]
fn test_bad_prefix_address() {
    let err = asm_error("@x:1 ca 1");
    assert_eq!(err.kind, SyntaxErrorKind::BadPrefixAddress);
    assert_eq!(err.location, Location { line: 1, column: 1 });
    let err = asm_error("@1;");
    assert_eq!(err.kind, SyntaxErrorKind::BadPrefixAddress);
}

#[test]
fn test_conditional() {
    let (has_instruction, line) = parse_asm(".if debug out: qh 7");
    assert!(has_instruction);
    assert_eq!(line.condition, Some(Expression::identifier("debug")));
    assert_eq!(line.label.as_deref(), Some("out"));
    assert_eq!(line.opcode, "qh");
    assert_eq!(line.to_string(), ".if debug out: qh 7");
}

#[test]
fn test_minus_idiom_in_operand() {
    let (_, line) = parse_asm("ca (-)");
    assert_eq!(line.operand, Some(Expression::digits("0")));
}

#[test]
fn test_directive_needs_name() {
    let err = asm_error(". 5");
    assert_eq!(err.kind, SyntaxErrorKind::ExpectedOpname);
}

#[test]
fn test_trailing_junk() {
    let err = asm_error("ca x )");
    assert_eq!(err.kind, SyntaxErrorKind::UnexpectedToken("')'".to_string()));
    assert_eq!(err.location.column, 5);
}

#[test]
fn test_unbalanced_operand() {
    let err = asm_error("ca foo(");
    assert_eq!(err.kind, SyntaxErrorKind::UnbalancedParentheses);
    assert_eq!(err.diagnostic(), "Unbalanced parentheses: \nca foo(\n       ^\n");
}

#[test]
fn test_line_number_is_recorded() {
    let mut parser = LineParser::new("ca $", 42, Grammar::Assembly);
    let err = parser.parse_line().expect_err("$ is illegal");
    assert_eq!(err.location, Location { line: 42, column: 3 });
}

#[test]
fn test_display_reparses_identically() {
    for text in [
        "ca x + 1 ; load",
        "@0040:000012 .if a b: c (d, e) ; f @@ g",
        ".word -0.5",
        "lbl:",
        "; just a comment",
        "@@ listing only",
    ] {
        let (_, first) = parse_asm(text);
        let (_, second) = parse_asm(&first.to_string());
        assert_eq!(
            ParsedLine {
                raw_text: String::new(),
                ..first
            },
            ParsedLine {
                raw_text: String::new(),
                ..second
            }
        );
    }
}

fn parse_tape(text: &str) -> (bool, ParsedLine) {
    let mut parser = LineParser::new(text, 1, Grammar::Tape);
    let has_instruction = parser.parse_line().expect("test input should be valid");
    (has_instruction, parser.into_parsed_line())
}

#[test]
fn test_tape_instruction_line() {
    let (has_instruction, line) = parse_tape("store it\t12\tts 3r\tsave ac\n");
    assert!(has_instruction);
    assert_eq!(line.prefix_comment, "store it");
    assert_eq!(line.prefix_offset, Some(12));
    assert_eq!(line.opcode, "ts");
    assert_eq!(line.operand, Some(Expression::identifier("3r")));
    assert_eq!(line.postfix_comment, "save ac");
}

#[test]
fn test_tape_empty_offset_field() {
    let (has_instruction, line) = parse_tape("\t\tsection main");
    assert!(has_instruction);
    assert_eq!(line.prefix_offset, None);
    assert_eq!(line.opcode, "section");
    assert_eq!(line.operand, Some(Expression::identifier("main")));
}

#[test]
fn test_tape_comment_line() {
    let (has_instruction, line) = parse_tape("Tape 103, program for the scope");
    assert!(!has_instruction);
    assert_eq!(line.prefix_comment, "Tape 103, program for the scope");
}

#[test]
fn test_tape_offset_without_instruction() {
    let (has_instruction, line) = parse_tape("\t7");
    assert!(!has_instruction);
    assert_eq!(line.prefix_offset, Some(7));
}

#[test]
fn test_tape_minus_idiom() {
    let (_, line) = parse_tape("\t3\tca (-)");
    assert_eq!(line.operand, Some(Expression::digits("0")));
}

#[test]
fn test_tape_postfix_keeps_tabs() {
    let (_, line) = parse_tape("\t3\tsp 0\tsee\tbelow");
    assert_eq!(line.postfix_comment, "see\tbelow");
}

fn parse_dbg(text: &str) -> Result<(bool, ParsedLine), SyntaxError> {
    let mut parser = LineParser::new(text, 1, Grammar::Debugger);
    let has_instruction = parser.parse_line()?;
    Ok((has_instruction, parser.into_parsed_line()))
}

#[test]
fn test_debugger_command() {
    let (has_instruction, line) = parse_dbg("p x, 3, o").expect("valid command");
    assert!(has_instruction);
    assert_eq!(line.opcode, "p");
    let operand = line.operand.expect("p has arguments");
    assert_eq!(
        operand.arguments(),
        vec![
            &Expression::identifier("x"),
            &Expression::digits("3"),
            &Expression::identifier("o"),
        ]
    );
}

#[test]
fn test_debugger_command_without_arguments() {
    let (has_instruction, line) = parse_dbg("bl").expect("valid command");
    assert!(has_instruction);
    assert_eq!(line.operand, None);
    let (has_instruction, _) = parse_dbg("   ").expect("blank is fine");
    assert!(!has_instruction);
}

#[test]
fn test_debugger_needs_command_name() {
    let err = parse_dbg("12 x").expect_err("12 is not a command");
    assert_eq!(
        err.kind,
        SyntaxErrorKind::ExpectedCommandName("number 12".to_string())
    );
}

#[test]
fn test_expression_line() {
    let mut parser = LineParser::new("a = b + 1;", 1, Grammar::Expression);
    assert_eq!(parser.parse_line(), Ok(true));
    assert!(matches!(
        parser.parsed_line().operand,
        Some(Expression::Binary {
            op: BinaryOperator::Assign,
            ..
        })
    ));
}

#[test]
fn test_parse_line_function() {
    let line = parse_line("ca 5", 3, Grammar::Assembly).expect("valid");
    assert_eq!(line.line_number, 3);
    assert!(line.has_instruction());
}
