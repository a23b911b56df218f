use std::collections::HashMap;

use super::*;
use crate::ast::Expression;

struct FakeMachine {
    registers: HashMap<&'static str, i64>,
    memory: HashMap<u16, Word>,
}

impl FakeMachine {
    fn new() -> FakeMachine {
        FakeMachine {
            registers: HashMap::from([("ac", 5), ("pc", 0o40)]),
            memory: HashMap::from([(0o100, Word::from_bits(0o123)), (0o101, Word::NEGATIVE_ZERO)]),
        }
    }
}

impl DebugTarget for FakeMachine {
    fn read_register(&self, name: &str) -> Option<i64> {
        self.registers.get(name).copied()
    }

    fn read_memory(&self, address: Address) -> Option<Word> {
        Some(self.memory.get(&address.bits()).copied().unwrap_or_default())
    }

    fn disassemble(&self, address: Address) -> String {
        format!("insn at {address:o}")
    }
}

fn debugger() -> Debugger {
    let mut symbols = SymbolTable::new();
    symbols.define("x", 0o100).expect("fresh symbol");
    symbols.define("y", 0o200).expect("fresh symbol");
    Debugger::new(symbols)
}

fn run(dbg: &mut Debugger, line: &str) -> (Result<Control, DebuggerError>, String) {
    let machine = FakeMachine::new();
    let mut out: Vec<u8> = Vec::new();
    let result = dbg.execute_line(line, &machine, &mut out);
    (result, String::from_utf8(out).expect("output should be UTF-8"))
}

fn run_ok(dbg: &mut Debugger, line: &str) -> String {
    let (result, output) = run(dbg, line);
    assert_eq!(result.expect("command should succeed"), Control::Stay);
    output
}

#[test]
fn test_command_names() {
    assert_eq!(Command::from_name("p"), Some(Command::Print));
    assert_eq!(Command::from_name("help"), Some(Command::Help));
    assert_eq!(Command::from_name("h"), Some(Command::Help));
    assert_eq!(Command::from_name("q"), None);
}

#[test]
fn test_print_command_arguments_evaluate_to_address() {
    let mut line = parse_line("p x, 3, o", 0, Grammar::Debugger).expect("valid command");
    assert_eq!(line.opcode, "p");
    let operand = line.operand.as_mut().expect("p has arguments");
    operand.quote_arguments(&[2]);
    assert_eq!(
        operand.arguments(),
        vec![
            &Expression::identifier("x"),
            &Expression::digits("3"),
            &Expression::string("o"),
        ]
    );

    let symbols = {
        let mut s = SymbolTable::new();
        s.define("x", 0o100).expect("fresh symbol");
        s
    };
    let env = Environment::new(&symbols);
    let value = operand.evaluate(&env).expect("arguments evaluate");
    assert_eq!(
        value,
        EvaluatedValue::List(vec![
            EvaluatedValue::address(0o100),
            EvaluatedValue::integer(3),
            EvaluatedValue::String("o".to_string()),
        ])
    );
}

#[test]
fn test_print_rejects_three_arguments() {
    // p takes a value and a format; a count belongs to pb.
    let mut dbg = debugger();
    let (result, output) = run(&mut dbg, "p x, 3, o");
    match result {
        Err(DebuggerError::BadArguments(msg)) => {
            assert_eq!(msg, "p takes an expression and an optional format");
        }
        other => panic!("expected BadArguments, got {other:?}"),
    }
    assert_eq!(output, "");
    assert_eq!(
        run_ok(&mut dbg, "pb x, 1, o"),
        "0o100(x):\n  0o100 = 0o000123\n"
    );
}

#[test]
fn test_print_address_shows_contents() {
    let mut dbg = debugger();
    assert_eq!(run_ok(&mut dbg, "p x"), "0o100(x) = 0o000123\n");
    assert_eq!(run_ok(&mut dbg, "p x, d"), "0d64(x) = 83\n");
    assert_eq!(run_ok(&mut dbg, "p x, i"), "0o100(x) = insn at 100\n");
}

#[test]
fn test_print_register_shows_value() {
    let mut dbg = debugger();
    assert_eq!(run_ok(&mut dbg, "p pc"), "pc = 40\n");
    assert_eq!(run_ok(&mut dbg, "p pc, d"), "pc = 32\n");
}

#[test]
fn test_print_literal_shows_value() {
    let mut dbg = debugger();
    assert_eq!(run_ok(&mut dbg, "p 0o17"), "0o17 = 17\n");
    assert_eq!(run_ok(&mut dbg, "p 12, d"), "12 = 12\n");
}

#[test]
fn test_print_errors() {
    let mut dbg = debugger();
    assert!(matches!(
        run(&mut dbg, "p nowhere").0,
        Err(DebuggerError::Eval(EvalError::UndefinedSymbol(name))) if name == "nowhere"
    ));
    assert!(matches!(
        run(&mut dbg, "p x, zz").0,
        Err(DebuggerError::BadArguments(_))
    ));
    assert!(matches!(
        run(&mut dbg, "p").0,
        Err(DebuggerError::BadArguments(_))
    ));
    assert!(matches!(
        run(&mut dbg, "p (x").0,
        Err(DebuggerError::Syntax(_))
    ));
}

#[test]
fn test_print_block() {
    let mut dbg = debugger();
    assert_eq!(
        run_ok(&mut dbg, "pb x, 3"),
        "0o100(x):\n  0o100 = 0o000123\n  0o101 = 0o177777\n  0o102 = 0o000000\n"
    );
    assert_eq!(
        run_ok(&mut dbg, "pb x, 2, d"),
        "0d64(x):\n  0d64 = 83\n  0d65 = -0\n"
    );
}

#[test]
fn test_print_block_beyond_memory() {
    let mut dbg = debugger();
    assert_eq!(
        run_ok(&mut dbg, "pb 0o3777, 2"),
        "0o3777(0o3777):\n  0o3777 = 0o000000\n  0o4000 = <addr-out-of-range>\n"
    );
    assert_eq!(
        run_ok(&mut dbg, "pb 0o3776, 9223372036854775807"),
        concat!(
            "0o3776(0o3776):\n",
            "  0o3776 = 0o000000\n",
            "  0o3777 = 0o000000\n",
            "  0o4000 = <addr-out-of-range>\n",
        )
    );
    assert_eq!(
        run_ok(&mut dbg, "pb 0o5000, 100"),
        "0o5000(0o5000):\n  0o5000 = <addr-out-of-range>\n"
    );
    // One header, every word of core, and one marker row.
    assert_eq!(run_ok(&mut dbg, "pb 0, 200000").lines().count(), 1 + 0o4000 + 1);
}

#[test]
fn test_breakpoints() {
    let mut dbg = debugger();
    assert_eq!(run_ok(&mut dbg, "b x, 0o300"), "0 0o100(x)\n1 0o300\n");
    // Setting it again reuses the id.
    assert_eq!(run_ok(&mut dbg, "b 0o100"), "0 0o100(x)\n");
    assert!(dbg.has_breakpoint(Address::try_from(0o300).expect("valid address")));
    assert_eq!(run_ok(&mut dbg, "bl"), "0 0o100(x)\n1 0o300\n");
    assert_eq!(run_ok(&mut dbg, "bd 0, 7"), "");
    assert_eq!(run_ok(&mut dbg, "bl"), "1 0o300\n");
    assert_eq!(run_ok(&mut dbg, "b y"), "2 0o200(y)\n");
}

#[test]
fn test_breakpoint_out_of_range() {
    let mut dbg = debugger();
    assert!(matches!(
        run(&mut dbg, "b 0o4000").0,
        Err(DebuggerError::AddressOutOfRange(0o4000))
    ));
    assert!(matches!(
        run(&mut dbg, "b").0,
        Err(DebuggerError::BadArguments(_))
    ));
}

#[test]
fn test_program_control() {
    let mut dbg = debugger();
    assert_eq!(run(&mut dbg, "r").0.expect("r succeeds"), Control::Leave);
    assert_eq!(dbg.state(), ProgramState::Running);
    assert_eq!(run(&mut dbg, "s").0.expect("s succeeds"), Control::Leave);
    assert_eq!(dbg.state(), ProgramState::Stepping);
    assert_eq!(run(&mut dbg, "rs").0.expect("rs succeeds"), Control::Leave);
    assert_eq!(dbg.state(), ProgramState::Restarting);
    assert_eq!(run(&mut dbg, "").0.expect("blank succeeds"), Control::Leave);
    assert_eq!(dbg.state(), ProgramState::Stepping);
    assert_eq!(run(&mut dbg, "quit").0.expect("quit succeeds"), Control::Quit);
}

#[test]
fn test_unknown_command() {
    let mut dbg = debugger();
    assert_eq!(run_ok(&mut dbg, "frobnicate 3"), "Unknown command\n");
}

#[test]
fn test_help_lists_every_command() {
    let mut dbg = debugger();
    let output = run_ok(&mut dbg, "help");
    for name in ["p\t", "pb\t", "r\t", "s\t", "rs\t", "b\t", "bd\t", "bl\t", "h\t", "quit\t"] {
        assert!(
            output.lines().any(|line| line.starts_with(name)),
            "help output lacks {name:?}: {output}"
        );
    }
}

#[test]
fn test_repl_session() {
    let mut dbg = debugger();
    let machine = FakeMachine::new();
    let pc = Address::try_from(0o40).expect("valid address");
    let mut input: &[u8] = b"p x\nwhat\np (\nr\n";
    let mut out: Vec<u8> = Vec::new();
    let resumption = dbg
        .repl(pc, &machine, &mut input, &mut out)
        .expect("no I/O errors");
    assert_eq!(resumption, Resumption::Continue);
    assert_eq!(
        String::from_utf8(out).expect("UTF-8"),
        concat!(
            "40: insn at 40\n",
            "dbg 40> 0o100(x) = 0o000123\n",
            "dbg 40> Unknown command\n",
            "dbg 40> Unbalanced parentheses: \np (\n   ^\n",
            "dbg 40> ",
        )
    );
    assert_eq!(dbg.state(), ProgramState::Running);

    // Running, and no breakpoint here: no prompt.
    let mut out: Vec<u8> = Vec::new();
    let resumption = dbg
        .repl(pc, &machine, &mut &b""[..], &mut out)
        .expect("no I/O errors");
    assert_eq!(resumption, Resumption::Continue);
    assert!(out.is_empty());
}

#[test]
fn test_repl_stops_at_breakpoint() {
    let mut dbg = debugger();
    let machine = FakeMachine::new();
    let mut sink: Vec<u8> = Vec::new();
    dbg.execute_line("b x", &machine, &mut sink)
        .expect("breakpoint is valid");
    dbg.execute_line("r", &machine, &mut sink)
        .expect("r is valid");

    let at_x = Address::try_from(0o100).expect("valid address");
    let mut input: &[u8] = b"rs\n";
    let resumption = dbg
        .repl(at_x, &machine, &mut input, &mut sink)
        .expect("no I/O errors");
    assert_eq!(resumption, Resumption::Restart);
    assert_eq!(dbg.state(), ProgramState::Running);

    let mut input: &[u8] = b"";
    let resumption = dbg
        .repl(at_x, &machine, &mut input, &mut sink)
        .expect("no I/O errors");
    assert_eq!(resumption, Resumption::Quit);
}

#[test]
fn test_reset_keeps_breakpoints() {
    let mut dbg = debugger();
    assert_eq!(dbg.add_breakpoint(0o10).expect("in range"), 0);
    dbg.reset(SymbolTable::new());
    assert_eq!(dbg.state(), ProgramState::Stopped);
    assert!(dbg.has_breakpoint(Address::try_from(0o10).expect("valid address")));
    assert_eq!(dbg.delete_breakpoint(0), Address::try_from(0o10).ok());
}
