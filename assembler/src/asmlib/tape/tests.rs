use super::*;
use crate::grammar::Grammar;
use crate::line::parse_line;

fn rebuild(listing: &str) -> String {
    let parsed: Vec<ParsedLine> = listing
        .lines()
        .zip(1..)
        .map(|(text, n)| parse_line(text, n, Grammar::Tape).expect("test listing should parse"))
        .collect();
    let mut out: Vec<u8> = Vec::new();
    RebuiltSource::from_lines(&parsed)
        .write_to(&mut out)
        .expect("writing to a Vec cannot fail");
    String::from_utf8(out).expect("output should be UTF-8")
}

#[test]
fn test_absolute_label() {
    assert_eq!(absolute_label("main", "12r"), "12main");
    assert_eq!(absolute_label("main", "start"), "start");
    assert_eq!(absolute_label("main", "r"), "r");
    assert_eq!(absolute_label("main", "1r2"), "1r2");
}

#[test]
fn test_resolve_opcode() {
    assert_eq!(resolve_opcode("sl"), "slr");
    assert_eq!(resolve_opcode("sr"), "srr");
    assert_eq!(resolve_opcode("p"), ".word");
    assert_eq!(resolve_opcode("ca"), "ca");
}

#[test]
fn test_rebuild_section() {
    let listing = concat!(
        "Tape 7, scope test\n",
        "\t\tsection main\n",
        "\t0\tca 3r\tload it\n",
        "\t1\tsp 0r\n",
        "\t2\tp 0.5\n",
        "\n",
        "\t3\tp 12\n",
    );
    assert_eq!(
        rebuild(listing),
        concat!(
            "; Tape 7, scope test\n",
            "main:\n",
            "0main:    ca 3main             ; load it\n",
            "          sp 0main\n",
            "          .word 0.5\n",
            "3main:    .word 12\n",
        )
    );
}

#[test]
fn test_references_stay_within_section() {
    let listing = concat!(
        "\t\tsection a\n",
        "\t0\tsp 1r\n",
        "\t1\tsi 0\n",
        "\t\tsection b\n",
        "\t0\tsp 0r\n",
        "\t1\tsl 3\n",
    );
    assert_eq!(
        rebuild(listing),
        concat!(
            "a:\n",
            "          sp 1a\n",
            "1a:       si 0\n",
            "b:\n",
            "0b:       sp 0b\n",
            "          slr 3\n",
        )
    );
}

#[test]
fn test_long_label_has_no_padding() {
    let listing = concat!("\t\tsection subroutines\n", "\t5\tsp 5r\n");
    assert_eq!(
        rebuild(listing),
        "subroutines:\n5subroutines: sp 5subroutines\n"
    );
}

#[test]
fn test_opcode_without_operand() {
    assert_eq!(rebuild("\t\tsection s\n\t4\tsi\thalt\n"), format!("s:\n          si{}; halt\n", " ".repeat(18)));
}
