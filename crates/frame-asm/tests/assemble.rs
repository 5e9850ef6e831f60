//! Integration tests for the FRAME assembler.
//!
//! Byte-level expectations pin the instruction encoding: opcode values,
//! operand layouts, little-endian addresses, and back-patched labels.

use std::collections::HashMap;

use frame_asm::{AsmError, Assembler, Imm, Program, TokenKind};

fn assemble(source: &str) -> Program {
    Assembler::new().assemble(source).expect("assembles")
}

fn assemble_err(source: &str) -> AsmError {
    match Assembler::new().assemble(source) {
        Ok(_) => panic!("expected assembly to fail"),
        Err(err) => err,
    }
}

// ---------------------------------------------------------------------------
// Basic emission
// ---------------------------------------------------------------------------

#[test]
fn hello_register() {
    let program = assemble(".addr 0x200\n@main\nmov $1, 0x2A\nhlt\n");

    // mov AK = opcode 0x04, register byte, immediate byte; hlt O = 0x00.
    assert_eq!(program.image[0x200], 0x04);
    assert_eq!(program.image[0x201], 0x01);
    assert_eq!(program.image[0x202], 0x2A);
    assert_eq!(program.image[0x203], 0x00);
    assert_eq!(program.start, 0x200);
}

#[test]
fn addresses_are_little_endian() {
    let program = assemble(".addr 0x200\nmov $3, %e7c0\n");

    // mov AP = opcode 0x05: register byte, then address low, address high.
    assert_eq!(
        &program.image[0x200..0x204],
        &[0x05, 0x03, 0xC0, 0xE7]
    );
}

#[test]
fn start_defaults_to_zero_without_main() {
    let program = assemble(".addr 0x400\nhlt\n");
    assert_eq!(program.start, 0);
}

#[test]
fn assembly_is_deterministic() {
    let source = ".addr 0x200\n@main\nmov $1, @end\njmp @end\n.byte 1, 2, 3\n@end\nhlt\n";
    let a = Assembler::new().assemble(source).expect("assembles");
    let b = Assembler::new().assemble(source).expect("assembles");
    assert_eq!(a.image[..], b.image[..]);
    assert_eq!(a.start, b.start);
    assert_eq!(a.listing, b.listing);
}

// ---------------------------------------------------------------------------
// Operand layouts
// ---------------------------------------------------------------------------

#[test]
fn register_pair_packs_nibbles() {
    let program = assemble(".addr 0x200\nmov $1, $2\n");

    // mov AB = opcode 0x03; A in the low nibble, B in the high nibble.
    assert_eq!(&program.image[0x200..0x202], &[0x03, 0x21]);
}

#[test]
fn three_register_form_appends_a_byte() {
    let program = assemble(".addr 0x200\nadd $1, $2, $3\n");

    // add ABC = opcode 0x35; packed pair then a full register byte.
    assert_eq!(&program.image[0x200..0x203], &[0x35, 0x21, 0x03]);
}

#[test]
fn offset_load_reorders_to_address_first() {
    let program = assemble(".addr 0x200\nmov $1, %300, $2\n");

    // mov APB = opcode 0x08, emitted address-first: lo, hi, then the pair
    // with the destination in the low nibble.
    assert_eq!(&program.image[0x200..0x204], &[0x08, 0x00, 0x03, 0x21]);
}

#[test]
fn offset_store_keeps_address_first() {
    let program = assemble(".addr 0x200\nmov %300, $1, $2\n");

    // mov PAB = opcode 0x0A: same layout, offset register in the low nibble.
    assert_eq!(&program.image[0x200..0x204], &[0x0A, 0x00, 0x03, 0x21]);
}

#[test]
fn indirect_register_offset_borrows_abk_layout() {
    let program = assemble(".addr 0x200\nmov $2, (10), $3\n");

    // mov AIB = opcode 0x0C: packed pair, indirect byte in the K slot.
    assert_eq!(&program.image[0x200..0x203], &[0x0C, 0x32, 0x10]);
}

#[test]
fn indirect_immediate_offset() {
    let program = assemble(".addr 0x200\nmov $2, (10), 5\n");

    // mov AIK = opcode 0x0D: register byte, indirect byte, immediate.
    assert_eq!(&program.image[0x200..0x204], &[0x0D, 0x02, 0x10, 0x05]);
}

#[test]
fn stack_pointer_in_single_register_slot() {
    let program = assemble(".addr 0x200\npush $s\ninc $s\n");

    assert_eq!(&program.image[0x200..0x204], &[0x3B, 0x10, 0x37, 0x10]);
}

#[test]
fn stack_pointer_cannot_be_packed() {
    let err = assemble_err(".addr 0x200\nmov $s, $1\n");
    assert!(matches!(err, AsmError::SpPacked { line: 2, .. }));
}

// ---------------------------------------------------------------------------
// Labels and back-patching
// ---------------------------------------------------------------------------

#[test]
fn forward_label_is_patched() {
    let program = assemble(".addr 0x200\n@main\njmp @end\n.byte 0xFF\n@end\nhlt\n");

    // jmp P = opcode 0x0E at 0x200; the .byte pads one byte; @end = 0x204.
    assert_eq!(program.image[0x200], 0x0E);
    assert_eq!(program.image[0x201], 0x04);
    assert_eq!(program.image[0x202], 0x02);
    assert_eq!(program.image[0x203], 0xFF);
    assert_eq!(program.image[0x204], 0x00); // hlt at @end
    assert_eq!(program.labels.get("end"), Some(&0x204));
}

#[test]
fn backward_label_resolves_immediately() {
    let program = assemble(".addr 0x200\n@loop\nhlt\njmp @loop\n");
    assert_eq!(&program.image[0x201..0x204], &[0x0E, 0x00, 0x02]);
}

#[test]
fn forward_label_in_offset_mode_patches_past_the_pair() {
    // APB emits address-first, so the patch lands right after the opcode.
    let program = assemble(".addr 0x200\nmov $1, @table, $2\n@table\nhlt\n");
    assert_eq!(&program.image[0x200..0x204], &[0x08, 0x04, 0x02, 0x21]);
}

#[test]
fn forward_label_in_register_load_patches_after_register_byte() {
    // AP carries its register byte first; the address sits one byte later.
    let program = assemble(".addr 0x200\nmov $1, @data\n@data\n.byte 7\n");
    assert_eq!(&program.image[0x200..0x205], &[0x05, 0x01, 0x04, 0x02, 0x07]);
}

#[test]
fn label_byte_references() {
    let program = assemble(
        ".addr 0x200\n.byte @<msg, @>msg\nmov $1, @<msg\n.addr 0x304\n@msg\n.byte 'H'\n",
    );

    assert_eq!(program.image[0x200], 0x04); // low byte of 0x304
    assert_eq!(program.image[0x201], 0x03); // high byte of 0x304
    assert_eq!(&program.image[0x202..0x204], &[0x04, 0x01]); // mov AK
    assert_eq!(program.image[0x204], 0x04); // patched immediate
}

#[test]
fn duplicate_label_is_an_error() {
    let err = assemble_err("@main\nhlt\n@main\nhlt\n");
    assert!(matches!(
        err,
        AsmError::LabelRedefined { name, line: 3, .. } if name == "main"
    ));
}

#[test]
fn underscore_labels_may_be_redefined() {
    // A pending forward reference binds at the first definition; once the
    // label exists, later references bind to the most recent value.
    let program = assemble(
        ".addr 0x200\njmp @_next\n@_next\nhlt\n@_next\njmp @_next\n",
    );

    assert_eq!(&program.image[0x200..0x203], &[0x0E, 0x03, 0x02]);
    assert_eq!(&program.image[0x204..0x207], &[0x0E, 0x04, 0x02]);
}

#[test]
fn unresolved_label_is_an_error() {
    let err = assemble_err(".addr 0x200\njmp @nowhere\n");
    assert!(matches!(
        err,
        AsmError::UnresolvedLabel { name } if name == "nowhere"
    ));
}

#[test]
fn unresolved_byte_reference_is_an_error() {
    let err = assemble_err(".addr 0x200\n.byte @<nowhere\n");
    assert!(matches!(
        err,
        AsmError::UnresolvedLabel { name } if name == "nowhere"
    ));
}

// ---------------------------------------------------------------------------
// Directives
// ---------------------------------------------------------------------------

#[test]
fn byte_and_word_directives() {
    let program = assemble(".addr 0x200\n.byte 1, 'A', 0b11\n.word 0x1234, 7\n");

    assert_eq!(&program.image[0x200..0x203], &[1, 0x41, 3]);
    assert_eq!(&program.image[0x203..0x207], &[0x34, 0x12, 0x07, 0x00]);
}

#[test]
fn addr_directive_moves_the_cursor_anywhere() {
    // Planting the IRQ vector directly is the documented use.
    let program = assemble(
        ".addr 0x200\n@irq\nhlt\n.addr 0xfffc\n.byte @<irq, @>irq\n",
    );
    assert_eq!(program.image[0xFFFC], 0x00);
    assert_eq!(program.image[0xFFFD], 0x02);
}

#[test]
fn def_substitutes_tokens() {
    let program = assemble(
        ".def CURSOR %e7bf\n.def TMP $4\n.def PTR (10)\n.addr 0x200\nmov TMP, CURSOR\nmov $1, PTR, 0\n",
    );

    // mov AP with the defined address, then mov AIK with the defined pointer.
    assert_eq!(&program.image[0x200..0x204], &[0x05, 0x04, 0xBF, 0xE7]);
    assert_eq!(&program.image[0x204..0x208], &[0x0D, 0x01, 0x10, 0x00]);
}

#[test]
fn unknown_directive_is_an_error() {
    let err = assemble_err(".org 0x200\nhlt\n");
    assert!(matches!(
        err,
        AsmError::UnknownDirective { name, line: 1, .. } if name == "org"
    ));
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

#[test]
fn unsupported_mode_reports_the_supported_list() {
    let err = assemble_err(".addr 0x200\nret $1\n");
    match err {
        AsmError::UnsupportedMode {
            mnemonic,
            supported,
            line,
            ..
        } => {
            assert_eq!(mnemonic.to_string(), "ret");
            assert_eq!(supported, "O");
            assert_eq!(line, 2);
        }
        other => panic!("expected UnsupportedMode, got {other:?}"),
    }
}

#[test]
fn immediate_out_of_range_in_operand() {
    let err = assemble_err(".addr 0x200\nmov $1, 0x100\n");
    assert!(matches!(err, AsmError::ImmediateRange { value: 0x100, .. }));
}

#[test]
fn undefined_identifier_is_an_error() {
    let err = assemble_err(".addr 0x200\nmov $1, missing\n");
    assert!(matches!(
        err,
        AsmError::UndefinedName { name, .. } if name == "missing"
    ));
}

#[test]
fn zero_arg_instruction_before_label_definition() {
    // `ret` must not swallow the following label as an argument.
    let program = assemble(".addr 0x200\nret\n@after\nhlt\n");
    assert_eq!(program.labels.get("after"), Some(&0x201));
}

// ---------------------------------------------------------------------------
// Seeded symbols and the listing
// ---------------------------------------------------------------------------

#[test]
fn seeded_labels_are_visible() {
    let mut labels = HashMap::new();
    labels.insert("ktxt_putch".to_string(), 0xE010u16);
    let mut defines = HashMap::new();
    defines.insert(
        "KTXT_ARG".to_string(),
        TokenKind::Register(1),
    );

    let program = Assembler::with_symbols(labels, defines)
        .assemble(".addr 0x200\n@main\nmov KTXT_ARG, 'A'\ncall @ktxt_putch\nhlt\n")
        .expect("assembles");

    assert_eq!(&program.image[0x200..0x203], &[0x04, 0x01, 0x41]);
    assert_eq!(&program.image[0x203..0x206], &[0x39, 0x10, 0xE0]);
}

#[test]
fn listing_maps_offsets_to_text() {
    let program = assemble(".addr 0x200\n@main\nmov $1, 0x2A\nhlt\n");

    assert_eq!(
        program.listing.get(&0x200).map(String::as_str),
        Some("mov $1, 0x2a")
    );
    assert_eq!(program.listing.get(&0x203).map(String::as_str), Some("hlt"));
}

#[test]
fn char_immediates_assemble() {
    let program = assemble(".addr 0x200\nmov $1, '\\n'\npush ' '\n");
    assert_eq!(&program.image[0x200..0x203], &[0x04, 0x01, 0x0A]);
    assert_eq!(&program.image[0x203..0x205], &[0x3C, 0x20]);
}

#[test]
fn immediate_variants_reach_the_define_table() {
    let program = assemble(".def NL 0x0a\n.addr 0x200\npush NL\n");
    assert_eq!(&program.image[0x200..0x202], &[0x3C, 0x0A]);
    assert_eq!(
        program.defines.get("NL"),
        Some(&TokenKind::Immediate(Imm::Value(0x0A)))
    );
}
