use std::collections::HashSet;

use mipt_emu::decoder::{Decoder, Operand, TableDecoder};
use mipt_emu::disasm::fmt_decoded;
use mipt_emu::encoder::encode;
use mipt_emu::isa::{Field, Isa, Layout, MIPT32, MIPT64};
use mipt_emu::{assemble, Profile};
use pretty_assertions::assert_eq;

fn layout_forms(l: &Layout) -> Vec<Vec<Field>> {
    let regs: Vec<Field> = [l.rd, l.rs].into_iter().flatten().collect();
    let mut forms = vec![[regs.clone(), vec![l.literal]].concat()];
    if let Some(sc) = l.scaled {
        forms.push([regs.clone(), vec![sc.index, sc.shift, sc.offset]].concat());
        if let Some(w) = sc.wide {
            forms.push([regs.clone(), vec![sc.index, w]].concat());
        }
    }
    if let Some(rel) = l.relative {
        forms.push([regs.clone(), vec![rel.magnitude, Field::new(rel.sign_bit, 1)]].concat());
    }
    forms
}

fn check_descriptor(isa: &Isa) {
    let mut mnemonics = HashSet::new();
    let mut codes = HashSet::new();
    for d in isa.opcodes {
        assert!(mnemonics.insert(d.mnemonic), "duplicate mnemonic {}", d.mnemonic);
        assert!(codes.insert(d.code), "duplicate opcode {}", d.code);
        assert!(u64::from(d.code) <= isa.opcode.max());
    }
    for layout in [
        &isa.layouts.reg_reg,
        &isa.layouts.reg_imm,
        &isa.layouts.reg_mem,
        &isa.layouts.branch,
    ] {
        for form in layout_forms(layout) {
            for (i, a) in form.iter().enumerate() {
                assert!(!a.overlaps(isa.opcode), "{} field {a:?} hits the opcode", isa.name);
                assert!(u32::from(a.lo) + u32::from(a.width) <= 32);
                for b in &form[i + 1..] {
                    assert!(!a.overlaps(*b), "{} fields {a:?} and {b:?} overlap", isa.name);
                }
            }
        }
    }
}

#[test]
fn descriptors_are_consistent() {
    check_descriptor(&MIPT32);
    check_descriptor(&MIPT64);
}

/// Pseudo-random low bits for every defined opcode: whatever decodes must
/// encode back to an instruction that decodes identically.
fn roundtrip_sweep(isa: &'static Isa) {
    let dec = TableDecoder::new(isa);
    let mut x: u64 = 0x2545_F491_4F6C_DD1D;
    let low_mask = (1u64 << isa.opcode.lo) - 1;
    for desc in isa.opcodes {
        for _ in 0..500 {
            x = x
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            let raw = (u64::from(desc.code) << isa.opcode.lo) | ((x >> 17) & low_mask);
            let d = dec.decode(raw).expect("defined opcode decodes");
            let again = encode(isa, &d).expect("decoded instruction encodes");
            assert_eq!(dec.decode(again), Some(d), "{} raw {raw:#x}", desc.mnemonic);
        }
    }
}

#[test]
fn decode_encode_roundtrip_mipt32() {
    roundtrip_sweep(&MIPT32);
}

#[test]
fn decode_encode_roundtrip_mipt64() {
    roundtrip_sweep(&MIPT64);
}

#[test]
fn backward_branch_sets_sign_bit() {
    let img = assemble(Profile::Mipt64, "top: add r1, r1, 1\nbl top\n").unwrap();
    let raw = img.words[1];
    assert_eq!(raw >> 26, 19);
    assert_eq!((raw >> 21) & 0x1F, 0);
    assert_eq!(raw & (1 << 20), 1 << 20);
    assert_eq!(raw & 0xF_FFFF, 8);

    let d = TableDecoder::new(&MIPT64).decode(raw).unwrap();
    assert_eq!(d.operand, Operand::Displacement(-8));
}

#[test]
fn forward_branch_leaves_sign_bit_clear() {
    let img = assemble(Profile::Mipt64, "bl pc, next\nhalt r0, 0\nnext: halt r0, 1\n").unwrap();
    let raw = img.words[0];
    assert_eq!((raw >> 21) & 0x1F, 31);
    assert_eq!(raw & (1 << 20), 0);
    assert_eq!(raw & 0xF_FFFF, 16);
}

fn reassembles(profile: Profile, lines: &[&str]) {
    let isa = profile.isa();
    let dec = TableDecoder::new(isa);
    for line in lines {
        let word = assemble(profile, line).expect(line).words[0];
        let d = dec.decode(word).expect(line);
        let text = fmt_decoded(isa, 0, &d);
        let again = assemble(profile, &text).expect(&text).words[0];
        assert_eq!(again, word, "`{line}` rendered as `{text}`");
    }
}

#[test]
fn disassembly_reassembles_mipt32() {
    reassembles(
        Profile::Mipt32,
        &[
            "add r1, r2, 5",
            "addi r3, 17",
            "halt 3",
            "halt",
            "ret 2",
            "jmp 16",
            "jne 3",
            "calli 7",
            "call r3, r2, 4",
            "load2 r4, 100",
            "storer r1, sp, 2",
            "push r1, 2",
            "not r5",
            "syscall r1, 102",
            "mov r2, r3",
        ],
    );
}

#[test]
fn disassembly_reassembles_mipt64() {
    reassembles(
        Profile::Mipt64,
        &[
            "add r1, r2, 5",
            "add r1, rz, 300",
            "add r1, r2, r3, 2, 7",
            "ld r1, sp, 16",
            "ld r1, r4, 2000",
            "st r2, r4, r5, 3, 8",
            "bl 40",
            "bl pc, 16",
            "bl rz, 64",
            "bl r5, r6, 1, 2",
            "cgt r3, rz, 1",
            "svc r1, rz, 100",
            "halt r0, 0",
            "nand r4, lr, 9",
        ],
    );
}

#[test]
fn literal_words_match_hand_encoding() {
    let img = assemble(Profile::Mipt32, "lc r1, 7\nsyscall r1, 102\nhalt 0\n").unwrap();
    assert_eq!(img.words, vec![0x0C10_0007, 0x0110_0066, 0x0000_0000]);

    let img = assemble(Profile::Mipt64, "add r1, rz, 5\nadd r2, r1, 3\n").unwrap();
    let add = 2u64 << 26;
    assert_eq!(
        img.words,
        vec![
            add | (1 << 21) | (27 << 16) | 5,
            add | (2 << 21) | (1 << 16) | (27 << 11) | 3,
        ]
    );
}
