use mipt_emu::image::HEADER_LEN;
use mipt_emu::{assemble, BufferConsole, Emulator, Image, ImageError, MachineConfig, Profile};
use pretty_assertions::assert_eq;

const ECHO32: &str = "
main:
    syscall r0, 100
    addi r0, 1
    syscall r0, 102
    halt 0
answer: word 42
end main
";

const ECHO64: &str = "
start:
    halt r0, 1
main:
    svc r1, rz, 100
    add r1, r1, 1
    svc r1, rz, 102
    halt r0, 0
pad: bytes 12
end main
";

#[test]
fn bytes_roundtrip_keeps_words_and_entry() {
    for (profile, src) in [(Profile::Mipt32, ECHO32), (Profile::Mipt64, ECHO64)] {
        let img = assemble(profile, src).unwrap();
        let bytes = img.to_bytes().unwrap();
        let wb = profile.isa().word_bytes() as usize;
        assert_eq!(bytes.len(), HEADER_LEN + img.words.len() * wb);

        let back = Image::from_bytes(profile, &bytes).unwrap();
        assert_eq!(back.words, img.words);
        assert_eq!(back.entry, img.entry);
        assert_eq!(
            (back.code_words, back.data_words),
            (img.code_words, img.data_words)
        );
        assert!(back.labels.is_empty());
    }
}

#[test]
fn loaded_image_runs_like_source() {
    for (profile, src) in [(Profile::Mipt32, ECHO32), (Profile::Mipt64, ECHO64)] {
        let bytes = assemble(profile, src).unwrap().to_bytes().unwrap();
        let img = Image::from_bytes(profile, &bytes).unwrap();
        let mut emu =
            Emulator::new(&img, MachineConfig::default(), BufferConsole::buffered("99")).unwrap();
        assert_eq!(emu.run().unwrap(), 0);
        assert_eq!(emu.console().output(), "100");
    }
}

#[test]
fn data_is_visible_in_memory() {
    let img = assemble(Profile::Mipt32, ECHO32).unwrap();
    let emu = Emulator::new(&img, MachineConfig::default(), BufferConsole::buffered("")).unwrap();
    assert_eq!(emu.memory.peek(img.labels["answer"]), Some(42));
    assert_eq!(emu.machine.pc(), 0);

    let img = assemble(Profile::Mipt64, ECHO64).unwrap();
    let emu = Emulator::new(&img, MachineConfig::default(), BufferConsole::buffered("")).unwrap();
    assert_eq!(emu.machine.pc(), 8);
}

#[test]
fn oversized_header_counts_are_rejected() {
    let mut bytes = vec![0u8; HEADER_LEN];
    bytes[16..20].copy_from_slice(&(1u32 << 20).to_le_bytes());
    bytes[20..24].copy_from_slice(&1u32.to_le_bytes());
    let err = Image::from_bytes(Profile::Mipt32, &bytes).unwrap_err();
    assert!(matches!(
        err,
        ImageError::TooLarge {
            words: 1_048_577,
            capacity: 1_048_576
        }
    ));

    let err = Image::from_bytes(Profile::Mipt32, &bytes[..100]).unwrap_err();
    assert!(matches!(err, ImageError::Truncated { needed: 512, actual: 100 }));
}

#[test]
fn machine_state_serializes() {
    let mut emu = Emulator::from_source(
        Profile::Mipt64,
        "add r1, rz, 5\nhalt r0, 0\n",
        MachineConfig::default(),
        BufferConsole::buffered(""),
    )
    .unwrap();
    emu.run().unwrap();
    let v = serde_json::to_value(&emu.machine).unwrap();
    assert_eq!(v["profile"], "mipt64");
    assert_eq!(v["regs"][1], 5);
    assert_eq!(v["steps"], 2);
}
