pub mod alu;
pub mod asm;
pub mod cpu;
pub mod decoder;
pub mod disasm;
pub mod emulator;
pub mod encoder;
pub mod exec;
pub mod image;
pub mod instructions;
pub mod isa;
pub mod memory;
pub mod syscall;

pub use asm::{assemble, AsmError};
pub use cpu::{Machine, MachineConfig, Step, Trap};
pub use emulator::Emulator;
pub use image::{Image, ImageError};
pub use isa::Profile;
pub use memory::{Bus, LinearMemory};
pub use syscall::{BufferConsole, Console, StreamConsole};
