use crate::asm::{self, AsmError};
use crate::cpu::{Machine, MachineConfig, Step, Trap};
use crate::decoder::TableDecoder;
use crate::exec::DispatchExecutor;
use crate::image::{Image, ImageError};
use crate::isa::Profile;
use crate::memory::LinearMemory;
use crate::syscall::Console;

/// A machine wired to its memory, decoder, executor and console.
pub struct Emulator<C: Console> {
    pub machine: Machine,
    pub memory: LinearMemory,
    decoder: TableDecoder,
    executor: DispatchExecutor,
    console: C,
}

impl<C: Console> Emulator<C> {
    pub fn new(image: &Image, cfg: MachineConfig, console: C) -> Result<Self, ImageError> {
        let isa = image.profile.isa();
        let mut memory = LinearMemory::for_isa(isa);
        image.load_into(&mut memory)?;
        let mut machine = Machine::new(image.profile, cfg);
        machine.reset(image.entry);
        Ok(Self {
            machine,
            memory,
            decoder: TableDecoder::new(isa),
            executor: DispatchExecutor::new(isa),
            console,
        })
    }

    /// Assemble and load in one go.
    pub fn from_source(
        profile: Profile,
        src: &str,
        cfg: MachineConfig,
        console: C,
    ) -> Result<Self, AsmError> {
        let image = asm::assemble(profile, src)?;
        // assembly already bounds the image by the memory size
        Self::new(&image, cfg, console).map_err(|e| AsmError::ImageOverflow {
            line: 0,
            text: e.to_string(),
        })
    }

    pub fn step(&mut self) -> Result<Step, Trap> {
        self.machine.step(
            &mut self.memory,
            &mut self.console,
            &self.decoder,
            &self.executor,
        )
    }

    /// Run to halt and flush the console; returns the exit status.
    pub fn run(&mut self) -> Result<i32, Trap> {
        let result = self.machine.run(
            &mut self.memory,
            &mut self.console,
            &self.decoder,
            &self.executor,
        );
        let pc = self.machine.pc();
        self.console
            .flush()
            .map_err(|source| Trap::Io { pc, source })?;
        result
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    pub fn into_console(self) -> C {
        self.console
    }
}
