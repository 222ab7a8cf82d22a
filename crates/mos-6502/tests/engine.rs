//! Engine-level behaviour: reset, interrupts, hooks, multiple processors and
//! observability.

use std::cell::RefCell;
use std::rc::Rc;

use emu_core::{Observable, SimpleBus, Ticks, Value};
use mos_6502::{
    Config, CpuState, Instr, IRQ_VECTOR, Mos6502, NMI_VECTOR, RESET_VECTOR, flags,
};

fn bus_with_reset(program: &[u8]) -> SimpleBus {
    let mut bus = SimpleBus::new();
    bus.load(0x8000, program).expect("program fits");
    bus.set_vector(RESET_VECTOR, 0x8000);
    bus.set_vector(NMI_VECTOR, 0x9000);
    bus.set_vector(IRQ_VECTOR, 0xA000);
    bus
}

#[test]
fn reset_loads_vector_and_clears_registers() {
    let mut bus = bus_with_reset(&[]);
    let mut cpu = CpuState::new();
    cpu.a = 0x12;
    cpu.x = 0x34;
    cpu.y = 0x56;
    cpu.sp = 0x00;
    cpu.status = flags::C | flags::D;
    cpu.cycles = Ticks(100);
    cpu.instructions = 9;

    Mos6502::default().reset(&mut cpu, &mut bus);

    assert_eq!(cpu.pc, 0x8000);
    assert_eq!((cpu.a, cpu.x, cpu.y), (0, 0, 0));
    assert_eq!(cpu.sp, 0xFD);
    assert_eq!(
        cpu.status,
        flags::C | flags::D | flags::U,
        "other flags survive reset"
    );
    assert_eq!(cpu.cycles, Ticks(100), "reset takes no cycles");
    assert_eq!(cpu.instructions, 9);
}

#[test]
fn reset_is_deterministic() {
    let program = [
        0xA9, 0x05, // LDA #$05
        0x69, 0x03, // ADC #$03
        0x85, 0x10, // STA $10
        0xE6, 0x10, // INC $10
        0x4C, 0x00, 0x80, // JMP $8000
    ];
    let mut engine = Mos6502::default();

    let mut first = CpuState::new();
    let mut bus_a = bus_with_reset(&program);
    engine.reset(&mut first, &mut bus_a);
    engine.run(&mut first, &mut bus_a, Ticks(500));

    let mut second = CpuState::new();
    let mut bus_b = bus_with_reset(&program);
    engine.reset(&mut second, &mut bus_b);
    engine.run(&mut second, &mut bus_b, Ticks(500));

    assert_eq!(first, second);
    assert_eq!(bus_a.peek(0x0010), bus_b.peek(0x0010));
}

#[test]
fn irq_taken_when_enabled() {
    let mut bus = bus_with_reset(&[]);
    let mut cpu = CpuState::new();
    let mut engine = Mos6502::default();
    engine.reset(&mut cpu, &mut bus);
    cpu.pc = 0x1234;
    cpu.status = flags::U | flags::C;

    assert!(engine.irq(&mut cpu, &mut bus));
    assert_eq!(cpu.pc, 0xA000);
    assert!(cpu.flag(flags::I));
    assert_eq!(cpu.sp, 0xFA);
    assert_eq!(bus.peek(0x01FD), 0x12);
    assert_eq!(bus.peek(0x01FC), 0x34);
    assert_eq!(
        bus.peek(0x01FB),
        flags::U | flags::C,
        "B is not forced on hardware interrupts"
    );
    assert_eq!(cpu.cycles, Ticks::ZERO);
}

#[test]
fn irq_ignored_when_masked() {
    let mut bus = bus_with_reset(&[]);
    let mut cpu = CpuState::new();
    let mut engine = Mos6502::default();
    engine.reset(&mut cpu, &mut bus);
    cpu.status |= flags::I;
    let before = cpu.clone();

    assert!(!engine.irq(&mut cpu, &mut bus));
    assert_eq!(cpu, before, "masked IRQ leaves the state untouched");
    assert_eq!(bus.peek(0x01FD), 0x00, "nothing pushed");
}

#[test]
fn nmi_ignores_mask() {
    let mut bus = bus_with_reset(&[]);
    let mut cpu = CpuState::new();
    let mut engine = Mos6502::default();
    engine.reset(&mut cpu, &mut bus);
    cpu.status |= flags::I;

    engine.nmi(&mut cpu, &mut bus);
    assert_eq!(cpu.pc, 0x9000);
    assert_eq!(cpu.sp, 0xFA);
    assert_eq!(bus.peek(0x01FD), 0x80);
    assert_eq!(bus.peek(0x01FC), 0x00);
    assert_ne!(bus.peek(0x01FB) & flags::I, 0, "pushed P keeps I");
}

#[test]
fn interrupt_handler_returns_with_rti() {
    let mut bus = bus_with_reset(&[0xEA, 0xEA]);
    bus.poke(0xA000, 0x40); // RTI
    let mut cpu = CpuState::new();
    let mut engine = Mos6502::default();
    engine.reset(&mut cpu, &mut bus);

    engine.step(&mut cpu, &mut bus);
    assert!(engine.irq(&mut cpu, &mut bus));
    engine.step(&mut cpu, &mut bus);

    assert_eq!(cpu.pc, 0x8001);
    assert!(!cpu.flag(flags::I), "RTI restores the unmasked status");
    assert_eq!(cpu.sp, 0xFD);
}

#[test]
fn status_restored_by_rti_has_no_break_bit() {
    let mut bus = bus_with_reset(&[
        0x00, 0x00, // BRK
        0xEA, // NOP
    ]);
    bus.poke(0xA000, 0x40); // RTI
    let mut cpu = CpuState::new();
    let mut engine = Mos6502::default();
    engine.reset(&mut cpu, &mut bus);
    cpu.status = flags::U;

    engine.step(&mut cpu, &mut bus);
    assert_eq!(bus.peek(0x01FB), flags::U | flags::B, "BRK pushes B");
    engine.step(&mut cpu, &mut bus);
    assert_eq!(cpu.pc, 0x8002);
    assert_eq!(cpu.status, flags::U, "B dropped on pull");

    assert!(engine.irq(&mut cpu, &mut bus));
    assert_eq!(cpu.sp, 0xFA);
    assert_eq!(bus.peek(0x01FB), flags::U, "IRQ pushes B clear");
}

#[test]
fn status_restored_by_plp_has_no_break_bit() {
    let mut bus = bus_with_reset(&[
        0xA9, 0xFF, // LDA #$FF
        0x48, // PHA
        0x28, // PLP
        0x58, // CLI
    ]);
    let mut cpu = CpuState::new();
    let mut engine = Mos6502::default();
    engine.reset(&mut cpu, &mut bus);

    for _ in 0..3 {
        engine.step(&mut cpu, &mut bus);
    }
    assert_eq!(cpu.status, 0xFF & !flags::B);
    engine.step(&mut cpu, &mut bus);

    assert!(engine.irq(&mut cpu, &mut bus));
    assert_eq!(bus.peek(0x01FD), 0x80);
    assert_eq!(bus.peek(0x01FC), 0x05);
    assert_eq!(bus.peek(0x01FB), 0xFF & !(flags::B | flags::I));
}

#[test]
fn hook_sees_every_instruction() {
    let mut bus = bus_with_reset(&[0xA9, 0x01, 0xAA, 0xE8]); // LDA #1; TAX; INX
    let mut cpu = CpuState::new();
    let mut engine = Mos6502::default();
    engine.reset(&mut cpu, &mut bus);

    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&seen);
    engine.set_hook(Some(Box::new(move |state: &CpuState| {
        log.borrow_mut().push((state.pc, state.x, state.instructions));
    })));

    for _ in 0..3 {
        engine.step(&mut cpu, &mut bus);
    }

    assert_eq!(
        *seen.borrow(),
        vec![(0x8002, 0, 1), (0x8003, 1, 2), (0x8004, 2, 3)]
    );
}

#[test]
fn hook_observes_charged_cycles() {
    let mut bus = bus_with_reset(&[0xEA, 0xEA, 0xEA, 0xEA]);
    let mut cpu = CpuState::new();
    let mut engine = Mos6502::default();
    engine.reset(&mut cpu, &mut bus);

    let cycles = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&cycles);
    engine.set_hook(Some(Box::new(move |state: &CpuState| {
        log.borrow_mut().push(state.cycles.get());
    })));
    engine.run(&mut cpu, &mut bus, Ticks(6));

    assert_eq!(*cycles.borrow(), vec![2, 4, 6]);
}

#[test]
fn hook_can_be_removed() {
    let mut bus = bus_with_reset(&[0xEA; 8]);
    let mut cpu = CpuState::new();
    let mut engine = Mos6502::default();
    engine.reset(&mut cpu, &mut bus);

    let count = Rc::new(RefCell::new(0_u32));
    let counter = Rc::clone(&count);
    engine.set_hook(Some(Box::new(move |_: &CpuState| {
        *counter.borrow_mut() += 1;
    })));
    engine.step(&mut cpu, &mut bus);
    engine.clear_hook();
    engine.step(&mut cpu, &mut bus);
    assert_eq!(*count.borrow(), 1);

    let counter = Rc::clone(&count);
    engine.set_hook(Some(Box::new(move |_: &CpuState| {
        *counter.borrow_mut() += 10;
    })));
    engine.step(&mut cpu, &mut bus);
    engine.set_hook(None);
    engine.step(&mut cpu, &mut bus);
    assert_eq!(*count.borrow(), 11);
    assert_eq!(cpu.instructions, 4, "execution is unaffected by the hook");
}

#[test]
fn one_engine_drives_two_processors() {
    // Each CPU increments its own counter byte in a loop.
    let program = [
        0xE6, 0x10, // INC $10
        0x4C, 0x00, 0x80, // JMP $8000
    ];
    let mut bus_a = bus_with_reset(&program);
    let mut bus_b = bus_with_reset(&program);
    let mut cpu_a = CpuState::new();
    let mut cpu_b = CpuState::new();
    let mut engine = Mos6502::default();
    engine.reset(&mut cpu_a, &mut bus_a);
    engine.reset(&mut cpu_b, &mut bus_b);

    for _ in 0..10 {
        engine.run(&mut cpu_a, &mut bus_a, Ticks(8));
        engine.run(&mut cpu_b, &mut bus_b, Ticks(16));
    }

    assert_eq!(bus_a.peek(0x0010), 10);
    assert_eq!(bus_b.peek(0x0010), 20);
    assert_eq!(cpu_a.cycles, Ticks(80));
    assert_eq!(cpu_b.cycles, Ticks(160));
}

#[test]
fn engines_with_different_configs() {
    // SED; LDA #$09; ADC #$01; LAX $20
    let program = [0xF8, 0xA9, 0x09, 0x69, 0x01, 0xA7, 0x20];

    let run = |config: Config| {
        let mut bus = bus_with_reset(&program);
        bus.poke(0x0020, 0x77);
        let mut cpu = CpuState::new();
        let mut engine = Mos6502::new(config);
        engine.reset(&mut cpu, &mut bus);
        let mut last = None;
        for _ in 0..4 {
            last = Some(engine.step(&mut cpu, &mut bus));
        }
        (cpu, last.map(|e| e.instr))
    };

    let (nmos, instr) = run(Config::NMOS);
    assert_eq!((nmos.a, nmos.x), (0x77, 0x77));
    assert_eq!(instr, Some(Instr::LAX));

    let (nes, _) = run(Config::RICOH_2A03);
    assert_eq!(nes.x, 0x77);
    assert_eq!(nes.cycles, Ticks(2 + 2 + 2 + 3), "no decimal cycle");

    let (documented, instr) = run(Config::DOCUMENTED);
    assert_eq!(documented.a, 0x10, "decimal result survives");
    assert_eq!(documented.x, 0x00, "LAX ran as NOP");
    assert_eq!(instr, Some(Instr::NOP));
    assert_eq!(documented.pc, 0x8007);
}

#[test]
fn engine_reports_config() {
    let engine = Mos6502::new(Config::RICOH_2A03);
    assert_eq!(engine.config(), Config::RICOH_2A03);
    assert_eq!(Mos6502::default().config(), Config::NMOS);
}

#[test]
fn state_is_observable() {
    let mut bus = bus_with_reset(&[0xA9, 0x80]); // LDA #$80
    let mut cpu = CpuState::new();
    let mut engine = Mos6502::default();
    engine.reset(&mut cpu, &mut bus);
    engine.step(&mut cpu, &mut bus);

    assert_eq!(cpu.query("pc"), Some(Value::U16(0x8002)));
    assert_eq!(cpu.query("a"), Some(Value::U8(0x80)));
    assert_eq!(cpu.query("flags.n"), Some(Value::Bool(true)));
    assert_eq!(cpu.query("cycles"), Some(Value::U64(2)));
    assert_eq!(cpu.query("instructions"), Some(Value::U64(1)));
    assert!(cpu.query_paths().contains(&"sp"));
}
