use slate_vm::prelude::*;

use std::sync::atomic::Ordering;

fn assemble(program: Vec<Instruction>) -> Vec<Word> {
    program.into_iter().collect()
}

fn arithmetic_program() -> Vec<Word> {
    assemble(vec![
        Instruction::Mov { rd: 1, imm: 3 },
        Instruction::Mov { rd: 2, imm: 5 },
        Instruction::Add { rd: 0, rs: 1, rt: 2 },
        Instruction::Halt,
    ])
}

#[test]
fn every_thread_runs_the_shared_program() {
    let mut sim = Simulation::default();
    let program = arithmetic_program();

    for core_id in 0..sim.params().num_cores {
        for thread_id in 0..sim.params().threads_per_core {
            sim.load_program(core_id, thread_id, &program, 0).unwrap();
        }
    }

    let report = sim.run(100);

    assert!(sim.is_complete());
    assert_eq!(report.errors().count(), 0);
    assert!(report.total_cycles() > 0);

    for core in sim.cores() {
        assert!(core.is_complete());
        for thread in core.threads() {
            assert!(thread.is_halted());
            assert_eq!(thread.registers()[0], 8);
        }
    }
}

#[test]
fn threads_publish_results_through_shared_memory() {
    let params = Params {
        stats_enabled: true,
        ..Params::default()
    };
    let mut sim = Simulation::new(params);

    let total_threads = params.num_cores * params.threads_per_core;
    for index in 0..total_threads {
        let core_id = index / params.threads_per_core;
        let thread_id = index % params.threads_per_core;

        // Each thread gets its own program region and result slot.
        let base = 0x100 + (index as Word) * 0x40;
        let dest = 0x300 + (index as Word) * 4;
        let value = 10 + index as Word;

        let program = assemble(vec![
            Instruction::Mov { rd: 1, imm: dest as Immediate16 },
            Instruction::Mov { rd: 2, imm: value as Immediate16 },
            Instruction::Store { rs: 1, rt: 2 },
            Instruction::Halt,
        ]);
        sim.load_program(core_id, thread_id, &program, base).unwrap();
    }

    let report = sim.run(200);

    assert!(sim.is_complete());
    assert_eq!(report.errors().count(), 0);

    for index in 0..total_threads {
        let dest = 0x300 + (index as Word) * 4;
        assert_eq!(sim.memory().read(dest), 10 + index as Word);
    }

    let stats = sim.memory().stats();
    assert!(stats.reads > 0);
    assert!(stats.cache_hits <= stats.reads);
}

#[test]
fn a_faulting_thread_halts_without_stopping_its_core() {
    let mut sim = Simulation::default();

    // Thread (0, 0) divides by zero; every other thread is well behaved.
    let faulty = assemble(vec![
        Instruction::Mov { rd: 1, imm: 1 },
        Instruction::Div { rd: 2, rs: 1, rt: 0 },
        Instruction::Halt,
    ]);
    sim.load_program(0, 0, &faulty, 0x100).unwrap();

    let healthy = arithmetic_program();
    sim.load_program(0, 1, &healthy, 0x200).unwrap();
    sim.load_program(1, 0, &healthy, 0x240).unwrap();
    sim.load_program(1, 1, &healthy, 0x280).unwrap();

    let report = sim.run(100);

    assert!(sim.is_complete(), "the faulting thread is treated as halted");

    let surfaced: Vec<Fault> = report.errors().map(InterpreterError::fault).collect();
    assert_eq!(surfaced, vec![Fault::DivisionByZero]);

    assert_eq!(sim.core(0).unwrap().thread(1).unwrap().registers()[0], 8);
    assert_eq!(sim.core(1).unwrap().thread(0).unwrap().registers()[0], 8);
    assert_eq!(sim.core(1).unwrap().thread(1).unwrap().registers()[0], 8);
}

#[test]
fn the_stop_signal_ends_workers_between_cycles() {
    let mut sim = Simulation::default();
    let program = arithmetic_program();

    for core_id in 0..sim.params().num_cores {
        for thread_id in 0..sim.params().threads_per_core {
            sim.load_program(core_id, thread_id, &program, 0).unwrap();
        }
    }

    sim.stop_handle().store(true, Ordering::Relaxed);
    let report = sim.run(100);

    assert!(!sim.is_complete());
    for core in &report.cores {
        assert!(core.stopped);
        assert_eq!(core.cycles, 0);
    }
}

#[test]
fn the_scheduler_rotates_when_the_active_thread_halts() {
    let mut sim = Simulation::default();

    let short = assemble(vec![Instruction::Halt]);
    let long = arithmetic_program();
    sim.load_program(0, 0, &short, 0x100).unwrap();
    sim.load_program(0, 1, &long, 0x120).unwrap();
    sim.load_program(1, 0, &short, 0x140).unwrap();
    sim.load_program(1, 1, &short, 0x160).unwrap();

    sim.run(100);

    assert!(sim.is_complete());

    let core = sim.core(0).unwrap();
    assert_eq!(core.active_thread(), 1, "the core finished on its second thread");
    assert_eq!(core.thread(1).unwrap().registers()[0], 8);
}

#[test]
fn an_idle_core_reports_no_cycles() {
    // Nothing loaded on core 1: its threads fetch NOP words forever, so it
    // only idles once both threads halt; seed HALTs to park them.
    let mut sim = Simulation::default();
    let halt = assemble(vec![Instruction::Halt]);

    for core_id in 0..sim.params().num_cores {
        for thread_id in 0..sim.params().threads_per_core {
            sim.load_program(core_id, thread_id, &halt, 0).unwrap();
        }
    }

    let first = sim.run(100);
    assert!(sim.is_complete());
    assert!(first.total_cycles() > 0);

    // A second run finds every thread halted and idles immediately.
    let second = sim.run(100);
    assert_eq!(second.total_cycles(), 0);
    assert!(!second.cores.iter().any(|core| core.stopped));
}
