//! Allocation benchmarks.
//!
//! Measures a full setup pass that fills both subsystems (20 AUTO outputs)
//! and a single steady-state duty write.

use criterion::{Criterion, criterion_group, criterion_main};
use pwm_common::pwm::config::OutputConfig;
use pwm_hal::allocator::AllocatorState;
use pwm_hal::drivers::simulation::SimulatedHardware;
use pwm_hal::output::OutputUnit;
use std::hint::black_box;

const PINS: [u8; 20] = [
    0, 1, 2, 3, 4, 5, 12, 13, 14, 15, 16, 17, 18, 19, 21, 22, 23, 25, 26, 27,
];

fn configs() -> Vec<OutputConfig> {
    PINS.iter()
        .map(|&pin| OutputConfig {
            id: format!("gpio{pin}"),
            pin: Some(pin),
            ..Default::default()
        })
        .collect()
}

fn bench_allocate_all(c: &mut Criterion) {
    let configs = configs();

    c.bench_function("allocate_20_auto_outputs", |b| {
        b.iter(|| {
            let allocator = AllocatorState::shared();
            let hw = SimulatedHardware::new();
            for config in &configs {
                let mut unit = OutputUnit::new(config.clone(), allocator.clone(), hw.drivers());
                unit.allocate_and_configure().unwrap();
            }
            black_box(allocator.borrow().snapshot());
        });
    });
}

fn bench_write_state(c: &mut Criterion) {
    let allocator = AllocatorState::shared();
    let hw = SimulatedHardware::new();
    let mut unit = OutputUnit::new(configs().remove(0), allocator, hw.drivers());
    unit.allocate_and_configure().unwrap();

    c.bench_function("write_state_fast", |b| {
        b.iter(|| {
            unit.write_state(black_box(0.42)).unwrap();
        });
    });
}

criterion_group!(benches, bench_allocate_all, bench_write_state);
criterion_main!(benches);
