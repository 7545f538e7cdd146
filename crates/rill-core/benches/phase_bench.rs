//! Criterion benchmarks for lifecycle dispatch.
//!
//! Two benchmark groups:
//! - `run_phase`: one `before` pass over a layered network, cached order
//! - `reorder`: recompute the topological order after a mutation

use criterion::{criterion_group, criterion_main, Criterion};
use rill_core::component::{Component, ComponentError};
use rill_core::id::ComponentId;
use rill_core::model::Model;
use rill_core::scheduler::Phase;

#[derive(Debug, Default)]
struct Accumulator {
    value: u64,
}

impl Component for Accumulator {
    fn before(&mut self) -> Result<(), ComponentError> {
        self.value = self.value.wrapping_add(1);
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

/// `layers` layers of `width` components; each component depends on two
/// components of the previous layer.
fn build_layered(layers: usize, width: usize) -> (Model, Vec<Vec<ComponentId>>) {
    let mut model = Model::default();
    let mut grid: Vec<Vec<ComponentId>> = Vec::with_capacity(layers);

    for layer in 0..layers {
        let row: Vec<ComponentId> = (0..width).map(|_| model.add(Accumulator::default())).collect();
        if layer > 0 {
            let prev = &grid[layer - 1];
            for (i, &id) in row.iter().enumerate() {
                model.connect(prev[i], id).unwrap();
                model.connect(prev[(i + 1) % width], id).unwrap();
            }
        }
        grid.push(row);
    }

    (model, grid)
}

fn bench_run_phase(c: &mut Criterion) {
    let (mut model, _) = build_layered(50, 100);
    model.run_phase(Phase::Setup).unwrap();

    c.bench_function("run_phase_5000_components", |b| {
        b.iter(|| model.run_phase(Phase::Before).unwrap())
    });
}

fn bench_reorder(c: &mut Criterion) {
    let (mut model, grid) = build_layered(50, 100);
    let (a, b_id) = (grid[0][0], grid[49][0]);

    c.bench_function("reorder_after_mutation_5000_components", |b| {
        b.iter(|| {
            model.children(a).unwrap().add(b_id).unwrap();
            model.run_phase(Phase::Before).unwrap();
            model.children(a).unwrap().remove(b_id).unwrap();
            model.run_phase(Phase::Before).unwrap();
        })
    });
}

criterion_group!(benches, bench_run_phase, bench_reorder);
criterion_main!(benches);
