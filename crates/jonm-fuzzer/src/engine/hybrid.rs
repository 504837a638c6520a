//! Hybrid engine driver
//!
//! Holds a weighted list of child engines and delegates each round to one
//! of them, drawn by weight. The children share nothing; interleaving is
//! the only coordination.

use crate::engine::{FuzzCtx, FuzzEngine, RoundOutcome};
use crate::error::EngineResult;
use rand::Rng;

struct WeightedChild {
    weight: u32,
    engine: Box<dyn FuzzEngine>,
}

/// Weighted interleave of child engines.
pub struct HybridFuzzer {
    children: Vec<WeightedChild>,
}

impl HybridFuzzer {
    /// Create a driver with no children.
    pub fn new() -> Self {
        HybridFuzzer {
            children: Vec::new(),
        }
    }

    /// Register a child engine with the given weight. Zero-weight children
    /// are never drawn.
    pub fn add_engine(&mut self, weight: u32, engine: Box<dyn FuzzEngine>) {
        self.children.push(WeightedChild { weight, engine });
    }

    /// Number of registered children.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Whether no children are registered.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    fn pick_child(&mut self, ctx: &mut FuzzCtx<'_>) -> Option<&mut WeightedChild> {
        let total: u32 = self.children.iter().map(|c| c.weight).sum();
        if total == 0 {
            return None;
        }
        let mut roll = ctx.rng.gen_range(0..total);
        for child in &mut self.children {
            if roll < child.weight {
                return Some(child);
            }
            roll -= child.weight;
        }
        None
    }
}

impl Default for HybridFuzzer {
    fn default() -> Self {
        Self::new()
    }
}

impl FuzzEngine for HybridFuzzer {
    fn name(&self) -> &'static str {
        "Hybrid"
    }

    fn fuzz_one(&mut self, ctx: &mut FuzzCtx<'_>) -> EngineResult<RoundOutcome> {
        match self.pick_child(ctx) {
            Some(child) => child.engine.fuzz_one(ctx),
            None => Ok(RoundOutcome::NoSeed),
        }
    }
}
