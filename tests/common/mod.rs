#![allow(dead_code)]

use autosched::ir::{IterVar, ModuleExpr, ScheduleBlock};

/// `C[i, j] = A[i, j] * B[i, j]`
pub fn elementwise_mul(m: usize, n: usize) -> ModuleExpr {
    let mut module = ModuleExpr::new();
    module.add_function(vec![ScheduleBlock::new(
        "C",
        vec![IterVar::spatial("i", m), IterVar::spatial("j", n)],
        "(* (load A (index i j)) (load B (index i j)))"
            .parse()
            .unwrap(),
    )]);
    module
}

/// `C[i, j] = sum_k A[i, k] * B[k, j]`
pub fn matmul(m: usize, n: usize, k: usize) -> ModuleExpr {
    let mut module = ModuleExpr::new();
    module.add_function(vec![ScheduleBlock::new(
        "C",
        vec![
            IterVar::spatial("i", m),
            IterVar::spatial("j", n),
            IterVar::reduce("k0", k),
        ],
        "(reduce-sum (* (load A (index i k0)) (load B (index k0 j))) (axes k0))"
            .parse()
            .unwrap(),
    )]);
    module
}
