//! Benchmark: reference `mvb` vs the dispatched `mvb`, and `linear` over batch sizes.
//!
//! Build with `--features accelerate` to compare against the gemm backend.

use std::time::Instant;

use torchlet::cpu;
use torchlet::prelude::*;

fn bench_mvb(
    f: fn(&[f32], &[f32], Option<&[f32]>, &mut [f32], usize, usize),
    w: &[f32],
    x: &[f32],
    b: &[f32],
    m: usize,
    n: usize,
    iters: usize,
) -> f64 {
    let mut y = vec![0.0f32; m];
    let start = Instant::now();
    for _ in 0..iters {
        f(w, x, Some(b), &mut y, m, n);
        std::hint::black_box(&y);
    }
    start.elapsed().as_secs_f64() / iters as f64
}

fn bench_linear(layer: &Linear, x: &Tensor, iters: usize) -> f64 {
    let start = Instant::now();
    for _ in 0..iters {
        let _ = std::hint::black_box(layer.forward(x).unwrap());
    }
    start.elapsed().as_secs_f64() / iters as f64
}

fn gflops(m: usize, n: usize, secs: f64) -> f64 {
    (2.0 * m as f64 * n as f64) / secs / 1e9
}

fn main() {
    println!("=== torchlet mvb Benchmark ===");
    println!("accelerate: {}\n", cfg!(feature = "accelerate"));

    let sizes: &[(usize, usize)] = &[(64, 64), (256, 256), (512, 1024), (1024, 1024), (4096, 1024)];

    println!(
        "{:<12} {:>14} {:>14} {:>10} {:>10}",
        "Size", "Reference (us)", "Dispatch (us)", "Speedup", "GF/s"
    );
    println!("{}", "-".repeat(64));

    for &(m, n) in sizes {
        let w: Vec<f32> = (0..m * n).map(|i| ((i * 7 + 3) % 13) as f32 * 0.1 - 0.6).collect();
        let x: Vec<f32> = (0..n).map(|i| ((i * 11 + 5) % 17) as f32 * 0.1 - 0.8).collect();
        let b: Vec<f32> = (0..m).map(|i| (i % 5) as f32 * 0.01).collect();

        let iters = if m * n <= 65_536 { 5000 } else if m * n <= 1 << 20 { 500 } else { 50 };

        let reference_s = bench_mvb(cpu::mvb_reference::<f32>, &w, &x, &b, m, n, iters);
        let dispatch_s = bench_mvb(cpu::mvb::<f32>, &w, &x, &b, m, n, iters);

        println!(
            "{:<12} {:>14.2} {:>14.2} {:>9.2}x {:>10.2}",
            format!("{m}x{n}"),
            reference_s * 1e6,
            dispatch_s * 1e6,
            reference_s / dispatch_s,
            gflops(m, n, dispatch_s),
        );
    }

    println!("\n=== Linear(1024 -> 1024) ===");
    let mut gen = Generator::new(123);
    let layer = Linear::with_generator(1024, 1024, true, DType::Float32, &mut gen).unwrap();
    println!("{:<8} {:>12}", "Batch", "Time (ms)");
    println!("{}", "-".repeat(22));
    for batch in [1usize, 8, 32, 128] {
        let x = Tensor::ones(&[batch, 1024], DType::Float32).unwrap();
        init::uniform_(&x, -1.0f32, 1.0, &mut gen).unwrap();
        let iters = (256 / batch).max(4);
        let secs = bench_linear(&layer, &x, iters);
        println!("{:<8} {:>12.3}", batch, secs * 1e3);
    }
}
