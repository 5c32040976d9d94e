//! Common test utilities
#![allow(dead_code)]

use numblas::dtype::{DeviceRepr, Element};
use numblas::runtime::{
    Buffer, Device, DeviceKind, Executor, ExecutorConfig, LocalMemoryKind,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Create an executor on the host device with default configuration
pub fn create_executor() -> Executor {
    Executor::with_config(Device::host(), ExecutorConfig::default()).unwrap()
}

/// Create an executor with an explicit configuration
pub fn create_executor_with(config: ExecutorConfig) -> Executor {
    Executor::with_config(Device::host(), config).unwrap()
}

/// Emulated Intel GPU (tuning class `IntelGpu`)
pub fn intel_gpu() -> Device {
    Device::builder("Intel(R) UHD Graphics 630")
        .id(1)
        .platform("Intel(R) OpenCL HD Graphics")
        .kind(DeviceKind::Gpu)
        .max_work_group_size(256)
        .build()
}

/// Emulated AMD GPU (tuning class `AmdGpu`)
pub fn amd_gpu() -> Device {
    Device::builder("gfx906")
        .id(2)
        .platform("AMD Accelerated Parallel Processing")
        .kind(DeviceKind::Gpu)
        .max_work_group_size(256)
        .build()
}

/// Emulated device without fast local memory
pub fn global_memory_device() -> Device {
    Device::builder("no-local-mem")
        .id(3)
        .local_memory(LocalMemoryKind::Global)
        .build()
}

/// Allocate a buffer and fill it with `data`
pub fn upload<T: DeviceRepr>(ex: &Executor, data: &[T]) -> Buffer<T> {
    let buf = ex.allocate::<T>(data.len()).unwrap();
    ex.copy_to_device(data, &buf.ptr()).unwrap();
    buf
}

/// Read a whole buffer back to the host
pub fn download<T: DeviceRepr>(ex: &Executor, buf: &Buffer<T>) -> Vec<T> {
    let mut out = vec![T::zeroed(); buf.len()];
    ex.copy_to_host(&buf.ptr(), &mut out).unwrap();
    out
}

/// Deterministic values uniformly drawn from [-1, 1)
pub fn random_vec<T: Element>(seed: u64, n: usize) -> Vec<T> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| T::from_f64(rng.random_range(-1.0..1.0)))
        .collect()
}

/// Column-major reference GEMM accumulated in f64
#[allow(clippy::too_many_arguments)]
pub fn reference_gemm(
    trans_a: bool,
    trans_b: bool,
    m: usize,
    n: usize,
    k: usize,
    alpha: f64,
    a: &[f64],
    lda: usize,
    b: &[f64],
    ldb: usize,
    beta: f64,
    c: &mut [f64],
    ldc: usize,
) {
    for j in 0..n {
        for i in 0..m {
            let mut sum = 0.0;
            for p in 0..k {
                let av = if trans_a { a[p + i * lda] } else { a[i + p * lda] };
                let bv = if trans_b { b[j + p * ldb] } else { b[p + j * ldb] };
                sum += av * bv;
            }
            let prev = if beta == 0.0 { 0.0 } else { beta * c[i + j * ldc] };
            c[i + j * ldc] = alpha * sum + prev;
        }
    }
}

/// Assert element-wise `|got - want| <= atol + rtol * |want|`, compared in f64
pub fn assert_allclose<T: Element>(got: &[T], want: &[T], rtol: f64, atol: f64, msg: &str) {
    assert_eq!(got.len(), want.len(), "{msg}: length mismatch");
    for (i, (&g, &w)) in got.iter().zip(want).enumerate() {
        let (g, w) = (g.as_f64(), w.as_f64());
        let tol = atol + rtol * w.abs();
        assert!(
            (g - w).abs() <= tol,
            "{msg}: element {i} is {g}, expected {w} (tolerance {tol})"
        );
    }
}
