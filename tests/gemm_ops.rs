//! Integration tests for the GEMM kernel family
//!
//! Tests verify:
//! - All transpose combinations against a triple-loop reference
//! - Identical results across tuned, generic and fallback kernels
//! - beta == 0 and alpha == 0 semantics
//! - Argument validation and aliasing

mod common;

use common::{
    amd_gpu, assert_allclose, create_executor, download, global_memory_device, intel_gpu,
    random_vec, reference_gemm, upload,
};
use numblas::blas;
use numblas::error::Error;
use numblas::gemm::{BlockedParams, KernelVariant, Strategy, TileConfig, Transpose};
use numblas::runtime::{Device, Executor, ExecutorConfig};
use numblas::view::MatrixView;

const FLAGS: [(char, bool); 2] = [('n', false), ('t', true)];

fn executor_on(device: Device) -> Executor {
    Executor::with_config(device, ExecutorConfig::default()).unwrap()
}

/// Stored extents of an operand whose op() is `rows x cols`
fn stored(trans: bool, rows: usize, cols: usize) -> (usize, usize) {
    if trans { (cols, rows) } else { (rows, cols) }
}

/// Run `blas::gemm` on fresh buffers and return C
#[allow(clippy::too_many_arguments)]
fn run_gemm(
    ex: &Executor,
    ta: char,
    tb: char,
    m: usize,
    n: usize,
    k: usize,
    alpha: f64,
    a: &[f64],
    b: &[f64],
    beta: f64,
    c: &[f64],
) -> Vec<f64> {
    let (lda, _) = stored(!ta.eq_ignore_ascii_case(&'n'), m, k);
    let (ldb, _) = stored(!tb.eq_ignore_ascii_case(&'n'), k, n);
    let da = upload(ex, a);
    let db = upload(ex, b);
    let dc = upload(ex, c);
    blas::gemm(
        ex,
        ta,
        tb,
        m,
        n,
        k,
        alpha,
        &da.ptr(),
        lda.max(1),
        &db.ptr(),
        ldb.max(1),
        beta,
        &dc.ptr(),
        m.max(1),
    )
    .unwrap()
    .wait()
    .unwrap();
    download(ex, &dc)
}

// ============================================================================
// Correctness against the reference
// ============================================================================

#[test]
fn test_gemm_all_transpose_combinations() {
    let (m, n, k) = (37, 29, 45);
    let (alpha, beta) = (1.25, -0.5);

    for device in [Device::host(), intel_gpu(), amd_gpu(), global_memory_device()] {
        let ex = executor_on(device);
        for (ta, trans_a) in FLAGS {
            for (tb, trans_b) in FLAGS {
                let a = random_vec::<f64>(1, m * k);
                let b = random_vec::<f64>(2, k * n);
                let c = random_vec::<f64>(3, m * n);
                let (lda, _) = stored(trans_a, m, k);
                let (ldb, _) = stored(trans_b, k, n);

                let got = run_gemm(&ex, ta, tb, m, n, k, alpha, &a, &b, beta, &c);

                let mut expected = c.clone();
                reference_gemm(
                    trans_a, trans_b, m, n, k, alpha, &a, lda, &b, ldb, beta, &mut expected, m,
                );
                let msg = format!("gemm {ta}{tb} on {}", ex.device().name());
                assert_allclose(&got, &expected, 1e-12, 1e-12, &msg);
            }
        }
    }
}

#[test]
fn test_gemm_conj_trans_equals_trans_for_real() {
    let ex = create_executor();
    let (m, n, k) = (9, 11, 13);
    let a = random_vec::<f64>(4, m * k);
    let b = random_vec::<f64>(5, k * n);
    let c = vec![0.0; m * n];

    let with_t = run_gemm(&ex, 'T', 'n', m, n, k, 1.0, &a, &b, 0.0, &c);
    let with_c = run_gemm(&ex, 'C', 'N', m, n, k, 1.0, &a, &b, 0.0, &c);
    assert_eq!(with_t, with_c);
}

#[test]
fn test_gemm_f32_against_reference() {
    let ex = executor_on(intel_gpu());
    let (m, n, k) = (65, 70, 130);
    let a = random_vec::<f32>(6, m * k);
    let b = random_vec::<f32>(7, k * n);
    let da = upload(&ex, &a);
    let db = upload(&ex, &b);
    let dc = upload(&ex, &vec![0.0f32; m * n]);

    blas::gemm(&ex, 'n', 'n', m, n, k, 1.0f32, &da.ptr(), m, &db.ptr(), k, 0.0, &dc.ptr(), m)
        .unwrap()
        .wait()
        .unwrap();

    let a64: Vec<f64> = a.iter().map(|&v| v as f64).collect();
    let b64: Vec<f64> = b.iter().map(|&v| v as f64).collect();
    let mut expected = vec![0.0f64; m * n];
    reference_gemm(false, false, m, n, k, 1.0, &a64, m, &b64, k, 0.0, &mut expected, m);
    let got: Vec<f64> = download(&ex, &dc).iter().map(|&v| v as f64).collect();
    assert_allclose(&got, &expected, 1e-4, 1e-4, "f32 gemm");
}

#[test]
fn test_gemm_submatrix_leaves_padding_untouched() {
    let ex = create_executor();
    let (m, n, k) = (5, 4, 3);
    let (lda, ldb, ldc) = (8, 6, 7);
    let a = random_vec::<f64>(8, lda * k);
    let b = random_vec::<f64>(9, ldb * n);
    let c0 = vec![-7.0f64; 2 + ldc * n];
    let da = upload(&ex, &a);
    let db = upload(&ex, &b);
    let dc = upload(&ex, &c0);

    blas::gemm(
        &ex, 'n', 'n', m, n, k, 2.0, &da.ptr(), lda, &db.ptr(), ldb, 0.0, &dc.at(2), ldc,
    )
    .unwrap()
    .wait()
    .unwrap();

    let got = download(&ex, &dc);
    let mut expected = c0[2..].to_vec();
    reference_gemm(false, false, m, n, k, 2.0, &a, lda, &b, ldb, 0.0, &mut expected, ldc);
    assert_eq!(&got[..2], &[-7.0, -7.0]);
    for j in 0..n {
        for i in 0..ldc {
            let idx = i + j * ldc;
            if idx >= expected.len() {
                continue;
            }
            if i < m {
                assert!((got[2 + idx] - expected[idx]).abs() < 1e-12, "C({i}, {j})");
            } else {
                assert_eq!(got[2 + idx], -7.0, "padding row {i} of column {j}");
            }
        }
    }
}

// ============================================================================
// Kernel selection must not change results
// ============================================================================

#[test]
fn test_gemm_10x1024x1024_identical_across_configurations() {
    let (m, n, k) = (10, 1024, 1024);
    let a = random_vec::<f32>(42, m * k);
    let b = random_vec::<f32>(43, k * n);

    let run = |device: Device| -> Vec<f32> {
        let ex = executor_on(device);
        let da = upload(&ex, &a);
        let db = upload(&ex, &b);
        let dc = upload(&ex, &vec![0.0f32; m * n]);
        blas::gemm(&ex, 'n', 'n', m, n, k, 1.0f32, &da.ptr(), m, &db.ptr(), k, 0.0, &dc.ptr(), m)
            .unwrap()
            .wait()
            .unwrap();
        download(&ex, &dc)
    };

    // Tuned entries for both GPU classes, the generic tile, and no local memory
    let intel = run(intel_gpu());
    let amd = run(amd_gpu());
    let generic = run(Device::host());
    let fallback = run(global_memory_device());

    let bits = |v: &[f32]| v.iter().map(|x| x.to_bits()).collect::<Vec<_>>();
    assert_eq!(bits(&intel), bits(&generic), "intel tile vs generic tile");
    assert_eq!(bits(&amd), bits(&generic), "amd tile vs generic tile");
    assert_eq!(bits(&fallback), bits(&generic), "fallback vs generic tile");
}

#[test]
fn test_forced_variants_match_fallback() {
    let ex = create_executor();
    let (m, n, k) = (23, 19, 41);
    let a_data = random_vec::<f64>(10, m * k);
    let b_data = random_vec::<f64>(11, k * n);
    let da = upload(&ex, &a_data);
    let db = upload(&ex, &b_data);

    let tile = TileConfig::new(2, 3, 4, 2);
    let strategies = [
        Strategy::Fallback { wg_size: 32 },
        Strategy::Blocked(BlockedParams::new(tile)),
        Strategy::Blocked(BlockedParams::new(tile).with_double_buffer(true)),
        Strategy::Blocked(BlockedParams::new(tile).with_conflict_padding(true, false)),
        Strategy::Blocked(
            BlockedParams::new(tile)
                .with_double_buffer(true)
                .with_conflict_padding(true, true),
        ),
    ];

    for (trans_a, trans_b) in [(false, false), (false, true), (true, false), (true, true)] {
        let op = |t: bool| if t { Transpose::Trans } else { Transpose::NoTrans };
        let (ar, ac) = stored(trans_a, m, k);
        let (br, bc) = stored(trans_b, k, n);
        let va = MatrixView::new(&da, 0, ar, ac, ar).unwrap();
        let vb = MatrixView::new(&db, 0, br, bc, br).unwrap();

        let mut results = Vec::new();
        for strategy in strategies {
            let dc = upload(&ex, &vec![1.0f64; m * n]);
            let vc = MatrixView::new(&dc, 0, m, n, m).unwrap();
            KernelVariant::new(op(trans_a), op(trans_b), m, n, k, strategy)
                .execute(&ex, &va, &vb, &vc, 0.75, 2.0)
                .unwrap()
                .wait()
                .unwrap();
            results.push(download(&ex, &dc));
        }
        for (i, r) in results.iter().enumerate().skip(1) {
            assert_eq!(r, &results[0], "strategy {i} ({trans_a}, {trans_b})");
        }
    }
}

#[test]
fn test_blocked_too_large_for_local_memory_falls_back() {
    let device = Device::builder("tiny-local")
        .local_memory_bytes(256)
        .build();
    let ex = executor_on(device);
    let (m, n, k) = (17, 9, 33);
    let a = random_vec::<f64>(12, m * k);
    let b = random_vec::<f64>(13, k * n);
    let da = upload(&ex, &a);
    let db = upload(&ex, &b);
    let dc = upload(&ex, &vec![0.0f64; m * n]);

    let params = BlockedParams::new(TileConfig::new(8, 8, 16, 16)).with_double_buffer(true);
    let va = MatrixView::new(&da, 0, m, k, m).unwrap();
    let vb = MatrixView::new(&db, 0, k, n, k).unwrap();
    let vc = MatrixView::new(&dc, 0, m, n, m).unwrap();
    KernelVariant::new(
        Transpose::NoTrans,
        Transpose::NoTrans,
        m,
        n,
        k,
        Strategy::Blocked(params),
    )
    .execute(&ex, &va, &vb, &vc, 1.0, 0.0)
    .unwrap()
    .wait()
    .unwrap();

    let mut expected = vec![0.0; m * n];
    reference_gemm(false, false, m, n, k, 1.0, &a, m, &b, k, 0.0, &mut expected, m);
    assert_allclose(&download(&ex, &dc), &expected, 1e-12, 1e-12, "fallback");
}

#[test]
fn test_view_tag_combines_with_flag() {
    let ex = create_executor();
    let (m, n, k) = (6, 5, 4);
    let a = random_vec::<f64>(14, m * k);
    let b_t = random_vec::<f64>(15, n * k);
    let da = upload(&ex, &a);
    let db = upload(&ex, &b_t);

    // B stored n x k; a transposed view with NoTrans is op(B) = B^T
    let va = MatrixView::new(&da, 0, m, k, m).unwrap();
    let vb = MatrixView::new(&db, 0, n, k, n).unwrap().transposed();
    let dc = upload(&ex, &vec![0.0f64; m * n]);
    let vc = MatrixView::new(&dc, 0, m, n, m).unwrap();

    let profile = numblas::gemm::DeviceProfile::of(&ex);
    numblas::gemm::select_kernel(Transpose::NoTrans, Transpose::NoTrans, m, n, k, &profile)
        .execute(&ex, &va, &vb, &vc, 1.0, 0.0)
        .unwrap()
        .wait()
        .unwrap();

    let mut expected = vec![0.0; m * n];
    reference_gemm(false, true, m, n, k, 1.0, &a, m, &b_t, n, 0.0, &mut expected, m);
    assert_allclose(&download(&ex, &dc), &expected, 1e-12, 1e-12, "tagged view");
}

// ============================================================================
// alpha / beta special cases
// ============================================================================

#[test]
fn test_beta_zero_ignores_nan_c() {
    for device in [Device::host(), global_memory_device()] {
        let ex = executor_on(device);
        let (m, n, k) = (13, 7, 5);
        let a = random_vec::<f64>(16, m * k);
        let b = random_vec::<f64>(17, k * n);

        let got = run_gemm(&ex, 'n', 't', m, n, k, 1.0, &a, &b, 0.0, &vec![f64::NAN; m * n]);

        let mut expected = vec![0.0; m * n];
        reference_gemm(false, true, m, n, k, 1.0, &a, m, &b, n, 0.0, &mut expected, m);
        assert!(got.iter().all(|v| v.is_finite()));
        assert_allclose(&got, &expected, 1e-12, 1e-12, "beta = 0");
    }
}

#[test]
fn test_alpha_zero_scales_c() {
    let ex = create_executor();
    let (m, n, k) = (4, 3, 6);
    let a = vec![f64::NAN; m * k];
    let b = vec![f64::NAN; k * n];
    let c = random_vec::<f64>(18, m * n);

    let got = run_gemm(&ex, 'n', 'n', m, n, k, 0.0, &a, &b, 3.0, &c);
    let expected: Vec<f64> = c.iter().map(|v| 3.0 * v).collect();
    assert_eq!(got, expected);

    let got = run_gemm(&ex, 'n', 'n', m, n, k, 0.0, &a, &b, 0.0, &vec![f64::NAN; m * n]);
    assert_eq!(got, vec![0.0; m * n]);
}

#[test]
fn test_alpha_zero_beta_one_is_noop() {
    let ex = create_executor();
    let a = upload(&ex, &[1.0f32; 4]);
    let b = upload(&ex, &[1.0f32; 4]);
    let c = upload(&ex, &[5.0f32; 4]);

    let event = blas::gemm(&ex, 'n', 'n', 2, 2, 2, 0.0, &a.ptr(), 2, &b.ptr(), 2, 1.0, &c.ptr(), 2)
        .unwrap();
    assert!(event.is_complete());
    assert_eq!(download(&ex, &c), vec![5.0; 4]);
}

#[test]
fn test_k_zero_scales_c() {
    let ex = create_executor();
    let a = upload(&ex, &[0.0f64; 1]);
    let b = upload(&ex, &[0.0f64; 1]);
    let c = upload(&ex, &[1.0f64, 2.0, 3.0, 4.0]);

    blas::gemm(&ex, 'n', 'n', 2, 2, 0, 1.0, &a.ptr(), 2, &b.ptr(), 1, 0.5, &c.ptr(), 2)
        .unwrap()
        .wait()
        .unwrap();

    assert_eq!(download(&ex, &c), vec![0.5, 1.0, 1.5, 2.0]);
}

#[test]
fn test_empty_output_is_noop() {
    let ex = create_executor();
    let a = upload(&ex, &[1.0f64; 4]);
    let b = upload(&ex, &[1.0f64; 4]);
    let c = upload(&ex, &[9.0f64; 4]);

    let event =
        blas::gemm(&ex, 'n', 'n', 0, 2, 2, 1.0, &a.ptr(), 1, &b.ptr(), 2, 0.0, &c.ptr(), 1).unwrap();
    assert!(event.is_complete());
    let event =
        blas::gemm(&ex, 'n', 'n', 2, 0, 2, 1.0, &a.ptr(), 2, &b.ptr(), 2, 0.0, &c.ptr(), 2).unwrap();
    assert!(event.is_complete());
    assert_eq!(download(&ex, &c), vec![9.0; 4]);
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn test_invalid_transpose_flag() {
    let ex = create_executor();
    let a = upload(&ex, &[1.0f64; 4]);

    let err = blas::gemm(&ex, 'x', 'n', 2, 2, 2, 1.0, &a.ptr(), 2, &a.ptr(), 2, 0.0, &a.ptr(), 2)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { arg: "trans_a", .. }), "{err:?}");
    assert!(err.to_string().contains("'x'"));

    let err = blas::gemm(&ex, 'n', '?', 2, 2, 2, 1.0, &a.ptr(), 2, &a.ptr(), 2, 0.0, &a.ptr(), 2)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { arg: "trans_b", .. }), "{err:?}");
}

#[test]
fn test_leading_dimension_too_small() {
    let ex = create_executor();
    let a = upload(&ex, &[1.0f64; 16]);
    let b = upload(&ex, &[1.0f64; 16]);
    let c = upload(&ex, &[1.0f64; 16]);

    let err = blas::gemm(&ex, 'n', 'n', 4, 2, 2, 1.0, &a.ptr(), 3, &b.ptr(), 2, 0.0, &c.ptr(), 4)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { arg: "ld", .. }), "{err:?}");
}

#[test]
fn test_output_aliasing_input_rejected() {
    let ex = create_executor();
    let buf = upload(&ex, &[1.0f64; 32]);
    let b = upload(&ex, &[1.0f64; 16]);

    // C = rows 0..4 of a 4x4 matrix also read as A
    let err = blas::gemm(&ex, 'n', 'n', 4, 4, 4, 1.0, &buf.ptr(), 4, &b.ptr(), 4, 0.0, &buf.at(8), 4)
        .unwrap_err();
    assert_eq!(err, Error::AliasedOperands { op: "gemm" });

    // Disjoint halves of one buffer are fine
    blas::gemm(&ex, 'n', 'n', 4, 4, 4, 1.0, &buf.ptr(), 4, &b.ptr(), 4, 0.0, &buf.at(16), 4)
        .unwrap()
        .wait()
        .unwrap();
    assert_eq!(download(&ex, &buf)[16..], [4.0; 16]);
}

#[test]
fn test_variant_shape_mismatch() {
    let ex = create_executor();
    let buf = upload(&ex, &[0.0f64; 64]);
    let other = upload(&ex, &[0.0f64; 64]);
    let va = MatrixView::new(&buf, 0, 4, 3, 4).unwrap();
    let vb = MatrixView::new(&buf, 0, 3, 5, 3).unwrap();
    let vc = MatrixView::new(&other, 0, 4, 4, 4).unwrap();

    let err = KernelVariant::new(
        Transpose::NoTrans,
        Transpose::NoTrans,
        4,
        5,
        3,
        Strategy::Fallback { wg_size: 16 },
    )
    .execute(&ex, &va, &vb, &vc, 1.0, 0.0)
    .unwrap_err();
    assert!(matches!(err, Error::ShapeMismatch { .. }), "{err:?}");
}
