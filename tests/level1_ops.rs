//! Integration tests for the BLAS level 1 routines
//!
//! Tests verify:
//! - Strided operands leave elements outside the index set untouched
//! - Scalar results against f64 host references
//! - First-occurrence tie-breaking of iamax/iamin
//! - Degenerate sizes and argument validation

mod common;

use common::{assert_allclose, create_executor, download, random_vec, upload};
use numblas::blas;
use numblas::error::Error;
use numblas::runtime::Executor;

// ============================================================================
// swap / copy
// ============================================================================

#[test]
fn test_swap_n1000_stride3() {
    let ex = create_executor();
    let n = 1000;
    let inc = 3;
    let len = (n - 1) * inc + 1;

    let x0 = random_vec::<f32>(7, len);
    let y0 = random_vec::<f32>(11, len);
    let x = upload(&ex, &x0);
    let y = upload(&ex, &y0);

    blas::swap(&ex, n, &x.ptr(), inc, &y.ptr(), inc)
        .unwrap()
        .wait()
        .unwrap();

    let x1 = download(&ex, &x);
    let y1 = download(&ex, &y);
    for i in 0..len {
        if i % inc == 0 {
            assert_eq!(x1[i].to_bits(), y0[i].to_bits(), "x[{i}] not swapped");
            assert_eq!(y1[i].to_bits(), x0[i].to_bits(), "y[{i}] not swapped");
        } else {
            assert_eq!(x1[i].to_bits(), x0[i].to_bits(), "x[{i}] modified");
            assert_eq!(y1[i].to_bits(), y0[i].to_bits(), "y[{i}] modified");
        }
    }
}

#[test]
fn test_swap_different_strides() {
    let ex = create_executor();
    let x = upload(&ex, &[1.0f64, 2.0, 3.0, 4.0]);
    let y = upload(&ex, &[10.0f64, -1.0, 20.0, -1.0, 30.0, -1.0, 40.0]);

    blas::swap(&ex, 4, &x.ptr(), 1, &y.ptr(), 2)
        .unwrap()
        .wait()
        .unwrap();

    assert_eq!(download(&ex, &x), vec![10.0, 20.0, 30.0, 40.0]);
    assert_eq!(
        download(&ex, &y),
        vec![1.0, -1.0, 2.0, -1.0, 3.0, -1.0, 4.0]
    );
}

#[test]
fn test_copy_bitwise() {
    let ex = create_executor();
    let mut src = random_vec::<f64>(3, 64);
    src[5] = -0.0;
    src[9] = f64::MIN_POSITIVE / 4.0;
    let x = upload(&ex, &src);
    let y = upload(&ex, &vec![99.0f64; 128]);

    blas::copy(&ex, 64, &x.ptr(), 1, &y.ptr(), 2)
        .unwrap()
        .wait()
        .unwrap();

    let out = download(&ex, &y);
    for i in 0..64 {
        assert_eq!(out[2 * i].to_bits(), src[i].to_bits(), "element {i}");
        assert_eq!(out[2 * i + 1], 99.0);
    }
}

#[test]
fn test_copy_with_offset_pointer() {
    let ex = create_executor();
    let x = upload(&ex, &[1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0]);
    let y = upload(&ex, &[0.0f32; 6]);

    blas::copy(&ex, 3, &x.at(1), 2, &y.at(3), 1)
        .unwrap()
        .wait()
        .unwrap();

    assert_eq!(download(&ex, &y), vec![0.0, 0.0, 0.0, 2.0, 4.0, 6.0]);
}

// ============================================================================
// axpy / scal / rot
// ============================================================================

#[test]
fn test_axpy_strided() {
    let ex = create_executor();
    let n = 257;
    let xs = random_vec::<f64>(1, 2 * n);
    let ys = random_vec::<f64>(2, 3 * n);
    let x = upload(&ex, &xs);
    let y = upload(&ex, &ys);

    blas::axpy(&ex, n, 1.5, &x.ptr(), 2, &y.ptr(), 3)
        .unwrap()
        .wait()
        .unwrap();

    let mut expected = ys.clone();
    for i in 0..n {
        expected[3 * i] = 1.5 * xs[2 * i] + ys[3 * i];
    }
    assert_allclose(&download(&ex, &y), &expected, 1e-14, 1e-14, "axpy");
}

#[test]
fn test_axpy_alpha_zero_is_identity() {
    let ex = create_executor();
    let ys = random_vec::<f32>(5, 100);
    let x = upload(&ex, &vec![f32::NAN; 100]);
    let y = upload(&ex, &ys);

    let event = blas::axpy(&ex, 100, 0.0, &x.ptr(), 1, &y.ptr(), 1).unwrap();
    assert!(event.is_complete());

    let out = download(&ex, &y);
    assert_eq!(out, ys);
}

#[test]
fn test_axpy_in_place() {
    let ex = create_executor();
    let y = upload(&ex, &[1.0f32, 2.0, 3.0]);

    // y := 2 * y + y
    blas::axpy(&ex, 3, 2.0, &y.ptr(), 1, &y.ptr(), 1)
        .unwrap()
        .wait()
        .unwrap();

    assert_eq!(download(&ex, &y), vec![3.0, 6.0, 9.0]);
}

#[test]
fn test_scal() {
    let ex = create_executor();
    let x = upload(&ex, &[1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0]);

    blas::scal(&ex, 3, -2.0, &x.ptr(), 2)
        .unwrap()
        .wait()
        .unwrap();

    assert_eq!(download(&ex, &x), vec![-2.0, 2.0, -6.0, 4.0, -10.0, 6.0]);
}

#[test]
fn test_rot() {
    let ex = create_executor();
    let xs = random_vec::<f64>(21, 50);
    let ys = random_vec::<f64>(22, 50);
    let x = upload(&ex, &xs);
    let y = upload(&ex, &ys);
    let g = blas::rotg(3.0f64, 4.0);

    blas::rot(&ex, 50, &x.ptr(), 1, &y.ptr(), 1, g.c, g.s)
        .unwrap()
        .wait()
        .unwrap();

    let ex_x: Vec<f64> = (0..50).map(|i| g.c * xs[i] + g.s * ys[i]).collect();
    let ex_y: Vec<f64> = (0..50).map(|i| g.c * ys[i] - g.s * xs[i]).collect();
    assert_allclose(&download(&ex, &x), &ex_x, 1e-14, 1e-14, "rot x");
    assert_allclose(&download(&ex, &y), &ex_y, 1e-14, 1e-14, "rot y");
}

#[test]
fn test_rot_zeroes_second_component() {
    let ex = create_executor();
    let x = upload(&ex, &[3.0f64]);
    let y = upload(&ex, &[4.0f64]);
    let g = blas::rotg(3.0f64, 4.0);

    blas::rot(&ex, 1, &x.ptr(), 1, &y.ptr(), 1, g.c, g.s)
        .unwrap()
        .wait()
        .unwrap();

    assert!((download(&ex, &x)[0] - g.r).abs() < 1e-12);
    assert!(download(&ex, &y)[0].abs() < 1e-12);
}

// ============================================================================
// dot / nrm2 / asum
// ============================================================================

#[test]
fn test_dot_matches_f64_reference() {
    let ex = create_executor();
    let n = 5000;
    let xs = random_vec::<f32>(31, n);
    let ys = random_vec::<f32>(32, 2 * n);
    let x = upload(&ex, &xs);
    let y = upload(&ex, &ys);

    let got = blas::dot(&ex, n, &x.ptr(), 1, &y.ptr(), 2).unwrap();

    let reference: f64 = (0..n).map(|i| xs[i] as f64 * ys[2 * i] as f64).sum();
    assert!(
        (got as f64 - reference).abs() < 1e-3,
        "dot {got} vs {reference}"
    );
}

#[test]
fn test_dot_into_device_result() {
    let ex = create_executor();
    let x = upload(&ex, &[1.0f64, 2.0, 3.0]);
    let y = upload(&ex, &[4.0f64, 5.0, 6.0]);
    let r = upload(&ex, &[0.0f64, 7.0]);

    blas::dot_into(&ex, 3, &x.ptr(), 1, &y.ptr(), 1, &r.ptr())
        .unwrap()
        .wait()
        .unwrap();

    assert_eq!(download(&ex, &r), vec![32.0, 7.0]);
}

#[test]
fn test_nrm2() {
    let ex = create_executor();
    let xs = random_vec::<f64>(41, 3000);
    let neg: Vec<f64> = xs.iter().map(|v| -v).collect();
    let x = upload(&ex, &xs);
    let nx = upload(&ex, &neg);

    let got = blas::nrm2(&ex, 3000, &x.ptr(), 1).unwrap();
    let got_neg = blas::nrm2(&ex, 3000, &nx.ptr(), 1).unwrap();

    let reference = xs.iter().map(|v| v * v).sum::<f64>().sqrt();
    assert!((got - reference).abs() < 1e-10);
    assert_eq!(got, got_neg);
}

#[test]
fn test_nrm2_small() {
    let ex = create_executor();
    let x = upload(&ex, &[3.0f32, -4.0]);
    assert_eq!(blas::nrm2(&ex, 2, &x.ptr(), 1).unwrap(), 5.0);
}

#[test]
fn test_asum() {
    let ex = create_executor();
    let xs = random_vec::<f32>(51, 4096);
    let x = upload(&ex, &xs);

    let got = blas::asum(&ex, 2048, &x.ptr(), 2).unwrap();

    let reference: f64 = (0..2048).map(|i| (xs[2 * i] as f64).abs()).sum();
    assert_allclose(&[got], &[reference as f32], 1e-4, 1e-4, "asum");
}

// ============================================================================
// iamax / iamin
// ============================================================================

#[test]
fn test_iamax_first_occurrence() {
    let ex = create_executor();
    let x = upload(&ex, &[1.0f32, -5.0, 3.0, 5.0, -5.0, 2.0]);

    assert_eq!(blas::iamax(&ex, 6, &x.ptr(), 1).unwrap(), 1);
}

#[test]
fn test_iamin_first_occurrence() {
    let ex = create_executor();
    let x = upload(&ex, &[4.0f64, -1.0, 3.0, 1.0, 2.0, -1.0]);

    assert_eq!(blas::iamin(&ex, 6, &x.ptr(), 1).unwrap(), 1);
}

#[test]
fn test_iamax_iamin_all_equal() {
    let ex = create_executor();
    let x = upload(&ex, &vec![2.5f32; 10_000]);

    assert_eq!(blas::iamax(&ex, 10_000, &x.ptr(), 1).unwrap(), 0);
    assert_eq!(blas::iamin(&ex, 10_000, &x.ptr(), 1).unwrap(), 0);
}

#[test]
fn test_iamax_large_random() {
    let ex = create_executor();
    let mut xs = random_vec::<f64>(61, 20_000);
    xs[13_577] = -3.0;
    xs[19_000] = 3.0;
    let x = upload(&ex, &xs);

    assert_eq!(blas::iamax(&ex, 20_000, &x.ptr(), 1).unwrap(), 13_577);
}

#[test]
fn test_iamax_strided_reports_logical_index() {
    let ex = create_executor();
    let x = upload(&ex, &[1.0f32, 100.0, 2.0, 100.0, 7.0, 100.0, 3.0]);

    // Logical elements: [1, 2, 7, 3]
    assert_eq!(blas::iamax(&ex, 4, &x.ptr(), 2).unwrap(), 2);
    assert_eq!(blas::iamin(&ex, 4, &x.ptr(), 2).unwrap(), 0);
}

#[test]
fn test_iamax_into_pair() {
    let ex = create_executor();
    let x = upload(&ex, &[0.5f64, -8.0, 4.0]);
    let r = ex.allocate(1).unwrap();

    blas::iamax_into(&ex, 3, &x.ptr(), 1, &r.ptr())
        .unwrap()
        .wait()
        .unwrap();

    let pair = download(&ex, &r)[0];
    assert_eq!(pair.index, 1);
    assert_eq!(pair.value, 8.0);
}

#[test]
fn test_iamax_nan_first_wins() {
    let ex = create_executor();
    let x = upload(&ex, &[1.0f32, f32::NAN, 9.0, f32::NAN]);

    assert_eq!(blas::iamax(&ex, 4, &x.ptr(), 1).unwrap(), 1);
    assert_eq!(blas::iamin(&ex, 4, &x.ptr(), 1).unwrap(), 1);
}

// ============================================================================
// Degenerate sizes and validation
// ============================================================================

#[test]
fn test_empty_vectors() {
    let ex = create_executor();
    let x = upload(&ex, &[1.0f64, 2.0]);
    let y = upload(&ex, &[3.0f64, 4.0]);

    assert_eq!(blas::dot(&ex, 0, &x.ptr(), 1, &y.ptr(), 1).unwrap(), 0.0);
    assert_eq!(blas::nrm2(&ex, 0, &x.ptr(), 1).unwrap(), 0.0);
    assert_eq!(blas::asum(&ex, 0, &x.ptr(), 1).unwrap(), 0.0);
    assert_eq!(blas::iamax(&ex, 0, &x.ptr(), 1).unwrap(), 0);
    assert_eq!(blas::iamin(&ex, 0, &x.ptr(), 1).unwrap(), 0);

    blas::swap(&ex, 0, &x.ptr(), 1, &y.ptr(), 1)
        .unwrap()
        .wait()
        .unwrap();
    blas::axpy(&ex, 0, 2.0, &x.ptr(), 1, &y.ptr(), 1)
        .unwrap()
        .wait()
        .unwrap();
    assert_eq!(download(&ex, &x), vec![1.0, 2.0]);
    assert_eq!(download(&ex, &y), vec![3.0, 4.0]);
}

#[test]
fn test_vector_past_end_rejected() {
    let ex = create_executor();
    let x = upload(&ex, &[0.0f32; 10]);
    let y = upload(&ex, &[0.0f32; 10]);

    let err = blas::copy(&ex, 4, &x.ptr(), 4, &y.ptr(), 1).unwrap_err();
    assert!(matches!(err, Error::ViewOutOfBounds { .. }), "{err:?}");

    let err = blas::dot(&ex, 11, &x.ptr(), 1, &y.ptr(), 1).unwrap_err();
    assert!(matches!(err, Error::ViewOutOfBounds { .. }), "{err:?}");
}

#[test]
fn test_zero_increment() {
    let ex = Executor::host().unwrap();
    let x = upload(&ex, &[0.0f64; 4]);

    let err = blas::nrm2(&ex, 4, &x.ptr(), 0).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { arg: "incx", .. }));
}
