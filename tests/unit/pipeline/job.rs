use super::*;
use crate::foundation::core::Vec2;
use crate::geometry::line::FeatureLine;

fn input(w: u32, h: u32) -> MorphInput {
    MorphInput::at_origin(ImageRGBA::filled(w, h, [10, 20, 30, 255]).unwrap())
}

fn pairing() -> LinePairing {
    LinePairing::new(
        vec![FeatureLine::new((10.0, 10.0), (10.0, 50.0))],
        vec![FeatureLine::new((30.0, 10.0), (30.0, 50.0))],
    )
    .unwrap()
}

#[test]
fn valid_job_exposes_defaults() {
    let job = MorphJob::new(input(8, 8), input(6, 9), pairing(), 3).unwrap();
    assert_eq!(job.frames(), 3);
    assert_eq!(job.slot_count(), 5);
    assert_eq!(job.params(), WarpParams::default());
    assert_eq!(job.background(), WHITE);
    assert_eq!(job.lines().len(), 1);
    assert_eq!(job.destination().image.height(), 9);
}

#[test]
fn frame_count_is_bounded() {
    assert!(MorphJob::new(input(4, 4), input(4, 4), pairing(), 0).is_err());
    assert!(MorphJob::new(input(4, 4), input(4, 4), pairing(), 31).is_err());
    assert!(MorphJob::new(input(4, 4), input(4, 4), pairing(), 30).is_ok());
}

#[test]
fn bad_weights_are_rejected() {
    let params = WarpParams {
        a: 0.0,
        ..WarpParams::default()
    };
    let err = MorphJob::with_options(input(4, 4), input(4, 4), pairing(), 2, params, WHITE)
        .unwrap_err();
    assert!(matches!(err, MorphError::InvalidInput(_)));
}

#[test]
fn placement_must_match_image() {
    let mut src = input(4, 4);
    src.placement.width = 5;
    let err = MorphJob::new(src, input(4, 4), pairing(), 2).unwrap_err();
    assert!(err.to_string().contains("source placement"));

    let mut dst = input(4, 4);
    dst.placement.offset = Vec2::new(f64::NAN, 0.0);
    assert!(MorphJob::new(input(4, 4), dst, pairing(), 2).is_err());
}
