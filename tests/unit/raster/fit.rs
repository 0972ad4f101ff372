use super::*;

fn canvas(width: u32, height: u32) -> Canvas {
    Canvas { width, height }
}

#[test]
fn wide_image_is_letterboxed() {
    let p = fit_placement(canvas(200, 100), canvas(100, 100)).unwrap();
    assert_eq!((p.width, p.height), (100, 50));
    assert_eq!(p.offset, Vec2::new(0.0, 25.0));
}

#[test]
fn tall_image_is_pillarboxed() {
    let p = fit_placement(canvas(50, 100), canvas(300, 100)).unwrap();
    assert_eq!((p.width, p.height), (50, 100));
    assert_eq!(p.offset, Vec2::new(125.0, 0.0));
}

#[test]
fn zero_sized_inputs_are_rejected() {
    assert!(fit_placement(canvas(0, 10), canvas(10, 10)).is_err());
    assert!(fit_placement(canvas(10, 10), canvas(10, 0)).is_err());
}

#[test]
fn fit_center_resizes_pixels() {
    let img = ImageRGBA::filled(40, 20, [10, 20, 30, 255]).unwrap();
    let (out, placement) = fit_center(&img, canvas(20, 20)).unwrap();
    assert_eq!((out.width(), out.height()), (20, 10));
    assert_eq!(placement.offset, Vec2::new(0.0, 5.0));
    assert_eq!(out.pixel(10, 5), Some([10, 20, 30, 255]));
}

#[test]
fn fit_center_keeps_exact_fit_untouched() {
    let img = ImageRGBA::from_fn(8, 8, |x, y| [x as u8, y as u8, 0, 255]).unwrap();
    let (out, placement) = fit_center(&img, canvas(8, 8)).unwrap();
    assert_eq!(out, img);
    assert_eq!(placement, Placement::at_origin(8, 8));
}
