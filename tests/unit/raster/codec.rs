use super::*;

#[test]
fn png_round_trip_is_lossless() {
    let img = ImageRGBA::from_fn(5, 3, |x, y| [x as u8 * 50, y as u8 * 80, 7, 128 + x as u8])
        .unwrap();
    let png = encode_png(&img).unwrap();
    assert_eq!(&png[1..4], b"PNG");
    assert_eq!(decode_image(&png).unwrap(), img);
}

#[test]
fn garbage_bytes_fail_to_decode() {
    let err = decode_image(b"definitely not an image").unwrap_err();
    assert!(err.to_string().contains("codec error"));
}

#[test]
fn save_png_creates_directories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("frame_0.png");
    let img = ImageRGBA::filled(2, 2, [1, 2, 3, 4]).unwrap();
    save_png(&img, &path).unwrap();
    assert_eq!(open_image(&path).unwrap(), img);
}
