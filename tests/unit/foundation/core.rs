use super::*;

#[test]
fn frame_count_bounds_are_inclusive() {
    assert_eq!(check_frame_count(1).unwrap(), 1);
    assert_eq!(check_frame_count(30).unwrap(), 30);
    assert!(check_frame_count(0).is_err());
    assert!(check_frame_count(31).is_err());
}

#[test]
fn canvas_union_takes_max_of_each_axis() {
    let a = Canvas {
        width: 10,
        height: 40,
    };
    let b = Canvas {
        width: 25,
        height: 5,
    };
    assert_eq!(
        a.union(b),
        Canvas {
            width: 25,
            height: 40
        }
    );
}

#[test]
fn frame_index_displays_as_number() {
    assert_eq!(FrameIndex(7).to_string(), "7");
}
