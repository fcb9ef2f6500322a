use defragd::cost_model::DriveGeometry;
use defragd::extent_parser::parse_extent_listing;

fn geo() -> DriveGeometry {
    DriveGeometry::new(1.0)
}

// --- single-file listings ---

#[test]
fn single_extent_file_parses_with_cost_one() {
    let text = "\
File size of /data/a.txt is 4194304 (1024 blocks, blocksize 4096)
 ext:     logical_offset:        physical_offset: length:   expected: flags:
   0:        0..    1023:     1000..      2023:   1024:             last
/data/a.txt: 1 extent found
";
    let (records, errors) = parse_extent_listing(&geo(), text);
    assert_eq!(errors, 0);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].cost, 1.0);
    assert_eq!(records[0].size, 4194304);
    assert!(!records[0].compressed);
}

#[test]
fn multi_extent_file_accumulates_seek_time_and_raises_cost() {
    let text = "\
File size of /data/b.txt is 8388608
 ext:     logical_offset:        physical_offset: length:   expected: flags:
   0:        0..    1023:        0..     1023:   1024:
   1:     1024..    2047:   900000..  901023:   1024:   1024
/data/b.txt: 2 extents found
";
    let (records, errors) = parse_extent_listing(&geo(), text);
    assert_eq!(errors, 0);
    assert_eq!(records.len(), 1);
    assert!(records[0].cost > 1.0);
}

#[test]
fn encoded_flag_marks_file_compressed() {
    let text = "\
File size of /data/c.txt is 1048576
 ext:     logical_offset:        physical_offset: length:   expected: flags:
   0:        0..     255:        0..     255:    256:             encoded,last
/data/c.txt: 1 extent found
";
    let (records, _errors) = parse_extent_listing(&geo(), text);
    assert_eq!(records.len(), 1);
    assert!(records[0].compressed);
}

#[test]
fn batched_listing_yields_one_record_per_file() {
    let text = "\
File size of /data/a.txt is 4096
 ext:     logical_offset:        physical_offset: length:   expected: flags:
   0:        0..      0:        0..       0:      1:             last
/data/a.txt: 1 extent found
File size of /data/b.txt is 8192
 ext:     logical_offset:        physical_offset: length:   expected: flags:
   0:        0..      1:     5000..    5001:      2:             last
/data/b.txt: 1 extent found
";
    let (records, errors) = parse_extent_listing(&geo(), text);
    assert_eq!(errors, 0);
    assert_eq!(records.len(), 2);
}

// --- protocol errors ---

#[test]
fn unrecognized_line_is_logged_and_skipped_without_panicking() {
    let text = "\
File size of /data/a.txt is 4096
 ext:     logical_offset:        physical_offset: length:   expected: flags:
this is not an extent line at all
/data/a.txt: 1 extent found
";
    let (records, errors) = parse_extent_listing(&geo(), text);
    assert_eq!(errors, 1);
    assert!(records.is_empty());
}

#[test]
fn truncated_output_without_footer_is_dropped_and_counted() {
    let text = "\
File size of /data/a.txt is 4096
 ext:     logical_offset:        physical_offset: length:   expected: flags:
   0:        0..      0:        0..       0:      1:             last
";
    let (records, errors) = parse_extent_listing(&geo(), text);
    assert_eq!(errors, 1);
    assert!(records.is_empty());
}

#[test]
fn empty_input_yields_nothing() {
    let (records, errors) = parse_extent_listing(&geo(), "");
    assert_eq!(errors, 0);
    assert!(records.is_empty());
}
