use defragd::cost_model::DriveGeometry;
use defragd::types::{CompressionClass, FragRecord};

// --- seek_time ---

#[test]
fn zero_seek_time_is_cost_one_for_all_sizes() {
    let geo = DriveGeometry::new(1.0);
    assert_eq!(geo.fragmentation_cost(1, 0.0), 1.0);
    assert_eq!(geo.fragmentation_cost(1_000_000_000, 0.0), 1.0);
}

#[test]
fn zero_size_is_cost_one() {
    let geo = DriveGeometry::new(1.0);
    assert_eq!(geo.fragmentation_cost(0, 5.0), 1.0);
}

#[test]
fn cost_is_non_decreasing_in_seek_time() {
    let geo = DriveGeometry::new(1.0);
    let low = geo.fragmentation_cost(10_000_000, 0.01);
    let high = geo.fragmentation_cost(10_000_000, 0.1);
    assert!(high >= low);
}

#[test]
fn backward_seek_within_overlap_window_is_free() {
    let geo = DriveGeometry::new(1.0);
    assert_eq!(geo.seek_time(1_000, 990), 0.0);
}

#[test]
fn backward_seek_beyond_overlap_window_costs_time() {
    let geo = DriveGeometry::new(1.0);
    assert!(geo.seek_time(100_000, 10) > 0.0);
}

#[test]
fn same_track_seek_scales_with_revolution() {
    let geo = DriveGeometry::new(1.0);
    // A seek of half a track should take roughly half a revolution.
    let half_track_blocks = (geo.track_size_bytes / 4096.0 / 2.0) as u64;
    let t = geo.seek_time(0, half_track_blocks);
    assert!(t > 0.0 && t < geo.revolution_secs);
}

#[test]
fn long_seek_uses_min_max_interpolation_and_stays_in_bounds() {
    let geo = DriveGeometry::new(1.0);
    let t = geo.seek_time(0, 50_000_000);
    assert!(t >= geo.min_seek_secs && t <= geo.max_seek_secs);
}

#[test]
fn more_drives_increase_transfer_rate_and_lower_cost() {
    let one_drive = DriveGeometry::new(1.0);
    let four_drives = DriveGeometry::new(4.0);
    assert!(four_drives.transfer_rate_bytes_per_sec > one_drive.transfer_rate_bytes_per_sec);

    let cost_one = one_drive.fragmentation_cost(100_000_000, 0.05);
    let cost_four = four_drives.fragmentation_cost(100_000_000, 0.05);
    assert!(cost_four <= cost_one);
}

#[test]
fn drive_count_below_one_is_clamped() {
    let geo = DriveGeometry::new(0.0);
    assert_eq!(geo.drive_count, 1.0);
}

// --- defrag_time ---

#[test]
fn one_extent_file_has_cost_one() {
    let geo = DriveGeometry::new(1.0);
    let record = FragRecord {
        short_path: "a".into(),
        size: 1_000_000,
        compressed: false,
        cost: geo.fragmentation_cost(1_000_000, 0.0),
    };
    assert_eq!(record.cost, 1.0);
}

#[test]
fn compressed_defrag_time_is_scaled_down() {
    let geo = DriveGeometry::new(1.0);
    let uncompressed = FragRecord {
        short_path: "a".into(),
        size: 10_000_000,
        compressed: false,
        cost: 2.0,
    };
    let compressed = FragRecord {
        compressed: true,
        ..uncompressed.clone()
    };
    let t_uncompressed = geo.defrag_time(&uncompressed, 1.2);
    let t_compressed = geo.defrag_time(&compressed, 1.2);
    assert!(t_compressed < t_uncompressed);
}

#[test]
fn class_of_compressed_flag_round_trips() {
    assert_eq!(CompressionClass::of(true), CompressionClass::Compressed);
    assert_eq!(CompressionClass::of(false), CompressionClass::Uncompressed);
}
