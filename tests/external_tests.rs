use defragd::external::btrfs_cmd::parse_subvolume_list;
use defragd::external::fatrace::{drain_write_events, under_root};
use defragd::external::mount_table::{btrfs_mounts, parse_mounts};
use std::io::Cursor;
use std::path::PathBuf;

// --- btrfs_cmd ---

#[test]
fn subvolume_list_extracts_the_trailing_path_field() {
    let text = "ID 256 gen 10 top level 5 path data\nID 257 gen 12 top level 5 path backups\n";
    assert_eq!(parse_subvolume_list(text), vec!["data".to_string(), "backups".to_string()]);
}

#[test]
fn subvolume_list_of_empty_output_is_empty() {
    assert!(parse_subvolume_list("").is_empty());
}

// --- mount table ---

#[test]
fn parses_a_proc_mounts_shaped_line() {
    let text = "/dev/sda1 /mnt/data btrfs rw,relatime,compress=zstd:3,space_cache 0 0\n";
    let entries = parse_mounts(text);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].device, "/dev/sda1");
    assert_eq!(entries[0].mount_point, PathBuf::from("/mnt/data"));
    assert_eq!(entries[0].fs_type, "btrfs");
    assert!(entries[0].options.contains(&"compress=zstd:3".to_string()));
}

#[test]
fn short_lines_are_ignored() {
    let text = "tmpfs /tmp\n";
    assert!(parse_mounts(text).is_empty());
}

#[test]
fn btrfs_mounts_filters_non_btrfs_and_dedups_bind_mounts() {
    let text = "\
/dev/sda1 /mnt/data btrfs rw 0 0
/dev/sda2 / ext4 rw 0 0
/dev/sda1 /mnt/data btrfs ro,bind 0 0
/dev/sda1 /mnt/data2 btrfs rw 0 0
";
    let entries = parse_mounts(text);
    let btrfs = btrfs_mounts(&entries);
    assert_eq!(btrfs.len(), 2);
    assert!(btrfs.iter().all(|e| e.fs_type == "btrfs"));
}

#[test]
fn a_later_stacked_mount_shadows_the_earlier_one_at_the_same_point() {
    let text = "\
/dev/sda1 /mnt/data btrfs rw 0 0
/dev/sda1 /mnt/data btrfs ro,bind 0 0
";
    let entries = parse_mounts(text);
    let btrfs = btrfs_mounts(&entries);
    assert_eq!(btrfs.len(), 1);
    assert!(btrfs[0].options.iter().any(|o| o == "ro"));
}

// --- fatrace ---

#[test]
fn write_events_are_extracted_and_non_writes_dropped() {
    let log = "\
rsync(1234): W /data/a.txt
cat(1235): RO /data/b.txt
rsync(1234): CW /data/c.txt
";
    let mut cursor = Cursor::new(log.as_bytes());
    let paths = drain_write_events(&mut cursor);
    assert_eq!(paths, vec![PathBuf::from("/data/a.txt"), PathBuf::from("/data/c.txt")]);
}

#[test]
fn rename_target_suffix_is_stripped_from_the_path() {
    let log = "mv(42): W /data/old.txt -> /data/new.txt\n";
    let mut cursor = Cursor::new(log.as_bytes());
    let paths = drain_write_events(&mut cursor);
    assert_eq!(paths, vec![PathBuf::from("/data/old.txt")]);
}

#[test]
fn writes_by_our_own_process_are_filtered_out() {
    let log = "\
defragd(99): W /data/a.txt
rsync(1234): W /data/b.txt
";
    let mut cursor = Cursor::new(log.as_bytes());
    let paths = drain_write_events(&mut cursor);
    assert_eq!(paths, vec![PathBuf::from("/data/b.txt")]);
}

#[test]
fn empty_stream_yields_no_events() {
    let mut cursor = Cursor::new(&b""[..]);
    assert!(drain_write_events(&mut cursor).is_empty());
}

#[test]
fn under_root_checks_path_prefix() {
    assert!(under_root(&PathBuf::from("/mnt/data/a.txt"), &PathBuf::from("/mnt/data")));
    assert!(!under_root(&PathBuf::from("/mnt/other/a.txt"), &PathBuf::from("/mnt/data")));
}
