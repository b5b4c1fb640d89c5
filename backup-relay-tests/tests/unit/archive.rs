//! Archiver behavior across both container kinds

use backup_relay::utils::archive::{list_members, pack, ArchiveError};
use rstest::rstest;
use std::collections::BTreeSet;
use test_utils::{archive_contents, ArchiveKind, TestContext};

#[rstest]
#[case::tar_single(ArchiveKind::Tar, &["only.txt"])]
#[case::tar_many(ArchiveKind::Tar, &["a.sql", "b.json", "c.tar", "d"])]
#[case::zip_single(ArchiveKind::Zip, &["only.txt"])]
#[case::zip_many(ArchiveKind::Zip, &["a.sql", "b.json", "c.tar", "d"])]
fn test_members_are_base_names(#[case] kind: ArchiveKind, #[case] names: &[&str]) {
    let ctx = TestContext::new();
    // Spread the inputs over different directories
    let paths: Vec<_> = names
        .iter()
        .enumerate()
        .map(|(i, name)| ctx.create_file(&format!("dir{}/nested/{}", i, name), name))
        .collect();
    let output = ctx.temp_dir().join(format!("out.{}", kind.extension()));

    pack(&paths, kind, &output).unwrap();

    let members = list_members(&output, kind).unwrap();
    let unique: BTreeSet<_> = members.iter().cloned().collect();
    let expected: BTreeSet<_> = names.iter().map(|n| n.to_string()).collect();
    assert_eq!(members.len(), names.len());
    assert_eq!(unique, expected);
}

#[rstest]
#[case(ArchiveKind::Tar)]
#[case(ArchiveKind::Zip)]
fn test_members_keep_input_order(#[case] kind: ArchiveKind) {
    let ctx = TestContext::new();
    let paths = vec![
        ctx.create_file("z.txt", "z"),
        ctx.create_file("a.txt", "a"),
        ctx.create_file("m.txt", "m"),
    ];
    let output = ctx.temp_dir().join("ordered");

    pack(&paths, kind, &output).unwrap();

    assert_eq!(list_members(&output, kind).unwrap(), vec!["z.txt", "a.txt", "m.txt"]);
}

#[rstest]
#[case(ArchiveKind::Tar)]
#[case(ArchiveKind::Zip)]
fn test_directories_are_recursive(#[case] kind: ArchiveKind) {
    let ctx = TestContext::new();
    ctx.create_file("etc/app/main.conf", "main");
    ctx.create_file("etc/app/conf.d/extra.conf", "extra");
    let output = ctx.temp_dir().join("dir-archive");

    pack(&[ctx.temp_dir().join("etc/app")], kind, &output).unwrap();

    let contents = archive_contents(&output, kind);
    assert_eq!(contents.get("app/main.conf").unwrap(), b"main");
    assert_eq!(contents.get("app/conf.d/extra.conf").unwrap(), b"extra");
    assert_eq!(list_members(&output, kind).unwrap(), vec!["app"]);
}

#[rstest]
#[case(ArchiveKind::Tar)]
#[case(ArchiveKind::Zip)]
fn test_unreadable_member_leaves_no_output(#[case] kind: ArchiveKind) {
    let ctx = TestContext::new();
    let present = ctx.create_file("present.txt", "here");
    let output = ctx.temp_dir().join("broken");

    let err = pack(&[present, ctx.temp_dir().join("gone.txt")], kind, &output).unwrap_err();

    assert!(matches!(err, ArchiveError::UnreadableMember { .. }));
    assert!(!output.exists());
}

#[rstest]
#[case(ArchiveKind::Tar)]
#[case(ArchiveKind::Zip)]
fn test_shared_base_name_is_rejected(#[case] kind: ArchiveKind) {
    let ctx = TestContext::new();
    let first = ctx.create_file("a/config.yml", "a");
    let second = ctx.create_file("b/config.yml", "b");
    let output = ctx.temp_dir().join("clash");

    let err = pack(&[first, second], kind, &output).unwrap_err();

    assert!(matches!(err, ArchiveError::DuplicateMember(ref name) if name == "config.yml"));
    assert!(!output.exists());
}

#[test]
fn test_repeated_top_level_tar_entries_are_listed() {
    let ctx = TestContext::new();
    let output = ctx.temp_dir().join("repeated.tar");
    let mut builder = tar::Builder::new(std::fs::File::create(&output).unwrap());
    for content in ["one", "two"] {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, "same.txt", content.as_bytes())
            .unwrap();
    }
    builder.finish().unwrap();
    drop(builder);

    assert_eq!(
        list_members(&output, ArchiveKind::Tar).unwrap(),
        vec!["same.txt", "same.txt"]
    );
}
