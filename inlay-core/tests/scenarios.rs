/// End-to-end jobs over real files on disk
///
/// Each test lays out a tiny theme in a temp directory (entry sheet, imported
/// partials, a fonts folder), runs the full pipeline, and checks the file that
/// lands at the destination.
use std::fs;
use std::path::Path;

use inlay_core::job::{run_batch, JobStatus, RunOptions};
use inlay_core::{process, process_job, CyclePolicy, InlineError, InlineOptions, Job, Stage};

fn write(path: &Path, contents: impl AsRef<[u8]>) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("mkdir");
    }
    fs::write(path, contents).expect("write fixture");
}

#[test]
fn import_is_replaced_by_its_contents() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let root = tmp.path();
    write(&root.join("main.css"), "@import \"base.css\";");
    write(&root.join("base.css"), ".x{color:red}");

    let dest = root.join("out.css");
    process(&root.join("main.css"), &dest, root).expect("process");

    assert_eq!(fs::read_to_string(&dest).unwrap(), ".x{color:red}");
}

#[test]
fn font_url_becomes_data_uri() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let root = tmp.path();
    let fonts = root.join("fontbase");
    let bytes = [0x77u8, 0x4f, 0x46, 0x32, 0x00, 0x01];
    write(&fonts.join("fonts/a.woff2"), bytes);
    write(&root.join("theme.css"), ".font{src:url(\"fonts/a.woff2\")}");

    let dest = root.join("out.css");
    process(&root.join("theme.css"), &dest, &fonts).expect("process");

    assert_eq!(
        fs::read_to_string(&dest).unwrap(),
        ".font{src:url(\"data:font/woff2;base64,d09GMgAB\")}"
    );
}

#[test]
fn circular_import_fails_without_output() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let root = tmp.path();
    write(&root.join("a.css"), "@import \"b.css\";\n.a{}");
    write(&root.join("b.css"), "@import \"a.css\";\n.b{}");

    let dest = root.join("out.css");
    let err = process(&root.join("a.css"), &dest, root).unwrap_err();

    match &err {
        InlineError::CircularImport { chain } => {
            assert_eq!(chain.len(), 3);
            assert!(chain[0].ends_with("a.css"));
            assert!(chain[1].ends_with("b.css"));
            assert!(chain[2].ends_with("a.css"));
        }
        other => panic!("expected a cycle, got {other}"),
    }
    assert_eq!(err.stage(), Stage::ImportResolution);
    assert!(!dest.exists());
}

#[test]
fn missing_source_fails_and_other_jobs_still_run() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let root = tmp.path();
    write(&root.join("ok.css"), ".ok{}");

    let jobs = vec![
        Job::new(root.join("missing.css"), root.join("missing.out.css")),
        Job::new(root.join("ok.css"), root.join("ok.out.css")),
    ];
    let outcomes =
        run_batch(&jobs, &InlineOptions::new(root), &RunOptions::default()).expect("batch");

    assert_eq!(outcomes.len(), 2);
    match &outcomes[0].status {
        JobStatus::Failed { stage, message } => {
            assert_eq!(*stage, Stage::Read);
            assert!(message.contains("missing.css"));
        }
        JobStatus::Ok(_) => panic!("missing source should fail"),
    }
    assert!(!root.join("missing.out.css").exists());

    assert!(outcomes[1].is_ok());
    assert_eq!(fs::read_to_string(root.join("ok.out.css")).unwrap(), ".ok{}");
}

#[test]
fn missing_output_dir_is_a_write_error() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let root = tmp.path();
    write(&root.join("a.css"), ".a{}");

    let err = process(&root.join("a.css"), &root.join("nope/out.css"), root).unwrap_err();
    assert!(matches!(err, InlineError::OutputWrite { .. }));
    assert_eq!(err.stage(), Stage::Write);
}

#[test]
fn imported_sheets_get_their_fonts_inlined() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let root = tmp.path();
    let fonts = root.join("theme/fonts/source-sans-pro");
    write(&fonts.join("source-sans-pro-regular.woff"), b"regular");
    write(&fonts.join("source-sans-pro-regular.eot"), b"eot");
    write(
        &fonts.join("source-sans-pro.css"),
        "@font-face{font-family:'Source Sans Pro';\
         src:url('source-sans-pro-regular.eot');\
         src:url('source-sans-pro-regular.eot?#iefix') format('embedded-opentype'),\
         url('source-sans-pro-regular.woff') format('woff'),\
         url('source-sans-pro-regular.ttf') format('truetype')}",
    );
    write(
        &root.join("theme/white.css"),
        "@import url(./fonts/source-sans-pro/source-sans-pro.css);\n.reveal{font-family:'Source Sans Pro'}",
    );

    let dest = root.join("white.out.css");
    let report = process(&root.join("theme/white.css"), &dest, &fonts).expect("process");
    let out = fs::read_to_string(&dest).unwrap();

    assert!(!out.contains("@import"));
    assert!(out.contains("url(\"data:application/vnd.ms-fontobject;base64,ZW90\")"));
    assert!(out.contains("url(\"data:font/woff;base64,cmVndWxhcg==\") format('woff')"));
    assert!(!out.contains("source-sans-pro-regular.woff"));
    assert!(!out.contains("source-sans-pro-regular.eot"));
    // no ttf on disk, so that reference is left as written
    assert!(out.contains("url('source-sans-pro-regular.ttf')"));
    assert_eq!(report.rewrites_for("inline-urls"), 3);
}

#[test]
fn assets_next_to_the_source_are_found_after_the_font_dir() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let root = tmp.path();
    write(&root.join("css/icons.svg"), "<svg/>");
    write(&root.join("css/theme.css"), ".i{background:url(icons.svg)}");
    fs::create_dir_all(root.join("fonts")).unwrap();

    let dest = root.join("out.css");
    process(&root.join("css/theme.css"), &dest, &root.join("fonts")).expect("process");

    assert_eq!(
        fs::read_to_string(&dest).unwrap(),
        ".i{background:url(\"data:image/svg+xml;base64,PHN2Zy8+\")}"
    );
}

#[test]
fn skip_policy_writes_output_despite_cycle() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let root = tmp.path();
    write(&root.join("a.css"), "@import \"b.css\";.a{}");
    write(&root.join("b.css"), "@import \"a.css\";.b{}");

    let dest = root.join("out.css");
    let opts = InlineOptions::new(root).cycle_policy(CyclePolicy::Skip);
    process_job(&Job::new(root.join("a.css"), &dest), &opts).expect("process");

    assert_eq!(fs::read_to_string(&dest).unwrap(), ".b{}.a{}");
}

#[test]
fn existing_destination_is_overwritten() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let root = tmp.path();
    write(&root.join("a.css"), ".new{}");
    write(&root.join("out.css"), ".old{}");

    process(&root.join("a.css"), &root.join("out.css"), root).expect("process");
    assert_eq!(fs::read_to_string(root.join("out.css")).unwrap(), ".new{}");
}

#[test]
fn partial_assets_resolve_relative_to_the_partial() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let root = tmp.path();
    let fonts = root.join("fonts");
    fs::create_dir_all(&fonts).expect("mkdir fonts");
    write(&root.join("main.css"), "@import \"partials/p.css\";");
    write(
        &root.join("partials/p.css"),
        ".p{background:url(img/a.svg)}",
    );
    write(&root.join("partials/img/a.svg"), "<svg/>");

    let dest = root.join("out.css");
    let report = process(&root.join("main.css"), &dest, &fonts).expect("process");

    let out = fs::read_to_string(&dest).unwrap();
    assert_eq!(out, ".p{background:url(\"data:image/svg+xml;base64,PHN2Zy8+\")}");
    assert_eq!(report.rewrites_for("inline-urls"), 1);
}

#[test]
fn partial_assets_do_not_pick_up_same_named_root_files() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let root = tmp.path();
    let fonts = root.join("fonts");
    fs::create_dir_all(&fonts).expect("mkdir fonts");
    write(&root.join("main.css"), "@import \"partials/p.css\";");
    write(&root.join("partials/p.css"), ".p{src:url(a.ttf)}");
    write(&root.join("a.ttf"), "root");

    let dest = root.join("out.css");
    process(&root.join("main.css"), &dest, &fonts).expect("process");

    assert_eq!(fs::read_to_string(&dest).unwrap(), ".p{src:url(a.ttf)}");
}

#[test]
fn only_the_entry_sheet_keeps_its_charset() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let root = tmp.path();
    write(
        &root.join("main.css"),
        "@charset \"UTF-8\";\n@import \"b.css\";\n.m{}",
    );
    write(&root.join("b.css"), "@charset \"UTF-8\";\n.b{}");

    let dest = root.join("out.css");
    process(&root.join("main.css"), &dest, root).expect("process");

    let out = fs::read_to_string(&dest).unwrap();
    assert_eq!(out.matches("@charset").count(), 1);
    assert!(out.starts_with("@charset \"UTF-8\";\n.b{}"));
}
