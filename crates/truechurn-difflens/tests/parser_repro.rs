use std::path::{Path, PathBuf};

use truechurn_core::{EditKind, LineEdit};
use truechurn_difflens::filter::PathFilter;
use truechurn_difflens::parser::parse_unified_diff;

#[test]
fn parse_patch_without_git_header() {
    let diff = "\
--- /dev/null
+++ b/scripts/churn.py
@@ -0,0 +1,3 @@
+def main():
+    print(\"hello\")
+
";
    let files = parse_unified_diff(diff).unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].new_path, PathBuf::from("scripts/churn.py"));
    assert_eq!(files[0].hunks[0].added(), 3);
}

#[test]
fn git_show_fixture() {
    let diff = include_str!("fixtures/show.diff");
    let files = parse_unified_diff(diff).unwrap();

    // The binary logo is dropped.
    assert_eq!(files.len(), 2);
    assert_eq!(files[0].path(), Path::new("gitcodechurn.py"));
    assert_eq!(files[1].path(), Path::new("README.md"));
    assert!(files[1].is_new_file);

    let script = &files[0];
    assert_eq!(script.hunks.len(), 3);
    assert_eq!(
        script.hunks[0].edits,
        vec![
            LineEdit::removed(12, "import datetime"),
            LineEdit::added(12, "import time"),
        ]
    );
    let added: Vec<u32> = script.hunks[1].edits.iter().map(|e| e.position).collect();
    assert_eq!(added, vec![41, 42, 43]);
    assert!(script.hunks[2]
        .edits
        .iter()
        .all(|e| e.kind == EditKind::Removed));
    assert_eq!(script.hunks[2].edits[1].position, 89);
    assert_eq!(script.edit_count(), 7);
}

#[test]
fn fixture_through_exclusion_filter() {
    let files = parse_unified_diff(include_str!("fixtures/show.diff")).unwrap();
    let filter = PathFilter::new(None, &[], &["*.md".to_string()]).unwrap();
    let result = filter.filter(files);
    assert_eq!(result.kept.len(), 1);
    assert_eq!(result.skipped[0].path, PathBuf::from("README.md"));
}
