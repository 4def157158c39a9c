use truechurn_core::ChurnError;
use truechurn_difflens::filter::PathFilter;
use truechurn_gitpulse::churn::{analyze, AnalysisRequest, AuthorSelection, ChurnReport};
use truechurn_gitpulse::mining::{CommitInfo, CommitQuery, DiffSource, MemorySource};
use truechurn_gitpulse::window::DateWindow;

// 2024-01-01T00:00:00Z
const JAN_1: i64 = 1_704_067_200;

fn commit(hash: &str, author: &str, day: i64) -> CommitInfo {
    CommitInfo {
        hash: hash.into(),
        author: author.into(),
        email: format!("{author}@example.com"),
        timestamp: JAN_1 + day * 86_400 + 3_600,
        message: format!("commit {hash}"),
    }
}

fn request(author: Option<&str>) -> AnalysisRequest {
    AnalysisRequest {
        window: DateWindow::parse("2024-01", "2024-02").unwrap(),
        selection: AuthorSelection::from_filter(author),
        filter: PathFilter::allow_all(),
        detail: false,
    }
}

fn run(source: &MemorySource, request: &AnalysisRequest) -> ChurnReport {
    analyze(source, request, |_, _| {}).unwrap()
}

fn totals(report: &ChurnReport, author: &str) -> (i64, i64) {
    let a = report
        .authors
        .iter()
        .find(|a| a.author == author)
        .unwrap_or_else(|| panic!("no totals for {author}"));
    (a.contribution, a.churn)
}

const ALICE_C1: &str = "\
diff --git a/a.py b/a.py
new file mode 100644
--- /dev/null
+++ b/a.py
@@ -0,0 +1,5 @@
+l1
+l2
+l3
+l4
+l5
";

// Removes l2 (written by C1) and appends three lines.
const ALICE_C2: &str = "\
diff --git a/a.py b/a.py
--- a/a.py
+++ b/a.py
@@ -2 +1,0 @@
-l2
@@ -5,0 +5,3 @@
+n1
+n2
+n3
";

// Removes l1 and l4 (both written by C1) and appends one line.
const ALICE_C3: &str = "\
diff --git a/a.py b/a.py
--- a/a.py
+++ b/a.py
@@ -1 +0,0 @@
-l1
@@ -3 +1,0 @@
-l4
@@ -7,0 +6 @@
+n4
";

fn alice_source() -> MemorySource {
    let mut source = MemorySource::new();
    source.push(commit("c1", "alice", 1), ALICE_C1);
    source.push(commit("c2", "alice", 2), ALICE_C2);
    source.push(commit("c3", "alice", 3), ALICE_C3);
    source
}

#[test]
fn three_commit_scenario() {
    let report = run(&alice_source(), &request(Some("alice")));
    assert_eq!(report.commits_analyzed, 3);
    assert_eq!(report.authors.len(), 1);
    assert_eq!(totals(&report, "alice"), (9, -3));
    assert_eq!(report.authors[0].commits, 3);
}

#[test]
fn rewrite_within_window_is_churn() {
    let mut source = MemorySource::new();
    source.push(
        commit("a", "alice", 1),
        "--- a/f.py\n+++ b/f.py\n@@ -9,0 +10 @@\n+line ten\n",
    );
    source.push(
        commit("b", "alice", 2),
        "--- a/f.py\n+++ b/f.py\n@@ -10 +9,0 @@\n-line ten\n",
    );
    let report = run(&source, &request(None));
    let (contribution, churn) = totals(&report, "alice");
    assert_eq!(contribution, 1);
    assert_eq!(churn, -1);
    assert_eq!(contribution + churn, 0);
}

#[test]
fn removal_of_pre_window_line_reduces_contribution() {
    let mut source = MemorySource::new();
    source.push(
        commit("a", "alice", 1),
        "--- a/f.py\n+++ b/f.py\n@@ -5 +4,0 @@\n-legacy\n",
    );
    let report = run(&source, &request(None));
    assert_eq!(totals(&report, "alice"), (-1, 0));
}

#[test]
fn commits_before_window_do_not_seed_the_ledger() {
    // Same history, but C1 lands in December and is outside the window.
    let mut source = MemorySource::new();
    source.push(commit("c1", "alice", -20), ALICE_C1);
    source.push(commit("c2", "alice", 2), ALICE_C2);
    source.push(commit("c3", "alice", 3), ALICE_C3);

    let report = run(&source, &request(Some("alice")));
    assert_eq!(report.commits_analyzed, 2);
    // C2: -1 +3, C3: -1 -1 +1
    assert_eq!(totals(&report, "alice"), (1, 0));
}

#[test]
fn excluded_directory_never_counts() {
    let mut source = MemorySource::new();
    source.push(
        commit("a", "alice", 1),
        "\
diff --git a/vendor/lib.py b/vendor/lib.py
--- /dev/null
+++ b/vendor/lib.py
@@ -0,0 +1,3 @@
+a
+b
+c
diff --git a/src/app.py b/src/app.py
--- /dev/null
+++ b/src/app.py
@@ -0,0 +1 @@
+main()
",
    );
    source.push(
        commit("b", "alice", 2),
        "\
diff --git a/Vendor/lib.py b/Vendor/lib.py
--- a/Vendor/lib.py
+++ b/Vendor/lib.py
@@ -1,2 +0,0 @@
-a
-b
",
    );

    let mut req = request(Some("alice"));
    req.filter = PathFilter::new(None, &["vendor".to_string()], &[]).unwrap();
    req.detail = true;
    let report = run(&source, &req);

    assert_eq!(totals(&report, "alice"), (1, 0));
    assert_eq!(report.files_skipped, 2);
    assert!(report.detail.iter().all(|d| d.file == "src/app.py"));
}

#[test]
fn authors_are_tracked_independently_with_shared_ledger() {
    let mut source = MemorySource::new();
    source.push(
        commit("b1", "bob", 1),
        "--- /dev/null\n+++ b/x.py\n@@ -0,0 +1,2 @@\n+b1\n+b2\n",
    );
    source.push(
        commit("c1", "carol", 2),
        "--- /dev/null\n+++ b/y.py\n@@ -0,0 +1 @@\n+c1\n",
    );
    // carol rewrites bob's second line
    source.push(
        commit("c2", "carol", 3),
        "--- a/x.py\n+++ b/x.py\n@@ -2 +2 @@\n-b2\n+B2\n",
    );
    // bob removes carol's line
    source.push(
        commit("b2", "bob", 4),
        "--- a/y.py\n+++ b/y.py\n@@ -1 +0,0 @@\n-c1\n",
    );

    let report = run(&source, &request(None));
    assert_eq!(report.author_filter, None);
    assert_eq!(report.authors.len(), 2);
    assert_eq!(report.authors[0].author, "bob");
    assert_eq!(report.authors[1].author, "carol");
    assert_eq!(totals(&report, "bob"), (2, -1));
    assert_eq!(totals(&report, "carol"), (2, -1));
}

#[test]
fn author_filter_only_replays_matching_commits() {
    let mut source = MemorySource::new();
    source.push(
        commit("b1", "bob", 1),
        "--- /dev/null\n+++ b/x.py\n@@ -0,0 +1 @@\n+b1\n",
    );
    source.push(
        commit("c1", "carol", 2),
        "--- a/x.py\n+++ b/x.py\n@@ -1 +0,0 @@\n-b1\n",
    );
    let report = run(&source, &request(Some("carol")));
    assert_eq!(report.commits_analyzed, 1);
    // bob's add is not replayed, so carol's removal predates the replay.
    assert_eq!(totals(&report, "carol"), (-1, 0));
}

#[test]
fn replay_is_idempotent() {
    let source = alice_source();
    let req = AnalysisRequest {
        detail: true,
        ..request(None)
    };
    let first = run(&source, &req);
    let second = run(&source, &req);
    assert_eq!(first.authors, second.authors);
    assert_eq!(first.detail, second.detail);
}

#[test]
fn totals_are_bounded_by_edit_count() {
    let report = run(&alice_source(), &request(None));
    // C1: 5 edits, C2: 4 edits, C3: 3 edits
    let edits = 12;
    let (contribution, churn) = totals(&report, "alice");
    assert!(contribution.abs() + churn.abs() <= edits);
    assert!(churn <= 0);
}

#[test]
fn malformed_hunk_aborts_the_run() {
    let mut source = alice_source();
    source.push(
        commit("bad", "alice", 4),
        "--- a/a.py\n+++ b/a.py\n@@ -1,x +1 @@\n-l3\n+L3\n",
    );
    let err = analyze(&source, &request(None), |_, _| {}).unwrap_err();
    match &err {
        ChurnError::InCommit { commit, source } => {
            assert_eq!(commit, "bad");
            assert!(matches!(**source, ChurnError::Parse(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("@@ -1,x +1 @@"));
}

struct FlakySource {
    inner: MemorySource,
    broken: &'static str,
}

impl DiffSource for FlakySource {
    fn list_commits(&self, query: &CommitQuery) -> Result<Vec<CommitInfo>, ChurnError> {
        self.inner.list_commits(query)
    }

    fn commit_patch(&self, commit: &CommitInfo) -> Result<String, ChurnError> {
        if commit.hash == self.broken {
            return Err(ChurnError::SourceUnavailable("git show exited with 128".into()));
        }
        self.inner.commit_patch(commit)
    }
}

#[test]
fn unavailable_source_aborts_the_run() {
    let source = FlakySource {
        inner: alice_source(),
        broken: "c2",
    };
    let mut seen = Vec::new();
    let err = analyze(&source, &request(None), |done, total| seen.push((done, total))).unwrap_err();
    assert!(err.to_string().starts_with("commit c2: diff source unavailable"));
    assert_eq!(seen, vec![(1, 3)]);
}

#[test]
fn empty_history_reports_zero_totals() {
    let report = run(&MemorySource::new(), &request(Some("alice")));
    assert_eq!(report.commits_analyzed, 0);
    assert_eq!(totals(&report, "alice"), (0, 0));

    let report = run(&MemorySource::new(), &request(None));
    assert!(report.authors.is_empty());
}

#[test]
fn progress_reports_every_commit() {
    let mut calls = Vec::new();
    analyze(&alice_source(), &request(None), |done, total| {
        calls.push((done, total))
    })
    .unwrap();
    assert_eq!(calls, vec![(1, 3), (2, 3), (3, 3)]);
}

#[test]
fn invalid_range_is_rejected_up_front() {
    let err = DateWindow::parse("2024-03", "2024-01").unwrap_err();
    assert!(matches!(err, ChurnError::InvalidDateRange(_)));
}
