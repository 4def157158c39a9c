use git2::{Commit, Oid, Repository, Signature, Time};
use tempfile::TempDir;
use truechurn_difflens::filter::PathFilter;
use truechurn_difflens::parser::parse_unified_diff;
use truechurn_gitpulse::churn::{analyze, AnalysisRequest, AuthorSelection, ChurnReport};
use truechurn_gitpulse::mining::{CommitQuery, DiffSource, GitSource};
use truechurn_gitpulse::window::DateWindow;

// 2024-01-01T00:00:00Z
const JAN_1: i64 = 1_704_067_200;

struct TestRepo {
    dir: TempDir,
    repo: Repository,
}

impl TestRepo {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        Self { dir, repo }
    }

    fn commit(
        &self,
        update_ref: Option<&str>,
        parents: &[Oid],
        author: &str,
        day: i64,
        files: &[(&str, &str)],
    ) -> Oid {
        let parent_commits: Vec<Commit> = parents
            .iter()
            .map(|p| self.repo.find_commit(*p).unwrap())
            .collect();
        let base_tree = parent_commits.first().map(|c| c.tree().unwrap());

        let mut builder = self.repo.treebuilder(base_tree.as_ref()).unwrap();
        for &(path, content) in files {
            let blob = self.repo.blob(content.as_bytes()).unwrap();
            builder.insert(path, blob, 0o100644).unwrap();
        }
        let tree = self.repo.find_tree(builder.write().unwrap()).unwrap();

        let time = Time::new(JAN_1 + day * 86_400 + 3_600, 0);
        let sig = Signature::new(author, &format!("{author}@example.com"), &time).unwrap();
        let parent_refs: Vec<&Commit> = parent_commits.iter().collect();
        self.repo
            .commit(
                update_ref,
                &sig,
                &sig,
                &format!("change by {author}"),
                &tree,
                &parent_refs,
            )
            .unwrap()
    }
}

struct History {
    repo: TestRepo,
    c1: Oid,
    c2: Oid,
    c3: Oid,
    side: Oid,
    bob: Oid,
    merge: Oid,
}

/// alice writes and rewrites a.py, carol commits on a side branch, bob
/// commits on the main line and merges the side branch.
fn history() -> History {
    let repo = TestRepo::new();
    let c1 = repo.commit(
        Some("HEAD"),
        &[],
        "alice",
        1,
        &[("a.py", "l1\nl2\nl3\nl4\nl5\n")],
    );
    let c2 = repo.commit(
        Some("HEAD"),
        &[c1],
        "alice",
        2,
        &[("a.py", "l1\nl3\nl4\nl5\nn1\nn2\nn3\n")],
    );
    let c3 = repo.commit(
        Some("HEAD"),
        &[c2],
        "alice",
        3,
        &[("a.py", "l3\nl5\nn1\nn2\nn3\nn4\n")],
    );
    let side = repo.commit(None, &[c3], "carol", 4, &[("c.py", "side\n")]);
    let bob = repo.commit(Some("HEAD"), &[c3], "bob", 5, &[("b.py", "one\ntwo\n")]);
    let merge = repo.commit(
        Some("HEAD"),
        &[bob, side],
        "bob",
        6,
        &[("c.py", "side\n")],
    );
    History {
        repo,
        c1,
        c2,
        c3,
        side,
        bob,
        merge,
    }
}

fn january() -> DateWindow {
    DateWindow::parse("2024-01", "2024-02").unwrap()
}

fn run(source: &GitSource, window: DateWindow, author: Option<&str>) -> ChurnReport {
    let request = AnalysisRequest {
        window,
        selection: AuthorSelection::from_filter(author),
        filter: PathFilter::allow_all(),
        detail: true,
    };
    analyze(source, &request, |_, _| {}).unwrap()
}

fn totals(report: &ChurnReport, author: &str) -> (i64, i64) {
    let a = report.authors.iter().find(|a| a.author == author).unwrap();
    (a.contribution, a.churn)
}

#[test]
fn lists_commits_oldest_first_without_merges() {
    let h = history();
    let source = GitSource::open(h.repo.dir.path()).unwrap();
    let query = CommitQuery {
        window: january(),
        author: None,
    };
    let hashes: Vec<String> = source
        .list_commits(&query)
        .unwrap()
        .into_iter()
        .map(|c| c.hash)
        .collect();

    assert_eq!(hashes.len(), 5);
    assert_eq!(
        &hashes[..3],
        &[h.c1.to_string(), h.c2.to_string(), h.c3.to_string()]
    );
    assert!(hashes.contains(&h.side.to_string()));
    assert!(hashes.contains(&h.bob.to_string()));
    assert!(!hashes.contains(&h.merge.to_string()));
}

#[test]
fn author_filter_limits_commits() {
    let h = history();
    let source = GitSource::open(h.repo.dir.path()).unwrap();
    let query = CommitQuery {
        window: january(),
        author: Some("alice".into()),
    };
    let commits = source.list_commits(&query).unwrap();
    assert_eq!(commits.len(), 3);
    assert!(commits.iter().all(|c| c.author == "alice"));
    assert_eq!(commits[0].message, "change by alice");
}

#[test]
fn root_commit_patch_adds_every_line() {
    let h = history();
    let source = GitSource::open(h.repo.dir.path()).unwrap();
    let query = CommitQuery {
        window: january(),
        author: None,
    };
    let first = source.list_commits(&query).unwrap().remove(0);
    let patch = source.commit_patch(&first).unwrap();

    let files = parse_unified_diff(&patch).unwrap();
    assert_eq!(files.len(), 1);
    assert!(files[0].is_new_file);
    assert_eq!(files[0].path().to_str(), Some("a.py"));
    let positions: Vec<u32> = files[0].hunks[0].edits.iter().map(|e| e.position).collect();
    assert_eq!(positions, vec![1, 2, 3, 4, 5]);
}

#[test]
fn alice_rewrites_three_of_her_lines() {
    let h = history();
    let source = GitSource::open(h.repo.dir.path()).unwrap();
    let report = run(&source, january(), Some("alice"));
    assert_eq!(report.commits_analyzed, 3);
    assert_eq!(totals(&report, "alice"), (9, -3));

    let line_two = report
        .detail
        .iter()
        .find(|d| d.file == "a.py" && d.position == 2)
        .unwrap();
    assert_eq!((line_two.added, line_two.removed), (1, 1));
}

#[test]
fn every_author_without_filter() {
    let h = history();
    let source = GitSource::open(h.repo.dir.path()).unwrap();
    let report = run(&source, january(), None);
    assert_eq!(report.commits_analyzed, 5);
    assert_eq!(totals(&report, "alice"), (9, -3));
    assert_eq!(totals(&report, "bob"), (2, 0));
    assert_eq!(totals(&report, "carol"), (1, 0));
}

#[test]
fn window_start_excludes_first_commit() {
    let h = history();
    let source = GitSource::open(h.repo.dir.path()).unwrap();
    let window = DateWindow::parse("2024-01-03", "2024-02").unwrap();
    let report = run(&source, window, Some("alice"));
    assert_eq!(report.commits_analyzed, 2);
    assert_eq!(totals(&report, "alice"), (1, 0));
}

#[test]
fn open_from_subdirectory_reports_prefix() {
    let h = history();
    let sub = h.repo.dir.path().join("services").join("api");
    std::fs::create_dir_all(&sub).unwrap();

    let source = GitSource::open(&sub).unwrap();
    assert_eq!(source.workdir_prefix(), Some("services/api"));

    let root = GitSource::open(h.repo.dir.path()).unwrap();
    assert_eq!(root.workdir_prefix(), None);
}
