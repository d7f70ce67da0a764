//! CRUD contract suite shared by every backend: the same checks run against
//! the file and mem repositories, plus ignored variants for Redis that need
//! a live server.

use serde::{Deserialize, Serialize};
use tempfile::TempDir;

use entity_repo::{FileOptions, FileRepo, Identifiable, MemRepo, Repo, RepoError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Foo {
    id: String,
    bar: String,
}

impl Foo {
    fn new(id: &str, bar: &str) -> Self {
        Self {
            id: id.into(),
            bar: bar.into(),
        }
    }
}

impl Identifiable for Foo {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Basic CRUD lifecycle on a single key: absent-get, no-op remove, duplicate
/// add, get-back, remove, absent-get again.
fn check_crud(repo: &impl Repo<Foo>) {
    let key = "1880";

    // Not-found is not an error.
    assert!(repo.get(key).unwrap().is_none());

    // Removing a nonexistent id is a no-op, repeatedly.
    repo.remove(key).unwrap();
    repo.remove(key).unwrap();

    let val = Foo::new(key, "baz");
    repo.add(&val).unwrap();
    // Duplicate add overwrites, never errors.
    repo.add(&val).unwrap();

    let got = repo.get(key).unwrap().expect("value should be present");
    assert_eq!(got, val);

    repo.remove(key).unwrap();
    assert!(repo.get(key).unwrap().is_none());
}

/// get_all/count over three distinct entities.
fn check_get_all(repo: &impl Repo<Foo>) {
    repo.add(&Foo::new("1", "a")).unwrap();
    repo.add(&Foo::new("2", "b")).unwrap();
    repo.add(&Foo::new("3", "c")).unwrap();

    assert_eq!(repo.count().unwrap(), 3);

    let mut ids: Vec<String> = repo
        .get_all()
        .unwrap()
        .into_iter()
        .map(|f| f.id)
        .collect();
    ids.sort();
    assert_eq!(ids, ["1", "2", "3"]);
}

/// Last-write-wins: a second add replaces the payload without bumping count.
fn check_last_write_wins(repo: &impl Repo<Foo>) {
    repo.add(&Foo::new("k", "first")).unwrap();
    repo.add(&Foo::new("k", "second")).unwrap();

    assert_eq!(repo.get("k").unwrap().unwrap().bar, "second");
    assert_eq!(repo.count().unwrap(), 1);
}

/// Empty identifiers are rejected before anything is stored.
fn check_empty_id_rejected(repo: &impl Repo<Foo>) {
    let err = repo.add(&Foo::new("", "nope")).unwrap_err();
    assert!(matches!(err, RepoError::EmptyId));
    assert_eq!(repo.count().unwrap(), 0);
}

fn file_repo(tmp: &TempDir) -> FileRepo<Foo> {
    let opts = FileOptions::new(tmp.path().join("filetest"), "json").unwrap();
    FileRepo::new(opts).unwrap()
}

#[test]
fn file_repo_crud() {
    let tmp = TempDir::new().unwrap();
    let repo = file_repo(&tmp);
    check_crud(&repo);
    repo.close().unwrap();
}

#[test]
fn file_repo_get_all() {
    let tmp = TempDir::new().unwrap();
    check_get_all(&file_repo(&tmp));
}

#[test]
fn file_repo_last_write_wins() {
    let tmp = TempDir::new().unwrap();
    check_last_write_wins(&file_repo(&tmp));
}

#[test]
fn file_repo_rejects_empty_id() {
    let tmp = TempDir::new().unwrap();
    check_empty_id_rejected(&file_repo(&tmp));
}

#[test]
fn file_repo_handles_awkward_ids() {
    let tmp = TempDir::new().unwrap();
    let repo = file_repo(&tmp);

    let val = Foo::new("dir/../with space & 100%", "payload");
    repo.add(&val).unwrap();

    assert_eq!(repo.get(val.id()).unwrap().unwrap(), val);
    assert_eq!(repo.count().unwrap(), 1);

    let all = repo.get_all().unwrap();
    assert_eq!(all, vec![val.clone()]);

    repo.remove(val.id()).unwrap();
    assert!(repo.get(val.id()).unwrap().is_none());
}

#[test]
fn file_repo_persists_across_handles() {
    let tmp = TempDir::new().unwrap();

    let repo = file_repo(&tmp);
    repo.add(&Foo::new("1880", "baz")).unwrap();
    repo.close().unwrap();

    let reopened = file_repo(&tmp);
    assert_eq!(reopened.get("1880").unwrap().unwrap().bar, "baz");
}

#[test]
fn mem_repo_crud() {
    let repo = MemRepo::new();
    check_crud(&repo);
    repo.close().unwrap();
}

#[test]
fn mem_repo_get_all() {
    check_get_all(&MemRepo::new());
}

#[test]
fn mem_repo_last_write_wins() {
    check_last_write_wins(&MemRepo::new());
}

#[test]
fn mem_repo_rejects_empty_id() {
    check_empty_id_rejected(&MemRepo::new());
}

// Redis variants need a server at REDIS_URL (default redis://127.0.0.1/) and
// a database safe to flush; run with
// `cargo test --features redis-backend -- --ignored`.
#[cfg(feature = "redis-backend")]
mod redis_backend {
    use super::*;
    use entity_repo::RedisRepo;

    fn redis_repo() -> RedisRepo<Foo> {
        let url = std::env::var("REDIS_URL")
            .unwrap_or_else(|_| "redis://127.0.0.1/".to_string());
        let client = redis::Client::open(url).unwrap();

        let mut con = client.get_connection().unwrap();
        let _: () = redis::cmd("FLUSHDB").query(&mut con).unwrap();

        RedisRepo::new(client)
    }

    #[test]
    #[ignore]
    fn redis_repo_crud() {
        check_crud(&redis_repo());
    }

    #[test]
    #[ignore]
    fn redis_repo_get_all() {
        check_get_all(&redis_repo());
    }

    #[test]
    #[ignore]
    fn redis_repo_get_all_empty_db() {
        let repo = redis_repo();
        assert!(repo.get_all().unwrap().is_empty());
        assert_eq!(repo.count().unwrap(), 0);
    }

    #[test]
    #[ignore]
    fn redis_repo_rejects_empty_id() {
        check_empty_id_rejected(&redis_repo());
    }
}
