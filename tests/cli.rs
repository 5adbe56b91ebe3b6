use predicates::prelude::*;
use serde_json::{Value, json};

fn review(id: &str) -> Value {
    json!({
        "book_id_title": "1.Book",
        "book_id": "1",
        "book_title": "Book",
        "review_url": format!("https://www.goodreads.com/review/show/{id}"),
        "review_id": id,
        "date": "Jan 01, 2021",
        "rating": 4,
        "user_name": "reader",
        "user_url": "https://www.goodreads.com/user/show/1",
        "text": "fine",
        "num_likes": 0,
        "sort_order": "newest",
        "shelves": [{ "name": "to-read", "shelf_id": "1-reader?shelf=to-read" }]
    })
}

fn review_ids(path: &std::path::Path) -> anyhow::Result<Vec<String>> {
    let doc: Value = serde_json::from_str(&std::fs::read_to_string(path)?)?;
    Ok(doc
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|review| review["review_id"].as_str().map(str::to_owned))
        .collect())
}

#[test]
fn help_lists_subcommands() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("shelfscout");
    cmd.arg("--help").assert().success().stdout(
        predicate::str::contains("reviews")
            .and(predicate::str::contains("shelf"))
            .and(predicate::str::contains("recommend"))
            .and(predicate::str::contains("condense")),
    );
}

#[test]
fn condense_concatenates_documents_in_name_order() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::write(
        dir.path().join("b_reviews.json"),
        serde_json::to_string(&vec![review("3")])?,
    )?;
    std::fs::write(
        dir.path().join("a_reviews.json"),
        serde_json::to_string(&vec![review("1"), review("2")])?,
    )?;
    std::fs::write(dir.path().join("notes.txt"), "not json")?;

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("shelfscout");
    cmd.arg("condense")
        .arg("--dir")
        .arg(dir.path())
        .assert()
        .success();

    let ids = review_ids(&dir.path().join("all_reviews.json"))?;
    assert_eq!(ids, vec!["1", "2", "3"]);
    Ok(())
}

#[test]
fn condense_refuses_to_overwrite_output() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::write(dir.path().join("all_reviews.json"), "[]")?;

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("shelfscout");
    cmd.arg("condense")
        .arg("--dir")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    assert_eq!(
        std::fs::read_to_string(dir.path().join("all_reviews.json"))?,
        "[]"
    );
    Ok(())
}

#[test]
fn non_http_base_url_is_rejected_before_a_browser_starts() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("shelfscout");
    cmd.args(["reviews", "--book-id", "1.Book", "--base-url", "ftp://example.com"])
        .env_remove("SHELFSCOUT_REMOTE_URL")
        .assert()
        .failure()
        .stderr(predicate::str::contains("http/https"));
}

#[test]
fn rust_log_debug_emits_debug_line_to_stderr() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("shelfscout");
    cmd.env("RUST_LOG", "debug")
        .arg("condense")
        .arg("--dir")
        .arg(dir.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("parsed cli"));

    assert_eq!(review_ids(&dir.path().join("all_reviews.json"))?.len(), 0);
    Ok(())
}

#[test]
fn recommend_refuses_an_existing_favorite_shelves_file_in_the_working_dir() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let artifact = dir.path().join("favorite_shelves_1.Book.json");
    std::fs::write(&artifact, "{}")?;

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("shelfscout");
    cmd.current_dir(dir.path())
        .args(["recommend", "--book-id", "1.Book"])
        .env_remove("SHELFSCOUT_REMOTE_URL")
        .env_remove("SHELFSCOUT_CHROME")
        .assert()
        .failure()
        .stderr(
            predicate::str::contains("already exists")
                .and(predicate::str::contains("favorite_shelves_1.Book.json"))
                .and(predicate::str::contains("launching browser").not()),
        );

    assert_eq!(std::fs::read_to_string(&artifact)?, "{}");
    Ok(())
}
