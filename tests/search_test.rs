//! End-to-end tests for query evaluation, ranking and result rendering

use std::sync::Arc;
use tempfile::TempDir;
use wiki_search::search::*;
use wiki_search::store::MemoryStore;

/// Helper to create a small wiki
fn create_test_wiki() -> Arc<MemoryStore> {
    let store = MemoryStore::new();
    store.put(
        "FrontPage",
        "Welcome to the wiki. Start with the HelpIndex.",
        &["HelpIndex"],
    );
    store.put(
        "HelpIndex",
        "All help pages are listed here. Help yourself.",
        &["FrontPage", "HelpOnEditing"],
    );
    store.put(
        "HelpOnEditing",
        "How to edit pages: press the Edit button.",
        &["HelpIndex"],
    );
    store.put(
        "RecentChanges",
        "#format wiki\n#acl All:read\nRecent edits to the wiki",
        &[],
    );
    store.put("SandBox", "Try anything here, even apple pie recipes", &[]);
    Arc::new(store)
}

fn create_test_config(dir: &TempDir) -> SearchConfig {
    SearchConfigBuilder::new()
        .cache_dir(dir.path())
        .index_lock_wait_ms(500)
        .rebuild_lock_wait_ms(500)
        .search_lock_wait_ms(100)
        .build()
}

fn names(results: &SearchResults) -> Vec<&str> {
    results.hits.iter().map(|hit| hit.name.as_str()).collect()
}

#[tokio::test]
async fn test_weight_ranking_puts_title_matches_first() {
    let temp_dir = TempDir::new().unwrap();
    let runner = SearchRunner::new(create_test_wiki(), create_test_config(&temp_dir));

    let mut results = runner.search("help", &AllowAll).await.unwrap();
    assert_eq!(results.page_count, 5);

    results.sort_by_weight();
    assert_eq!(results.sort, SortOrder::Weight);
    assert_eq!(names(&results), vec!["HelpIndex", "HelpOnEditing", "FrontPage"]);
    assert_eq!(results.hits[0].weight(), 102.0);
    assert_eq!(results.hits[2].weight(), 1.0);

    results.sort_by_name();
    assert_eq!(names(&results), vec!["FrontPage", "HelpIndex", "HelpOnEditing"]);
}

#[tokio::test]
async fn test_sorting_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let runner = SearchRunner::new(create_test_wiki(), create_test_config(&temp_dir));

    let mut results = runner.search("help or wiki", &AllowAll).await.unwrap();
    results.sort_by_weight();
    let once: Vec<String> = names(&results).iter().map(|s| s.to_string()).collect();
    results.sort_by_weight();
    assert_eq!(names(&results), once);
}

#[tokio::test]
async fn test_fast_and_exact_search_agree() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_test_wiki();
    store.put("Hosts", "see example.org now", &[]);
    store.put("Versions", "we run 11.52 today", &[]);
    let config = create_test_config(&temp_dir);

    let index = Arc::new(IndexManager::new(config.clone(), store.clone()).await.unwrap());
    assert!(index.rebuild_all().await.unwrap());

    let exact = SearchRunner::new(store.clone(), config.clone());
    let fast = SearchRunner::new(store, config).with_index(Arc::clone(&index));

    // literal words with punctuation match inside longer tokens
    for (query, page) in [("ample.or", "Hosts"), ("1.5", "Versions")] {
        let results = fast.search(query, &AllowAll).await.unwrap();
        assert_eq!(names(&results), vec![page], "query {:?}", query);
    }

    let queries = [
        "help",
        "help -edit",
        "title:Help or apple",
        "linkto:HelpIndex",
        "\"apple pie\"",
        "regex:ed.t",
        "wiki welcome",
        "-help",
        "ample.or",
        "1.5",
        "example.org now",
    ];
    for query in queries {
        let mut expected = exact.search(query, &AllowAll).await.unwrap();
        let mut actual = fast.search(query, &AllowAll).await.unwrap();
        expected.sort_by_name();
        actual.sort_by_name();

        assert_eq!(names(&actual), names(&expected), "query {:?}", query);
        for (a, e) in actual.hits.iter().zip(&expected.hits) {
            assert_eq!(a.unique_matches(), e.unique_matches(), "query {:?}", query);
        }
    }

    index.finish().await.unwrap();
}

#[tokio::test]
async fn test_negated_term_hits_have_no_positions() {
    let temp_dir = TempDir::new().unwrap();
    let runner = SearchRunner::new(create_test_wiki(), create_test_config(&temp_dir));

    let mut results = runner.search("-help", &AllowAll).await.unwrap();
    results.sort_by_name();
    assert_eq!(names(&results), vec!["RecentChanges", "SandBox"]);

    // nothing to highlight, so the snippet is the start of the page body
    let hit = &results.hits[0];
    assert_eq!(hit.weight(), 1.0);
    assert_eq!(
        hit.context(180, 1),
        Context::Leading("Recent edits to the wiki".to_string())
    );
}

#[tokio::test]
async fn test_title_only_parser() {
    let temp_dir = TempDir::new().unwrap();
    let runner = SearchRunner::new(create_test_wiki(), create_test_config(&temp_dir))
        .with_parser(QueryParser::new().with_title_search(true));

    let mut results = runner.search("wiki or help", &AllowAll).await.unwrap();
    results.sort_by_name();
    assert_eq!(names(&results), vec!["HelpIndex", "HelpOnEditing"]);
}

#[tokio::test]
async fn test_case_sensitive_search() {
    let temp_dir = TempDir::new().unwrap();
    let runner = SearchRunner::new(create_test_wiki(), create_test_config(&temp_dir));

    let results = runner.search("case:Edit", &AllowAll).await.unwrap();
    let mut found = names(&results);
    found.sort();
    assert_eq!(found, vec!["HelpOnEditing"]);
    assert_eq!(results.hits[0].unique_matches_of(MatchKind::Text).len(), 1);
}

#[tokio::test]
async fn test_page_list_with_context_renders_highlights() {
    let temp_dir = TempDir::new().unwrap();
    let runner = SearchRunner::new(create_test_wiki(), create_test_config(&temp_dir));

    let results = runner.search("apple", &AllowAll).await.unwrap();
    let mut html = HtmlRenderer::new();
    results.stats(&mut html);
    results.page_list_with_context(&mut html, true, 20, 1);
    let html = html.into_string();

    assert!(html.contains("1 results out of about 5 pages."));
    assert!(html.contains("<a href=\"SandBox?highlight=%28apple%29\">SandBox</a>"));
    assert!(html.contains(". . . 1 match"));
    assert!(html.contains("..., even <strong>apple</strong> pie rec..."));
}

#[tokio::test]
async fn test_context_lines_skip_page_header() {
    let temp_dir = TempDir::new().unwrap();
    let runner = SearchRunner::new(create_test_wiki(), create_test_config(&temp_dir));

    let results = runner.search("wiki", &AllowAll).await.unwrap();
    let recent = results
        .hits
        .iter()
        .find(|hit| hit.name == "RecentChanges")
        .unwrap();

    // "#format wiki" is in the header; only the body occurrence is shown
    let lines = recent.context_lines(30, 5);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].text().ends_with("Recent edits to the wiki"));
    let highlighted = lines[0]
        .segments
        .iter()
        .filter(|segment| matches!(segment, Segment::Highlight(_)))
        .count();
    assert_eq!(highlighted, 1);
    assert_eq!(
        lines[0].segments.last(),
        Some(&Segment::Highlight("wiki".to_string()))
    );
}

#[tokio::test]
async fn test_page_list_of_empty_result() {
    let temp_dir = TempDir::new().unwrap();
    let runner = SearchRunner::new(create_test_wiki(), create_test_config(&temp_dir));

    let results = runner.search("nonexistentword", &AllowAll).await.unwrap();
    assert!(results.hits.is_empty());

    let mut html = HtmlRenderer::new();
    results.page_list(&mut html, true, false);
    assert!(!html.as_str().contains("<ul>"));
}
