//! Back/forward integration and message queue lifetime

mod common;

use bridge_shell::fetch::{ErrorKind, FetchError};
use bridge_shell::navigation::{HistoryMode, TransitionKind};
use bridge_shell::shell::ShellUpdate;
use common::*;

#[tokio::test]
async fn test_back_and_forward_never_duplicate_entries() {
    let fetcher = ScriptedFetcher::new();
    let prompt = ScriptedPrompt::default();
    let mut shell = shell(&fetcher, &prompt);
    for path in ["/a", "/b", "/c"] {
        fetcher.serve(path, page(path));
        load(&mut shell, path).await;
    }
    assert_eq!(history_paths(&shell), vec!["/a", "/b", "/c"]);

    assert!(shell.back());
    settle(&mut shell).await;
    assert_eq!(current_path(&shell).as_deref(), Some("/b"));
    assert_eq!(history_paths(&shell), vec!["/a", "/b", "/c"]);
    assert_eq!(shell.history().unwrap().cursor(), Some(1));

    assert!(shell.back());
    settle(&mut shell).await;
    assert!(!shell.back());
    assert_eq!(current_path(&shell).as_deref(), Some("/a"));

    assert!(shell.forward());
    settle(&mut shell).await;
    assert_eq!(current_path(&shell).as_deref(), Some("/b"));
    assert_eq!(history_paths(&shell), vec!["/a", "/b", "/c"]);
    assert_eq!(shell.history().unwrap().cursor(), Some(1));
}

#[tokio::test]
async fn test_failed_back_leaves_view_and_cursor_in_place() {
    let fetcher = ScriptedFetcher::new();
    let prompt = ScriptedPrompt::default();
    let mut shell = shell(&fetcher, &prompt);
    for path in ["/a", "/b"] {
        fetcher.serve(path, page(path));
        load(&mut shell, path).await;
    }

    let reply = fetcher.expect("/a");
    assert!(shell.back());
    assert_eq!(shell.history().unwrap().cursor(), Some(1), "cursor waits for the commit");
    reply.send(Err(FetchError::network("connection refused"))).unwrap();

    assert_eq!(next_update(&mut shell).await, ShellUpdate::Failed(ErrorKind::Network));
    assert_eq!(current_path(&shell).as_deref(), Some("/b"));
    let history = shell.history().unwrap();
    assert_eq!(history.cursor(), Some(1));
    assert_eq!(history.current().unwrap().path, "/b");
    assert_eq!(history_paths(&shell), vec!["/a", "/b"]);
    assert!(!shell.forward());

    assert!(shell.back());
    settle(&mut shell).await;
    assert_eq!(current_path(&shell).as_deref(), Some("/a"));
    assert_eq!(shell.history().unwrap().cursor(), Some(0));
    assert_eq!(history_paths(&shell), vec!["/a", "/b"]);
}

#[tokio::test]
async fn test_link_after_back_drops_forward_entries() {
    let fetcher = ScriptedFetcher::new();
    let prompt = ScriptedPrompt::default();
    let mut shell = shell(&fetcher, &prompt);
    for path in ["/a", "/b", "/d"] {
        fetcher.serve(path, page(path));
    }
    load(&mut shell, "/a").await;
    load(&mut shell, "/b").await;

    shell.back();
    settle(&mut shell).await;
    assert!(shell.follow_link("/d"));
    settle(&mut shell).await;

    assert_eq!(history_paths(&shell), vec!["/a", "/d"]);
    assert!(!shell.forward());
}

#[tokio::test]
async fn test_history_change_event_replaces_in_place() {
    let fetcher = ScriptedFetcher::new();
    let prompt = ScriptedPrompt::default();
    let mut shell = shell(&fetcher, &prompt);
    fetcher.serve("/a", page("A"));
    fetcher.serve("/a?tab=2", page("A, second tab"));
    load(&mut shell, "/a").await;

    shell.handle_history_change("/a?tab=2");
    settle(&mut shell).await;
    assert_eq!(history_paths(&shell), vec!["/a?tab=2"]);
}

#[tokio::test]
async fn test_new_view_clears_previous_messages() {
    let fetcher = ScriptedFetcher::new();
    let prompt = ScriptedPrompt::default();
    let mut shell = shell(&fetcher, &prompt);
    fetcher.serve("/a", page_with_messages("A", &[("info", "Welcome")]));
    fetcher.serve("/b", page_with_messages("B", &[("success", "Logged in")]));

    load(&mut shell, "/a").await;
    assert_eq!(message_texts(&shell), vec!["Welcome"]);

    load(&mut shell, "/b").await;
    assert_eq!(message_texts(&shell), vec!["Logged in"]);
}

#[tokio::test]
async fn test_refresh_keeps_messages_and_frame_identity() {
    let fetcher = ScriptedFetcher::new();
    let prompt = ScriptedPrompt::default();
    let mut shell = shell(&fetcher, &prompt);
    fetcher.serve("/a", page_with_messages("A", &[("info", "Welcome")]));
    load(&mut shell, "/a").await;
    let id = shell.current_frame().unwrap().id;

    let reply = fetcher.expect("/a");
    assert!(shell.refresh_props());
    reply
        .send(Ok(page_with_messages("A, updated", &[("success", "Saved")])))
        .unwrap();
    let update = next_update(&mut shell).await;

    assert!(matches!(update, ShellUpdate::Navigated { kind: TransitionKind::SameView, .. }));
    assert_eq!(message_texts(&shell), vec!["Welcome", "Saved"]);
    assert_eq!(shell.current_frame().unwrap().id, id);
    assert_eq!(shell.current_frame().unwrap().title(), "A, updated");
    assert_eq!(history_paths(&shell), vec!["/a"]);
}

#[tokio::test]
async fn test_replace_path_is_a_same_view_transition() {
    let fetcher = ScriptedFetcher::new();
    let prompt = ScriptedPrompt::default();
    let mut shell = shell(&fetcher, &prompt);
    fetcher.serve("/posts/", page_with_messages("Posts", &[("info", "3 posts")]));
    fetcher.serve("/posts/?page=2", page("Posts, page 2"));
    load(&mut shell, "/posts/").await;
    let id = shell.current_frame().unwrap().id;

    shell.replace_path("/posts/?page=2");
    settle(&mut shell).await;

    assert_eq!(current_path(&shell).as_deref(), Some("/posts/?page=2"));
    assert_eq!(shell.current_frame().unwrap().id, id);
    assert_eq!(message_texts(&shell), vec!["3 posts"]);
    assert_eq!(history_paths(&shell), vec!["/posts/?page=2"]);
}

#[tokio::test]
async fn test_refresh_before_first_frame_does_nothing() {
    let fetcher = ScriptedFetcher::new();
    let prompt = ScriptedPrompt::default();
    let mut shell = shell(&fetcher, &prompt);
    assert!(!shell.refresh_props());
    assert_eq!(shell.pending_fetches(), 0);
}

#[tokio::test]
async fn test_reload_drops_transient_state() {
    let fetcher = ScriptedFetcher::new();
    let prompt = ScriptedPrompt::default();
    let mut shell = shell(&fetcher, &prompt);
    fetcher.serve("/a", page_with_messages("A", &[("info", "Welcome")]));
    fetcher.serve("/edit/", overlay_page("Edit"));
    load(&mut shell, "/a").await;
    shell.open_overlay("/edit/", view_renderer(), None);
    settle(&mut shell).await;
    assert!(shell.overlay().is_some());

    let reply = fetcher.expect("/a");
    shell.navigate("/a", HistoryMode::Replace);
    reply.send(Ok(reload())).unwrap();
    let updates = settle(&mut shell).await;

    assert_eq!(updates[0], ShellUpdate::Reloading { path: "/a".to_string() });
    assert!(shell.overlay().is_none());
    assert_eq!(message_texts(&shell), vec!["Welcome"]);
    assert_eq!(history_paths(&shell), vec!["/a"]);
}
