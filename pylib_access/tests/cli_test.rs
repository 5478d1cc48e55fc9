//! Tests for the CLI command dispatcher using scripted capabilities.

use pylib_access::BrokerConfig;
use pylib_access::constants::{BOOKMARK_STORE_KEY, PLATFORM_LIBRARY_EXTENSION};
use pylib_access::shell::{Command, cli::execute};
use pylib_access::storage::BookmarkStore;
use pylib_access::test_utils::{ScriptedPlatform, TestBroker};

fn output_of(buffer: Vec<u8>) -> String {
    String::from_utf8(buffer).unwrap()
}

#[tokio::test]
async fn test_request_prints_library_path() {
    let t = TestBroker::new(
        BrokerConfig::default(),
        ScriptedPlatform::new().select("/opt/python/lib"),
    );
    let mut out = Vec::new();

    execute(
        &Command::Request {
            suggested_path: None,
            export: false,
        },
        &t.broker,
        &mut out,
    )
    .await
    .unwrap();

    assert_eq!(
        output_of(out),
        format!("/opt/python/lib/libpython3.10.{PLATFORM_LIBRARY_EXTENSION}\n")
    );
}

#[tokio::test]
async fn test_request_export_prints_shell_line() {
    let t = TestBroker::new(
        BrokerConfig::default(),
        ScriptedPlatform::new().select("/opt/python/lib"),
    );
    let mut out = Vec::new();

    execute(
        &Command::Request {
            suggested_path: None,
            export: true,
        },
        &t.broker,
        &mut out,
    )
    .await
    .unwrap();

    assert_eq!(
        output_of(out),
        format!("export PYTHON_LIBRARY='/opt/python/lib/libpython3.10.{PLATFORM_LIBRARY_EXTENSION}'\n")
    );
}

#[tokio::test]
async fn test_request_cancel_is_an_error_with_context() {
    let t = TestBroker::new(BrokerConfig::default(), ScriptedPlatform::new().cancel());
    let mut out = Vec::new();

    let error = execute(
        &Command::Request {
            suggested_path: None,
            export: false,
        },
        &t.broker,
        &mut out,
    )
    .await
    .unwrap_err();

    let message = format!("{error:#}");
    assert!(message.contains("Failed to obtain access"));
    assert!(message.contains("No Python library directory was selected"));
    assert!(out.is_empty());
}

#[tokio::test]
async fn test_status_and_forget() {
    let t = TestBroker::new(
        BrokerConfig::default(),
        ScriptedPlatform::new().select("/opt/python/lib"),
    );
    t.broker.request_access().await.unwrap();

    let mut out = Vec::new();
    execute(&Command::Status, &t.broker, &mut out).await.unwrap();
    execute(&Command::Forget, &t.broker, &mut out).await.unwrap();
    execute(&Command::Forget, &t.broker, &mut out).await.unwrap();
    execute(&Command::Status, &t.broker, &mut out).await.unwrap();

    assert_eq!(
        output_of(out),
        "Bookmark valid: /opt/python/lib\n\
         Removed stored bookmark\n\
         No stored bookmark\n\
         No stored bookmark\n"
    );
    assert_eq!(t.store.load(BOOKMARK_STORE_KEY).unwrap(), None);
}
