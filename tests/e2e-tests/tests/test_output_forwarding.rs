//! Scenario: child output reaches the product log
//!
//! Every stdout line is logged at INFO and every stderr line at ERROR, tagged
//! with the stream and the child pid, in the order the child wrote them.

use e2e_tests::TestExecutor;
use launchpad_log::LogLevel;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_output_forwarding() {
    let executor = TestExecutor::new(
        "Chatty",
        "--stdout-lines 5 --stderr-lines 2 --run-duration-ms 200",
    );

    executor.supervisor.toggle();
    let pid = executor
        .wait_for_pid(Duration::from_secs(5))
        .await
        .expect("testexe did not start");
    assert!(executor.supervisor.wait_until_idle(Duration::from_secs(5)).await);

    let stdout: Vec<String> = executor
        .messages(LogLevel::Info)
        .into_iter()
        .filter(|m| m.starts_with("[Child Stdout]"))
        .collect();
    let expected: Vec<String> = (1..=5)
        .map(|i| format!("[Child Stdout][{}] stdout line {}", pid, i))
        .collect();
    assert_eq!(stdout, expected);

    let stderr: Vec<String> = executor
        .messages(LogLevel::Error)
        .into_iter()
        .filter(|m| m.starts_with("[Child Stderr]"))
        .collect();
    let expected: Vec<String> = (1..=2)
        .map(|i| format!("[Child Stderr][{}] stderr line {}", pid, i))
        .collect();
    assert_eq!(stderr, expected);
}
