//! Scenario: the task exits on its own
//!
//! The supervisor must notice the exit, return to idle with the display name
//! as label and never invoke the terminator.

use e2e_tests::TestExecutor;
use launchpad_log::LogLevel;
use launchpad_supervisor::SupervisorState;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_natural_exit() {
    let executor = TestExecutor::new("Dummy", "--run-duration-ms 300 --exit-code 3");

    println!("Step 1: Clicking the button...");
    assert!(!executor.supervisor.toggle());
    assert_eq!(executor.supervisor.state(), SupervisorState::Running);
    let pid = executor
        .wait_for_pid(Duration::from_secs(5))
        .await
        .expect("testexe did not start");
    println!("✓ TESTEXE running as {}\n", pid);

    println!("Step 2: Waiting for TESTEXE to exit...");
    assert!(executor.supervisor.wait_until_idle(Duration::from_secs(5)).await);
    println!("✓ Supervisor idle\n");

    let info = executor.messages(LogLevel::Info);
    assert!(info.contains(&format!("child process started:{}", pid)));
    assert!(info.contains(&format!("process exit detected:{}", pid)));
    assert!(!info.iter().any(|m| m.starts_with("cancellation requested")));
    assert!(!info.iter().any(|m| m.contains("process tree terminated")));
    assert_eq!(executor.labels().await, vec!["stop Dummy", "Dummy"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_toggle_starts_again_after_exit() {
    let executor = TestExecutor::new("Again", "--run-duration-ms 100");

    for round in 1..=3 {
        println!("Round {}", round);
        assert!(!executor.supervisor.toggle());
        assert!(executor.supervisor.wait_until_idle(Duration::from_secs(5)).await);
    }

    let started = executor
        .messages(LogLevel::Info)
        .iter()
        .filter(|m| m.starts_with("child process started:"))
        .count();
    assert_eq!(started, 3);
}
