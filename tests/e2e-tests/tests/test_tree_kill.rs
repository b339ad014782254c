//! Scenario: stopping a running task kills its whole tree
//!
//! TESTEXE ignores SIGTERM and starts a grandchild that outlives it unless
//! the tree is killed as a unit.

use e2e_tests::{is_alive, quote, wait_for_pid_file, wait_until, TestExecutor};
use launchpad_log::LogLevel;
use launchpad_supervisor::{SupervisorState, STOPPING_LABEL};
use std::path::Path;
use std::time::Duration;

fn tree_args(test_dir: &Path) -> String {
    format!(
        "--ignore-term --spawn-child --pid-file {}",
        quote(&test_dir.join("testexe.pid"))
    )
}

async fn start_tree(executor: &TestExecutor) -> (i32, i32) {
    executor.supervisor.toggle();

    let pid = wait_for_pid_file(&executor.path("testexe.pid"), Duration::from_secs(5))
        .await
        .expect("testexe did not write its pid");
    let grandchild = wait_for_pid_file(&executor.path("testexe.pid.child"), Duration::from_secs(5))
        .await
        .expect("grandchild did not write its pid");

    assert_eq!(executor.supervisor.current_pid(), Some(pid));
    assert!(is_alive(pid));
    assert!(is_alive(grandchild));
    (pid, grandchild)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stop_kills_process_tree() {
    let executor = TestExecutor::in_test_dir("Tree", tree_args);

    println!("Step 1: Starting TESTEXE with a grandchild...");
    let (pid, grandchild) = start_tree(&executor).await;
    println!("✓ TESTEXE {} with grandchild {}\n", pid, grandchild);

    println!("Step 2: Clicking the button again...");
    assert!(executor.supervisor.toggle());
    assert_eq!(executor.supervisor.state(), SupervisorState::Stopping);

    assert!(executor.supervisor.wait_until_idle(Duration::from_secs(6)).await);
    wait_until(Duration::from_secs(2), || !is_alive(pid) && !is_alive(grandchild))
        .await
        .expect("process tree survived the stop request");
    println!("✓ Tree terminated\n");

    assert!(executor
        .messages(LogLevel::Info)
        .contains(&format!("cancellation requested, terminating process:{}", pid)));
    assert_eq!(executor.labels().await, vec!["stop Tree", STOPPING_LABEL, "Tree"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_shutdown_kills_process_tree() {
    let executor = TestExecutor::in_test_dir("Tree", tree_args);

    let (pid, grandchild) = start_tree(&executor).await;

    assert!(executor.supervisor.shutdown().await);
    assert_eq!(executor.supervisor.state(), SupervisorState::Idle);
    wait_until(Duration::from_secs(2), || !is_alive(pid) && !is_alive(grandchild))
        .await
        .expect("process tree survived shutdown");
}
