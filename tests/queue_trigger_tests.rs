
use execbridge::trigger::queue::{handle_payload, Disposition};

use test_support::{
    bridge_over, endpoint, stdout_frame, ExecBehavior, ListBehavior, MockCluster,
};

#[tokio::test]
async fn test_undecodable_payload_requests_redelivery() {
    let cluster = MockCluster::new(
        ListBehavior::Respond(vec![endpoint("useradm-0", &["app"])]),
        ExecBehavior::Stream(stdout_frame("created")),
    );
    let bridge = bridge_over(cluster.clone(), &[]);

    let disposition = handle_payload(&bridge, b"{not json").await;

    assert_eq!(disposition, Disposition::Nak);
    // A decode failure must not reach the pipeline
    assert_eq!(cluster.list_calls(), 0);
    assert_eq!(cluster.exec_calls(), 0);
}

#[tokio::test]
async fn test_successful_invocation_is_consumed() {
    let cluster = MockCluster::new(
        ListBehavior::Respond(vec![endpoint("useradm-0", &["app"])]),
        ExecBehavior::Stream(stdout_frame("created")),
    );
    let bridge = bridge_over(cluster.clone(), &[]);

    let disposition =
        handle_payload(&bridge, br#"{"username": "alice", "password": "s3cret"}"#).await;

    assert_eq!(disposition, Disposition::Ack);
    assert_eq!(cluster.exec_calls(), 1);
}

#[tokio::test]
async fn test_pipeline_failure_is_still_consumed() {
    // At-most-once after decode: a stream failure is logged, not redelivered.
    let cluster = MockCluster::new(
        ListBehavior::Respond(vec![endpoint("useradm-0", &["app"])]),
        ExecBehavior::Refuse("upgrade rejected".to_string()),
    );
    let bridge = bridge_over(cluster.clone(), &[]);

    let disposition =
        handle_payload(&bridge, br#"{"username": "alice", "password": "s3cret"}"#).await;

    assert_eq!(disposition, Disposition::Ack);
    assert_eq!(cluster.exec_calls(), 1);
}

#[tokio::test]
async fn test_invalid_fields_are_consumed_not_redelivered() {
    // Redelivery cannot fix an empty field, so validation failures are
    // terminal for the queue trigger too.
    let cluster = MockCluster::new(
        ListBehavior::Respond(vec![endpoint("useradm-0", &["app"])]),
        ExecBehavior::Stream(stdout_frame("created")),
    );
    let bridge = bridge_over(cluster.clone(), &[]);

    let disposition = handle_payload(&bridge, br#"{"username": "", "password": "x"}"#).await;

    assert_eq!(disposition, Disposition::Ack);
    assert_eq!(cluster.list_calls(), 0);
}

#[tokio::test]
async fn test_resolution_failure_is_consumed() {
    let cluster = MockCluster::new(
        ListBehavior::Respond(vec![]),
        ExecBehavior::Stream(stdout_frame("created")),
    );
    let bridge = bridge_over(cluster.clone(), &[]);

    let disposition =
        handle_payload(&bridge, br#"{"username": "alice", "password": "s3cret"}"#).await;

    assert_eq!(disposition, Disposition::Ack);
    assert_eq!(cluster.list_calls(), 1);
    assert_eq!(cluster.exec_calls(), 0);
}
