//! Environment Integration Test Toolkit
//!
//! This crate provides the assertion and polling layer used by the CloudX
//! environment tests. Tests read the deployed AWS environment (EC2, VPC, IAM,
//! S3, RDS, SNS/SQS, serverless stack, monitoring) through their own clients
//! and check it against expected values from JSON fixtures.
//!
//! # Modules
//!
//! - `assert`: equality, containment, tolerance and scoped multi-checks
//! - `eventual`: poll an eventually-consistent system until a value shows up
//! - `fixtures`: typed expected-value fixtures and required lookups
//! - `logging`: tracing subscriber bootstrap for test binaries
//!
//! # Usage
//!
//! ```rust,ignore
//! use env_tests::assert::{are_equal, equals_map};
//! use env_tests::eventual::{assert_becomes_equal, ConsistencyCategory};
//!
//! #[tokio::test]
//! async fn test_queue_receives_notification() {
//!     let queue = sqs.queue_by_prefix("cloudximage").await.expect("queue exists");
//!     equals_map(&queue.tags, &expected.tags, "Queue tags").expect("tags match");
//!
//!     sns.publish(&topic_arn, "image uploaded").await.expect("publish");
//!     assert_becomes_equal(
//!         1,
//!         || sqs.visible_messages(&queue.url),
//!         "Notification reached the queue",
//!         ConsistencyCategory::MessagePropagation.into(),
//!     )
//!     .await
//!     .expect("message delivered");
//! }
//! ```

pub mod assert;
pub mod eventual;
pub mod fixtures;
pub mod logging;
