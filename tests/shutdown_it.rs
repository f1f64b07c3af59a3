mod common;

// std
use std::time::Duration;
// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use common::*;
use http_adapter::{
	ack::Disposition,
	retry::{RetryPolicy, Shutdown},
};

#[tokio::test]
async fn triggered_shutdown_pulls_nothing() {
	let server = MockServer::start_async().await;
	let bed = TestBed::new(&server, "POST", "/orders", 0);
	let shutdown = Shutdown::new();

	bed.broker.publish(envelope("order-1", json!({})));
	shutdown.trigger();

	let stats = bed.intake().with_shutdown(shutdown.signal()).run().await;

	assert_eq!(stats.received, 0);
	assert_eq!(bed.broker.pending(), 1);
}

#[tokio::test]
async fn in_flight_delivery_finishes_before_the_loop_stops() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/orders");
			then.status(200).delay(Duration::from_millis(300));
		})
		.await;
	let bed = TestBed::new(&server, "POST", "/orders", 0);
	let shutdown = Shutdown::new();
	let intake = bed.intake().with_shutdown(shutdown.signal());

	for id in ["order-1", "order-2", "order-3"] {
		bed.broker.publish(envelope(id, json!({})));
	}

	tokio::spawn(async move {
		tokio::time::sleep(Duration::from_millis(100)).await;
		shutdown.trigger();
	});

	let stats = intake.run().await;

	assert_eq!(stats.received, 1);
	assert_eq!(stats.acked_success, 1);
	assert_eq!(bed.broker.pending(), 2);

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn shutdown_cuts_backoff_short_and_withholds_without_counting() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/orders");
			then.status(503);
		})
		.await;
	let bed = TestBed::new(&server, "POST", "/orders", 5);
	let shutdown = Shutdown::new();
	let adapter = bed
		.adapter()
		.with_retry_policy(RetryPolicy {
			base: Duration::from_secs(30),
			max: Duration::from_secs(30),
		})
		.with_shutdown(shutdown.signal());

	tokio::spawn(async move {
		tokio::time::sleep(Duration::from_millis(100)).await;
		shutdown.trigger();
	});

	let disposition = tokio::time::timeout(
		Duration::from_secs(5),
		adapter.handle(&envelope("order-8", json!({})), None),
	)
	.await
	.expect("Shutdown should interrupt the backoff pause.");

	assert_eq!(disposition, Disposition::WithheldRetry);
	assert_eq!(bed.retry_counter("order-8"), None, "Interrupted deliveries are not counted.");

	mock.assert_calls_async(1).await;
}
