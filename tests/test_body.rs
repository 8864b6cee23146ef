use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;
use rackhouse::http::body::{Body, StreamBody, StreamClosed};

#[tokio::test]
async fn test_full_body_yields_chunks_in_order() {
    let body = Body::Full(vec![Bytes::from("a"), Bytes::from("b")]);
    let mut chunks = body.into_chunks();

    assert_eq!(chunks.next().await.unwrap(), Some(Bytes::from("a")));
    assert_eq!(chunks.next().await.unwrap(), Some(Bytes::from("b")));
    assert_eq!(chunks.next().await.unwrap(), None);
}

#[tokio::test]
async fn test_stream_preserves_order_and_reports_lengths() {
    let lengths = Arc::new(std::sync::Mutex::new(Vec::new()));
    let seen = Arc::clone(&lengths);

    let body = Body::stream(move |mut out| async move {
        for chunk in ["one", "three", "fifteen"] {
            let n = out.write(chunk).await?;
            seen.lock().unwrap().push(n);
        }
        anyhow::Ok(())
    });

    let collected = body.into_chunks().collect().await.unwrap();
    assert_eq!(collected, b"onethreefifteen");
    assert_eq!(*lengths.lock().unwrap(), vec![3, 5, 7]);
}

#[tokio::test]
async fn test_stream_keeps_one_chunk_in_flight() {
    let sent = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&sent);

    let body = Body::stream(move |mut out| async move {
        for i in 0..3 {
            out.write(format!("chunk{i}")).await?;
            counter.fetch_add(1, Ordering::SeqCst);
        }
        anyhow::Ok(())
    });
    let mut chunks = body.into_chunks();

    assert_eq!(chunks.next().await.unwrap(), Some(Bytes::from("chunk0")));
    // The first write has not been acknowledged yet.
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(sent.load(Ordering::SeqCst), 0);

    assert_eq!(chunks.next().await.unwrap(), Some(Bytes::from("chunk1")));
    assert_eq!(sent.load(Ordering::SeqCst), 1);

    assert_eq!(chunks.next().await.unwrap(), Some(Bytes::from("chunk2")));
    assert_eq!(chunks.next().await.unwrap(), None);
    assert_eq!(sent.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_stream_producer_error_propagates() {
    let body = Body::stream(|mut out| async move {
        out.write("ok").await?;
        anyhow::bail!("generator failed")
    });
    let mut chunks = body.into_chunks();

    assert_eq!(chunks.next().await.unwrap(), Some(Bytes::from("ok")));
    let err = chunks.next().await.unwrap_err();
    assert!(err.to_string().contains("generator failed"));
}

#[tokio::test]
async fn test_write_after_consumer_dropped_fails() {
    let (result_tx, result_rx) = tokio::sync::oneshot::channel();

    let body = Body::stream(move |mut out| async move {
        let first = out.write("first").await;
        let _ = result_tx.send(first);
        anyhow::Ok(())
    });
    let mut chunks = body.into_chunks();

    assert_eq!(chunks.next().await.unwrap(), Some(Bytes::from("first")));
    drop(chunks);

    // Dropping the consumer drops the producer with it; the pending write
    // never completes and its result sender is discarded.
    assert!(result_rx.await.is_err());
}

#[tokio::test]
async fn test_write_to_closed_channel_is_stream_closed() {
    let (writer_tx, writer_rx) = tokio::sync::oneshot::channel();

    // Hand the writer out of the producer so it outlives the consumer.
    let body = Body::stream(move |out| async move {
        let _ = writer_tx.send(out);
        anyhow::Ok(())
    });
    let mut chunks = body.into_chunks();
    let _ = tokio::time::timeout(Duration::from_millis(50), chunks.next()).await;
    drop(chunks);

    let mut writer = writer_rx.await.unwrap();
    assert_eq!(writer.write("late").await, Err(StreamClosed));
}

#[tokio::test]
async fn test_empty_stream_ends_immediately() {
    let body = Body::stream(|_out| async { anyhow::Ok(()) });
    let mut chunks = body.into_chunks();

    assert_eq!(chunks.next().await.unwrap(), None);
}

#[tokio::test]
async fn test_close_hook_runs_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let body = StreamBody::new(|_out| async { anyhow::Ok(()) })
        .on_close(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
    let mut chunks = Body::Stream(body).into_chunks();

    chunks.close();
    chunks.close();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_full_body_close_is_a_no_op() {
    let mut chunks = Body::from("x").into_chunks();
    chunks.close();

    assert_eq!(chunks.next().await.unwrap(), Some(Bytes::from("x")));
}

#[tokio::test]
async fn test_close_hook_runs_when_chunks_dropped() {
    let closed = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&closed);

    let body = StreamBody::new(|mut out| async move {
        out.write("x").await?;
        anyhow::Ok(())
    })
    .on_close(move || flag.store(true, Ordering::SeqCst));

    let mut chunks = Body::Stream(body).into_chunks();
    assert_eq!(chunks.collect().await.unwrap(), b"x");
    assert!(!closed.load(Ordering::SeqCst));

    drop(chunks);
    assert!(closed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_producer_panic_becomes_error() {
    let body = Body::stream(|mut out| async move {
        out.write("x").await?;
        panic!("generator exploded");
        anyhow::Ok(())
    });
    let mut chunks = body.into_chunks();

    assert_eq!(chunks.next().await.unwrap(), Some(Bytes::from("x")));
    let err = chunks.next().await.unwrap_err();
    assert!(err.to_string().contains("generator exploded"));
}

#[test]
fn test_body_conversions() {
    assert!(!Body::from("a").is_stream());
    assert!(!Body::from(String::from("a")).is_stream());
    assert!(!Body::from(vec![1u8, 2]).is_stream());
    assert!(!Body::from(Bytes::from_static(b"a")).is_stream());
    assert!(matches!(Body::default(), Body::Full(ref c) if c.is_empty()));
    assert_eq!(format!("{:?}", Body::stream(|_out| async { anyhow::Ok(()) })), "Stream(..)");
}
