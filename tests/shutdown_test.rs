mod common;

use std::time::Duration;

use tokio::sync::oneshot;

use common::TestApp;

#[tokio::test]
async fn shutdown_completes_with_an_open_update_stream() {
    let app = TestApp::new();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (trigger, signal) = oneshot::channel::<()>();
    let server = tokio::spawn(braip_tracker::serve(
        listener,
        app.router(),
        app.state.orders.hub().clone(),
        async move {
            let _ = signal.await;
        },
    ));

    let mut stream = reqwest::get(format!("http://{}/api/orders/updates", addr))
        .await
        .unwrap();
    let first = stream.chunk().await.unwrap().expect("CONNECTED frame");
    assert!(String::from_utf8_lossy(&first).contains("CONNECTED"));
    assert_eq!(app.state.orders.hub().subscriber_count(), 1);

    trigger.send(()).unwrap();

    let finished = tokio::time::timeout(Duration::from_secs(3), server).await;
    assert!(finished.is_ok(), "server did not stop within 3s");
    finished.unwrap().unwrap().unwrap();

    // The client sees the stream end rather than a hang.
    let rest = tokio::time::timeout(Duration::from_secs(1), stream.chunk()).await;
    assert!(matches!(rest, Ok(Ok(None)) | Ok(Err(_))));
}
