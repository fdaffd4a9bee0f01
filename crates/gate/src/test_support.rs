//! Hand-rolled identity services for failure modes mockito cannot produce

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// What the service does once it has answered the startup health check
#[derive(Debug, Clone, Copy)]
pub(crate) enum AfterStartup {
    /// Stop listening: later connections are refused.
    Vanish,
    /// Accept later connections and never answer them.
    Hang,
}

/// Start a local identity service and return its base url.
pub(crate) async fn spawn_identity_service(after_startup: AfterStartup) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    tokio::spawn(async move {
        let (health_check, _) = listener.accept().await.unwrap();
        let listener = match after_startup {
            // Closed before the health check is answered, so the port is already
            // refusing connections once the gate is built
            AfterStartup::Vanish => {
                drop(listener);
                None
            }
            AfterStartup::Hang => Some(listener),
        };
        answer_health_check(health_check).await;

        if let Some(listener) = listener {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        }
    });

    base_url
}

async fn answer_health_check(mut socket: TcpStream) {
    let mut buf = [0u8; 4096];
    let _ = socket.read(&mut buf).await;
    socket
        .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
        .await
        .unwrap();
    let _ = socket.shutdown().await;
}
