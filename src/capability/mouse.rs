//! Pointer control through a short-lived pointer socket.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::command::ResponseListener;
use crate::error::Result;
use crate::pointer::{PointerSocket, pointer_socket_url};
use crate::transport::Connector;

use super::{WebOsTv, field};

const POINTER_SOCKET: &str = "ssap://com.webos.service.networkinput/getPointerInputSocket";

// ============================================================================
// MouseControl
// ============================================================================

/// Pointer and navigation buttons.
pub trait MouseControl {
    /// Opens a pointer socket, runs `callback` on it once connected, then
    /// closes it.
    ///
    /// Failures along the way are logged; the callback is simply not run.
    ///
    /// # Example
    ///
    /// ```ignore
    /// tv.execute_mouse(|pointer| {
    ///     if let Err(e) = pointer.button(ButtonKey::Home) {
    ///         eprintln!("pointer: {e}");
    ///     }
    /// });
    /// ```
    fn execute_mouse<F>(&self, callback: F)
    where
        F: FnOnce(&PointerSocket) + Send + 'static;
}

impl MouseControl for WebOsTv {
    fn execute_mouse<F>(&self, callback: F)
    where
        F: FnOnce(&PointerSocket) + Send + 'static,
    {
        let connector = self.session().connector();
        let callback = Arc::new(Mutex::new(Some(callback)));

        let on_socket_path: ResponseListener<String> = Arc::new(move |result: Result<String>| {
            let socket_path = match result {
                Ok(path) => path,
                Err(e) => {
                    warn!(error = %e, "Failed to get pointer input socket");
                    return;
                }
            };
            let Some(callback) = callback.lock().take() else {
                return;
            };
            let Ok(runtime) = Handle::try_current() else {
                warn!("No tokio runtime for pointer socket");
                return;
            };
            runtime.spawn(run_pointer(Arc::clone(&connector), socket_path, callback));
        });

        self.request(POINTER_SOCKET, None, field("socketPath"), on_socket_path);
    }
}

async fn run_pointer<F>(connector: Arc<dyn Connector>, socket_path: String, callback: F)
where
    F: FnOnce(&PointerSocket) + Send + 'static,
{
    let url = match pointer_socket_url(&socket_path) {
        Ok(url) => url,
        Err(e) => {
            warn!(error = %e, socket_path, "Invalid pointer socket path");
            return;
        }
    };

    let socket = PointerSocket::new(connector);
    match socket.connect(&url).await {
        Ok(true) => {
            callback(&socket);
            socket.disconnect();
        }
        Ok(false) => {}
        Err(e) => debug!(error = %e, "Error in communication with pointer socket"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pointer::ButtonKey;
    use crate::session::testing::{handshake, harness};
    use serde_json::json;

    #[tokio::test]
    async fn test_execute_mouse_runs_callback_on_downgraded_socket() {
        let (session, _connector, mut peers, _keys) = harness();
        session.connect();
        let mut peer = peers.recv().await.expect("session link");
        handshake(&session, &mut peer, "key").await;
        let tv = WebOsTv::new(session);

        tv.execute_mouse(|pointer| {
            pointer.button(ButtonKey::Home).expect("home");
            pointer.click().expect("click");
        });

        let request = peer.next_frame().await;
        assert_eq!(request["uri"], POINTER_SOCKET);
        peer.push(
            &json!({
                "type": "response",
                "id": request["id"],
                "payload": {"socketPath": "wss://192.168.2.119:3001/resources/xyz/netinput.pointer.sock"}
            })
            .to_string(),
        );

        let mut pointer = peers.recv().await.expect("pointer link");
        assert_eq!(
            pointer.url.as_str(),
            "ws://192.168.2.119:3000/resources/xyz/netinput.pointer.sock"
        );
        assert_eq!(pointer.sent.recv().await.as_deref(), Some("type:button\nname:HOME\n\n"));
        assert_eq!(pointer.sent.recv().await.as_deref(), Some("type:click\n\n"));
        assert!(pointer.sent.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_execute_mouse_without_socket_path_skips_callback() {
        let (session, _connector, mut peers, _keys) = harness();
        session.connect();
        let mut peer = peers.recv().await.expect("session link");
        handshake(&session, &mut peer, "key").await;
        let tv = WebOsTv::new(session);
        let ran = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = Arc::clone(&ran);

        tv.execute_mouse(move |_| flag.store(true, std::sync::atomic::Ordering::SeqCst));

        let request = peer.next_frame().await;
        peer.push(&json!({"type": "response", "id": request["id"], "payload": {}}).to_string());
        crate::session::testing::wait_until(|| tv.session().pending_count() == 0).await;

        assert!(!ran.load(std::sync::atomic::Ordering::SeqCst));
        assert!(peers.try_recv().is_err());
    }
}
