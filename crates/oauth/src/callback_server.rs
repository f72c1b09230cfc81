use std::{
    net::{Ipv4Addr, SocketAddr},
    sync::{Arc, Mutex},
    time::Duration,
};

use {
    axum::{
        Router,
        extract::{Query, State},
        response::Html,
        routing::get,
    },
    tokio::{sync::oneshot, task::JoinHandle},
    tracing::{debug, warn},
};

use crate::{Error, Result, types::CallbackParams};

/// How long `shutdown` waits for in-flight connections before aborting.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

const COMPLETED_PAGE: &str = "Authorization completed. Please close this window.";
const ALREADY_HANDLED_PAGE: &str =
    "This authorization request has already been handled. Please close this window.";

type Delivery = Arc<Mutex<Option<oneshot::Sender<CallbackParams>>>>;

/// Lifecycle of a [`CallbackServer`]. A server never returns to `Listening`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Listening,
    Delivered,
    TimedOut,
    Stopped,
}

/// One-shot loopback HTTP server that receives the authorization redirect.
///
/// Serves `GET /` on `127.0.0.1:{port}` and hands the first request's query
/// parameters to [`CallbackServer::wait`]. The listening socket is released
/// by [`CallbackServer::shutdown`], or on drop if shutdown was never awaited.
pub struct CallbackServer {
    addr: SocketAddr,
    state: ListenerState,
    params_rx: Option<oneshot::Receiver<CallbackParams>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<std::io::Result<()>>>,
}

impl CallbackServer {
    /// Bind the loopback port and start serving. Port `0` picks a free port.
    pub async fn bind(port: u16) -> Result<Self> {
        let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|source| Error::CallbackBind { addr, source })?;
        let addr = listener.local_addr()?;

        let (params_tx, params_rx) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let delivery: Delivery = Arc::new(Mutex::new(Some(params_tx)));

        let app = Router::new()
            .route("/", get(handle_callback))
            .with_state(delivery);
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        });
        let task = tokio::spawn(server.into_future());

        debug!(%addr, "callback listener started");
        Ok(Self {
            addr,
            state: ListenerState::Listening,
            params_rx: Some(params_rx),
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn state(&self) -> ListenerState {
        self.state
    }

    /// Wait for the redirect or for `timeout` to elapse, whichever comes first.
    ///
    /// Only the first call can succeed; the delivery channel is single-use.
    pub async fn wait(&mut self, timeout: Duration) -> Result<CallbackParams> {
        let Some(params_rx) = self.params_rx.take() else {
            return Err(Error::CallbackClosed);
        };

        tokio::select! {
            received = params_rx => match received {
                Ok(params) => {
                    debug!(addr = %self.addr, "authorization callback delivered");
                    self.state = ListenerState::Delivered;
                    Ok(params)
                },
                Err(_) => Err(Error::CallbackClosed),
            },
            () = tokio::time::sleep(timeout) => {
                debug!(addr = %self.addr, ?timeout, "no authorization callback before timeout");
                self.state = ListenerState::TimedOut;
                Err(Error::AuthorizationTimeout { timeout })
            },
        }
    }

    /// Stop serving and release the port. Failures are logged, never returned.
    pub async fn shutdown(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(SHUTDOWN_GRACE, &mut task).await {
                Ok(Ok(Ok(()))) => debug!(addr = %self.addr, "callback listener stopped"),
                Ok(Ok(Err(e))) => {
                    warn!(addr = %self.addr, error = %e, "callback listener exited with error")
                },
                Ok(Err(e)) => warn!(addr = %self.addr, error = %e, "callback listener task failed"),
                Err(_) => {
                    warn!(addr = %self.addr, "callback listener did not stop in time, aborting");
                    task.abort();
                    let _ = task.await;
                },
            }
        }
        self.state = ListenerState::Stopped;
    }
}

impl Drop for CallbackServer {
    fn drop(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn handle_callback(
    State(delivery): State<Delivery>,
    Query(params): Query<CallbackParams>,
) -> Html<&'static str> {
    let sender = delivery.lock().unwrap_or_else(|e| e.into_inner()).take();
    match sender {
        Some(sender) => {
            if sender.send(params).is_err() {
                debug!("authorization callback arrived after the attempt ended");
            }
            Html(COMPLETED_PAGE)
        },
        None => Html(ALREADY_HANDLED_PAGE),
    }
}
