use std::future::Future;
use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::core::config::{AppConfig, ConfigError};
use crate::create_router;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("server io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("server task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// A bound listener together with the router it will serve.
pub struct Server {
    listener: TcpListener,
    router: Router,
}

impl Server {
    pub async fn bind(config: &AppConfig) -> Result<Self, ServerError> {
        let client = config.http_client()?;
        let listener = TcpListener::bind(config.bind_addr).await?;
        Ok(Self {
            listener,
            router: create_router(client),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Serves until `signal` resolves, then drains in-flight requests.
    pub async fn serve_until<F>(self, signal: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(signal)
            .await?;
        Ok(())
    }

    /// Spawns the server onto the current runtime.
    pub fn start(self) -> Result<ServerHandle, ServerError> {
        let local_addr = self.local_addr()?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(self.serve_until(async move {
            let _ = shutdown_rx.await;
        }));
        tracing::info!("Listening on {}", local_addr);
        Ok(ServerHandle {
            local_addr,
            shutdown: shutdown_tx,
            task,
        })
    }
}

pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<Result<(), ServerError>>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub async fn stop(self) -> Result<(), ServerError> {
        // The receiver is gone only if the server task already exited.
        let _ = self.shutdown.send(());
        self.task.await??;
        tracing::info!("Server on {} stopped", self.local_addr);
        Ok(())
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", error);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(error) => {
                tracing::error!("Failed to listen for SIGTERM: {}", error);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loopback_config() -> AppConfig {
        AppConfig {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            ..AppConfig::default()
        }
    }

    #[tokio::test]
    async fn start_and_stop_release_the_port() {
        let handle = Server::bind(&loopback_config())
            .await
            .expect("server should bind")
            .start()
            .expect("server should start");
        let address = handle.local_addr();
        assert_ne!(address.port(), 0);

        let response = reqwest::get(format!("http://{address}/convert"))
            .await
            .expect("server should answer");
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        drop(response);

        handle.stop().await.expect("server should stop cleanly");
        assert!(reqwest::get(format!("http://{address}/convert")).await.is_err());
    }

    #[tokio::test]
    async fn serve_until_returns_when_signal_fires() {
        let server = Server::bind(&loopback_config()).await.expect("server should bind");

        server
            .serve_until(async {})
            .await
            .expect("immediate shutdown should succeed");
    }

    #[tokio::test]
    async fn bind_fails_on_used_port() {
        let first = Server::bind(&loopback_config()).await.expect("server should bind");
        let taken = AppConfig {
            bind_addr: first.local_addr().expect("address should exist"),
            ..AppConfig::default()
        };

        let error = Server::bind(&taken).await.err().expect("second bind should fail");
        assert!(matches!(error, ServerError::Io(_)));
    }
}
