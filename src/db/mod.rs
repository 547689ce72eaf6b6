use anyhow::{Context as _, Result, anyhow};
use tokio::sync::{mpsc, oneshot};

pub mod backup;
pub mod db_thread;
pub mod json;
pub mod store;

use store::Store;

pub trait DbRequest: Send + 'static {
    fn execute(self: Box<Self>, store: &mut Store);
}

/// Cloneable handle to the database thread. Each request carries its own response channel.
#[derive(Clone)]
pub struct DbHandle {
    tx: mpsc::Sender<Box<dyn DbRequest>>,
}

impl DbHandle {
    pub fn new(tx: mpsc::Sender<Box<dyn DbRequest>>) -> Self {
        Self { tx }
    }

    pub(crate) async fn dispatch_request<T, R>(
        &self,
        build_request: impl FnOnce(oneshot::Sender<T>) -> R,
    ) -> Result<T>
    where
        T: Send + 'static,
        R: DbRequest,
    {
        let (response_tx, response_rx) = oneshot::channel();

        self.tx
            .send(Box::new(build_request(response_tx)))
            .await
            .map_err(|_| anyhow!("Database thread is no longer running"))?;

        response_rx
            .await
            .context("Database thread dropped the request without responding")
    }
}

#[cfg(test)]
pub async fn spawn_test_db(options: store::StoreOptions) -> DbHandle {
    let (tx, rx) = mpsc::channel(8);
    db_thread::start_db_thread(rx, options)
        .await
        .unwrap()
        .unwrap();
    DbHandle::new(tx)
}
