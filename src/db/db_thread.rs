use std::thread;

use anyhow::Result;
use tokio::sync::{mpsc, oneshot};
use tracing::info;

use crate::db::{
    DbRequest,
    store::{Store, StoreOptions},
};

pub fn start_db_thread(
    mut rx: mpsc::Receiver<Box<dyn DbRequest>>,
    options: StoreOptions,
) -> oneshot::Receiver<Result<()>> {
    let (ready_tx, ready_rx) = oneshot::channel();

    thread::spawn(move || {
        let mut store = match Store::load(options) {
            Ok(store) => store,
            Err(err) => {
                let _ = ready_tx.send(Err(err.context("Failed to load ticket data")));
                return;
            }
        };

        let _ = ready_tx.send(Ok(()));

        while let Some(request) = rx.blocking_recv() {
            request.execute(&mut store);
        }

        info!("All database handles dropped, stopping database thread");
    });

    ready_rx
}
