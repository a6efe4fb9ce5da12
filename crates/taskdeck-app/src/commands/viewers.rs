//! `taskdeck viewers`: print who has a task open.

use taskdeck_common::{Result, TaskdeckError};
use taskdeck_config::TaskdeckConfig;

use super::format_viewers;
use crate::store::Backend;
use crate::unload::wait_for_unload;

pub async fn run(config: &TaskdeckConfig, task: &str, follow: bool) -> Result<()> {
    let backend = Backend::connect(&config.store, None).await;
    let store = backend.shared();

    let mut viewers = match taskdeck_presence::subscribe(store.as_ref(), task).await {
        Ok(viewers) => viewers,
        Err(e) => {
            backend.close().await;
            return Err(e.into());
        }
    };

    let unload = wait_for_unload();
    tokio::pin!(unload);
    let result = loop {
        tokio::select! {
            _ = &mut unload => break Ok(()),
            list = viewers.next() => match list {
                Some(list) => {
                    println!("{}", format_viewers(task, &list));
                    if !follow {
                        break Ok(());
                    }
                }
                None => break Err(TaskdeckError::Network("viewer stream ended".into())),
            },
        }
    };

    drop(viewers);
    backend.close().await;
    result
}
