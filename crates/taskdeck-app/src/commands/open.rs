//! `taskdeck open`: be present on a task until the process is stopped.

use taskdeck_common::Result;
use taskdeck_config::TaskdeckConfig;
use taskdeck_presence::{PresenceContext, PresenceOptions, PresenceTracker, Principal};

use super::format_viewers;
use crate::store::Backend;
use crate::unload::wait_for_unload;

pub async fn run(
    config: &TaskdeckConfig,
    task: &str,
    user: Option<String>,
    name: Option<String>,
    avatar: Option<String>,
) -> Result<()> {
    let principal = user.map(|subject| {
        let mut principal = Principal::new(subject);
        principal.display_name = name;
        principal.avatar_ref = avatar;
        principal
    });

    let backend = Backend::connect(
        &config.store,
        principal.as_ref().map(|p| p.subject_id.as_str()),
    )
    .await;
    let options = PresenceOptions {
        include_self: config.presence.include_self,
        announce: config.presence.enabled,
    };

    let tracker = PresenceTracker::open(
        PresenceContext::new(backend.shared()),
        options,
        task,
        principal,
    )
    .await;
    tracing::info!(task = %task, present = tracker.is_present(), "Task opened");

    let mut state = tracker.subscribe_state();
    println!("{}", format_viewers(task, &state.borrow_and_update().viewers));

    let unload = wait_for_unload();
    tokio::pin!(unload);
    loop {
        tokio::select! {
            _ = &mut unload => break,
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let viewers = state.borrow_and_update().viewers.clone();
                println!("{}", format_viewers(task, &viewers));
            }
        }
    }

    tracing::info!(task = %task, "Closing task");
    tracker.shutdown().await;
    backend.close().await;
    Ok(())
}
