mod config;
mod open;
mod viewers;

use taskdeck_common::Result;
use taskdeck_config::TaskdeckConfig;
use taskdeck_presence::ViewerRecord;

use crate::cli::Command;

pub async fn run(command: Command, config: TaskdeckConfig) -> Result<()> {
    match command {
        Command::Open {
            task,
            user,
            name,
            avatar,
        } => open::run(&config, &task, user, name, avatar).await,
        Command::Viewers { task, follow } => viewers::run(&config, &task, follow).await,
        Command::Config => {
            config::run(&config);
            Ok(())
        }
    }
}

/// One line per viewer list: `t1: Ada (u1), u2`.
pub(crate) fn format_viewers(task: &str, viewers: &[ViewerRecord]) -> String {
    if viewers.is_empty() {
        return format!("{task}: no viewers");
    }
    let names: Vec<String> = viewers
        .iter()
        .map(|v| match &v.display_name {
            Some(name) => format!("{name} ({})", v.subject_id),
            None => v.subject_id.clone(),
        })
        .collect();
    format!("{task}: {}", names.join(", "))
}
