use taskdeck_config::{config_to_json, TaskdeckConfig};

pub fn run(config: &TaskdeckConfig) {
    println!("{}", config_to_json(config));
}
