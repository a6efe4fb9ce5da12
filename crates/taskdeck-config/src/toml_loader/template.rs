//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# Taskdeck Configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[store]
# backend = "memory"            # memory, remote
# url = "ws://127.0.0.1:7070/ws"
# connect_timeout = 15          # 1-120 seconds
# request_timeout = 10          # 1-120 seconds
# heartbeat_interval = 25       # 5-300 seconds
# reconnect_delay = 1           # 1-60 seconds
# max_reconnect_delay = 30      # 1-600 seconds

[presence]
# enabled = true
# include_self = true

[server]
# bind = "127.0.0.1"
# port = 7070
# reap_on_disconnect = false
# hello_timeout = 10            # 1-60 seconds

[logging]
# level = "info"                # trace, debug, info, warn, error
"##
    .to_string()
}
