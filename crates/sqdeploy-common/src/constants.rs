//! System-wide constants and default paths.

/// In-container directory the web server serves assignments from.
pub const SERVER_ROOT: &str = "/usr/local/apache2/htdocs";

/// File name the service reads its configuration from, under [`SERVER_ROOT`].
pub const CONFIG_TARGET_NAME: &str = "sqtpm.cfg";

/// Service identifier inside the compose project.
pub const SERVICE_NAME: &str = "sqtpm-web";

/// Container name compose assigns to the service by default.
pub const DEFAULT_CONTAINER: &str = "sqtpm-sqtpm-web-1";

/// Host side of the baseline data mount, relative to the project directory.
pub const DATA_HOST_PATH: &str = "./data";

/// Directory name of the baseline data mount under [`SERVER_ROOT`].
pub const DATA_DIR_NAME: &str = "data";

/// File holding the persisted mount declaration, in the project directory.
pub const OVERRIDE_FILE: &str = "docker-compose.override.yml";

/// Maintenance script run after ownership fixup, relative to [`SERVER_ROOT`].
pub const FIX_PERMS_SCRIPT: &str = "Utils/fix-perms.sh";

/// Shell snippet that asks the web server to reload.
pub const RELOAD_COMMAND: &str = "pkill -HUP httpd || true";

/// Seconds between readiness polls.
pub const READY_POLL_INTERVAL_SECS: u64 = 1;

/// Maximum number of readiness polls before giving up.
pub const READY_MAX_ATTEMPTS: u32 = 60;

/// File extension of password files listed by `sqdeploy pass-files`.
pub const PASS_EXTENSION: &str = "pass";

/// Application name used in CLI output.
pub const APP_NAME: &str = "sqdeploy";

/// URL the service is reachable at after a default deployment.
pub const SERVICE_URL: &str = "http://localhost:8080";
