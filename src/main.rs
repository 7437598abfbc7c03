//! KeyAuth CLI: reads ndjson requests (file argument or stdin), writes one ndjson result per request.
//!
//! ```text
//! {"op":"register","identity":"ada","keystrokes":[{"key":"h","press_time":0,"release_time":95}, ...]}
//! {"op":"authenticate","identity":"ada","keystrokes":[...],"device_type":"mobile"}
//! {"op":"status","identity":"ada"}
//! ```

use keyauth::{
    config::AuthConfig,
    features::KeystrokeEvent,
    logging::StructuredLogger,
    service::{AuthService, SampleSubmission},
    storage::SecureStore,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::io::{BufRead, BufReader, Write};
use std::sync::Arc;
use tracing::{info, warn};

fn default_device_type() -> String {
    "web".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Request {
    Features {
        keystrokes: Vec<KeystrokeEvent>,
    },
    Register {
        identity: String,
        keystrokes: Vec<KeystrokeEvent>,
        #[serde(default = "default_device_type")]
        device_type: String,
    },
    Enroll {
        identity: String,
        keystrokes: Vec<KeystrokeEvent>,
        #[serde(default = "default_device_type")]
        device_type: String,
    },
    Authenticate {
        identity: String,
        keystrokes: Vec<KeystrokeEvent>,
        #[serde(default = "default_device_type")]
        device_type: String,
    },
    Status {
        identity: String,
    },
    History {
        identity: String,
    },
}

fn submission(keystrokes: Vec<KeystrokeEvent>, device_type: String) -> SampleSubmission {
    SampleSubmission {
        keystrokes,
        device_type,
    }
}

fn handle(service: &AuthService<SecureStore>, request: Request) -> keyauth::Result<Value> {
    let value = match request {
        Request::Features { keystrokes } => {
            let f = service.extract_features(&keystrokes)?;
            json!({ "vector": f.vector, "summary": f.summary })
        }
        Request::Register {
            identity,
            keystrokes,
            device_type,
        } => serde_json::to_value(service.register(&identity, &submission(keystrokes, device_type))?)?,
        Request::Enroll {
            identity,
            keystrokes,
            device_type,
        } => serde_json::to_value(
            service.enroll_sample(&identity, &submission(keystrokes, device_type))?,
        )?,
        Request::Authenticate {
            identity,
            keystrokes,
            device_type,
        } => serde_json::to_value(
            service.score_authentication_attempt(&identity, &submission(keystrokes, device_type))?,
        )?,
        Request::Status { identity } => serde_json::to_value(service.enrollment_status(&identity)?)?,
        Request::History { identity } => serde_json::to_value(service.auth_history(&identity)?)?,
    };
    Ok(value)
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config_path = std::env::var("KEYAUTH_CONFIG_PATH")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| std::path::PathBuf::from("keyauth.json"));
    let config = AuthConfig::load(&config_path);

    StructuredLogger::init(config.log.json, &config.log.level);

    let secret = std::env::var("KEYAUTH_STORE_SECRET")
        .map_err(|_| "KEYAUTH_STORE_SECRET must be set to open the profile store")?;

    std::fs::create_dir_all(&config.data_dir)?;
    let store_path = config.data_dir.join("store.db");
    let store = Arc::new(SecureStore::open(&store_path, secret.as_bytes())?);
    info!(data_dir = ?config.data_dir, "KeyAuth starting");

    let service = AuthService::new(config, store)?;

    let input: Box<dyn BufRead> = match std::env::args().nth(1) {
        Some(path) => Box::new(BufReader::new(std::fs::File::open(path)?)),
        None => Box::new(BufReader::new(std::io::stdin())),
    };
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    let mut handled: u64 = 0;
    for (n, line) in input.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let result = serde_json::from_str::<Request>(&line)
            .map_err(keyauth::AuthError::from)
            .and_then(|req| handle(&service, req));
        let response = match result {
            Ok(value) => json!({ "line": n + 1, "ok": true, "result": value }),
            Err(e) => {
                warn!(line = n + 1, error = %e, "request failed");
                json!({ "line": n + 1, "ok": false, "error": e.to_string() })
            }
        };
        StructuredLogger::emit_json(&response, &mut out)?;
        handled += 1;
    }
    out.flush()?;
    info!(requests = handled, "KeyAuth done");

    Ok(())
}
