use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::TextGenerator;
use crate::usage::gate::CooldownGate;
use crate::usage::store::UsageLedger;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub gate: Arc<CooldownGate>,
    /// Single in-process writer for the usage file.
    pub ledger: Arc<UsageLedger>,
    /// Default: the Gemini `LlmClient`. Tests swap in scripted generators.
    pub generator: Arc<dyn TextGenerator>,
}

#[cfg(test)]
impl AppState {
    pub fn for_tests(
        file: crate::usage::store::JsonFileStore,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        use crate::usage::gate::GatePolicy;

        let config = Config {
            gemini_api_key: "test".to_string(),
            gemini_api_base: "http://127.0.0.1:9".to_string(),
            admin_access_code: Some("letmein".to_string()),
            admin_contact_url: "https://example.test/contact".to_string(),
            usage_file: file.path().to_path_buf(),
            cooldown: std::time::Duration::from_secs(86_400),
            llm_max_attempts: 1,
            trust_forwarded_for: false,
            port: 0,
            rust_log: "info".to_string(),
        };
        let gate = CooldownGate::new(GatePolicy {
            cooldown: config.cooldown,
            admin_secret: config.admin_access_code.clone(),
        });

        AppState {
            config,
            gate: Arc::new(gate),
            ledger: Arc::new(UsageLedger::open(file)),
            generator,
        }
    }
}
