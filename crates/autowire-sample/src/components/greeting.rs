//! A component configured from a variable section.

use autowire_container::{ApplicationContext, BoxError, Component, ContextExt};
use serde::Deserialize;
use std::sync::OnceLock;
use tracing::debug;

/// The `greeting.*` section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GreetingSettings {
    pub message: String,
    #[serde(default = "default_signature")]
    pub signature: String,
}

fn default_signature() -> String {
    "the order desk".to_string()
}

impl Default for GreetingSettings {
    fn default() -> Self {
        Self {
            message: "Thanks for your order".to_string(),
            signature: default_signature(),
        }
    }
}

#[derive(Debug, Default)]
pub struct Greeter {
    settings: OnceLock<GreetingSettings>,
}

impl Greeter {
    pub const NAME: &'static str = "greeter";

    pub fn settings(&self) -> GreetingSettings {
        self.settings.get().cloned().unwrap_or_default()
    }

    pub fn confirmation(&self, item: &str, id: u64) -> String {
        let settings = self.settings();
        format!(
            "{}: {item} (#{id}) - {}",
            settings.message, settings.signature
        )
    }
}

impl Component for Greeter {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn init(&self, ctx: &dyn ApplicationContext) -> Result<(), BoxError> {
        // A missing section falls back to the defaults; a malformed one is an error.
        let settings = if ctx.get_variable("greeting.message").is_empty() {
            GreetingSettings::default()
        } else {
            ctx.variables().get_struct::<GreetingSettings>("greeting")?
        };
        debug!(?settings, "Greeter configured");
        let _ = self.settings.set(settings);
        Ok(())
    }
}
