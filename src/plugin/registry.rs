use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::config::{OutputSettings, PluginSettings};
use crate::error::{Error, Result};

use super::{InputPlugin, NullOutput, OutputPlugin, RodioInput, RodioOutput};

/// Configured output name that selects the preferred backend.
pub const DEFAULT_OUTPUT: &str = "default";

pub type OutputFactory = Arc<dyn Fn() -> Box<dyn OutputPlugin> + Send + Sync>;

struct InputEntry {
    plugin: Arc<dyn InputPlugin>,
    priority: i32,
}

struct OutputEntry {
    name: String,
    priority: i32,
    promises: Option<String>,
    factory: OutputFactory,
}

/// Registered backends, in registration order.
#[derive(Default)]
pub struct PluginRegistry {
    inputs: Vec<InputEntry>,
    outputs: Vec<OutputEntry>,
    input_priority: HashMap<String, i32>,
    output_priority: HashMap<String, i32>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with priority overrides from the configuration.
    pub fn with_priorities(settings: &PluginSettings) -> Self {
        Self {
            input_priority: settings.input_priority.clone(),
            output_priority: settings.output_priority.clone(),
            ..Self::default()
        }
    }

    /// The backends that ship with the player.
    pub fn builtin(plugins: &PluginSettings, output: &OutputSettings) -> Self {
        let mut reg = Self::with_priorities(plugins);
        reg.register_input(Arc::new(RodioInput::new()));

        let rodio_settings = output.clone();
        reg.register_output(
            "rodio",
            0,
            Some("audio"),
            Arc::new(move || Box::new(RodioOutput::new(&rodio_settings)) as Box<dyn OutputPlugin>),
        );
        reg.register_output(
            "null",
            100,
            None,
            Arc::new(|| Box::new(NullOutput::new()) as Box<dyn OutputPlugin>),
        );
        reg
    }

    pub fn register_input(&mut self, plugin: Arc<dyn InputPlugin>) {
        if let Err(e) = plugin.init() {
            tracing::warn!(plugin = plugin.name(), "input plugin init failed: {e}");
            return;
        }
        let priority = self
            .input_priority
            .get(plugin.name())
            .copied()
            .unwrap_or_else(|| plugin.priority());
        tracing::debug!(plugin = plugin.name(), priority, "registered input plugin");
        self.inputs.push(InputEntry { plugin, priority });
    }

    pub fn register_output(
        &mut self,
        name: &str,
        priority: i32,
        promises: Option<&str>,
        factory: OutputFactory,
    ) {
        let priority = self.output_priority.get(name).copied().unwrap_or(priority);
        tracing::debug!(plugin = name, priority, "registered output plugin");
        self.outputs.push(OutputEntry {
            name: name.to_string(),
            priority,
            promises: promises.map(str::to_string),
            factory,
        });
    }

    /// Decoder for `path`, chosen by extension. Among several candidates the
    /// lowest priority value wins; ties go to the earliest registration.
    pub fn input_for_path(&self, path: &Path) -> Option<Arc<dyn InputPlugin>> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        self.inputs
            .iter()
            .enumerate()
            .filter(|(_, e)| {
                e.plugin
                    .extensions()
                    .iter()
                    .any(|x| x.eq_ignore_ascii_case(&ext))
            })
            .min_by_key(|(order, e)| (e.priority, *order))
            .map(|(_, e)| e.plugin.clone())
    }

    /// Whether any decoder claims `path`.
    pub fn is_supported(&self, path: &Path) -> bool {
        self.input_for_path(path).is_some()
    }

    fn output_entry(&self, name: &str) -> Option<&OutputEntry> {
        if name == DEFAULT_OUTPUT {
            self.outputs
                .iter()
                .enumerate()
                .min_by_key(|(order, e)| (e.priority, *order))
                .map(|(_, e)| e)
        } else {
            self.outputs.iter().find(|e| e.name == name)
        }
    }

    /// Resolve `name` (or [`DEFAULT_OUTPUT`]) and instantiate the backend.
    pub fn create_output(&self, name: &str) -> Result<Box<dyn OutputPlugin>> {
        let entry = self.output_entry(name).ok_or_else(|| {
            if self.outputs.is_empty() {
                Error::NoOutput
            } else {
                Error::UnknownOutput(name.to_string())
            }
        })?;
        let mut plugin = (entry.factory)();
        plugin.init()?;
        Ok(plugin)
    }

    /// Capability tokens declared by an output backend.
    pub fn output_promises(&self, name: &str) -> Option<&str> {
        self.output_entry(name).and_then(|e| e.promises.as_deref())
    }

    pub fn output_names(&self) -> Vec<&str> {
        self.outputs.iter().map(|e| e.name.as_str()).collect()
    }
}
