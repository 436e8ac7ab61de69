use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use aglm_contracts::QueuePayload;

use crate::config::WorkflowConfig;
use crate::error::WorkflowError;

pub type BuildCommand =
    Box<dyn Fn(&QueuePayload, &WorkflowConfig) -> Result<Vec<String>, WorkflowError> + Send + Sync>;

/// A named recipe mapping a task payload to an argv, with a timeout.
/// Immutable once registered.
pub struct WorkflowDefinition {
    pub name: String,
    pub build_command: BuildCommand,
    pub timeout: Duration,
    pub description: String,
}

impl std::fmt::Debug for WorkflowDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowDefinition")
            .field("name", &self.name)
            .field("timeout", &self.timeout)
            .field("description", &self.description)
            .finish()
    }
}

impl WorkflowDefinition {
    pub fn build(&self, payload: &QueuePayload, config: &WorkflowConfig) -> Result<Vec<String>, WorkflowError> {
        (self.build_command)(payload, config)
    }
}

fn seed_deployment_check(config: &WorkflowConfig) -> WorkflowDefinition {
    WorkflowDefinition {
        name: "deployment_check".to_string(),
        timeout: Duration::from_secs(config.deploy_timeout_secs),
        description: "Runs a phone-agent deployment/health check".to_string(),
        build_command: Box::new(|payload, config| {
            Ok(vec![
                config.script_interpreter.clone(),
                "scripts/deployment_check.py".to_string(),
                "--base-url".to_string(),
                config.model_base_url.clone(),
                "--model".to_string(),
                config.model_name.clone(),
                "--apikey".to_string(),
                config.model_api_key.clone(),
                "--device-id".to_string(),
                config.device_id.clone(),
                "--messages-file".to_string(),
                config.deploy_messages_file.clone(),
                "--content".to_string(),
                payload.content.clone(),
            ])
        }),
    }
}

fn seed_report_stub() -> WorkflowDefinition {
    WorkflowDefinition {
        name: "report_stub".to_string(),
        timeout: Duration::from_secs(120),
        description: "Runs a data/report query stub".to_string(),
        build_command: Box::new(|payload, _config| {
            Ok(vec![
                "python3".to_string(),
                "scripts/report_stub.py".to_string(),
                "--content".to_string(),
                payload.content.clone(),
            ])
        }),
    }
}

fn seed_travel_plan() -> WorkflowDefinition {
    WorkflowDefinition {
        name: "travel_plan".to_string(),
        timeout: Duration::from_secs(1800),
        description: "Builds a travel itinerary".to_string(),
        build_command: Box::new(|payload, config| {
            let mut argv = vec![
                "python3".to_string(),
                "scripts/travel_plan.py".to_string(),
            ];

            if !payload.script_args.is_empty() {
                argv.extend(payload.script_args.iter().cloned());
            } else if !payload.content.is_empty() {
                argv.push("--note".to_string());
                argv.push(payload.content.clone());
            }

            // Pass model connection settings through when configured, same
            // as the deployment check workflow.
            if !config.model_base_url.is_empty() {
                argv.push("--base-url".to_string());
                argv.push(config.model_base_url.clone());
            }
            if !config.model_api_key.is_empty() {
                argv.push("--apikey".to_string());
                argv.push(config.model_api_key.clone());
            }
            if !config.model_name.is_empty() {
                argv.push("--model".to_string());
                argv.push(config.model_name.clone());
            }
            if !config.device_id.is_empty() {
                argv.push("--device-id".to_string());
                argv.push(config.device_id.clone());
            }

            Ok(argv)
        }),
    }
}

fn seed_echo() -> WorkflowDefinition {
    WorkflowDefinition {
        name: "echo".to_string(),
        timeout: Duration::from_secs(60),
        description: "Echoes the classified intent and content back".to_string(),
        build_command: Box::new(|payload, _config| {
            Ok(vec![
                "python3".to_string(),
                "-c".to_string(),
                format!(
                    "print('Received intent={}: {}')",
                    payload.intent, payload.content
                ),
            ])
        }),
    }
}

/// Name -> `WorkflowDefinition` mapping. Static seeds are fixed at
/// construction and stored unlocked; dynamic script-backed definitions are
/// discovered lazily and cached behind a write lock taken only on a miss.
pub struct WorkflowRegistry {
    static_defs: HashMap<String, Arc<WorkflowDefinition>>,
    dynamic_defs: RwLock<HashMap<String, Arc<WorkflowDefinition>>>,
}

impl WorkflowRegistry {
    pub fn new(config: &WorkflowConfig) -> Self {
        let mut static_defs = HashMap::new();
        for def in [
            seed_deployment_check(config),
            seed_report_stub(),
            seed_travel_plan(),
            seed_echo(),
        ] {
            static_defs.insert(def.name.clone(), Arc::new(def));
        }
        Self {
            static_defs,
            dynamic_defs: RwLock::new(HashMap::new()),
        }
    }

    /// Look up a registered (static or already-cached dynamic) definition
    /// without touching the filesystem.
    pub fn get(&self, name: &str) -> Option<Arc<WorkflowDefinition>> {
        if let Some(def) = self.static_defs.get(name) {
            return Some(def.clone());
        }
        self.dynamic_defs.read().unwrap().get(name).cloned()
    }

    /// Resolve `task_type`, attempting dynamic registration on a miss: if
    /// `{scripts_dir}/{task_type}.py` exists, register and cache a new
    /// definition whose argv is the interpreter plus that script path,
    /// followed by `script_args` if non-empty or else a single positional
    /// `content` argument. Returns `None` if neither a static/cached
    /// definition nor a matching script file exists.
    pub fn resolve_or_register(
        &self,
        task_type: &str,
        config: &WorkflowConfig,
    ) -> Option<Arc<WorkflowDefinition>> {
        if let Some(def) = self.get(task_type) {
            return Some(def);
        }

        let script_path = config.scripts_dir.join(format!("{task_type}.py"));
        if !script_path.is_file() {
            return None;
        }

        let mut dynamic = self.dynamic_defs.write().unwrap();
        // Another caller may have won the race between the read above and
        // taking the write lock.
        if let Some(def) = dynamic.get(task_type) {
            return Some(def.clone());
        }

        let script_path_str = script_path.to_string_lossy().to_string();
        let name = task_type.to_string();
        let timeout = Duration::from_secs(config.cmd_timeout_secs);
        let interpreter = config.script_interpreter.clone();

        let def = Arc::new(WorkflowDefinition {
            name: name.clone(),
            timeout,
            description: format!("Dynamically registered script workflow for {task_type}"),
            build_command: Box::new(move |payload, _config| {
                let mut argv = vec![interpreter.clone(), script_path_str.clone()];
                if !payload.script_args.is_empty() {
                    argv.extend(payload.script_args.iter().cloned());
                } else {
                    argv.push(payload.content.clone());
                }
                Ok(argv)
            }),
        });

        dynamic.insert(name, def.clone());
        Some(def)
    }
}
