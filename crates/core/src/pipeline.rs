use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, SweepError};
use crate::types::Point;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    #[default]
    DoNothing,
    Click,
    Custom,
}

/// One step of the workflow graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Node {
    pub action: ActionKind,
    /// Tap point for `Click`.
    pub target: Option<Point>,
    /// Registered action name for `Custom`.
    pub custom_action: Option<String>,
    /// Object, or a string holding JSON.
    pub custom_action_param: Value,
    pub next: Vec<String>,
}

impl Node {
    /// The custom action parameter as a JSON value. Empty strings read as `null`.
    pub fn param(&self) -> Result<Value> {
        match &self.custom_action_param {
            Value::String(s) if s.trim().is_empty() => Ok(Value::Null),
            Value::String(s) => serde_json::from_str(s)
                .map_err(|e| SweepError::config(format!("custom_action_param is not valid JSON: {e}"))),
            v => Ok(v.clone()),
        }
    }
}

/// Named nodes, as loaded from a pipeline JSON file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pipeline {
    nodes: HashMap<String, Node>,
}

impl Pipeline {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text, path)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Self::parse(text, Path::new("<inline>"))
    }

    fn parse(text: &str, path: &Path) -> Result<Self> {
        let fail = |message: String| SweepError::PipelineParse {
            path: PathBuf::from(path),
            message,
        };
        let pipeline: Pipeline = serde_json::from_str(text).map_err(|e| fail(e.to_string()))?;
        pipeline.validate().map_err(fail)?;
        Ok(pipeline)
    }

    fn validate(&self) -> std::result::Result<(), String> {
        for (name, node) in &self.nodes {
            match node.action {
                ActionKind::Click if node.target.is_none() => {
                    return Err(format!("node '{}': Click needs a target", name));
                }
                ActionKind::Custom if node.custom_action.as_deref().map_or(true, str::is_empty) => {
                    return Err(format!("node '{}': Custom needs custom_action", name));
                }
                _ => {}
            }
            if let Some(missing) = node.next.iter().find(|n| !self.nodes.contains_key(*n)) {
                return Err(format!("node '{}': next refers to unknown node '{}'", name, missing));
            }
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Node> {
        self.nodes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
