//! Startup readiness tracking: components register a named task at startup
//! and drop the returned guard when that task has finished initializing.
//! The health endpoint stays at 503 until the pending set is empty.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tracing::info;

use crate::telemetry;

#[derive(Clone, Debug, Default)]
pub struct Ready(Arc<Mutex<HashSet<String>>>);

impl Ready {
    pub fn new() -> Ready {
        Ready::default()
    }

    /// Registers a dependency that must complete before the process is ready.
    pub fn register_task(&self, name: &str) -> BlockReady {
        self.0.lock().unwrap().insert(name.to_string());
        BlockReady {
            parent: self.clone(),
            name: name.to_string(),
        }
    }

    pub fn pending(&self) -> HashSet<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn is_ready(&self) -> bool {
        self.pending().is_empty()
    }
}

/// Blocks readiness until dropped.
pub struct BlockReady {
    parent: Ready,
    name: String,
}

impl BlockReady {
    pub fn subtask(&self, name: &str) -> BlockReady {
        self.parent.register_task(name)
    }
}

impl Drop for BlockReady {
    fn drop(&mut self) {
        let mut pending = self.parent.0.lock().unwrap();
        pending.remove(&self.name);
        let left = pending.len();
        let dur = telemetry::uptime();
        if left == 0 {
            info!("task '{}' complete ({dur:?}), marking server ready", self.name);
        } else {
            info!(
                "task '{}' complete ({dur:?}), still awaiting {left} tasks",
                self.name
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_when_all_tasks_drop() {
        let ready = Ready::new();
        let a = ready.register_task("regex");
        let b = ready.register_task("nlp");
        assert!(!ready.is_ready());
        drop(a);
        assert!(!ready.is_ready());
        drop(b);
        assert!(ready.is_ready());
    }
}
