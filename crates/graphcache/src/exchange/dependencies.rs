use std::collections::HashMap;

use indexmap::IndexSet;

use crate::keys::{Dependencies, DependencyKey, OperationKey};

/// Which operations read which dependency keys, in both directions
#[derive(Debug, Default)]
pub(crate) struct DependencyIndex {
    by_operation: HashMap<OperationKey, Dependencies>,
    by_key: HashMap<DependencyKey, IndexSet<OperationKey>>,
}

impl DependencyIndex {
    /// Replaces the dependencies of an operation with those of its latest read
    pub fn set(&mut self, operation: OperationKey, dependencies: Dependencies) {
        self.remove(operation);

        for key in &dependencies {
            self.by_key.entry(key.clone()).or_default().insert(operation);
        }
        self.by_operation.insert(operation, dependencies);
    }

    pub fn remove(&mut self, operation: OperationKey) {
        let Some(previous) = self.by_operation.remove(&operation) else {
            return;
        };

        for key in previous {
            if let Some(operations) = self.by_key.get_mut(&key) {
                operations.shift_remove(&operation);
                if operations.is_empty() {
                    self.by_key.remove(&key);
                }
            }
        }
    }

    pub fn get(&self, operation: OperationKey) -> Option<&Dependencies> {
        self.by_operation.get(&operation)
    }

    /// The operations that read any of `touched`
    pub fn dependents(&self, touched: &Dependencies) -> IndexSet<OperationKey> {
        touched
            .iter()
            .filter_map(|key| self.by_key.get(key))
            .flatten()
            .copied()
            .collect()
    }
}
