use std::collections::HashMap;
use crate::config::CoordinatorSettings;
use crate::coordinator::Coordinator;
use crate::fetchers::fetcher::Fetcher;
use crate::key::DataSourceKey;

/// Keeps exactly one coordinator per [`DataSourceKey`].
pub struct CoordinatorRegistry<F: Fetcher> {
    settings: CoordinatorSettings,
    coordinators: HashMap<DataSourceKey, Coordinator<F>>,
}

impl<F: Fetcher> CoordinatorRegistry<F> {
    pub fn new(settings: CoordinatorSettings) -> Self {
        CoordinatorRegistry {
            settings,
            coordinators: HashMap::new(),
        }
    }

    /// Returns the coordinator for `key`, creating it with a fresh fetcher if there is none.
    /// `make_fetcher` is only called on creation.
    pub fn get_or_create(&mut self, key: DataSourceKey, make_fetcher: impl FnOnce(&DataSourceKey) -> F) -> Coordinator<F> {
        let settings = self.settings;
        self.coordinators
            .entry(key)
            .or_insert_with_key(|key| {
                log_event!(debug, key = %key, "creating coordinator");
                Coordinator::new(key.clone(), make_fetcher(key), settings)
            })
            .clone()
    }

    pub fn get(&self, key: &DataSourceKey) -> Option<&Coordinator<F>> {
        self.coordinators.get(key)
    }

    /// Removes and stops the coordinator for `key`.
    pub fn remove(&mut self, key: &DataSourceKey) -> Option<Coordinator<F>> {
        let coordinator = self.coordinators.remove(key)?;
        coordinator.stop();
        Some(coordinator)
    }

    pub fn coordinators(&self) -> impl Iterator<Item = &Coordinator<F>> {
        self.coordinators.values()
    }

    pub fn len(&self) -> usize {
        self.coordinators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coordinators.is_empty()
    }

    pub fn start_all(&self) {
        for coordinator in self.coordinators.values() {
            coordinator.start();
        }
    }

    pub fn stop_all(&self) {
        for coordinator in self.coordinators.values() {
            coordinator.stop();
        }
    }
}
