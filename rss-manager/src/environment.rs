//! Environments and the environment registry.
//!
//! An `Environment` owns its RSS instance records, a derived index of
//! connection handles and the adaptor that drives its backend. Instance
//! mutations are two-phase: a name is reserved under the environment's
//! lock, the adaptor is called without any lock held, and the outcome is
//! committed (or the reservation released) under the lock again.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use common::errors::{AppError, AppResult};
use common::models::{EngineType, RssInstance};

use crate::adaptor::RssAdaptor;

/// Connection handle derived from an instance record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceHandle {
    pub instance_name: String,
    pub engine: EngineType,
    pub host: String,
    pub port: u16,
    pub url: String,
}

impl InstanceHandle {
    pub fn database_url(&self, database: &str) -> String {
        self.engine.connection_url(&self.host, self.port, Some(database))
    }
}

impl From<&RssInstance> for InstanceHandle {
    fn from(instance: &RssInstance) -> Self {
        Self {
            instance_name: instance.name.clone(),
            engine: instance.engine,
            host: instance.host.clone(),
            port: instance.port,
            url: instance.connection_url(),
        }
    }
}

#[derive(Default)]
struct EnvironmentState {
    instances: HashMap<String, RssInstance>,
    handles: HashMap<String, InstanceHandle>,
    /// Names with a backend call in flight.
    pending: HashSet<String>,
}

impl EnvironmentState {
    fn insert(&mut self, instance: RssInstance) {
        self.handles
            .insert(instance.name.clone(), InstanceHandle::from(&instance));
        self.instances.insert(instance.name.clone(), instance);
    }

    fn remove(&mut self, name: &str) -> Option<RssInstance> {
        self.handles.remove(name);
        self.instances.remove(name)
    }
}

/// A named deployment context with its instances and adaptor.
pub struct Environment {
    name: String,
    adaptor: Arc<dyn RssAdaptor>,
    state: RwLock<EnvironmentState>,
}

impl Environment {
    /// Creates an environment seeded with configuration-defined instances.
    pub fn new(
        name: impl Into<String>,
        adaptor: Arc<dyn RssAdaptor>,
        static_instances: Vec<RssInstance>,
    ) -> AppResult<Self> {
        let name = name.into();
        let mut state = EnvironmentState::default();
        for mut instance in static_instances {
            if state.instances.contains_key(&instance.name) {
                return Err(AppError::IllegalConfiguration(format!(
                    "RSS instance '{}' is defined twice in environment '{}'",
                    instance.name, name
                )));
            }
            instance.environment_name = name.clone();
            instance.config_defined = true;
            state.insert(instance);
        }
        Ok(Self {
            name,
            adaptor,
            state: RwLock::new(state),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn adaptor(&self) -> Arc<dyn RssAdaptor> {
        self.adaptor.clone()
    }

    pub fn instance(&self, name: &str) -> AppResult<RssInstance> {
        self.read()
            .instances
            .get(name)
            .cloned()
            .ok_or_else(|| AppError::not_found("RSS instance", self.qualified(name)))
    }

    /// All instances, ordered by name.
    pub fn all_instances(&self) -> Vec<RssInstance> {
        let mut instances: Vec<_> = self.read().instances.values().cloned().collect();
        instances.sort_by(|a, b| a.name.cmp(&b.name));
        instances
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().instances.contains_key(name)
    }

    /// Connection handle derived from the instance record.
    pub fn handle(&self, name: &str) -> Option<InstanceHandle> {
        self.read().handles.get(name).cloned()
    }

    /// Fails if the instance is absent or defined in the configuration.
    pub fn ensure_mutable(&self, name: &str) -> AppResult<()> {
        let state = self.read();
        let instance = state
            .instances
            .get(name)
            .ok_or_else(|| AppError::not_found("RSS instance", self.qualified(name)))?;
        self.check_mutable(instance)
    }

    /// Reserves a name that must not exist yet.
    pub fn reserve_new(self: &Arc<Self>, name: &str) -> AppResult<Reservation> {
        let mut state = self.write();
        if state.instances.contains_key(name) {
            return Err(AppError::duplicate("RSS instance", self.qualified(name)));
        }
        self.mark_pending(&mut state, name)?;
        Ok(Reservation::new(self.clone(), name))
    }

    /// Reserves an existing, runtime-defined instance for update or removal.
    pub fn reserve_existing(self: &Arc<Self>, name: &str) -> AppResult<Reservation> {
        let mut state = self.write();
        let instance = state
            .instances
            .get(name)
            .ok_or_else(|| AppError::not_found("RSS instance", self.qualified(name)))?;
        self.check_mutable(instance)?;
        self.mark_pending(&mut state, name)?;
        Ok(Reservation::new(self.clone(), name))
    }

    fn check_mutable(&self, instance: &RssInstance) -> AppResult<()> {
        if instance.config_defined {
            return Err(AppError::ConfigImmutable {
                environment: self.name.clone(),
                instance: instance.name.clone(),
            });
        }
        Ok(())
    }

    fn mark_pending(&self, state: &mut EnvironmentState, name: &str) -> AppResult<()> {
        if !state.pending.insert(name.to_string()) {
            return Err(AppError::Conflict {
                kind: "RSS instance",
                id: self.qualified(name),
            });
        }
        Ok(())
    }

    fn qualified(&self, name: &str) -> String {
        format!("{}/{}", self.name, name)
    }

    fn read(&self) -> RwLockReadGuard<'_, EnvironmentState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, EnvironmentState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A pending-name claim on an environment.
///
/// Dropping it without committing releases the name and leaves the
/// instance set untouched.
pub struct Reservation {
    environment: Arc<Environment>,
    name: String,
    active: bool,
}

impl Reservation {
    fn new(environment: Arc<Environment>, name: &str) -> Self {
        Self {
            environment,
            name: name.to_string(),
            active: true,
        }
    }

    /// Inserts `instance` under the reserved name.
    pub fn commit_insert(mut self, mut instance: RssInstance) {
        instance.environment_name = self.environment.name.clone();
        let mut state = self.environment.write();
        state.pending.remove(&self.name);
        state.insert(instance);
        self.active = false;
    }

    /// Replaces the reserved record with `instance` in one step.
    pub fn commit_replace(mut self, mut instance: RssInstance) {
        instance.environment_name = self.environment.name.clone();
        let mut state = self.environment.write();
        state.pending.remove(&self.name);
        state.remove(&self.name);
        state.insert(instance);
        self.active = false;
    }

    /// Removes the reserved record.
    pub fn commit_remove(mut self) -> Option<RssInstance> {
        let mut state = self.environment.write();
        state.pending.remove(&self.name);
        self.active = false;
        state.remove(&self.name)
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if self.active {
            self.environment.write().pending.remove(&self.name);
        }
    }
}

/// The set of environments known to the process.
///
/// Environments are fixed at startup; only their instance sets change.
pub struct EnvironmentRegistry {
    environments: HashMap<String, Arc<Environment>>,
}

impl EnvironmentRegistry {
    pub fn new(environments: Vec<Environment>) -> AppResult<Self> {
        let mut map = HashMap::new();
        for environment in environments {
            let name = environment.name.clone();
            if map.insert(name.clone(), Arc::new(environment)).is_some() {
                return Err(AppError::IllegalConfiguration(format!(
                    "environment '{}' is defined twice",
                    name
                )));
            }
        }
        Ok(Self { environments: map })
    }

    pub fn resolve(&self, name: &str) -> AppResult<Arc<Environment>> {
        self.environments
            .get(name)
            .cloned()
            .ok_or_else(|| AppError::not_found("environment", name))
    }

    pub fn names(&self) -> BTreeSet<String> {
        self.environments.keys().cloned().collect()
    }

    /// Instances of every environment, ordered by environment then name.
    pub fn all_instances(&self) -> Vec<RssInstance> {
        let mut instances: Vec<_> = self
            .environments
            .values()
            .flat_map(|env| env.all_instances())
            .collect();
        instances.sort_by(|a, b| {
            (a.environment_name.as_str(), a.name.as_str()).cmp(&(b.environment_name.as_str(), b.name.as_str()))
        });
        instances
    }
}
