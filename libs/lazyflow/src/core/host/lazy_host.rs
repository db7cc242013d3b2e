// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::path::{Path, PathBuf};
use std::sync::Arc;

use url::Url;

use crate::core::binding::{bind, ArtifactLoader, ArtifactName, UnitSlot};
use crate::core::config::HostConfig;
use crate::core::delegates::{
    CodeGenerator, GenerationRequest, ModelIdentity, PortIo, ScheduleInvalidator,
    SubgraphExecutor,
};
use crate::core::error::BindError;
use crate::core::graph::{
    BoundaryPort, EntityDescription, LinkDescription, PortType, PubSubRole, Subgraph,
    SubgraphDescription,
};
use crate::core::host::{HostState, RecompileFlags, RecompileTracker};
use crate::core::marshal::{output_shapes, read_inputs, write_outputs};
use crate::core::profile::{convert_profile_port, Profile};
use crate::core::pubsub::{ChannelState, PubSubScope};
use crate::core::staleness::{StalenessInputs, StalenessOracle};
use crate::core::{FlowError, Result};

/// Everything [`HostBuilder`](crate::core::HostBuilder) resolved.
pub(crate) struct HostParts {
    pub name: String,
    pub artifact: ArtifactName,
    pub description: SubgraphDescription,
    pub config: HostConfig,
    pub generator: Arc<dyn CodeGenerator>,
    pub loader: Arc<dyn ArtifactLoader>,
    pub executor: Box<dyn SubgraphExecutor>,
    pub identity: Option<Arc<dyn ModelIdentity>>,
    pub model_uri: Option<Url>,
    pub invalidator: Arc<dyn ScheduleInvalidator>,
    pub flags: Arc<RecompileFlags>,
    pub enclosing_scope: Option<Arc<PubSubScope>>,
}

/// A pub/sub registration made with the enclosing scope for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RunLink {
    channel: String,
    port: String,
    role: PubSubRole,
}

/// Container for a modular composite that defers materializing its
/// subgraph and, when it can, runs a separately compiled unit in its place.
///
/// Driven by the director in the usual order: `preinitialize`, `initialize`,
/// `fire` any number of times, `wrapup`. A failed generate or bind never
/// aborts the run; the host drops back to interpreted execution.
pub struct LazyCompositeHost {
    name: String,
    /// Artifact name without disambiguation.
    artifact: ArtifactName,
    description: SubgraphDescription,
    ports: Vec<BoundaryPort>,
    subgraph: Option<Subgraph>,
    state: HostState,
    config: HostConfig,

    generator: Arc<dyn CodeGenerator>,
    loader: Arc<dyn ArtifactLoader>,
    executor: Box<dyn SubgraphExecutor>,
    executor_ready: bool,
    identity: Option<Arc<dyn ModelIdentity>>,
    model_uri: Option<Url>,

    oracle: StalenessOracle,
    flags: Arc<RecompileFlags>,
    tracker: Arc<RecompileTracker>,
    scope: Arc<PubSubScope>,
    enclosing_scope: Option<Arc<PubSubScope>>,
    run_links: Vec<RunLink>,

    unit: UnitSlot,
    generated_version: u64,
    artifact_directory: PathBuf,
    last_failure: Option<String>,
}

impl LazyCompositeHost {
    pub(crate) fn assemble(parts: HostParts) -> Self {
        let tracker = Arc::new(RecompileTracker::new(
            Arc::clone(&parts.flags),
            Default::default(),
        ));
        let scope = Arc::new(PubSubScope::new(
            parts.name.clone(),
            parts.enclosing_scope.clone(),
            tracker.pubsub_guard().clone(),
            parts.invalidator,
        ));
        scope.add_listener(tracker.clone());

        let mut host = Self {
            ports: parts.description.ports.clone(),
            artifact_directory: parts.config.code_directory.clone(),
            name: parts.name,
            artifact: parts.artifact,
            description: parts.description,
            subgraph: None,
            state: HostState::Dormant,
            config: parts.config,
            generator: parts.generator,
            loader: parts.loader,
            executor: parts.executor,
            executor_ready: false,
            identity: parts.identity,
            model_uri: parts.model_uri,
            oracle: StalenessOracle::new(),
            flags: parts.flags,
            tracker,
            scope,
            enclosing_scope: parts.enclosing_scope,
            run_links: Vec::new(),
            unit: UnitSlot::new(),
            generated_version: 0,
            last_failure: None,
        };
        host.refresh_inside_widths();
        host
    }

    // ---- accessors ----

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> HostState {
        self.state
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    pub fn description(&self) -> &SubgraphDescription {
        &self.description
    }

    /// Boundary ports in marshaling order, including hidden pub/sub ports
    /// replayed from a profile.
    pub fn ports(&self) -> &[BoundaryPort] {
        &self.ports
    }

    pub fn port(&self, name: &str) -> Option<&BoundaryPort> {
        self.ports.iter().find(|p| p.name == name)
    }

    pub fn subgraph(&self) -> Option<&Subgraph> {
        self.subgraph.as_ref()
    }

    pub fn is_populated(&self) -> bool {
        self.subgraph.is_some()
    }

    pub fn flags(&self) -> &Arc<RecompileFlags> {
        &self.flags
    }

    pub fn tracker(&self) -> &Arc<RecompileTracker> {
        &self.tracker
    }

    /// Scope contained hosts and entities publish into.
    pub fn scope(&self) -> &Arc<PubSubScope> {
        &self.scope
    }

    pub fn generated_version(&self) -> u64 {
        self.generated_version
    }

    pub fn loaded_version(&self) -> Option<u64> {
        self.unit.current().map(|u| u.loaded_version())
    }

    /// Why the compiled path was abandoned in the current run, if it was.
    pub fn last_failure(&self) -> Option<&str> {
        self.last_failure.as_deref()
    }

    pub fn artifact_name(&self) -> ArtifactName {
        self.artifact.disambiguated(self.oracle.disambiguation())
    }

    /// Directory the current artifact is looked up in.
    pub fn artifact_directory(&self) -> &Path {
        &self.artifact_directory
    }

    pub fn artifact_path(&self) -> PathBuf {
        self.artifact_name().path_in(&self.artifact_directory)
    }

    /// Ask for this host and every contained host to be recompiled.
    pub fn set_recompile_hierarchy(&self) {
        self.flags.set_hierarchy(true);
        self.tracker.set_profile(None);
    }

    // ---- structure ----

    /// Materialize the subgraph from the deferred description.
    pub fn populate(&mut self) -> Result<()> {
        if self.subgraph.is_some() {
            return Ok(());
        }
        let _populating = self.tracker.populating();
        let mut subgraph = Subgraph::new(self.name.clone());
        subgraph.add_listener(self.tracker.clone());
        subgraph.populate(&self.description)?;
        tracing::info!(
            "[host] '{}' populated ({} entities, {} relations)",
            self.name,
            subgraph.entity_count(),
            subgraph.relation_count()
        );
        self.subgraph = Some(subgraph);
        if matches!(self.state, HostState::Dormant | HostState::Profiled) {
            self.state = HostState::Populated;
        }
        Ok(())
    }

    pub fn add_entity(&mut self, name: &str, class: &str, ports: &[&str]) -> Result<()> {
        let port_names: Vec<String> = ports.iter().map(|p| p.to_string()).collect();
        self.materialized()?
            .add_entity(name, class, port_names.clone())?;
        self.description.entities.push(EntityDescription {
            name: name.to_string(),
            class: class.to_string(),
            ports: port_names,
        });
        self.structure_changed();
        Ok(())
    }

    pub fn remove_entity(&mut self, name: &str) -> Result<()> {
        self.materialized()?.remove_entity(name)?;
        self.description.entities.retain(|e| e.name != name);
        self.description
            .links
            .retain(|l| l.entity.as_deref() != Some(name));
        self.structure_changed();
        Ok(())
    }

    pub fn add_relation(&mut self, name: &str) -> Result<()> {
        self.materialized()?.add_relation(name)?;
        self.description.relations.push(name.to_string());
        self.structure_changed();
        Ok(())
    }

    pub fn new_relation(&mut self) -> Result<String> {
        let name = self.materialized()?.new_relation()?;
        self.description.relations.push(name.clone());
        self.structure_changed();
        Ok(name)
    }

    pub fn remove_relation(&mut self, name: &str) -> Result<()> {
        self.materialized()?.remove_relation(name)?;
        self.description.relations.retain(|r| r != name);
        self.description.links.retain(|l| l.relation != name);
        self.structure_changed();
        Ok(())
    }

    pub fn link(&mut self, relation: &str, entity: Option<&str>, port: &str) -> Result<()> {
        self.materialized()?.link(relation, entity, port)?;
        self.description.links.push(LinkDescription {
            relation: relation.to_string(),
            entity: entity.map(str::to_string),
            port: port.to_string(),
        });
        self.structure_changed();
        Ok(())
    }

    pub fn unlink(&mut self, relation: &str, entity: Option<&str>, port: &str) -> Result<()> {
        self.materialized()?.unlink(relation, entity, port)?;
        if let Some(index) = self.description.links.iter().position(|l| {
            l.relation == relation && l.entity.as_deref() == entity && l.port == port
        }) {
            self.description.links.remove(index);
        }
        self.structure_changed();
        Ok(())
    }

    fn materialized(&mut self) -> Result<&mut Subgraph> {
        self.populate()?;
        self.subgraph
            .as_mut()
            .ok_or_else(|| FlowError::Graph(format!("'{}' has no subgraph", self.name)))
    }

    fn structure_changed(&mut self) {
        self.refresh_inside_widths();
        if self.state == HostState::Profiled {
            self.state = HostState::Populated;
        }
    }

    fn refresh_inside_widths(&mut self) {
        for port in self.ports.iter_mut().filter(|p| !p.hidden) {
            port.inside_width = self
                .description
                .links
                .iter()
                .filter(|l| l.entity.is_none() && l.port == port.name)
                .count();
        }
    }

    // ---- profile ----

    /// Cached profile, or the persisted one when the model is unchanged.
    ///
    /// Profiles always live in the code directory and record where the
    /// artifact went when the generator put it elsewhere. A missing,
    /// unreadable or foreign profile file yields `None` and, with
    /// `use_profile`, marks this level for recompilation.
    pub fn profile(&mut self) -> Option<Arc<Profile>> {
        if let Some(profile) = self.tracker.cached_profile() {
            return Some(profile);
        }
        if self.flags.model_changed() {
            return None;
        }

        match self.load_profile() {
            Ok(profile) => {
                self.adopt_artifact_directory(&profile);
                let profile = Arc::new(profile);
                self.tracker.set_profile(Some(Arc::clone(&profile)));
                Some(profile)
            }
            Err(reason) => {
                tracing::debug!("[host] '{}' has no usable profile: {}", self.name, reason);
                if self.config.use_profile {
                    self.tracker.mark_changed();
                }
                None
            }
        }
    }

    fn load_profile(&self) -> std::result::Result<Profile, String> {
        let path = self
            .artifact_name()
            .profile_path_in(&self.config.code_directory);
        match Profile::load(&path) {
            Ok(profile) if profile.matches(&self.description) => Ok(profile),
            Ok(_) => Err(format!(
                "{} was generated from another description",
                path.display()
            )),
            Err(e) => Err(e.to_string()),
        }
    }

    fn adopt_artifact_directory(&mut self, profile: &Profile) {
        self.artifact_directory = profile
            .artifact_directory()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.config.code_directory.clone());
    }

    /// Declared ports plus a hidden port for every channel the inner scope
    /// serves, named after the stub it forwards outward through. This is the
    /// boundary a generated unit marshals and a profile replays.
    fn generation_boundary(&self) -> Vec<BoundaryPort> {
        let mut ports: Vec<BoundaryPort> =
            self.ports.iter().filter(|p| !p.hidden).cloned().collect();
        for (channel, state) in self.scope.channels() {
            let Some(stub) = self.scope.stub_port(&channel) else {
                continue;
            };
            let port = match state {
                ChannelState::Published { .. } => {
                    BoundaryPort::output(stub, PortType::Unknown).publisher(&channel)
                }
                ChannelState::AwaitingPublisher { .. } => {
                    BoundaryPort::input(stub, PortType::Unknown).subscriber(&channel)
                }
                ChannelState::Unregistered => continue,
            };
            ports.push(convert_profile_port(&port.with_inside_width(1)).to_boundary_port());
        }
        ports
    }

    // ---- lifecycle ----

    pub fn preinitialize(&mut self) -> Result<()> {
        self.last_failure = None;
        let profile = if self.config.execute_compiled && self.config.use_profile {
            self.profile()
        } else {
            None
        };

        match profile {
            Some(profile) if !self.flags.model_changed() => {
                tracing::debug!("[host] '{}' preinitializing from profile", self.name);
                self.replay_profile(&profile);
                self.state = HostState::Profiled;
            }
            _ => {
                self.populate()?;
                self.preinitialize_executor()?;
                self.state = HostState::Populated;
            }
        }
        self.connect_pub_sub()
    }

    /// Make sure the compiled unit is current and bound, or degrade to
    /// interpreted execution for this run.
    pub fn initialize(&mut self) -> Result<()> {
        if self.config.execute_compiled {
            let outcome = {
                let _generating = self.tracker.generating();
                self.compile_and_bind()
            };
            match outcome {
                Ok(()) => {
                    self.flags.clear();
                    self.last_failure = None;
                    self.state = HostState::Bound;
                    return Ok(());
                }
                Err(e) => {
                    tracing::error!("[host] '{}' compiled path failed: {}", self.name, e);
                    tracing::warn!(
                        "[host] '{}' running interpreted for this run",
                        self.name
                    );
                    self.last_failure = Some(e.to_string());
                }
            }
        }

        self.populate()?;
        self.preinitialize_executor()?;
        if let Some(subgraph) = &self.subgraph {
            self.executor.initialize(subgraph)?;
        }
        self.state = HostState::Populated;
        Ok(())
    }

    pub fn fire(&mut self, io: &mut dyn PortIo) -> Result<()> {
        if self.state.is_compiled() {
            self.state = HostState::Running;
            let inputs = read_inputs(&self.ports, io)?;
            let shapes = output_shapes(&self.ports);
            let unit = self.unit.current_mut().ok_or_else(|| {
                FlowError::UnitInvocation {
                    unit: self.name.clone(),
                    entry_point: "fire".into(),
                    reason: "no unit bound".into(),
                }
            })?;
            let outputs = unit.fire(&inputs, &shapes)?;
            let sent = write_outputs(&self.ports, outputs, io)?;
            tracing::debug!("[host] '{}' fired compiled, {} token(s) out", self.name, sent);
            return Ok(());
        }

        self.populate()?;
        match &self.subgraph {
            Some(subgraph) => self.executor.fire(subgraph, &self.ports, io),
            None => Ok(()),
        }
    }

    pub fn wrapup(&mut self) -> Result<()> {
        let result = if self.state.is_compiled() {
            match self.unit.current_mut() {
                Some(unit) => unit.wrapup(),
                None => Ok(()),
            }
        } else {
            match &self.subgraph {
                Some(subgraph) if self.executor_ready => self.executor.wrapup(subgraph),
                _ => Ok(()),
            }
        };
        self.executor_ready = false;
        self.disconnect_pub_sub();
        self.state = HostState::Wrapped;
        result
    }

    // ---- internals ----

    fn preinitialize_executor(&mut self) -> Result<()> {
        if self.executor_ready {
            return Ok(());
        }
        if let Some(subgraph) = &self.subgraph {
            self.executor.preinitialize(subgraph)?;
            self.executor_ready = true;
        }
        Ok(())
    }

    /// Copy recorded rates, types and widths onto the boundary and add
    /// hidden ports for pub/sub entries that do not exist yet.
    fn replay_profile(&mut self, profile: &Profile) {
        let _active = self.tracker.pubsub_guard().enter();
        for recorded in profile.ports() {
            match self.ports.iter_mut().find(|p| p.name == recorded.name) {
                Some(port) => {
                    port.rate = recorded.rate;
                    port.port_type = recorded.port_type.clone();
                    port.width = recorded.width;
                    port.inside_width = recorded.inside_width;
                    if port.pub_sub.is_none() {
                        port.pub_sub = recorded.pub_sub.clone();
                    }
                }
                None if recorded.pub_sub.is_some() => {
                    tracing::debug!(
                        "[host] '{}' adding hidden port '{}' from profile",
                        self.name,
                        recorded.name
                    );
                    self.ports.push(recorded.to_boundary_port());
                }
                None => {}
            }
        }
    }

    /// Register publisher ports and link subscriber ports with the enclosing
    /// scope for this run.
    ///
    /// Hidden ports stand in for inner registrations; they are skipped while
    /// the inner scope forwards the channel itself.
    fn connect_pub_sub(&mut self) -> Result<()> {
        let Some(scope) = self.enclosing_scope.clone() else {
            return Ok(());
        };
        let _active = self.tracker.pubsub_guard().enter();
        let wanted: Vec<RunLink> = self
            .ports
            .iter()
            .filter_map(|port| {
                let binding = port.pub_sub.as_ref()?;
                if port.hidden && self.scope.lookup(&binding.channel) != ChannelState::Unregistered
                {
                    return None;
                }
                Some(RunLink {
                    channel: binding.channel.clone(),
                    port: format!("{}.{}", self.name, port.name),
                    role: binding.role,
                })
            })
            .collect();

        for link in wanted {
            if self.run_links.contains(&link) {
                continue;
            }
            match link.role {
                PubSubRole::Publisher => scope.register_publisher(&link.channel, &link.port)?,
                PubSubRole::Subscriber => scope.link_to_subscriber(&link.channel, &link.port)?,
            }
            self.run_links.push(link);
        }
        Ok(())
    }

    fn disconnect_pub_sub(&mut self) {
        let Some(scope) = self.enclosing_scope.clone() else {
            self.run_links.clear();
            return;
        };
        let _active = self.tracker.pubsub_guard().enter();
        for link in self.run_links.drain(..).rev() {
            let outcome = match link.role {
                PubSubRole::Publisher => scope.unregister_publisher(&link.channel, &link.port),
                PubSubRole::Subscriber => scope.unlink_subscriber(&link.channel, &link.port),
            };
            if let Err(e) = outcome {
                tracing::warn!(
                    "[pubsub] '{}' releasing channel '{}': {}",
                    self.name,
                    link.channel,
                    e
                );
            }
        }
    }

    fn compile_and_bind(&mut self) -> Result<()> {
        std::fs::create_dir_all(&self.config.code_directory)?;
        match self.tracker.cached_profile() {
            Some(profile) => self.adopt_artifact_directory(&profile),
            None => {
                if let Ok(profile) = self.load_profile() {
                    self.adopt_artifact_directory(&profile);
                }
            }
        }

        let current = self.artifact_path();
        let verdict = self.oracle.evaluate(&StalenessInputs {
            identity: self.identity.as_deref(),
            model_uri: self.model_uri.as_ref(),
            artifact: &current,
        });
        // The verdict may have moved the disambiguation counter.
        let artifact = self.artifact_name();

        if self.flags.model_changed() || verdict.needs_rebuild() {
            let reason = verdict
                .reason
                .map(|r| r.to_string())
                .unwrap_or_else(|| "recompile requested".to_string());
            tracing::info!("[host] '{}' regenerating: {}", self.name, reason);
            self.generate(&artifact)?;
        }

        match self.bind_current(&artifact) {
            Err(FlowError::Bind(BindError::ArtifactNotFound { path, .. })) => {
                tracing::warn!(
                    "[host] '{}' artifact {} is gone, regenerating",
                    self.name,
                    path.display()
                );
                self.generate(&artifact)?;
                self.bind_current(&artifact)?;
            }
            other => other?,
        }

        match self.unit.current_mut() {
            Some(unit) => unit.initialize(),
            None => Err(FlowError::UnitInvocation {
                unit: self.name.clone(),
                entry_point: "initialize".into(),
                reason: "no unit bound".into(),
            }),
        }
    }

    fn generate(&mut self, artifact: &ArtifactName) -> Result<()> {
        let code_directory = self.config.code_directory.clone();
        let overwrite =
            self.config.overwrite_files || !artifact.path_in(&code_directory).exists();
        let generation = self.generated_version + 1;
        let boundary = self.generation_boundary();
        let request = GenerationRequest {
            full_name: &self.name,
            artifact,
            code_directory: &code_directory,
            description: &self.description,
            ports: &boundary,
            overwrite,
            generation,
        };
        let output_directory = self.generator.generate(&request)?;
        self.generated_version = generation;
        self.ports = boundary;

        let mut profile = Profile::capture(&self.name, &self.description, &self.ports)?;
        if output_directory != code_directory {
            tracing::debug!(
                "[host] '{}' artifact placed in {}",
                self.name,
                output_directory.display()
            );
            profile = profile.with_artifact_directory(&output_directory);
        }
        self.artifact_directory = output_directory;
        let profile_path = artifact.profile_path_in(&code_directory);
        if let Err(e) = profile.save(&profile_path) {
            tracing::warn!(
                "[host] '{}' could not persist profile {}: {}",
                self.name,
                profile_path.display(),
                e
            );
        }
        self.tracker.set_profile(Some(Arc::new(profile)));
        tracing::info!(
            "[host] '{}' generated {} (generation {})",
            self.name,
            artifact,
            generation
        );
        Ok(())
    }

    /// Bind unless the unit already loaded is the current generation.
    fn bind_current(&mut self, artifact: &ArtifactName) -> Result<()> {
        let directory = self.artifact_directory.clone();
        if let Some(unit) = self.unit.current() {
            if unit.loaded_version() == self.generated_version
                && unit.artifact_path() == artifact.path_in(&directory)
            {
                tracing::debug!(
                    "[host] '{}' reusing bound generation {}",
                    self.name,
                    self.generated_version
                );
                return Ok(());
            }
        }

        let loader = Arc::clone(&self.loader);
        let name = self.name.clone();
        let generation = self.generated_version;
        self.unit
            .rebind(|| bind(loader.as_ref(), &name, artifact, &directory, generation))?;
        Ok(())
    }
}

impl std::fmt::Debug for LazyCompositeHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyCompositeHost")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("generated_version", &self.generated_version)
            .field("loaded_version", &self.loaded_version())
            .field("populated", &self.is_populated())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::core::binding::{ManagedLoader, UnitInstance, UnitManifest, UnitRegistry};
    use crate::core::delegates::FileModelIdentity;
    use crate::core::error::GenerationError;
    use crate::core::marshal::{ChannelRows, OutputShape, PortBuffer, PortOutput, Token, TokenQueues};
    use crate::core::HostBuilder;

    struct ManifestGenerator {
        unit: &'static str,
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    impl CodeGenerator for ManifestGenerator {
        fn generate(
            &self,
            request: &GenerationRequest<'_>,
        ) -> std::result::Result<PathBuf, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(GenerationError::new(
                    request.full_name,
                    anyhow::anyhow!("compiler exited with status 1"),
                ));
            }
            let path = request.artifact.path_in(request.code_directory);
            UnitManifest::new(self.unit)
                .write(&path)
                .map_err(|e| GenerationError::new(request.full_name, e))?;
            Ok(request.code_directory.to_path_buf())
        }
    }

    struct Doubler;

    impl UnitInstance for Doubler {
        fn initialize(&mut self) -> Result<()> {
            Ok(())
        }

        fn fire(
            &mut self,
            inputs: &[PortBuffer],
            shapes: &[OutputShape],
        ) -> Result<Vec<PortOutput>> {
            let ChannelRows::Int(rows) = &inputs[0].rows else {
                panic!("expected int rows");
            };
            let doubled = rows
                .iter()
                .map(|row| row.iter().map(|v| v * 2).collect())
                .collect();
            Ok(vec![PortOutput::scalar(
                shapes[0].port.clone(),
                ChannelRows::Int(doubled),
            )])
        }

        fn wrapup(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn description() -> SubgraphDescription {
        SubgraphDescription::new("filter")
            .with_port(BoundaryPort::input("in", PortType::Int))
            .with_port(BoundaryPort::output("out", PortType::Int))
            .with_entity("gain", "Scale", &["input", "output"])
            .with_relation("r1")
            .with_relation("r2")
            .with_link(LinkDescription::boundary("r1", "in"))
            .with_link(LinkDescription::inner("r1", "gain", "input"))
            .with_link(LinkDescription::inner("r2", "gain", "output"))
            .with_link(LinkDescription::boundary("r2", "out"))
    }

    fn host(dir: &Path, fail: bool) -> (LazyCompositeHost, Arc<AtomicUsize>) {
        let model = dir.join("model.json");
        std::fs::write(&model, "{}").unwrap();

        let registry = UnitRegistry::new();
        registry.register_fn("doubler", || Box::new(Doubler)).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));

        let host = HostBuilder::new(".model.filter", description())
            .config(HostConfig::default().with_code_directory(dir.join("generated")))
            .generator(Arc::new(ManifestGenerator {
                unit: "doubler",
                calls: calls.clone(),
                fail,
            }))
            .loader(Arc::new(ManagedLoader::with_registry(Arc::new(registry))))
            .identity(Arc::new(FileModelIdentity::new(model)))
            .build()
            .unwrap();
        (host, calls)
    }

    #[test]
    fn test_compiled_fire_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let (mut host, calls) = host(dir.path(), false);

        host.preinitialize().unwrap();
        host.initialize().unwrap();
        assert_eq!(host.state(), HostState::Bound);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(host.loaded_version(), Some(1));

        let mut io = TokenQueues::new();
        io.push("in", 0, 21);
        host.fire(&mut io).unwrap();
        assert_eq!(io.sent("out", 0), &[Token::Int(42)]);
        assert_eq!(host.state(), HostState::Running);

        host.wrapup().unwrap();
        assert_eq!(host.state(), HostState::Wrapped);
    }

    #[test]
    fn test_second_run_reuses_unit() {
        let dir = tempfile::tempdir().unwrap();
        let (mut host, calls) = host(dir.path(), false);

        for _ in 0..2 {
            host.preinitialize().unwrap();
            host.initialize().unwrap();
            host.wrapup().unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(host.generated_version(), 1);
        assert!(!host.flags().model_changed());
    }

    #[test]
    fn test_generation_failure_degrades() {
        let dir = tempfile::tempdir().unwrap();
        let (mut host, _) = host(dir.path(), true);

        host.preinitialize().unwrap();
        host.initialize().unwrap();
        assert_eq!(host.state(), HostState::Populated);
        assert!(host.last_failure().is_some());
        assert!(host.loaded_version().is_none());
    }

    #[test]
    fn test_structure_edits_mark_recompile() {
        let dir = tempfile::tempdir().unwrap();
        let (mut host, _) = host(dir.path(), false);

        host.populate().unwrap();
        assert!(!host.flags().this_level());

        host.scope().register_publisher("topicA", "gain.output").unwrap();
        assert!(!host.flags().this_level());

        host.add_entity("offset", "Add", &["input", "output"]).unwrap();
        assert!(host.flags().this_level());
        assert_eq!(host.description().entities.len(), 2);
    }

    #[test]
    fn test_replay_restores_recorded_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let (mut host, _) = host(dir.path(), false);
        let recorded: Vec<BoundaryPort> = vec![
            BoundaryPort::input("in", PortType::Int)
                .with_rate(3)
                .with_width(4)
                .with_inside_width(2),
            BoundaryPort::output("out", PortType::Int),
            BoundaryPort::output("publisherStubPort1", PortType::Int)
                .with_inside_width(1)
                .publisher("topicA"),
        ];
        let profile = Profile::capture(host.name(), host.description(), &recorded).unwrap();

        host.replay_profile(&profile);

        let port = host.port("in").unwrap();
        assert_eq!((port.rate, port.width, port.inside_width), (3, 4, 2));
        let hidden = host.port("publisherStubPort1").unwrap();
        assert!(hidden.hidden);
        assert!(!host.is_populated());
    }

    #[test]
    fn test_inside_width_follows_links() {
        let dir = tempfile::tempdir().unwrap();
        let (mut host, _) = host(dir.path(), false);
        assert_eq!(host.port("out").unwrap().inside_width, 1);

        let extra = host.new_relation().unwrap();
        host.link(&extra, None, "out").unwrap();
        assert_eq!(host.port("out").unwrap().inside_width, 2);

        host.remove_relation(&extra).unwrap();
        assert_eq!(host.port("out").unwrap().inside_width, 1);
    }
}
