// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::sync::Arc;

use url::Url;

use crate::core::binding::{loader_for, ArtifactLoader, ArtifactName};
use crate::core::config::HostConfig;
use crate::core::delegates::{
    CodeGenerator, ModelIdentity, NoInterpreter, NoopInvalidator, ScheduleInvalidator,
    SubgraphExecutor,
};
use crate::core::graph::SubgraphDescription;
use crate::core::host::{HostParts, LazyCompositeHost, RecompileFlags};
use crate::core::pubsub::PubSubScope;
use crate::core::{FlowError, Result};

/// Builder for [`LazyCompositeHost`].
///
/// ```ignore
/// let host = HostBuilder::new(".model.filter", description)
///     .config(HostConfig::default().with_code_directory(dir))
///     .generator(Arc::new(MyGenerator))
///     .identity(Arc::new(FileModelIdentity::new("model.json")))
///     .build()?;
/// ```
pub struct HostBuilder {
    name: String,
    description: SubgraphDescription,
    config: HostConfig,
    generator: Option<Arc<dyn CodeGenerator>>,
    loader: Option<Arc<dyn ArtifactLoader>>,
    executor: Option<Box<dyn SubgraphExecutor>>,
    identity: Option<Arc<dyn ModelIdentity>>,
    model_uri: Option<Url>,
    invalidator: Option<Arc<dyn ScheduleInvalidator>>,
    parent_flags: Option<Arc<RecompileFlags>>,
    enclosing_scope: Option<Arc<PubSubScope>>,
    recompile_this_level: bool,
    recompile_hierarchy: bool,
}

impl HostBuilder {
    /// `name` is the host's full hierarchical name; artifacts are named
    /// after it.
    pub fn new(name: impl Into<String>, description: SubgraphDescription) -> Self {
        Self {
            name: name.into(),
            description,
            config: HostConfig::default(),
            generator: None,
            loader: None,
            executor: None,
            identity: None,
            model_uri: None,
            invalidator: None,
            parent_flags: None,
            enclosing_scope: None,
            recompile_this_level: false,
            recompile_hierarchy: false,
        }
    }

    pub fn config(mut self, config: HostConfig) -> Self {
        self.config = config;
        self
    }

    pub fn generator(mut self, generator: Arc<dyn CodeGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Defaults to the loader of the configured generator package.
    pub fn loader(mut self, loader: Arc<dyn ArtifactLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Interpreted semantics; defaults to [`NoInterpreter`].
    pub fn executor(mut self, executor: impl SubgraphExecutor + 'static) -> Self {
        self.executor = Some(Box::new(executor));
        self
    }

    pub fn identity(mut self, identity: Arc<dyn ModelIdentity>) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Model location used when there is no identity.
    pub fn model_uri(mut self, uri: Url) -> Self {
        self.model_uri = Some(uri);
        self
    }

    pub fn invalidator(mut self, invalidator: Arc<dyn ScheduleInvalidator>) -> Self {
        self.invalidator = Some(invalidator);
        self
    }

    /// Nest inside `parent`: recompile flags join its tree and pub/sub
    /// channels resolve through its scope.
    pub fn parent(mut self, parent: &LazyCompositeHost) -> Self {
        self.parent_flags = Some(Arc::clone(parent.flags()));
        self.enclosing_scope = Some(Arc::clone(parent.scope()));
        self
    }

    pub fn enclosing_scope(mut self, scope: Arc<PubSubScope>) -> Self {
        self.enclosing_scope = Some(scope);
        self
    }

    /// Initial recompile flags, as persisted with the model.
    pub fn recompile_flags(mut self, this_level: bool, hierarchy: bool) -> Self {
        self.recompile_this_level = this_level;
        self.recompile_hierarchy = hierarchy;
        self
    }

    pub fn build(self) -> Result<LazyCompositeHost> {
        let artifact = ArtifactName::new(&self.name, 0, self.config.generator_package)?;
        let generator = self.generator.ok_or_else(|| {
            FlowError::Configuration(format!("host '{}' has no code generator", self.name))
        })?;
        let loader = self
            .loader
            .unwrap_or_else(|| loader_for(self.config.generator_package));
        if loader.package() != self.config.generator_package {
            return Err(FlowError::Configuration(format!(
                "host '{}' is configured for {} but its loader binds {}",
                self.name,
                self.config.generator_package,
                loader.package()
            )));
        }

        let flags = match &self.parent_flags {
            Some(parent) => RecompileFlags::child_of(
                parent,
                self.recompile_this_level,
                self.recompile_hierarchy,
            ),
            None => RecompileFlags::root(self.recompile_this_level, self.recompile_hierarchy),
        };

        Ok(LazyCompositeHost::assemble(HostParts {
            name: self.name,
            artifact,
            description: self.description,
            config: self.config,
            generator,
            loader,
            executor: self.executor.unwrap_or_else(|| Box::new(NoInterpreter)),
            identity: self.identity,
            model_uri: self.model_uri,
            invalidator: self
                .invalidator
                .unwrap_or_else(|| Arc::new(NoopInvalidator)),
            flags,
            enclosing_scope: self.enclosing_scope,
        }))
    }
}
