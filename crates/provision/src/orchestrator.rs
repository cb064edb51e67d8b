//! Provisioning engine - walks the stages and reconciles each item

use crate::context::{ProgressCallback, ResourceClient};
use crate::error::{ClientError, ErrorKind, ProvisionError};
use crate::manifest::Manifest;
use crate::policy::{self, PolicyContext};
use crate::registry::HandleRegistry;
use crate::report::{ErrorDetail, MembershipOutcome, ProvisioningOutcome, RunReport, StageReport};
use crate::types::{NaturalKey, ResourceHandle, ResourceKind, ResourceSpec, RunOptions, Stage};
use log::{debug, info, warn};
use std::thread;

/// An unrecoverable transport failure that stops the run
struct Fatal {
    error: ClientError,
    /// Set when the item in flight already exists remotely
    outcome: Option<ProvisioningOutcome>,
}

impl Fatal {
    const fn new(error: ClientError) -> Self {
        Self {
            error,
            outcome: None,
        }
    }
}

/// Outcome of one client call: the inner result is per-item, `Fatal` aborts
type Attempt<T> = Result<Result<T, ClientError>, Fatal>;

/// Mutable state owned by a single `run()` invocation
struct Run {
    registry: HandleRegistry,
    report: RunReport,
    users: Vec<ResourceSpec>,
    admin: Option<String>,
    group: Option<String>,
}

/// Drives a manifest through the Users, Groups, Spaces and Content stages
///
/// Stages run strictly in order and items within a stage in manifest
/// order. Every item yields exactly one [`ProvisioningOutcome`]; only a
/// [`ErrorKind::FatalTransport`] failure stops the run early.
pub struct Orchestrator<'a, C: ResourceClient + ?Sized> {
    client: &'a C,
    options: RunOptions,
}

impl<'a, C: ResourceClient + ?Sized> Orchestrator<'a, C> {
    pub fn new(client: &'a C, options: RunOptions) -> Self {
        Self { client, options }
    }

    /// Provision every manifest item and return the run report
    ///
    /// # Errors
    /// Returns [`ProvisionError::Aborted`] with the partial report when the
    /// client reports a fatal transport failure.
    pub fn run<P>(&self, manifest: &Manifest, progress: &mut P) -> Result<RunReport, ProvisionError>
    where
        P: ProgressCallback + ?Sized,
    {
        let mut run = Run {
            registry: HandleRegistry::new(),
            report: RunReport::new(),
            users: manifest.specs(Stage::Users),
            admin: manifest.admin().map(str::to_string),
            group: manifest.default_group().map(str::to_string),
        };

        if !self.client.supports_user_creation() {
            info!("Client cannot create users; the users stage only verifies accounts");
        }

        for stage in Stage::ORDER {
            let specs = manifest.specs(stage);
            info!("Stage {stage}: {} item(s)", specs.len());
            progress.on_stage_start(stage, specs.len());

            let mut stage_report = StageReport::new(stage);
            for spec in &specs {
                progress.on_item_start(spec.kind, &spec.key);

                let outcome = match self.provision(&run, spec) {
                    Ok(outcome) => outcome,
                    Err(Fatal { error, outcome }) => {
                        let outcome = outcome.unwrap_or_else(|| {
                            ProvisioningOutcome::failed(spec, ErrorDetail::from(&error))
                        });
                        if let Some(handle) = &outcome.handle {
                            run.registry.insert(handle.clone());
                        }
                        progress.on_item_complete(&outcome);
                        stage_report.push(outcome);
                        return Err(Self::abort(run, stage_report, spec, error));
                    }
                };
                debug!("{} '{}': {}", spec.kind, spec.key, outcome.status);

                if let Some(handle) = &outcome.handle {
                    run.registry.insert(handle.clone());
                }
                let add_members = spec.kind == ResourceKind::Group && outcome.status.is_present();
                progress.on_item_complete(&outcome);
                stage_report.push(outcome);

                if add_members {
                    if let Err(Fatal { error, .. }) =
                        self.add_members(&run, spec, &mut stage_report, progress)
                    {
                        return Err(Self::abort(run, stage_report, spec, error));
                    }
                } else if spec.kind == ResourceKind::Group {
                    warn!("Skipping memberships of group '{}': group not provisioned", spec.key);
                }
            }

            progress.on_stage_complete(&stage_report);
            run.report.push_stage(stage_report);
        }

        Ok(run.report)
    }

    fn abort(
        mut run: Run,
        stage_report: StageReport,
        spec: &ResourceSpec,
        err: ClientError,
    ) -> ProvisionError {
        let stage = stage_report.stage;
        run.report.push_stage(stage_report);
        warn!("Aborting run in {stage} stage: {err}");
        ProvisionError::Aborted {
            stage,
            kind: spec.kind,
            key: spec.key.clone(),
            message: err.message,
            partial: Box::new(run.report),
        }
    }

    /// Reconcile a single item against the remote service
    fn provision(&self, run: &Run, spec: &ResourceSpec) -> Result<ProvisioningOutcome, Fatal> {
        let client = self.client;
        let name = spec.name();
        let attributes = &spec.attributes;

        let created = match spec.kind {
            ResourceKind::User if !client.supports_user_creation() => {
                return self.verify(spec);
            }
            ResourceKind::User => self.mutate(|| client.ensure_user(name, attributes))?,
            ResourceKind::Group => self.mutate(|| client.ensure_group(name))?,
            ResourceKind::Space => self.mutate(|| client.ensure_space(name, attributes))?,
            ResourceKind::Page | ResourceKind::BlogPost => {
                let Some(space) = spec.key.space() else {
                    let err = ClientError::permanent("content item has no space");
                    return Ok(ProvisioningOutcome::failed(spec, ErrorDetail::from(&err)));
                };
                let space_key = NaturalKey::name(space);
                if let Err(err) = self.resolve(run, ResourceKind::Space, &space_key)? {
                    let err = ClientError::not_found(format!("space '{space}': {}", err.message));
                    return Ok(ProvisioningOutcome::failed(spec, ErrorDetail::from(&err)));
                }

                let body = attributes.body.as_deref().unwrap_or_default();
                if spec.kind == ResourceKind::BlogPost {
                    self.mutate(|| client.ensure_blog_post(space, name, body))?
                } else {
                    let parent_id = match &attributes.parent {
                        Some(parent) => {
                            let key = NaturalKey::in_space(space, parent.as_str());
                            match self.resolve(run, ResourceKind::Page, &key)? {
                                Ok(handle) => Some(handle.id),
                                Err(err) => {
                                    let err = ClientError::not_found(format!(
                                        "parent page '{parent}' in space '{space}': {}",
                                        err.message
                                    ));
                                    return Ok(ProvisioningOutcome::failed(
                                        spec,
                                        ErrorDetail::from(&err),
                                    ));
                                }
                            }
                        }
                        None => None,
                    };
                    self.mutate(|| client.ensure_page(space, name, body, parent_id.as_deref()))?
                }
            }
        };

        match created {
            Ok(handle) => self.after_create(run, spec, handle),
            Err(err) if err.kind == ErrorKind::AlreadyExists => {
                debug!("{} '{}' already exists, resolving", spec.kind, spec.key);
                self.resolve_existing(spec)
            }
            Err(err) => {
                warn!("Failed to create {} '{}': {err}", spec.kind, spec.key);
                Ok(ProvisioningOutcome::failed(spec, ErrorDetail::from(&err)))
            }
        }
    }

    /// Resolve an item the service reported as already present
    fn resolve_existing(&self, spec: &ResourceSpec) -> Result<ProvisioningOutcome, Fatal> {
        Ok(match self.query(|| self.client.lookup(spec.kind, &spec.key))? {
            Ok(handle) => ProvisioningOutcome::already_exists(spec, handle),
            Err(err) => ProvisioningOutcome::failed(spec, ErrorDetail::from(&err)),
        })
    }

    /// Check that a user account exists without creating it
    fn verify(&self, spec: &ResourceSpec) -> Result<ProvisioningOutcome, Fatal> {
        Ok(match self.query(|| self.client.lookup(ResourceKind::User, &spec.key))? {
            Ok(handle) => ProvisioningOutcome::already_exists(spec, handle),
            Err(err) if err.kind == ErrorKind::NotFound => {
                let err = ClientError::not_found(format!(
                    "user '{}' does not exist; create it in the admin console",
                    spec.key
                ));
                ProvisioningOutcome::failed(spec, ErrorDetail::from(&err))
            }
            Err(err) => ProvisioningOutcome::failed(spec, ErrorDetail::from(&err)),
        })
    }

    /// Apply the item's policy after a successful creation
    fn after_create(
        &self,
        run: &Run,
        spec: &ResourceSpec,
        handle: ResourceHandle,
    ) -> Result<ProvisioningOutcome, Fatal> {
        let Some(name) = &spec.policy else {
            return Ok(ProvisioningOutcome::created(spec, handle));
        };
        let Some(target) = spec.kind.target_type() else {
            warn!("Ignoring policy '{name}' on {} '{}'", spec.kind, spec.key);
            return Ok(ProvisioningOutcome::created(spec, handle));
        };

        let ctx = PolicyContext {
            admin: run.admin.as_deref(),
            group: run.group.as_deref(),
            target,
        };
        let entries = match policy::resolve(name, &ctx) {
            Ok(entries) => entries,
            Err(err) => {
                warn!("Policy for {} '{}' not applied: {err}", spec.kind, spec.key);
                let error = ErrorDetail::from(&err);
                return Ok(ProvisioningOutcome::policy_failed(spec, handle, error));
            }
        };

        // A fatal failure here still leaves the resource in place
        let applied =
            match self.mutate(|| self.client.apply_permissions(target, &handle.id, &entries)) {
                Ok(applied) => applied,
                Err(Fatal { error, .. }) => {
                    warn!("Policy for {} '{}' not applied: {error}", spec.kind, spec.key);
                    let detail = ErrorDetail::from(&error);
                    let outcome = ProvisioningOutcome::policy_failed(spec, handle, detail);
                    return Err(Fatal {
                        error,
                        outcome: Some(outcome),
                    });
                }
            };
        Ok(match applied {
            Ok(()) => ProvisioningOutcome::created(spec, handle).with_permissions(entries),
            Err(err) => {
                warn!("Policy for {} '{}' not applied: {err}", spec.kind, spec.key);
                ProvisioningOutcome::policy_failed(spec, handle, ErrorDetail::from(&err))
            }
        })
    }

    /// Add the group's members, recording one outcome per call
    fn add_members<P>(
        &self,
        run: &Run,
        spec: &ResourceSpec,
        stage_report: &mut StageReport,
        progress: &mut P,
    ) -> Result<(), Fatal>
    where
        P: ProgressCallback + ?Sized,
    {
        let group = spec.name();
        for user in Self::members_for(run, spec) {
            let result = self.mutate(|| self.client.add_member(group, &user));
            let (error, fatal) = match result {
                Ok(Ok(())) => (None, None),
                Ok(Err(err)) => {
                    warn!("Failed to add '{user}' to group '{group}': {err}");
                    (Some(ErrorDetail::from(&err)), None)
                }
                Err(Fatal { error, .. }) => (Some(ErrorDetail::from(&error)), Some(error)),
            };

            let outcome = MembershipOutcome {
                group: group.to_string(),
                user,
                error,
            };
            progress.on_membership(&outcome);
            stage_report.push_membership(outcome);

            if let Some(error) = fatal {
                return Err(Fatal::new(error));
            }
        }
        Ok(())
    }

    /// Users to add to a group
    ///
    /// An explicit member list is used verbatim. Otherwise every provisioned
    /// user not flagged as admin joins.
    fn members_for(run: &Run, spec: &ResourceSpec) -> Vec<String> {
        if let Some(members) = &spec.attributes.members {
            return members.clone();
        }
        run.users
            .iter()
            .filter(|u| !u.attributes.is_admin)
            .filter(|u| run.registry.contains(ResourceKind::User, &u.key))
            .map(|u| u.name().to_string())
            .collect()
    }

    /// Find a handle from this run, falling back to a remote lookup
    fn resolve(&self, run: &Run, kind: ResourceKind, key: &NaturalKey) -> Attempt<ResourceHandle> {
        if let Some(handle) = run.registry.get(kind, key) {
            return Ok(Ok(handle.clone()));
        }
        self.query(|| self.client.lookup(kind, key))
    }

    /// Run a mutating call, pausing after success
    fn mutate<T>(&self, op: impl FnMut() -> Result<T, ClientError>) -> Attempt<T> {
        let result = self.with_retry(op);
        if result.is_ok() {
            self.pause();
        }
        Self::check_fatal(result)
    }

    /// Run a read-only call
    fn query<T>(&self, op: impl FnMut() -> Result<T, ClientError>) -> Attempt<T> {
        Self::check_fatal(self.with_retry(op))
    }

    /// Retry a transient failure once, after the configured delay
    fn with_retry<T>(
        &self,
        mut op: impl FnMut() -> Result<T, ClientError>,
    ) -> Result<T, ClientError> {
        match op() {
            Err(err) if err.kind.is_retryable() && self.options.retry_transient => {
                warn!("{err}; retrying once");
                self.pause();
                op()
            }
            result => result,
        }
    }

    fn check_fatal<T>(result: Result<T, ClientError>) -> Attempt<T> {
        match result {
            Err(err) if err.kind.is_fatal() => Err(Fatal::new(err)),
            result => Ok(result),
        }
    }

    fn pause(&self) {
        if !self.options.delay.is_zero() {
            thread::sleep(self.options.delay);
        }
    }
}

/// Simple run without progress reporting
pub fn provision_simple<C: ResourceClient + ?Sized>(
    client: &C,
    manifest: &Manifest,
    options: RunOptions,
) -> Result<RunReport, ProvisionError> {
    Orchestrator::new(client, options).run(manifest, &mut crate::context::NoProgress)
}
