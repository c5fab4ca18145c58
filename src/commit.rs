// ============================================================================
// Commit
// ============================================================================
//
// Turns the pending delta of a deferred association into link/unlink
// writes against its source, with optional before/after hooks around each
// write. Called by whatever saves the owner record, after the owner itself
// has been persisted.
//
// ============================================================================

use crate::association::{AssociationWriter, DeferredAssociation};
use crate::config::{CommitConfig, CommitOrder};
use crate::core::{DeferError, Record, Result};
use serde::Serialize;
use tracing::{Level, event, info_span};

type BeforeHook<'a, R> = Box<dyn FnMut(&R) -> bool + 'a>;
type AfterHook<'a, R> = Box<dyn FnMut(&R) + 'a>;

/// Hooks run around each link and unlink write.
///
/// A before-hook returning `false` halts the commit with
/// [`DeferError::CallbackHalted`]; writes already issued are not undone.
pub struct CommitCallbacks<'a, R> {
    before_link: Option<BeforeHook<'a, R>>,
    after_link: Option<AfterHook<'a, R>>,
    before_unlink: Option<BeforeHook<'a, R>>,
    after_unlink: Option<AfterHook<'a, R>>,
}

impl<'a, R> Default for CommitCallbacks<'a, R> {
    fn default() -> Self {
        Self {
            before_link: None,
            after_link: None,
            before_unlink: None,
            after_unlink: None,
        }
    }
}

impl<'a, R> CommitCallbacks<'a, R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn before_link(mut self, hook: impl FnMut(&R) -> bool + 'a) -> Self {
        self.before_link = Some(Box::new(hook));
        self
    }

    pub fn after_link(mut self, hook: impl FnMut(&R) + 'a) -> Self {
        self.after_link = Some(Box::new(hook));
        self
    }

    pub fn before_unlink(mut self, hook: impl FnMut(&R) -> bool + 'a) -> Self {
        self.before_unlink = Some(Box::new(hook));
        self
    }

    pub fn after_unlink(mut self, hook: impl FnMut(&R) + 'a) -> Self {
        self.after_unlink = Some(Box::new(hook));
        self
    }
}

/// Outcome of a successful commit
///
/// Counts are write calls issued to the source, not rows changed: a record
/// appended twice is linked twice, and a source that treats the second
/// link as a no-op still reports it here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CommitReport {
    pub linked: usize,
    pub unlinked: usize,
    pub reloaded: bool,
}

#[derive(Clone, Copy)]
enum Step {
    Link,
    Unlink,
}

impl Step {
    fn name(self) -> &'static str {
        match self {
            Step::Link => "link",
            Step::Unlink => "unlink",
        }
    }
}

/// Write the pending delta of `association` to its source.
///
/// Every write that succeeds is folded into the association's baseline
/// right away. On failure the error is returned as is and the association
/// stays loaded with only the unwritten part still pending, so calling
/// `commit` again resumes where the failed attempt stopped.
pub fn commit<S>(
    association: &mut DeferredAssociation<S>,
    config: &CommitConfig,
    callbacks: &mut CommitCallbacks<'_, S::Record>,
) -> Result<CommitReport>
where
    S: AssociationWriter,
{
    let delta = association.delta()?;
    let span = info_span!(
        "deferring.commit",
        links = delta.links.len(),
        unlinks = delta.unlinks.len()
    );
    let _enter = span.enter();

    let mut report = CommitReport::default();
    let steps = match config.order {
        CommitOrder::UnlinksFirst => [Step::Unlink, Step::Link],
        CommitOrder::LinksFirst => [Step::Link, Step::Unlink],
    };
    for step in steps {
        match step {
            Step::Unlink => {
                report.unlinked = apply(association, step, &delta.unlinks, callbacks)?;
            }
            Step::Link => {
                report.linked = apply(association, step, &delta.links, callbacks)?;
            }
        }
    }

    if config.reload_after_commit {
        association.reload()?;
        report.reloaded = true;
    }

    event!(
        Level::DEBUG,
        linked = report.linked,
        unlinked = report.unlinked,
        "deferred association committed"
    );
    Ok(report)
}

fn apply<S>(
    association: &mut DeferredAssociation<S>,
    step: Step,
    records: &[S::Record],
    callbacks: &mut CommitCallbacks<'_, S::Record>,
) -> Result<usize>
where
    S: AssociationWriter,
{
    let (before, after) = match step {
        Step::Link => (&mut callbacks.before_link, &mut callbacks.after_link),
        Step::Unlink => (&mut callbacks.before_unlink, &mut callbacks.after_unlink),
    };

    for record in records {
        if let Some(hook) = before.as_mut() {
            if !hook(record) {
                event!(Level::DEBUG, step = step.name(), "commit halted by callback");
                return Err(DeferError::CallbackHalted(format!(
                    "before_{} rejected record {:?}",
                    step.name(),
                    record.id()
                )));
            }
        }

        let source = association.association()?;
        let written = match step {
            Step::Link => source.link(record),
            Step::Unlink => source.unlink(record),
        };
        if let Err(err) = written {
            event!(Level::ERROR, error = %err, step = step.name(), "commit write failed");
            return Err(err);
        }
        match step {
            Step::Link => association.acknowledge_link(record)?,
            Step::Unlink => association.acknowledge_unlink(record)?,
        }

        if let Some(hook) = after.as_mut() {
            hook(record);
        }
    }
    Ok(records.len())
}
