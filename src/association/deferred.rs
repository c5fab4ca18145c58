use super::{AssociationSource, LoadState};
use crate::core::{Record, Records, Result};
use crate::delta::{AssociationDelta, difference};
use log::{debug, trace};
use std::fmt;
use std::sync::Arc;

/// Materialized members of a loaded association.
struct LoadedSet<R> {
    /// Mutable, caller-visible members
    working: Vec<R>,
    /// Frozen copy of what storage held at load time
    baseline: Arc<[R]>,
}

/// An association whose link changes are held in memory until commit.
///
/// Members are fetched from the source on first use. From then on every
/// read and write goes to the in-memory working set, and the difference
/// against the snapshot taken at load time is what a commit has to write.
///
/// Each instance belongs to one owner record and one association; it is
/// not synchronized and must not be shared between threads without an
/// external lock.
pub struct DeferredAssociation<S: AssociationSource> {
    source: S,
    loaded: Option<LoadedSet<S::Record>>,
}

impl<S: AssociationSource> DeferredAssociation<S> {
    /// Wrap a live source. Nothing is fetched until the members are needed.
    pub fn new(source: S) -> Self {
        Self {
            source,
            loaded: None,
        }
    }

    pub fn load_state(&self) -> LoadState {
        if self.loaded.is_some() {
            LoadState::Loaded
        } else {
            LoadState::Ghost
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    /// The wrapped source, without forcing a load.
    pub fn original_association(&self) -> &S {
        &self.source
    }

    /// The wrapped source, after making sure the members are loaded.
    pub fn association(&mut self) -> Result<&mut S> {
        self.load()?;
        Ok(&mut self.source)
    }

    // A failed fetch leaves `loaded` as None so the next call retries.
    fn load(&mut self) -> Result<&mut LoadedSet<S::Record>> {
        let set = match self.loaded.take() {
            Some(set) => set,
            None => {
                let working = self.source.fetch_all()?;
                debug!("deferred association loaded {} record(s)", working.len());
                let baseline: Arc<[S::Record]> = working.iter().cloned().collect();
                LoadedSet { working, baseline }
            }
        };
        Ok(self.loaded.insert(set))
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Current working set.
    pub fn objects(&mut self) -> Result<&[S::Record]> {
        Ok(self.load()?.working.as_slice())
    }

    /// Baseline captured when the members were loaded.
    pub fn original_objects(&mut self) -> Result<&[S::Record]> {
        Ok(&self.load()?.baseline[..])
    }

    pub fn to_vec(&mut self) -> Result<Vec<S::Record>> {
        Ok(self.load()?.working.clone())
    }

    pub fn len(&mut self) -> Result<usize> {
        Ok(self.load()?.working.len())
    }

    pub fn is_empty(&mut self) -> Result<bool> {
        Ok(self.load()?.working.is_empty())
    }

    pub fn get(&mut self, index: usize) -> Result<Option<&S::Record>> {
        Ok(self.load()?.working.get(index))
    }

    pub fn iter(&mut self) -> Result<std::slice::Iter<'_, S::Record>> {
        Ok(self.load()?.working.iter())
    }

    pub fn contains(&mut self, record: &S::Record) -> Result<bool> {
        Ok(self.load()?.working.contains(record))
    }

    pub fn find<P>(&mut self, mut predicate: P) -> Result<Option<&S::Record>>
    where
        P: FnMut(&S::Record) -> bool,
    {
        Ok(self.load()?.working.iter().find(|record| predicate(*record)))
    }

    pub fn map<T, F>(&mut self, f: F) -> Result<Vec<T>>
    where
        F: FnMut(&S::Record) -> T,
    {
        Ok(self.load()?.working.iter().map(f).collect())
    }

    /// Compare the working set (not the source) with `other`.
    pub fn eq_records(&mut self, other: &[S::Record]) -> Result<bool> {
        Ok(self.load()?.working.as_slice() == other)
    }

    /// Debug rendering of the working set.
    pub fn inspect(&mut self) -> Result<String> {
        Ok(format!("{:?}", self.load()?.working))
    }

    pub fn ids(&mut self) -> Result<Vec<<S::Record as Record>::Id>> {
        self.map(|record| record.id())
    }

    /// First member. Before the members are loaded this asks the source
    /// directly, which may order differently than `fetch_all` does.
    pub fn first(&self) -> Result<Option<S::Record>> {
        match &self.loaded {
            Some(set) => Ok(set.working.first().cloned()),
            None => self.source.first(),
        }
    }

    /// Last member, with the same pre-load caveat as [`Self::first`].
    pub fn last(&self) -> Result<Option<S::Record>> {
        match &self.loaded {
            Some(set) => Ok(set.working.last().cloned()),
            None => self.source.last(),
        }
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Append records to the end of the working set.
    ///
    /// Records already present are appended again; nothing is deduplicated.
    pub fn append(&mut self, records: impl Into<Records<S::Record>>) -> Result<&mut Self> {
        let records = records.into().flatten();
        trace!("appending {} record(s)", records.len());
        self.load()?.working.extend(records);
        Ok(self)
    }

    /// Remove records from the working set.
    ///
    /// The input is deduplicated first; each distinct record then removes
    /// at most one matching occurrence. Records not present are ignored.
    pub fn delete(&mut self, records: impl Into<Records<S::Record>>) -> Result<&mut Self> {
        let mut distinct: Vec<S::Record> = Vec::new();
        for record in records.into().flatten() {
            if !distinct.contains(&record) {
                distinct.push(record);
            }
        }
        trace!("deleting {} record(s)", distinct.len());

        let working = &mut self.load()?.working;
        for record in &distinct {
            if let Some(pos) = working.iter().position(|member| member == record) {
                working.remove(pos);
            }
        }
        Ok(self)
    }

    /// Remove every member from the working set. The baseline is kept, so
    /// all of it becomes pending unlinks.
    pub fn clear(&mut self) -> Result<&mut Self> {
        self.load()?.working.clear();
        Ok(self)
    }

    /// Replace the working set wholesale.
    ///
    /// This skips the lazy loader: the baseline is taken fresh from the
    /// source as it is now, never from an earlier load, and the given
    /// records become the working set.
    pub fn replace(&mut self, records: Vec<S::Record>) -> Result<&mut Self> {
        let baseline: Arc<[S::Record]> = self.source.fetch_all()?.into();
        debug!(
            "deferred association replaced: {} record(s) over baseline of {}",
            records.len(),
            baseline.len()
        );
        self.loaded = Some(LoadedSet {
            working: records,
            baseline,
        });
        Ok(self)
    }

    /// Build unsaved members through the source and append them.
    pub fn build(&mut self, attributes: Vec<S::Attributes>) -> Result<Vec<S::Record>> {
        let built = self.association()?.build(attributes)?;
        self.load()?.working.extend(built.iter().cloned());
        Ok(built)
    }

    /// Create persisted members through the source and append them.
    pub fn create(&mut self, attributes: Vec<S::Attributes>) -> Result<Vec<S::Record>> {
        let created = self.association()?.create(attributes)?;
        self.load()?.working.extend(created.iter().cloned());
        Ok(created)
    }

    /// Refresh the source and forget the loaded members. The next access
    /// fetches again and takes a new baseline.
    pub fn reload(&mut self) -> Result<&mut Self> {
        self.source.reload()?;
        self.loaded = None;
        debug!("deferred association reset to ghost");
        Ok(self)
    }

    // ------------------------------------------------------------------
    // Delta
    // ------------------------------------------------------------------

    /// Records to link after the owner is saved: working set minus baseline.
    pub fn pending_creates(&mut self) -> Result<Vec<S::Record>> {
        let set = self.load()?;
        Ok(difference(set.working.as_slice(), &set.baseline[..]))
    }

    /// Records to unlink after the owner is saved: baseline minus working set.
    pub fn pending_deletes(&mut self) -> Result<Vec<S::Record>> {
        let set = self.load()?;
        Ok(difference(&set.baseline[..], set.working.as_slice()))
    }

    pub fn delta(&mut self) -> Result<AssociationDelta<S::Record>> {
        let set = self.load()?;
        Ok(AssociationDelta::between(set.working.as_slice(), &set.baseline[..]))
    }

    /// Fold a link that reached storage into the baseline, so it is no
    /// longer pending.
    pub(crate) fn acknowledge_link(&mut self, record: &S::Record) -> Result<()> {
        let set = self.load()?;
        let mut baseline = set.baseline.to_vec();
        baseline.push(record.clone());
        set.baseline = baseline.into();
        Ok(())
    }

    /// Fold an unlink that reached storage into the baseline. Removes one
    /// occurrence.
    pub(crate) fn acknowledge_unlink(&mut self, record: &S::Record) -> Result<()> {
        let set = self.load()?;
        if let Some(pos) = set.baseline.iter().position(|member| member == record) {
            let mut baseline = set.baseline.to_vec();
            baseline.remove(pos);
            set.baseline = baseline.into();
        }
        Ok(())
    }

    pub fn set_inverse_instance(&mut self, record: &S::Record, owner: &S::Owner) -> Result<()> {
        self.source.set_inverse_instance(record, owner)
    }
}

impl<S: AssociationSource> fmt::Debug for DeferredAssociation<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("DeferredAssociation");
        out.field("load_state", &self.load_state());
        if let Some(set) = &self.loaded {
            out.field("objects", &set.working);
        }
        out.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DeferError;
    use std::cell::Cell;

    #[derive(Debug, Clone, PartialEq)]
    struct Tag(&'static str);

    impl Record for Tag {
        type Id = &'static str;

        fn id(&self) -> &'static str {
            self.0
        }
    }

    #[derive(Default)]
    struct VecSource {
        members: Vec<Tag>,
        fetches: Cell<usize>,
        reloads: usize,
        fail_fetch: bool,
    }

    impl VecSource {
        fn with(members: &[&'static str]) -> Self {
            Self {
                members: members.iter().map(|name| Tag(*name)).collect(),
                ..Default::default()
            }
        }
    }

    impl AssociationSource for VecSource {
        type Record = Tag;
        type Attributes = &'static str;
        type Owner = ();

        fn fetch_all(&self) -> Result<Vec<Tag>> {
            if self.fail_fetch {
                return Err(DeferError::SourceError("fetch failed".to_string()));
            }
            self.fetches.set(self.fetches.get() + 1);
            Ok(self.members.clone())
        }

        fn first(&self) -> Result<Option<Tag>> {
            Ok(self.members.first().cloned())
        }

        fn last(&self) -> Result<Option<Tag>> {
            Ok(self.members.last().cloned())
        }

        fn build(&mut self, attributes: Vec<&'static str>) -> Result<Vec<Tag>> {
            Ok(attributes.into_iter().map(Tag).collect())
        }

        fn create(&mut self, attributes: Vec<&'static str>) -> Result<Vec<Tag>> {
            let created: Vec<Tag> = attributes.into_iter().map(Tag).collect();
            self.members.extend(created.iter().cloned());
            Ok(created)
        }

        fn reload(&mut self) -> Result<()> {
            self.reloads += 1;
            Ok(())
        }
    }

    #[test]
    fn test_new_is_ghost_and_does_not_fetch() {
        let assoc = DeferredAssociation::new(VecSource::with(&["a"]));
        assert_eq!(assoc.load_state(), LoadState::Ghost);
        assert_eq!(assoc.original_association().fetches.get(), 0);
    }

    #[test]
    fn test_load_is_idempotent() {
        let mut assoc = DeferredAssociation::new(VecSource::with(&["a", "b"]));
        assert_eq!(assoc.len().unwrap(), 2);
        assert_eq!(assoc.to_vec().unwrap(), vec![Tag("a"), Tag("b")]);
        assert!(assoc.contains(&Tag("b")).unwrap());
        assert_eq!(assoc.original_association().fetches.get(), 1);
        assert!(assoc.is_loaded());
    }

    #[test]
    fn test_failed_load_stays_ghost() {
        let mut source = VecSource::with(&["a"]);
        source.fail_fetch = true;
        let mut assoc = DeferredAssociation::new(source);

        assert!(matches!(assoc.len(), Err(DeferError::SourceError(_))));
        assert_eq!(assoc.load_state(), LoadState::Ghost);

        assoc.association_mut_for_test().fail_fetch = false;
        assert_eq!(assoc.len().unwrap(), 1);
    }

    #[test]
    fn test_baseline_is_independent_of_working_set() {
        let mut assoc = DeferredAssociation::new(VecSource::with(&["a"]));
        assoc.append(Tag("b")).unwrap();
        assert_eq!(assoc.original_objects().unwrap(), &[Tag("a")]);
        assert_eq!(assoc.objects().unwrap(), &[Tag("a"), Tag("b")]);
    }

    #[test]
    fn test_build_appends_to_working_set() {
        let mut assoc = DeferredAssociation::new(VecSource::with(&["a"]));
        let built = assoc.build(vec!["x", "y"]).unwrap();
        assert_eq!(built, vec![Tag("x"), Tag("y")]);
        assert_eq!(assoc.pending_creates().unwrap(), vec![Tag("x"), Tag("y")]);
    }

    #[test]
    fn test_reload_resets_without_fetching() {
        let mut assoc = DeferredAssociation::new(VecSource::with(&["a"]));
        assoc.append(Tag("b")).unwrap();
        assoc.reload().unwrap();

        assert_eq!(assoc.load_state(), LoadState::Ghost);
        assert_eq!(assoc.original_association().reloads, 1);
        assert_eq!(assoc.original_association().fetches.get(), 1);

        assert!(assoc.pending_creates().unwrap().is_empty());
        assert_eq!(assoc.original_association().fetches.get(), 2);
    }

    #[test]
    fn test_acknowledged_writes_leave_pending() {
        let mut assoc = DeferredAssociation::new(VecSource::with(&["a", "b"]));
        assoc.delete(Tag("a")).unwrap().append(Tag("c")).unwrap();

        assoc.acknowledge_unlink(&Tag("a")).unwrap();
        assert!(assoc.pending_deletes().unwrap().is_empty());
        assert_eq!(assoc.pending_creates().unwrap(), vec![Tag("c")]);

        assoc.acknowledge_link(&Tag("c")).unwrap();
        assert!(assoc.delta().unwrap().is_empty());
        assert_eq!(assoc.original_objects().unwrap(), &[Tag("b"), Tag("c")]);
    }

    #[test]
    fn test_debug_does_not_force_load() {
        let assoc = DeferredAssociation::new(VecSource::with(&["a"]));
        let rendered = format!("{:?}", assoc);
        assert!(rendered.contains("Ghost"));
        assert_eq!(assoc.original_association().fetches.get(), 0);
    }

    impl DeferredAssociation<VecSource> {
        fn association_mut_for_test(&mut self) -> &mut VecSource {
            &mut self.source
        }
    }
}
