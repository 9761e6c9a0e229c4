/// Latest repository emission plus an optional optimistic local edit.
///
/// Intents patch the local view right away; the next repository emission
/// replaces both the authoritative copy and discards the patch.
#[derive(Debug, Clone)]
pub struct LocalSnapshot<T> {
    authoritative: Vec<T>,
    patched: Option<Vec<T>>,
    emissions: u64,
}

impl<T> Default for LocalSnapshot<T> {
    fn default() -> Self {
        Self {
            authoritative: Vec::new(),
            patched: None,
            emissions: 0,
        }
    }
}

impl<T: Clone> LocalSnapshot<T> {
    /// What the presentation should show.
    pub fn lines(&self) -> &[T] {
        self.patched.as_deref().unwrap_or(&self.authoritative)
    }

    pub fn authoritative(&self) -> &[T] {
        &self.authoritative
    }

    pub fn has_patch(&self) -> bool {
        self.patched.is_some()
    }

    /// True once the repository has emitted at least one collection.
    pub fn has_emitted(&self) -> bool {
        self.emissions > 0
    }

    pub fn patch(&mut self, edit: impl FnOnce(&mut Vec<T>)) {
        let mut lines = self.lines().to_vec();
        edit(&mut lines);
        self.patched = Some(lines);
    }

    /// Accepts a repository emission and returns the previous authoritative lines.
    pub fn reconcile(&mut self, lines: Vec<T>) -> Vec<T> {
        self.patched = None;
        self.emissions += 1;
        std::mem::replace(&mut self.authoritative, lines)
    }
}
