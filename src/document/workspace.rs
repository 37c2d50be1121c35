use super::{
    DocumentTree, EditorBinding, EditorRegistry, GroupId, Leaf, LeafId, LeafSeed, NEW_LEAF_TITLE,
};
use crate::error::DocumentError;
use crate::models::DocumentDto;
use crate::palette::{ColorAssigner, SharedColorSet};

/// What an asynchronous suggestion was requested for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SuggestionTarget {
    /// Draft or rewrite one subsection's content.
    Leaf { group: GroupId, leaf: LeafId },
    /// Append suggested subsections to a pillar.
    Group(GroupId),
}

/// Issued before a remote call; presented again when its result arrives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingSuggestion {
    target: SuggestionTarget,
    generation: u64,
}

impl PendingSuggestion {
    pub fn target(&self) -> SuggestionTarget {
        self.target
    }
}

/// Captured when a remote document load starts. The load only replaces the
/// document if nothing else replaced it in the meantime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingReplace {
    generation: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// The target was deleted or the document replaced while the call was in
    /// flight. Nothing changed.
    StaleIgnored,
}

/// The document plus the editors mounted for it.
///
/// This is the only mutation surface used by the UI: every path that drops a
/// subsection also releases its editor, and rebuilding releases all editors
/// before the new tree is installed.
#[derive(Debug)]
pub struct Workspace<E: EditorBinding> {
    doc: DocumentTree,
    editors: EditorRegistry<E>,
    /// Bumped on every wholesale replacement.
    generation: u64,
}

impl<E: EditorBinding> Workspace<E> {
    pub fn new(doc: DocumentTree) -> Self {
        Self {
            doc,
            editors: EditorRegistry::new(),
            generation: 0,
        }
    }

    pub fn document(&self) -> &DocumentTree {
        &self.doc
    }

    pub fn editors(&self) -> &EditorRegistry<E> {
        &self.editors
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn editor(&self, leaf: LeafId) -> Option<&E> {
        self.editors.get(leaf)
    }

    /// Mounts an editor for every subsection that does not have one yet.
    /// Returns how many were created.
    pub fn mount_missing(&mut self, mut create: impl FnMut(&Leaf) -> E) -> usize {
        let mut created = 0;
        for g in self.doc.groups() {
            for l in g.leaves() {
                if !self.editors.is_mounted(l.id()) {
                    self.editors.mount(l.id(), create(l));
                    created += 1;
                }
            }
        }
        created
    }

    /// Current content: the mounted editor's value, else the stored text.
    pub fn leaf_content(&self, group: GroupId, leaf: LeafId) -> Option<String> {
        let l = self.doc.leaf(group, leaf)?;
        Some(self.editors.value(leaf).unwrap_or_else(|| l.content.clone()))
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.doc.title = title.into();
    }

    pub fn add_group(
        &mut self,
        title: impl Into<String>,
        color_set: Option<SharedColorSet>,
        leaves: Vec<LeafSeed>,
    ) -> GroupId {
        self.doc.add_group(title, color_set, leaves)
    }

    pub fn add_default_group(&mut self) -> GroupId {
        self.doc.add_default_group()
    }

    pub fn add_leaf(
        &mut self,
        group: GroupId,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Option<LeafId> {
        self.doc.add_leaf(group, title, content)
    }

    pub fn add_default_leaf(&mut self, group: GroupId) -> Option<LeafId> {
        self.doc.add_leaf(group, NEW_LEAF_TITLE, "")
    }

    /// Removes the pillar and releases every editor bound to its subsections
    /// before returning.
    pub fn remove_group(&mut self, group: GroupId) -> bool {
        let Some(removed) = self.doc.remove_group(group) else {
            return false;
        };
        for id in removed.leaf_ids() {
            self.editors.release(id);
        }
        true
    }

    pub fn remove_leaf(&mut self, group: GroupId, leaf: LeafId) -> bool {
        if self.doc.remove_leaf(group, leaf).is_none() {
            return false;
        }
        self.editors.release(leaf);
        true
    }

    pub fn move_group(&mut self, from: usize, to: usize) -> bool {
        self.doc.move_group(from, to)
    }

    pub fn move_leaf(&mut self, group: GroupId, from: usize, to: usize) -> bool {
        self.doc.move_leaf(group, from, to)
    }

    pub fn toggle_group_collapsed(&mut self, group: GroupId) -> Option<bool> {
        self.doc.toggle_group_collapsed(group)
    }

    pub fn toggle_leaf_collapsed(&mut self, group: GroupId, leaf: LeafId) -> Option<bool> {
        self.doc.toggle_leaf_collapsed(group, leaf)
    }

    pub fn rename_group(&mut self, group: GroupId, title: impl Into<String>) -> bool {
        self.doc.rename_group(group, title)
    }

    pub fn rename_leaf(&mut self, group: GroupId, leaf: LeafId, title: impl Into<String>) -> bool {
        self.doc.rename_leaf(group, leaf, title)
    }

    /// Writes through to the mounted editor when there is one.
    pub fn set_leaf_content(&mut self, group: GroupId, leaf: LeafId, content: &str) -> bool {
        if !self.doc.set_leaf_content(group, leaf, content) {
            return false;
        }
        if let Some(e) = self.editors.get(leaf) {
            e.set_value(content);
        }
        true
    }

    pub fn serialize(&self) -> DocumentDto {
        self.doc.serialize_with(|id| self.editors.value(id))
    }

    /// Replaces the document wholesale. All mounted editors are released in a
    /// single pass before the new tree is installed.
    pub fn replace_document(&mut self, doc: DocumentTree) {
        let released = self.editors.release_all();
        self.doc = doc;
        self.generation += 1;
        log::info!(
            "document replaced (generation {}, {released} editors released)",
            self.generation
        );
    }

    /// Imports exchanged JSON. On error the current document is untouched.
    pub fn import_json(&mut self, text: &str) -> Result<(), DocumentError> {
        let doc = crate::export::from_json(text, self.fresh_colors())?;
        self.replace_document(doc);
        Ok(())
    }

    pub fn import_value(&mut self, value: &serde_json::Value) -> Result<(), DocumentError> {
        let doc = DocumentTree::from_value(value, self.fresh_colors())?;
        self.replace_document(doc);
        Ok(())
    }

    pub fn begin_replace(&self) -> PendingReplace {
        PendingReplace {
            generation: self.generation,
        }
    }

    /// Like [`Workspace::import_value`], for a value fetched asynchronously.
    /// A malformed value is still an error; a late one is ignored.
    pub fn import_value_if(
        &mut self,
        pending: PendingReplace,
        value: &serde_json::Value,
    ) -> Result<ApplyOutcome, DocumentError> {
        if pending.generation != self.generation {
            log::info!("discarding stale document load");
            return Ok(ApplyOutcome::StaleIgnored);
        }
        self.import_value(value)?;
        Ok(ApplyOutcome::Applied)
    }

    pub fn reset_to_template(&mut self) {
        let doc = DocumentTree::default_template(self.fresh_colors());
        self.replace_document(doc);
    }

    fn fresh_colors(&self) -> ColorAssigner {
        let mut colors = self.doc.colors().clone();
        colors.reset();
        colors
    }

    pub fn to_markdown(&self) -> String {
        crate::export::dto_to_markdown(&self.serialize())
    }

    pub fn to_json(&self) -> String {
        crate::export::dto_to_json(&self.serialize())
    }

    fn target_exists(&self, target: SuggestionTarget) -> bool {
        match target {
            SuggestionTarget::Leaf { group, leaf } => self.doc.leaf(group, leaf).is_some(),
            SuggestionTarget::Group(group) => self.doc.group(group).is_some(),
        }
    }

    /// `None` when the target is already gone.
    pub fn begin_suggestion(&self, target: SuggestionTarget) -> Option<PendingSuggestion> {
        self.target_exists(target).then_some(PendingSuggestion {
            target,
            generation: self.generation,
        })
    }

    fn is_stale(&self, pending: &PendingSuggestion) -> bool {
        pending.generation != self.generation || !self.target_exists(pending.target)
    }

    /// Applies drafted or rewritten text to the subsection the request was
    /// made for.
    pub fn apply_leaf_text(&mut self, pending: PendingSuggestion, text: &str) -> ApplyOutcome {
        let SuggestionTarget::Leaf { group, leaf } = pending.target else {
            return ApplyOutcome::StaleIgnored;
        };
        if self.is_stale(&pending) {
            log::info!("discarding stale suggestion for {leaf}");
            return ApplyOutcome::StaleIgnored;
        }
        self.set_leaf_content(group, leaf, text);
        ApplyOutcome::Applied
    }

    /// Appends suggested subsections to the pillar the request was made for.
    pub fn apply_group_suggestions(
        &mut self,
        pending: PendingSuggestion,
        seeds: Vec<LeafSeed>,
    ) -> ApplyOutcome {
        let SuggestionTarget::Group(group) = pending.target else {
            return ApplyOutcome::StaleIgnored;
        };
        if self.is_stale(&pending) {
            log::info!("discarding stale section suggestions for pillar {group:?}");
            return ApplyOutcome::StaleIgnored;
        }
        for seed in seeds {
            self.doc.add_leaf(group, seed.title, seed.content);
        }
        ApplyOutcome::Applied
    }
}

impl<E: EditorBinding> Default for Workspace<E> {
    fn default() -> Self {
        Self::new(DocumentTree::default())
    }
}
