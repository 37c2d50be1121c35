mod editors;
mod workspace;

pub use editors::{EditorBinding, EditorRegistry};
pub use workspace::{
    ApplyOutcome, PendingReplace, PendingSuggestion, SuggestionTarget, Workspace,
};

use crate::error::DocumentError;
use crate::models::{ColorSet, DocumentDto, PillarDto, SubsectionDto};
use crate::palette::{ColorAssigner, SharedColorSet};
use serde_json::Value;
use std::sync::Arc;

pub(crate) const DEFAULT_DOCUMENT_TITLE: &str = "My Custom Gem";
pub(crate) const NEW_GROUP_TITLE: &str = "New Pillar";
pub(crate) const FIRST_LEAF_TITLE: &str = "Section 1";
pub(crate) const NEW_LEAF_TITLE: &str = "New Section";

/// In-memory identity of a pillar. Never serialized.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(u64);

/// In-memory identity of a subsection. Never serialized.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LeafId(u64);

impl std::fmt::Display for LeafId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "leaf-{}", self.0)
    }
}

/// Construction input for a subsection.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LeafSeed {
    pub title: String,
    pub content: String,
    pub collapsed: bool,
}

impl LeafSeed {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            collapsed: false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Leaf {
    id: LeafId,
    pub title: String,
    /// Last known content. A mounted editor holds the live value.
    pub content: String,
    pub collapsed: bool,
}

impl Leaf {
    pub fn id(&self) -> LeafId {
        self.id
    }
}

#[derive(Clone, Debug)]
pub struct Group {
    id: GroupId,
    pub title: String,
    color_set: SharedColorSet,
    pub collapsed: bool,
    leaves: Vec<Leaf>,
}

impl Group {
    pub fn id(&self) -> GroupId {
        self.id
    }

    pub fn color_set(&self) -> &SharedColorSet {
        &self.color_set
    }

    pub fn leaves(&self) -> &[Leaf] {
        &self.leaves
    }

    pub fn leaf(&self, id: LeafId) -> Option<&Leaf> {
        self.leaves.iter().find(|l| l.id == id)
    }

    pub fn leaf_mut(&mut self, id: LeafId) -> Option<&mut Leaf> {
        self.leaves.iter_mut().find(|l| l.id == id)
    }

    pub fn leaf_ids(&self) -> impl Iterator<Item = LeafId> + '_ {
        self.leaves.iter().map(|l| l.id)
    }
}

/// Stable move: `from` is removed and re-inserted at `to`; every other
/// element keeps its relative order.
pub(crate) fn move_item<T>(items: &mut Vec<T>, from: usize, to: usize) -> bool {
    if from >= items.len() || to >= items.len() {
        return false;
    }
    if from != to {
        let item = items.remove(from);
        items.insert(to, item);
    }
    true
}

/// Title -> pillars -> subsections.
#[derive(Clone, Debug)]
pub struct DocumentTree {
    pub title: String,
    groups: Vec<Group>,
    colors: ColorAssigner,
    next_id: u64,
}

impl DocumentTree {
    pub fn new(title: impl Into<String>, colors: ColorAssigner) -> Self {
        Self {
            title: title.into(),
            groups: Vec::new(),
            colors,
            next_id: 1,
        }
    }

    /// Start-up document: one "Context" pillar holding a "Role" subsection.
    pub fn default_template(mut colors: ColorAssigner) -> Self {
        colors.reset();
        let mut doc = Self::new(DEFAULT_DOCUMENT_TITLE, colors);
        doc.add_group("Context", None, vec![LeafSeed::new("Role", "")]);
        doc
    }

    fn alloc_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn build_leaf(&mut self, seed: LeafSeed) -> Leaf {
        Leaf {
            id: LeafId(self.alloc_id()),
            title: seed.title,
            content: seed.content,
            collapsed: seed.collapsed,
        }
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.groups.iter().find(|g| g.id == id)
    }

    pub fn group_mut(&mut self, id: GroupId) -> Option<&mut Group> {
        self.groups.iter_mut().find(|g| g.id == id)
    }

    pub fn group_index(&self, id: GroupId) -> Option<usize> {
        self.groups.iter().position(|g| g.id == id)
    }

    pub fn leaf(&self, group: GroupId, leaf: LeafId) -> Option<&Leaf> {
        self.group(group).and_then(|g| g.leaf(leaf))
    }

    pub fn leaf_mut(&mut self, group: GroupId, leaf: LeafId) -> Option<&mut Leaf> {
        self.group_mut(group).and_then(|g| g.leaf_mut(leaf))
    }

    pub fn leaf_ids(&self) -> Vec<LeafId> {
        self.groups.iter().flat_map(|g| g.leaf_ids()).collect()
    }

    pub fn colors(&self) -> &ColorAssigner {
        &self.colors
    }

    /// Appends a pillar. Without an explicit color the next palette entry is used.
    pub fn add_group(
        &mut self,
        title: impl Into<String>,
        color_set: Option<SharedColorSet>,
        leaves: Vec<LeafSeed>,
    ) -> GroupId {
        let color_set = color_set.unwrap_or_else(|| self.colors.next());
        let id = GroupId(self.alloc_id());
        let leaves = leaves.into_iter().map(|s| self.build_leaf(s)).collect();
        self.groups.push(Group {
            id,
            title: title.into(),
            color_set,
            collapsed: false,
            leaves,
        });
        id
    }

    /// "Add pillar" action: a fresh pillar with a single empty section.
    pub fn add_default_group(&mut self) -> GroupId {
        self.add_group(
            NEW_GROUP_TITLE,
            None,
            vec![LeafSeed::new(FIRST_LEAF_TITLE, "")],
        )
    }

    pub fn add_leaf(
        &mut self,
        group: GroupId,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Option<LeafId> {
        self.group_index(group)?;
        let leaf = self.build_leaf(LeafSeed::new(title, content));
        let id = leaf.id;
        self.group_mut(group)?.leaves.push(leaf);
        Some(id)
    }

    /// Detaches the pillar and hands it back so the caller can release
    /// whatever is bound to its leaves.
    pub fn remove_group(&mut self, group: GroupId) -> Option<Group> {
        let idx = self.group_index(group)?;
        Some(self.groups.remove(idx))
    }

    pub fn remove_leaf(&mut self, group: GroupId, leaf: LeafId) -> Option<Leaf> {
        let g = self.group_mut(group)?;
        let idx = g.leaves.iter().position(|l| l.id == leaf)?;
        Some(g.leaves.remove(idx))
    }

    pub fn move_group(&mut self, from: usize, to: usize) -> bool {
        move_item(&mut self.groups, from, to)
    }

    pub fn move_leaf(&mut self, group: GroupId, from: usize, to: usize) -> bool {
        self.group_mut(group)
            .map(|g| move_item(&mut g.leaves, from, to))
            .unwrap_or(false)
    }

    /// Returns the new state.
    pub fn toggle_group_collapsed(&mut self, group: GroupId) -> Option<bool> {
        let g = self.group_mut(group)?;
        g.collapsed = !g.collapsed;
        Some(g.collapsed)
    }

    pub fn toggle_leaf_collapsed(&mut self, group: GroupId, leaf: LeafId) -> Option<bool> {
        let l = self.leaf_mut(group, leaf)?;
        l.collapsed = !l.collapsed;
        Some(l.collapsed)
    }

    pub fn rename_group(&mut self, group: GroupId, title: impl Into<String>) -> bool {
        match self.group_mut(group) {
            Some(g) => {
                g.title = title.into();
                true
            }
            None => false,
        }
    }

    pub fn rename_leaf(&mut self, group: GroupId, leaf: LeafId, title: impl Into<String>) -> bool {
        match self.leaf_mut(group, leaf) {
            Some(l) => {
                l.title = title.into();
                true
            }
            None => false,
        }
    }

    pub fn set_leaf_content(
        &mut self,
        group: GroupId,
        leaf: LeafId,
        content: impl Into<String>,
    ) -> bool {
        match self.leaf_mut(group, leaf) {
            Some(l) => {
                l.content = content.into();
                true
            }
            None => false,
        }
    }

    /// Projection to the exchanged shape. `live` supplies the current editor
    /// value for mounted leaves and takes precedence over the stored content.
    pub fn serialize_with(&self, live: impl Fn(LeafId) -> Option<String>) -> DocumentDto {
        DocumentDto {
            main_title: self.title.clone(),
            pillars: self
                .groups
                .iter()
                .map(|g| PillarDto {
                    title: g.title.clone(),
                    color_set: Some(ColorSet::clone(&g.color_set)),
                    is_closed: g.collapsed,
                    subsections: g
                        .leaves
                        .iter()
                        .map(|l| SubsectionDto {
                            title: l.title.clone(),
                            content: live(l.id).unwrap_or_else(|| l.content.clone()),
                            is_closed: l.collapsed,
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    pub fn to_dto(&self) -> DocumentDto {
        self.serialize_with(|_| None)
    }

    /// Rebuilds a tree from a typed DTO. The color rotation restarts and only
    /// advances for pillars without a color.
    pub fn from_dto(dto: DocumentDto, mut colors: ColorAssigner) -> Self {
        colors.reset();
        let mut doc = Self::new(dto.main_title, colors);
        for p in dto.pillars {
            let leaves = p
                .subsections
                .into_iter()
                .map(|s| LeafSeed {
                    title: s.title,
                    content: s.content,
                    collapsed: s.is_closed,
                })
                .collect();
            let id = doc.add_group(p.title, p.color_set.map(Arc::new), leaves);
            if let Some(g) = doc.group_mut(id) {
                g.collapsed = p.is_closed;
            }
        }
        doc
    }

    /// Tolerant rebuild from arbitrary JSON.
    ///
    /// Only a non-object top level is rejected. Missing or mistyped optional
    /// fields fall back to defaults, and non-object entries in `pillars` or
    /// `subsections` are skipped.
    pub fn from_value(value: &Value, colors: ColorAssigner) -> Result<Self, DocumentError> {
        let Some(root) = value.as_object() else {
            return Err(DocumentError::Malformed(
                "top-level value is not an object".to_string(),
            ));
        };

        let get_s = |item: &Value, k: &str| {
            item.get(k)
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
                .unwrap_or_default()
        };
        let get_b = |item: &Value, k: &str| item.get(k).and_then(|v| v.as_bool()).unwrap_or(false);
        let get_list = |item: &Value, k: &str| {
            item.get(k)
                .and_then(|v| v.as_array())
                .cloned()
                .unwrap_or_default()
        };

        let main_title = root
            .get("mainTitle")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        let mut dto = DocumentDto {
            main_title,
            pillars: Vec::new(),
        };

        for p in get_list(value, "pillars") {
            if !p.is_object() {
                continue;
            }

            let color_set = p
                .get("colorSet")
                .filter(|v| !v.is_null())
                .and_then(|v| serde_json::from_value::<ColorSet>(v.clone()).ok());

            let subsections = get_list(&p, "subsections")
                .into_iter()
                .filter(|s| s.is_object())
                .map(|s| SubsectionDto {
                    title: get_s(&s, "title"),
                    content: get_s(&s, "content"),
                    is_closed: get_b(&s, "isClosed"),
                })
                .collect();

            dto.pillars.push(PillarDto {
                title: get_s(&p, "title"),
                color_set,
                is_closed: get_b(&p, "isClosed"),
                subsections,
            });
        }

        Ok(Self::from_dto(dto, colors))
    }
}

impl Default for DocumentTree {
    fn default() -> Self {
        Self::default_template(ColorAssigner::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> DocumentTree {
        let mut doc = DocumentTree::new("T", ColorAssigner::default());
        let g1 = doc.add_group(
            "G1",
            None,
            vec![LeafSeed::new("L1", "body"), LeafSeed::new("L2", "")],
        );
        doc.add_group("G2", None, vec![]);
        doc.toggle_group_collapsed(g1);
        doc
    }

    #[test]
    fn test_add_group_assigns_palette_colors_round_robin() {
        let mut doc = DocumentTree::new("", ColorAssigner::default());
        let ids: Vec<GroupId> = (0..7)
            .map(|i| doc.add_group(format!("G{i}"), None, vec![]))
            .collect();

        let c0 = doc.group(ids[0]).unwrap().color_set().clone();
        let c1 = doc.group(ids[1]).unwrap().color_set().clone();
        let c6 = doc.group(ids[6]).unwrap().color_set().clone();
        assert!(Arc::ptr_eq(&c0, &c6));
        assert!(!Arc::ptr_eq(&c0, &c1));
    }

    #[test]
    fn test_explicit_color_does_not_advance_rotation() {
        let mut doc = DocumentTree::new("", ColorAssigner::default());
        let custom = Arc::new(ColorSet::clone(&crate::palette::default_palette()[3]));
        doc.add_group("custom", Some(custom), vec![]);
        assert_eq!(doc.colors().cursor(), 0);
    }

    #[test]
    fn test_add_leaf_to_missing_group_is_noop() {
        let mut doc = sample();
        let g = doc.groups()[1].id();
        doc.remove_group(g);
        assert!(doc.add_leaf(g, "x", "y").is_none());
        assert_eq!(doc.groups().len(), 1);
    }

    #[test]
    fn test_remove_group_returns_detached_leaves() {
        let mut doc = sample();
        let g = doc.groups()[0].id();
        let removed = doc.remove_group(g).expect("group should exist");
        assert_eq!(removed.leaves().len(), 2);
        assert_eq!(doc.groups().len(), 1);
        assert_eq!(doc.groups()[0].title, "G2");
    }

    #[test]
    fn test_move_is_stable_not_swap() {
        let mut doc = DocumentTree::new("", ColorAssigner::default());
        for t in ["a", "b", "c", "d"] {
            doc.add_group(t, None, vec![]);
        }
        assert!(doc.move_group(0, 2));
        let titles: Vec<&str> = doc.groups().iter().map(|g| g.title.as_str()).collect();
        assert_eq!(titles, vec!["b", "c", "a", "d"]);

        assert!(doc.move_group(3, 0));
        let titles: Vec<&str> = doc.groups().iter().map(|g| g.title.as_str()).collect();
        assert_eq!(titles, vec!["d", "b", "c", "a"]);

        assert!(!doc.move_group(0, 4));
    }

    #[test]
    fn test_move_leaf_within_group() {
        let mut doc = sample();
        let g = doc.groups()[0].id();
        doc.add_leaf(g, "L3", "");
        assert!(doc.move_leaf(g, 2, 0));
        let titles: Vec<&str> = doc.group(g).unwrap().leaves().iter().map(|l| l.title.as_str()).collect();
        assert_eq!(titles, vec!["L3", "L1", "L2"]);
    }

    #[test]
    fn test_toggle_collapsed_flips_in_place() {
        let mut doc = sample();
        let g = doc.groups()[0].id();
        let l = doc.groups()[0].leaves()[0].id();
        assert_eq!(doc.toggle_leaf_collapsed(g, l), Some(true));
        assert_eq!(doc.toggle_leaf_collapsed(g, l), Some(false));
        assert_eq!(doc.toggle_group_collapsed(g), Some(false));
    }

    #[test]
    fn test_round_trip_preserves_structure() {
        let doc = sample();
        let dto = doc.to_dto();
        let rebuilt = DocumentTree::from_dto(dto.clone(), ColorAssigner::default());
        assert_eq!(rebuilt.to_dto(), dto);

        let value = serde_json::to_value(&dto).unwrap();
        let rebuilt = DocumentTree::from_value(&value, ColorAssigner::default()).unwrap();
        assert_eq!(rebuilt.to_dto(), dto);
    }

    #[test]
    fn test_serialize_prefers_live_content() {
        let doc = sample();
        let l1 = doc.groups()[0].leaves()[0].id();
        let dto = doc.serialize_with(|id| (id == l1).then(|| "live".to_string()));
        assert_eq!(dto.pillars[0].subsections[0].content, "live");
        assert_eq!(dto.pillars[0].subsections[1].content, "");
    }

    #[test]
    fn test_from_value_tolerates_missing_fields() {
        let doc = DocumentTree::from_value(&json!({"mainTitle": "X"}), ColorAssigner::default())
            .expect("should import");
        assert_eq!(doc.title, "X");
        assert!(doc.groups().is_empty());

        let doc = DocumentTree::from_value(
            &json!({"pillars": [{"subsections": [{"title": "only title"}]}, 42, {}]}),
            ColorAssigner::default(),
        )
        .expect("should import");
        assert_eq!(doc.title, "");
        assert_eq!(doc.groups().len(), 2);
        assert_eq!(doc.groups()[0].title, "");
        assert!(!doc.groups()[0].collapsed);
        assert_eq!(doc.groups()[0].leaves()[0].content, "");
        assert!(doc.groups()[1].leaves().is_empty());
    }

    #[test]
    fn test_from_value_assigns_colors_only_when_missing() {
        let palette = crate::palette::default_palette();
        let explicit = serde_json::to_value(ColorSet::clone(&palette[4])).unwrap();
        let doc = DocumentTree::from_value(
            &json!({"pillars": [
                {"title": "a", "colorSet": explicit},
                {"title": "b"},
                {"title": "c", "colorSet": "not an object"}
            ]}),
            ColorAssigner::default(),
        )
        .unwrap();

        assert_eq!(**doc.groups()[0].color_set(), *palette[4]);
        assert_eq!(**doc.groups()[1].color_set(), *palette[0]);
        assert_eq!(**doc.groups()[2].color_set(), *palette[1]);
        assert_eq!(doc.colors().cursor(), 2);
    }

    #[test]
    fn test_from_value_rejects_non_object() {
        let err = DocumentTree::from_value(&json!([1, 2]), ColorAssigner::default()).unwrap_err();
        assert!(matches!(err, DocumentError::Malformed(_)));
    }

    #[test]
    fn test_default_template() {
        let doc = DocumentTree::default();
        assert_eq!(doc.title, DEFAULT_DOCUMENT_TITLE);
        assert_eq!(doc.groups().len(), 1);
        assert_eq!(doc.groups()[0].title, "Context");
        assert_eq!(doc.groups()[0].leaves()[0].title, "Role");
    }

    #[test]
    fn test_ids_are_unique_across_groups_and_leaves() {
        let mut doc = sample();
        let g = doc.add_default_group();
        let mut ids = doc.leaf_ids();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 3);
        assert_eq!(doc.group(g).unwrap().leaves()[0].title, FIRST_LEAF_TITLE);
    }
}
