//! Transient selection state for scene composition
//!
//! Characters are multi-select, the background is single-select.
//! Nothing here is persisted.

use std::collections::BTreeSet;

use super::data::Asset;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    characters: BTreeSet<String>,
    background: Option<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the character if unselected, remove it otherwise.
    /// Returns whether it is selected afterwards.
    pub fn toggle_character(&mut self, id: &str) -> bool {
        if self.characters.remove(id) {
            false
        } else {
            self.characters.insert(id.to_string());
            true
        }
    }

    /// Select the character; already selected stays selected
    pub fn select_character(&mut self, id: &str) {
        self.characters.insert(id.to_string());
    }

    pub fn select_background(&mut self, id: &str) {
        self.background = Some(id.to_string());
    }

    /// Select a background; picking the selected one again clears it.
    pub fn toggle_background(&mut self, id: &str) -> bool {
        if self.background.as_deref() == Some(id) {
            self.background = None;
            false
        } else {
            self.background = Some(id.to_string());
            true
        }
    }

    pub fn is_character_selected(&self, id: &str) -> bool {
        self.characters.contains(id)
    }

    pub fn background_id(&self) -> Option<&str> {
        self.background.as_deref()
    }

    /// Selected characters in library order
    pub fn selected_characters<'a>(&self, library: &'a [Asset]) -> Vec<&'a Asset> {
        library
            .iter()
            .filter(|asset| self.characters.contains(&asset.id))
            .collect()
    }

    pub fn selected_background<'a>(&self, library: &'a [Asset]) -> Option<&'a Asset> {
        let id = self.background.as_deref()?;
        library.iter().find(|asset| asset.id == id)
    }

    /// Drop ids that no longer exist (after a delete)
    pub fn retain_existing(&mut self, characters: &[Asset], backgrounds: &[Asset]) {
        self.characters
            .retain(|id| characters.iter().any(|asset| &asset.id == id));
        if let Some(id) = &self.background {
            if !backgrounds.iter().any(|asset| &asset.id == id) {
                self.background = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(id: &str) -> Asset {
        Asset {
            id: id.into(),
            name: id.into(),
            image_url: "u".into(),
            mime_type: "image/png".into(),
        }
    }

    #[test]
    fn test_toggle_twice_restores_selection() {
        let mut selection = Selection::new();
        selection.toggle_character("a");
        let before = selection.clone();

        for id in ["b", "a", "c"] {
            selection.toggle_character(id);
            selection.toggle_character(id);
            assert_eq!(selection, before);
        }
    }

    #[test]
    fn test_select_is_idempotent() {
        let mut selection = Selection::new();
        selection.select_character("a");
        selection.select_character("a");
        selection.select_background("x");
        selection.select_background("x");

        assert!(selection.is_character_selected("a"));
        assert_eq!(selection.background_id(), Some("x"));
        assert_eq!(selection.selected_characters(&[asset("a")]).len(), 1);
    }

    #[test]
    fn test_background_is_single_select() {
        let mut selection = Selection::new();
        assert!(selection.toggle_background("x"));
        assert!(selection.toggle_background("y"));
        assert_eq!(selection.background_id(), Some("y"));
        assert!(!selection.toggle_background("y"));
        assert_eq!(selection.background_id(), None);
    }

    #[test]
    fn test_selected_characters_follow_library_order() {
        let library = vec![asset("c"), asset("a"), asset("b")];
        let mut selection = Selection::new();
        selection.toggle_character("a");
        selection.toggle_character("c");
        selection.toggle_character("ghost");

        let picked: Vec<_> = selection
            .selected_characters(&library)
            .into_iter()
            .map(|a| a.id.as_str())
            .collect();
        assert_eq!(picked, vec!["c", "a"]);
    }

    #[test]
    fn test_retain_existing_drops_deleted_ids() {
        let mut selection = Selection::new();
        selection.toggle_character("a");
        selection.toggle_character("gone");
        selection.toggle_background("bg_gone");

        selection.retain_existing(&[asset("a")], &[asset("bg_1")]);
        assert!(selection.is_character_selected("a"));
        assert!(!selection.is_character_selected("gone"));
        assert_eq!(selection.background_id(), None);
    }
}
