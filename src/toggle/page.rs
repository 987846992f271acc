use std::collections::BTreeSet;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use super::request::BookmarkState;

/// Generic class every bookmark icon carries.
pub const ICON_CLASS: &str = "bi";
pub const NOT_BOOKMARKED_CLASS: &str = "bi-bookmark";
pub const BOOKMARKED_CLASS: &str = "bi-bookmark-check-fill";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ButtonId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IconId(pub usize);

/// Which icons a confirmed toggle repaints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum IconScope {
    /// Every element carrying the generic icon class.
    #[default]
    Page,
    /// Only the icon inside the clicked button.
    Button,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Icon {
    pub id: IconId,
    classes: BTreeSet<String>,
}

impl Icon {
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.contains(class)
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.classes.iter().map(String::as_str)
    }

    pub fn class_attr(&self) -> String {
        self.classes().collect::<Vec<_>>().join(" ")
    }

    pub fn state(&self) -> Option<BookmarkState> {
        if self.has_class(BOOKMARKED_CLASS) {
            Some(BookmarkState::Bookmarked)
        } else if self.has_class(NOT_BOOKMARKED_CLASS) {
            Some(BookmarkState::Removed)
        } else {
            None
        }
    }

    fn swap_class(&mut self, from: &str, to: &str) {
        self.classes.remove(from);
        self.classes.insert(to.to_string());
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookmarkButton {
    pub id: ButtonId,
    /// `data-url`; `None` when the attribute is absent.
    pub url: Option<String>,
    /// `data-pk`; `None` when the attribute is absent.
    pub post_pk: Option<String>,
    pub icon: IconId,
}

/// The parts of a rendered page the toggle handler reads and repaints.
#[derive(Debug, Clone, Default)]
pub struct Page {
    buttons: Vec<BookmarkButton>,
    icons: Vec<Icon>,
    csrf_input: Option<String>,
}

impl Page {
    pub fn new(csrf_input: Option<String>) -> Self {
        Page {
            buttons: vec![],
            icons: vec![],
            csrf_input,
        }
    }

    /// Adds a button together with its icon, rendered in `state`.
    pub fn add_button(
        &mut self,
        url: Option<&str>,
        post_pk: Option<&str>,
        state: BookmarkState,
    ) -> ButtonId {
        let icon = self.add_icon(state);
        let id = ButtonId(self.buttons.len());
        self.buttons.push(BookmarkButton {
            id,
            url: url.map(str::to_string),
            post_pk: post_pk.map(str::to_string),
            icon,
        });
        id
    }

    /// Adds a free-standing icon that belongs to no button.
    pub fn add_icon(&mut self, state: BookmarkState) -> IconId {
        let id = IconId(self.icons.len());
        let mut classes = BTreeSet::new();
        classes.insert(ICON_CLASS.to_string());
        classes.insert(state.icon_class().to_string());
        self.icons.push(Icon { id, classes });
        id
    }

    pub fn button(&self, id: ButtonId) -> Option<&BookmarkButton> {
        self.buttons.get(id.0)
    }

    pub fn buttons(&self) -> &[BookmarkButton] {
        &self.buttons
    }

    pub fn icon(&self, id: IconId) -> Option<&Icon> {
        self.icons.get(id.0)
    }

    pub fn icons(&self) -> &[Icon] {
        &self.icons
    }

    /// Value of the page's `csrfmiddlewaretoken` input, empty when the page has none.
    pub fn csrf_token(&self) -> String {
        self.csrf_input.clone().unwrap_or_default()
    }

    /// Repaints icons to show `state`. Returns how many icons were touched.
    pub fn apply(&mut self, state: BookmarkState, scope: IconScope, button: ButtonId) -> usize {
        let (from, to) = match state {
            BookmarkState::Bookmarked => (NOT_BOOKMARKED_CLASS, BOOKMARKED_CLASS),
            BookmarkState::Removed => (BOOKMARKED_CLASS, NOT_BOOKMARKED_CLASS),
        };

        match scope {
            IconScope::Page => {
                let mut touched = 0;
                for icon in self.icons.iter_mut().filter(|i| i.has_class(ICON_CLASS)) {
                    icon.swap_class(from, to);
                    touched += 1;
                }
                touched
            }
            IconScope::Button => {
                let Some(icon_id) = self.button(button).map(|b| b.icon) else {
                    return 0;
                };
                match self.icons.get_mut(icon_id.0) {
                    Some(icon) => {
                        icon.swap_class(from, to);
                        1
                    }
                    None => 0,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_button_page() -> (Page, ButtonId, ButtonId) {
        let mut page = Page::new(Some("tok".to_string()));
        let a = page.add_button(Some("/posts/bookmark/"), Some("1"), BookmarkState::Removed);
        let b = page.add_button(Some("/posts/bookmark/"), Some("2"), BookmarkState::Removed);
        (page, a, b)
    }

    #[test]
    fn test_new_icon_classes() {
        let (page, a, _) = two_button_page();
        let icon = page.icon(page.button(a).unwrap().icon).unwrap();
        assert_eq!(icon.class_attr(), "bi bi-bookmark");
        assert_eq!(icon.state(), Some(BookmarkState::Removed));
    }

    #[test]
    fn test_page_scope_repaints_every_icon() {
        let (mut page, a, _) = two_button_page();
        page.add_icon(BookmarkState::Removed);

        assert_eq!(page.apply(BookmarkState::Bookmarked, IconScope::Page, a), 3);
        for icon in page.icons() {
            assert_eq!(icon.class_attr(), "bi bi-bookmark-check-fill");
        }
    }

    #[test]
    fn test_button_scope_repaints_only_own_icon() {
        let (mut page, a, b) = two_button_page();

        assert_eq!(page.apply(BookmarkState::Bookmarked, IconScope::Button, b), 1);

        let icon_a = page.icon(page.button(a).unwrap().icon).unwrap();
        let icon_b = page.icon(page.button(b).unwrap().icon).unwrap();
        assert_eq!(icon_a.state(), Some(BookmarkState::Removed));
        assert_eq!(icon_b.state(), Some(BookmarkState::Bookmarked));
    }

    #[test]
    fn test_new_class_added_even_without_old_one() {
        let (mut page, a, _) = two_button_page();
        page.apply(BookmarkState::Removed, IconScope::Button, a);
        let icon = page.icon(page.button(a).unwrap().icon).unwrap();
        assert_eq!(icon.class_attr(), "bi bi-bookmark");
    }

    #[test]
    fn test_unknown_button_touches_nothing() {
        let (mut page, _, _) = two_button_page();
        assert_eq!(page.apply(BookmarkState::Bookmarked, IconScope::Button, ButtonId(9)), 0);
    }

    #[test]
    fn test_default_scope_repaints_every_icon() {
        let (mut page, a, _) = two_button_page();
        assert_eq!(IconScope::default(), IconScope::Page);
        assert_eq!(page.apply(BookmarkState::Bookmarked, IconScope::default(), a), 2);
        assert!(page.icons().iter().all(|i| i.state() == Some(BookmarkState::Bookmarked)));
    }

    #[test]
    fn test_missing_csrf_input_is_empty() {
        assert_eq!(Page::new(None).csrf_token(), "");
        assert_eq!(Page::new(Some("abc".into())).csrf_token(), "abc");
    }
}
