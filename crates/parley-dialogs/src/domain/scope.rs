//! Scoped state paths.
//!
//! A path names a scope and a dotted location below it, e.g.
//! `user.profile.name`. Unqualified paths, and paths starting with `$`,
//! address the `dialog` scope. This module parses paths and applies them to
//! a single map; choosing which map a scope refers to is the context's job.

use std::fmt;

use parley_core::error::DialogError;
use serde_json::{Map, Value};

/// Where a standard dialog finds the options it was begun with.
pub const DIALOG_OPTIONS: &str = "dialog.options";
/// Where a command dialog finds its options, so it does not overwrite the
/// options of the dialog whose memory it shares.
pub const STEP_OPTIONS: &str = "dialog.step.options";
/// The inbound activity of the current turn.
pub const TURN_ACTIVITY: &str = "turn.activity";
/// The id most recently passed to `replace_dialog` this turn.
pub const TURN_REPEAT_DIALOG_ID: &str = "turn.repeatDialogId";

/// The five state scopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Read-only configuration.
    Settings,
    /// Persistent per-user state.
    User,
    /// Persistent per-conversation state.
    Conversation,
    /// Memory of the active dialog frame.
    Dialog,
    /// Ephemeral state discarded after the turn.
    Turn,
}

impl Scope {
    const ALL: [Self; 5] = [
        Self::Settings,
        Self::User,
        Self::Conversation,
        Self::Dialog,
        Self::Turn,
    ];

    /// The qualifier used in paths.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Settings => "settings",
            Self::User => "user",
            Self::Conversation => "conversation",
            Self::Dialog => "dialog",
            Self::Turn => "turn",
        }
    }

    /// Returns `true` for scopes that reject writes.
    #[must_use]
    pub const fn is_read_only(self) -> bool {
        matches!(self, Self::Settings)
    }

    fn from_qualifier(qualifier: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|scope| scope.name().eq_ignore_ascii_case(qualifier))
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A parsed path: a scope plus the keys below it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatePath<'p> {
    raw: &'p str,
    /// The scope the path addresses.
    pub scope: Scope,
    /// Keys below the scope root; empty when the path names the whole scope.
    pub segments: Vec<&'p str>,
}

impl<'p> StatePath<'p> {
    /// Parses a path.
    ///
    /// # Errors
    ///
    /// Returns `DialogError::InvalidPath` for empty paths or paths with
    /// empty segments such as `user..name`.
    pub fn parse(raw: &'p str) -> Result<Self, DialogError> {
        let path = raw.trim();
        if path.is_empty() {
            return Err(DialogError::InvalidPath(raw.to_owned()));
        }

        let (scope, rest) = if let Some(rest) = path.strip_prefix('$') {
            (Scope::Dialog, Some(rest))
        } else {
            match path.split_once('.') {
                Some((head, rest)) => match Scope::from_qualifier(head) {
                    Some(scope) => (scope, Some(rest)),
                    None => (Scope::Dialog, Some(path)),
                },
                None => match Scope::from_qualifier(path) {
                    Some(scope) => (scope, None),
                    None => (Scope::Dialog, Some(path)),
                },
            }
        };

        let segments: Vec<&str> = rest.map(|r| r.split('.').collect()).unwrap_or_default();
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(DialogError::InvalidPath(raw.to_owned()));
        }

        Ok(Self {
            raw,
            scope,
            segments,
        })
    }

    /// Returns `true` if the path was written with an explicit `dialog.` or
    /// `$` qualifier and names a key inside the scope.
    #[must_use]
    pub fn is_explicit_dialog_property(&self) -> bool {
        let raw = self.raw.trim();
        self.scope == Scope::Dialog
            && !self.segments.is_empty()
            && (raw.starts_with('$')
                || raw
                    .get(..7)
                    .is_some_and(|head| head.eq_ignore_ascii_case("dialog.")))
    }

    /// Reads the value at this path from `map`.
    #[must_use]
    pub fn read(&self, map: &Map<String, Value>) -> Option<Value> {
        let Some((first, rest)) = self.segments.split_first() else {
            return Some(Value::Object(map.clone()));
        };
        let mut value = map.get(*first)?;
        for segment in rest {
            value = value.as_object()?.get(*segment)?;
        }
        Some(value.clone())
    }

    /// Writes `value` at this path into `map`, creating intermediate
    /// objects as needed.
    ///
    /// # Errors
    ///
    /// Returns `DialogError::InvalidPath` if the path names the whole scope
    /// or an intermediate key holds a non-object value.
    pub fn write(&self, map: &mut Map<String, Value>, value: Value) -> Result<(), DialogError> {
        let Some((last, parents)) = self.segments.split_last() else {
            return Err(DialogError::InvalidPath(self.raw.to_owned()));
        };
        let mut current = map;
        for segment in parents {
            let entry = current
                .entry((*segment).to_owned())
                .or_insert_with(|| Value::Object(Map::new()));
            current = match entry {
                Value::Object(inner) => inner,
                _ => return Err(DialogError::InvalidPath(self.raw.to_owned())),
            };
        }
        current.insert((*last).to_owned(), value);
        Ok(())
    }

    /// Removes and returns the value at this path.
    ///
    /// # Errors
    ///
    /// Returns `DialogError::InvalidPath` if the path names the whole scope.
    pub fn remove(&self, map: &mut Map<String, Value>) -> Result<Option<Value>, DialogError> {
        let Some((last, parents)) = self.segments.split_last() else {
            return Err(DialogError::InvalidPath(self.raw.to_owned()));
        };
        let mut current = map;
        for segment in parents {
            match current.get_mut(*segment).and_then(Value::as_object_mut) {
                Some(inner) => current = inner,
                None => return Ok(None),
            }
        }
        Ok(current.remove(*last))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_qualified_path_selects_scope() {
        let path = StatePath::parse("user.profile.name").unwrap();

        assert_eq!(path.scope, Scope::User);
        assert_eq!(path.segments, vec!["profile", "name"]);
    }

    #[test]
    fn test_unqualified_and_dollar_paths_default_to_dialog() {
        let plain = StatePath::parse("answer").unwrap();
        let dollar = StatePath::parse("$answer").unwrap();
        let unknown_head = StatePath::parse("profile.name").unwrap();

        assert_eq!(plain.scope, Scope::Dialog);
        assert_eq!(dollar.scope, Scope::Dialog);
        assert_eq!(dollar.segments, vec!["answer"]);
        assert_eq!(unknown_head.scope, Scope::Dialog);
        assert_eq!(unknown_head.segments, vec!["profile", "name"]);
    }

    #[test]
    fn test_bare_qualifier_names_whole_scope() {
        let path = StatePath::parse("conversation").unwrap();

        assert_eq!(path.scope, Scope::Conversation);
        assert!(path.segments.is_empty());
    }

    #[test]
    fn test_empty_segments_are_rejected() {
        assert!(matches!(
            StatePath::parse("user..name"),
            Err(DialogError::InvalidPath(_))
        ));
        assert!(matches!(
            StatePath::parse("  "),
            Err(DialogError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_explicit_dialog_property_detection() {
        assert!(StatePath::parse("dialog.name").unwrap().is_explicit_dialog_property());
        assert!(StatePath::parse("$name").unwrap().is_explicit_dialog_property());
        assert!(!StatePath::parse("name").unwrap().is_explicit_dialog_property());
        assert!(!StatePath::parse("user.name").unwrap().is_explicit_dialog_property());
    }

    #[test]
    fn test_write_creates_intermediate_objects_and_read_finds_them() {
        let mut map = Map::new();
        let path = StatePath::parse("user.profile.name").unwrap();

        path.write(&mut map, json!("Ada")).unwrap();

        assert_eq!(Value::Object(map.clone()), json!({"profile": {"name": "Ada"}}));
        assert_eq!(path.read(&map), Some(json!("Ada")));
    }

    #[test]
    fn test_write_through_scalar_is_rejected() {
        let mut map = Map::new();
        map.insert("profile".into(), json!(7));

        let result = StatePath::parse("user.profile.name")
            .unwrap()
            .write(&mut map, json!("Ada"));

        assert!(matches!(result, Err(DialogError::InvalidPath(_))));
    }

    #[test]
    fn test_remove_returns_previous_value() {
        let mut map = Map::new();
        let path = StatePath::parse("turn.a.b").unwrap();
        path.write(&mut map, json!(1)).unwrap();

        assert_eq!(path.remove(&mut map).unwrap(), Some(json!(1)));
        assert_eq!(path.read(&map), None);
        assert_eq!(
            StatePath::parse("turn.x.y").unwrap().remove(&mut map).unwrap(),
            None
        );
    }
}
