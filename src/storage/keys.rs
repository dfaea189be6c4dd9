//! Key scheme for primary records and secondary indexes.
//!
//! Keys are tuples encoded into bytes that sort the same way the tuples do.
//! Each part is self-terminating:
//!
//! ```text
//! string: 0x02 <bytes, 0x00 escaped as 0x00 0xFF> 0x00
//! false:  0x26
//! true:   0x27
//! ```
//!
//! Because every part carries its own terminator, the encoding of
//! `["todo_by_project", "ab"]` is never a byte prefix of
//! `["todo_by_project", "abc", id]`, so prefix scans over one
//! (dimension, value) pair never pick up entries of another.
//!
//! Layout:
//!
//! ```text
//! ["todo", id]                          -> Todo (JSON)
//! ["todo_by_project", project, id]      -> id (JSON)
//! ["todo_by_context", context, id]      -> id (JSON)
//! ["todo_by_priority", priority|"", id] -> id (JSON)
//! ["todo_by_completion", bool, id]      -> id (JSON)
//! ```

use crate::models::Priority;
use std::fmt;

/// Namespace of primary records.
pub const TODO_NAMESPACE: &str = "todo";
/// Namespace of the project index.
pub const PROJECT_INDEX_NAMESPACE: &str = "todo_by_project";
/// Namespace of the context index.
pub const CONTEXT_INDEX_NAMESPACE: &str = "todo_by_context";
/// Namespace of the priority index.
pub const PRIORITY_INDEX_NAMESPACE: &str = "todo_by_priority";
/// Namespace of the completion index.
pub const COMPLETION_INDEX_NAMESPACE: &str = "todo_by_completion";

/// Bucket value used in the priority index for records without a priority.
pub const NO_PRIORITY: &str = "";

const STRING_CODE: u8 = 0x02;
const FALSE_CODE: u8 = 0x26;
const TRUE_CODE: u8 = 0x27;
const ESCAPE: u8 = 0xFF;

/// A decoded element of a key tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyPart {
    String(String),
    Bool(bool),
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPart::String(s) => write!(f, "{:?}", s),
            KeyPart::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// Error returned when bytes are not a valid encoded key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyDecodeError {
    #[error("unknown type code 0x{code:02x} at offset {offset}")]
    UnknownTypeCode { code: u8, offset: usize },

    #[error("unterminated string part starting at offset {0}")]
    Unterminated(usize),

    #[error("string part is not valid UTF-8")]
    InvalidUtf8,
}

/// An encoded store key.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key(Vec<u8>);

impl Key {
    /// The empty key; every key starts with it.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Wrap bytes read back from a store.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Append a string part.
    pub fn push_str(mut self, part: &str) -> Self {
        self.0.push(STRING_CODE);
        for &byte in part.as_bytes() {
            self.0.push(byte);
            if byte == 0x00 {
                self.0.push(ESCAPE);
            }
        }
        self.0.push(0x00);
        self
    }

    /// Append a boolean part.
    pub fn push_bool(mut self, part: bool) -> Self {
        self.0.push(if part { TRUE_CODE } else { FALSE_CODE });
        self
    }

    /// A new key with `id` appended, e.g. an index entry under its prefix.
    pub fn child(&self, id: &str) -> Key {
        self.clone().push_str(id)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// True when `prefix` is a leading run of whole parts of this key.
    ///
    /// A byte match followed by the escape byte means the prefix ended
    /// inside an escaped NUL of a longer string, not on a part boundary.
    pub fn starts_with(&self, prefix: &Key) -> bool {
        self.0.starts_with(&prefix.0) && self.0.get(prefix.0.len()) != Some(&ESCAPE)
    }

    /// Exclusive upper bound of the keys that start with this prefix.
    ///
    /// Parts never begin with 0xFF, so every child key sorts below
    /// `prefix ‖ 0xFF`.
    pub fn prefix_end(&self) -> Vec<u8> {
        let mut end = self.0.clone();
        end.push(ESCAPE);
        end
    }

    /// Decode the key back into its parts.
    pub fn decode(&self) -> Result<Vec<KeyPart>, KeyDecodeError> {
        let bytes = &self.0;
        let mut parts = Vec::new();
        let mut pos = 0;

        while pos < bytes.len() {
            match bytes[pos] {
                STRING_CODE => {
                    let start = pos;
                    pos += 1;
                    let mut raw = Vec::new();
                    loop {
                        match bytes.get(pos) {
                            None => return Err(KeyDecodeError::Unterminated(start)),
                            Some(0x00) if bytes.get(pos + 1) == Some(&ESCAPE) => {
                                raw.push(0x00);
                                pos += 2;
                            }
                            Some(0x00) => {
                                pos += 1;
                                break;
                            }
                            Some(&byte) => {
                                raw.push(byte);
                                pos += 1;
                            }
                        }
                    }
                    let s = String::from_utf8(raw).map_err(|_| KeyDecodeError::InvalidUtf8)?;
                    parts.push(KeyPart::String(s));
                }
                FALSE_CODE => {
                    parts.push(KeyPart::Bool(false));
                    pos += 1;
                }
                TRUE_CODE => {
                    parts.push(KeyPart::Bool(true));
                    pos += 1;
                }
                code => return Err(KeyDecodeError::UnknownTypeCode { code, offset: pos }),
            }
        }

        Ok(parts)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.decode() {
            Ok(parts) => {
                write!(f, "[")?;
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", part)?;
                }
                write!(f, "]")
            }
            Err(_) => {
                for byte in &self.0 {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({})", self)
    }
}

/// Prefix covering every primary record.
pub fn todo_prefix() -> Key {
    Key::root().push_str(TODO_NAMESPACE)
}

/// Primary key of a record.
pub fn todo_key(id: &str) -> Key {
    todo_prefix().push_str(id)
}

/// Index prefix for one project; append an id for the entry key.
pub fn project_index_key(project: &str) -> Key {
    Key::root().push_str(PROJECT_INDEX_NAMESPACE).push_str(project)
}

/// Index prefix for one context.
pub fn context_index_key(context: &str) -> Key {
    Key::root().push_str(CONTEXT_INDEX_NAMESPACE).push_str(context)
}

/// Index prefix for one priority. `None` maps to the [`NO_PRIORITY`] bucket.
pub fn priority_index_key(priority: Option<Priority>) -> Key {
    let bucket = priority.map(|p| p.as_str());
    Key::root()
        .push_str(PRIORITY_INDEX_NAMESPACE)
        .push_str(bucket.as_deref().unwrap_or(NO_PRIORITY))
}

/// Index prefix for one completion state.
pub fn completion_index_key(completed: bool) -> Key {
    Key::root()
        .push_str(COMPLETION_INDEX_NAMESPACE)
        .push_bool(completed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_todo_key_decodes() {
        let key = todo_key("abc");
        assert_eq!(
            key.decode().unwrap(),
            vec![
                KeyPart::String("todo".into()),
                KeyPart::String("abc".into())
            ]
        );
        assert_eq!(key.to_string(), r#"["todo","abc"]"#);
    }

    #[test]
    fn test_index_entry_under_its_prefix() {
        let prefix = project_index_key("home");
        let entry = prefix.child("id-1");
        assert!(entry.starts_with(&prefix));
        assert!(!entry.starts_with(&todo_prefix()));
    }

    #[test]
    fn test_value_prefixes_are_disjoint() {
        // "ab" must not scan into "abc"
        let short = project_index_key("ab");
        let long = project_index_key("abc").child("id");
        assert!(!long.starts_with(&short));

        // the empty bucket must not scan into lettered buckets
        let none = priority_index_key(None);
        let a = priority_index_key(Priority::new('A')).child("id");
        assert!(!a.starts_with(&none));
    }

    #[test]
    fn test_namespaces_are_disjoint() {
        let keys = [
            todo_prefix(),
            project_index_key("x"),
            context_index_key("x"),
            priority_index_key(None),
            completion_index_key(true),
        ];
        for (i, a) in keys.iter().enumerate() {
            for (j, b) in keys.iter().enumerate() {
                if i != j {
                    assert!(!a.child("id").starts_with(b), "{} overlaps {}", a, b);
                }
            }
        }
        // "todo" is a string prefix of "todo_by_project" but not a key prefix
        assert!(!project_index_key("x").starts_with(&todo_prefix()));
    }

    #[test]
    fn test_completion_buckets_differ() {
        assert_ne!(completion_index_key(true), completion_index_key(false));
        assert_eq!(
            completion_index_key(false).decode().unwrap()[1],
            KeyPart::Bool(false)
        );
    }

    #[test]
    fn test_nul_bytes_are_escaped() {
        let key = project_index_key("a\0b").child("id");
        let parts = key.decode().unwrap();
        assert_eq!(parts[1], KeyPart::String("a\0b".into()));
        assert!(!key.starts_with(&project_index_key("a")));
    }

    #[test]
    fn test_ordering_matches_tuple_order() {
        assert!(todo_key("a") < todo_key("b"));
        assert!(todo_key("a") < todo_key("aa"));
        assert!(priority_index_key(None) < priority_index_key(Priority::new('A')));
    }

    #[test]
    fn test_prefix_end() {
        let prefix = todo_prefix();
        let end = prefix.prefix_end();
        assert!(todo_key("zzz").as_bytes() < end.as_slice());
        assert!(todo_key("\u{10FFFF}").as_bytes() < end.as_slice());
        assert!(prefix.as_bytes() < end.as_slice());
        assert!(project_index_key("x").as_bytes() > end.as_slice());
        // an escaped NUL continuation of "a" sorts past the end of ["a"]
        let escaped = project_index_key("a\0b");
        assert!(escaped.as_bytes() >= project_index_key("a").prefix_end().as_slice());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(Key::from_bytes(vec![0x99]).decode().is_err());
        assert!(Key::from_bytes(vec![STRING_CODE, b'a']).decode().is_err());
    }
}
