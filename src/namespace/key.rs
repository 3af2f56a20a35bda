use std::borrow::Borrow;
use std::fmt;

/// The key a store unit's state and methods live under in a snapshot.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NamespaceKey(String);

impl NamespaceKey {
    /// Derive a key from a unit's type name.
    ///
    /// The first character is lower-cased and the rest is kept as is. An empty
    /// name yields an empty key.
    ///
    /// ```
    /// use stackstore::NamespaceKey;
    ///
    /// assert_eq!(NamespaceKey::derive("TodoList").as_str(), "todoList");
    /// assert_eq!(NamespaceKey::derive("counter").as_str(), "counter");
    /// ```
    pub fn derive(type_name: &str) -> Self {
        let mut chars = type_name.chars();
        match chars.next() {
            Some(first) => {
                let mut key = String::with_capacity(type_name.len());
                key.extend(first.to_lowercase());
                key.push_str(chars.as_str());
                Self(key)
            }
            None => Self(String::new()),
        }
    }

    /// The key as it appears in the snapshot.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NamespaceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NamespaceKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for NamespaceKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for NamespaceKey {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for NamespaceKey {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Short name of a type: the last path segment, generic arguments stripped.
///
/// `my_app::stores::Counter<u32>` becomes `Counter`.
pub fn unit_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn lowercases_only_the_first_letter() {
        assert_eq!(NamespaceKey::derive("Counter"), "counter");
        assert_eq!(NamespaceKey::derive("HTTPClient"), "hTTPClient");
        assert_eq!(NamespaceKey::derive("x"), "x");
    }

    #[test]
    fn empty_name_gives_empty_key() {
        assert_eq!(NamespaceKey::derive(""), "");
    }

    #[test]
    fn non_ascii_first_letter() {
        assert_eq!(NamespaceKey::derive("Éclair"), "éclair");
    }

    #[test]
    fn type_name_strips_path_and_generics() {
        struct Plain;
        #[allow(dead_code)]
        struct Wrapper<T>(T);

        assert_eq!(unit_type_name::<Plain>(), "Plain");
        assert_eq!(unit_type_name::<Wrapper<Plain>>(), "Wrapper");
        assert_eq!(unit_type_name::<u32>(), "u32");
    }

    proptest! {
        #[test]
        fn tail_is_preserved(first in "[A-Z]", rest in "[a-zA-Z0-9_]{0,16}") {
            let name = format!("{first}{rest}");
            let key = NamespaceKey::derive(&name);
            prop_assert_eq!(&key.as_str()[1..], rest.as_str());
            prop_assert_eq!(key.as_str()[..1].to_string(), first.to_lowercase());
        }

        #[test]
        fn derivation_is_idempotent(name in "[a-zA-Z][a-zA-Z0-9]{0,16}") {
            let once = NamespaceKey::derive(&name);
            let twice = NamespaceKey::derive(once.as_str());
            prop_assert_eq!(once, twice);
        }
    }
}
