//! Generic list wrapper
use crate::metadata::{ListMeta, TypeMeta};
use serde::{Deserialize, Serialize};

/// A list of objects as returned by list and deletecollection calls
///
/// `MachineList` on the wire. Iterate it directly or take `items`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ObjectList<T>
where
    T: Clone,
{
    /// `apiVersion` and `kind`; not always sent back by the server
    #[serde(flatten, default)]
    pub types: Option<TypeMeta>,

    /// Carries the list `resourceVersion` and the `continue` token for paging
    #[serde(default)]
    pub metadata: ListMeta,

    /// The objects themselves
    #[serde(bound(deserialize = "Vec<T>: Deserialize<'de>"))]
    pub items: Vec<T>,
}

impl<T: Clone> ObjectList<T> {
    /// Iterate over the items by reference
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    /// Iterate over the items mutably
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.items.iter_mut()
    }

    /// Continue token for fetching the next page, if the server cut the list short
    pub fn continue_token(&self) -> Option<&str> {
        self.metadata.continue_.as_deref().filter(|t| !t.is_empty())
    }
}

impl<T: Clone> IntoIterator for ObjectList<T> {
    type IntoIter = ::std::vec::IntoIter<Self::Item>;
    type Item = T;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T: Clone> IntoIterator for &'a ObjectList<T> {
    type IntoIter = ::std::slice::Iter<'a, T>;
    type Item = &'a T;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod test {
    use super::ObjectList;
    use crate::Machine;

    #[test]
    fn machine_list_with_continue_token() {
        let body = serde_json::json!({
            "apiVersion": "machine.sapcloud.io/v1alpha1",
            "kind": "MachineList",
            "metadata": { "resourceVersion": "1234", "continue": "eyJ2IjoibWV0YS5rOHMuaW8vdjEifQ" },
            "items": [
                { "apiVersion": "machine.sapcloud.io/v1alpha1", "kind": "Machine",
                  "metadata": { "name": "m-1" }, "spec": { "class": { "kind": "MachineClass", "name": "c" } } },
                { "apiVersion": "machine.sapcloud.io/v1alpha1", "kind": "Machine",
                  "metadata": { "name": "m-2" }, "spec": { "class": { "kind": "MachineClass", "name": "c" } } }
            ]
        });
        let list: ObjectList<Machine> = serde_json::from_value(body).unwrap();
        assert_eq!(list.types.as_ref().unwrap().kind, "MachineList");
        assert_eq!(list.continue_token(), Some("eyJ2IjoibWV0YS5rOHMuaW8vdjEifQ"));
        let names: Vec<_> = list.iter().filter_map(|m| m.metadata.name.clone()).collect();
        assert_eq!(names, vec!["m-1", "m-2"]);
    }

    #[test]
    fn empty_list_without_types() {
        let list: ObjectList<Machine> = serde_json::from_str(r#"{"metadata":{},"items":[]}"#).unwrap();
        assert!(list.types.is_none());
        assert!(list.continue_token().is_none());
        assert_eq!(list.into_iter().count(), 0);
    }
}
