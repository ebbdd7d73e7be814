use std::fmt;

use downcast_rs::{DowncastSync, impl_downcast};

/// Type-erased object exchanged with custom report items, typically the
/// design-time property instance of an item. Use the downcast helpers to
/// recover the concrete type.
pub trait OpaqueObject: DowncastSync + fmt::Debug {}
impl_downcast!(sync OpaqueObject);

/// A list of opaque objects, e.g. extension specific creation parameters.
#[derive(Debug, Default)]
pub struct OpaqueList(pub Vec<Box<dyn OpaqueObject>>);

impl OpaqueList {
    /// Returns the first entry of type `T`.
    pub fn find<T: OpaqueObject>(&self) -> Option<&T> {
        self.0.iter().find_map(|obj| obj.downcast_ref::<T>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Threshold(u32);
    impl OpaqueObject for Threshold {}

    #[derive(Debug)]
    struct Label;
    impl OpaqueObject for Label {}

    #[test]
    fn find_downcasts_by_type() {
        let list = OpaqueList(vec![Box::new(Label), Box::new(Threshold(3))]);
        assert_eq!(list.find::<Threshold>(), Some(&Threshold(3)));

        let boxed: Box<dyn OpaqueObject> = Box::new(Label);
        assert!(boxed.downcast_ref::<Threshold>().is_none());
        assert!(boxed.is::<Label>());
    }
}
