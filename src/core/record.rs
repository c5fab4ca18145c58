use std::fmt::Debug;

/// A record that can take part in an association.
///
/// `PartialEq` is the identity used everywhere a record is compared:
/// pending link/unlink computation, `delete` and `contains`.
pub trait Record: Clone + PartialEq + Debug {
    type Id: Clone + PartialEq + Debug;

    /// Stable identifier of the record
    fn id(&self) -> Self::Id;
}

/// Argument accepted by append and delete: a single record or a
/// (possibly nested) sequence of records.
#[derive(Debug, Clone, PartialEq)]
pub enum Records<R> {
    One(R),
    Many(Vec<Records<R>>),
}

impl<R> Records<R> {
    /// Flatten into a plain sequence, keeping argument order.
    pub fn flatten(self) -> Vec<R> {
        let mut out = Vec::new();
        self.flatten_into(&mut out);
        out
    }

    fn flatten_into(self, out: &mut Vec<R>) {
        match self {
            Records::One(record) => out.push(record),
            Records::Many(items) => {
                for item in items {
                    item.flatten_into(out);
                }
            }
        }
    }
}

impl<R: Record> From<R> for Records<R> {
    fn from(record: R) -> Self {
        Records::One(record)
    }
}

impl<R: Record> From<Vec<R>> for Records<R> {
    fn from(records: Vec<R>) -> Self {
        Records::Many(records.into_iter().map(Records::One).collect())
    }
}

impl<R> From<Vec<Records<R>>> for Records<R> {
    fn from(items: Vec<Records<R>>) -> Self {
        Records::Many(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Tag(u32);

    impl Record for Tag {
        type Id = u32;

        fn id(&self) -> u32 {
            self.0
        }
    }

    #[test]
    fn test_flatten_single() {
        let records: Records<Tag> = Tag(1).into();
        assert_eq!(records.flatten(), vec![Tag(1)]);
    }

    #[test]
    fn test_flatten_nested_keeps_order() {
        let records = Records::Many(vec![
            Records::One(Tag(1)),
            Records::from(vec![Tag(2), Tag(3)]),
            Records::Many(vec![Records::Many(vec![Records::One(Tag(4))])]),
        ]);
        assert_eq!(records.flatten(), vec![Tag(1), Tag(2), Tag(3), Tag(4)]);
    }

    #[test]
    fn test_flatten_empty() {
        let records: Records<Tag> = Vec::<Tag>::new().into();
        assert!(records.flatten().is_empty());
    }
}
