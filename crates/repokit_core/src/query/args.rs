use std::collections::BTreeMap;

use rusqlite::types::Value;

use super::named::BindingError;

/// Argument bound to one `:name` placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Value(Value),
    /// Expanded into one placeholder per element, for `IN (:ids)`.
    List(Vec<Value>),
}

/// Named arguments for a query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    entries: BTreeMap<String, Arg>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn with_list<I, V>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let list = values.into_iter().map(Into::into).collect();
        self.entries.insert(name.into(), Arg::List(list));
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(name.into(), Arg::Value(value.into()));
    }

    pub fn set_arg(&mut self, name: impl Into<String>, arg: Arg) {
        self.entries.insert(name.into(), arg);
    }

    pub fn get(&self, name: &str) -> Option<&Arg> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Row offset of a 1-based `page` of `limit` rows.
///
/// Inputs are not clamped; an offset outside `i64` is an error.
pub fn page_offset(page: i64, limit: i64) -> Result<i64, BindingError> {
    page.checked_sub(1)
        .and_then(|before| before.checked_mul(limit))
        .ok_or(BindingError::OffsetOverflow { page, limit })
}

#[cfg(test)]
mod tests {
    use super::{page_offset, Arg, Args};
    use crate::query::BindingError;
    use rusqlite::types::Value;

    #[test]
    fn page_offset_skips_previous_pages() {
        assert_eq!(page_offset(1, 10), Ok(0));
        assert_eq!(page_offset(3, 25), Ok(50));
        assert_eq!(page_offset(0, 10), Ok(-10));
    }

    #[test]
    fn page_offset_reports_overflow() {
        assert_eq!(
            page_offset(i64::MAX, 2),
            Err(BindingError::OffsetOverflow {
                page: i64::MAX,
                limit: 2
            })
        );
        assert!(page_offset(i64::MIN, 1).is_err());
    }

    #[test]
    fn later_set_replaces_earlier_value() {
        let mut args = Args::new().with("power", 1_i64);
        args.set("power", 2_i64);

        assert_eq!(args.len(), 1);
        assert_eq!(args.get("power"), Some(&Arg::Value(Value::Integer(2))));
    }
}
