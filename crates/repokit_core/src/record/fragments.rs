//! Precomputed SQL fragments derived from record metadata.

use super::descriptor::FieldMeta;

/// Column-list fragments shared by every statement a repository issues.
///
/// All lists are comma-joined without spaces and follow field declaration
/// order. Identifiers are double-quoted; placeholders use `:column`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SqlFragments {
    /// Every persisted column, identity included: `"id","name"`.
    pub select_list: String,
    /// Persisted non-identity columns: `"name","power"`.
    pub insert_list: String,
    /// Placeholders matching `insert_list`: `:name,:power`.
    pub insert_placeholders: String,
    /// Assignments for non-identity columns: `"name" = :name,"power" = :power`.
    pub update_assignments: String,
}

impl SqlFragments {
    pub fn from_fields(fields: &[FieldMeta]) -> Self {
        let persisted = || fields.iter().filter_map(|field| field.column);
        let writable = || {
            fields
                .iter()
                .filter(|field| !field.identity)
                .filter_map(|field| field.column)
        };

        Self {
            select_list: join(persisted().map(quote_identifier)),
            insert_list: join(writable().map(quote_identifier)),
            insert_placeholders: join(writable().map(|column| format!(":{column}"))),
            update_assignments: join(
                writable().map(|column| format!("{} = :{column}", quote_identifier(column))),
            ),
        }
    }
}

/// Wraps an identifier in double quotes, doubling embedded quotes.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn join(parts: impl Iterator<Item = String>) -> String {
    parts.collect::<Vec<_>>().join(",")
}

#[cfg(test)]
mod tests {
    use super::{quote_identifier, SqlFragments};
    use crate::record::descriptor::FieldMeta;

    fn field(name: &'static str, column: Option<&'static str>, identity: bool) -> FieldMeta {
        FieldMeta {
            field: name,
            column,
            identity,
        }
    }

    #[test]
    fn fragments_follow_declaration_order_and_skip_unmapped_fields() {
        let fields = [
            field("id", Some("id"), true),
            field("name", Some("name"), false),
            field("value", None, false),
            field("power", Some("power"), false),
        ];

        let fragments = SqlFragments::from_fields(&fields);

        assert_eq!(fragments.select_list, r#""id","name","power""#);
        assert_eq!(fragments.insert_list, r#""name","power""#);
        assert_eq!(fragments.insert_placeholders, ":name,:power");
        assert_eq!(
            fragments.update_assignments,
            r#""name" = :name,"power" = :power"#
        );
    }

    #[test]
    fn identity_only_record_has_empty_write_lists() {
        let fragments = SqlFragments::from_fields(&[field("id", Some("id"), true)]);

        assert_eq!(fragments.select_list, r#""id""#);
        assert!(fragments.insert_list.is_empty());
        assert!(fragments.insert_placeholders.is_empty());
        assert!(fragments.update_assignments.is_empty());
    }

    #[test]
    fn no_persisted_fields_yield_empty_fragments() {
        let fragments = SqlFragments::from_fields(&[field("cache", None, false)]);
        assert_eq!(fragments, SqlFragments::default());
    }

    #[test]
    fn quote_identifier_escapes_embedded_quotes() {
        assert_eq!(quote_identifier("createdAt"), r#""createdAt""#);
        assert_eq!(quote_identifier(r#"we"ird"#), r#""we""ird""#);
    }
}
