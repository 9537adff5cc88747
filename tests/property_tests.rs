//! Property-based tests for schema derivation and placeholder translation
//!
//! These tests verify that:
//! - Every valid declaration yields exactly one primary key and consistent templates
//! - Declarations with zero or several primary keys are rejected
//! - Placeholder translation numbers every unquoted `?` in order

#[cfg(test)]
mod tests {
    use blogorm::core::db::translate_placeholders;
    use blogorm::{Field, OrmError, SchemaBuilder};
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn arb_field_name() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9_]{0,15}".prop_map(|s: String| s)
    }

    fn arb_field() -> impl Strategy<Value = Field> {
        prop_oneof![
            Just(Field::string()),
            Just(Field::integer()),
            Just(Field::boolean()),
            Just(Field::text()),
            Just(Field::float()),
        ]
    }

    fn arb_fields() -> impl Strategy<Value = Vec<(String, Field)>> {
        prop::collection::vec((arb_field_name(), arb_field()), 0..8).prop_map(|fields| {
            let mut seen = HashSet::new();
            fields
                .into_iter()
                .filter(|(name, _)| !name.starts_with("pk_") && seen.insert(name.clone()))
                .collect()
        })
    }

    proptest! {
        /// A single primary key always builds, with the key first in the projection
        #[test]
        fn prop_single_primary_key_builds(
            pk in "pk_[a-z]{1,8}",
            fields in arb_fields(),
        ) {
            let mut builder = SchemaBuilder::new("Model").field(&pk, Field::string().primary_key());
            for (name, field) in &fields {
                builder = builder.field(name, field.clone());
            }
            let schema = builder.build().unwrap();

            prop_assert_eq!(schema.primary_key(), pk.as_str());
            prop_assert_eq!(schema.columns().len(), fields.len());
            prop_assert_eq!(&schema.field_names()[0], &pk);

            let (_, insert_params) = translate_placeholders(schema.insert_sql());
            prop_assert_eq!(insert_params, fields.len() + 1);
            let (_, update_params) = translate_placeholders(schema.update_sql());
            prop_assert_eq!(update_params, fields.len().max(1) + 1);
            let (_, delete_params) = translate_placeholders(schema.delete_sql());
            prop_assert_eq!(delete_params, 1);
        }

        /// Without a primary key the declaration is rejected
        #[test]
        fn prop_missing_primary_key_rejected(fields in arb_fields()) {
            let mut builder = SchemaBuilder::new("Model");
            for (name, field) in &fields {
                builder = builder.field(name, field.clone());
            }
            let result = builder.build();
            prop_assert!(matches!(result, Err(OrmError::MissingPrimaryKey { .. })), "expected MissingPrimaryKey, got {:?}", result);
        }

        /// Two primary keys are rejected wherever they appear
        #[test]
        fn prop_two_primary_keys_rejected(fields in arb_fields(), split in 0usize..8) {
            let split = split.min(fields.len());
            let mut builder = SchemaBuilder::new("Model").field("pk_a", Field::string().primary_key());
            for (name, field) in &fields[..split] {
                builder = builder.field(name, field.clone());
            }
            builder = builder.field("pk_b", Field::integer().primary_key());
            for (name, field) in &fields[split..] {
                builder = builder.field(name, field.clone());
            }
            let result = builder.build();
            prop_assert!(matches!(result, Err(OrmError::DuplicatePrimaryKey { .. })), "expected DuplicatePrimaryKey, got {:?}", result);
        }

        /// Every unquoted placeholder is numbered in order
        #[test]
        fn prop_placeholders_numbered(pieces in prop::collection::vec("[a-z =,]{0,6}", 1..10)) {
            let sql = pieces.join("?");
            let (translated, count) = translate_placeholders(&sql);
            prop_assert_eq!(count, pieces.len() - 1);
            let expected: String = pieces
                .iter()
                .enumerate()
                .map(|(i, piece)| if i == 0 { piece.clone() } else { format!("?{}{}", i, piece) })
                .collect();
            prop_assert_eq!(translated, expected);
        }
    }
}
