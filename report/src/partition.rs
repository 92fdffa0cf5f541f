use polars::prelude::{col, lit, AnyValue, DataFrame, DataType, IntoLazy, UniqueKeepStrategy};
use std::collections::{BTreeMap, HashSet};

/// Group the values of a numeric column by unique combination of values across tag columns.
///
/// Values in tag columns MUST be in String format. Rows with a null tag or a null value are
/// skipped.
///
/// Returns the values for each combination as a [`BTreeMap`] keyed by the tag values, in the
/// order the tags were given.
pub fn partition_values(
    data_frame: &DataFrame,
    tags: &[&str],
    value: &str,
) -> anyhow::Result<BTreeMap<Vec<String>, Vec<f64>>> {
    if tags.is_empty() {
        anyhow::bail!("At least one tag is required to partition {value}");
    }
    let mut unique_tags = HashSet::with_capacity(tags.len());
    for &tag in tags {
        if !unique_tags.insert(tag) {
            anyhow::bail!("Duplicate tag name found: {}", tag);
        }
    }

    let tag_columns: Vec<String> = tags.iter().map(|&tag| tag.to_string()).collect();
    let combinations = data_frame
        .clone()
        .lazy()
        .select(tags.iter().map(|&tag| col(tag)).collect::<Vec<_>>())
        .unique(Some(tag_columns), UniqueKeepStrategy::Any)
        .collect()?;

    let mut partitioned = BTreeMap::new();

    'rows: for row_idx in 0..combinations.height() {
        let mut filter_expr = None;
        let mut key = Vec::with_capacity(tags.len());

        for &tag in tags {
            let tag_value = match combinations.column(tag)?.get(row_idx)? {
                AnyValue::String(s) => s.to_string(),
                AnyValue::StringOwned(s) => s.into_string(),
                AnyValue::Null => continue 'rows,
                v => anyhow::bail!("In tag column {tag}, found non String value: {v:?}"),
            };

            let tag_filter = col(tag).eq(lit(tag_value.clone()));
            filter_expr = match filter_expr {
                None => Some(tag_filter),
                Some(expr) => Some(expr.and(tag_filter)),
            };
            key.push(tag_value);
        }

        let Some(filter) = filter_expr else {
            continue;
        };
        let filtered = data_frame
            .clone()
            .lazy()
            .filter(filter)
            .select([col(value).cast(DataType::Float64)])
            .collect()?;
        let values = filtered
            .column(value)?
            .f64()?
            .into_iter()
            .flatten()
            .collect::<Vec<_>>();

        if values.is_empty() {
            log::debug!("No {value} values for {key:?}");
            continue;
        }
        partitioned.insert(key, values);
    }

    Ok(partitioned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::df;

    fn create_test_dataframe() -> DataFrame {
        df! [
            "application" => [Some("a"), Some("a"), Some("b"), Some("b"), Some("a"), None],
            "agent" => ["x", "y", "x", "y", "x", "z"],
            "value" => [Some(1.), Some(2.), Some(3.), None, Some(5.), Some(6.)],
            "count" => [6i64, 5, 4, 3, 2, 1],
        ]
        .unwrap()
    }

    #[test]
    fn no_tags_is_an_error() {
        let df = create_test_dataframe();
        assert!(partition_values(&df, &[], "value").is_err());
    }

    #[test]
    fn duplicate_tags_are_an_error() {
        let df = create_test_dataframe();
        assert!(partition_values(&df, &["agent", "agent"], "value").is_err());
    }

    #[test]
    fn nonexistent_tag_is_an_error() {
        let df = create_test_dataframe();
        assert!(partition_values(&df, &["nonexistent"], "value").is_err());
    }

    #[test]
    fn numeric_tag_is_an_error() {
        let df = create_test_dataframe();
        assert!(partition_values(&df, &["count"], "value").is_err());
    }

    #[test]
    fn partition_by_single_tag() -> anyhow::Result<()> {
        let df = create_test_dataframe();
        let partitioned = partition_values(&df, &["application"], "value")?;

        // The row without an application is skipped
        assert_eq!(partitioned.len(), 2);
        assert_eq!(partitioned[&vec!["a".to_string()]], vec![1., 2., 5.]);
        // Null values are dropped
        assert_eq!(partitioned[&vec!["b".to_string()]], vec![3.]);
        Ok(())
    }

    #[test]
    fn partition_by_two_tags() -> anyhow::Result<()> {
        let df = create_test_dataframe();
        let partitioned = partition_values(&df, &["application", "agent"], "count")?;

        let keys = partitioned.keys().cloned().collect::<Vec<_>>();
        assert_eq!(
            keys,
            vec![
                vec!["a".to_string(), "x".to_string()],
                vec!["a".to_string(), "y".to_string()],
                vec!["b".to_string(), "x".to_string()],
                vec!["b".to_string(), "y".to_string()],
            ]
        );
        assert_eq!(
            partitioned[&vec!["a".to_string(), "x".to_string()]],
            vec![6., 2.]
        );
        Ok(())
    }

    #[test]
    fn partition_of_empty_frame_is_empty() -> anyhow::Result<()> {
        let df = df! [
            "application" => Vec::<&str>::new(),
            "value" => Vec::<f64>::new(),
        ]?;
        assert!(partition_values(&df, &["application"], "value")?.is_empty());
        Ok(())
    }
}
