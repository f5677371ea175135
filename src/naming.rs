//! Column-name standardisation.
//!
//! Names are turned into lowercase `snake_case`: camelCase boundaries and
//! runs of non-alphanumeric characters become a single underscore, leading
//! digits get a `col_` prefix, and duplicates are numbered.

use std::collections::HashSet;

/// Standardise one column name.
pub fn sanitize_column_name(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    let mut prev: Option<char> = None;
    for c in name.trim().chars() {
        if c.is_alphanumeric() {
            // `dateCrawled` -> `date_crawled`
            if c.is_uppercase() && prev.is_some_and(|p| p.is_lowercase() || p.is_ascii_digit()) {
                result.push('_');
            }
            result.extend(c.to_lowercase());
        } else if !result.ends_with('_') {
            result.push('_');
        }
        prev = Some(c);
    }

    let mut result = result.trim_matches('_').to_owned();

    if result.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        result = format!("col_{result}");
    }

    if result.is_empty() {
        "col".to_owned()
    } else {
        result
    }
}

/// Standardise a whole header, suffixing `_1`, `_2`, ... to keep names unique.
pub fn sanitize_column_names<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    let mut cleaned_names = Vec::with_capacity(names.len());
    let mut seen = HashSet::new();

    for name in names {
        let clean_base = sanitize_column_name(name.as_ref());
        let mut clean = clean_base.clone();
        let mut count = 0;

        while seen.contains(&clean) {
            count += 1;
            clean = format!("{clean_base}_{count}");
        }

        seen.insert(clean.clone());
        cleaned_names.push(clean);
    }
    cleaned_names
}
