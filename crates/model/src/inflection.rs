//! English naming conventions linking class names, resource names and paths.
//!
//! Covers the regular English plural rules plus a small irregular table. This
//! is enough for resource naming; anything exotic should be configured
//! explicitly (`class_name`, `path`).

use heck::{ToSnakeCase, ToUpperCamelCase};

const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("child", "children"),
    ("man", "men"),
    ("woman", "women"),
    ("mouse", "mice"),
];

const UNCOUNTABLE: &[&str] = &["equipment", "information", "metadata", "news", "series", "status"];

/// Singular `snake_case` resource name for a class name.
pub fn resource_name(class_name: &str) -> String {
    class_name.to_snake_case()
}

/// `UpperCamelCase` class name for a (usually plural) association name.
pub fn classify(name: &str) -> String {
    singularize(&name.to_snake_case()).to_upper_camel_case()
}

/// Plural form of the last word of a `snake_case` name.
pub fn pluralize(word: &str) -> String {
    let (head, last) = split_last_word(word);
    if UNCOUNTABLE.contains(&last) {
        return word.to_string();
    }
    if let Some((_, plural)) = IRREGULAR.iter().find(|(s, _)| *s == last) {
        return format!("{head}{plural}");
    }
    let plural = if let Some(stem) = last.strip_suffix('y').filter(|s| ends_with_consonant(s)) {
        format!("{stem}ies")
    } else if ["s", "x", "z", "ch", "sh"].iter().any(|s| last.ends_with(s)) {
        format!("{last}es")
    } else {
        format!("{last}s")
    };
    format!("{head}{plural}")
}

/// Singular form of the last word of a `snake_case` name.
pub fn singularize(word: &str) -> String {
    let (head, last) = split_last_word(word);
    if UNCOUNTABLE.contains(&last) {
        return word.to_string();
    }
    if let Some((singular, _)) = IRREGULAR.iter().find(|(_, p)| *p == last) {
        return format!("{head}{singular}");
    }
    let singular = if let Some(stem) = last.strip_suffix("ies").filter(|s| !s.is_empty()) {
        format!("{stem}y")
    } else if let Some(stem) = ["sses", "xes", "zes", "ches", "shes"]
        .iter()
        .find(|s| last.ends_with(*s))
        .map(|_| &last[..last.len() - 2])
    {
        stem.to_string()
    } else if last.ends_with("ss") || last.ends_with("us") {
        last.to_string()
    } else if let Some(stem) = last.strip_suffix('s') {
        stem.to_string()
    } else {
        last.to_string()
    };
    format!("{head}{singular}")
}

fn split_last_word(word: &str) -> (&str, &str) {
    match word.rfind('_') {
        Some(idx) => word.split_at(idx + 1),
        None => ("", word),
    }
}

fn ends_with_consonant(stem: &str) -> bool {
    stem.chars()
        .last()
        .is_some_and(|c| c.is_ascii_alphabetic() && !"aeiou".contains(c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pluralizes_regular_words() {
        assert_eq!(pluralize("user"), "users");
        assert_eq!(pluralize("category"), "categories");
        assert_eq!(pluralize("day"), "days");
        assert_eq!(pluralize("box"), "boxes");
        assert_eq!(pluralize("match"), "matches");
        assert_eq!(pluralize("address"), "addresses");
        assert_eq!(pluralize("blog_post"), "blog_posts");
    }

    #[test]
    fn singularizes_regular_words() {
        assert_eq!(singularize("users"), "user");
        assert_eq!(singularize("categories"), "category");
        assert_eq!(singularize("boxes"), "box");
        assert_eq!(singularize("addresses"), "address");
        assert_eq!(singularize("microposts"), "micropost");
        assert_eq!(singularize("status"), "status");
    }

    #[test]
    fn irregular_words_round_trip() {
        assert_eq!(pluralize("person"), "people");
        assert_eq!(singularize("people"), "person");
        assert_eq!(singularize("line_children"), "line_child");
    }

    #[test]
    fn classify_and_resource_name() {
        assert_eq!(classify("comments"), "Comment");
        assert_eq!(classify("blog_posts"), "BlogPost");
        assert_eq!(resource_name("InvoiceLine"), "invoice_line");
    }
}
