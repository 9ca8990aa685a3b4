//! Naming conventions used to fill in undeclared relationship options and table names.

use heck::{ToSnakeCase, ToUpperCamelCase};

const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("child", "children"),
    ("man", "men"),
    ("woman", "women"),
    ("mouse", "mice"),
    ("ox", "oxen"),
];

const UNCOUNTABLE: &[&str] = &[
    "equipment",
    "information",
    "rice",
    "money",
    "species",
    "series",
    "fish",
    "sheep",
    "news",
];

/// Pluralize the last `_`-separated word of a snake_case identifier.
pub fn pluralize(word: &str) -> String {
    let (head, last) = split_last_word(word);
    format!("{head}{}", pluralize_word(last))
}

/// Singularize the last `_`-separated word of a snake_case identifier.
pub fn singularize(word: &str) -> String {
    let (head, last) = split_last_word(word);
    format!("{head}{}", singularize_word(last))
}

/// Default table name for a (possibly `::`-qualified) class name: `Admin::BlogPost` → `blog_posts`.
pub fn table_name_for(class_name: &str) -> String {
    let short = class_name.rsplit("::").next().unwrap_or(class_name);
    pluralize(&short.to_snake_case())
}

/// Default target class for a relation name: `comments` → `Comment`, `author` → `Author`.
pub fn class_name_for(relation_name: &str, collection: bool) -> String {
    let base = if collection {
        singularize(relation_name)
    } else {
        relation_name.to_string()
    };
    base.to_upper_camel_case()
}

/// Default foreign key for a `belongs_to` relation name.
pub fn foreign_key_for(relation_name: &str) -> String {
    format!("{}_id", relation_name.to_snake_case())
}

/// Default join table for a `has_and_belongs_to_many` pair: table names sorted and joined.
pub fn join_table_for(left_table: &str, right_table: &str) -> String {
    let mut pair = [left_table, right_table];
    pair.sort_unstable();
    format!("{}_{}", pair[0], pair[1])
}

fn split_last_word(word: &str) -> (&str, &str) {
    match word.rfind('_') {
        Some(idx) => (&word[..=idx], &word[idx + 1..]),
        None => ("", word),
    }
}

fn pluralize_word(word: &str) -> String {
    if word.is_empty() || UNCOUNTABLE.contains(&word) {
        return word.to_string();
    }
    if let Some((_, plural)) = IRREGULAR.iter().find(|(s, _)| *s == word) {
        return plural.to_string();
    }
    if let Some(stem) = word.strip_suffix('y') {
        if !stem.ends_with(['a', 'e', 'i', 'o', 'u']) {
            return format!("{stem}ies");
        }
    }
    if word.ends_with(['s', 'x', 'z']) || word.ends_with("ch") || word.ends_with("sh") {
        return format!("{word}es");
    }
    format!("{word}s")
}

fn singularize_word(word: &str) -> String {
    if word.is_empty() || UNCOUNTABLE.contains(&word) {
        return word.to_string();
    }
    if let Some((singular, _)) = IRREGULAR.iter().find(|(_, p)| *p == word) {
        return singular.to_string();
    }
    if let Some(stem) = word.strip_suffix("ies") {
        return format!("{stem}y");
    }
    for suffix in ["sses", "xes", "zes", "ches", "shes"] {
        if word.ends_with(suffix) {
            return word[..word.len() - 2].to_string();
        }
    }
    if word.ends_with("ss") {
        return word.to_string();
    }
    word.strip_suffix('s').unwrap_or(word).to_string()
}
