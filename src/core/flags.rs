// src/core/flags.rs

use std::collections::BTreeMap;
use thiserror::Error;

use super::parameter::FlagData;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Caracteres de flag no reconocidos: '{unmatched}'")]
pub struct FlagError {
    pub unmatched: String,
}

#[derive(Debug, Clone, Default)]
struct TrieNode {
    children: BTreeMap<char, usize>,
    /// Índice en `FlagExtractor::flags` si algún alias termina aquí.
    flag: Option<usize>,
}

/// Trie de caracteres con todos los alias de los flags de un uso.
///
/// Permite partir un token combinado (`-sd`) en los flags que codifica, aun
/// cuando los alias tengan más de un carácter.
#[derive(Debug, Clone)]
pub struct FlagExtractor {
    nodes: Vec<TrieNode>,
    flags: Vec<FlagData>,
}

impl FlagExtractor {
    pub fn new<'a>(flags: impl IntoIterator<Item = &'a FlagData>) -> Self {
        let mut extractor = Self {
            nodes: vec![TrieNode::default()],
            flags: Vec::new(),
        };
        for flag in flags {
            let index = extractor.flags.len();
            extractor.flags.push(flag.clone());
            for alias in &flag.aliases {
                extractor.insert(alias, index);
            }
        }
        extractor
    }

    fn insert(&mut self, alias: &str, flag_index: usize) {
        let mut node = 0;
        for ch in alias.chars() {
            node = match self.nodes[node].children.get(&ch) {
                Some(&next) => next,
                None => {
                    self.nodes.push(TrieNode::default());
                    let next = self.nodes.len() - 1;
                    self.nodes[node].children.insert(ch, next);
                    next
                }
            };
        }
        // Si dos flags comparten alias se queda el primero; el verificador lo rechaza antes.
        if node != 0 && self.nodes[node].flag.is_none() {
            self.nodes[node].flag = Some(flag_index);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    pub fn flags(&self) -> &[FlagData] {
        &self.flags
    }

    /// Busca un flag por su nombre canónico.
    pub fn by_name(&self, name: &str) -> Option<&FlagData> {
        self.flags.iter().find(|f| f.name == name)
    }

    /// Divide el cuerpo de un token de flags (sin guiones) en los flags que contiene.
    ///
    /// Escaneo voraz de izquierda a derecha: en cada posición se avanza por el
    /// trie todo lo posible y se confirma el fin de alias más profundo visitado.
    /// Un carácter que no puede empezar un camino del trie es un error; en ese
    /// caso no se devuelve ningún flag y el error lleva todos los caracteres
    /// no reconocidos concatenados.
    pub fn extract(&self, body: &str) -> Result<Vec<&FlagData>, FlagError> {
        let chars: Vec<char> = body.chars().collect();
        let mut found: Vec<usize> = Vec::new();
        let mut unmatched = String::new();
        let mut i = 0;

        while i < chars.len() {
            let mut node = 0;
            let mut j = i;
            let mut deepest: Option<(usize, usize)> = None;

            while let Some(&next) = chars.get(j).and_then(|c| self.nodes[node].children.get(c)) {
                node = next;
                j += 1;
                if let Some(flag) = self.nodes[node].flag {
                    deepest = Some((j, flag));
                }
            }

            match deepest {
                Some((end, flag)) => {
                    if !found.contains(&flag) {
                        found.push(flag);
                    }
                    i = end;
                }
                None => {
                    unmatched.push(chars[i]);
                    i += 1;
                }
            }
        }

        if !unmatched.is_empty() {
            return Err(FlagError { unmatched });
        }
        Ok(found.into_iter().map(|index| &self.flags[index]).collect())
    }
}

/// Devuelve el cuerpo de un token con forma de flag (`-sd` -> `sd`,
/// `--silent` -> `silent`). Los números negativos no son flags.
pub fn flag_body(token: &str) -> Option<&str> {
    let body = token
        .strip_prefix("--")
        .or_else(|| token.strip_prefix('-'))?;
    if body.is_empty() || body.starts_with('-') || token.parse::<f64>().is_ok() {
        return None;
    }
    Some(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::ValueKind;

    fn flag(name: &str, aliases: &[&str]) -> FlagData {
        FlagData {
            name: name.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            value_kind: None,
        }
    }

    fn names(flags: Vec<&FlagData>) -> Vec<&str> {
        flags.into_iter().map(|f| f.name.as_str()).collect()
    }

    fn extractor() -> FlagExtractor {
        let silent = flag("silent", &["s", "silent"]);
        let debug = flag("debug", &["d", "debug"]);
        FlagExtractor::new([&silent, &debug])
    }

    #[test]
    fn combined_short_flags_are_split() {
        let ex = extractor();
        assert_eq!(names(ex.extract("sd").unwrap()), vec!["silent", "debug"]);
        assert_eq!(names(ex.extract("ds").unwrap()), vec!["debug", "silent"]);
    }

    #[test]
    fn long_aliases_win_over_their_prefixes() {
        let ex = extractor();
        assert_eq!(names(ex.extract("silent").unwrap()), vec!["silent"]);
        assert_eq!(names(ex.extract("silentd").unwrap()), vec!["silent", "debug"]);
    }

    #[test]
    fn repeated_flags_are_reported_once() {
        assert_eq!(names(extractor().extract("sss").unwrap()), vec!["silent"]);
    }

    #[test]
    fn unknown_characters_fail_the_whole_token() {
        let ex = extractor();
        assert_eq!(
            ex.extract("sx").unwrap_err(),
            FlagError {
                unmatched: "x".to_string()
            }
        );
        // `si` entra en el camino de `silent` pero no termina ningún alias tras la `s`.
        assert_eq!(ex.extract("si").unwrap_err().unmatched, "i");
        assert_eq!(ex.extract("xsy").unwrap_err().unmatched, "xy");
    }

    #[test]
    fn multi_character_aliases_without_short_form() {
        let verbose = flag("verbose", &["vv"]);
        let value = FlagData {
            name: "time".to_string(),
            aliases: vec!["t".to_string()],
            value_kind: Some(ValueKind::Integer),
        };
        let ex = FlagExtractor::new([&verbose, &value]);
        assert_eq!(names(ex.extract("vvt").unwrap()), vec!["verbose", "time"]);
        assert_eq!(ex.extract("v").unwrap_err().unmatched, "v");
        assert!(ex.by_name("time").is_some_and(|f| !f.is_switch()));
    }

    #[test]
    fn flag_shaped_tokens() {
        assert_eq!(flag_body("-sd"), Some("sd"));
        assert_eq!(flag_body("--silent"), Some("silent"));
        assert_eq!(flag_body("-5"), None);
        assert_eq!(flag_body("-2.5"), None);
        assert_eq!(flag_body("-"), None);
        assert_eq!(flag_body("---x"), None);
        assert_eq!(flag_body("plain"), None);
    }
}
