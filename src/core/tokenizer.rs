// src/core/tokenizer.rs

/// Parte una línea en tokens por espacios en blanco. Las comillas dobles
/// agrupan espacios y dentro de ellas `\"` y `\\` se escapan. Una comilla
/// sin cerrar se extiende hasta el final de la línea.
pub fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quoted = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                quoted = !quoted;
                in_token = true;
            }
            '\\' if quoted => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            c if c.is_whitespace() && !quoted => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            c => {
                current.push(c);
                in_token = true;
            }
        }
    }
    if in_token {
        tokens.push(current);
    }
    tokens
}

/// `true` si la línea termina en blanco fuera de comillas, es decir, si el
/// usuario ya ha empezado un token nuevo.
pub fn ends_with_separator(line: &str) -> bool {
    let quotes = line.chars().filter(|&c| c == '"').count();
    quotes % 2 == 0 && line.chars().last().is_some_and(char::is_whitespace)
}
