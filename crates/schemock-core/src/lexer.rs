use regex::Regex;
use std::sync::LazyLock;

use crate::types::*;

// --- Regex patterns ---

static RE_BLANK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*$").unwrap());
static RE_MODULE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^module\s+((?:::)?[A-Z]\w*(?:::[A-Z]\w*)*)\s*(;\s*end)?$").unwrap()
});
static RE_SINGLETON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^class\s*<<\s*self\s*(;\s*end)?$").unwrap());
static RE_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^class\s+((?:::)?[A-Z]\w*(?:::[A-Z]\w*)*)(?:\s*<\s*((?:::)?[A-Z]\w*(?:::[A-Z]\w*)*))?\s*(;\s*end)?$",
    )
    .unwrap()
});
static RE_VISIBILITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(private|protected|public)(?:\s+(.+))?$").unwrap());
static RE_SELF_ASSIGN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^self\.(\w+)\s*=\s*(.+)$").unwrap());
static RE_CONSTANT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Z][A-Z0-9_]*)\s*=\s*(.+)$").unwrap());
static RE_MACRO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([a-z_]\w*)(?:\s+|\()(.*)$").unwrap());
static RE_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^end(?:[\s.);]|$)").unwrap());

// Block openers inside bodies
static RE_BLOCK_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:if|unless|while|until|case|begin|for)\b").unwrap());
static RE_ASSIGN_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"=\s*(?:if|unless|case|begin)\b").unwrap());
static RE_DO_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bdo\s*(?:\|[^|]*\|)?\s*$").unwrap());
static RE_TRAILING_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bend\s*$").unwrap());

// Macro argument values
static RE_OPTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([a-z_]\w*):\s+(.+)$").unwrap());
static RE_HASH_ROCKET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^:?["']?(\w+)["']?\s*=>\s*(.+)$"#).unwrap());
static RE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d[\d_]*(?:\.\d+)?$").unwrap());
static RE_CONSTANT_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:::)?[A-Z]\w*(?:::[A-Z]\w*)*$").unwrap());
static RE_STABBY_LAMBDA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^->\s*(?:\(([^)]*)\))?").unwrap());
static RE_BLOCK_LAMBDA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:lambda|proc)\s*(?:\{|do)\s*(?:\|([^|]*)\|)?").unwrap()
});

/// Class-level calls the parser understands. Other calls are plain text.
const MACROS: &[&str] = &[
    "has_many",
    "has_one",
    "belongs_to",
    "has_and_belongs_to_many",
    "attribute",
    "scope",
    "include",
    "extend",
    "private_class_method",
    "public_class_method",
];

/// Tokenize model definition source into a sequence of line tokens.
pub fn lex(content: &str, _file: &str) -> Vec<Token> {
    let lines: Vec<&str> = content.split('\n').collect();
    let mut tokens: Vec<Token> = Vec::new();
    let total = lines.len();
    let mut i = 0;

    while i < total {
        let raw_line = lines[i];
        // Strip trailing \r for CRLF
        let raw = raw_line.strip_suffix('\r').unwrap_or(raw_line);
        let line_num = i + 1;
        let indent = raw.len() - raw.trim_start().len();

        // =begin / =end block comments
        if raw.starts_with("=begin") {
            i += 1;
            while i < total && !lines[i].starts_with("=end") {
                i += 1;
            }
            i += 1;
            continue;
        }

        // __END__ stops the source
        if raw.trim_end() == "__END__" {
            break;
        }

        let code = strip_comment(raw).trim().to_string();

        // Blank or comment-only line
        if RE_BLANK.is_match(&code) {
            tokens.push(Token {
                token_type: TokenType::Blank,
                raw: raw.to_string(),
                line: line_num,
                indent: 0,
                data: TokenData::default(),
            });
            i += 1;
            continue;
        }

        // Logical line: join continuation lines of unbalanced or comma-terminated calls
        let mut logical = code;
        while i + 1 < total && needs_continuation(&logical) {
            i += 1;
            let next = lines[i].strip_suffix('\r').unwrap_or(lines[i]);
            let next_code = strip_comment(next).trim().to_string();
            if next_code.is_empty() {
                continue;
            }
            logical.push(' ');
            logical.push_str(&next_code);
        }

        tokens.push(tokenize_line(&logical, raw, line_num, indent));
        i += 1;
    }

    tokens
}

fn tokenize_line(code: &str, raw: &str, line: usize, indent: usize) -> Token {
    let token = |token_type: TokenType, data: TokenData| Token {
        token_type,
        raw: raw.to_string(),
        line,
        indent,
        data,
    };

    if RE_END.is_match(code) {
        return token(TokenType::End, TokenData::default());
    }

    if let Some(caps) = RE_MODULE.captures(code) {
        let data = TokenData {
            name: Some(caps[1].trim_start_matches("::").to_string()),
            opens_block: caps.get(2).is_none(),
            ..Default::default()
        };
        return token(TokenType::Module, data);
    }

    if let Some(caps) = RE_SINGLETON.captures(code) {
        let data = TokenData {
            opens_block: caps.get(1).is_none(),
            ..Default::default()
        };
        return token(TokenType::SingletonClass, data);
    }

    if let Some(caps) = RE_CLASS.captures(code) {
        let data = TokenData {
            name: Some(caps[1].trim_start_matches("::").to_string()),
            superclass: caps
                .get(2)
                .map(|m| m.as_str().trim_start_matches("::").to_string()),
            opens_block: caps.get(3).is_none(),
            ..Default::default()
        };
        return token(TokenType::Class, data);
    }

    if let Some(rest) = code.strip_prefix("def ") {
        return token(TokenType::Def, parse_def(rest));
    }

    if let Some(caps) = RE_VISIBILITY.captures(code) {
        let visibility = Visibility::parse(&caps[1]);
        let rest = caps.get(2).map(|m| m.as_str().trim());
        return match rest {
            // `private def foo` applies to that method only
            Some(r) if r.starts_with("def ") => {
                let mut data = parse_def(&r[4..]);
                data.visibility = visibility;
                token(TokenType::Def, data)
            }
            Some(r) => {
                let mut data = TokenData {
                    name: Some(caps[1].to_string()),
                    visibility,
                    ..Default::default()
                };
                match parse_macro_args(r) {
                    Ok((args, _, _)) => data.args = args,
                    Err(msg) => data.malformed = Some(msg),
                }
                token(TokenType::Visibility, data)
            }
            None => {
                let data = TokenData {
                    name: Some(caps[1].to_string()),
                    visibility,
                    ..Default::default()
                };
                token(TokenType::Visibility, data)
            }
        };
    }

    if let Some(caps) = RE_SELF_ASSIGN.captures(code) {
        let value = caps[2].trim();
        let data = TokenData {
            name: Some(caps[1].to_string()),
            value: Some(value.to_string()),
            args: vec![parse_arg_value(value)],
            opens_block: opens_body_block(value),
            ..Default::default()
        };
        return token(TokenType::SelfAssign, data);
    }

    if let Some(caps) = RE_CONSTANT.captures(code) {
        let value = caps[2].trim();
        let data = TokenData {
            name: Some(caps[1].to_string()),
            value: Some(value.to_string()),
            opens_block: opens_body_block(value),
            ..Default::default()
        };
        return token(TokenType::Constant, data);
    }

    if let Some(caps) = RE_MACRO.captures(code) {
        let name = &caps[1];
        if MACROS.contains(&name) {
            // Re-attach the opening paren consumed by the pattern
            let args_str = if code[name.len()..].starts_with('(') {
                format!("({}", &caps[2])
            } else {
                caps[2].to_string()
            };
            let mut data = TokenData {
                name: Some(name.to_string()),
                ..Default::default()
            };
            match parse_macro_args(&args_str) {
                Ok((args, options, opens_block)) => {
                    data.args = args;
                    data.options = options;
                    data.opens_block = opens_block;
                }
                Err(msg) => data.malformed = Some(msg),
            }
            return token(TokenType::Macro, data);
        }
    }

    if opens_body_block(code) {
        return token(TokenType::BlockOpen, TokenData::default());
    }

    let data = TokenData {
        name: Some(code.to_string()),
        ..Default::default()
    };
    token(TokenType::Text, data)
}

/// Parse the remainder of a `def` line (after `def `).
fn parse_def(rest: &str) -> TokenData {
    let mut data = TokenData::default();
    let mut s = rest.trim();

    if let Some(after) = s.strip_prefix("self.") {
        data.singleton = true;
        s = after;
    }

    let name_end = s
        .find(|c: char| c == '(' || c == ';' || c.is_whitespace())
        .unwrap_or(s.len());
    data.name = Some(s[..name_end].to_string());
    let mut after = s[name_end..].trim_start();

    if after.starts_with('(') {
        match find_balanced_paren(after, 0) {
            Some(close) => {
                data.params = parse_parameters(&after[1..close]);
                after = after[close + 1..].trim_start();
            }
            None => {
                data.malformed = Some("unbalanced parameter list".into());
                after = "";
            }
        }
    } else if !after.is_empty() && !after.starts_with('=') && !after.starts_with(';') {
        // Parenthesis-free parameter list
        let end = after.find(';').unwrap_or(after.len());
        data.params = parse_parameters(&after[..end]);
        after = after[end..].trim_start();
    }

    let self_closing = (after.starts_with(';') && RE_TRAILING_END.is_match(after))
        || (after.starts_with('=') && !after.starts_with("=="));
    data.opens_block = !self_closing;
    data
}

/// Whether a body line opens a block that is closed by `end`.
fn opens_body_block(code: &str) -> bool {
    let keyword = RE_BLOCK_KEYWORD.is_match(code) || RE_ASSIGN_BLOCK.is_match(code);
    if keyword && RE_TRAILING_END.is_match(code) {
        return false;
    }
    keyword || RE_DO_BLOCK.is_match(code)
}

fn needs_continuation(code: &str) -> bool {
    if code.ends_with(',') || code.ends_with('\\') {
        return true;
    }
    bracket_depth(code) > 0
}

/// Net count of unclosed `(`, `[`, `{` outside string literals.
fn bracket_depth(s: &str) -> i32 {
    let bytes = s.as_bytes();
    let mut depth = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => {
                i = skip_string(bytes, i).unwrap_or(bytes.len());
                continue;
            }
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            _ => {}
        }
        i += 1;
    }
    depth
}

/// Returns the index just past the closing quote of the string starting at `open`.
fn skip_string(bytes: &[u8], open: usize) -> Option<usize> {
    let quote = bytes[open];
    let mut i = open + 1;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            i += 2;
            continue;
        }
        if bytes[i] == quote {
            return Some(i + 1);
        }
        i += 1;
    }
    None
}

/// Remove a trailing `# comment` that is outside string literals and not an interpolation.
fn strip_comment(line: &str) -> &str {
    let bytes = line.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => match skip_string(bytes, i) {
                Some(next) => {
                    i = next;
                    continue;
                }
                None => return line,
            },
            b'#' if bytes.get(i + 1) != Some(&b'{') => return &line[..i],
            _ => {}
        }
        i += 1;
    }
    line
}

fn find_balanced_paren(s: &str, open_pos: usize) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut depth = 0;
    let mut i = open_pos;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => {
                i = skip_string(bytes, i)?;
                continue;
            }
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Split on top-level commas, respecting brackets and string literals.
pub fn split_balanced(s: &str) -> Result<Vec<String>, String> {
    let bytes = s.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => {
                i = skip_string(bytes, i).ok_or_else(|| "unterminated string literal".to_string())?;
                continue;
            }
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => {
                depth -= 1;
                if depth < 0 {
                    return Err(format!("unexpected `{}`", bytes[i] as char));
                }
            }
            b',' if depth == 0 => {
                parts.push(s[start..i].trim().to_string());
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }

    if depth != 0 {
        return Err("unbalanced brackets".into());
    }
    let last = s[start..].trim();
    if !last.is_empty() || !parts.is_empty() {
        parts.push(last.to_string());
    }
    Ok(parts)
}

/// Parse macro arguments into positional values, keyword options and a trailing-`do` flag.
pub fn parse_macro_args(s: &str) -> Result<(Vec<ArgValue>, Vec<(String, ArgValue)>, bool), String> {
    let mut s = s.trim();
    let mut opens_block = false;

    if let Some(m) = RE_DO_BLOCK.find(s) {
        opens_block = true;
        s = s[..m.start()].trim_end();
    }

    if s.starts_with('(') && find_balanced_paren(s, 0) == Some(s.len() - 1) {
        s = &s[1..s.len() - 1];
    }

    let mut args = Vec::new();
    let mut options = Vec::new();

    for piece in split_balanced(s)? {
        if piece.is_empty() {
            return Err("empty argument".into());
        }
        if let Some(caps) = RE_OPTION.captures(&piece) {
            options.push((caps[1].to_string(), parse_arg_value(caps[2].trim())));
        } else if let Some(caps) = RE_HASH_ROCKET.captures(&piece) {
            options.push((caps[1].to_string(), parse_arg_value(caps[2].trim())));
        } else {
            args.push(parse_arg_value(&piece));
        }
    }

    Ok((args, options, opens_block))
}

/// Parse a single literal argument.
pub fn parse_arg_value(s: &str) -> ArgValue {
    let s = s.trim();

    if let Some(sym) = s.strip_prefix(':') {
        if !sym.starts_with(':') {
            return ArgValue::Symbol(unquote(sym).to_string());
        }
    }
    if is_quoted(s) {
        return ArgValue::Str(unquote(s).to_string());
    }
    if RE_NUMBER.is_match(s) {
        return ArgValue::Number(s.to_string());
    }
    match s {
        "true" => return ArgValue::Bool(true),
        "false" => return ArgValue::Bool(false),
        "nil" => return ArgValue::Nil,
        _ => {}
    }
    if let Some(caps) = RE_STABBY_LAMBDA.captures(s) {
        let params = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        return ArgValue::Lambda(parse_parameters(params));
    }
    if let Some(caps) = RE_BLOCK_LAMBDA.captures(s) {
        let params = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        return ArgValue::Lambda(parse_parameters(params));
    }
    if RE_CONSTANT_REF.is_match(s) {
        return ArgValue::Constant(s.trim_start_matches("::").to_string());
    }
    ArgValue::Raw(s.to_string())
}

/// Parse a parameter list (`a, b = 1, *rest, key:, opt: 2, **opts, &blk`).
pub fn parse_parameters(s: &str) -> Vec<Parameter> {
    let pieces = match split_balanced(s) {
        Ok(p) => p,
        Err(_) => return Vec::new(),
    };

    pieces
        .into_iter()
        .filter(|p| !p.is_empty())
        .map(|piece| parse_parameter(&piece))
        .collect()
}

fn parse_parameter(piece: &str) -> Parameter {
    if let Some(name) = piece.strip_prefix('&') {
        return Parameter::new(ParameterKind::Block, or_anonymous(name, "&"));
    }
    if let Some(name) = piece.strip_prefix("**") {
        return Parameter::new(ParameterKind::KeyRest, or_anonymous(name, "**"));
    }
    if let Some(name) = piece.strip_prefix('*') {
        return Parameter::new(ParameterKind::Rest, or_anonymous(name, "*"));
    }
    if let Some(colon) = keyword_colon(piece) {
        let name = piece[..colon].trim();
        let default = piece[colon + 1..].trim();
        let kind = if default.is_empty() {
            ParameterKind::KeyReq
        } else {
            ParameterKind::Key
        };
        return Parameter::new(kind, name);
    }
    if let Some(eq) = piece.find('=') {
        return Parameter::new(ParameterKind::Opt, piece[..eq].trim());
    }
    Parameter::new(ParameterKind::Req, piece.trim())
}

/// Position of the colon in `name:` / `name: default`, if the piece is a keyword parameter.
fn keyword_colon(piece: &str) -> Option<usize> {
    let end = piece
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(piece.len());
    if end > 0 && piece[end..].starts_with(':') && !piece[end..].starts_with("::") {
        Some(end)
    } else {
        None
    }
}

fn or_anonymous(name: &str, marker: &str) -> String {
    let name = name.trim();
    if name.is_empty() {
        marker.to_string()
    } else {
        name.to_string()
    }
}

fn is_quoted(s: &str) -> bool {
    s.len() >= 2
        && ((s.starts_with('"') && s.ends_with('"')) || (s.starts_with('\'') && s.ends_with('\'')))
}

fn unquote(s: &str) -> &str {
    if is_quoted(s) {
        &s[1..s.len() - 1]
    } else {
        s
    }
}
