use super::{TemplateError, TemplateErrorKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawToken {
    // Plain literal text (outside brace groups). "{{" and "}}" arrive
    // unescaped as "{" and "}".
    Literal(String),
    // "/" segment separator (only emitted outside brace groups).
    Slash,
    // "{"
    BraceOpen,
    // "*" immediately after "{" (catch-all marker).
    Star,
    // Parameter name. May be empty; the parser reports that.
    Ident(String),
    // Text after "=" inside a brace group.
    Default(String),
    // "?" inside a brace group (optional marker).
    Question,
    // One constraint expression after ":" inside a brace group.
    Constraint(String),
    // "}"
    BraceClose,
}

// Tokenize a canonical template string into (offset, token) pairs.
//
// Notes on behavior:
// - Outside of braces, "{{" and "}}" are escapes for literal braces; a
//   lone "}" is an error, a lone "{" opens a parameter group.
// - Inside a group the shape is *? name =default? ?? (:constraint)*.
//   The lexer only chops; ordering and exclusivity rules live in the
//   parser. A "?" terminates default and constraint collection at paren
//   depth zero, so "{id:int?}" lexes as constraint "int" plus Question.
// - Constraint text is collected paren-aware: inside "(...)", the
//   characters ":", "?", "{" and "}" are plain content, which is what
//   lets "{id:regex(^\d{4}$)}" survive intact.
//
// Offsets are character positions into the canonical text; they are
// carried on every token so the parser can report precise locations.
pub fn tokenize(input: &str) -> Result<Vec<(usize, RawToken)>, TemplateError> {
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0usize;
    let mut out: Vec<(usize, RawToken)> = Vec::new();
    let mut lit_buf = String::new();
    let mut lit_start = 0usize;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '{' => {
                // "{{" is an escaped literal brace
                if chars.get(i + 1) == Some(&'{') {
                    if lit_buf.is_empty() {
                        lit_start = i;
                    }
                    lit_buf.push('{');
                    i += 2;
                    continue;
                }
                flush_literal(&mut lit_buf, lit_start, &mut out);
                let open_at = i;
                out.push((open_at, RawToken::BraceOpen));
                i += 1;
                i = lex_group(&chars, i, open_at, &mut out)?;
            }
            '}' => {
                if chars.get(i + 1) == Some(&'}') {
                    if lit_buf.is_empty() {
                        lit_start = i;
                    }
                    lit_buf.push('}');
                    i += 2;
                    continue;
                }
                // stray close brace
                return Err(TemplateError::new(i, TemplateErrorKind::UnbalancedBrace));
            }
            '/' => {
                flush_literal(&mut lit_buf, lit_start, &mut out);
                out.push((i, RawToken::Slash));
                i += 1;
            }
            _ => {
                if lit_buf.is_empty() {
                    lit_start = i;
                }
                lit_buf.push(c);
                i += 1;
            }
        }
    }

    flush_literal(&mut lit_buf, lit_start, &mut out);
    Ok(out)
}

fn flush_literal(buf: &mut String, start: usize, out: &mut Vec<(usize, RawToken)>) {
    if !buf.is_empty() {
        out.push((start, RawToken::Literal(std::mem::take(buf))));
    }
}

// Lex the contents of one brace group, starting just past "{".
// Returns the index just past the closing "}".
fn lex_group(
    chars: &[char],
    mut i: usize,
    open_at: usize,
    out: &mut Vec<(usize, RawToken)>,
) -> Result<usize, TemplateError> {
    // catch-all marker
    if chars.get(i) == Some(&'*') {
        out.push((i, RawToken::Star));
        i += 1;
    }

    // parameter name: everything up to "=", "?", ":" or "}"
    let name_start = i;
    let mut name = String::new();
    while i < chars.len() {
        match chars[i] {
            '=' | '?' | ':' | '}' => break,
            '{' | '/' => return Err(TemplateError::new(i, TemplateErrorKind::UnbalancedBrace)),
            c => {
                name.push(c);
                i += 1;
            }
        }
    }
    out.push((name_start, RawToken::Ident(name)));

    loop {
        match chars.get(i) {
            Some('=') => {
                let at = i;
                i += 1;
                let mut default = String::new();
                while i < chars.len() {
                    match chars[i] {
                        '?' | ':' | '}' => break,
                        '{' => return Err(TemplateError::new(i, TemplateErrorKind::UnbalancedBrace)),
                        c => {
                            default.push(c);
                            i += 1;
                        }
                    }
                }
                out.push((at, RawToken::Default(default)));
            }
            Some('?') => {
                out.push((i, RawToken::Question));
                i += 1;
            }
            Some(':') => {
                let at = i;
                i += 1;
                let mut expr = String::new();
                let mut depth = 0usize;
                while i < chars.len() {
                    let c = chars[i];
                    if depth == 0 {
                        match c {
                            ':' | '?' | '}' => break,
                            '{' => {
                                return Err(TemplateError::new(i, TemplateErrorKind::UnbalancedBrace));
                            }
                            '(' => depth += 1,
                            _ => {}
                        }
                    } else {
                        match c {
                            '(' => depth += 1,
                            ')' => depth -= 1,
                            _ => {}
                        }
                    }
                    expr.push(c);
                    i += 1;
                }
                if depth != 0 {
                    return Err(TemplateError::new(at, TemplateErrorKind::UnbalancedBrace));
                }
                out.push((at, RawToken::Constraint(expr)));
            }
            Some('}') => {
                out.push((i, RawToken::BraceClose));
                return Ok(i + 1);
            }
            Some(_) => {
                // only reachable when the name loop stopped on a char the
                // dispatch above does not handle, which cannot happen
                return Err(TemplateError::new(i, TemplateErrorKind::UnbalancedBrace));
            }
            None => return Err(TemplateError::new(open_at, TemplateErrorKind::UnbalancedBrace)),
        }
    }
}
