//! Minimal depth-aware JSON scanner
//!
//! Not a JSON library. It exposes exactly three things the wire protocols
//! need:
//!
//! - locate a member of an object by key ([`field`], [`nested_field`])
//! - walk the elements of an array ([`array_items`], [`objects`])
//! - read scalar values ([`as_int`], [`as_str`], [`int_field`], [`str_field`])
//!
//! Values are returned as raw slices of the input. Boundaries are found by
//! counting brace/bracket depth outside of string literals, so commas,
//! braces and quotes inside strings or nested objects never split a value.

/// Skip ASCII whitespace starting at `i`
fn skip_ws(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

/// Index just past the string literal opening at `i`
fn string_end(bytes: &[u8], i: usize) -> Option<usize> {
    let mut escaped = false;
    for (j, &b) in bytes.iter().enumerate().skip(i + 1) {
        if escaped {
            escaped = false;
        } else if b == b'\\' {
            escaped = true;
        } else if b == b'"' {
            return Some(j + 1);
        }
    }
    None
}

/// Index just past the object/array opening at `i`
fn composite_end(bytes: &[u8], i: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (j, &b) in bytes.iter().enumerate().skip(i) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' | b'[' => depth += 1,
            b'}' | b']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(j + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Index just past the value starting at `i`
fn value_end(bytes: &[u8], i: usize) -> Option<usize> {
    match bytes.get(i)? {
        b'"' => string_end(bytes, i),
        b'{' | b'[' => composite_end(bytes, i),
        _ => {
            let end = bytes[i..]
                .iter()
                .position(|&b| matches!(b, b',' | b'}' | b']') || b.is_ascii_whitespace())
                .map_or(bytes.len(), |p| i + p);
            (end > i).then_some(end)
        }
    }
}

/// Raw value of the member `key` of `object`, searching only its top level
pub fn field<'a>(object: &'a str, key: &str) -> Option<&'a str> {
    let bytes = object.as_bytes();
    let mut i = skip_ws(bytes, 0);
    if bytes.get(i) != Some(&b'{') {
        return None;
    }
    i += 1;

    loop {
        i = skip_ws(bytes, i);
        match bytes.get(i)? {
            b'}' => return None,
            b'"' => {}
            _ => return None,
        }
        let key_end = string_end(bytes, i)?;
        let member = &object[i + 1..key_end - 1];

        i = skip_ws(bytes, key_end);
        if bytes.get(i) != Some(&b':') {
            return None;
        }
        let start = skip_ws(bytes, i + 1);
        let end = value_end(bytes, start)?;
        if member == key {
            return Some(&object[start..end]);
        }

        i = skip_ws(bytes, end);
        match bytes.get(i)? {
            b',' => i += 1,
            _ => return None,
        }
    }
}

/// Follow a chain of object keys, e.g. `["data", "commands"]`
pub fn nested_field<'a>(object: &'a str, path: &[&str]) -> Option<&'a str> {
    path.iter().try_fold(object, |current, key| field(current, key))
}

/// Iterator over the raw elements of a JSON array
///
/// Stops at the first malformed element.
pub struct ArrayItems<'a> {
    text: &'a str,
    pos: usize,
    done: bool,
}

impl<'a> Iterator for ArrayItems<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        if self.done {
            return None;
        }
        let bytes = self.text.as_bytes();
        let start = skip_ws(bytes, self.pos);
        if bytes.get(start).is_none_or(|&b| b == b']') {
            self.done = true;
            return None;
        }
        let Some(end) = value_end(bytes, start) else {
            self.done = true;
            return None;
        };

        let next = skip_ws(bytes, end);
        match bytes.get(next) {
            Some(b',') => self.pos = next + 1,
            Some(b']') => {
                self.pos = next;
            }
            _ => self.done = true,
        }
        Some(&self.text[start..end])
    }
}

/// Elements of `array`; empty when `array` is not an array
pub fn array_items(array: &str) -> ArrayItems<'_> {
    let bytes = array.as_bytes();
    let open = skip_ws(bytes, 0);
    let is_array = bytes.get(open) == Some(&b'[');
    ArrayItems {
        text: array,
        pos: open + 1,
        done: !is_array,
    }
}

/// Well-formed object elements of `array`, skipping anything else
pub fn objects(array: &str) -> impl Iterator<Item = &str> {
    array_items(array).filter(|item| item.starts_with('{'))
}

/// Integer value; integral floats such as `2.0` are accepted
pub fn as_int(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(v) = raw.parse::<i64>() {
        return Some(v);
    }
    let f = raw.parse::<f64>().ok()?;
    (f.is_finite() && f.fract() == 0.0).then_some(f as i64)
}

/// Unescaped string value; `None` if `raw` is not a string literal
pub fn as_str(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let inner = raw.strip_prefix('"')?.strip_suffix('"')?;

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'u' => {
                let hex: String = chars.by_ref().take(4).collect();
                let code = u32::from_str_radix(&hex, 16).ok()?;
                out.push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
            }
            other => out.push(other),
        }
    }
    Some(out)
}

pub fn int_field(object: &str, key: &str) -> Option<i64> {
    field(object, key).and_then(as_int)
}

pub fn str_field(object: &str, key: &str) -> Option<String> {
    field(object, key).and_then(as_str)
}
