/// S-expression reader for KiCad board files.
///
/// Grammar:
///   sexpr  = '(' atom_or_sexpr* ')'
///   atom   = string | symbol
///   string = '"' ( [^"\\] | '\' any )* '"'
///   symbol = [^ \t\n\r()"]+
///
/// Numbers are kept as symbols and parsed on access.

#[derive(Debug, Clone, PartialEq)]
pub enum SExpr {
    List(Vec<SExpr>),
    Atom(String),
}

impl SExpr {
    /// First atom of a list, i.e. the node's tag.
    pub fn tag(&self) -> Option<&str> {
        match self {
            SExpr::List(items) => items.first().and_then(|item| item.as_atom()),
            _ => None,
        }
    }

    /// Everything after the tag.
    pub fn children(&self) -> &[SExpr] {
        match self {
            SExpr::List(items) if !items.is_empty() => &items[1..],
            _ => &[],
        }
    }

    pub fn as_atom(&self) -> Option<&str> {
        match self {
            SExpr::Atom(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// First child list with the given tag.
    pub fn find(&self, tag: &str) -> Option<&SExpr> {
        self.children().iter().find(|c| c.tag() == Some(tag))
    }

    pub fn find_all<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a SExpr> + 'a {
        self.children().iter().filter(move |c| c.tag() == Some(tag))
    }

    /// Value of a `(tag value)` child.
    pub fn value(&self, tag: &str) -> Option<&str> {
        self.find(tag).and_then(|node| node.atom_at(0))
    }

    pub fn value_f64(&self, tag: &str) -> Option<f64> {
        self.value(tag).and_then(|v| v.parse().ok())
    }

    /// Nth atom after the tag.
    pub fn atom_at(&self, index: usize) -> Option<&str> {
        self.children().get(index).and_then(|v| v.as_atom())
    }

    pub fn f64_at(&self, index: usize) -> Option<f64> {
        self.atom_at(index).and_then(|v| v.parse().ok())
    }

    /// Bare atoms among the children, e.g. the names in `(layers "F.Cu" "B.Cu")`.
    pub fn atoms(&self) -> impl Iterator<Item = &str> {
        self.children().iter().filter_map(|c| c.as_atom())
    }

    /// Whether a bare keyword such as `locked` or `blind` is present,
    /// either as an atom or as a `(keyword ...)` list.
    pub fn has_flag(&self, flag: &str) -> bool {
        self.children()
            .iter()
            .any(|c| c.as_atom() == Some(flag) || c.tag() == Some(flag))
    }

    /// Read an `(tag x y ...)` child as a point.
    pub fn xy(&self, tag: &str) -> Option<[f64; 2]> {
        let node = self.find(tag)?;
        Some([node.f64_at(0)?, node.f64_at(1)?])
    }
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    fn skip_whitespace(&mut self) {
        while let Some(b' ' | b'\t' | b'\n' | b'\r') = self.peek() {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn parse_string(&mut self) -> Result<String, String> {
        let open = self.pos;
        self.pos += 1;
        let mut buf = Vec::new();
        while let Some(b) = self.peek() {
            self.pos += 1;
            match b {
                b'"' => return Ok(String::from_utf8_lossy(&buf).into_owned()),
                b'\\' => {
                    let escaped = self
                        .peek()
                        .ok_or_else(|| format!("unterminated escape in string at byte {open}"))?;
                    self.pos += 1;
                    buf.push(match escaped {
                        b'n' => b'\n',
                        b't' => b'\t',
                        other => other,
                    });
                }
                other => buf.push(other),
            }
        }
        Err(format!("unterminated string starting at byte {open}"))
    }

    fn parse_symbol(&mut self) -> String {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b'(' | b')' | b'"') {
                break;
            }
            self.pos += 1;
        }
        String::from_utf8_lossy(&self.input[start..self.pos]).into_owned()
    }

    fn parse_sexpr(&mut self) -> Result<SExpr, String> {
        self.skip_whitespace();
        match self.peek() {
            None => Err("unexpected end of input".to_string()),
            Some(b'(') => {
                let open = self.pos;
                self.pos += 1;
                let mut items = Vec::new();
                loop {
                    self.skip_whitespace();
                    match self.peek() {
                        Some(b')') => {
                            self.pos += 1;
                            return Ok(SExpr::List(items));
                        }
                        None => return Err(format!("list opened at byte {open} is never closed")),
                        _ => items.push(self.parse_sexpr()?),
                    }
                }
            }
            Some(b')') => Err(format!("unexpected ')' at byte {}", self.pos)),
            Some(b'"') => self.parse_string().map(SExpr::Atom),
            Some(_) => Ok(SExpr::Atom(self.parse_symbol())),
        }
    }
}

/// Parse the single top level S-expression of a file.
pub fn parse(input: &[u8]) -> Result<SExpr, String> {
    let mut parser = Parser::new(input);
    parser.skip_whitespace();
    if parser.peek().is_none() {
        return Err("empty input".to_string());
    }
    parser.parse_sexpr()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_list() {
        let result = parse(b"(hello world)").unwrap();
        assert_eq!(result.tag(), Some("hello"));
        assert_eq!(result.atom_at(0), Some("world"));
    }

    #[test]
    fn test_nested_values() {
        let result = parse(b"(a (b 1) (c 2.5))").unwrap();
        assert_eq!(result.value("b"), Some("1"));
        assert_eq!(result.value_f64("c"), Some(2.5));
    }

    #[test]
    fn test_quoted_layer_names() {
        let result = parse(b"(layers \"F.Cu\" \"B.Cu\")").unwrap();
        let layers: Vec<&str> = result.atoms().collect();
        assert_eq!(layers, vec!["F.Cu", "B.Cu"]);
    }

    #[test]
    fn test_string_escapes() {
        let result = parse(br#"(net 1 "A \"quoted\" net")"#).unwrap();
        assert_eq!(result.atom_at(1), Some("A \"quoted\" net"));
        let result = parse(br#"(name "\\leading")"#).unwrap();
        assert_eq!(result.atom_at(0), Some("\\leading"));
    }

    #[test]
    fn test_xy_and_flags() {
        let result = parse(b"(via blind (at 100.5 -50.3) (size 0.6) (locked yes))").unwrap();
        assert_eq!(result.xy("at"), Some([100.5, -50.3]));
        assert!(result.has_flag("blind"));
        assert!(result.has_flag("locked"));
        assert!(!result.has_flag("micro"));
    }

    #[test]
    fn test_find_all() {
        let result = parse(b"(root (net 0 \"\") (net 1 \"GND\") (net 2 \"VCC\"))").unwrap();
        assert_eq!(result.find_all("net").count(), 3);
    }

    #[test]
    fn test_unbalanced_input_is_an_error() {
        assert!(parse(b"(kicad_pcb (version 2024)").is_err());
        assert!(parse(b")").is_err());
        assert!(parse(b"   ").is_err());
        assert!(parse(b"(name \"open").is_err());
    }
}
