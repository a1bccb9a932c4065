use std::collections::HashMap;

use crate::dom::{Dom, Element, NodeId};
use crate::{Error, Result};

const PARSER_STACK_BYTES: usize = 16 * 1024 * 1024;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

pub(crate) fn parse_document(html: &str) -> Result<Dom> {
    let mut dom = Dom::new();
    let root = dom.root();
    parse_fragment_into(&mut dom, root, html)?;
    Ok(dom)
}

pub(crate) fn parse_fragment_into(dom: &mut Dom, parent: NodeId, html: &str) -> Result<()> {
    stacker::grow(PARSER_STACK_BYTES, || -> Result<()> {
        let mut parser = Parser::new(html);
        match parser.parse_nodes(dom, parent)? {
            None => Ok(()),
            Some(tag) => Err(Error::HtmlParse(format!("unexpected closing tag: </{tag}>"))),
        }
    })?;

    for select in dom.descendant_elements_by_tag(parent, "select") {
        dom.sync_select_value(select);
    }
    dom.rebuild_id_index();
    Ok(())
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn starts_with(&self, needle: &str) -> bool {
        needle
            .chars()
            .enumerate()
            .all(|(idx, ch)| self.peek(idx) == Some(ch))
    }

    fn skip_until(&mut self, needle: &str) -> bool {
        while !self.at_end() {
            if self.starts_with(needle) {
                self.pos += needle.chars().count();
                return true;
            }
            self.pos += 1;
        }
        false
    }

    // Parses sibling nodes under `parent` until EOF or a closing tag,
    // whose (consumed) name is handed back to the caller for matching.
    fn parse_nodes(&mut self, dom: &mut Dom, parent: NodeId) -> Result<Option<String>> {
        loop {
            if self.at_end() {
                return Ok(None);
            }

            if self.starts_with("<!--") {
                self.pos += 4;
                if !self.skip_until("-->") {
                    return Err(Error::HtmlParse("unclosed comment".into()));
                }
                continue;
            }

            if self.starts_with("<!") {
                self.pos += 2;
                if !self.skip_until(">") {
                    return Err(Error::HtmlParse("unclosed markup declaration".into()));
                }
                continue;
            }

            if self.starts_with("</") {
                self.pos += 2;
                let name = self.read_tag_name()?;
                self.skip_whitespace();
                if self.peek(0) != Some('>') {
                    return Err(Error::HtmlParse(format!("malformed closing tag: </{name}")));
                }
                self.pos += 1;
                return Ok(Some(name));
            }

            if self.peek(0) == Some('<') && self.peek(1).map(|ch| ch.is_ascii_alphabetic()) == Some(true) {
                self.parse_element(dom, parent)?;
                continue;
            }

            self.parse_text(dom, parent);
        }
    }

    fn parse_element(&mut self, dom: &mut Dom, parent: NodeId) -> Result<()> {
        self.pos += 1;
        let tag = self.read_tag_name()?;
        let (attrs, self_closed) = self.parse_attrs(&tag)?;

        let mut element = Element::new(&tag);
        for (name, value) in &attrs {
            match name.as_str() {
                "value" => element.value = value.clone(),
                "checked" => element.checked = true,
                "disabled" => element.disabled = true,
                "readonly" => element.readonly = true,
                _ => {}
            }
        }
        element.attrs = attrs;
        let node = dom.create_element(parent, element);

        if self_closed || VOID_ELEMENTS.contains(&tag.as_str()) {
            return Ok(());
        }

        if RAW_TEXT_ELEMENTS.contains(&tag.as_str()) {
            let raw = self.read_raw_text(&tag)?;
            if !raw.is_empty() {
                dom.create_text(node, &raw);
            }
            return Ok(());
        }

        match self.parse_nodes(dom, node)? {
            Some(closed) if closed == tag => Ok(()),
            Some(closed) => Err(Error::HtmlParse(format!(
                "mismatched closing tag: expected </{tag}>, found </{closed}>"
            ))),
            None => Err(Error::HtmlParse(format!("unclosed element: <{tag}>"))),
        }
    }

    fn parse_text(&mut self, dom: &mut Dom, parent: NodeId) {
        let start = self.pos;
        // A `<` that opened no tag, comment or closing tag is literal text.
        if self.peek(0) == Some('<') {
            self.pos += 1;
        }
        while !self.at_end() && self.peek(0) != Some('<') {
            self.pos += 1;
        }
        let raw = self.chars[start..self.pos].iter().collect::<String>();
        if !raw.is_empty() {
            dom.create_text(parent, &unescape_entities(&raw));
        }
    }

    fn read_tag_name(&mut self) -> Result<String> {
        let start = self.pos;
        while let Some(ch) = self.peek(0) {
            if ch.is_ascii_alphanumeric() || ch == '-' {
                self.pos += 1;
            } else {
                break;
            }
        }
        if self.pos == start {
            return Err(Error::HtmlParse("missing tag name".into()));
        }
        Ok(self.chars[start..self.pos]
            .iter()
            .collect::<String>()
            .to_ascii_lowercase())
    }

    fn parse_attrs(&mut self, tag: &str) -> Result<(HashMap<String, String>, bool)> {
        let mut attrs = HashMap::new();
        loop {
            self.skip_whitespace();
            match self.peek(0) {
                None => {
                    return Err(Error::HtmlParse(format!("unclosed tag: <{tag}")));
                }
                Some('>') => {
                    self.pos += 1;
                    return Ok((attrs, false));
                }
                Some('/') if self.peek(1) == Some('>') => {
                    self.pos += 2;
                    return Ok((attrs, true));
                }
                Some(_) => {
                    let name = self.read_attr_name(tag)?;
                    self.skip_whitespace();
                    let value = if self.peek(0) == Some('=') {
                        self.pos += 1;
                        self.skip_whitespace();
                        self.read_attr_value(tag)?
                    } else {
                        String::new()
                    };
                    attrs.insert(name, value);
                }
            }
        }
    }

    fn read_attr_name(&mut self, tag: &str) -> Result<String> {
        let start = self.pos;
        while let Some(ch) = self.peek(0) {
            if ch.is_whitespace() || ch == '=' || ch == '>' || ch == '/' {
                break;
            }
            self.pos += 1;
        }
        if self.pos == start {
            return Err(Error::HtmlParse(format!("malformed attribute in <{tag}>")));
        }
        Ok(self.chars[start..self.pos]
            .iter()
            .collect::<String>()
            .to_ascii_lowercase())
    }

    fn read_attr_value(&mut self, tag: &str) -> Result<String> {
        match self.peek(0) {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                let start = self.pos;
                while let Some(ch) = self.peek(0) {
                    if ch == quote {
                        let raw = self.chars[start..self.pos].iter().collect::<String>();
                        self.pos += 1;
                        return Ok(unescape_entities(&raw));
                    }
                    self.pos += 1;
                }
                Err(Error::HtmlParse(format!(
                    "unclosed attribute value in <{tag}>"
                )))
            }
            _ => {
                let start = self.pos;
                while let Some(ch) = self.peek(0) {
                    if ch.is_whitespace() || ch == '>' {
                        break;
                    }
                    self.pos += 1;
                }
                let raw = self.chars[start..self.pos].iter().collect::<String>();
                Ok(unescape_entities(&raw))
            }
        }
    }

    fn read_raw_text(&mut self, tag: &str) -> Result<String> {
        let close = format!("</{tag}");
        let start = self.pos;
        while !self.at_end() {
            if self.starts_with(&close) {
                let raw = self.chars[start..self.pos].iter().collect::<String>();
                self.pos += close.chars().count();
                self.skip_whitespace();
                if self.peek(0) != Some('>') {
                    return Err(Error::HtmlParse(format!("malformed closing tag: </{tag}")));
                }
                self.pos += 1;
                return Ok(raw);
            }
            self.pos += 1;
        }
        Err(Error::HtmlParse(format!("unclosed element: <{tag}>")))
    }

    fn skip_whitespace(&mut self) {
        while self.peek(0).map(|ch| ch.is_whitespace()) == Some(true) {
            self.pos += 1;
        }
    }
}

pub(crate) fn unescape_entities(src: &str) -> String {
    fn decode_numeric(value: &str) -> Option<char> {
        let codepoint = if let Some(hex) = value.strip_prefix('x').or_else(|| value.strip_prefix('X'))
        {
            u32::from_str_radix(hex, 16).ok()?
        } else {
            value.parse::<u32>().ok()?
        };
        char::from_u32(codepoint)
    }

    fn decode_named(value: &str) -> Option<char> {
        match value {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some('\u{00A0}'),
            _ => None,
        }
    }

    let mut out = String::with_capacity(src.len());
    let mut rest = src;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp + 1..];
        let Some(semicolon) = tail.find(';') else {
            out.push('&');
            rest = tail;
            continue;
        };
        let body = &tail[..semicolon];
        let decoded = if let Some(numeric) = body.strip_prefix('#') {
            decode_numeric(numeric)
        } else {
            decode_named(body)
        };
        match decoded {
            Some(ch) => {
                out.push(ch);
                rest = &tail[semicolon + 1..];
            }
            None => {
                out.push('&');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}
