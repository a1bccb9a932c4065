use crate::dom::{Dom, NodeId};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrCondition {
    Exists { key: String },
    Eq { key: String, value: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct SelectorStep {
    tag: Option<String>,
    universal: bool,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrCondition>,
}

impl SelectorStep {
    fn id_only(&self) -> Option<&str> {
        if !self.universal && self.tag.is_none() && self.classes.is_empty() && self.attrs.is_empty()
        {
            self.id.as_deref()
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SelectorPart {
    step: SelectorStep,
    // Relation to the previous (left) selector part.
    combinator: Option<Combinator>,
}

pub(crate) fn query_all(dom: &Dom, selector: &str) -> Result<Vec<NodeId>> {
    let parts = parse_selector_chain(selector)?;

    if parts.len() == 1 {
        if let Some(id) = parts[0].step.id_only() {
            return Ok(dom.get_element_by_id(id).into_iter().collect());
        }
    }

    let last = parts.len() - 1;
    let mut out = Vec::new();
    for node in dom.descendant_elements(dom.root()) {
        if matches_chain(dom, node, &parts, last) {
            out.push(node);
        }
    }
    Ok(out)
}

fn matches_chain(dom: &Dom, node: NodeId, parts: &[SelectorPart], idx: usize) -> bool {
    if !matches_step(dom, node, &parts[idx].step) {
        return false;
    }
    if idx == 0 {
        return true;
    }
    match parts[idx].combinator {
        Some(Combinator::Child) => dom
            .parent(node)
            .map(|parent| matches_chain(dom, parent, parts, idx - 1))
            .unwrap_or(false),
        Some(Combinator::Descendant) | None => {
            let mut cursor = dom.parent(node);
            while let Some(ancestor) = cursor {
                if matches_chain(dom, ancestor, parts, idx - 1) {
                    return true;
                }
                cursor = dom.parent(ancestor);
            }
            false
        }
    }
}

fn matches_step(dom: &Dom, node: NodeId, step: &SelectorStep) -> bool {
    let Some(tag_name) = dom.tag_name(node) else {
        return false;
    };

    if let Some(tag) = &step.tag {
        if !tag_name.eq_ignore_ascii_case(tag) {
            return false;
        }
    }
    if let Some(id) = &step.id {
        if dom.attr(node, "id") != Some(id.as_str()) {
            return false;
        }
    }
    for class in &step.classes {
        if !dom.has_class(node, class) {
            return false;
        }
    }
    for condition in &step.attrs {
        let holds = match condition {
            AttrCondition::Exists { key } => dom.has_attr(node, key),
            AttrCondition::Eq { key, value } => dom.attr(node, key) == Some(value.as_str()),
        };
        if !holds {
            return false;
        }
    }
    true
}

fn parse_selector_chain(selector: &str) -> Result<Vec<SelectorPart>> {
    let trimmed = selector.trim();
    if trimmed.is_empty() {
        return Err(Error::UnsupportedSelector(selector.into()));
    }

    let tokens = tokenize_selector(trimmed)?;
    let mut parts = Vec::new();
    let mut pending_combinator: Option<Combinator> = None;

    for token in tokens {
        if token == ">" {
            if pending_combinator.is_some() || parts.is_empty() {
                return Err(Error::UnsupportedSelector(selector.into()));
            }
            pending_combinator = Some(Combinator::Child);
            continue;
        }
        if token == "+" || token == "~" {
            return Err(Error::UnsupportedSelector(selector.into()));
        }

        let step = parse_selector_step(&token)
            .ok_or_else(|| Error::UnsupportedSelector(selector.into()))?;
        let combinator = if parts.is_empty() {
            None
        } else {
            Some(pending_combinator.take().unwrap_or(Combinator::Descendant))
        };
        parts.push(SelectorPart { step, combinator });
    }

    if parts.is_empty() || pending_combinator.is_some() {
        return Err(Error::UnsupportedSelector(selector.into()));
    }
    Ok(parts)
}

// Splits on whitespace outside attribute brackets; `>`, `+` and `~`
// become their own tokens.
fn tokenize_selector(selector: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut bracket_depth = 0usize;
    let mut quote: Option<char> = None;

    for ch in selector.chars() {
        match ch {
            '\'' | '"' if bracket_depth > 0 => {
                if quote == Some(ch) {
                    quote = None;
                } else if quote.is_none() {
                    quote = Some(ch);
                }
                current.push(ch);
            }
            '[' if quote.is_none() => {
                bracket_depth += 1;
                current.push(ch);
            }
            ']' if quote.is_none() => {
                if bracket_depth == 0 {
                    return Err(Error::UnsupportedSelector(selector.into()));
                }
                bracket_depth -= 1;
                current.push(ch);
            }
            ch if ch.is_whitespace() && bracket_depth == 0 => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            '>' | '+' | '~' if bracket_depth == 0 => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                tokens.push(ch.to_string());
            }
            ch => current.push(ch),
        }
    }

    if bracket_depth > 0 || quote.is_some() {
        return Err(Error::UnsupportedSelector(selector.into()));
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    Ok(tokens)
}

fn parse_selector_step(token: &str) -> Option<SelectorStep> {
    let mut step = SelectorStep::default();
    let chars = token.chars().collect::<Vec<_>>();
    let mut i = 0usize;

    while i < chars.len() {
        match chars[i] {
            '*' => {
                if step.tag.is_some() || step.universal || i != 0 {
                    return None;
                }
                step.universal = true;
                i += 1;
            }
            '#' => {
                let (name, next) = read_name(&chars, i + 1)?;
                step.id = Some(name);
                i = next;
            }
            '.' => {
                let (name, next) = read_name(&chars, i + 1)?;
                step.classes.push(name);
                i = next;
            }
            '[' => {
                let close = chars[i..].iter().position(|ch| *ch == ']')? + i;
                let body = chars[i + 1..close].iter().collect::<String>();
                step.attrs.push(parse_attr_condition(&body)?);
                i = close + 1;
            }
            ch if ch.is_ascii_alphabetic() => {
                if i != 0 || step.universal {
                    return None;
                }
                let (name, next) = read_name(&chars, i)?;
                step.tag = Some(name.to_ascii_lowercase());
                i = next;
            }
            _ => return None,
        }
    }

    if step.tag.is_none()
        && !step.universal
        && step.id.is_none()
        && step.classes.is_empty()
        && step.attrs.is_empty()
    {
        return None;
    }
    Some(step)
}

fn parse_attr_condition(body: &str) -> Option<AttrCondition> {
    let body = body.trim();
    let Some(eq) = body.find('=') else {
        if body.is_empty() || !is_name(body) {
            return None;
        }
        return Some(AttrCondition::Exists {
            key: body.to_ascii_lowercase(),
        });
    };

    let key = body[..eq].trim();
    if key.is_empty() || !is_name(key) {
        return None;
    }
    let raw = body[eq + 1..].trim();
    let value = raw
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .or_else(|| {
            raw.strip_prefix('\'')
                .and_then(|rest| rest.strip_suffix('\''))
        })
        .unwrap_or(raw);
    Some(AttrCondition::Eq {
        key: key.to_ascii_lowercase(),
        value: value.to_string(),
    })
}

fn is_name(input: &str) -> bool {
    !input.is_empty()
        && input
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
}

fn read_name(chars: &[char], start: usize) -> Option<(String, usize)> {
    let mut end = start;
    while end < chars.len()
        && (chars[end].is_ascii_alphanumeric() || chars[end] == '-' || chars[end] == '_')
    {
        end += 1;
    }
    if end == start {
        return None;
    }
    Some((chars[start..end].iter().collect(), end))
}
