//! Selector parsing and matching.
//!
//! Resolution has to work the same whether the host offers a native
//! `querySelector` or not, so the subset of CSS selectors the locator
//! generator emits is parsed here and matched against any
//! [`Dom`](crate::dom::Dom).

mod escape;
mod matcher;

pub use escape::{escape_ident, quote_string, unescape};
pub use matcher::matches;

use fieldmark_common::SelectorError;
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "selector/selector.pest"]
pub struct SelectorParser;

/// Comma-separated selector list. Matches when any member matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList {
    pub selectors: Vec<ComplexSelector>,
}

/// Compound selectors joined by combinators, left to right.
/// `combinators[i]` sits between `compounds[i]` and `compounds[i + 1]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplexSelector {
    pub compounds: Vec<CompoundSelector>,
    pub combinators: Vec<Combinator>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    Child,
    Descendant,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompoundSelector {
    /// Lowercase tag name; `None` for `*` or an omitted type selector.
    pub tag: Option<String>,
    pub ids: Vec<String>,
    pub classes: Vec<String>,
    pub attributes: Vec<AttributeSelector>,
    /// 1-based positions among element siblings.
    pub nth_child: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSelector {
    pub name: String,
    /// `None` tests presence only.
    pub value: Option<String>,
}

fn invalid(selector: &str, reason: impl Into<String>) -> SelectorError {
    SelectorError::Invalid {
        selector: selector.to_string(),
        reason: reason.into(),
    }
}

pub fn parse_selector(input: &str) -> Result<SelectorList, SelectorError> {
    let mut pairs = SelectorParser::parse(Rule::selector_list, input)
        .map_err(|e| invalid(input, e.to_string()))?;
    let list = pairs
        .next()
        .ok_or_else(|| invalid(input, "empty selector"))?;

    let mut selectors = Vec::new();
    for inner in list.into_inner() {
        if inner.as_rule() == Rule::complex {
            selectors.push(parse_complex(input, inner)?);
        }
    }

    if selectors.is_empty() {
        return Err(invalid(input, "empty selector"));
    }
    Ok(SelectorList { selectors })
}

fn parse_complex(input: &str, pair: Pair<Rule>) -> Result<ComplexSelector, SelectorError> {
    let mut compounds = Vec::new();
    let mut combinators = Vec::new();

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::compound => compounds.push(parse_compound(input, inner)?),
            Rule::child_comb => combinators.push(Combinator::Child),
            Rule::descendant_comb => combinators.push(Combinator::Descendant),
            other => return Err(invalid(input, format!("unexpected {:?}", other))),
        }
    }

    Ok(ComplexSelector {
        compounds,
        combinators,
    })
}

fn parse_compound(input: &str, pair: Pair<Rule>) -> Result<CompoundSelector, SelectorError> {
    let mut compound = CompoundSelector::default();

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::universal => {}
            Rule::type_sel => compound.tag = Some(unescape(inner.as_str()).to_ascii_lowercase()),
            Rule::id_sel => compound.ids.push(unescape(inner_str(&inner))),
            Rule::class_sel => compound.classes.push(unescape(inner_str(&inner))),
            Rule::attr_sel => compound.attributes.push(parse_attribute(inner)),
            Rule::nth_child => {
                let raw = inner_str(&inner);
                let index = raw
                    .parse()
                    .map_err(|_| invalid(input, format!("bad nth-child index '{}'", raw)))?;
                compound.nth_child.push(index);
            }
            other => return Err(invalid(input, format!("unexpected {:?}", other))),
        }
    }

    Ok(compound)
}

fn parse_attribute(pair: Pair<Rule>) -> AttributeSelector {
    let mut name = String::new();
    let mut value = None;

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::attr_name => name = unescape(inner.as_str()),
            Rule::attr_value => {
                let raw = match inner.into_inner().next() {
                    Some(token) if token.as_rule() == Rule::ident => token.as_str().to_string(),
                    Some(token) => inner_str(&token).to_string(),
                    None => String::new(),
                };
                value = Some(unescape(&raw));
            }
            _ => {}
        }
    }

    AttributeSelector { name, value }
}

/// Text of the first inner token, e.g. the name inside `#name`.
fn inner_str<'a>(pair: &Pair<'a, Rule>) -> &'a str {
    pair.clone()
        .into_inner()
        .next()
        .map(|p| p.as_str())
        .unwrap_or("")
}
